//! # Value Objects
//!
//! Constants and key ordering shared by every node operation.

use std::cmp::Ordering;

/// Maximum number of links per node. A node that reaches this length after
/// an insert is split into two halves of `FANOUT / 2`.
pub const FANOUT: usize = 8;

/// Byte-wise lexicographic comparison of two keys.
///
/// Bytes compare as unsigned values. When one key is a prefix of the other,
/// the shorter key orders first.
#[inline]
pub fn compare_keys(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

/// Render a key for error messages and log fields.
pub(crate) fn display_key(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_is_unsigned_bytewise() {
        assert_eq!(compare_keys(b"a", b"b"), Ordering::Less);
        assert_eq!(compare_keys(&[0x7f], &[0x80]), Ordering::Less);
        assert_eq!(compare_keys(&[0xff], &[0x01]), Ordering::Greater);
    }

    #[test]
    fn test_shorter_prefix_orders_first() {
        assert_eq!(compare_keys(b"abc", b"abcd"), Ordering::Less);
        assert_eq!(compare_keys(b"abcd", b"abc"), Ordering::Greater);
        assert_eq!(compare_keys(b"abc", b"abc"), Ordering::Equal);
        assert_eq!(compare_keys(b"", b"a"), Ordering::Less);
    }

    #[test]
    fn test_fanout_splits_evenly() {
        assert_eq!(FANOUT % 2, 0);
    }
}
