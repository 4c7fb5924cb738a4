//! # Ordered Index
//!
//! The tree itself: insertion with upward splits, removal with upward
//! excision, exact and neighbour lookups, and a structural validator.

use std::fmt;

use tracing::trace;

use super::entities::{Link, Node, Slot};
use super::errors::IndexError;
use super::value_objects::{display_key, FANOUT};

/// In-memory ordered map from byte keys to owned values.
///
/// Values are dropped when removed, cleared, or when the index is dropped;
/// the value type's `Drop` plays the role of a per-entry destructor.
pub struct OrderedIndex<V> {
    root: Node<V>,
    /// Depth of the root; leaves live at depth 0.
    depth: usize,
    /// Number of links stored at each depth, leaves at index 0.
    populations: Vec<usize>,
    len: usize,
}

impl<V> Default for OrderedIndex<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for OrderedIndex<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedIndex")
            .field("len", &self.len)
            .field("depth", &self.depth)
            .field("populations", &self.populations)
            .finish()
    }
}

impl<V> OrderedIndex<V> {
    /// Create an empty index at depth 0.
    pub fn new() -> Self {
        Self {
            root: Node::new(),
            depth: 0,
            populations: vec![0],
            len: 0,
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current depth of the root (0 while the root is a leaf).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of links stored at `depth`.
    pub fn population(&self, depth: usize) -> usize {
        self.populations.get(depth).copied().unwrap_or(0)
    }

    /// Insert `value` under `key`.
    ///
    /// Fails with [`IndexError::DuplicateKey`] when the key is already
    /// present; the stored value is left untouched and `value` is dropped.
    pub fn put(&mut self, key: &[u8], value: V) -> Result<(), IndexError> {
        if key.is_empty() {
            return Err(IndexError::EmptyKey);
        }

        let depth = self.depth;
        let sibling = Self::insert(&mut self.root, key, value, depth, &mut self.populations)?;
        self.len += 1;

        if let Some(sibling) = sibling {
            self.grow_root(sibling);
        }

        Ok(())
    }

    fn insert(
        node: &mut Node<V>,
        key: &[u8],
        value: V,
        depth: usize,
        populations: &mut [usize],
    ) -> Result<Option<Node<V>>, IndexError> {
        if depth == 0 {
            match node.search(key) {
                Ok(_) => {
                    return Err(IndexError::DuplicateKey {
                        key: display_key(key),
                    })
                }
                Err(position) => node.links.insert(position, Link::leaf(key, value)),
            }
        } else {
            let index = node.route(key);
            let child = node
                .links
                .get_mut(index)
                .and_then(Link::child_mut)
                .ok_or_else(|| IndexError::corrupted("internal link without child"))?;

            match Self::insert(child, key, value, depth - 1, populations)? {
                None => return Ok(None),
                Some(sibling) => {
                    let separator = sibling.first_key();
                    node.links.insert(index + 1, Link::branch(separator, sibling));
                }
            }
        }

        populations[depth] += 1;

        if node.len() < FANOUT {
            return Ok(None);
        }

        trace!(depth, "Splitting full node");
        Ok(Some(node.split()))
    }

    fn grow_root(&mut self, sibling: Node<V>) {
        let previous = std::mem::replace(&mut self.root, Node::new());
        let left = previous.first_key();
        let right = sibling.first_key();

        self.root.links.push(Link::branch(left, previous));
        self.root.links.push(Link::branch(right, sibling));

        self.depth += 1;
        if self.populations.len() <= self.depth {
            self.populations.resize(self.depth + 1, 0);
        }
        self.populations[self.depth] += 2;

        trace!(depth = self.depth, "Root split, tree grew");
    }

    fn leaf_for(&self, key: &[u8]) -> Option<&Node<V>> {
        let mut node = &self.root;
        for _ in 0..self.depth {
            node = node.links.get(node.route(key))?.child()?;
        }
        Some(node)
    }

    /// Exact lookup.
    pub fn get(&self, key: &[u8]) -> Option<&V> {
        let leaf = self.leaf_for(key)?;
        let position = leaf.search(key).ok()?;
        leaf.links.get(position)?.value()
    }

    /// Exact lookup returning a mutable reference.
    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut V> {
        let mut node = &mut self.root;
        for _ in 0..self.depth {
            let index = node.route(key);
            node = node.links.get_mut(index)?.child_mut()?;
        }
        let position = node.search(key).ok()?;
        node.links.get_mut(position)?.value_mut()
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Value of the nearest entry strictly greater than `key`.
    pub fn get_next(&self, key: &[u8]) -> Option<&V> {
        self.next_entry(key).map(|(_, value)| value)
    }

    /// Value of the nearest entry strictly less than `key`.
    pub fn get_previous(&self, key: &[u8]) -> Option<&V> {
        self.previous_entry(key).map(|(_, value)| value)
    }

    /// Nearest entry strictly greater than `key`. The empty key yields the
    /// first entry, which makes `next_entry(b"")` the start of a walk.
    pub fn next_entry(&self, key: &[u8]) -> Option<(&[u8], &V)> {
        Self::next_in(&self.root, key, self.depth)
    }

    /// Nearest entry strictly less than `key`.
    pub fn previous_entry(&self, key: &[u8]) -> Option<(&[u8], &V)> {
        Self::previous_in(&self.root, key, self.depth)
    }

    fn next_in<'a>(node: &'a Node<V>, key: &[u8], depth: usize) -> Option<(&'a [u8], &'a V)> {
        if depth == 0 {
            let position = node.links.partition_point(|link| link.key.as_slice() <= key);
            let link = node.links.get(position)?;
            return link.value().map(|value| (link.key.as_slice(), value));
        }

        // Subtrees right of the routed child only hold greater keys, so the
        // first non-empty answer is the nearest one.
        let start = node.route(key);
        node.links.get(start..)?.iter().find_map(|link| {
            link.child()
                .and_then(|child| Self::next_in(child, key, depth - 1))
        })
    }

    fn previous_in<'a>(
        node: &'a Node<V>,
        key: &[u8],
        depth: usize,
    ) -> Option<(&'a [u8], &'a V)> {
        if depth == 0 {
            let position = node.links.partition_point(|link| link.key.as_slice() < key);
            let link = node.links.get(position.checked_sub(1)?)?;
            return link.value().map(|value| (link.key.as_slice(), value));
        }

        if node.is_empty() {
            return None;
        }

        let start = node.route(key);
        node.links.get(..=start)?.iter().rev().find_map(|link| {
            link.child()
                .and_then(|child| Self::previous_in(child, key, depth - 1))
        })
    }

    /// Remove `key` and hand back its value.
    pub fn remove(&mut self, key: &[u8]) -> Result<V, IndexError> {
        let depth = self.depth;
        let value = Self::remove_from(&mut self.root, key, depth, &mut self.populations)?;
        self.len -= 1;

        self.shrink_root();
        Ok(value)
    }

    fn remove_from(
        node: &mut Node<V>,
        key: &[u8],
        depth: usize,
        populations: &mut [usize],
    ) -> Result<V, IndexError> {
        if depth == 0 {
            let position = node.search(key).map_err(|_| IndexError::NotFound {
                key: display_key(key),
            })?;
            let link = node.links.remove(position);
            populations[0] -= 1;
            return link
                .into_value()
                .ok_or_else(|| IndexError::corrupted("leaf link without value"));
        }

        let index = node.route(key);
        let child = node
            .links
            .get_mut(index)
            .and_then(Link::child_mut)
            .ok_or_else(|| IndexError::corrupted("internal link without child"))?;

        let value = Self::remove_from(child, key, depth - 1, populations)?;

        if child.is_empty() {
            // Excise the emptied child; an emptied parent is excised in turn
            // by its own caller.
            node.links.remove(index);
            populations[depth] -= 1;
        }

        Ok(value)
    }

    fn shrink_root(&mut self) {
        if self.len == 0 || self.root.is_empty() {
            self.reset();
            return;
        }

        while self.depth > 0 && self.root.len() == 1 {
            let Some(child) = self.root.links.pop().and_then(Link::into_child) else {
                break;
            };
            self.root = child;
            self.populations[self.depth] -= 1;
            self.depth = self.depth_from_populations();
            self.populations.truncate(self.depth + 1);
            trace!(depth = self.depth, "Root collapsed onto its only child");
        }
    }

    /// Depth implied by the population counters: the level below the first
    /// empty level above the leaves.
    fn depth_from_populations(&self) -> usize {
        (1..self.populations.len())
            .find(|&depth| self.populations[depth] == 0)
            .map(|depth| depth - 1)
            .unwrap_or(self.populations.len() - 1)
    }

    fn reset(&mut self) {
        self.root = Node::new();
        self.depth = 0;
        self.populations = vec![0];
        self.len = 0;
    }

    /// Drop every entry and return to an empty depth-0 tree.
    pub fn clear(&mut self) {
        self.reset();
    }

    /// In-order iterator over `(key, value)`.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            stack: vec![self.root.links.iter()],
            remaining: self.len,
        }
    }

    /// Every entry in ascending key order.
    pub fn to_array(&self) -> Vec<(&[u8], &V)> {
        self.iter().collect()
    }

    /// Walk the whole tree and check its structural invariants.
    pub fn validate(&self) -> Result<(), IndexError> {
        let mut counted = vec![0usize; self.depth + 1];
        let mut leaves = 0usize;

        if self.root.is_empty() {
            if self.depth != 0 || self.len != 0 {
                return Err(IndexError::corrupted("empty root above depth 0"));
            }
        } else {
            Self::validate_node(&self.root, self.depth, None, None, &mut counted, &mut leaves)?;
        }

        if leaves != self.len {
            return Err(IndexError::corrupted(format!(
                "leaf count {} does not match {} stored values",
                self.len, leaves
            )));
        }

        for (depth, &count) in counted.iter().enumerate() {
            if self.population(depth) != count {
                return Err(IndexError::corrupted(format!(
                    "population at depth {} is {} but {} links are stored",
                    depth,
                    self.population(depth),
                    count
                )));
            }
        }

        if self.populations.len() > self.depth + 1
            && self.populations[self.depth + 1..].iter().any(|&count| count > 0)
        {
            return Err(IndexError::corrupted("populations recorded above the root"));
        }

        Ok(())
    }

    fn validate_node(
        node: &Node<V>,
        depth: usize,
        lower: Option<&[u8]>,
        upper: Option<&[u8]>,
        counted: &mut [usize],
        leaves: &mut usize,
    ) -> Result<(), IndexError> {
        if node.is_empty() || node.len() >= FANOUT {
            return Err(IndexError::corrupted(format!(
                "node at depth {} has length {}",
                depth,
                node.len()
            )));
        }

        counted[depth] += node.len();

        for (i, link) in node.links.iter().enumerate() {
            if link.key.is_empty() {
                return Err(IndexError::corrupted("empty key stored"));
            }
            if i > 0 && node.links[i - 1].key >= link.key {
                return Err(IndexError::corrupted(format!(
                    "keys out of order at depth {}",
                    depth
                )));
            }

            let next_bound = node.links.get(i + 1).map(|next| next.key.as_slice());

            match &link.slot {
                Slot::Value(_) => {
                    if depth != 0 {
                        return Err(IndexError::corrupted("value stored above the leaves"));
                    }
                    let key = link.key.as_slice();
                    if lower.is_some_and(|bound| key < bound)
                        || upper.is_some_and(|bound| key >= bound)
                    {
                        return Err(IndexError::corrupted(format!(
                            "key '{}' outside its separator range",
                            display_key(key)
                        )));
                    }
                    *leaves += 1;
                }
                Slot::Child(child) => {
                    if depth == 0 {
                        return Err(IndexError::corrupted("child link stored in a leaf"));
                    }
                    // Link 0 catches every key below the next separator.
                    let child_lower = if i == 0 { lower } else { Some(link.key.as_slice()) };
                    let child_upper = next_bound.or(upper);
                    Self::validate_node(child, depth - 1, child_lower, child_upper, counted, leaves)?;
                }
            }
        }

        Ok(())
    }
}

/// In-order iterator returned by [`OrderedIndex::iter`].
pub struct Iter<'a, V> {
    stack: Vec<std::slice::Iter<'a, Link<V>>>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a [u8], &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                None => {
                    self.stack.pop();
                }
                Some(link) => match &link.slot {
                    Slot::Value(value) => {
                        self.remaining = self.remaining.saturating_sub(1);
                        return Some((link.key.as_slice(), value));
                    }
                    Slot::Child(child) => self.stack.push(child.links.iter()),
                },
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, V> IntoIterator for &'a OrderedIndex<V> {
    type Item = (&'a [u8], &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_index(keys: impl IntoIterator<Item = u32>) -> OrderedIndex<u32> {
        let mut index = OrderedIndex::new();
        for key in keys {
            index.put(&key_for(key), key).unwrap();
        }
        index
    }

    fn key_for(n: u32) -> Vec<u8> {
        format!("{:06}", n).into_bytes()
    }

    #[test]
    fn test_new_index_is_empty() {
        let index: OrderedIndex<u32> = OrderedIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.depth(), 0);
        assert_eq!(index.get(b"missing"), None);
        assert!(index.validate().is_ok());
    }

    #[test]
    fn test_put_then_get() {
        let mut index = OrderedIndex::new();
        index.put(b"alpha", 1).unwrap();
        assert_eq!(index.get(b"alpha"), Some(&1));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_duplicate_put_keeps_prior_value() {
        let mut index = OrderedIndex::new();
        index.put(b"alpha", 1).unwrap();
        let err = index.put(b"alpha", 2).unwrap_err();
        assert!(matches!(err, IndexError::DuplicateKey { .. }));
        assert_eq!(index.get(b"alpha"), Some(&1));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_empty_key_rejected() {
        let mut index = OrderedIndex::new();
        assert_eq!(index.put(b"", 1), Err(IndexError::EmptyKey));
    }

    #[test]
    fn test_split_grows_depth() {
        let index = make_index(0..FANOUT as u32);
        assert_eq!(index.depth(), 1);
        assert_eq!(index.population(1), 2);
        assert_eq!(index.population(0), FANOUT);
        assert!(index.validate().is_ok());
    }

    #[test]
    fn test_many_inserts_stay_sorted_and_valid() {
        let index = make_index((0..500).rev());
        assert!(index.depth() >= 2);
        index.validate().unwrap();

        let keys: Vec<Vec<u8>> = index.iter().map(|(k, _)| k.to_vec()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(keys.len(), 500);
    }

    #[test]
    fn test_next_and_previous_cross_node_boundaries() {
        let index = make_index((0..200).map(|n| n * 2));
        for n in 0..199u32 {
            let key = key_for(n * 2);
            assert_eq!(index.get_next(&key), Some(&((n + 1) * 2)));
            let odd = key_for(n * 2 + 1);
            assert_eq!(index.get_next(&odd), Some(&((n + 1) * 2)));
            assert_eq!(index.get_previous(&odd), Some(&(n * 2)));
        }
        assert_eq!(index.get_next(&key_for(398)), None);
        assert_eq!(index.get_previous(&key_for(0)), None);
    }

    #[test]
    fn test_next_from_empty_key_starts_walk() {
        let index = make_index([5, 3, 9]);
        let (key, value) = index.next_entry(b"").unwrap();
        assert_eq!(key, key_for(3).as_slice());
        assert_eq!(*value, 3);
    }

    #[test]
    fn test_remove_everything_resets_depth() {
        let mut index = make_index(0..300);
        for n in 0..300 {
            assert_eq!(index.remove(&key_for(n)).unwrap(), n);
            index.validate().unwrap();
        }
        assert!(index.is_empty());
        assert_eq!(index.depth(), 0);
        assert_eq!(index.get(&key_for(5)), None);
    }

    #[test]
    fn test_remove_missing_key() {
        let mut index = make_index(0..10);
        let err = index.remove(b"nope").unwrap_err();
        assert!(matches!(err, IndexError::NotFound { .. }));
        assert_eq!(index.len(), 10);
    }

    #[test]
    fn test_removal_collapses_root() {
        let mut index = make_index(0..64);
        let grown = index.depth();
        for n in 1..64 {
            index.remove(&key_for(n)).unwrap();
        }
        assert!(index.depth() < grown);
        assert_eq!(index.depth(), 0);
        assert_eq!(index.get(&key_for(0)), Some(&0));
        index.validate().unwrap();
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut index = make_index(0..50);
        *index.get_mut(&key_for(42)).unwrap() = 4242;
        assert_eq!(index.get(&key_for(42)), Some(&4242));
    }

    #[test]
    fn test_clear_drops_values() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        struct Tracked(Arc<AtomicUsize>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        let mut index = OrderedIndex::new();
        for n in 0..20u32 {
            index.put(&key_for(n), Tracked(drops.clone())).unwrap();
        }
        drop(index.remove(&key_for(3)).unwrap());
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        index.clear();
        assert_eq!(drops.load(Ordering::SeqCst), 20);
        assert!(index.is_empty());
    }
}
