//! # Ordered Index (ag-01)
//!
//! In-memory ordered map from byte-string keys to owned values. This is the
//! foundation the managed cache and the transaction dispatcher build on.
//!
//! ## Structure
//!
//! A B+tree variant with a fixed fanout of [`FANOUT`] links per node. Leaves
//! hold values; internal nodes hold child nodes keyed by a copy of the
//! child's lowest key at the time it was split off. There are no
//! leaf-to-leaf sibling pointers: neighbour lookups redescend from the root
//! and carry over into the adjacent subtree when a subtree runs out.
//!
//! ```text
//!                     [ a | m ]                 depth 1 (root)
//!                    /         \
//!        [ a | c | f | h ]   [ m | p | t ]      depth 0 (leaves)
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Links sorted ascending by key | `Node::search` / `Node::route` insert positions |
//! | Node length in `[1, FANOUT)` | split on reaching `FANOUT`, excise on empty |
//! | Keys are unique and non-empty | `OrderedIndex::put` |
//! | Depth derives from per-depth populations | `OrderedIndex::depth_from_populations` |
//! | Empty tree is a single empty leaf at depth 0 | `OrderedIndex::remove` reset |
//!
//! ## Usage
//!
//! ```rust
//! use ag_01_ordered_index::OrderedIndex;
//!
//! let mut index = OrderedIndex::new();
//! index.put(b"beta", 2).unwrap();
//! index.put(b"alpha", 1).unwrap();
//!
//! assert_eq!(index.get(b"alpha"), Some(&1));
//! assert_eq!(index.get_next(b"alpha"), Some(&2));
//! assert_eq!(index.get_previous(b"alpha"), None);
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;

pub use domain::{compare_keys, IndexError, Iter, OrderedIndex, FANOUT};
