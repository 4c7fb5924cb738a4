//! # Tree Entities
//!
//! Nodes and links. A link either owns a value (leaf level) or a child node
//! (internal levels), never both.

use super::value_objects::FANOUT;

/// Payload of a link.
pub(crate) enum Slot<V> {
    Value(V),
    Child(Box<Node<V>>),
}

/// One entry of a node: the key plus its payload.
///
/// For internal links the key is a separator: a copy of the child's lowest
/// key when the child was created. Every key stored below link `i > 0` is
/// greater than or equal to its separator.
pub(crate) struct Link<V> {
    pub(crate) key: Vec<u8>,
    pub(crate) slot: Slot<V>,
}

impl<V> Link<V> {
    pub(crate) fn leaf(key: &[u8], value: V) -> Self {
        Self {
            key: key.to_vec(),
            slot: Slot::Value(value),
        }
    }

    pub(crate) fn branch(key: Vec<u8>, child: Node<V>) -> Self {
        Self {
            key,
            slot: Slot::Child(Box::new(child)),
        }
    }

    pub(crate) fn value(&self) -> Option<&V> {
        match &self.slot {
            Slot::Value(value) => Some(value),
            Slot::Child(_) => None,
        }
    }

    pub(crate) fn value_mut(&mut self) -> Option<&mut V> {
        match &mut self.slot {
            Slot::Value(value) => Some(value),
            Slot::Child(_) => None,
        }
    }

    pub(crate) fn child(&self) -> Option<&Node<V>> {
        match &self.slot {
            Slot::Child(child) => Some(child),
            Slot::Value(_) => None,
        }
    }

    pub(crate) fn child_mut(&mut self) -> Option<&mut Node<V>> {
        match &mut self.slot {
            Slot::Child(child) => Some(child),
            Slot::Value(_) => None,
        }
    }

    pub(crate) fn into_value(self) -> Option<V> {
        match self.slot {
            Slot::Value(value) => Some(value),
            Slot::Child(_) => None,
        }
    }

    pub(crate) fn into_child(self) -> Option<Node<V>> {
        match self.slot {
            Slot::Child(child) => Some(*child),
            Slot::Value(_) => None,
        }
    }
}

/// Ordered array of up to `FANOUT - 1` links (it splits on reaching `FANOUT`).
pub(crate) struct Node<V> {
    pub(crate) links: Vec<Link<V>>,
}

impl<V> Node<V> {
    pub(crate) fn new() -> Self {
        Self {
            links: Vec::with_capacity(FANOUT),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.links.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub(crate) fn first_key(&self) -> Vec<u8> {
        self.links
            .first()
            .map(|link| link.key.clone())
            .unwrap_or_default()
    }

    /// Exact-match search over a leaf: `Ok(position)` when found, otherwise
    /// `Err(insert_position)`.
    pub(crate) fn search(&self, key: &[u8]) -> Result<usize, usize> {
        self.links
            .binary_search_by(|link| link.key.as_slice().cmp(key))
    }

    /// Child to descend into for `key`: the last link whose separator is
    /// `<= key`, with link 0 catching everything below the first separator.
    pub(crate) fn route(&self, key: &[u8]) -> usize {
        match self.links.get(1..) {
            Some(rest) => rest.partition_point(|link| link.key.as_slice() <= key),
            None => 0,
        }
    }

    /// Move the upper half of the links into a new sibling.
    pub(crate) fn split(&mut self) -> Node<V> {
        let mut sibling = Node::new();
        sibling.links.extend(self.links.drain(FANOUT / 2..));
        sibling
    }
}
