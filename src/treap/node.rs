//! Tree vertices and child links.

use super::ReferenceCounter;

/// An owning link to a child subtree.
///
/// A link is shared between every table version that can reach it. Code that
/// needs to change a node goes through [`ReferenceCounter::make_mut`], which
/// mutates in place when the link is unique and copies the node otherwise.
pub(crate) type Link = Option<ReferenceCounter<Node>>;

/// Fixed per-node bookkeeping cost used for memory accounting.
///
/// Covers the key and value handles, the priority and both child links.
/// The bytes behind the key and value are counted separately.
pub const NODE_OVERHEAD: usize = std::mem::size_of::<Node>();

/// Which child of a node a path continues into.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Direction {
    Left,
    Right,
}

impl Direction {
    pub(crate) const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// A single treap vertex.
///
/// `Clone` is shallow: the copy shares the key, value and both child
/// subtrees with the original.
#[derive(Clone)]
pub(crate) struct Node {
    pub(crate) key: ReferenceCounter<[u8]>,
    pub(crate) value: ReferenceCounter<[u8]>,
    /// Lower priorities sit closer to the root.
    pub(crate) priority: u64,
    pub(crate) left: Link,
    pub(crate) right: Link,
}

impl Node {
    /// Creates a leaf node.
    pub(crate) const fn new(
        key: ReferenceCounter<[u8]>,
        value: ReferenceCounter<[u8]>,
        priority: u64,
    ) -> Self {
        Self {
            key,
            value,
            priority,
            left: None,
            right: None,
        }
    }

    /// Key length plus value length plus [`NODE_OVERHEAD`].
    pub(crate) fn approximate_size(&self) -> usize {
        self.key.len() + self.value.len() + NODE_OVERHEAD
    }

    pub(crate) const fn child(&self, direction: Direction) -> Option<&ReferenceCounter<Self>> {
        match direction {
            Direction::Left => self.left.as_ref(),
            Direction::Right => self.right.as_ref(),
        }
    }

    /// Detaches and returns the child on `direction`, leaving an empty link.
    pub(crate) fn take_child(&mut self, direction: Direction) -> Link {
        match direction {
            Direction::Left => self.left.take(),
            Direction::Right => self.right.take(),
        }
    }

    pub(crate) fn set_child(&mut self, direction: Direction, child: Link) {
        match direction {
            Direction::Left => self.left = child,
            Direction::Right => self.right = child,
        }
    }

    pub(crate) const fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}
