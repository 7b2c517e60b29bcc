//! LIFO path recording for non-recursive traversal.
//!
//! [`TraversalStack`] stores the path from the root to the node being
//! visited, the nearest ancestor on top. Lookups and iteration push borrowed
//! `&Node` entries. Mutations push owned [`Frame`]s: each frame holds an
//! ancestor whose link toward the target has been detached, so the path
//! can be rotated and then re-linked bottom-up with [`TraversalStack::unwind`].
//!
//! Tree height is O(log N) in expectation, so the first
//! `INLINE_DEPTH` entries live inline and only degenerate trees allocate.

use smallvec::SmallVec;

use super::ReferenceCounter;
use super::node::{Direction, Link, Node};

/// Entries kept inline before spilling to the heap.
const INLINE_DEPTH: usize = 48;

/// An ancestor removed from the tree during a mutation.
///
/// The link of `node` on `direction` is empty while the frame is on the
/// stack; unwinding re-attaches the rebuilt subtree there.
pub(crate) type Frame = (ReferenceCounter<Node>, Direction);

pub(crate) struct TraversalStack<T> {
    entries: SmallVec<[T; INLINE_DEPTH]>,
}

impl<T> TraversalStack<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: SmallVec::new(),
        }
    }

    pub(crate) fn push(&mut self, entry: T) {
        self.entries.push(entry);
    }

    pub(crate) fn pop(&mut self) -> Option<T> {
        self.entries.pop()
    }

    /// Returns the entry `depth` levels below the top (0 is the most recent push).
    pub(crate) fn at(&self, depth: usize) -> Option<&T> {
        let len = self.entries.len();
        depth
            .checked_add(1)
            .and_then(|offset| len.checked_sub(offset))
            .map(|index| &self.entries[index])
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'a> TraversalStack<&'a Node> {
    /// Pushes `link` and its chain of left descendants.
    pub(crate) fn push_left_spine(&mut self, mut link: Option<&'a ReferenceCounter<Node>>) {
        while let Some(node) = link {
            self.push(node);
            link = node.left.as_ref();
        }
    }
}

impl TraversalStack<Frame> {
    /// Records `node` as the nearest ancestor, its `direction` link detached.
    pub(crate) fn push_frame(&mut self, node: ReferenceCounter<Node>, direction: Direction) {
        self.push((node, direction));
    }

    /// Priority of the nearest recorded ancestor.
    pub(crate) fn parent_priority(&self) -> Option<u64> {
        self.at(0).map(|(node, _)| node.priority)
    }

    /// Re-links every recorded ancestor above `subtree` and returns the new root.
    ///
    /// Frames are unique by construction, so `make_mut` never copies here.
    pub(crate) fn unwind(&mut self, mut subtree: Link) -> Link {
        while let Some((mut parent, direction)) = self.pop() {
            ReferenceCounter::make_mut(&mut parent).set_child(direction, subtree);
            subtree = Some(parent);
        }
        subtree
    }
}
