//! Treap algorithms shared by both table flavors.
//!
//! Every mutation walks down from the root, detaching each visited node
//! onto a [`TraversalStack`] after passing it through
//! [`ReferenceCounter::make_mut`]. For a node owned by a single table that
//! call is a uniqueness check and the node is edited in place. For a node
//! still reachable from another table version it produces a shallow copy,
//! so the other version never observes the change. The same code therefore
//! gives in-place updates for [`MutableTable`](super::MutableTable) and
//! path copying with structural sharing for
//! [`ImmutableTable`](super::ImmutableTable).
//!
//! Heap order: a node's priority is less than or equal to the priorities
//! of both of its children.

use std::cmp::Ordering;

use super::ReferenceCounter;
use super::error::InvariantViolation;
use super::node::{Direction, Link, Node};
use super::stack::{Frame, TraversalStack};

/// Outcome of [`insert`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Insertion {
    /// A new node of the given approximate size was linked into the tree.
    Added { size: usize },
    /// The key already existed; its value of `previous_len` bytes was replaced.
    Replaced { previous_len: usize },
}

/// Totals gathered by [`audit`].
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Census {
    pub(crate) count: usize,
    pub(crate) size: usize,
}

pub(crate) fn find<'a>(mut link: Option<&'a ReferenceCounter<Node>>, key: &[u8]) -> Option<&'a Node> {
    while let Some(node) = link {
        match key.cmp(&node.key[..]) {
            Ordering::Less => link = node.left.as_ref(),
            Ordering::Greater => link = node.right.as_ref(),
            Ordering::Equal => return Some(node),
        }
    }
    None
}

/// Follows `direction` links from `link` to the end of the chain.
pub(crate) fn extreme(mut link: Option<&ReferenceCounter<Node>>, direction: Direction) -> Option<&Node> {
    let mut last = None;
    while let Some(node) = link {
        last = Some(&**node);
        link = node.child(direction);
    }
    last
}

/// Inserts or replaces `key` under `root`.
///
/// A new node is linked as a leaf below the last visited ancestor and then
/// rotated upward while its priority is strictly lower than its parent's.
pub(crate) fn insert(
    root: &mut Link,
    key: &[u8],
    value: ReferenceCounter<[u8]>,
    priority: u64,
) -> Insertion {
    let mut stack = TraversalStack::new();
    let mut cursor = root.take();

    while let Some(mut node) = cursor {
        let current = ReferenceCounter::make_mut(&mut node);
        let direction = match key.cmp(&current.key[..]) {
            Ordering::Less => Direction::Left,
            Ordering::Greater => Direction::Right,
            Ordering::Equal => {
                let previous = std::mem::replace(&mut current.value, value);
                *root = stack.unwind(Some(node));
                return Insertion::Replaced {
                    previous_len: previous.len(),
                };
            }
        };
        cursor = current.take_child(direction);
        stack.push_frame(node, direction);
    }

    let mut inserted = ReferenceCounter::new(Node::new(ReferenceCounter::from(key), value, priority));
    let size = inserted.approximate_size();

    while stack
        .parent_priority()
        .is_some_and(|parent_priority| priority < parent_priority)
    {
        if let Some((parent, direction)) = stack.pop() {
            inserted = rotate_above(parent, inserted, direction);
        }
    }

    *root = stack.unwind(Some(inserted));
    Insertion::Added { size }
}

/// Removes `key` from under `root`, returning the detached node.
///
/// The target is rotated downward, always promoting the child with the
/// lower priority (the left one on ties), until it is a leaf and can be
/// dropped from its parent.
pub(crate) fn remove(root: &mut Link, key: &[u8]) -> Option<ReferenceCounter<Node>> {
    let mut stack = TraversalStack::new();
    let mut cursor = root.take();

    let mut target = loop {
        let Some(mut node) = cursor else {
            *root = stack.unwind(None);
            return None;
        };
        let current = ReferenceCounter::make_mut(&mut node);
        let direction = match key.cmp(&current.key[..]) {
            Ordering::Less => Direction::Left,
            Ordering::Greater => Direction::Right,
            Ordering::Equal => break node,
        };
        cursor = current.take_child(direction);
        stack.push_frame(node, direction);
    };

    loop {
        let doomed = ReferenceCounter::make_mut(&mut target);
        if doomed.is_leaf() {
            break;
        }
        let direction = match (&doomed.left, &doomed.right) {
            (Some(left), Some(right)) if right.priority < left.priority => Direction::Right,
            (Some(_), _) => Direction::Left,
            (None, _) => Direction::Right,
        };
        push_below(&mut stack, doomed, direction);
    }

    *root = stack.unwind(None);
    Some(target)
}

/// Rotates `child`, currently the `direction` child of `parent`, above it.
///
/// Both nodes must be unique: `parent` comes off the stack and `child` is
/// either freshly inserted or the result of a previous rotation.
fn rotate_above(
    mut parent: ReferenceCounter<Node>,
    mut child: ReferenceCounter<Node>,
    direction: Direction,
) -> ReferenceCounter<Node> {
    let lifted = ReferenceCounter::make_mut(&mut child);
    ReferenceCounter::make_mut(&mut parent).set_child(direction, lifted.take_child(direction.opposite()));
    lifted.set_child(direction.opposite(), Some(parent));
    child
}

/// Promotes the `direction` child of `doomed` into the recorded path.
///
/// The child inherits `doomed`'s place; `doomed` takes the child's inner
/// subtree and will be re-attached below the child when the stack unwinds.
fn push_below(stack: &mut TraversalStack<Frame>, doomed: &mut Node, direction: Direction) {
    if let Some(mut child) = doomed.take_child(direction) {
        let promoted = ReferenceCounter::make_mut(&mut child);
        doomed.set_child(direction, promoted.take_child(direction.opposite()));
        stack.push_frame(child, direction.opposite());
    }
}

/// Walks the whole tree in order, verifying key order and heap order.
pub(crate) fn audit(root: Option<&ReferenceCounter<Node>>) -> Result<Census, InvariantViolation> {
    let mut census = Census::default();
    let mut previous: Option<&Node> = None;
    let mut stack = TraversalStack::new();
    stack.push_left_spine(root);

    while let Some(node) = stack.pop() {
        if let Some(previous) = previous
            && previous.key[..] >= node.key[..]
        {
            return Err(InvariantViolation::KeyOrder {
                previous: previous.key.to_vec(),
                current: node.key.to_vec(),
            });
        }
        for child in [node.left.as_ref(), node.right.as_ref()].into_iter().flatten() {
            if child.priority < node.priority {
                return Err(InvariantViolation::HeapOrder {
                    key: node.key.to_vec(),
                    parent_priority: node.priority,
                    child_priority: child.priority,
                });
            }
        }

        census.count += 1;
        census.size += node.approximate_size();
        previous = Some(node);
        stack.push_left_spine(node.right.as_ref());
    }

    Ok(census)
}
