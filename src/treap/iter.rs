//! Lazy in-order iteration.

use std::iter::FusedIterator;
use std::ops::Bound;

use super::ReferenceCounter;
use super::node::Node;
use super::stack::TraversalStack;

/// An ascending iterator over the entries of a table.
///
/// Produced by `iter` and `range` on both
/// [`MutableTable`](crate::MutableTable) and
/// [`ImmutableTable`](crate::ImmutableTable). It walks the tree with an
/// explicit stack holding at most one root-to-leaf path, so creating one is
/// O(height) and each step is amortized O(1).
///
/// # Examples
///
/// ```rust
/// use std::ops::Bound;
/// use treapstore::ImmutableTable;
///
/// let table = ImmutableTable::new()
///     .put("b", "2")
///     .put("a", "1")
///     .put("c", "3");
///
/// let keys: Vec<&[u8]> = table.iter().map(|(key, _)| key).collect();
/// assert_eq!(keys, vec![b"a", b"b", b"c"]);
///
/// let tail: Vec<&[u8]> = table
///     .range(Bound::Excluded(b"a"), Bound::Unbounded)
///     .map(|(key, _)| key)
///     .collect();
/// assert_eq!(tail, vec![b"b", b"c"]);
/// ```
pub struct TableIterator<'a> {
    stack: TraversalStack<&'a Node>,
    upper: Bound<Box<[u8]>>,
}

impl<'a> TableIterator<'a> {
    pub(crate) fn new(root: Option<&'a ReferenceCounter<Node>>) -> Self {
        let mut stack = TraversalStack::new();
        stack.push_left_spine(root);
        Self {
            stack,
            upper: Bound::Unbounded,
        }
    }

    /// Seeks to the first key satisfying `lower` and stops past `upper`.
    pub(crate) fn range(
        root: Option<&'a ReferenceCounter<Node>>,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
    ) -> Self {
        let mut stack = TraversalStack::new();
        let mut link = root;
        while let Some(node) = link {
            let key = &node.key[..];
            let at_or_above = match lower {
                Bound::Included(start) => key >= start,
                Bound::Excluded(start) => key > start,
                Bound::Unbounded => true,
            };
            if at_or_above {
                stack.push(&**node);
                link = node.left.as_ref();
            } else {
                link = node.right.as_ref();
            }
        }

        Self {
            stack,
            upper: upper.map(Box::from),
        }
    }

    fn below_upper(&self, key: &[u8]) -> bool {
        match &self.upper {
            Bound::Included(limit) => key <= &limit[..],
            Bound::Excluded(limit) => key < &limit[..],
            Bound::Unbounded => true,
        }
    }
}

impl<'a> Iterator for TableIterator<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if !self.below_upper(&node.key) {
            self.stack.clear();
            return None;
        }
        self.stack.push_left_spine(node.right.as_ref());
        Some((&node.key[..], &node.value[..]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.stack.is_empty() {
            (0, Some(0))
        } else {
            (0, None)
        }
    }
}

impl FusedIterator for TableIterator<'_> {}
