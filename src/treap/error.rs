//! Error types for treap integrity audits.
//!
//! Lookups and deletions of absent keys are not errors, so no table
//! operation returns `Result`. The only error in this crate describes a
//! broken structural invariant, reported by `check_invariants` on either
//! table. Seeing one means the tree itself is corrupt.

use std::fmt;

/// A structural invariant that a table failed to uphold.
///
/// # Examples
///
/// ```rust
/// use treapstore::InvariantViolation;
///
/// let violation = InvariantViolation::CountMismatch {
///     recorded: 3,
///     reachable: 2,
/// };
/// assert_eq!(
///     format!("{violation}"),
///     "count mismatch: table records 3 entries but 2 are reachable"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// An in-order walk produced `current` right after a key that is not smaller.
    KeyOrder {
        /// The key visited first.
        previous: Vec<u8>,
        /// The key visited next.
        current: Vec<u8>,
    },
    /// A child outranks its parent in the priority heap.
    HeapOrder {
        /// Key of the parent node.
        key: Vec<u8>,
        /// Priority stored on the parent.
        parent_priority: u64,
        /// Priority stored on the offending child.
        child_priority: u64,
    },
    /// The recorded entry count differs from the number of reachable nodes.
    CountMismatch {
        /// Count kept by the table.
        recorded: usize,
        /// Nodes actually reachable from the root.
        reachable: usize,
    },
    /// The recorded byte footprint differs from the sum over reachable nodes.
    SizeMismatch {
        /// Size kept by the table.
        recorded: usize,
        /// Sum of approximate sizes of reachable nodes.
        reachable: usize,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyOrder { previous, current } => write!(
                formatter,
                "key order violated: {previous:02x?} is visited before {current:02x?}"
            ),
            Self::HeapOrder {
                key,
                parent_priority,
                child_priority,
            } => write!(
                formatter,
                "heap order violated below {key:02x?}: child priority {child_priority} ranks before parent priority {parent_priority}"
            ),
            Self::CountMismatch {
                recorded,
                reachable,
            } => write!(
                formatter,
                "count mismatch: table records {recorded} entries but {reachable} are reachable"
            ),
            Self::SizeMismatch {
                recorded,
                reachable,
            } => write!(
                formatter,
                "size mismatch: table records {recorded} bytes but reachable nodes account for {reachable}"
            ),
        }
    }
}

impl std::error::Error for InvariantViolation {}
