//! Treap-backed ordered key/value tables.
//!
//! This module provides the two table flavors of the store:
//!
//! - [`MutableTable`]: updated in place by a single writer
//! - [`ImmutableTable`]: persistent; every update returns a new version
//!   and leaves the old one valid
//!
//! Both are treaps: binary search trees over byte-string keys whose shape
//! is kept balanced in expectation by a random priority on every node.
//! They share one node type, so [`MutableTable::snapshot`] and
//! [`ImmutableTable::mutable`] convert between the two in O(1).
//!
//! # Structural Sharing
//!
//! Nodes are reference counted. A node reachable from more than one table
//! is never modified; a write that reaches it copies it first. A table that
//! owns its nodes exclusively therefore updates in place, while a table
//! sharing nodes with older versions copies exactly the root-to-target path.
//!
//! # Examples
//!
//! ```rust
//! use treapstore::{ImmutableTable, MutableTable};
//!
//! let mut pending = MutableTable::new();
//! pending.put("b", "2");
//! pending.put("a", "1");
//!
//! let committed: ImmutableTable = pending.snapshot();
//! pending.reset();
//!
//! let keys: Vec<&[u8]> = committed.iter().map(|(key, _)| key).collect();
//! assert_eq!(keys, vec![b"a", b"b"]);
//! assert!(pending.is_empty());
//! ```

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled (default), this is `std::sync::Arc`,
/// which lets snapshots cross threads.
///
/// When the `arc` feature is disabled, this is `std::rc::Rc`,
/// which is cheaper but confines every table to one thread.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

mod error;
mod immutable;
mod iter;
mod mutable;
mod node;
#[cfg(feature = "snapshot")]
mod snapshot;
mod stack;
mod tree;

pub use error::InvariantViolation;
pub use immutable::ImmutableTable;
pub use iter::TableIterator;
pub use mutable::MutableTable;
pub use node::NODE_OVERHEAD;
#[cfg(feature = "snapshot")]
pub use snapshot::SnapshotCell;

/// Audits the tree under `root` and compares it with the recorded totals.
fn verify(
    root: Option<&ReferenceCounter<node::Node>>,
    count: usize,
    total_size: usize,
) -> Result<(), InvariantViolation> {
    let outcome = tree::audit(root).and_then(|census| {
        if census.count != count {
            Err(InvariantViolation::CountMismatch {
                recorded: count,
                reachable: census.count,
            })
        } else if census.size != total_size {
            Err(InvariantViolation::SizeMismatch {
                recorded: total_size,
                reachable: census.size,
            })
        } else {
            Ok(())
        }
    });

    if let Err(violation) = &outcome {
        tracing::debug!(%violation, "treap audit failed");
    }
    outcome
}

// =============================================================================
// Tests
// =============================================================================
