//! # treapstore
//!
//! Ordered in-memory key/value tables for chain-state snapshots, built on
//! randomized balanced binary search trees (treaps).
//!
//! ## Overview
//!
//! The crate is the in-memory layer of a block-chain node's storage stack,
//! the equivalent of a database memtable. Keys and values are opaque byte
//! strings and keys are ordered lexicographically. Two flavors share one
//! tree representation:
//!
//! - [`MutableTable`]: a single writer edits the tree in place
//! - [`ImmutableTable`]: every `put`/`delete` returns a new version; old
//!   versions stay readable from any thread
//! - [`SnapshotCell`]: publishes the latest [`ImmutableTable`] to readers
//!
//! Disk persistence and the encoding of keys and values belong to the
//! layers that wrap these tables.
//!
//! ## Feature Flags
//!
//! - `arc` (default): nodes are shared with `Arc`, so snapshots are `Send + Sync`
//! - `snapshot` (default): [`SnapshotCell`], built on `parking_lot`
//!
//! ## Example
//!
//! ```rust
//! use treapstore::prelude::*;
//!
//! let t0 = ImmutableTable::new();
//! let t1 = t0.put("x", [9u8]);
//! let t2 = t1.delete("x");
//!
//! assert!(!t0.has("x"));
//! assert!(t1.has("x"));
//! assert!(!t2.has("x"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use treapstore::prelude::*;
/// ```
pub mod prelude {
    pub use crate::treap::*;
}

pub mod treap;

pub use treap::{ImmutableTable, InvariantViolation, MutableTable, NODE_OVERHEAD, TableIterator};

#[cfg(feature = "snapshot")]
pub use treap::SnapshotCell;
