//! Publication of the latest [`ImmutableTable`].
//!
//! Tables are lock-free to read, but readers still need to find out which
//! version is current. [`SnapshotCell`] holds that one handle. Loading
//! clones the handle under a short read lock. Publishing swaps it under a
//! short write lock. No lock is held while a table is read or built.

use parking_lot::{Mutex, RwLock};

use super::immutable::ImmutableTable;

/// A shared slot holding the current snapshot.
///
/// # Examples
///
/// ```rust
/// use treapstore::{ImmutableTable, SnapshotCell};
///
/// let cell = SnapshotCell::new(ImmutableTable::new());
/// let before = cell.load();
///
/// cell.update(|current| current.put("utxo", "spent"));
///
/// assert!(!before.has("utxo"));
/// assert!(cell.load().has("utxo"));
/// ```
#[derive(Debug, Default)]
pub struct SnapshotCell {
    current: RwLock<ImmutableTable>,
    /// Serializes `publish` and `update` callers so that no version is lost.
    writer: Mutex<()>,
}

impl SnapshotCell {
    /// Creates a cell publishing `initial`.
    #[must_use]
    pub fn new(initial: ImmutableTable) -> Self {
        Self {
            current: RwLock::new(initial),
            writer: Mutex::new(()),
        }
    }

    /// Returns the current snapshot.
    ///
    /// The returned handle stays valid and unchanged regardless of later
    /// publications.
    #[must_use]
    pub fn load(&self) -> ImmutableTable {
        self.current.read().clone()
    }

    /// Makes `table` the current snapshot and returns the one it replaces.
    ///
    /// Waits for any `update` in progress, so a publication is never
    /// overwritten by a version derived from the handle it replaced.
    pub fn publish(&self, table: ImmutableTable) -> ImmutableTable {
        let _writer = self.writer.lock();
        self.swap(table)
    }

    /// Derives a new snapshot from the current one and publishes it.
    ///
    /// Writers run one after another: `update` and `publish` calls each see
    /// the result of the previous one. `derive` runs without blocking
    /// readers but must not call `publish` or `update` on the same cell.
    /// Returns the newly published snapshot.
    pub fn update<F>(&self, derive: F) -> ImmutableTable
    where
        F: FnOnce(&ImmutableTable) -> ImmutableTable,
    {
        let _writer = self.writer.lock();
        let next = derive(&self.load());
        self.swap(next.clone());
        next
    }

    /// Swaps the current handle. Callers hold `writer`.
    fn swap(&self, table: ImmutableTable) -> ImmutableTable {
        tracing::debug!(len = table.len(), size = table.size(), "publishing snapshot");
        std::mem::replace(&mut *self.current.write(), table)
    }
}
