//! Persistent (copy-on-write) treap table.
//!
//! [`ImmutableTable`] never changes after it is built. `put` and `delete`
//! copy only the nodes on the path they touch and share every untouched
//! subtree with the receiver, so each call costs O(log N) new nodes and
//! every earlier handle stays valid.
//!
//! # Examples
//!
//! ```rust
//! use treapstore::ImmutableTable;
//!
//! let t0 = ImmutableTable::new();
//! let t1 = t0.put("x", [9u8]);
//! let t2 = t1.delete("x");
//!
//! assert!(!t0.has("x"));
//! assert!(t1.has("x"));
//! assert!(!t2.has("x"));
//! assert_eq!(t1.len(), 1);
//! assert_eq!(t2.len(), 0);
//! ```

use std::fmt;
use std::ops::{Bound, ControlFlow};

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use super::ReferenceCounter;
use super::error::InvariantViolation;
use super::iter::TableIterator;
use super::mutable::MutableTable;
use super::node::{Direction, Link};
use super::tree::{self, Insertion};

/// A persistent ordered byte-string table.
///
/// Cloning a handle is O(1). Any number of threads may read a handle while
/// others derive new versions from it (with the `arc` feature, which is on
/// by default). Making a new version visible to other threads is up to the
/// caller; [`SnapshotCell`](crate::SnapshotCell) is one way.
///
/// # Time Complexity
///
/// | Operation      | Complexity                          |
/// |----------------|-------------------------------------|
/// | `get` / `has`  | O(log N) expected                   |
/// | `put`          | O(log N) expected, O(log N) copies  |
/// | `delete`       | O(log N) expected, O(log N) copies  |
/// | `iter`         | O(N) total                          |
/// | `len` / `size` | O(1)                                |
/// | `clone`        | O(1)                                |
///
/// # Examples
///
/// ```rust
/// use treapstore::ImmutableTable;
///
/// let t0 = ImmutableTable::new();
/// let t1 = t0.put("k", "v1");
/// let t2 = t1.put("k", "v2");
///
/// assert_eq!(t0.get("k"), None);
/// assert_eq!(t1.get("k"), Some(&b"v1"[..]));
/// assert_eq!(t2.get("k"), Some(&b"v2"[..]));
/// ```
#[derive(Clone)]
pub struct ImmutableTable {
    root: Link,
    count: usize,
    total_size: usize,
    /// Priority source for the next version; each derived table owns the advanced state.
    ///
    /// Versions derived from the same receiver start from the same state, so
    /// sibling branches draw repeated priorities. Treap shape stays correct;
    /// only the independence of priorities across branches is lost.
    rng: SmallRng,
}

impl ImmutableTable {
    /// Creates an empty table whose priorities come from system entropy.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(None, 0, 0, SmallRng::from_entropy())
    }

    /// Creates an empty table with a deterministic priority sequence.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::from_parts(None, 0, 0, SmallRng::seed_from_u64(seed))
    }

    pub(crate) const fn from_parts(root: Link, count: usize, total_size: usize, rng: SmallRng) -> Self {
        Self {
            root,
            count,
            total_size,
            rng,
        }
    }

    /// Returns the number of keys in the table.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the table holds no keys.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the approximate memory footprint of the stored entries.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.total_size
    }

    /// Returns the value stored under `key`, or `None` if the key is absent.
    #[must_use]
    pub fn get<K: AsRef<[u8]>>(&self, key: K) -> Option<&[u8]> {
        tree::find(self.root.as_ref(), key.as_ref()).map(|node| &node.value[..])
    }

    /// Returns `true` if `key` is present, including with an empty value.
    #[must_use]
    pub fn has<K: AsRef<[u8]>>(&self, key: K) -> bool {
        tree::find(self.root.as_ref(), key.as_ref()).is_some()
    }

    /// Returns a new table with `value` stored under `key`.
    ///
    /// The receiver is unchanged. The nodes from the root down to `key` are
    /// copied; everything else is shared between the two tables.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treapstore::ImmutableTable;
    ///
    /// let base = ImmutableTable::new().put("a", "1");
    /// let replaced = base.put("a", "");
    ///
    /// assert_eq!(base.get("a"), Some(&b"1"[..]));
    /// assert_eq!(replaced.get("a"), Some(&b""[..]));
    /// assert_eq!(replaced.len(), 1);
    /// assert_eq!(replaced.size(), base.size() - 1);
    /// ```
    #[must_use]
    pub fn put<K, V>(&self, key: K, value: V) -> Self
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let value: ReferenceCounter<[u8]> = ReferenceCounter::from(value.as_ref());
        let new_len = value.len();
        let mut rng = self.rng.clone();
        let priority = rng.next_u64();
        let mut root = self.root.clone();

        let (count, total_size) = match tree::insert(&mut root, key.as_ref(), value, priority) {
            Insertion::Added { size } => (self.count + 1, self.total_size + size),
            Insertion::Replaced { previous_len } => {
                (self.count, self.total_size - previous_len + new_len)
            }
        };

        Self::from_parts(root, count, total_size, rng)
    }

    /// Returns a new table without `key`.
    ///
    /// When `key` is absent the result shares the receiver's root, see
    /// [`ptr_eq`](Self::ptr_eq); no nodes are copied.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treapstore::ImmutableTable;
    ///
    /// let table = ImmutableTable::new().put("a", "1");
    ///
    /// let unchanged = table.delete("zzz");
    /// assert!(unchanged.ptr_eq(&table));
    ///
    /// let removed = table.delete("a");
    /// assert!(removed.is_empty());
    /// assert!(table.has("a"));
    /// ```
    #[must_use]
    pub fn delete<K: AsRef<[u8]>>(&self, key: K) -> Self {
        let key = key.as_ref();
        if !self.has(key) {
            return self.clone();
        }

        let mut root = self.root.clone();
        let Some(removed) = tree::remove(&mut root, key) else {
            return self.clone();
        };

        Self::from_parts(
            root,
            self.count - 1,
            self.total_size - removed.approximate_size(),
            self.rng.clone(),
        )
    }

    /// Returns an ascending iterator over all entries.
    pub fn iter(&self) -> TableIterator<'_> {
        TableIterator::new(self.root.as_ref())
    }

    /// Returns an ascending iterator over the entries between `lower` and `upper`.
    pub fn range<K: AsRef<[u8]>>(&self, lower: Bound<K>, upper: Bound<K>) -> TableIterator<'_> {
        TableIterator::range(
            self.root.as_ref(),
            lower.as_ref().map(AsRef::as_ref),
            upper.as_ref().map(AsRef::as_ref),
        )
    }

    /// Visits every entry in ascending key order until `visit` breaks.
    ///
    /// Safe to call from many threads at once, and while other threads
    /// derive new versions from this table.
    pub fn for_each<B, F>(&self, mut visit: F) -> ControlFlow<B>
    where
        F: FnMut(&[u8], &[u8]) -> ControlFlow<B>,
    {
        self.iter().try_for_each(|(key, value)| visit(key, value))
    }

    /// Returns the entry with the smallest key.
    #[must_use]
    pub fn first(&self) -> Option<(&[u8], &[u8])> {
        tree::extreme(self.root.as_ref(), Direction::Left).map(|node| (&node.key[..], &node.value[..]))
    }

    /// Returns the entry with the largest key.
    #[must_use]
    pub fn last(&self) -> Option<(&[u8], &[u8])> {
        tree::extreme(self.root.as_ref(), Direction::Right).map(|node| (&node.key[..], &node.value[..]))
    }

    /// Returns `true` if both handles share the same root allocation.
    ///
    /// Tables that are `ptr_eq` hold identical contents. The converse does
    /// not hold; use `==` to compare contents.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (Some(left), Some(right)) => ReferenceCounter::ptr_eq(left, right),
            (None, None) => true,
            _ => false,
        }
    }

    /// Returns a [`MutableTable`] seeded with this table's contents.
    ///
    /// O(1): nodes are copied lazily, the first time a write touches them.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treapstore::ImmutableTable;
    ///
    /// let base: ImmutableTable = [("a", "1"), ("b", "2")].into_iter().collect();
    ///
    /// let mut batch = base.mutable();
    /// batch.put("c", "3");
    /// batch.delete("a");
    /// let next = batch.into_immutable();
    ///
    /// assert_eq!(base.len(), 2);
    /// assert_eq!(next.len(), 2);
    /// assert!(next.has("c") && !next.has("a"));
    /// ```
    #[must_use]
    pub fn mutable(&self) -> MutableTable {
        tracing::trace!(len = self.count, size = self.total_size, "opening mutable table over snapshot");
        MutableTable::from_parts(self.root.clone(), self.count, self.total_size, self.rng.clone())
    }

    /// Audits the tree against every structural invariant.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        super::verify(self.root.as_ref(), self.count, self.total_size)
    }
}

impl Default for ImmutableTable {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl From<MutableTable> for ImmutableTable {
    fn from(table: MutableTable) -> Self {
        table.into_immutable()
    }
}

impl<K, V> FromIterator<(K, V)> for ImmutableTable
where
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter().collect::<MutableTable>().into_immutable()
    }
}

impl<'a> IntoIterator for &'a ImmutableTable {
    type Item = (&'a [u8], &'a [u8]);
    type IntoIter = TableIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl PartialEq for ImmutableTable {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count && (self.ptr_eq(other) || self.iter().eq(other.iter()))
    }
}

impl Eq for ImmutableTable {}

impl fmt::Debug for ImmutableTable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(feature = "arc")]
static_assertions::assert_impl_all!(ImmutableTable: Send, Sync);

#[cfg(not(feature = "arc"))]
static_assertions::assert_not_impl_any!(ImmutableTable: Send, Sync);
