//! In-place treap table.
//!
//! [`MutableTable`] edits its tree directly: every node it owns exclusively
//! is updated in place and rotations only re-link existing allocations.
//! It is the write-side buffer of the store, the table a single writer
//! fills before handing out a frozen [`ImmutableTable`] via
//! [`MutableTable::snapshot`].

use std::fmt;
use std::ops::{Bound, ControlFlow};

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use super::ReferenceCounter;
use super::error::InvariantViolation;
use super::immutable::ImmutableTable;
use super::iter::TableIterator;
use super::node::{Direction, Link};
use super::tree::{self, Insertion};

/// An ordered byte-string table that is updated in place.
///
/// Keys are compared lexicographically byte by byte. A stored empty value
/// is distinct from an absent key: `get` returns `Some(&[])` for the former
/// and `None` for the latter.
///
/// Mutation takes `&mut self`, so the borrow checker enforces the single
/// writer. Readers that need to keep working while the writer continues
/// take a [`snapshot`](Self::snapshot) instead.
///
/// # Time Complexity
///
/// | Operation      | Complexity         |
/// |----------------|--------------------|
/// | `get` / `has`  | O(log N) expected  |
/// | `put`          | O(log N) expected  |
/// | `delete`       | O(log N) expected  |
/// | `iter`         | O(N) total         |
/// | `len` / `size` | O(1)               |
/// | `snapshot`     | O(1)               |
/// | `reset`        | O(1) plus teardown |
///
/// # Examples
///
/// ```rust
/// use treapstore::MutableTable;
///
/// let mut table = MutableTable::new();
/// table.put("a", [1u8]);
/// table.put("b", [2u8]);
/// table.put("a", [3u8]);
///
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.get("a"), Some(&[3][..]));
/// assert_eq!(table.get("b"), Some(&[2][..]));
/// ```
#[derive(Clone)]
pub struct MutableTable {
    root: Link,
    count: usize,
    total_size: usize,
    rng: SmallRng,
}

impl MutableTable {
    /// Creates an empty table whose priorities come from system entropy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    /// Creates an empty table with a deterministic priority sequence.
    ///
    /// Two tables built with the same seed and the same sequence of
    /// operations have identical shapes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treapstore::MutableTable;
    ///
    /// let mut table = MutableTable::with_seed(42);
    /// table.put("key", "value");
    /// assert!(table.has("key"));
    /// ```
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    pub(crate) const fn with_rng(rng: SmallRng) -> Self {
        Self::from_parts(None, 0, 0, rng)
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
    ///
    /// The sum over all entries of key length, value length and
    /// [`NODE_OVERHEAD`](crate::NODE_OVERHEAD).
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

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// Replacing keeps the key's position and priority and adjusts
    /// [`size`](Self::size) by the difference in value length only.
    pub fn put<K, V>(&mut self, key: K, value: V)
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let value: ReferenceCounter<[u8]> = ReferenceCounter::from(value.as_ref());
        let new_len = value.len();
        let priority = self.rng.next_u64();

        match tree::insert(&mut self.root, key.as_ref(), value, priority) {
            Insertion::Added { size } => {
                self.count += 1;
                self.total_size += size;
            }
            Insertion::Replaced { previous_len } => {
                debug_assert!(self.total_size >= previous_len);
                self.total_size = self.total_size - previous_len + new_len;
            }
        }
    }

    /// Removes `key` from the table.
    ///
    /// Returns `true` if the key was present. Deleting an absent key leaves
    /// the table untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treapstore::MutableTable;
    ///
    /// let mut table = MutableTable::new();
    /// table.put("a", "1");
    ///
    /// assert!(table.delete("a"));
    /// assert!(!table.delete("a"));
    /// assert!(table.is_empty());
    /// assert_eq!(table.size(), 0);
    /// ```
    pub fn delete<K: AsRef<[u8]>>(&mut self, key: K) -> bool {
        let Some(removed) = tree::remove(&mut self.root, key.as_ref()) else {
            return false;
        };
        debug_assert!(self.count > 0);
        self.count -= 1;
        self.total_size -= removed.approximate_size();
        true
    }

    /// Drops every entry.
    pub fn reset(&mut self) {
        tracing::trace!(len = self.count, size = self.total_size, "resetting mutable table");
        self.root = None;
        self.count = 0;
        self.total_size = 0;
    }

    /// Returns an ascending iterator over all entries.
    pub fn iter(&self) -> TableIterator<'_> {
        TableIterator::new(self.root.as_ref())
    }

    /// Returns an ascending iterator over the entries between `lower` and `upper`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::ops::Bound;
    /// use treapstore::MutableTable;
    ///
    /// let table: MutableTable = [("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect();
    /// let keys: Vec<&[u8]> = table
    ///     .range(Bound::Included("b"), Bound::Unbounded)
    ///     .map(|(key, _)| key)
    ///     .collect();
    /// assert_eq!(keys, vec![b"b", b"c"]);
    /// ```
    pub fn range<K: AsRef<[u8]>>(&self, lower: Bound<K>, upper: Bound<K>) -> TableIterator<'_> {
        TableIterator::range(
            self.root.as_ref(),
            lower.as_ref().map(AsRef::as_ref),
            upper.as_ref().map(AsRef::as_ref),
        )
    }

    /// Visits every entry in ascending key order until `visit` breaks.
    ///
    /// Returns the break value, or `ControlFlow::Continue(())` when every
    /// entry was visited.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::ops::ControlFlow;
    /// use treapstore::MutableTable;
    ///
    /// let table: MutableTable = [("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect();
    ///
    /// let mut seen = Vec::new();
    /// let outcome = table.for_each(|key, _| {
    ///     seen.push(key.to_vec());
    ///     if key == b"b" { ControlFlow::Break(key.len()) } else { ControlFlow::Continue(()) }
    /// });
    /// assert_eq!(outcome, ControlFlow::Break(1));
    /// assert_eq!(seen, vec![b"a".to_vec(), b"b".to_vec()]);
    /// ```
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

    /// Freezes the current contents into an [`ImmutableTable`].
    ///
    /// O(1): the snapshot shares the whole tree. Later writes to this table
    /// copy whichever shared nodes they touch, so the snapshot never changes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treapstore::MutableTable;
    ///
    /// let mut table = MutableTable::new();
    /// table.put("a", "1");
    /// let frozen = table.snapshot();
    /// table.put("a", "2");
    /// table.delete("a");
    ///
    /// assert_eq!(frozen.get("a"), Some(&b"1"[..]));
    /// assert!(!table.has("a"));
    /// ```
    #[must_use]
    pub fn snapshot(&self) -> ImmutableTable {
        tracing::trace!(len = self.count, size = self.total_size, "snapshotting mutable table");
        ImmutableTable::from_parts(self.root.clone(), self.count, self.total_size, self.rng.clone())
    }

    /// Converts this table into an [`ImmutableTable`] without sharing.
    #[must_use]
    pub fn into_immutable(self) -> ImmutableTable {
        ImmutableTable::from_parts(self.root, self.count, self.total_size, self.rng)
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

impl Default for MutableTable {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Extend<(K, V)> for MutableTable
where
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for MutableTable
where
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        table.extend(iter);
        table
    }
}

impl<'a> IntoIterator for &'a MutableTable {
    type Item = (&'a [u8], &'a [u8]);
    type IntoIter = TableIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl PartialEq for MutableTable {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count && self.iter().eq(other.iter())
    }
}

impl Eq for MutableTable {}

impl fmt::Debug for MutableTable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}
