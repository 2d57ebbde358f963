use crate::array::Array;
use crate::error::{PoolTabError, Result};
use crate::pool::{Pool, Span};

pub(crate) const TABLE_HASH_SIZE: usize = 32;
const TABLE_INDEX_MASK: u8 = 0x1f;

/// Case-folding mask applied to the 4-byte key checksum. Folds the ASCII
/// case bit out of each byte; the `ebcdic` feature selects the mask for
/// EBCDIC-based character sets instead.
#[cfg(not(feature = "ebcdic"))]
const CASE_MASK: u32 = 0xdfdf_dfdf;
#[cfg(feature = "ebcdic")]
const CASE_MASK: u32 = 0xbfbf_bfbf;

const DEFAULT_CAPACITY: usize = 8;

/// Computes the checksum for a key: its first four bytes, case-folded and
/// packed into one integer, zero-padded when the key is shorter. A single
/// integer comparison then rules out most non-matches before the full
/// case-insensitive key comparison runs.
pub(crate) fn key_checksum(key: &str) -> u32 {
    let mut bytes = key.bytes();
    let mut checksum = u32::from(bytes.next().unwrap_or(0));
    for _ in 0..3 {
        checksum <<= 8;
        if let Some(b) = bytes.next() {
            checksum |= u32::from(b);
        }
    }
    checksum & CASE_MASK
}

/// Bucket id for a key: the low 5 bits of its first raw byte.
///
/// Bucketing is NOT case-normalized, so two keys differing only in the case
/// of their first letter may land in different buckets. That is fine: a
/// bucket range only has to be a superset hint for the scan, and the
/// checksum plus the case-insensitive comparison do the real equality test.
#[allow(clippy::indexing_slicing)]
fn table_hash(key: &str) -> usize {
    debug_assert!(!key.is_empty());
    (key.as_bytes()[0] & TABLE_INDEX_MASK) as usize
}

/// One key/value entry of a [`Table`].
///
/// Key and value are spans into the pool the table was built against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub(crate) key: Span,
    pub(crate) val: Span,
    pub(crate) checksum: u32,
}

impl Entry {
    /// Span of the key string.
    #[must_use]
    pub fn key_span(&self) -> Span {
        self.key
    }

    /// Span of the value string.
    #[must_use]
    pub fn val_span(&self) -> Span {
        self.val
    }

    /// Resolves the key against its pool.
    #[must_use]
    pub fn key<'p>(&self, pool: &'p Pool) -> &'p str {
        pool.get(self.key)
    }

    /// Resolves the value against its pool.
    #[must_use]
    pub fn value<'p>(&self, pool: &'p Pool) -> &'p str {
        pool.get(self.val)
    }

    /// The stored case-folded key checksum.
    #[must_use]
    pub fn key_checksum(&self) -> u32 {
        self.checksum
    }
}

/// Callback fired when an append meets a full backing array, just before the
/// array grows: `(len, capacity)`.
pub type CapacityProbe = Box<dyn Fn(usize, usize)>;

/// An ordered, multi-valued, case-insensitive string-keyed table.
///
/// Entries keep insertion order. Lookups go through a 32-bucket index keyed
/// by the first byte of the key: each initialized bucket bounds the range of
/// offsets that can contain entries for keys in that bucket, so a miss on an
/// uninitialized bucket is O(1) and a hit scans only the bucket's range.
///
/// A key may hold several live values at once (via [`add`](Table::add)),
/// which [`set`](Table::set), [`unset`](Table::unset) and the compaction
/// operations collapse back to at most one.
///
/// All key and value strings live in a [`Pool`] supplied per call; every
/// method must be used with the pool the table's entries were built against.
pub struct Table {
    pub(crate) a: Array<Entry>,
    pub(crate) index_initialized: u32,
    pub(crate) index_first: [usize; TABLE_HASH_SIZE],
    pub(crate) index_last: [usize; TABLE_HASH_SIZE],
    probe: Option<CapacityProbe>,
}

impl core::fmt::Debug for Table {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Table")
            .field("entries", &self.a)
            .field("index_initialized", &self.index_initialized)
            .finish_non_exhaustive()
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    /// Creates an empty table with a small default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an empty table with room for `hint` entries.
    #[must_use]
    pub fn with_capacity(hint: usize) -> Self {
        Self {
            a: Array::with_capacity(hint),
            index_initialized: 0,
            index_first: [0; TABLE_HASH_SIZE],
            index_last: [0; TABLE_HASH_SIZE],
            probe: None,
        }
    }

    /// Creates an empty table with a capacity probe.
    ///
    /// The probe fires whenever an append finds the backing array full,
    /// before the array grows. Useful to spot tables created with a
    /// too-small capacity hint.
    #[must_use]
    pub fn with_capacity_and_probe(hint: usize, probe: CapacityProbe) -> Self {
        let mut t = Self::with_capacity(hint);
        t.probe = Some(probe);
        t
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.a.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    /// The entries in table order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        self.a.as_slice()
    }

    /// Drops all entries; capacity is retained.
    pub fn clear(&mut self) {
        self.a.clear();
        self.index_initialized = 0;
    }

    pub(crate) fn bucket_is_set(&self, hash: usize) -> bool {
        self.index_initialized & (1 << hash) != 0
    }

    fn set_bucket(&mut self, hash: usize) {
        self.index_initialized |= 1 << hash;
    }

    fn push_entry(&mut self, entry: Entry) {
        if self.a.len() == self.a.capacity() {
            if let Some(probe) = &self.probe {
                probe(self.a.len(), self.a.capacity());
            }
        }
        self.a.push_value(entry);
    }

    /// Appends an entry whose spans are already allocated, maintaining the
    /// bucket index incrementally.
    fn append_new(&mut self, hash: usize, entry: Entry) {
        if !self.bucket_is_set(hash) {
            self.index_first[hash] = self.a.len();
            self.set_bucket(hash);
        }
        self.index_last[hash] = self.a.len();
        self.push_entry(entry);
    }

    /// Offset of the first entry in the bucket range matching `key`, if any.
    #[allow(clippy::indexing_slicing)]
    fn find_in_bucket(&self, pool: &Pool, hash: usize, checksum: u32, key: &str) -> Option<usize> {
        let slice = self.a.as_slice();
        for i in self.index_first[hash]..=self.index_last[hash] {
            let e = &slice[i];
            if e.checksum == checksum && pool.get(e.key).eq_ignore_ascii_case(key) {
                return Some(i);
            }
        }
        None
    }

    /// Recomputes the whole bucket index from the entries. O(n).
    pub(crate) fn reindex(&mut self, pool: &Pool) {
        trace!("reindexing table with {} entries", self.a.len());
        self.index_initialized = 0;
        for (i, e) in self.a.as_slice().iter().enumerate() {
            let hash = (pool.bytes(e.key)[0] & TABLE_INDEX_MASK) as usize;
            self.index_last[hash] = i;
            if self.index_initialized & (1 << hash) == 0 {
                self.index_first[hash] = i;
                self.index_initialized |= 1 << hash;
            }
        }
    }

    /// Returns the value of the earliest entry matching `key`,
    /// case-insensitively, or `None`.
    ///
    /// An empty key never matches.
    #[must_use]
    #[allow(clippy::indexing_slicing)]
    pub fn get<'p>(&self, pool: &'p Pool, key: &str) -> Option<&'p str> {
        if key.is_empty() {
            return None;
        }
        let hash = table_hash(key);
        if !self.bucket_is_set(hash) {
            return None;
        }
        let checksum = key_checksum(key);
        let found = self.find_in_bucket(pool, hash, checksum, key)?;
        Some(pool.get(self.a.as_slice()[found].val))
    }

    /// Collects all values for `key` in table order.
    ///
    /// Returns `None` for zero matches, the stored span directly for exactly
    /// one match (no allocation), or a comma-joined pool string for more.
    ///
    /// # Errors
    ///
    /// Returns `PoolTabError::PoolExhausted` if joining multiple values would
    /// exceed the pool's limit.
    #[allow(clippy::indexing_slicing)]
    pub fn getm(&self, pool: &mut Pool, key: &str) -> Result<Option<Span>> {
        if key.is_empty() {
            return Ok(None);
        }
        let hash = table_hash(key);
        if !self.bucket_is_set(hash) {
            return Ok(None);
        }
        let checksum = key_checksum(key);
        let mut first: Option<Span> = None;
        let mut merged: Vec<Span> = Vec::new();
        let slice = self.a.as_slice();
        for i in self.index_first[hash]..=self.index_last[hash] {
            let e = &slice[i];
            if e.checksum == checksum && pool.get(e.key).eq_ignore_ascii_case(key) {
                // The common case is a single value; defer any allocation
                // until a second match shows up.
                match first {
                    None => first = Some(e.val),
                    Some(f) => {
                        if merged.is_empty() {
                            merged.push(f);
                        }
                        merged.push(e.val);
                    }
                }
            }
        }
        if merged.is_empty() {
            return Ok(first);
        }
        Ok(Some(pool.join(&merged, ",")?))
    }

    /// Sets `key` to `value`, copying both into the pool.
    ///
    /// If the key already exists, its earliest entry is overwritten in place
    /// and any later duplicates are removed, so exactly one entry remains at
    /// the position of the first prior occurrence. A new key is appended.
    ///
    /// # Errors
    ///
    /// Returns `PoolTabError::EmptyKey` for an empty key and
    /// `PoolTabError::PoolExhausted` if copying would exceed the pool limit.
    pub fn set(&mut self, pool: &mut Pool, key: &str, value: &str) -> Result<()> {
        if key.is_empty() {
            return Err(PoolTabError::EmptyKey);
        }
        let checksum = key_checksum(key);
        let hash = table_hash(key);
        if self.bucket_is_set(hash) {
            if let Some(found) = self.find_in_bucket(pool, hash, checksum, key) {
                let new_val = pool.push_str(value)?;
                self.overwrite_and_dedup(pool, hash, found, checksum, key, new_val);
                return Ok(());
            }
        }
        let entry = Entry {
            key: pool.push_str(key)?,
            val: pool.push_str(value)?,
            checksum,
        };
        self.append_new(hash, entry);
        Ok(())
    }

    /// [`set`](Table::set) without copying: stores spans already owned by
    /// the pool.
    ///
    /// # Errors
    ///
    /// Returns `PoolTabError::EmptyKey` for an empty key span.
    pub fn set_span(&mut self, pool: &Pool, key: Span, value: Span) -> Result<()> {
        if key.is_empty() {
            return Err(PoolTabError::EmptyKey);
        }
        let key_str = pool.get(key);
        let checksum = key_checksum(key_str);
        let hash = table_hash(key_str);
        if self.bucket_is_set(hash) {
            if let Some(found) = self.find_in_bucket(pool, hash, checksum, key_str) {
                self.overwrite_and_dedup(pool, hash, found, checksum, key_str, value);
                return Ok(());
            }
        }
        let entry = Entry {
            key,
            val: value,
            checksum,
        };
        self.append_new(hash, entry);
        Ok(())
    }

    /// Overwrites the found entry's value and compacts away any further
    /// entries with the same key inside the bucket range. Reindexes only if
    /// something was removed.
    #[allow(clippy::indexing_slicing)]
    fn overwrite_and_dedup(
        &mut self,
        pool: &Pool,
        hash: usize,
        found: usize,
        checksum: u32,
        key: &str,
        new_val: Span,
    ) {
        let end = self.index_last[hash];
        let table_len = self.a.len();
        let slice = self.a.as_mut_slice();
        slice[found].val = new_val;

        // Remove any other instances of this key.
        let mut dst: Option<usize> = None;
        let mut removed = 0;
        for j in found + 1..=end {
            let e = slice[j];
            if e.checksum == checksum && pool.get(e.key).eq_ignore_ascii_case(key) {
                removed += 1;
                if dst.is_none() {
                    dst = Some(j);
                }
            } else if let Some(d) = dst {
                slice[d] = e;
                dst = Some(d + 1);
            }
        }

        // The scan above stopped at the bucket's last offset, not the end of
        // the table; shift the remainder over the holes.
        if let Some(mut d) = dst {
            for j in end + 1..table_len {
                slice[d] = slice[j];
                d += 1;
            }
            self.a.truncate(table_len - removed);
            self.reindex(pool);
        }
    }

    /// Removes every entry matching `key`, case-insensitively.
    ///
    /// No-op if the key is absent (or empty).
    #[allow(clippy::indexing_slicing)]
    pub fn unset(&mut self, pool: &Pool, key: &str) {
        if key.is_empty() {
            return;
        }
        let hash = table_hash(key);
        if !self.bucket_is_set(hash) {
            return;
        }
        let checksum = key_checksum(key);
        let Some(found) = self.find_in_bucket(pool, hash, checksum, key) else {
            return;
        };
        let end = self.index_last[hash];
        let table_len = self.a.len();
        let slice = self.a.as_mut_slice();

        // Remove the match plus any additional matches up to the bucket end.
        let mut removed = 1;
        let mut d = found;
        for j in found + 1..=end {
            let e = slice[j];
            if e.checksum == checksum && pool.get(e.key).eq_ignore_ascii_case(key) {
                removed += 1;
            } else {
                slice[d] = e;
                d += 1;
            }
        }
        // Shift the remainder of the table.
        for j in end + 1..table_len {
            slice[d] = slice[j];
            d += 1;
        }
        self.a.truncate(table_len - removed);
        self.reindex(pool);
    }

    /// Merges `value` onto `key`: an existing entry's value gets `", "` and
    /// the new value concatenated onto it in place; a missing key is
    /// appended like [`set`](Table::set)'s miss path.
    ///
    /// # Errors
    ///
    /// Returns `PoolTabError::EmptyKey` for an empty key and
    /// `PoolTabError::PoolExhausted` if the pool limit would be exceeded.
    #[allow(clippy::indexing_slicing)]
    pub fn merge(&mut self, pool: &mut Pool, key: &str, value: &str) -> Result<()> {
        if key.is_empty() {
            return Err(PoolTabError::EmptyKey);
        }
        let checksum = key_checksum(key);
        let hash = table_hash(key);
        if self.bucket_is_set(hash) {
            if let Some(found) = self.find_in_bucket(pool, hash, checksum, key) {
                let old = self.a.as_slice()[found].val;
                let joined = pool.concat(old, ", ", value)?;
                self.a.as_mut_slice()[found].val = joined;
                return Ok(());
            }
        }
        let entry = Entry {
            key: pool.push_str(key)?,
            val: pool.push_str(value)?,
            checksum,
        };
        self.append_new(hash, entry);
        Ok(())
    }

    /// [`merge`](Table::merge) without copying on the miss path: stores
    /// spans already owned by the pool. A hit still allocates the joined
    /// value.
    ///
    /// # Errors
    ///
    /// Returns `PoolTabError::EmptyKey` for an empty key span and
    /// `PoolTabError::PoolExhausted` if joining would exceed the pool limit.
    #[allow(clippy::indexing_slicing)]
    pub fn merge_span(&mut self, pool: &mut Pool, key: Span, value: Span) -> Result<()> {
        if key.is_empty() {
            return Err(PoolTabError::EmptyKey);
        }
        let checksum = key_checksum(pool.get(key));
        let hash = table_hash(pool.get(key));
        if self.bucket_is_set(hash) {
            let key_str = pool.get(key);
            if let Some(found) = self.find_in_bucket(pool, hash, checksum, key_str) {
                let old = self.a.as_slice()[found].val;
                let joined = pool.join(&[old, value], ", ")?;
                self.a.as_mut_slice()[found].val = joined;
                return Ok(());
            }
        }
        let entry = Entry {
            key,
            val: value,
            checksum,
        };
        self.append_new(hash, entry);
        Ok(())
    }

    /// Appends an entry for `key` unconditionally, copying key and value
    /// into the pool. Existing entries for the key stay untouched; this is
    /// how a key legitimately holds several values (repeated header fields).
    ///
    /// # Errors
    ///
    /// Returns `PoolTabError::EmptyKey` for an empty key and
    /// `PoolTabError::PoolExhausted` if copying would exceed the pool limit.
    pub fn add(&mut self, pool: &mut Pool, key: &str, value: &str) -> Result<()> {
        if key.is_empty() {
            return Err(PoolTabError::EmptyKey);
        }
        let checksum = key_checksum(key);
        let hash = table_hash(key);
        let entry = Entry {
            key: pool.push_str(key)?,
            val: pool.push_str(value)?,
            checksum,
        };
        self.append_new(hash, entry);
        Ok(())
    }

    /// [`add`](Table::add) without copying: stores spans already owned by
    /// the pool.
    ///
    /// # Errors
    ///
    /// Returns `PoolTabError::EmptyKey` for an empty key span.
    pub fn add_span(&mut self, pool: &Pool, key: Span, value: Span) -> Result<()> {
        if key.is_empty() {
            return Err(PoolTabError::EmptyKey);
        }
        let key_str = pool.get(key);
        let checksum = key_checksum(key_str);
        let hash = table_hash(key_str);
        let entry = Entry {
            key,
            val: value,
            checksum,
        };
        self.append_new(hash, entry);
        Ok(())
    }

    /// Builds a new table whose entries are `overlay`'s followed by `base`'s.
    ///
    /// `overlay`'s storage is shared (copy-on-append) until the result is
    /// itself appended to. Lookups on the result prefer `overlay`'s value
    /// for any key present in both.
    ///
    /// # Panics
    ///
    /// Panics if either table's entries were not built against `pool`.
    #[must_use]
    pub fn overlay(pool: &Pool, overlay: &Table, base: &Table) -> Table {
        let mut a = overlay.a.copy_header();
        a.cat(&base.a);
        let mut res = Table {
            a,
            index_initialized: 0,
            index_first: [0; TABLE_HASH_SIZE],
            index_last: [0; TABLE_HASH_SIZE],
            probe: None,
        };
        res.reindex(pool);
        res
    }

    /// Walks entries and hands each key/value pair to `f` until `f` asks to
    /// stop by returning `false`.
    ///
    /// With an empty `keys`, every entry is visited in table order and a
    /// stop signal ends the whole walk. With key arguments, each key's
    /// matches are visited in table order, but a stop signal only ends the
    /// scan for *that* key; the remaining keys still run. Long-standing
    /// behavior, kept because callers may use it to skip ahead once they
    /// have seen enough of one key; see
    /// [`iterate_until`](Table::iterate_until) for the strict variant.
    ///
    /// Returns `false` iff some invocation of `f` returned `false`.
    #[allow(clippy::indexing_slicing)]
    pub fn iterate<F>(&self, pool: &Pool, keys: &[&str], mut f: F) -> bool
    where
        F: FnMut(&str, &str) -> bool,
    {
        let entries = self.a.as_slice();
        if keys.is_empty() {
            for e in entries {
                if !f(pool.get(e.key), pool.get(e.val)) {
                    return false;
                }
            }
            return true;
        }
        let mut all = true;
        for key in keys {
            if key.is_empty() {
                continue;
            }
            let hash = table_hash(key);
            if !self.bucket_is_set(hash) {
                continue;
            }
            let checksum = key_checksum(key);
            let mut rv = true;
            for i in self.index_first[hash]..=self.index_last[hash] {
                if !rv {
                    break;
                }
                let e = &entries[i];
                if e.checksum == checksum && pool.get(e.key).eq_ignore_ascii_case(key) {
                    rv = f(pool.get(e.key), pool.get(e.val));
                }
            }
            if !rv {
                all = false;
            }
        }
        all
    }

    /// Like [`iterate`](Table::iterate), but a `false` from `f` always ends
    /// the entire walk, key arguments or not.
    #[allow(clippy::indexing_slicing)]
    pub fn iterate_until<F>(&self, pool: &Pool, keys: &[&str], mut f: F) -> bool
    where
        F: FnMut(&str, &str) -> bool,
    {
        let entries = self.a.as_slice();
        if keys.is_empty() {
            for e in entries {
                if !f(pool.get(e.key), pool.get(e.val)) {
                    return false;
                }
            }
            return true;
        }
        for key in keys {
            if key.is_empty() {
                continue;
            }
            let hash = table_hash(key);
            if !self.bucket_is_set(hash) {
                continue;
            }
            let checksum = key_checksum(key);
            for i in self.index_first[hash]..=self.index_last[hash] {
                let e = &entries[i];
                if e.checksum == checksum
                    && pool.get(e.key).eq_ignore_ascii_case(key)
                    && !f(pool.get(e.key), pool.get(e.val))
                {
                    return false;
                }
            }
        }
        true
    }

    /// Deep copy: entries and index are copied, the capacity probe is not.
    #[must_use]
    pub fn copy(&self) -> Table {
        Table {
            a: self.a.copy(),
            index_initialized: self.index_initialized,
            index_first: self.index_first,
            index_last: self.index_last,
            probe: None,
        }
    }

    /// Rebuilds the table entry by entry into `dst_pool`, re-copying every
    /// key and value. The result is compact: it shares no storage and
    /// carries none of the source pool's abandoned bytes.
    ///
    /// # Errors
    ///
    /// Returns `PoolTabError::PoolExhausted` if `dst_pool`'s limit would be
    /// exceeded.
    pub fn clone_into(&self, src_pool: &Pool, dst_pool: &mut Pool) -> Result<Table> {
        let mut new = Table::with_capacity(self.len());
        for e in self.a.as_slice() {
            new.add(dst_pool, src_pool.get(e.key), src_pool.get(e.val))?;
        }
        Ok(new)
    }
}
