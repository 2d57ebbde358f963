use core::cmp::Ordering;

use crate::error::Result;
use crate::pool::{Pool, Span};
use crate::table::{Entry, Table, TABLE_HASH_SIZE};

/// Duplicate-key handling for [`Table::compress`] and [`Table::overlap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapMode {
    /// Join duplicate values with `", "` in their original relative order.
    Merge,
    /// Keep only the last duplicate's value.
    Overwrite,
}

/// `strcasecmp` ordering: byte-wise, ASCII case folded, shorter string first
/// on a common prefix.
fn cmp_ignore_ascii_case(a: &str, b: &str) -> Ordering {
    let ab = a.as_bytes();
    let bb = b.as_bytes();
    for (x, y) in ab.iter().zip(bb) {
        let ord = x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase());
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ab.len().cmp(&bb.len())
}

#[allow(clippy::indexing_slicing)]
fn cmp_keys(pool: &Pool, entries: &[Entry], a: usize, b: usize) -> Ordering {
    cmp_ignore_ascii_case(pool.get(entries[a].key), pool.get(entries[b].key))
}

fn entries_equal(pool: &Pool, a: &Entry, b: &Entry) -> bool {
    a.checksum == b.checksum && pool.get(a.key).eq_ignore_ascii_case(pool.get(b.key))
}

/// Bottom-up stable mergesort over entry offsets, ordered by
/// case-insensitive key.
///
/// Mergesort rather than quicksort: it is a stable sort (equal keys keep
/// their original relative order, which the duplicate handling depends on)
/// and runs in n·log(n) time regardless of its input.
#[allow(clippy::indexing_slicing)]
fn mergesort_by_key(pool: &Pool, entries: &[Entry], mut values: Vec<usize>) -> Vec<usize> {
    let n = values.len();
    let mut tmp = vec![0usize; n];

    // First pass: sort pairs of elements.
    let mut i = 0;
    while i + 1 < n {
        if cmp_keys(pool, entries, values[i], values[i + 1]) == Ordering::Greater {
            values.swap(i, i + 1);
        }
        i += 2;
    }

    // Merge consecutive pairs of blocks of the next blocksize. Within a
    // block, elements are in sorted order due to the previous pass.
    let mut blocksize = 2;
    while blocksize < n {
        let mut dst = 0;
        let mut next_start = 0;
        while next_start + blocksize < n {
            let mut b1 = next_start;
            let b1_end = next_start + blocksize;
            let mut b2 = b1_end;
            // The last block may be smaller than blocksize.
            let b2_end = (b2 + blocksize).min(n);
            // Pick the smaller of the two block heads until one block
            // empties, then copy over all the other block still holds.
            loop {
                if b1 == b1_end {
                    while b2 < b2_end {
                        tmp[dst] = values[b2];
                        dst += 1;
                        b2 += 1;
                    }
                    break;
                }
                if b2 == b2_end {
                    while b1 < b1_end {
                        tmp[dst] = values[b1];
                        dst += 1;
                        b1 += 1;
                    }
                    break;
                }
                if cmp_keys(pool, entries, values[b1], values[b2]) == Ordering::Greater {
                    tmp[dst] = values[b2];
                    dst += 1;
                    b2 += 1;
                } else {
                    tmp[dst] = values[b1];
                    dst += 1;
                    b1 += 1;
                }
            }
            next_start += blocksize * 2;
        }
        // Elements beyond the last merged pair keep their previous order.
        tmp[dst..n].copy_from_slice(&values[dst..n]);
        // The output of this pass becomes the input of the next.
        core::mem::swap(&mut values, &mut tmp);
        blocksize *= 2;
    }
    values
}

impl Table {
    /// Removes duplicate keys from the whole table.
    ///
    /// Every group of entries sharing a case-insensitive key collapses into
    /// the group's earliest entry: with [`OverlapMode::Merge`] its value
    /// becomes all the group's values joined with `", "` in their original
    /// order, with [`OverlapMode::Overwrite`] it takes the last value. The
    /// survivors keep their relative order. No-op at one entry or fewer.
    ///
    /// # Errors
    ///
    /// Returns `PoolTabError::PoolExhausted` if joining values would exceed
    /// the pool's limit; the table's index is left consistent but the
    /// compaction is abandoned partway.
    #[allow(clippy::indexing_slicing)]
    pub fn compress(&mut self, pool: &mut Pool, mode: OverlapMode) -> Result<()> {
        let n = self.a.len();
        if n <= 1 {
            return Ok(());
        }

        // Sort offsets of all the entries to make duplicate keys adjacent.
        let order = mergesort_by_key(pool, self.a.as_slice(), (0..n).collect());

        // Walk the sorted sequence and collapse each run of equal keys onto
        // its earliest member. Stability of the sort makes `order[last]` the
        // earliest-appearing duplicate of its run.
        let mut dead = vec![false; n];
        let mut dups_found = false;
        let mut last = 0;
        let mut next = 1;
        while next < n {
            let entries = self.a.as_slice();
            if !entries_equal(pool, &entries[order[last]], &entries[order[next]]) {
                last = next;
                next += 1;
                continue;
            }
            dups_found = true;
            let mut dup_last = next + 1;
            while dup_last < n
                && entries_equal(pool, &entries[order[last]], &entries[order[dup_last]])
            {
                dup_last += 1;
            }
            // Entries at order[last..dup_last] all share one key now.
            dup_last -= 1;
            let new_val = match mode {
                OverlapMode::Merge => {
                    let parts: Vec<Span> = order[last..=dup_last]
                        .iter()
                        .map(|&at| entries[at].val)
                        .collect();
                    pool.join(&parts, ", ")?
                }
                OverlapMode::Overwrite => entries[order[dup_last]].val,
            };
            self.a.as_mut_slice()[order[last]].val = new_val;
            for pos in next..=dup_last {
                dead[order[pos]] = true;
            }
            next = dup_last + 1;
        }

        // Shift entries to the left to fill the holes the removals left.
        if dups_found {
            let slice = self.a.as_mut_slice();
            let mut d = 0;
            for s in 0..n {
                if !dead[s] {
                    slice[d] = slice[s];
                    d += 1;
                }
            }
            self.a.truncate(d);
            debug!("compress dropped {} duplicate entries", n - d);
        }

        self.reindex(pool);
        Ok(())
    }

    /// Appends `other`'s entries after this table's and deduplicates the
    /// result with [`compress`](Table::compress).
    ///
    /// For a key present in both tables, the surviving entry sits at this
    /// table's first occurrence; its value is `other`'s last occurrence
    /// under [`OverlapMode::Overwrite`], or every occurrence joined in
    /// original order under [`OverlapMode::Merge`]. New values win, old
    /// positions are retained.
    ///
    /// # Errors
    ///
    /// Returns `PoolTabError::PoolExhausted` if joining values would exceed
    /// the pool's limit.
    pub fn overlap(&mut self, pool: &mut Pool, other: &Table, mode: OverlapMode) -> Result<()> {
        if self.a.len() + other.a.len() == 0 {
            return Ok(());
        }
        self.cat_table(other);
        self.compress(pool, mode)
    }

    /// Appends `other`'s entries and merges its bucket index by translating
    /// the offsets by this table's prior length (or copying the index
    /// wholesale when this table was empty). Constant work per bucket, no
    /// full reindex.
    fn cat_table(&mut self, other: &Table) {
        let n = self.a.len();
        self.a.cat(&other.a);

        if n == 0 {
            self.index_first = other.index_first;
            self.index_last = other.index_last;
            self.index_initialized = other.index_initialized;
            return;
        }

        for hash in 0..TABLE_HASH_SIZE {
            if other.bucket_is_set(hash) {
                self.index_last[hash] = other.index_last[hash] + n;
                if !self.bucket_is_set(hash) {
                    self.index_first[hash] = other.index_first[hash] + n;
                }
            }
        }
        self.index_initialized |= other.index_initialized;
    }
}
