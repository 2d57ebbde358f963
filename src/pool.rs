use crate::error::{PoolTabError, Result};

/// Copyable handle to a byte range inside a [`Pool`].
///
/// A span is a pair of integer offsets, not a reference: the pool's storage
/// may move when it grows, and offsets stay valid where pointers would not.
/// A span is only meaningful together with the pool it was created from, and
/// the caller must not use it after that pool has been reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    off: u32,
    len: u32,
}

impl Span {
    pub(crate) fn new(off: usize, len: usize) -> Self {
        Self {
            off: off as u32,
            len: len as u32,
        }
    }

    /// Length of the referenced range in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte offset of the range within the pool.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.off as usize
    }

    fn range(&self) -> core::ops::Range<usize> {
        self.offset()..self.offset() + self.len()
    }
}

/// A bump-allocating string pool.
///
/// All storage lives in one owned, append-only byte buffer. Allocations hand
/// out [`Span`] handles; nothing is ever freed individually. `reset` drops
/// all content at once while keeping the buffer allocation for reuse.
///
/// A pool may carry a byte limit. An allocation that would exceed the limit
/// fails with [`PoolTabError::PoolExhausted`] and leaves the pool unchanged;
/// without a limit the pool grows until the global allocator gives up.
#[derive(Debug, Default)]
pub struct Pool {
    data: Vec<u8>,
    limit: Option<usize>,
}

impl Pool {
    /// Creates an empty pool with no preallocated storage and no limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pool with `bytes` of preallocated storage and no limit.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            data: Vec::with_capacity(bytes),
            limit: None,
        }
    }

    /// Creates a pool with preallocated storage and a hard byte limit.
    ///
    /// The limit caps the total number of bytes ever stored between resets.
    #[must_use]
    pub fn with_limit(bytes: usize, limit: usize) -> Self {
        Self {
            data: Vec::with_capacity(bytes.min(limit)),
            limit: Some(limit),
        }
    }

    fn ensure_capacity(&self, additional: usize) -> Result<()> {
        if let Some(limit) = self.limit {
            let available = limit.saturating_sub(self.data.len());
            if additional > available {
                return Err(PoolTabError::PoolExhausted {
                    requested: additional,
                    available,
                });
            }
        }
        Ok(())
    }

    /// Allocates a zero-filled region of `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns `PoolTabError::PoolExhausted` if the pool's limit would be
    /// exceeded.
    pub fn alloc(&mut self, len: usize) -> Result<Span> {
        self.ensure_capacity(len)?;
        let off = self.data.len();
        self.data.resize(off + len, 0);
        Ok(Span::new(off, len))
    }

    /// Copies `s` into the pool and returns a handle to the copy.
    ///
    /// # Errors
    ///
    /// Returns `PoolTabError::PoolExhausted` if the pool's limit would be
    /// exceeded.
    pub fn push_str(&mut self, s: &str) -> Result<Span> {
        self.ensure_capacity(s.len())?;
        let off = self.data.len();
        self.data.extend_from_slice(s.as_bytes());
        Ok(Span::new(off, s.len()))
    }

    /// Concatenates pool strings with a separator into a new pool string.
    ///
    /// The parts are copied in order, with `sep` between consecutive parts.
    /// An empty `parts` yields an empty string.
    ///
    /// # Errors
    ///
    /// Returns `PoolTabError::PoolExhausted` if the pool's limit would be
    /// exceeded.
    ///
    /// # Panics
    ///
    /// Panics if any part does not reference this pool's storage.
    pub fn join(&mut self, parts: &[Span], sep: &str) -> Result<Span> {
        let total = parts.iter().map(Span::len).sum::<usize>()
            + sep.len() * parts.len().saturating_sub(1);
        self.ensure_capacity(total)?;

        let old_len = self.data.len();
        self.data.resize(old_len + total, 0);
        // Sources all precede old_len, so the split gives disjoint views.
        let (src, dst) = self.data.split_at_mut(old_len);
        let mut at = 0;
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                dst[at..at + sep.len()].copy_from_slice(sep.as_bytes());
                at += sep.len();
            }
            dst[at..at + part.len()].copy_from_slice(&src[part.range()]);
            at += part.len();
        }
        Ok(Span::new(old_len, total))
    }

    /// Concatenates a pool string, a separator, and a caller-supplied string
    /// into a new pool string.
    ///
    /// # Errors
    ///
    /// Returns `PoolTabError::PoolExhausted` if the pool's limit would be
    /// exceeded.
    ///
    /// # Panics
    ///
    /// Panics if `head` does not reference this pool's storage.
    pub fn concat(&mut self, head: Span, sep: &str, tail: &str) -> Result<Span> {
        let total = head.len() + sep.len() + tail.len();
        self.ensure_capacity(total)?;

        let old_len = self.data.len();
        self.data.resize(old_len + total, 0);
        let (src, dst) = self.data.split_at_mut(old_len);
        dst[..head.len()].copy_from_slice(&src[head.range()]);
        dst[head.len()..head.len() + sep.len()].copy_from_slice(sep.as_bytes());
        dst[head.len() + sep.len()..total].copy_from_slice(tail.as_bytes());
        Ok(Span::new(old_len, total))
    }

    /// Resolves a span to its bytes.
    ///
    /// # Panics
    ///
    /// Panics if the span does not reference this pool's storage.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn bytes(&self, span: Span) -> &[u8] {
        self.data
            .get(span.range())
            .expect("span references storage of a different pool")
    }

    /// Resolves a span to its string.
    ///
    /// # Panics
    ///
    /// Panics if the span does not reference this pool's storage.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn get(&self, span: Span) -> &str {
        core::str::from_utf8(self.bytes(span)).expect("pool spans reference whole stored strings")
    }

    /// Drops all content while keeping the buffer allocation for reuse.
    ///
    /// Spans handed out before the reset must not be used afterwards.
    pub fn reset(&mut self) {
        self.data.clear();
    }

    /// Number of bytes currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes of storage reserved so far.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// The configured byte limit, if any.
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}
