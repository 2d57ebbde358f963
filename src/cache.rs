use crate::pool::Pool;

const DEFAULT_MAX_CACHED: usize = 100_000;
const DEFAULT_POOL_SIZE: usize = 4096;
const DEFAULT_PREALLOC: usize = 1000;

/// A bounded free list of [`Pool`]s.
///
/// Systems that churn through one pool per request avoid repeated allocator
/// round-trips by recycling pools here: [`release`](PoolCache::release)
/// resets a pool and keeps it, up to a cap, and
/// [`acquire`](PoolCache::acquire) hands cached pools back out before
/// creating fresh ones. The list is LIFO, so the most recently used pool
/// (with its warmed-up allocation) is reused first.
#[derive(Debug)]
pub struct PoolCache {
    cache: Vec<Pool>,
    max_cached: usize,
    pool_size: usize,
}

impl PoolCache {
    /// Creates a cache holding at most `max_cached` pools of `pool_size`
    /// preallocated bytes each, with `prealloc` pools created up front.
    ///
    /// A zero for any parameter selects its default: 100 000 cached pools,
    /// 4096 bytes per pool, 1000 preallocated.
    #[must_use]
    pub fn new(max_cached: usize, pool_size: usize, prealloc: usize) -> Self {
        let max_cached = if max_cached == 0 {
            DEFAULT_MAX_CACHED
        } else {
            max_cached
        };
        let pool_size = if pool_size == 0 {
            DEFAULT_POOL_SIZE
        } else {
            pool_size
        };
        let prealloc = if prealloc == 0 {
            DEFAULT_PREALLOC
        } else {
            prealloc
        };

        let mut cache = Vec::with_capacity(prealloc);
        for _ in 0..prealloc {
            cache.push(Pool::with_capacity(pool_size));
        }
        Self {
            cache,
            max_cached,
            pool_size,
        }
    }

    /// Hands out a cached pool, or creates a fresh one when the free list
    /// is empty.
    pub fn acquire(&mut self) -> Pool {
        match self.cache.pop() {
            Some(pool) => {
                trace!("pool cache hit, {} pools left", self.cache.len());
                pool
            }
            None => Pool::with_capacity(self.pool_size),
        }
    }

    /// Returns a pool to the cache.
    ///
    /// Under the cap the pool is reset and kept for reuse; at the cap it is
    /// simply dropped.
    pub fn release(&mut self, mut pool: Pool) {
        if self.cache.len() < self.max_cached {
            pool.reset();
            self.cache.push(pool);
        }
    }

    /// Number of pools currently cached.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Preallocation size of pools this cache creates.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Maximum number of pools kept on the free list.
    #[must_use]
    pub fn max_cached(&self) -> usize {
        self.max_cached
    }
}
