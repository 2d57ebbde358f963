//! `pooltab`: pool-backed growable arrays and ordered, case-insensitive
//! string tables.
//!
//! All string storage lives in a bump-allocating [`Pool`] that hands out
//! integer [`Span`] handles instead of references; nothing is freed
//! individually and a whole pool resets at once. On top of it sit a
//! capacity-doubling [`Array`] and a [`Table`]: an insertion-ordered,
//! multi-valued string map with a 32-bucket index for fast lookup and a
//! stable-sort-based deduplication pass.
//!
//! ```
//! use pooltab::{Pool, Table};
//!
//! let mut pool = Pool::new();
//! let mut headers = Table::new();
//!
//! headers.set(&mut pool, "Content-Type", "text/html").unwrap();
//! headers.add(&mut pool, "Set-Cookie", "a=1").unwrap();
//! headers.add(&mut pool, "Set-Cookie", "b=2").unwrap();
//!
//! // Lookup is case-insensitive.
//! assert_eq!(headers.get(&pool, "content-type"), Some("text/html"));
//!
//! // A key added twice holds both values.
//! let cookies = headers.getm(&mut pool, "Set-Cookie").unwrap().unwrap();
//! assert_eq!(pool.get(cookies), "a=1,b=2");
//! ```
//!
//! Two tables compose in either direction: [`Table::overlay`] builds a new
//! table whose lookups prefer one side, sharing the overlay's storage until
//! the result is first appended to; [`Table::overlap`] folds another table's
//! entries in and deduplicates with [`Table::compress`], joining or
//! overwriting duplicate values per [`OverlapMode`].
//!
//! ```
//! use pooltab::{OverlapMode, Pool, Table};
//!
//! let mut pool = Pool::new();
//! let mut base = Table::new();
//! base.set(&mut pool, "Cache-Control", "none").unwrap();
//! let mut fresh = Table::new();
//! fresh.set(&mut pool, "Cache-Control", "max-age=604800").unwrap();
//!
//! base.overlap(&mut pool, &fresh, OverlapMode::Overwrite).unwrap();
//! assert_eq!(base.get(&pool, "cache-control"), Some("max-age=604800"));
//! ```
//!
//! The crate performs no I/O and no locking; a pool and everything built on
//! it belong to one thread (typically one request).

#[macro_use]
mod logging;

mod array;
mod cache;
mod compress;
mod error;
mod pool;
mod table;

// Re-export public types
pub use array::Array;
pub use cache::PoolCache;
pub use compress::OverlapMode;
pub use error::{PoolTabError, Result};
pub use pool::{Pool, Span};
pub use table::{CapacityProbe, Entry, Table};
