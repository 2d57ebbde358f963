use thiserror::Error;

/// Error types for pool and table operations
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum PoolTabError {
    /// Pool has insufficient space under its configured limit
    #[error("Pool exhausted: requested {requested} bytes, but only {available} bytes available")]
    PoolExhausted {
        /// Number of bytes requested
        requested: usize,
        /// Number of bytes still available under the limit
        available: usize,
    },
    /// Table write operation received an empty key
    #[error("Empty key: table write operations require a non-empty key")]
    EmptyKey,
}

pub type Result<T> = core::result::Result<T, PoolTabError>;
