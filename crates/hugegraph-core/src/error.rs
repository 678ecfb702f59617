//! Error types for HugeGraph Core

use thiserror::Error;

/// Result type alias using HugeGraph Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the in-memory graph engine
#[derive(Error, Debug)]
pub enum Error {
    /// Index space exceeds the number of addressable pages
    #[error("Capacity error: {0}")]
    Capacity(String),

    /// Malformed relationship or property data coming from the source
    #[error("Load error in batch [{}, {}): {message}", batch.0, batch.1)]
    Load {
        /// Node range `[start, end)` of the batch that failed
        batch: (u64, u64),
        /// What went wrong
        message: String,
    },

    /// Out-of-range node or element id
    #[error("Index {index} out of bounds for length {len}")]
    Index {
        /// Offending index
        index: u64,
        /// Length of the addressed structure
        len: u64,
    },

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// A phase was aborted through its termination flag
    #[error("Execution was cancelled")]
    Cancelled,

    /// Graph catalog errors (duplicate or missing graphs)
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Worker pool could not be created
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a capacity error
    pub fn capacity(msg: impl Into<String>) -> Self {
        Self::Capacity(msg.into())
    }

    /// Create a load error for the batch covering `[start, end)`
    pub fn load(start: u64, end: u64, msg: impl Into<String>) -> Self {
        Self::Load {
            batch: (start, end),
            message: msg.into(),
        }
    }

    /// Create an index error
    pub fn index(index: u64, len: u64) -> Self {
        Self::Index { index, len }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a catalog error
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<rayon::ThreadPoolBuildError> for Error {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Self::ThreadPool(err.to_string())
    }
}
