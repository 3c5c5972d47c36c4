//! # Memory Error Types
//!
//! Recoverable errors of the memory layer.
//!
//! Capacity violations, out-of-bounds indexing and stale handles are NOT
//! represented here: they are fatal and panic at the call site.

use thiserror::Error;

/// Errors that can occur in the memory layer.
#[derive(Error, Debug)]
pub enum MemError {
    /// Attempted to free an allocation that is not the most recent one of
    /// the active slab.
    #[error("allocation at depth {depth}, offset {offset} is not on top of the active slab")]
    NotOnTop {
        /// Chain depth recorded in the allocation.
        depth: u32,
        /// Byte offset recorded in the allocation.
        offset: u32,
    },

    /// Registry configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Registry configuration could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Registry configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// A character buffer does not hold valid UTF-8.
    #[error("character buffer is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Result type for memory operations.
pub type MemResult<T> = Result<T, MemError>;
