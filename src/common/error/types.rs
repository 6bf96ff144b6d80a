//! Unified error types for the compound file engine.
//!
//! Every layer of the engine (byte views, allocation tables, directory tree,
//! stream strategies) reports failures through this single enum, so callers
//! only ever match on one type.
use thiserror::Error;

/// Main error type for compound file operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error raised while loading or saving bytes
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A fixed header field deviates from the supported format revision
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Sector, view or stream range violation
    #[error("{what} out of bounds: {index} (limit {limit})")]
    OutOfBounds {
        what: &'static str,
        index: usize,
        limit: usize,
    },

    /// Inline DIFAT or DIFAT sector slots are exhausted
    #[error("Capacity exhausted: {0}")]
    Capacity(String),

    /// A sibling with the same ordering key already exists
    #[error("Duplicate directory entry name: {0}")]
    DuplicateName(String),

    /// Directory entry name is empty, too long, or not allowed here
    #[error("Invalid directory entry name: {0}")]
    InvalidName(String),

    /// Operation is not supported by this backing
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Structural invariant of the container is broken
    #[error("Structural error: {0}")]
    Structure(String),

    /// Storage or stream not found by path
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    pub(crate) fn out_of_bounds(what: &'static str, index: usize, limit: usize) -> Self {
        Error::OutOfBounds { what, index, limit }
    }

    pub(crate) fn premature_end_of_chain() -> Self {
        Error::Structure("premature end of chain".to_string())
    }
}

/// Result type for compound file operations.
pub type Result<T> = std::result::Result<T, Error>;
