//! Error types for gridcalc-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building addresses, keys or snapshots
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Invalid cell range format
    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    /// Row index out of bounds
    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column index out of bounds
    #[error("Column index {0} out of bounds (max: {1})")]
    ColumnOutOfBounds(u32, u16),

    /// Snapshot key that is neither a cell address nor a valid name
    #[error("Invalid snapshot key: {0}")]
    InvalidKey(String),
}

impl Error {
    /// Whether the error only concerns grid bounds (the text itself was well formed)
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(
            self,
            Error::RowOutOfBounds(..) | Error::ColumnOutOfBounds(..)
        )
    }
}
