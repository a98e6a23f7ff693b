//! Error types for the formula engine

use thiserror::Error;

/// Result type alias using [`EngineError`]
pub type Result<T> = std::result::Result<T, EngineError>;

/// Invalid input at the engine's API boundary
///
/// Problems inside a formula (syntax errors, circular references, `#DIV/0!` and the
/// like) are not `EngineError`s; they come back in [`EvaluationResult::error`].
///
/// [`EvaluationResult::error`]: crate::EvaluationResult::error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The formula text was empty or only whitespace
    #[error("Formula is empty")]
    EmptyFormula,

    /// The target cell of an evaluation could not be parsed
    #[error("Invalid cell reference '{cell}': {source}")]
    InvalidCellReference {
        cell: String,
        #[source]
        source: gridcalc_core::Error,
    },

    /// A batch defined the same cell more than once
    #[error("Cell {0} appears more than once in the batch")]
    DuplicateCell(String),

    /// A snapshot key that is neither a cell address nor a valid name
    #[error("Invalid worksheet data: {0}")]
    InvalidKey(#[from] gridcalc_core::Error),
}
