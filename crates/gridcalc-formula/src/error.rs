//! Formula error types

use crate::ast::Span;
use std::fmt;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// What went wrong while parsing a formula
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input did not begin with `=`
    MissingEquals,
    /// The formula stopped where an operand was required (`=5+`)
    UnexpectedEnd,
    /// An opening parenthesis was never closed, or a closing one has no partner
    MismatchedParentheses,
    /// A function call ran out of input before its closing parenthesis (`=SUM(`)
    IncompleteFunctionCall,
    /// A token that looks like a cell reference but is not one (`=A`)
    InvalidCellReference,
    /// A string literal without its closing quote
    UnterminatedString,
    /// A numeric literal too large even for `f64`
    NumberOutOfRange,
    /// Any other token in the wrong place
    UnexpectedToken(String),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::MissingEquals => f.write_str("formula must start with '='"),
            ParseErrorKind::UnexpectedEnd => f.write_str("unexpected end of formula"),
            ParseErrorKind::MismatchedParentheses => f.write_str("mismatched parentheses"),
            ParseErrorKind::IncompleteFunctionCall => f.write_str("incomplete function call"),
            ParseErrorKind::InvalidCellReference => f.write_str("invalid cell reference"),
            ParseErrorKind::UnterminatedString => f.write_str("unterminated string literal"),
            ParseErrorKind::NumberOutOfRange => f.write_str("number out of range"),
            ParseErrorKind::UnexpectedToken(token) => write!(f, "unexpected token '{}'", token),
        }
    }
}

/// A parse failure with the offending token's position in the formula text
///
/// Offsets are byte offsets into the text after the leading `=` has been stripped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at position {}", .span.start)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Errors that can occur during formula parsing or evaluation
///
/// Spreadsheet errors such as `#DIV/0!` are values, not `FormulaError`s; this type
/// covers failures that make a formula impossible to evaluate at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Formula parse error
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Unknown function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Circular reference, carrying the cycle path (`A1 -> B1 -> A1`)
    #[error("Circular reference: {}", .0.join(" -> "))]
    CircularReference(Vec<String>),
}
