//! # gridcalc
//!
//! A spreadsheet formula engine.
//!
//! gridcalc evaluates Excel-style formulas against a worksheet snapshot, a flat map
//! from cell addresses and names to values:
//!
//! - Exact decimal arithmetic (`=0.1+0.2` is `0.3`)
//! - Excel error values (`#DIV/0!`, `#N/A`, `#REF!`, ...) reported as results
//! - Circular reference detection with the full cycle path
//! - Dependency-ordered batch evaluation, independent cells in parallel
//! - A result cache validated against the values each formula reads
//!
//! ## Example
//!
//! ```rust
//! use gridcalc::prelude::*;
//!
//! let engine = FormulaEngine::new();
//! engine.set_worksheet_data([("A1", 10.0)]).unwrap();
//!
//! let result = engine.evaluate("B1", "=A1*2").unwrap();
//! assert_eq!(result.value, Some(CellValue::Number(20.0)));
//! assert_eq!(result.dependencies, vec!["A1"]);
//!
//! let result = engine.evaluate("C1", "=10/0").unwrap();
//! assert_eq!(result.error.as_deref(), Some("#DIV/0!"));
//! ```

mod cache;
pub mod engine;
pub mod error;
pub mod options;
pub mod prelude;
pub mod result;

pub use engine::FormulaEngine;
pub use error::{EngineError, Result};
pub use options::EngineOptions;
pub use result::EvaluationResult;

// Re-export core types
pub use gridcalc_core::{CellAddress, CellError, CellKey, CellRange, CellValue, RangeKey, Worksheet};

// Re-export formula types
pub use gridcalc_formula::{
    evaluate, parse_formula, resolve_dependencies, Builtin, DependencyGraph, DependencySet,
    EvaluationContext, ExprKind, FormulaError, FormulaExpr, FormulaValue, ParseError,
    ParseErrorKind, Schedule, Span,
};
