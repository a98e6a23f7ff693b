//! # gridcalc-formula
//!
//! Formula parser, dependency resolver and evaluator for gridcalc.
//!
//! This crate provides:
//! - Formula parsing (text → AST with source spans)
//! - Dependency resolution, cycle detection and evaluation layers
//! - Formula evaluation (AST → value) on exact decimals
//! - Built-in Excel functions
//!
//! ## Example
//!
//! ```rust
//! use gridcalc_core::Worksheet;
//! use gridcalc_formula::{evaluate, parse_formula, EvaluationContext, FormulaValue};
//! use rust_decimal::Decimal;
//! use std::str::FromStr;
//!
//! let ast = parse_formula("=0.1+0.2").unwrap();
//! let sheet = Worksheet::new();
//! let value = evaluate(&ast, &EvaluationContext::new(&sheet)).unwrap();
//! assert_eq!(value, FormulaValue::Number(Decimal::from_str("0.3").unwrap()));
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod parser;

pub use ast::{
    BinaryOperator, CellReference, ExprKind, FormulaExpr, RangeReference, Span, UnaryOperator,
};
pub use dependency::{resolve_dependencies, DependencyGraph, DependencySet, Schedule};
pub use error::{FormulaError, FormulaResult, ParseError, ParseErrorKind};
pub use evaluator::{evaluate, CellSource, EvaluationContext, FormulaValue};
pub use functions::Builtin;
pub use parser::parse_formula;
