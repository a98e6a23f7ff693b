//! # gridcalc-core
//!
//! Core data types for the gridcalc formula engine.
//!
//! This crate provides the fundamental types shared by the parser, the dependency
//! resolver and the evaluator:
//! - [`CellAddress`] and [`CellRange`] - A1-style addressing with per-axis `$` flags
//! - [`CellKey`] and [`RangeKey`] - canonical, sheet-qualified snapshot keys
//! - [`CellValue`] and [`CellError`] - the scalars a cell may hold
//! - [`Worksheet`] - an immutable key → value snapshot consumed by evaluation
//!
//! ## Example
//!
//! ```rust
//! use gridcalc_core::{CellKey, CellValue, Worksheet};
//!
//! let sheet = Worksheet::from_pairs([("A1", 10.0), ("Sheet2!B3", 4.5)]).unwrap();
//!
//! let key = CellKey::parse("a1").unwrap();
//! assert_eq!(sheet.get(&key), Some(&CellValue::Number(10.0)));
//! assert!(sheet.has_sheet("Sheet2"));
//! ```

pub mod cell;
pub mod error;
pub mod worksheet;

pub use cell::{
    is_column_like, is_valid_name, sheet_needs_quotes, CellAddress, CellError, CellKey, CellRange,
    CellValue, RangeKey,
};
pub use error::{Error, Result};
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;
