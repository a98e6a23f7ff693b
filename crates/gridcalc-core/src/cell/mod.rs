//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellAddress`] - A cell's location (e.g., "A1", "$B$2")
//! - [`CellRange`] - A rectangle of cells (e.g., "A1:B10")
//! - [`CellKey`] / [`RangeKey`] - Sheet- and workbook-qualified snapshot keys
//! - [`CellValue`] - The scalar stored in a cell

mod address;
mod key;
mod value;

pub use address::{CellAddress, CellRange, CellRangeIterator};
pub use key::{is_column_like, is_valid_name, sheet_needs_quotes, CellKey, RangeKey};
pub use value::{CellError, CellValue};
