//! Information functions

use super::scalar;
use crate::evaluator::FormulaValue;
use gridcalc_core::CellError;

/// Test the single argument; a multi-cell array is `#VALUE!`
fn test_value(args: &[FormulaValue], test: impl Fn(&FormulaValue) -> bool) -> FormulaValue {
    match args.first().map(scalar) {
        Some(FormulaValue::Array(_)) | None => FormulaValue::Error(CellError::Value),
        Some(v) => FormulaValue::Boolean(test(v)),
    }
}

/// ISBLANK(value)
pub fn fn_isblank(args: &[FormulaValue]) -> FormulaValue {
    test_value(args, |v| matches!(v, FormulaValue::Empty))
}

/// ISNUMBER(value)
pub fn fn_isnumber(args: &[FormulaValue]) -> FormulaValue {
    test_value(args, FormulaValue::is_number)
}

/// ISTEXT(value)
pub fn fn_istext(args: &[FormulaValue]) -> FormulaValue {
    test_value(args, |v| matches!(v, FormulaValue::String(_)))
}

/// ISLOGICAL(value)
pub fn fn_islogical(args: &[FormulaValue]) -> FormulaValue {
    test_value(args, |v| matches!(v, FormulaValue::Boolean(_)))
}

/// ISERROR(value)
pub fn fn_iserror(args: &[FormulaValue]) -> FormulaValue {
    test_value(args, FormulaValue::is_error)
}

/// ISERR(value): any error except `#N/A`
pub fn fn_iserr(args: &[FormulaValue]) -> FormulaValue {
    test_value(args, |v| matches!(v, FormulaValue::Error(e) if *e != CellError::Na))
}

/// ISNA(value)
pub fn fn_isna(args: &[FormulaValue]) -> FormulaValue {
    test_value(args, |v| matches!(v, FormulaValue::Error(CellError::Na)))
}

/// NA()
pub fn fn_na(_args: &[FormulaValue]) -> FormulaValue {
    FormulaValue::Error(CellError::Na)
}
