//! Logical functions

use super::scalar;
use crate::evaluator::FormulaValue;
use gridcalc_core::CellError;

/// IF function
///
/// Only a logical condition selects a branch: numbers and text are `#VALUE!`
/// rather than being read as truthy. An elided condition counts as FALSE.
pub fn fn_if(args: &[FormulaValue]) -> FormulaValue {
    let condition = match args.first().map(scalar) {
        Some(FormulaValue::Boolean(b)) => *b,
        Some(FormulaValue::Empty) => false,
        Some(FormulaValue::Error(e)) => return FormulaValue::Error(*e),
        _ => return FormulaValue::Error(CellError::Value),
    };

    let branch = if condition { args.get(1) } else { args.get(2) };
    match branch {
        Some(value) => value.clone(),
        None => FormulaValue::Boolean(false),
    }
}

/// AND function
pub fn fn_and(args: &[FormulaValue]) -> FormulaValue {
    match logical_values(args) {
        Ok(values) => FormulaValue::Boolean(values.into_iter().all(|b| b)),
        Err(e) => FormulaValue::Error(e),
    }
}

/// OR function
pub fn fn_or(args: &[FormulaValue]) -> FormulaValue {
    match logical_values(args) {
        Ok(values) => FormulaValue::Boolean(values.into_iter().any(|b| b)),
        Err(e) => FormulaValue::Error(e),
    }
}

/// Gather the logical values AND and OR look at
///
/// Ranges contribute their booleans and numbers only; direct arguments must read as a
/// logical. Having nothing to look at is `#VALUE!`.
fn logical_values(args: &[FormulaValue]) -> Result<Vec<bool>, CellError> {
    let mut values = Vec::new();
    for arg in args {
        match arg {
            FormulaValue::Array(rows) => {
                for value in rows.iter().flatten() {
                    match value {
                        FormulaValue::Boolean(b) => values.push(*b),
                        FormulaValue::Number(n) => values.push(!n.is_zero()),
                        FormulaValue::Float(f) => values.push(*f != 0.0),
                        FormulaValue::Error(e) => return Err(*e),
                        _ => {}
                    }
                }
            }
            FormulaValue::Error(e) => return Err(*e),
            FormulaValue::Empty => {}
            direct => values.push(direct.as_bool().ok_or(CellError::Value)?),
        }
    }

    if values.is_empty() {
        return Err(CellError::Value);
    }
    Ok(values)
}

/// NOT function
pub fn fn_not(args: &[FormulaValue]) -> FormulaValue {
    match args.first().map(scalar) {
        Some(FormulaValue::Error(e)) => FormulaValue::Error(*e),
        Some(value) => value
            .as_bool()
            .map_or(FormulaValue::Error(CellError::Value), |b| FormulaValue::Boolean(!b)),
        None => FormulaValue::Error(CellError::Value),
    }
}

/// IFERROR(value, value_if_error)
pub fn fn_iferror(args: &[FormulaValue]) -> FormulaValue {
    replace_errors(args, |_| true)
}

/// IFNA(value, value_if_na)
pub fn fn_ifna(args: &[FormulaValue]) -> FormulaValue {
    replace_errors(args, |e| e == CellError::Na)
}

fn replace_errors(args: &[FormulaValue], catches: impl Fn(CellError) -> bool) -> FormulaValue {
    let (Some(value), Some(fallback)) = (args.first(), args.get(1)) else {
        return FormulaValue::Error(CellError::Value);
    };

    let replace = |v: &FormulaValue| match v {
        FormulaValue::Error(e) if catches(*e) => fallback.clone(),
        other => other.clone(),
    };

    match value {
        FormulaValue::Array(rows) => FormulaValue::Array(
            rows.iter()
                .map(|row| row.iter().map(&replace).collect())
                .collect(),
        ),
        other => replace(other),
    }
}

/// TRUE function
pub fn fn_true(_args: &[FormulaValue]) -> FormulaValue {
    FormulaValue::Boolean(true)
}

/// FALSE function
pub fn fn_false(_args: &[FormulaValue]) -> FormulaValue {
    FormulaValue::Boolean(false)
}
