//! Text functions
//!
//! Lengths and positions count characters, not bytes.

use super::{integer_arg, text_arg};
use crate::evaluator::FormulaValue;
use gridcalc_core::CellError;
use rust_decimal::Decimal;

fn take_left(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn take_right(s: &str, n: usize) -> String {
    let len = s.chars().count();
    if n >= len {
        return s.to_string();
    }
    s.chars().skip(len - n).collect()
}

fn text_or_error(result: Result<String, CellError>) -> FormulaValue {
    result.map_or_else(FormulaValue::Error, FormulaValue::String)
}

/// A non-negative character count argument
fn count_arg(args: &[FormulaValue], index: usize, default: Option<i64>) -> Result<usize, CellError> {
    let n = integer_arg(args, index, default)?;
    usize::try_from(n).map_err(|_| CellError::Value)
}

/// CONCATENATE(text1, [text2], ...)
pub fn fn_concatenate(args: &[FormulaValue]) -> FormulaValue {
    text_or_error(args.iter().map(FormulaValue::to_text).collect())
}

/// CONCAT(text1, [text2], ...)
///
/// Unlike CONCATENATE, ranges are joined cell by cell.
pub fn fn_concat(args: &[FormulaValue]) -> FormulaValue {
    text_or_error(
        args.iter()
            .flat_map(FormulaValue::iter_values)
            .map(FormulaValue::to_text)
            .collect(),
    )
}

/// LEN(text)
pub fn fn_len(args: &[FormulaValue]) -> FormulaValue {
    match text_arg(args, 0) {
        Ok(s) => FormulaValue::Number(Decimal::from(s.chars().count())),
        Err(e) => FormulaValue::Error(e),
    }
}

/// UPPER(text)
pub fn fn_upper(args: &[FormulaValue]) -> FormulaValue {
    text_or_error(text_arg(args, 0).map(|s| s.to_uppercase()))
}

/// LOWER(text)
pub fn fn_lower(args: &[FormulaValue]) -> FormulaValue {
    text_or_error(text_arg(args, 0).map(|s| s.to_lowercase()))
}

/// TRIM(text): strip leading and trailing spaces, collapse inner runs to one
pub fn fn_trim(args: &[FormulaValue]) -> FormulaValue {
    text_or_error(text_arg(args, 0).map(|s| {
        s.split(' ')
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }))
}

/// LEFT(text, [num_chars])
pub fn fn_left(args: &[FormulaValue]) -> FormulaValue {
    text_or_error(text_arg(args, 0).and_then(|s| Ok(take_left(&s, count_arg(args, 1, Some(1))?))))
}

/// RIGHT(text, [num_chars])
pub fn fn_right(args: &[FormulaValue]) -> FormulaValue {
    text_or_error(text_arg(args, 0).and_then(|s| Ok(take_right(&s, count_arg(args, 1, Some(1))?))))
}

/// MID(text, start_num, num_chars)
pub fn fn_mid(args: &[FormulaValue]) -> FormulaValue {
    text_or_error(text_arg(args, 0).and_then(|s| {
        let start = integer_arg(args, 1, None)?;
        let count = count_arg(args, 2, None)?;
        if start < 1 {
            return Err(CellError::Value);
        }
        let skip = usize::try_from(start - 1).map_err(|_| CellError::Value)?;
        Ok(s.chars().skip(skip).take(count).collect())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn num(n: i64) -> FormulaValue {
        FormulaValue::Number(Decimal::from(n))
    }

    fn text(s: &str) -> FormulaValue {
        FormulaValue::String(s.to_string())
    }

    #[test]
    fn test_concatenate_coerces() {
        let value = FormulaValue::Number("1.50".parse().unwrap());
        assert_eq!(
            fn_concatenate(&[text("Total: "), value, text(" "), true.into()]),
            text("Total: 1.5 TRUE")
        );
        assert_eq!(
            fn_concatenate(&[text("a"), FormulaValue::Error(CellError::Na)]),
            FormulaValue::Error(CellError::Na)
        );
    }

    #[test]
    fn test_concat_flattens_ranges() {
        let range = FormulaValue::Array(vec![vec![text("a"), text("b")], vec![FormulaValue::Empty, num(1)]]);
        assert_eq!(fn_concat(&[range, text("!")]), text("ab1!"));
        assert_eq!(
            fn_concatenate(&[FormulaValue::Array(vec![vec![text("a"), text("b")]])]),
            FormulaValue::Error(CellError::Value)
        );
    }

    #[test]
    fn test_len_counts_chars() {
        assert_eq!(fn_len(&[text("héllo")]), num(5));
        assert_eq!(fn_len(&[num(123)]), num(3));
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(fn_upper(&[text("abc")]), text("ABC"));
        assert_eq!(fn_lower(&[text("AbC")]), text("abc"));
        assert_eq!(fn_trim(&[text("  a   b  ")]), text("a b"));
    }

    #[test]
    fn test_left_right_mid() {
        assert_eq!(fn_left(&[text("spreadsheet")]), text("s"));
        assert_eq!(fn_left(&[text("spreadsheet"), num(6)]), text("spread"));
        assert_eq!(fn_right(&[text("spreadsheet"), num(5)]), text("sheet"));
        assert_eq!(fn_right(&[text("ab"), num(10)]), text("ab"));
        assert_eq!(fn_mid(&[text("spreadsheet"), num(3), num(4)]), text("read"));
        assert_eq!(
            fn_left(&[text("x"), num(-1)]),
            FormulaValue::Error(CellError::Value)
        );
        assert_eq!(
            fn_mid(&[text("x"), num(0), num(1)]),
            FormulaValue::Error(CellError::Value)
        );
    }
}
