//! Lookup functions

use super::{integer_arg, scalar};
use crate::evaluator::{compare_values, FormulaValue};
use gridcalc_core::CellError;
use std::borrow::Cow;
use std::cmp::Ordering;

/// How a lookup key is matched against a sorted or unsorted vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchMode {
    /// First equal entry
    Exact,
    /// Largest entry not above the value (ascending data)
    LessOrEqual,
    /// Smallest entry not below the value (descending data)
    GreaterOrEqual,
}

/// Values only match when they have the same type: 1 never equals "1"
fn same_kind(a: &FormulaValue, b: &FormulaValue) -> bool {
    (a.is_number() && b.is_number())
        || matches!(
            (a, b),
            (FormulaValue::String(_), FormulaValue::String(_))
                | (FormulaValue::Boolean(_), FormulaValue::Boolean(_))
        )
}

/// Zero-based position of `value` among `keys`
fn lookup_position<'a>(
    keys: impl Iterator<Item = &'a FormulaValue>,
    value: &FormulaValue,
    mode: MatchMode,
) -> Option<usize> {
    let mut found = None;
    for (i, key) in keys.enumerate() {
        if !same_kind(key, value) {
            continue;
        }
        let ord = compare_values(key, value);
        match mode {
            MatchMode::Exact if ord == Ordering::Equal => return Some(i),
            MatchMode::Exact => {}
            MatchMode::LessOrEqual if ord == Ordering::Greater => break,
            MatchMode::GreaterOrEqual if ord == Ordering::Less => break,
            MatchMode::LessOrEqual | MatchMode::GreaterOrEqual => found = Some(i),
        }
    }
    found
}

/// A table argument as rows; a single value is a 1x1 table
fn table(value: &FormulaValue) -> Cow<'_, [Vec<FormulaValue>]> {
    match value {
        FormulaValue::Array(rows) => Cow::Borrowed(rows.as_slice()),
        other => Cow::Owned(vec![vec![other.clone()]]),
    }
}

/// The value being looked up; arrays are not allowed and errors pass through
fn lookup_value(args: &[FormulaValue]) -> Result<&FormulaValue, CellError> {
    match args.first().map(scalar) {
        Some(FormulaValue::Error(e)) => Err(*e),
        Some(FormulaValue::Array(_)) | None => Err(CellError::Value),
        Some(value) => Ok(value),
    }
}

/// The optional `range_lookup` flag of VLOOKUP/HLOOKUP; approximate when omitted
fn range_lookup(args: &[FormulaValue], index: usize) -> Result<bool, CellError> {
    match args.get(index).map(scalar) {
        None => Ok(true),
        Some(FormulaValue::Empty) => Ok(false),
        Some(FormulaValue::Error(e)) => Err(*e),
        Some(value) => value.as_bool().ok_or(CellError::Value),
    }
}

/// VLOOKUP(lookup_value, table_array, col_index_num, [range_lookup])
pub fn fn_vlookup(args: &[FormulaValue]) -> FormulaValue {
    match vlookup(args) {
        Ok(value) => value,
        Err(e) => FormulaValue::Error(e),
    }
}

fn vlookup(args: &[FormulaValue]) -> Result<FormulaValue, CellError> {
    let value = lookup_value(args)?;
    if let Some(FormulaValue::Error(e)) = args.get(1) {
        return Err(*e);
    }
    let rows = table(args.get(1).ok_or(CellError::Value)?);
    let col = integer_arg(args, 2, None)?;
    let approximate = range_lookup(args, 3)?;

    if col < 1 {
        return Err(CellError::Value);
    }
    let width = rows.first().map_or(0, Vec::len);
    let col = (col - 1) as usize;
    if col >= width {
        return Err(CellError::Ref);
    }

    let mode = if approximate {
        MatchMode::LessOrEqual
    } else {
        MatchMode::Exact
    };
    let row = lookup_position(rows.iter().filter_map(|r| r.first()), value, mode)
        .ok_or(CellError::Na)?;
    Ok(rows[row][col].clone())
}

/// HLOOKUP(lookup_value, table_array, row_index_num, [range_lookup])
pub fn fn_hlookup(args: &[FormulaValue]) -> FormulaValue {
    match hlookup(args) {
        Ok(value) => value,
        Err(e) => FormulaValue::Error(e),
    }
}

fn hlookup(args: &[FormulaValue]) -> Result<FormulaValue, CellError> {
    let value = lookup_value(args)?;
    if let Some(FormulaValue::Error(e)) = args.get(1) {
        return Err(*e);
    }
    let rows = table(args.get(1).ok_or(CellError::Value)?);
    let row = integer_arg(args, 2, None)?;
    let approximate = range_lookup(args, 3)?;

    if row < 1 {
        return Err(CellError::Value);
    }
    let row = (row - 1) as usize;
    if row >= rows.len() {
        return Err(CellError::Ref);
    }

    let mode = if approximate {
        MatchMode::LessOrEqual
    } else {
        MatchMode::Exact
    };
    let header = rows.first().ok_or(CellError::Na)?;
    let col = lookup_position(header.iter(), value, mode).ok_or(CellError::Na)?;
    rows[row].get(col).cloned().ok_or(CellError::Ref)
}

/// INDEX(array, row_num, [column_num])
///
/// A zero row or column selects the whole column or row. With a single-row array and
/// no `column_num`, `row_num` picks the column.
pub fn fn_index(args: &[FormulaValue]) -> FormulaValue {
    match index(args) {
        Ok(value) => value,
        Err(e) => FormulaValue::Error(e),
    }
}

fn index(args: &[FormulaValue]) -> Result<FormulaValue, CellError> {
    let source = args.first().ok_or(CellError::Value)?;
    if let FormulaValue::Error(e) = source {
        return Err(*e);
    }
    let rows = table(source);
    let height = rows.len();
    let width = rows.first().map_or(0, Vec::len);

    let first = integer_arg(args, 1, Some(0))?;
    let second = if args.len() > 2 {
        Some(integer_arg(args, 2, Some(0))?)
    } else {
        None
    };
    let (row, col) = match second {
        Some(col) => (first, col),
        None if height == 1 => (1, first),
        None => (first, 1),
    };

    if row < 0 || col < 0 {
        return Err(CellError::Value);
    }
    let (row, col) = (row as usize, col as usize);
    if row > height || col > width {
        return Err(CellError::Ref);
    }

    Ok(match (row, col) {
        (0, 0) => FormulaValue::Array(rows.into_owned()),
        (0, c) => FormulaValue::Array(rows.iter().map(|r| vec![r[c - 1].clone()]).collect()),
        (r, 0) => FormulaValue::Array(vec![rows[r - 1].clone()]),
        (r, c) => rows[r - 1][c - 1].clone(),
    })
}

/// MATCH(lookup_value, lookup_array, [match_type])
///
/// `match_type` 1 (the default) expects ascending data, -1 descending, 0 exact.
pub fn fn_match(args: &[FormulaValue]) -> FormulaValue {
    match match_position(args) {
        Ok(value) => value,
        Err(e) => FormulaValue::Error(e),
    }
}

fn match_position(args: &[FormulaValue]) -> Result<FormulaValue, CellError> {
    let value = lookup_value(args)?;
    let source = args.get(1).ok_or(CellError::Na)?;
    if let FormulaValue::Error(e) = source {
        return Err(*e);
    }
    let rows = table(source);
    let mode = match integer_arg(args, 2, Some(1))? {
        0 => MatchMode::Exact,
        n if n > 0 => MatchMode::LessOrEqual,
        _ => MatchMode::GreaterOrEqual,
    };

    let width = rows.first().map_or(0, Vec::len);
    let position = if rows.len() == 1 {
        lookup_position(rows[0].iter(), value, mode)
    } else if width == 1 {
        lookup_position(rows.iter().filter_map(|r| r.first()), value, mode)
    } else {
        None
    };

    position
        .map(|i| FormulaValue::Number((i + 1).into()))
        .ok_or(CellError::Na)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn num(n: i64) -> FormulaValue {
        FormulaValue::Number(Decimal::from(n))
    }

    fn prices() -> FormulaValue {
        FormulaValue::Array(vec![
            vec!["apple".into(), num(3)],
            vec!["banana".into(), num(1)],
            vec!["cherry".into(), num(7)],
        ])
    }

    fn brackets() -> FormulaValue {
        FormulaValue::Array(vec![
            vec![num(0), "F".into()],
            vec![num(60), "D".into()],
            vec![num(70), "C".into()],
            vec![num(80), "B".into()],
            vec![num(90), "A".into()],
        ])
    }

    #[test]
    fn test_vlookup_exact() {
        assert_eq!(
            fn_vlookup(&["Banana".into(), prices(), num(2), false.into()]),
            num(1)
        );
        assert_eq!(
            fn_vlookup(&["durian".into(), prices(), num(2), false.into()]),
            FormulaValue::Error(CellError::Na)
        );
    }

    #[test]
    fn test_vlookup_exact_does_not_coerce() {
        let table = FormulaValue::Array(vec![vec!["1".into(), "text one".into()]]);
        assert_eq!(
            fn_vlookup(&[num(1), table, num(2), false.into()]),
            FormulaValue::Error(CellError::Na)
        );
    }

    #[test]
    fn test_vlookup_approximate() {
        assert_eq!(fn_vlookup(&[num(85), brackets(), num(2)]), FormulaValue::from("B"));
        assert_eq!(
            fn_vlookup(&[num(90), brackets(), num(2), true.into()]),
            FormulaValue::from("A")
        );
        assert_eq!(
            fn_vlookup(&[num(-5), brackets(), num(2)]),
            FormulaValue::Error(CellError::Na)
        );
    }

    #[test]
    fn test_vlookup_bad_column() {
        assert_eq!(
            fn_vlookup(&["apple".into(), prices(), num(3), false.into()]),
            FormulaValue::Error(CellError::Ref)
        );
        assert_eq!(
            fn_vlookup(&["apple".into(), prices(), num(0), false.into()]),
            FormulaValue::Error(CellError::Value)
        );
    }

    #[test]
    fn test_hlookup() {
        let table = FormulaValue::Array(vec![
            vec!["q1".into(), "q2".into()],
            vec![num(10), num(20)],
        ]);
        assert_eq!(fn_hlookup(&["Q2".into(), table, num(2), false.into()]), num(20));
    }

    #[test]
    fn test_index() {
        assert_eq!(fn_index(&[prices(), num(3), num(2)]), num(7));
        assert_eq!(fn_index(&[prices(), num(4), num(1)]), FormulaValue::Error(CellError::Ref));
        assert_eq!(
            fn_index(&[prices(), num(2), num(0)]),
            FormulaValue::Array(vec![vec!["banana".into(), num(1)]])
        );

        let row = FormulaValue::Array(vec![vec![num(5), num(6), num(7)]]);
        assert_eq!(fn_index(&[row, num(3)]), num(7));
    }

    #[test]
    fn test_match() {
        let column = FormulaValue::Array(vec![vec![num(10)], vec![num(20)], vec![num(30)]]);
        assert_eq!(fn_match(&[num(20), column.clone(), num(0)]), num(2));
        assert_eq!(fn_match(&[num(25), column.clone()]), num(2));
        assert_eq!(
            fn_match(&[num(5), column, num(1)]),
            FormulaValue::Error(CellError::Na)
        );

        let descending = FormulaValue::Array(vec![vec![num(30), num(20), num(10)]]);
        assert_eq!(fn_match(&[num(25), descending, num(-1)]), num(1));
    }
}
