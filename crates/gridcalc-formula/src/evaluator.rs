//! Formula evaluator
//!
//! Evaluates formula ASTs against a [`CellSource`] to produce values. Arithmetic is
//! done on [`Decimal`], so `0.1 + 0.2` is exactly `0.3`; values only become `f64`
//! again when they leave the engine as a [`CellValue`].
//!
//! Magnitudes beyond the decimal range (about 7.9e28) are carried as
//! [`FormulaValue::Float`]. Operators and comparisons accept them and fall back to
//! `f64` arithmetic on decimal overflow; functions that need exact digits (ROUND,
//! MOD, SUMPRODUCT) report `#NUM!` for them.

use crate::ast::{BinaryOperator, CellReference, ExprKind, FormulaExpr, RangeReference, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::Builtin;
use gridcalc_core::{CellError, CellKey, CellValue, Worksheet};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use std::cmp::Ordering;
use std::str::FromStr;

/// Largest range (in cells) a single reference may expand to by default
pub const DEFAULT_MAX_RANGE_CELLS: u64 = 4_000_000;

/// Value types during formula evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(Decimal),
    /// A number too large for [`Decimal`]
    Float(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
    /// Row-major rectangular block, produced by ranges and element-wise operators
    Array(Vec<Vec<FormulaValue>>),
    Empty,
}

impl FormulaValue {
    /// Lift an `f64` into an evaluation value
    ///
    /// Values in the decimal range become exact decimals (tiny ones rounded to 28
    /// places), larger ones stay `f64` and non-finite ones are `#NUM!`.
    pub fn from_f64(n: f64) -> Self {
        if !n.is_finite() {
            return FormulaValue::Error(CellError::Num);
        }
        decimal_from_f64(n).map_or(FormulaValue::Float(n), FormulaValue::Number)
    }

    /// Convert a snapshot value into an evaluation value
    pub fn from_cell_value(value: &CellValue) -> Self {
        match value {
            CellValue::Empty => FormulaValue::Empty,
            CellValue::Boolean(b) => FormulaValue::Boolean(*b),
            CellValue::Number(n) => FormulaValue::from_f64(*n),
            CellValue::String(s) => FormulaValue::String(s.clone()),
            CellValue::Error(e) => FormulaValue::Error(*e),
        }
    }

    /// Convert to number, if possible
    ///
    /// Booleans count as 1/0, empty as 0, and text only when it reads as a number.
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Boolean(b) => Some(if *b { Decimal::ONE } else { Decimal::ZERO }),
            FormulaValue::Empty => Some(Decimal::ZERO),
            FormulaValue::String(s) => parse_number(s),
            _ => None,
        }
    }

    /// Force conversion to number for arithmetic; errors pass through unchanged
    ///
    /// A number outside the decimal range is `#NUM!`.
    pub fn to_number(&self) -> Result<Decimal, CellError> {
        match self {
            FormulaValue::Error(e) => Err(*e),
            FormulaValue::Float(_) => Err(CellError::Num),
            other => other.as_number().ok_or(CellError::Value),
        }
    }

    /// Convert to `f64`, with the same coercions as [`as_number`](Self::as_number)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FormulaValue::Float(f) => Some(*f),
            other => other.as_number().and_then(|n| n.to_f64()),
        }
    }

    /// Whether this is a number of either representation
    pub fn is_number(&self) -> bool {
        matches!(self, FormulaValue::Number(_) | FormulaValue::Float(_))
    }

    /// Convert to boolean the way AND, OR and NOT do
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FormulaValue::Boolean(b) => Some(*b),
            FormulaValue::Number(n) => Some(!n.is_zero()),
            FormulaValue::Float(f) => Some(*f != 0.0),
            FormulaValue::Empty => Some(false),
            FormulaValue::String(s) => {
                if s.eq_ignore_ascii_case("TRUE") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("FALSE") {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Convert to string
    pub fn as_string(&self) -> String {
        match self {
            FormulaValue::Number(n) => format_number(*n),
            FormulaValue::Float(f) => format_float(*f),
            FormulaValue::String(s) => s.clone(),
            FormulaValue::Boolean(true) => "TRUE".to_string(),
            FormulaValue::Boolean(false) => "FALSE".to_string(),
            FormulaValue::Error(e) => e.to_string(),
            FormulaValue::Empty => String::new(),
            FormulaValue::Array(_) => CellError::Value.to_string(),
        }
    }

    /// Force conversion to text; errors pass through, arrays are `#VALUE!`
    pub fn to_text(&self) -> Result<String, CellError> {
        match self {
            FormulaValue::Error(e) => Err(*e),
            FormulaValue::Array(_) => Err(CellError::Value),
            other => Ok(other.as_string()),
        }
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }

    /// Get the error if this is one
    pub fn get_error(&self) -> Option<CellError> {
        match self {
            FormulaValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Collapse a final result to a single value
    ///
    /// A 1x1 array yields its only element, larger arrays are `#VALUE!` and an empty
    /// result reads as 0.
    pub fn into_scalar(self) -> FormulaValue {
        match self {
            FormulaValue::Array(mut rows) => {
                if rows.len() == 1 && rows[0].len() == 1 {
                    rows.pop()
                        .and_then(|mut row| row.pop())
                        .map_or(FormulaValue::Error(CellError::Value), FormulaValue::into_scalar)
                } else {
                    FormulaValue::Error(CellError::Value)
                }
            }
            FormulaValue::Empty => FormulaValue::Number(Decimal::ZERO),
            other => other,
        }
    }

    /// Convert to the boundary representation, normalizing numbers to `f64`
    pub fn to_cell_value(&self) -> CellValue {
        match self {
            FormulaValue::Empty => CellValue::Empty,
            FormulaValue::Number(n) => n
                .to_f64()
                .map_or(CellValue::Error(CellError::Num), CellValue::Number),
            FormulaValue::Float(f) => CellValue::Number(*f),
            FormulaValue::String(s) => CellValue::String(s.clone()),
            FormulaValue::Boolean(b) => CellValue::Boolean(*b),
            FormulaValue::Error(e) => CellValue::Error(*e),
            FormulaValue::Array(_) => CellValue::Error(CellError::Value),
        }
    }

    /// Number of rows and columns; scalars are 1x1
    pub fn dimensions(&self) -> (usize, usize) {
        match self {
            FormulaValue::Array(rows) => (rows.len(), rows.first().map_or(0, Vec::len)),
            _ => (1, 1),
        }
    }

    /// Iterate over every element, row-major; a scalar yields itself
    pub fn iter_values(&self) -> Box<dyn Iterator<Item = &FormulaValue> + '_> {
        match self {
            FormulaValue::Array(rows) => Box::new(rows.iter().flatten()),
            other => Box::new(std::iter::once(other)),
        }
    }
}

impl From<Decimal> for FormulaValue {
    fn from(n: Decimal) -> Self {
        FormulaValue::Number(n)
    }
}

impl From<bool> for FormulaValue {
    fn from(b: bool) -> Self {
        FormulaValue::Boolean(b)
    }
}

impl From<CellError> for FormulaValue {
    fn from(e: CellError) -> Self {
        FormulaValue::Error(e)
    }
}

impl From<&str> for FormulaValue {
    fn from(s: &str) -> Self {
        FormulaValue::String(s.to_string())
    }
}

/// Convert an `f64` to a decimal through its shortest round-trip text, so `0.1`
/// becomes exactly `0.1` rather than its binary expansion
///
/// Digits past the 28th decimal place are rounded off; magnitudes beyond the
/// decimal range give `None`.
pub fn decimal_from_f64(n: f64) -> Option<Decimal> {
    if !n.is_finite() {
        return None;
    }
    Decimal::from_str(&n.to_string())
        .or_else(|_| Decimal::from_str(&format!("{:.28}", n)))
        .ok()
}

/// Read text as a number the way arithmetic coercion does (`" 12.5 "`, `"1E3"`)
pub fn parse_number(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if text.contains(['e', 'E']) {
        Decimal::from_scientific(&text.replace('+', "")).ok()
    } else {
        Decimal::from_str(text).ok()
    }
}

/// Render a number as text with at most 15 significant digits
pub fn format_number(n: Decimal) -> String {
    n.round_sf(15).unwrap_or(n).normalize().to_string()
}

/// Render a number beyond the decimal range in scientific form, e.g. `1.5E+30`
pub fn format_float(f: f64) -> String {
    let text = format!("{:.14E}", f);
    let (mantissa, exponent) = text.split_once('E').unwrap_or((text.as_str(), "0"));
    let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{}E{}{}", mantissa, sign, exponent.abs())
}

/// Source of snapshot values during evaluation
pub trait CellSource {
    /// The value stored under `key`, if any
    fn get(&self, key: &CellKey) -> Option<&CellValue>;

    /// Whether the source has any entry on this sheet
    fn knows_sheet(&self, workbook: Option<&str>, sheet: &str) -> bool;
}

impl CellSource for Worksheet {
    fn get(&self, key: &CellKey) -> Option<&CellValue> {
        Worksheet::get(self, key)
    }

    fn knows_sheet(&self, workbook: Option<&str>, sheet: &str) -> bool {
        Worksheet::knows_sheet(self, workbook, sheet)
    }
}

/// Context for formula evaluation
pub struct EvaluationContext<'a> {
    source: &'a dyn CellSource,
    max_range_cells: u64,
}

impl<'a> EvaluationContext<'a> {
    /// Create a new evaluation context
    pub fn new(source: &'a dyn CellSource) -> Self {
        Self {
            source,
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
        }
    }

    /// Cap the number of cells a single range reference may expand to
    pub fn with_max_range_cells(mut self, max: u64) -> Self {
        self.max_range_cells = max;
        self
    }

    fn sheet_exists(&self, workbook: Option<&str>, sheet: Option<&str>) -> bool {
        match sheet {
            Some(sheet) => self.source.knows_sheet(workbook, sheet),
            None => true,
        }
    }

    /// Get a cell value from the snapshot
    pub fn cell_value(&self, reference: &CellReference) -> FormulaValue {
        if !self.sheet_exists(reference.workbook.as_deref(), reference.sheet.as_deref()) {
            return FormulaValue::Error(CellError::Ref);
        }
        self.source
            .get(&reference.key())
            .map_or(FormulaValue::Empty, FormulaValue::from_cell_value)
    }

    /// Get a range of cell values as an array
    pub fn range_values(&self, reference: &RangeReference) -> FormulaValue {
        if !self.sheet_exists(reference.workbook.as_deref(), reference.sheet.as_deref()) {
            return FormulaValue::Error(CellError::Ref);
        }
        let range = reference.range;
        if range.cell_count() > self.max_range_cells {
            tracing::warn!(
                range = %reference.key(),
                cells = range.cell_count(),
                "range too large to expand"
            );
            return FormulaValue::Error(CellError::Ref);
        }

        let key = reference.key();
        let width = range.col_count() as usize;
        let mut rows = Vec::with_capacity(range.row_count() as usize);
        let mut row = Vec::with_capacity(width);
        for cell in key.cells() {
            row.push(
                self.source
                    .get(&cell)
                    .map_or(FormulaValue::Empty, FormulaValue::from_cell_value),
            );
            if row.len() == width {
                rows.push(std::mem::replace(&mut row, Vec::with_capacity(width)));
            }
        }

        FormulaValue::Array(rows)
    }

    /// Resolve a named value; unknown names are `#NAME?`
    pub fn name_value(&self, name: &str) -> FormulaValue {
        self.source
            .get(&CellKey::name(name))
            .map_or(FormulaValue::Error(CellError::Name), FormulaValue::from_cell_value)
    }
}

/// Evaluate a formula expression
///
/// Spreadsheet errors such as `#DIV/0!` come back as [`FormulaValue::Error`]; only
/// unknown functions and wrong argument counts fail the whole evaluation.
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match &expr.kind {
        // === Literals ===
        ExprKind::Number(n) => Ok(FormulaValue::Number(*n)),
        ExprKind::Float(f) => Ok(FormulaValue::Float(*f)),
        ExprKind::String(s) => Ok(FormulaValue::String(s.clone())),
        ExprKind::Boolean(b) => Ok(FormulaValue::Boolean(*b)),
        ExprKind::Error(e) => Ok(FormulaValue::Error(*e)),
        ExprKind::Empty => Ok(FormulaValue::Empty),

        // === References ===
        ExprKind::CellRef(reference) => Ok(ctx.cell_value(reference)),
        ExprKind::RangeRef(reference) => Ok(ctx.range_values(reference)),
        ExprKind::NameRef(name) => Ok(ctx.name_value(name)),

        // === Operators ===
        ExprKind::BinaryOp { op, left, right } => {
            let left = evaluate(left, ctx)?;
            let right = evaluate(right, ctx)?;
            Ok(binary_op(*op, &left, &right))
        }
        ExprKind::UnaryOp { op, operand } => {
            let value = evaluate(operand, ctx)?;
            Ok(unary_op(*op, &value))
        }

        // === Functions ===
        ExprKind::Function { name, args } => evaluate_function(name, args, ctx),
    }
}

/// Evaluate a function call
fn evaluate_function(
    name: &str,
    args: &[FormulaExpr],
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let func =
        Builtin::from_name(name).ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;
    func.check_arity(args.len())?;

    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        let value = match &arg.kind {
            // aggregates treat a referenced cell like a one-cell range
            ExprKind::CellRef(reference) if func.takes_references() => {
                FormulaValue::Array(vec![vec![ctx.cell_value(reference)]])
            }
            _ => evaluate(arg, ctx)?,
        };
        values.push(value);
    }

    Ok(func.call(&values))
}

/// Apply a binary operator, element-wise when either side is an array
pub fn binary_op(op: BinaryOperator, left: &FormulaValue, right: &FormulaValue) -> FormulaValue {
    match (left, right) {
        (FormulaValue::Array(a), FormulaValue::Array(b)) => {
            if left.dimensions() != right.dimensions() {
                return FormulaValue::Error(CellError::Value);
            }
            FormulaValue::Array(
                a.iter()
                    .zip(b)
                    .map(|(ra, rb)| ra.iter().zip(rb).map(|(x, y)| scalar_op(op, x, y)).collect())
                    .collect(),
            )
        }
        (FormulaValue::Array(a), scalar) => FormulaValue::Array(
            a.iter()
                .map(|row| row.iter().map(|x| scalar_op(op, x, scalar)).collect())
                .collect(),
        ),
        (scalar, FormulaValue::Array(b)) => FormulaValue::Array(
            b.iter()
                .map(|row| row.iter().map(|y| scalar_op(op, scalar, y)).collect())
                .collect(),
        ),
        _ => scalar_op(op, left, right),
    }
}

fn scalar_op(op: BinaryOperator, left: &FormulaValue, right: &FormulaValue) -> FormulaValue {
    // Propagate errors, left operand first
    if let Some(e) = left.get_error().or_else(|| right.get_error()) {
        return FormulaValue::Error(e);
    }

    if op.is_comparison() {
        let ord = compare_values(left, right);
        let result = match op {
            BinaryOperator::Equal => ord == Ordering::Equal,
            BinaryOperator::NotEqual => ord != Ordering::Equal,
            BinaryOperator::LessThan => ord == Ordering::Less,
            BinaryOperator::LessEqual => ord != Ordering::Greater,
            BinaryOperator::GreaterThan => ord == Ordering::Greater,
            _ => ord != Ordering::Less,
        };
        return FormulaValue::Boolean(result);
    }

    if op == BinaryOperator::Concat {
        return match (left.to_text(), right.to_text()) {
            (Ok(l), Ok(r)) => FormulaValue::String(l + &r),
            (Err(e), _) | (_, Err(e)) => FormulaValue::Error(e),
        };
    }

    if matches!(left, FormulaValue::Float(_)) || matches!(right, FormulaValue::Float(_)) {
        return match (left.as_f64(), right.as_f64()) {
            (Some(l), Some(r)) => float_arithmetic(op, l, r),
            _ => FormulaValue::Error(CellError::Value),
        };
    }

    let (l, r) = match (left.to_number(), right.to_number()) {
        (Ok(l), Ok(r)) => (l, r),
        (Err(e), _) | (_, Err(e)) => return FormulaValue::Error(e),
    };
    arithmetic(op, l, r)
}

fn to_f64(n: Decimal) -> f64 {
    n.to_f64().unwrap_or(f64::NAN)
}

/// Decimal arithmetic; results beyond the decimal range continue on `f64`
pub fn arithmetic(op: BinaryOperator, l: Decimal, r: Decimal) -> FormulaValue {
    let result = match op {
        BinaryOperator::Add => l.checked_add(r),
        BinaryOperator::Subtract => l.checked_sub(r),
        BinaryOperator::Multiply => l.checked_mul(r),
        BinaryOperator::Divide => {
            if r.is_zero() {
                return FormulaValue::Error(CellError::Div0);
            }
            l.checked_div(r)
        }
        BinaryOperator::Power => return power(l, r),
        _ => return FormulaValue::Error(CellError::Value),
    };
    result.map_or_else(
        || float_arithmetic(op, to_f64(l), to_f64(r)),
        FormulaValue::Number,
    )
}

/// `f64` arithmetic for operands or results beyond the decimal range
fn float_arithmetic(op: BinaryOperator, l: f64, r: f64) -> FormulaValue {
    let result = match op {
        BinaryOperator::Add => l + r,
        BinaryOperator::Subtract => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide => {
            if r == 0.0 {
                return FormulaValue::Error(CellError::Div0);
            }
            l / r
        }
        BinaryOperator::Power => return float_power(l, r),
        _ => return FormulaValue::Error(CellError::Value),
    };
    FormulaValue::from_f64(result)
}

/// `base ^ exponent`; integer exponents stay exact while the result fits a decimal
pub fn power(base: Decimal, exponent: Decimal) -> FormulaValue {
    if base.is_zero() || (base.is_sign_negative() && !exponent.fract().is_zero()) {
        return float_power(to_f64(base), to_f64(exponent));
    }

    let exact = if exponent.fract().is_zero() {
        exponent.to_i64().and_then(|e| base.checked_powi(e))
    } else {
        base.checked_powd(exponent)
    };
    exact.map_or_else(
        || float_power(to_f64(base), to_f64(exponent)),
        FormulaValue::Number,
    )
}

fn float_power(base: f64, exponent: f64) -> FormulaValue {
    if base == 0.0 {
        return match exponent.partial_cmp(&0.0) {
            Some(Ordering::Less) => FormulaValue::Error(CellError::Div0),
            Some(Ordering::Greater) => FormulaValue::Number(Decimal::ZERO),
            _ => FormulaValue::Error(CellError::Num),
        };
    }
    if base < 0.0 && exponent.fract() != 0.0 {
        return FormulaValue::Error(CellError::Num);
    }
    FormulaValue::from_f64(base.powf(exponent))
}

/// Apply a unary operator, element-wise over arrays
pub fn unary_op(op: UnaryOperator, value: &FormulaValue) -> FormulaValue {
    if let FormulaValue::Array(rows) = value {
        return FormulaValue::Array(
            rows.iter()
                .map(|row| row.iter().map(|v| unary_op(op, v)).collect())
                .collect(),
        );
    }

    if let FormulaValue::Float(f) = value {
        return match op {
            UnaryOperator::Negate => FormulaValue::Float(-f),
            UnaryOperator::Percent => FormulaValue::from_f64(f / 100.0),
        };
    }

    let n = match value.to_number() {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    match op {
        UnaryOperator::Negate => FormulaValue::Number(-n),
        UnaryOperator::Percent => n
            .checked_div(Decimal::ONE_HUNDRED)
            .map_or(FormulaValue::Error(CellError::Num), FormulaValue::Number),
    }
}

/// Compare two values for ordering (Excel-style comparison)
///
/// Numbers sort before text, text before logicals; text compares case-insensitively.
/// An empty value compares as the other side's zero value.
pub fn compare_values(left: &FormulaValue, right: &FormulaValue) -> Ordering {
    fn rank(v: &FormulaValue) -> u8 {
        match v {
            FormulaValue::Number(_) | FormulaValue::Float(_) | FormulaValue::Empty => 0,
            FormulaValue::String(_) => 1,
            FormulaValue::Boolean(_) => 2,
            FormulaValue::Error(_) | FormulaValue::Array(_) => 3,
        }
    }

    fn blank_like(other: &FormulaValue) -> FormulaValue {
        match other {
            FormulaValue::String(_) => FormulaValue::String(String::new()),
            FormulaValue::Boolean(_) => FormulaValue::Boolean(false),
            _ => FormulaValue::Number(Decimal::ZERO),
        }
    }

    match (left, right) {
        (FormulaValue::Empty, FormulaValue::Empty) => Ordering::Equal,
        (FormulaValue::Empty, other) => compare_values(&blank_like(other), other),
        (other, FormulaValue::Empty) => compare_values(other, &blank_like(other)),
        (FormulaValue::Number(l), FormulaValue::Number(r)) => l.cmp(r),
        (FormulaValue::Float(_), FormulaValue::Number(_) | FormulaValue::Float(_))
        | (FormulaValue::Number(_), FormulaValue::Float(_)) => {
            let (l, r) = (left.as_f64().unwrap_or(0.0), right.as_f64().unwrap_or(0.0));
            l.partial_cmp(&r).unwrap_or(Ordering::Equal)
        }
        (FormulaValue::String(l), FormulaValue::String(r)) => {
            l.to_lowercase().cmp(&r.to_lowercase())
        }
        (FormulaValue::Boolean(l), FormulaValue::Boolean(r)) => l.cmp(r),
        _ => rank(left).cmp(&rank(right)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;
    use pretty_assertions::assert_eq;

    fn eval_with(sheet: &Worksheet, formula: &str) -> FormulaResult<FormulaValue> {
        let ast = parse_formula(formula)?;
        let ctx = EvaluationContext::new(sheet);
        evaluate(&ast, &ctx).map(FormulaValue::into_scalar)
    }

    fn eval(formula: &str) -> FormulaResult<FormulaValue> {
        eval_with(&Worksheet::new(), formula)
    }

    fn num(s: &str) -> FormulaValue {
        FormulaValue::Number(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_evaluate_literals() {
        assert_eq!(eval("=42").unwrap(), num("42"));
        assert_eq!(eval("=\"Hello\"").unwrap(), FormulaValue::String("Hello".into()));
        assert_eq!(eval("=TRUE").unwrap(), FormulaValue::Boolean(true));
        assert_eq!(eval("=#VALUE!").unwrap(), FormulaValue::Error(CellError::Value));
    }

    #[test]
    fn test_decimal_precision() {
        assert_eq!(eval("=0.1+0.2").unwrap(), num("0.3"));
        assert_eq!(eval("=999999999999999+1").unwrap(), num("1000000000000000"));
        assert_eq!(eval("=0.1+0.2").unwrap().to_cell_value(), CellValue::Number(0.3));
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(eval("=10-3").unwrap(), num("7"));
        assert_eq!(eval("=20/4").unwrap(), num("5"));
        assert_eq!(eval("=2^10").unwrap(), num("1024"));
        assert_eq!(eval("=2^-1").unwrap(), num("0.5"));
        assert_eq!(eval("=1+2*3").unwrap(), num("7"));
        assert_eq!(eval("=(1+2)*3").unwrap(), num("9"));
        assert_eq!(eval("=-2^2").unwrap(), num("-4"));
        assert_eq!(eval("=50%").unwrap(), num("0.5"));
        assert_eq!(eval("=--5").unwrap(), num("5"));
    }

    #[test]
    fn test_numeric_text_coercion() {
        assert_eq!(eval("=\"123\"+456").unwrap(), num("579"));
        assert_eq!(eval("=TRUE+1").unwrap(), num("2"));
        assert_eq!(eval("=\"abc\"+1").unwrap(), FormulaValue::Error(CellError::Value));
    }

    #[test]
    fn test_evaluate_errors() {
        assert_eq!(eval("=10/0").unwrap(), FormulaValue::Error(CellError::Div0));
        assert_eq!(eval("=0^-1").unwrap(), FormulaValue::Error(CellError::Div0));
        assert_eq!(eval("=(-8)^0.5").unwrap(), FormulaValue::Error(CellError::Num));
        assert_eq!(eval("=#N/A+1").unwrap(), FormulaValue::Error(CellError::Na));
        assert_eq!(eval("=XFE1").unwrap(), FormulaValue::Error(CellError::Ref));
    }

    #[test]
    fn test_evaluate_comparison() {
        assert_eq!(eval("=1<2").unwrap(), FormulaValue::Boolean(true));
        assert_eq!(eval("=5<>5").unwrap(), FormulaValue::Boolean(false));
        assert_eq!(eval("=\"abc\"=\"ABC\"").unwrap(), FormulaValue::Boolean(true));
        assert_eq!(eval("=\"a\">1").unwrap(), FormulaValue::Boolean(true));
        assert_eq!(eval("=TRUE>\"z\"").unwrap(), FormulaValue::Boolean(true));
        assert_eq!(eval("=A1=0").unwrap(), FormulaValue::Boolean(true));
        assert_eq!(eval("=A1=\"\"").unwrap(), FormulaValue::Boolean(true));
    }

    #[test]
    fn test_evaluate_concatenation() {
        assert_eq!(
            eval("=\"Value: \"&42").unwrap(),
            FormulaValue::String("Value: 42".into())
        );
        assert_eq!(eval("=1/4&\"\"").unwrap(), FormulaValue::String("0.25".into()));
        assert_eq!(
            eval("=1/3&\"\"").unwrap(),
            FormulaValue::String("0.333333333333333".into())
        );
        assert_eq!(eval("=TRUE&1").unwrap(), FormulaValue::String("TRUE1".into()));
    }

    #[test]
    fn test_cell_and_name_references() {
        let sheet = Worksheet::from_pairs([
            ("A1", CellValue::Number(10.0)),
            ("Data!B2", CellValue::Number(2.5)),
            ("rate", CellValue::Number(0.1)),
        ])
        .unwrap();

        assert_eq!(eval_with(&sheet, "=A1*rate").unwrap(), num("1"));
        assert_eq!(eval_with(&sheet, "=Data!B2+A2").unwrap(), num("2.5"));
        assert_eq!(
            eval_with(&sheet, "=Missing!A1").unwrap(),
            FormulaValue::Error(CellError::Ref)
        );
        assert_eq!(
            eval_with(&sheet, "=unknown_name").unwrap(),
            FormulaValue::Error(CellError::Name)
        );
    }

    #[test]
    fn test_element_wise_ranges() {
        let sheet = Worksheet::from_pairs([
            ("A1", 1.0),
            ("A2", 2.0),
            ("A3", 3.0),
            ("B1", 4.0),
            ("B2", 5.0),
            ("B3", 6.0),
        ])
        .unwrap();

        assert_eq!(eval_with(&sheet, "=SUM(A1:A3*B1:B3)").unwrap(), num("32"));
        assert_eq!(eval_with(&sheet, "=SUM(A1:A3*2)").unwrap(), num("12"));
        assert_eq!(
            eval_with(&sheet, "=SUM(A1:A3*B1:B2)").unwrap(),
            FormulaValue::Error(CellError::Value)
        );
        // a multi-cell result cannot be a single cell's value
        assert_eq!(
            eval_with(&sheet, "=A1:A3").unwrap(),
            FormulaValue::Error(CellError::Value)
        );
        assert_eq!(eval_with(&sheet, "=B2:B2").unwrap(), num("5"));
    }

    #[test]
    fn test_range_size_limit() {
        let sheet = Worksheet::new();
        let ast = parse_formula("=SUM(A1:B10)").unwrap();
        let ctx = EvaluationContext::new(&sheet).with_max_range_cells(10);
        assert_eq!(
            evaluate(&ast, &ctx).unwrap(),
            FormulaValue::Error(CellError::Ref)
        );
    }

    #[test]
    fn test_unknown_function() {
        assert_eq!(
            eval("=FOO(1)").unwrap_err(),
            FormulaError::UnknownFunction("FOO".into())
        );
        assert!(matches!(
            eval("=ROUND(1)").unwrap_err(),
            FormulaError::ArgumentCount { .. }
        ));
    }

    #[test]
    fn test_empty_result_is_zero() {
        assert_eq!(eval("=A1").unwrap(), num("0"));
    }

    #[test]
    fn test_decimal_from_f64() {
        assert_eq!(decimal_from_f64(0.1), Some(Decimal::new(1, 1)));
        assert_eq!(decimal_from_f64(f64::NAN), None);
        assert_eq!(decimal_from_f64(1e30), None);
        assert_eq!(decimal_from_f64(1e-30), Some(Decimal::ZERO));
        assert_eq!(FormulaValue::from_f64(1e30), FormulaValue::Float(1e30));
        assert_eq!(
            FormulaValue::from_f64(f64::INFINITY),
            FormulaValue::Error(CellError::Num)
        );
    }

    #[test]
    fn test_magnitudes_beyond_decimal_range() {
        match eval("=10^30").unwrap().to_cell_value() {
            CellValue::Number(f) => assert!((f / 1e30 - 1.0).abs() < 1e-12, "{}", f),
            other => panic!("expected a number, got {:?}", other),
        }
        assert_eq!(eval("=1E+30-1E+30").unwrap(), num("0"));
        assert_eq!(eval("=-1E+30").unwrap(), FormulaValue::Float(-1e30));
        assert_eq!(eval("=1E+30&\"\"").unwrap(), FormulaValue::String("1E+30".into()));
        assert_eq!(eval("=1E+30>5").unwrap(), FormulaValue::Boolean(true));
        assert_eq!(eval("=1E+300*1E+300").unwrap(), FormulaValue::Error(CellError::Num));
        assert_eq!(eval("=1E+30/0").unwrap(), FormulaValue::Error(CellError::Div0));
        assert_eq!(eval("=1E-30*2").unwrap(), num("0"));

        let mut sheet = Worksheet::new();
        sheet.set("A1", 1e30).unwrap();
        sheet.set("A2", 2.5e-31).unwrap();
        assert_eq!(eval_with(&sheet, "=A1").unwrap(), FormulaValue::Float(1e30));
        assert_eq!(eval_with(&sheet, "=A1*2").unwrap(), FormulaValue::Float(2e30));
        assert_eq!(eval_with(&sheet, "=A2").unwrap(), num("0"));
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1e30), "1E+30");
        assert_eq!(format_float(-1.5e29), "-1.5E+29");
        assert_eq!(format_float(1.0 / 3.0 * 1e40), "3.33333333333333E+39");
    }

    #[test]
    fn test_compare_values_ordering() {
        let values = [
            FormulaValue::Boolean(false),
            FormulaValue::String("b".into()),
            num("10"),
            FormulaValue::String("A".into()),
            num("-1"),
        ];
        let mut sorted = values.to_vec();
        sorted.sort_by(compare_values);
        assert_eq!(
            sorted,
            vec![
                num("-1"),
                num("10"),
                FormulaValue::String("A".into()),
                FormulaValue::String("b".into()),
                FormulaValue::Boolean(false),
            ]
        );
    }
}
