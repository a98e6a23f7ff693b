//! Math functions

use super::{collect_numbers, integer_arg, number_arg, value_or_error};
use crate::ast::BinaryOperator;
use crate::evaluator::{binary_op, compare_values, power, FormulaValue};
use gridcalc_core::CellError;
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};

/// Most decimal places a `Decimal` can carry
const MAX_DIGITS: u32 = 28;

/// Fold numbers with an arithmetic operator, so sums and products that outgrow a
/// decimal carry on in `f64`
fn fold_numbers(numbers: Vec<FormulaValue>, op: BinaryOperator, init: Decimal) -> FormulaValue {
    numbers
        .iter()
        .fold(FormulaValue::Number(init), |acc, n| binary_op(op, &acc, n))
}

/// SUM function
pub fn fn_sum(args: &[FormulaValue]) -> FormulaValue {
    value_or_error(collect_numbers(args).map(|numbers| {
        fold_numbers(numbers, BinaryOperator::Add, Decimal::ZERO)
    }))
}

/// AVERAGE function
pub fn fn_average(args: &[FormulaValue]) -> FormulaValue {
    value_or_error(collect_numbers(args).and_then(|numbers| {
        if numbers.is_empty() {
            return Err(CellError::Div0);
        }
        let count = FormulaValue::Number(Decimal::from(numbers.len()));
        let sum = fold_numbers(numbers, BinaryOperator::Add, Decimal::ZERO);
        Ok(binary_op(BinaryOperator::Divide, &sum, &count))
    }))
}

/// MIN function; no numbers at all gives 0
pub fn fn_min(args: &[FormulaValue]) -> FormulaValue {
    value_or_error(collect_numbers(args).map(|numbers| {
        numbers
            .into_iter()
            .min_by(compare_values)
            .unwrap_or(FormulaValue::Number(Decimal::ZERO))
    }))
}

/// MAX function; no numbers at all gives 0
pub fn fn_max(args: &[FormulaValue]) -> FormulaValue {
    value_or_error(collect_numbers(args).map(|numbers| {
        numbers
            .into_iter()
            .max_by(compare_values)
            .unwrap_or(FormulaValue::Number(Decimal::ZERO))
    }))
}

/// COUNT function
///
/// Counts numbers in ranges, plus direct arguments that read as numbers. Errors are
/// skipped rather than propagated.
pub fn fn_count(args: &[FormulaValue]) -> FormulaValue {
    let mut count = 0usize;

    for arg in args {
        match arg {
            FormulaValue::Array(rows) => {
                count += rows
                    .iter()
                    .flatten()
                    .filter(|v| v.is_number())
                    .count();
            }
            FormulaValue::Number(_) | FormulaValue::Float(_) | FormulaValue::Boolean(_) => {
                count += 1
            }
            FormulaValue::String(_) if arg.as_number().is_some() => count += 1,
            _ => {} // Don't count non-numeric
        }
    }

    FormulaValue::Number(Decimal::from(count))
}

/// COUNTA function: non-empty values, errors included
pub fn fn_counta(args: &[FormulaValue]) -> FormulaValue {
    let count = args
        .iter()
        .flat_map(FormulaValue::iter_values)
        .filter(|v| !matches!(v, FormulaValue::Empty))
        .count();
    FormulaValue::Number(Decimal::from(count))
}

/// PRODUCT function
pub fn fn_product(args: &[FormulaValue]) -> FormulaValue {
    value_or_error(collect_numbers(args).map(|numbers| {
        if numbers.is_empty() {
            return FormulaValue::Number(Decimal::ZERO);
        }
        fold_numbers(numbers, BinaryOperator::Multiply, Decimal::ONE)
    }))
}

/// SUMPRODUCT(array1, [array2], ...)
///
/// Arrays are paired by position and must share dimensions; non-numeric entries
/// count as zero and numbers beyond the decimal range are `#NUM!`.
pub fn fn_sumproduct(args: &[FormulaValue]) -> FormulaValue {
    let Some(first) = args.first() else {
        return FormulaValue::Error(CellError::Value);
    };
    if let Some(e) = args.iter().find_map(FormulaValue::get_error) {
        return FormulaValue::Error(e);
    }
    let dims = first.dimensions();
    if args.iter().any(|a| a.dimensions() != dims) {
        return FormulaValue::Error(CellError::Value);
    }

    let columns: Vec<Vec<&FormulaValue>> =
        args.iter().map(|a| a.iter_values().collect()).collect();
    let mut total = Decimal::ZERO;
    for i in 0..dims.0 * dims.1 {
        let mut product = Decimal::ONE;
        for column in &columns {
            let n = match column[i] {
                FormulaValue::Number(n) => *n,
                FormulaValue::Float(_) => return FormulaValue::Error(CellError::Num),
                FormulaValue::Error(e) => return FormulaValue::Error(*e),
                _ => Decimal::ZERO,
            };
            product = match product.checked_mul(n) {
                Some(p) => p,
                None => return FormulaValue::Error(CellError::Num),
            };
        }
        total = match total.checked_add(product) {
            Some(t) => t,
            None => return FormulaValue::Error(CellError::Num),
        };
    }

    FormulaValue::Number(total)
}

/// ABS(number)
pub fn fn_abs(args: &[FormulaValue]) -> FormulaValue {
    value_or_error(number_arg(args, 0, None).map(|n| FormulaValue::Number(n.abs())))
}

/// INT(number): round down to the nearest integer
pub fn fn_int(args: &[FormulaValue]) -> FormulaValue {
    value_or_error(number_arg(args, 0, None).map(|n| FormulaValue::Number(n.floor())))
}

/// MOD(number, divisor); the result takes the divisor's sign
pub fn fn_mod(args: &[FormulaValue]) -> FormulaValue {
    value_or_error(modulo(args))
}

fn modulo(args: &[FormulaValue]) -> Result<FormulaValue, CellError> {
    let n = number_arg(args, 0, None)?;
    let d = number_arg(args, 1, None)?;
    if d.is_zero() {
        return Err(CellError::Div0);
    }
    let quotient = n.checked_div(d).ok_or(CellError::Num)?.floor();
    let result = d
        .checked_mul(quotient)
        .and_then(|p| n.checked_sub(p))
        .ok_or(CellError::Num)?;
    Ok(FormulaValue::Number(result))
}

/// POWER(number, power)
pub fn fn_power(args: &[FormulaValue]) -> FormulaValue {
    match (number_arg(args, 0, None), number_arg(args, 1, None)) {
        (Ok(base), Ok(exponent)) => power(base, exponent),
        (Err(e), _) | (_, Err(e)) => FormulaValue::Error(e),
    }
}

/// SQRT(number); negative input is `#NUM!`
pub fn fn_sqrt(args: &[FormulaValue]) -> FormulaValue {
    value_or_error(number_arg(args, 0, None).and_then(|n| {
        if n.is_sign_negative() && !n.is_zero() {
            return Err(CellError::Num);
        }
        n.sqrt().map(FormulaValue::Number).ok_or(CellError::Num)
    }))
}

/// ROUND(number, num_digits): half away from zero, like Excel
///
/// Negative `num_digits` rounds to the left of the decimal point.
pub fn fn_round(args: &[FormulaValue]) -> FormulaValue {
    round_with(args, RoundingStrategy::MidpointAwayFromZero)
}

/// ROUNDUP(number, num_digits): away from zero
pub fn fn_roundup(args: &[FormulaValue]) -> FormulaValue {
    round_with(args, RoundingStrategy::AwayFromZero)
}

/// ROUNDDOWN(number, num_digits): toward zero
pub fn fn_rounddown(args: &[FormulaValue]) -> FormulaValue {
    round_with(args, RoundingStrategy::ToZero)
}

fn round_with(args: &[FormulaValue], strategy: RoundingStrategy) -> FormulaValue {
    let number = match number_arg(args, 0, None) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    match integer_arg(args, 1, Some(0)) {
        Ok(digits) => FormulaValue::Number(round_to_digits(number, digits, strategy)),
        Err(e) => FormulaValue::Error(e),
    }
}

/// Round to `digits` decimal places; negative `digits` rounds to tens, hundreds, ...
pub fn round_to_digits(number: Decimal, digits: i64, strategy: RoundingStrategy) -> Decimal {
    if digits >= 0 {
        let dp = digits.min(i64::from(MAX_DIGITS)) as u32;
        return number.round_dp_with_strategy(dp, strategy);
    }

    let shift = digits.unsigned_abs();
    if shift > u64::from(MAX_DIGITS) {
        return Decimal::ZERO;
    }
    Decimal::TEN
        .checked_powu(shift)
        .and_then(|factor| {
            number
                .checked_div(factor)
                .map(|scaled| scaled.round_dp_with_strategy(0, strategy))
                .and_then(|rounded| rounded.checked_mul(factor))
        })
        .unwrap_or(Decimal::ZERO)
}
