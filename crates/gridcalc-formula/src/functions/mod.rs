//! Built-in Excel functions
//!
//! The library is a closed set: [`Builtin`] names every supported function, and
//! [`Builtin::from_name`] is the only way a formula's function name is resolved.
//! Anything else is reported as an unknown function.

pub mod info;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod text;

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::FormulaValue;
use gridcalc_core::CellError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Function implementation signature
///
/// Arguments arrive fully evaluated; ranges are [`FormulaValue::Array`]s.
pub type FunctionImpl = fn(&[FormulaValue]) -> FormulaValue;

/// Function definition
#[derive(Clone, Copy)]
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    fn new(
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        implementation: FunctionImpl,
    ) -> Self {
        Self {
            name,
            min_args,
            max_args,
            implementation,
        }
    }
}

/// Every function the evaluator knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    // Math and aggregates
    Sum,
    Average,
    Min,
    Max,
    Count,
    CountA,
    Product,
    SumProduct,
    Abs,
    Int,
    Mod,
    Power,
    Sqrt,
    Round,
    RoundUp,
    RoundDown,

    // Logical
    If,
    And,
    Or,
    Not,
    IfError,
    IfNa,
    True,
    False,

    // Lookup
    VLookup,
    HLookup,
    Index,
    Match,

    // Information
    IsBlank,
    IsNumber,
    IsText,
    IsLogical,
    IsError,
    IsErr,
    IsNa,
    Na,

    // Text
    Concatenate,
    Concat,
    Len,
    Upper,
    Lower,
    Trim,
    Left,
    Right,
    Mid,
}

impl Builtin {
    /// All built-in functions
    pub const ALL: [Builtin; 45] = [
        Builtin::Sum,
        Builtin::Average,
        Builtin::Min,
        Builtin::Max,
        Builtin::Count,
        Builtin::CountA,
        Builtin::Product,
        Builtin::SumProduct,
        Builtin::Abs,
        Builtin::Int,
        Builtin::Mod,
        Builtin::Power,
        Builtin::Sqrt,
        Builtin::Round,
        Builtin::RoundUp,
        Builtin::RoundDown,
        Builtin::If,
        Builtin::And,
        Builtin::Or,
        Builtin::Not,
        Builtin::IfError,
        Builtin::IfNa,
        Builtin::True,
        Builtin::False,
        Builtin::VLookup,
        Builtin::HLookup,
        Builtin::Index,
        Builtin::Match,
        Builtin::IsBlank,
        Builtin::IsNumber,
        Builtin::IsText,
        Builtin::IsLogical,
        Builtin::IsError,
        Builtin::IsErr,
        Builtin::IsNa,
        Builtin::Na,
        Builtin::Concatenate,
        Builtin::Concat,
        Builtin::Len,
        Builtin::Upper,
        Builtin::Lower,
        Builtin::Trim,
        Builtin::Left,
        Builtin::Right,
        Builtin::Mid,
    ];

    /// Look up a function by name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|builtin| builtin.name().eq_ignore_ascii_case(name))
    }

    /// The function's definition: name, arity and implementation
    pub fn def(self) -> FunctionDef {
        use FunctionDef as F;
        match self {
            Builtin::Sum => F::new("SUM", 1, None, math::fn_sum),
            Builtin::Average => F::new("AVERAGE", 1, None, math::fn_average),
            Builtin::Min => F::new("MIN", 1, None, math::fn_min),
            Builtin::Max => F::new("MAX", 1, None, math::fn_max),
            Builtin::Count => F::new("COUNT", 1, None, math::fn_count),
            Builtin::CountA => F::new("COUNTA", 1, None, math::fn_counta),
            Builtin::Product => F::new("PRODUCT", 1, None, math::fn_product),
            Builtin::SumProduct => F::new("SUMPRODUCT", 1, None, math::fn_sumproduct),
            Builtin::Abs => F::new("ABS", 1, Some(1), math::fn_abs),
            Builtin::Int => F::new("INT", 1, Some(1), math::fn_int),
            Builtin::Mod => F::new("MOD", 2, Some(2), math::fn_mod),
            Builtin::Power => F::new("POWER", 2, Some(2), math::fn_power),
            Builtin::Sqrt => F::new("SQRT", 1, Some(1), math::fn_sqrt),
            Builtin::Round => F::new("ROUND", 2, Some(2), math::fn_round),
            Builtin::RoundUp => F::new("ROUNDUP", 2, Some(2), math::fn_roundup),
            Builtin::RoundDown => F::new("ROUNDDOWN", 2, Some(2), math::fn_rounddown),

            Builtin::If => F::new("IF", 2, Some(3), logical::fn_if),
            Builtin::And => F::new("AND", 1, None, logical::fn_and),
            Builtin::Or => F::new("OR", 1, None, logical::fn_or),
            Builtin::Not => F::new("NOT", 1, Some(1), logical::fn_not),
            Builtin::IfError => F::new("IFERROR", 2, Some(2), logical::fn_iferror),
            Builtin::IfNa => F::new("IFNA", 2, Some(2), logical::fn_ifna),
            Builtin::True => F::new("TRUE", 0, Some(0), logical::fn_true),
            Builtin::False => F::new("FALSE", 0, Some(0), logical::fn_false),

            Builtin::VLookup => F::new("VLOOKUP", 3, Some(4), lookup::fn_vlookup),
            Builtin::HLookup => F::new("HLOOKUP", 3, Some(4), lookup::fn_hlookup),
            Builtin::Index => F::new("INDEX", 2, Some(3), lookup::fn_index),
            Builtin::Match => F::new("MATCH", 2, Some(3), lookup::fn_match),

            Builtin::IsBlank => F::new("ISBLANK", 1, Some(1), info::fn_isblank),
            Builtin::IsNumber => F::new("ISNUMBER", 1, Some(1), info::fn_isnumber),
            Builtin::IsText => F::new("ISTEXT", 1, Some(1), info::fn_istext),
            Builtin::IsLogical => F::new("ISLOGICAL", 1, Some(1), info::fn_islogical),
            Builtin::IsError => F::new("ISERROR", 1, Some(1), info::fn_iserror),
            Builtin::IsErr => F::new("ISERR", 1, Some(1), info::fn_iserr),
            Builtin::IsNa => F::new("ISNA", 1, Some(1), info::fn_isna),
            Builtin::Na => F::new("NA", 0, Some(0), info::fn_na),

            Builtin::Concatenate => F::new("CONCATENATE", 1, None, text::fn_concatenate),
            Builtin::Concat => F::new("CONCAT", 1, None, text::fn_concat),
            Builtin::Len => F::new("LEN", 1, Some(1), text::fn_len),
            Builtin::Upper => F::new("UPPER", 1, Some(1), text::fn_upper),
            Builtin::Lower => F::new("LOWER", 1, Some(1), text::fn_lower),
            Builtin::Trim => F::new("TRIM", 1, Some(1), text::fn_trim),
            Builtin::Left => F::new("LEFT", 1, Some(2), text::fn_left),
            Builtin::Right => F::new("RIGHT", 1, Some(2), text::fn_right),
            Builtin::Mid => F::new("MID", 3, Some(3), text::fn_mid),
        }
    }

    /// Function name (uppercase)
    pub fn name(self) -> &'static str {
        self.def().name
    }

    /// Whether single-cell reference arguments should arrive as one-cell ranges
    ///
    /// Aggregates skip text and logicals found through references but coerce them
    /// when passed directly, so they need to tell the two apart.
    pub fn takes_references(self) -> bool {
        matches!(
            self,
            Builtin::Sum
                | Builtin::Average
                | Builtin::Min
                | Builtin::Max
                | Builtin::Count
                | Builtin::CountA
                | Builtin::Product
                | Builtin::SumProduct
                | Builtin::And
                | Builtin::Or
                | Builtin::Concat
        )
    }

    /// Check the argument count against the function's arity
    pub fn check_arity(self, count: usize) -> FormulaResult<()> {
        let def = self.def();
        if count < def.min_args {
            return Err(FormulaError::ArgumentCount {
                function: def.name.to_string(),
                expected: format!("at least {}", def.min_args),
                actual: count,
            });
        }
        if let Some(max) = def.max_args {
            if count > max {
                return Err(FormulaError::ArgumentCount {
                    function: def.name.to_string(),
                    expected: format!("at most {}", max),
                    actual: count,
                });
            }
        }
        Ok(())
    }

    /// Call the function with already-evaluated arguments
    pub fn call(self, args: &[FormulaValue]) -> FormulaValue {
        (self.def().implementation)(args)
    }
}

// === Argument helpers shared by the function modules ===

/// Unwrap a one-cell array to its element
pub(crate) fn scalar(value: &FormulaValue) -> &FormulaValue {
    match value {
        FormulaValue::Array(rows) if rows.len() == 1 && rows[0].len() == 1 => &rows[0][0],
        other => other,
    }
}

/// Numeric argument `index`, or `default` when it is missing or elided
pub(crate) fn number_arg(
    args: &[FormulaValue],
    index: usize,
    default: Option<Decimal>,
) -> Result<Decimal, CellError> {
    match (args.get(index).map(scalar), default) {
        (None | Some(FormulaValue::Empty), Some(default)) => Ok(default),
        (Some(value), _) => value.to_number(),
        (None, None) => Err(CellError::Value),
    }
}

/// Integer argument, truncated toward zero
pub(crate) fn integer_arg(
    args: &[FormulaValue],
    index: usize,
    default: Option<i64>,
) -> Result<i64, CellError> {
    number_arg(args, index, default.map(Decimal::from))?
        .trunc()
        .to_i64()
        .ok_or(CellError::Num)
}

/// Text argument
pub(crate) fn text_arg(args: &[FormulaValue], index: usize) -> Result<String, CellError> {
    args.get(index)
        .map(scalar)
        .ok_or(CellError::Value)?
        .to_text()
}

/// The numbers an aggregate sees, each a [`FormulaValue::Number`] or
/// [`FormulaValue::Float`]
///
/// Direct arguments are coerced (logicals count as 1/0, numeric text is parsed,
/// other text is `#VALUE!`); inside arrays only numbers count. Any error wins.
pub(crate) fn collect_numbers(args: &[FormulaValue]) -> Result<Vec<FormulaValue>, CellError> {
    let mut numbers = Vec::new();
    for arg in args {
        match arg {
            FormulaValue::Array(rows) => {
                for value in rows.iter().flatten() {
                    match value {
                        FormulaValue::Error(e) => return Err(*e),
                        n if n.is_number() => numbers.push(n.clone()),
                        _ => {}
                    }
                }
            }
            FormulaValue::Empty => {}
            FormulaValue::Float(f) => numbers.push(FormulaValue::Float(*f)),
            direct => numbers.push(FormulaValue::Number(direct.to_number()?)),
        }
    }
    Ok(numbers)
}

/// Turn a computation that may fail with a spreadsheet error into a value
pub(crate) fn value_or_error(result: Result<FormulaValue, CellError>) -> FormulaValue {
    result.unwrap_or_else(FormulaValue::Error)
}
