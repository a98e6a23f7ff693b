//! Formula Abstract Syntax Tree types

use gridcalc_core::{sheet_needs_quotes, CellAddress, CellError, CellKey, CellRange, RangeKey};
use rust_decimal::Decimal;
use std::fmt::{self, Write};

/// Byte offsets `[start, end)` into the formula body (the text after `=`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The smallest span covering both `self` and `other`
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// One node of a parsed formula together with its source span
///
/// Equality compares structure only; spans are ignored so that a re-parsed
/// rendering of an AST compares equal to the original.
#[derive(Debug, Clone)]
pub struct FormulaExpr {
    pub kind: ExprKind,
    pub span: Span,
}

impl PartialEq for FormulaExpr {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

/// The closed set of formula node kinds
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // === Literals ===
    /// Numeric literal
    Number(Decimal),
    /// Numeric literal beyond the decimal range
    Float(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// Error literal, also produced for references that fall off the grid
    Error(CellError),
    /// An elided function argument, as in `IF(A1>0,,B1)`
    Empty,

    // === References ===
    /// Single cell reference
    CellRef(CellReference),
    /// Range reference
    RangeRef(RangeReference),
    /// Named value resolved against the snapshot at evaluation time
    NameRef(String),

    // === Operators ===
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<FormulaExpr>,
    },

    // === Function call ===
    Function {
        name: String,
        args: Vec<FormulaExpr>,
    },
}

/// Cell reference with optional workbook and sheet qualifiers
#[derive(Debug, Clone, PartialEq)]
pub struct CellReference {
    pub workbook: Option<String>,
    pub sheet: Option<String>,
    pub address: CellAddress,
}

impl CellReference {
    /// The canonical snapshot key this reference reads
    pub fn key(&self) -> CellKey {
        CellKey::qualified(self.workbook.clone(), self.sheet.clone(), self.address)
    }
}

/// Range reference with optional workbook and sheet qualifiers
#[derive(Debug, Clone, PartialEq)]
pub struct RangeReference {
    pub workbook: Option<String>,
    pub sheet: Option<String>,
    pub range: CellRange,
}

impl RangeReference {
    /// The canonical range key this reference reads
    pub fn key(&self) -> RangeKey {
        RangeKey::new(self.workbook.clone(), self.sheet.clone(), self.range)
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Text
    Concat,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Concat => "&",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterEqual
        )
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Percent,
}

impl FormulaExpr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Visit this node and every descendant, parents before children
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a FormulaExpr)) {
        visit(self);
        match &self.kind {
            ExprKind::BinaryOp { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            ExprKind::UnaryOp { operand, .. } => operand.walk(visit),
            ExprKind::Function { args, .. } => {
                for arg in args {
                    arg.walk(visit);
                }
            }
            _ => {}
        }
    }

    /// Render the expression back to formula text, including the leading `=`
    ///
    /// Nested operators are parenthesized, so the output re-parses to an equal AST.
    ///
    /// ```rust
    /// use gridcalc_formula::parse_formula;
    ///
    /// let ast = parse_formula("=2 + 3*4").unwrap();
    /// assert_eq!(ast.to_formula(), "=2+(3*4)");
    /// assert_eq!(parse_formula(&ast.to_formula()).unwrap(), ast);
    /// ```
    pub fn to_formula(&self) -> String {
        format!("={}", self)
    }

    fn write_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ExprKind::BinaryOp { .. } | ExprKind::UnaryOp { .. } => write!(f, "({})", self),
            _ => write!(f, "{}", self),
        }
    }
}

impl fmt::Display for FormulaExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Number(n) => write!(f, "{}", n.normalize()),
            ExprKind::Float(n) => write!(f, "{:E}", n),
            ExprKind::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            ExprKind::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            ExprKind::Error(e) => write!(f, "{}", e),
            ExprKind::Empty => Ok(()),
            ExprKind::CellRef(r) => {
                write_qualifier(f, r.workbook.as_deref(), r.sheet.as_deref())?;
                write!(f, "{}", r.address)
            }
            ExprKind::RangeRef(r) => {
                write_qualifier(f, r.workbook.as_deref(), r.sheet.as_deref())?;
                write!(f, "{}", r.range)
            }
            ExprKind::NameRef(name) => f.write_str(name),
            ExprKind::BinaryOp { op, left, right } => {
                left.write_operand(f)?;
                f.write_str(op.symbol())?;
                right.write_operand(f)
            }
            ExprKind::UnaryOp {
                op: UnaryOperator::Negate,
                operand,
            } => {
                f.write_char('-')?;
                operand.write_operand(f)
            }
            ExprKind::UnaryOp {
                op: UnaryOperator::Percent,
                operand,
            } => {
                operand.write_operand(f)?;
                f.write_char('%')
            }
            ExprKind::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_char(',')?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_char(')')
            }
        }
    }
}

fn write_qualifier(
    f: &mut fmt::Formatter<'_>,
    workbook: Option<&str>,
    sheet: Option<&str>,
) -> fmt::Result {
    if let Some(workbook) = workbook {
        write!(f, "[{}]", workbook)?;
    }
    match sheet {
        Some(sheet) if sheet_needs_quotes(sheet) => {
            write!(f, "'{}'!", sheet.replace('\'', "''"))
        }
        Some(sheet) => write!(f, "{}!", sheet),
        None => Ok(()),
    }
}
