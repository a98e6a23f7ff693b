//! Evaluation results

use gridcalc_core::CellValue;
use gridcalc_formula::{FormulaError, FormulaValue};

/// Outcome of evaluating one formula
///
/// Exactly one of `value` and `error` is set. Spreadsheet errors such as `#N/A` are
/// reported through `error`, as are parse failures and circular references.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvaluationResult {
    /// Computed value
    pub value: Option<CellValue>,
    /// Error text (`#DIV/0!`, `Circular reference: A1 -> B1 -> A1`, ...)
    pub error: Option<String>,
    /// Fully-qualified cells, names and ranges the formula reads
    pub dependencies: Vec<String>,
    /// Whether the result came from the cache
    pub cached: bool,
}

impl EvaluationResult {
    pub fn success(value: CellValue, dependencies: Vec<String>) -> Self {
        Self {
            value: Some(value),
            error: None,
            dependencies,
            cached: false,
        }
    }

    pub fn failure(error: impl Into<String>, dependencies: Vec<String>) -> Self {
        Self {
            value: None,
            error: Some(error.into()),
            dependencies,
            cached: false,
        }
    }

    /// Build a result from the evaluator's final value
    pub(crate) fn from_value(value: FormulaValue, dependencies: Vec<String>) -> Self {
        match value.into_scalar().to_cell_value() {
            CellValue::Error(e) => Self::failure(e.as_str(), dependencies),
            value => Self::success(value, dependencies),
        }
    }

    pub(crate) fn from_error(error: &FormulaError, dependencies: Vec<String>) -> Self {
        Self::failure(error.to_string(), dependencies)
    }

    /// Whether evaluation produced a value
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// The value as a number, if it is one
    pub fn as_number(&self) -> Option<f64> {
        match self.value {
            Some(CellValue::Number(n)) => Some(n),
            _ => None,
        }
    }

    pub(crate) fn into_cached(mut self) -> Self {
        self.cached = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcalc_core::CellError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_values_become_error_text() {
        let result = EvaluationResult::from_value(FormulaValue::Error(CellError::Div0), Vec::new());
        assert_eq!(result.value, None);
        assert_eq!(result.error.as_deref(), Some("#DIV/0!"));
        assert!(!result.is_ok());
    }

    #[test]
    fn test_empty_result_reads_as_zero() {
        let result = EvaluationResult::from_value(FormulaValue::Empty, Vec::new());
        assert_eq!(result.as_number(), Some(0.0));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serializes_for_http_consumers() {
        let result = EvaluationResult::success(CellValue::Number(1957.5), vec!["BASE_RATE".into()]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "value": 1957.5,
                "error": null,
                "dependencies": ["BASE_RATE"],
                "cached": false
            })
        );
    }
}
