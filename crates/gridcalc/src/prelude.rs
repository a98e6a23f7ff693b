//! Prelude module - common imports for gridcalc users
//!
//! ```rust
//! use gridcalc::prelude::*;
//! ```

pub use crate::{
    // Values
    CellError,
    CellKey,
    CellValue,
    // Errors
    EngineError,
    // Engine
    EngineOptions,
    EvaluationResult,
    FormulaEngine,
    Worksheet,
};
