//! The formula engine
//!
//! [`FormulaEngine`] owns the current worksheet snapshot and the caches. Every call
//! reads the snapshot through an `Arc` taken under a read lock, so an evaluation
//! always sees one consistent snapshot; [`FormulaEngine::set_worksheet_data`] swaps
//! in a new one under the write lock.
//!
//! # Example
//!
//! ```rust
//! use gridcalc::prelude::*;
//!
//! let engine = FormulaEngine::new();
//! engine
//!     .set_worksheet_data([("length", 12.0), ("width", 10.0)])
//!     .unwrap();
//!
//! let result = engine.evaluate("A1", "=length*width").unwrap();
//! assert_eq!(result.value, Some(CellValue::Number(120.0)));
//! ```

use crate::cache::{Fingerprinter, ResultCache};
use crate::error::{EngineError, Result};
use crate::options::EngineOptions;
use crate::result::EvaluationResult;
use ahash::{AHashMap, RandomState};
use dashmap::DashMap;
use gridcalc_core::{CellError, CellKey, CellValue, Worksheet};
use gridcalc_formula::dependency::circular_reference;
use gridcalc_formula::{
    evaluate, parse_formula, resolve_dependencies, CellSource, DependencyGraph, DependencySet,
    EvaluationContext, FormulaError, FormulaExpr, ParseError,
};
use parking_lot::RwLock;
use rayon::prelude::*;
use std::sync::Arc;

/// A parsed formula together with what it reads
#[derive(Debug)]
struct ParsedFormula {
    ast: FormulaExpr,
    deps: DependencySet,
}

/// Spreadsheet formula engine
#[derive(Debug)]
pub struct FormulaEngine {
    options: EngineOptions,
    snapshot: RwLock<Arc<Worksheet>>,
    /// Parsed formulas by formula text
    asts: DashMap<String, Arc<ParsedFormula>, RandomState>,
    results: ResultCache,
    fingerprints: Fingerprinter,
}

impl Default for FormulaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FormulaEngine {
    /// Create an engine with default options and an empty snapshot
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            options,
            snapshot: RwLock::new(Arc::new(Worksheet::new())),
            asts: DashMap::with_hasher(RandomState::new()),
            results: ResultCache::new(),
            fingerprints: Fingerprinter::default(),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// The snapshot evaluations currently run against
    pub fn snapshot(&self) -> Arc<Worksheet> {
        Arc::clone(&self.snapshot.read())
    }

    /// Replace the worksheet snapshot
    ///
    /// Keys are parsed as cell addresses (`A1`, `Sheet2!B3`) or names (`base_rate`);
    /// the first malformed key rejects the whole update and leaves the current
    /// snapshot in place. Cached results that read a changed value stop matching.
    pub fn set_worksheet_data<I, K, V>(&self, data: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<CellValue>,
    {
        let sheet = Worksheet::from_pairs(data)?;
        self.set_snapshot(sheet);
        Ok(())
    }

    /// Replace the worksheet snapshot with an already-built [`Worksheet`]
    pub fn set_snapshot(&self, sheet: Worksheet) {
        let new = Arc::new(sheet);
        let old = std::mem::replace(&mut *self.snapshot.write(), Arc::clone(&new));
        tracing::debug!(
            entries = new.len(),
            changed = old.changed_keys(&new).len(),
            "worksheet snapshot replaced"
        );
    }

    /// Drop every cached result and parsed formula
    pub fn clear_cache(&self) {
        self.results.clear();
        self.asts.clear();
    }

    /// Number of cached results
    pub fn cache_len(&self) -> usize {
        self.results.len()
    }

    /// Evaluate `formula` as if it were stored in `cell`
    ///
    /// Only invalid input (an empty formula or a malformed `cell`) is an `Err`;
    /// everything that can go wrong inside the formula is reported in
    /// [`EvaluationResult::error`].
    pub fn evaluate(&self, cell: &str, formula: &str) -> Result<EvaluationResult> {
        let target = parse_target(cell)?;
        if formula.trim().is_empty() {
            return Err(EngineError::EmptyFormula);
        }

        let parsed = match self.parse(formula) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(cell = %target, error = %e, "formula failed to parse");
                return Ok(EvaluationResult::from_error(&FormulaError::from(e), Vec::new()));
            }
        };
        let dependencies = parsed.deps.to_strings();

        // the snapshot holds values, not formulas, so reading itself is the only cycle
        if parsed.deps.touches(&target) {
            let error = circular_reference(&[target.clone(), target.clone()]);
            tracing::warn!(cell = %target, error = %error, "circular reference");
            return Ok(EvaluationResult::from_error(&error, dependencies));
        }

        let snapshot = self.snapshot();
        let cache_key = (target, formula.to_string());
        let fingerprint = self
            .options
            .cache_enabled
            .then(|| self.fingerprints.fingerprint(&snapshot, &parsed.deps));

        if let Some(fingerprint) = fingerprint {
            if let Some(hit) = self.results.get(&cache_key, fingerprint, self.options.cache_ttl) {
                tracing::debug!(cell = %cache_key.0, "result cache hit");
                return Ok(hit.into_cached());
            }
            tracing::debug!(cell = %cache_key.0, "result cache miss");
        }

        let result = self.compute(&parsed, snapshot.as_ref(), dependencies);

        if let Some(fingerprint) = fingerprint {
            if result.is_ok() {
                self.results.insert(
                    cache_key,
                    fingerprint,
                    result.clone(),
                    self.options.max_cache_entries,
                );
            }
        }

        Ok(result)
    }

    /// Evaluate a batch of `(cell, formula)` pairs that may reference each other
    ///
    /// Cells are evaluated in dependency order, one topological layer at a time; a
    /// formula that reads another batch cell sees that cell's computed value. Cells
    /// on or downstream of a cycle report the cycle. Results come back in input
    /// order. Batch results bypass the result cache.
    pub fn batch_evaluate<I, C, F>(&self, cells: I) -> Result<Vec<EvaluationResult>>
    where
        I: IntoIterator<Item = (C, F)>,
        C: AsRef<str>,
        F: AsRef<str>,
    {
        let mut entries: Vec<(CellKey, std::result::Result<Arc<ParsedFormula>, ParseError>)> =
            Vec::new();
        let mut position: AHashMap<CellKey, usize> = AHashMap::new();
        for (cell, formula) in cells {
            let (cell, formula) = (cell.as_ref(), formula.as_ref());
            let target = parse_target(cell)?;
            if formula.trim().is_empty() {
                return Err(EngineError::EmptyFormula);
            }
            if position.insert(target.clone(), entries.len()).is_some() {
                return Err(EngineError::DuplicateCell(target.to_string()));
            }
            entries.push((target, self.parse(formula)));
        }

        let no_deps = DependencySet::default();
        let graph = DependencyGraph::from_formulas(entries.iter().map(|(cell, parsed)| {
            let deps = parsed.as_ref().map_or(&no_deps, |p| &p.deps);
            (cell.clone(), deps)
        }));
        let schedule = graph.schedule();

        let snapshot = self.snapshot();
        let mut computed: AHashMap<CellKey, CellValue> = AHashMap::new();
        let mut results: Vec<Option<EvaluationResult>> = vec![None; entries.len()];

        for (cell, parsed) in &entries {
            let idx = position[cell];
            match parsed {
                Err(e) => {
                    let error = FormulaError::from(e.clone());
                    results[idx] = Some(EvaluationResult::from_error(&error, Vec::new()));
                    computed.insert(cell.clone(), CellValue::Error(CellError::Value));
                }
                Ok(parsed) => {
                    if let Some(error) = schedule.error_for(cell) {
                        results[idx] =
                            Some(EvaluationResult::from_error(&error, parsed.deps.to_strings()));
                    }
                }
            }
        }

        for (level, layer) in schedule.layers.iter().enumerate() {
            let pending: Vec<(usize, &Arc<ParsedFormula>)> = layer
                .iter()
                .filter_map(|cell| {
                    let idx = position[cell];
                    entries[idx].1.as_ref().ok().map(|parsed| (idx, parsed))
                })
                .collect();
            tracing::trace!(layer = level, cells = pending.len(), "evaluating batch layer");

            let source = Overlay {
                base: snapshot.as_ref(),
                computed: &computed,
            };
            let evaluate_one = |&(idx, parsed): &(usize, &Arc<ParsedFormula>)| {
                (idx, self.compute(parsed, &source, parsed.deps.to_strings()))
            };
            let layer_results: Vec<(usize, EvaluationResult)> =
                if self.options.parallel && pending.len() > 1 {
                    pending.par_iter().map(evaluate_one).collect()
                } else {
                    pending.iter().map(evaluate_one).collect()
                };

            for (idx, result) in layer_results {
                let value = match (&result.value, result.error.as_deref()) {
                    (Some(value), _) => value.clone(),
                    (None, error) => CellValue::Error(
                        error.and_then(CellError::parse).unwrap_or(CellError::Value),
                    ),
                };
                computed.insert(entries[idx].0.clone(), value);
                results[idx] = Some(result);
            }
        }

        Ok(results
            .into_iter()
            .zip(&entries)
            .map(|(result, (cell, _))| {
                // a cell neither scheduled nor blocked sits inside a cycle
                result.unwrap_or_else(|| {
                    EvaluationResult::from_error(
                        &circular_reference(&[cell.clone(), cell.clone()]),
                        Vec::new(),
                    )
                })
            })
            .collect())
    }

    /// Parse `formula`, reusing an earlier parse of the same text
    fn parse(&self, formula: &str) -> std::result::Result<Arc<ParsedFormula>, ParseError> {
        if let Some(parsed) = self.asts.get(formula) {
            return Ok(Arc::clone(&parsed));
        }
        let ast = parse_formula(formula)?;
        let deps = resolve_dependencies(&ast);
        let parsed = Arc::new(ParsedFormula { ast, deps });
        if self.options.cache_enabled {
            if self.asts.len() >= self.options.max_cache_entries {
                self.asts.clear();
            }
            self.asts.insert(formula.to_string(), Arc::clone(&parsed));
        }
        Ok(parsed)
    }

    fn compute(
        &self,
        parsed: &ParsedFormula,
        source: &dyn CellSource,
        dependencies: Vec<String>,
    ) -> EvaluationResult {
        let ctx = EvaluationContext::new(source).with_max_range_cells(self.options.max_range_cells);
        match evaluate(&parsed.ast, &ctx) {
            Ok(value) => EvaluationResult::from_value(value, dependencies),
            Err(e) => EvaluationResult::from_error(&e, dependencies),
        }
    }
}

fn parse_target(cell: &str) -> Result<CellKey> {
    CellKey::parse(cell).map_err(|source| EngineError::InvalidCellReference {
        cell: cell.to_string(),
        source,
    })
}

/// The snapshot with a batch's already-computed cells laid over it
struct Overlay<'a> {
    base: &'a Worksheet,
    computed: &'a AHashMap<CellKey, CellValue>,
}

impl CellSource for Overlay<'_> {
    fn get(&self, key: &CellKey) -> Option<&CellValue> {
        self.computed.get(key).or_else(|| self.base.get(key))
    }

    fn knows_sheet(&self, workbook: Option<&str>, sheet: &str) -> bool {
        self.base.knows_sheet(workbook, sheet)
            || self
                .computed
                .keys()
                .any(|key| key.sheet() == Some(sheet) && key.workbook() == workbook)
    }
}
