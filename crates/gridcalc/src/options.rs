//! Engine configuration

use gridcalc_formula::evaluator::DEFAULT_MAX_RANGE_CELLS;
use std::time::Duration;

/// Options for a [`FormulaEngine`](crate::FormulaEngine)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineOptions {
    /// Reuse results while the values a formula reads are unchanged (default: true)
    pub cache_enabled: bool,
    /// How long a cached result stays valid (default: no expiry)
    pub cache_ttl: Option<Duration>,
    /// Evaluate independent cells of a batch on the rayon pool (default: true)
    pub parallel: bool,
    /// Cached results kept before the cache is cleared (default: 10 000)
    pub max_cache_entries: usize,
    /// Largest range, in cells, a reference may expand to (default: 4 000 000)
    pub max_range_cells: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_ttl: None,
            parallel: true,
            max_cache_entries: 10_000,
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
        }
    }
}

impl EngineOptions {
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_max_cache_entries(mut self, max: usize) -> Self {
        self.max_cache_entries = max;
        self
    }

    pub fn with_max_range_cells(mut self, max: u64) -> Self {
        self.max_range_cells = max;
        self
    }
}
