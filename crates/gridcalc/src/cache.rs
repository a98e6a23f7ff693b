//! Result cache and dependency fingerprints
//!
//! A cached result is keyed by `(cell, formula text)` and remembers a fingerprint
//! of every value the formula read. Lookups recompute the fingerprint against the
//! live snapshot, so replacing the snapshot invalidates stale entries lazily: nothing
//! is swept, an entry simply stops matching.

use crate::EvaluationResult;
use ahash::RandomState;
use dashmap::DashMap;
use gridcalc_core::{CellKey, CellValue, Worksheet};
use gridcalc_formula::DependencySet;
use std::hash::{BuildHasher, Hash, Hasher};
use std::time::{Duration, Instant};

/// Hashes the current values of a formula's dependencies
#[derive(Debug, Clone, Default)]
pub(crate) struct Fingerprinter {
    state: RandomState,
}

impl Fingerprinter {
    /// Fingerprint of everything `deps` reads from `sheet`
    ///
    /// Range contents are combined with a commutative sum because snapshot iteration
    /// order is unspecified.
    pub fn fingerprint(&self, sheet: &Worksheet, deps: &DependencySet) -> u64 {
        let mut hasher = self.state.build_hasher();
        for key in &deps.cells {
            key.hash(&mut hasher);
            if let Some(sheet_name) = key.sheet() {
                sheet.knows_sheet(key.workbook(), sheet_name).hash(&mut hasher);
            }
            hash_value(sheet.get(key), &mut hasher);
        }

        for range in &deps.ranges {
            range.to_string().hash(&mut hasher);
            if let Some(sheet_name) = range.sheet.as_deref() {
                sheet
                    .knows_sheet(range.workbook.as_deref(), sheet_name)
                    .hash(&mut hasher);
            }
            let contents = sheet.entries_in(range).fold(0u64, |acc, (key, value)| {
                acc.wrapping_add(self.entry_hash(key, value))
            });
            hasher.write_u64(contents);
        }

        hasher.finish()
    }

    fn entry_hash(&self, key: &CellKey, value: &CellValue) -> u64 {
        let mut hasher = self.state.build_hasher();
        key.hash(&mut hasher);
        hash_value(Some(value), &mut hasher);
        hasher.finish()
    }
}

fn hash_value(value: Option<&CellValue>, hasher: &mut impl Hasher) {
    match value {
        None | Some(CellValue::Empty) => hasher.write_u8(0),
        Some(CellValue::Boolean(b)) => {
            hasher.write_u8(1);
            b.hash(hasher);
        }
        Some(CellValue::Number(n)) => {
            hasher.write_u8(2);
            // -0.0 and 0.0 read the same to a formula
            let n = if *n == 0.0 { 0.0 } else { *n };
            hasher.write_u64(n.to_bits());
        }
        Some(CellValue::String(s)) => {
            hasher.write_u8(3);
            s.hash(hasher);
        }
        Some(CellValue::Error(e)) => {
            hasher.write_u8(4);
            e.hash(hasher);
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    fingerprint: u64,
    result: EvaluationResult,
    inserted: Instant,
}

/// Concurrent map of successful results
///
/// Concurrent writers may overwrite each other; the loser's result is simply
/// recomputed on the next miss.
#[derive(Debug)]
pub(crate) struct ResultCache {
    entries: DashMap<(CellKey, String), CacheEntry, RandomState>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// The cached result for `key`, if it was computed from the same values and has
    /// not outlived `ttl`
    pub fn get(
        &self,
        key: &(CellKey, String),
        fingerprint: u64,
        ttl: Option<Duration>,
    ) -> Option<EvaluationResult> {
        let entry = self.entries.get(key)?;
        if entry.fingerprint != fingerprint {
            return None;
        }
        if ttl.is_some_and(|ttl| entry.inserted.elapsed() >= ttl) {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.result.clone())
    }

    /// Store a result; a full cache is emptied first
    pub fn insert(
        &self,
        key: (CellKey, String),
        fingerprint: u64,
        result: EvaluationResult,
        max_entries: usize,
    ) {
        if max_entries == 0 {
            return;
        }
        if self.entries.len() >= max_entries && !self.entries.contains_key(&key) {
            tracing::debug!(entries = self.entries.len(), "result cache full, clearing");
            self.entries.clear();
        }
        self.entries.insert(
            key,
            CacheEntry {
                fingerprint,
                result,
                inserted: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcalc_formula::{parse_formula, resolve_dependencies};

    fn deps(formula: &str) -> DependencySet {
        resolve_dependencies(&parse_formula(formula).unwrap())
    }

    #[test]
    fn test_fingerprint_tracks_read_values() {
        let fp = Fingerprinter::default();
        let deps = deps("=A1+SUM(B1:B3)");

        let before = Worksheet::from_pairs([("A1", 1.0), ("B2", 2.0), ("Z9", 0.0)]).unwrap();
        let unrelated = Worksheet::from_pairs([("A1", 1.0), ("B2", 2.0), ("Z9", 5.0)]).unwrap();
        let changed = Worksheet::from_pairs([("A1", 1.0), ("B2", 3.0)]).unwrap();

        assert_eq!(fp.fingerprint(&before, &deps), fp.fingerprint(&unrelated, &deps));
        assert_ne!(fp.fingerprint(&before, &deps), fp.fingerprint(&changed, &deps));
    }

    #[test]
    fn test_fingerprint_ignores_range_order() {
        let fp = Fingerprinter::default();
        let deps = deps("=SUM(A1:A3)");

        let a = Worksheet::from_pairs([("A1", 1.0), ("A2", 2.0)]).unwrap();
        let b = Worksheet::from_pairs([("A2", 2.0), ("A1", 1.0)]).unwrap();
        let swapped = Worksheet::from_pairs([("A1", 2.0), ("A2", 1.0)]).unwrap();

        assert_eq!(fp.fingerprint(&a, &deps), fp.fingerprint(&b, &deps));
        assert_ne!(fp.fingerprint(&a, &deps), fp.fingerprint(&swapped, &deps));
    }

    #[test]
    fn test_cache_respects_fingerprint_and_ttl() {
        let cache = ResultCache::new();
        let key = (CellKey::parse("B1").unwrap(), "=A1*2".to_string());
        let result = EvaluationResult::success(CellValue::Number(20.0), vec!["A1".into()]);

        cache.insert(key.clone(), 7, result.clone(), 10);
        assert_eq!(cache.get(&key, 7, None), Some(result));
        assert_eq!(cache.get(&key, 8, None), None);
        assert_eq!(cache.get(&key, 7, Some(Duration::ZERO)), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_full_cache_is_cleared() {
        let cache = ResultCache::new();
        let result = EvaluationResult::success(CellValue::Number(1.0), Vec::new());
        for row in 1..=3 {
            let key = (CellKey::parse(&format!("A{row}")).unwrap(), "=1".to_string());
            cache.insert(key, 0, result.clone(), 2);
        }
        assert_eq!(cache.len(), 1);
    }
}
