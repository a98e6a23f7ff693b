//! Worksheet snapshot
//!
//! A [`Worksheet`] is a flat map from [`CellKey`] to [`CellValue`]. The engine treats a
//! snapshot as immutable while evaluating against it; callers replace the whole
//! snapshot rather than patching it in place.

use crate::cell::{CellKey, CellValue, RangeKey};
use crate::error::Result;
use ahash::{AHashMap, AHashSet};

/// An immutable-by-convention key → value snapshot of worksheet data
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    cells: AHashMap<CellKey, CellValue>,
    /// (workbook, sheet) qualifiers that appear in at least one key
    sheets: AHashSet<(Option<String>, String)>,
}

impl Worksheet {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from `(key, value)` pairs, parsing each key
    ///
    /// Fails on the first key that is neither a cell address nor a valid name.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<CellValue>,
    {
        let mut sheet = Self::new();
        for (key, value) in pairs {
            sheet.set(key.as_ref(), value)?;
        }
        Ok(sheet)
    }

    /// Insert a value under an already-parsed key, returning the previous value
    pub fn insert(&mut self, key: CellKey, value: impl Into<CellValue>) -> Option<CellValue> {
        if let CellKey::Cell {
            workbook,
            sheet: Some(sheet),
            ..
        } = &key
        {
            self.sheets.insert((workbook.clone(), sheet.clone()));
        }
        self.cells.insert(key, value.into())
    }

    /// Parse `key` and insert `value` under it
    pub fn set(&mut self, key: &str, value: impl Into<CellValue>) -> Result<Option<CellValue>> {
        let key = CellKey::parse(key)?;
        Ok(self.insert(key, value))
    }

    /// Look up the value stored under `key`
    pub fn get(&self, key: &CellKey) -> Option<&CellValue> {
        self.cells.get(key)
    }

    /// Whether any key is qualified with this sheet (and workbook)
    pub fn knows_sheet(&self, workbook: Option<&str>, sheet: &str) -> bool {
        self.sheets
            .iter()
            .any(|(wb, name)| wb.as_deref() == workbook && name == sheet)
    }

    /// Whether any key is qualified with this sheet name and no workbook
    pub fn has_sheet(&self, sheet: &str) -> bool {
        self.knows_sheet(None, sheet)
    }

    /// Entries whose keys fall inside `range`, in no particular order
    pub fn entries_in<'a>(
        &'a self,
        range: &'a RangeKey,
    ) -> impl Iterator<Item = (&'a CellKey, &'a CellValue)> + 'a {
        self.cells.iter().filter(move |(key, _)| range.contains(key))
    }

    /// Iterate over all entries, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, &CellValue)> {
        self.cells.iter()
    }

    /// Keys whose value differs between `self` and `other` (present in either)
    pub fn changed_keys(&self, other: &Worksheet) -> Vec<CellKey> {
        let mut changed: Vec<CellKey> = self
            .cells
            .iter()
            .filter(|(key, value)| other.cells.get(*key) != Some(*value))
            .map(|(key, _)| key.clone())
            .collect();
        changed.extend(
            other
                .cells
                .keys()
                .filter(|key| !self.cells.contains_key(*key))
                .cloned(),
        );
        changed
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the snapshot holds no entries
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl FromIterator<(CellKey, CellValue)> for Worksheet {
    fn from_iter<T: IntoIterator<Item = (CellKey, CellValue)>>(iter: T) -> Self {
        let mut sheet = Self::new();
        for (key, value) in iter {
            sheet.insert(key, value);
        }
        sheet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellRange;

    #[test]
    fn test_lookup_is_canonical() {
        let sheet = Worksheet::from_pairs([("a1", CellValue::Number(1.0)), ("Rate", 0.5.into())])
            .unwrap();

        assert_eq!(
            sheet.get(&CellKey::parse("$A$1").unwrap()),
            Some(&CellValue::Number(1.0))
        );
        assert_eq!(
            sheet.get(&CellKey::name("rate")),
            Some(&CellValue::Number(0.5))
        );
        assert_eq!(sheet.get(&CellKey::parse("B1").unwrap()), None);
    }

    #[test]
    fn test_rejects_bad_keys() {
        assert!(Worksheet::from_pairs([("not a key", 1.0)]).is_err());
    }

    #[test]
    fn test_known_sheets() {
        let sheet = Worksheet::from_pairs([("Data!A1", 1.0), ("[Ext.xlsx]Rates!B2", 2.0)]).unwrap();
        assert!(sheet.has_sheet("Data"));
        assert!(!sheet.has_sheet("Rates"));
        assert!(sheet.knows_sheet(Some("Ext.xlsx"), "Rates"));
    }

    #[test]
    fn test_entries_in_range() {
        let sheet = Worksheet::from_pairs([("A1", 1.0), ("A2", 2.0), ("C9", 3.0)]).unwrap();
        let range = RangeKey::new(None, None, CellRange::parse("A1:B5").unwrap());
        assert_eq!(sheet.entries_in(&range).count(), 2);
    }

    #[test]
    fn test_changed_keys() {
        let old = Worksheet::from_pairs([("A1", 1.0), ("A2", 2.0)]).unwrap();
        let new = Worksheet::from_pairs([("A1", 1.0), ("A2", 5.0), ("A3", 1.0)]).unwrap();
        let mut changed: Vec<String> = new.changed_keys(&old).iter().map(|k| k.to_string()).collect();
        changed.sort();
        assert_eq!(changed, vec!["A2", "A3"]);
    }
}
