//! Canonical snapshot keys
//!
//! Worksheet snapshots, dependency sets and the cache all speak in terms of
//! [`CellKey`]: a cell address with optional workbook and sheet qualifiers, or a
//! named value such as `base_rate`. Keys are canonical: `$` flags are dropped, column
//! letters and names are upper-cased, so `a1`, `$A$1` and `A1` are the same key.

use super::address::{CellAddress, CellRange};
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A canonical reference to one snapshot entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellKey {
    /// A grid cell, optionally qualified by workbook and sheet
    Cell {
        workbook: Option<String>,
        sheet: Option<String>,
        address: CellAddress,
    },
    /// A named value (upper-cased)
    Name(String),
}

impl CellKey {
    /// An unqualified cell on the current sheet
    pub fn cell(address: CellAddress) -> Self {
        Self::qualified(None, None, address)
    }

    /// A cell with explicit workbook/sheet qualifiers
    pub fn qualified(workbook: Option<String>, sheet: Option<String>, address: CellAddress) -> Self {
        CellKey::Cell {
            workbook,
            sheet,
            address: address.relative(),
        }
    }

    /// A named value; names are case-insensitive
    pub fn name(name: &str) -> Self {
        CellKey::Name(name.to_ascii_uppercase())
    }

    /// Parse a key such as `A1`, `$B$2`, `Sheet2!C3`, `'My Sheet'!D4`,
    /// `[Book.xlsx]Sheet1!E5` or `base_rate`
    ///
    /// # Examples
    /// ```
    /// use gridcalc_core::CellKey;
    ///
    /// assert_eq!(CellKey::parse("$a$1").unwrap().to_string(), "A1");
    /// assert_eq!(CellKey::parse("'My Sheet'!b2").unwrap().to_string(), "'My Sheet'!B2");
    /// assert_eq!(CellKey::parse("base_rate").unwrap().to_string(), "BASE_RATE");
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidKey("empty key".into()));
        }

        let (workbook, rest) = split_workbook(s)?;
        let (sheet, local) = match rest.rfind('!') {
            Some(bang) => (Some(unquote_sheet(&rest[..bang])?), &rest[bang + 1..]),
            None => (None, rest),
        };

        if CellAddress::is_a1_pattern(local) {
            let address = CellAddress::parse(local)?;
            return Ok(Self::qualified(workbook, sheet, address));
        }

        if workbook.is_none() && sheet.is_none() && is_valid_name(local) {
            return Ok(Self::name(local));
        }

        Err(Error::InvalidKey(s.to_string()))
    }

    /// Whether this key is a named value rather than a grid cell
    pub fn is_name(&self) -> bool {
        matches!(self, CellKey::Name(_))
    }

    /// The grid address, if this is a cell key
    pub fn address(&self) -> Option<CellAddress> {
        match self {
            CellKey::Cell { address, .. } => Some(*address),
            CellKey::Name(_) => None,
        }
    }

    /// The sheet qualifier, if any
    pub fn sheet(&self) -> Option<&str> {
        match self {
            CellKey::Cell { sheet, .. } => sheet.as_deref(),
            CellKey::Name(_) => None,
        }
    }

    /// The workbook qualifier, if any
    pub fn workbook(&self) -> Option<&str> {
        match self {
            CellKey::Cell { workbook, .. } => workbook.as_deref(),
            CellKey::Name(_) => None,
        }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellKey::Cell {
                workbook,
                sheet,
                address,
            } => {
                write_prefix(f, workbook.as_deref(), sheet.as_deref())?;
                write!(f, "{}", address)
            }
            CellKey::Name(name) => f.write_str(name),
        }
    }
}

impl FromStr for CellKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A canonical rectangular range, optionally qualified by workbook and sheet
///
/// Ranges stay as a start/end pair; [`RangeKey::cells`] enumerates them lazily.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RangeKey {
    pub workbook: Option<String>,
    pub sheet: Option<String>,
    pub range: CellRange,
}

impl RangeKey {
    /// Create a range key; `$` flags on the corners are dropped
    pub fn new(workbook: Option<String>, sheet: Option<String>, range: CellRange) -> Self {
        Self {
            workbook,
            sheet,
            range: CellRange::new(range.start.relative(), range.end.relative()),
        }
    }

    /// Whether `key` names a cell inside this range on the same sheet and workbook
    pub fn contains(&self, key: &CellKey) -> bool {
        match key {
            CellKey::Cell {
                workbook,
                sheet,
                address,
            } => {
                *workbook == self.workbook && *sheet == self.sheet && self.range.contains(address)
            }
            CellKey::Name(_) => false,
        }
    }

    /// Enumerate the keys of every cell in the range, row-major
    pub fn cells(&self) -> impl Iterator<Item = CellKey> + '_ {
        self.range
            .cells()
            .map(move |address| CellKey::qualified(self.workbook.clone(), self.sheet.clone(), address))
    }
}

impl fmt::Display for RangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_prefix(f, self.workbook.as_deref(), self.sheet.as_deref())?;
        write!(f, "{}", self.range)
    }
}

/// Whether `text` is usable as a defined name
///
/// Names start with a letter or underscore and continue with letters, digits, `_` or
/// `.`. Anything shaped like a cell address or a lone column letter (`A`) is reserved,
/// as are the boolean literals. Longer letter runs such as `tax` are ordinary names.
pub fn is_valid_name(text: &str) -> bool {
    let mut chars = text.chars();
    let first_ok = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_');
    if !first_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
        return false;
    }

    if CellAddress::is_a1_pattern(text) || is_column_like(text) {
        return false;
    }

    !text.eq_ignore_ascii_case("TRUE") && !text.eq_ignore_ascii_case("FALSE")
}

/// Whether `text` is a single column letter, i.e. a cell reference missing its row
pub fn is_column_like(text: &str) -> bool {
    let mut chars = text.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphabetic())
}

fn split_workbook(s: &str) -> Result<(Option<String>, &str)> {
    let Some(rest) = s.strip_prefix('[') else {
        return Ok((None, s));
    };
    let close = rest
        .find(']')
        .ok_or_else(|| Error::InvalidKey(format!("unterminated workbook in '{}'", s)))?;
    Ok((Some(rest[..close].to_string()), &rest[close + 1..]))
}

fn unquote_sheet(raw: &str) -> Result<String> {
    let unquoted = match raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => raw.to_string(),
    };
    if unquoted.is_empty() {
        return Err(Error::InvalidKey(format!("empty sheet name in '{}'", raw)));
    }
    Ok(unquoted)
}

fn write_prefix(f: &mut fmt::Formatter<'_>, workbook: Option<&str>, sheet: Option<&str>) -> fmt::Result {
    if let Some(workbook) = workbook {
        write!(f, "[{}]", workbook)?;
    }
    if let Some(sheet) = sheet {
        if sheet_needs_quotes(sheet) {
            write!(f, "'{}'!", sheet.replace('\'', "''"))?;
        } else {
            write!(f, "{}!", sheet)?;
        }
    }
    Ok(())
}

/// Whether a sheet name must be written as `'name'!` to read back unchanged
///
/// A bare sheet prefix starts with a letter or `_` and continues with letters,
/// digits, `_` or `.`; anything else (`2024`, `My Sheet`) is quoted.
pub fn sheet_needs_quotes(sheet: &str) -> bool {
    let mut chars = sheet.chars();
    let starts_ok = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_');
    !starts_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}
