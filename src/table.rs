//! In-memory table shapes that flow between pipeline stages.
//!
//! ```text
//! RawTable ──normalize──▶ TaggedTable (wide) ──reshape_to_long──▶ TaggedTable (long) ──▶ Record
//! ```
//!
//! A [`RawTable`] is what a strategy pulls off a page: named columns of
//! untyped cells, no schema. Which column holds region names and which hold
//! counts is decided later by the normalizer.

use crate::config::StrategyKind;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// One untyped cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Build a cell from extracted text; whitespace-only text is `Empty`.
    pub fn text(s: impl AsRef<str>) -> Self {
        let t = s.as_ref().trim();
        if t.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(t.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(n) => n.is_nan(),
        }
    }

    /// String form used for substring matching. Integral numbers print
    /// without a fractional part (`10`, not `10.0`).
    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            Cell::Empty => Cow::Borrowed(""),
            Cell::Text(s) => Cow::Borrowed(s.as_str()),
            Cell::Number(n) => Cow::Owned(format_number(*n)),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Number(n as f64)
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// ── Raw tables ───────────────────────────────────────────────────────────

/// A named column of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }
}

/// A rectangular grid pulled from one page region, schema unknown.
///
/// Every column holds the same number of cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<Column>,
    /// 1-based page the table was found on, when known.
    pub page: Option<usize>,
    /// Strategy that produced the table, when known.
    pub strategy: Option<StrategyKind>,
}

impl RawTable {
    /// Build from named columns, padding short columns with empty cells.
    pub fn new(mut columns: Vec<Column>) -> Self {
        let height = columns.iter().map(|c| c.cells.len()).max().unwrap_or(0);
        for col in &mut columns {
            col.cells.resize(height, Cell::Empty);
        }
        Self {
            columns,
            page: None,
            strategy: None,
        }
    }

    /// Build from a header and row-major data, padding or truncating each row
    /// to the header width.
    pub fn from_rows<S: Into<String>>(header: Vec<S>, rows: Vec<Vec<Cell>>) -> Self {
        let mut columns: Vec<Column> = header
            .into_iter()
            .map(|h| Column::new(h, Vec::with_capacity(rows.len())))
            .collect();
        for row in rows {
            let mut cells = row.into_iter();
            for col in &mut columns {
                col.cells.push(cells.next().unwrap_or(Cell::Empty));
            }
        }
        Self::new(columns)
    }

    /// Build from a text grid whose first row is the header.
    ///
    /// Blank header cells become `column_{n}` (1-based) and repeated names get
    /// `.1`, `.2`… suffixes so every column name is unique.
    pub fn from_grid(grid: Vec<Vec<String>>) -> Self {
        let mut rows = grid.into_iter();
        let Some(header) = rows.next() else {
            return Self::default();
        };
        let names = unique_header_names(&header);
        let data: Vec<Vec<Cell>> = rows
            .map(|r| r.into_iter().map(Cell::text).collect())
            .collect();
        Self::from_rows(names, data)
    }

    pub fn with_provenance(mut self, page: usize, strategy: StrategyKind) -> Self {
        self.page = Some(page);
        self.strategy = Some(strategy);
        self
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.cells.len()).unwrap_or(0)
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// True when the table has no rows or every cell is empty.
    pub fn is_empty(&self) -> bool {
        self.columns
            .iter()
            .all(|c| c.cells.iter().all(Cell::is_empty))
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Cells of row `i`, left to right.
    pub fn row(&self, i: usize) -> Vec<Cell> {
        self.columns
            .iter()
            .map(|c| c.cells.get(i).cloned().unwrap_or_default())
            .collect()
    }
}

fn unique_header_names(header: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(header.len());
    for (i, raw) in header.iter().enumerate() {
        let base = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        let base = if base.is_empty() {
            format!("column_{}", i + 1)
        } else {
            base
        };
        let mut name = base.clone();
        let mut n = 1;
        while names.contains(&name) {
            name = format!("{base}.{n}");
            n += 1;
        }
        names.push(name);
    }
    names
}

// ── Tagged tables ────────────────────────────────────────────────────────

/// A row tagged with the publication year it was sourced from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedRow {
    pub year: i32,
    pub cells: Vec<Cell>,
}

/// Row-major table whose rows carry a year tag.
///
/// The normalizer emits it in wide form (one column per category); after
/// [`crate::pipeline::normalize::reshape_to_long`] the last two columns are
/// `category` and `value`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaggedTable {
    pub columns: Vec<String>,
    pub rows: Vec<TaggedRow>,
    /// Name of the column holding region names, when one was detected.
    pub region_column: Option<String>,
}

impl TaggedTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at (`row`, `column name`).
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.cells.get(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_text_trims_and_blanks() {
        assert_eq!(Cell::text("  Acre "), Cell::Text("Acre".into()));
        assert_eq!(Cell::text("   "), Cell::Empty);
        assert!(Cell::Number(f64::NAN).is_empty());
    }

    #[test]
    fn integral_numbers_print_without_fraction() {
        assert_eq!(Cell::Number(10.0).as_str(), "10");
        assert_eq!(Cell::Number(2.5).as_str(), "2.5");
    }

    #[test]
    fn from_rows_pads_and_truncates() {
        let t = RawTable::from_rows(
            vec!["a", "b"],
            vec![vec![Cell::from("x")], vec!["1".into(), "2".into(), "3".into()]],
        );
        assert_eq!(t.n_rows(), 2);
        assert_eq!(t.row(0), vec![Cell::from("x"), Cell::Empty]);
        assert_eq!(t.row(1), vec![Cell::from("1"), Cell::from("2")]);
    }

    #[test]
    fn from_grid_names_blank_and_duplicate_headers() {
        let grid = vec![
            vec!["UF".to_string(), "".to_string(), "Total".to_string(), "Total".to_string()],
            vec!["Acre".to_string(), "x".to_string(), "1".to_string(), "2".to_string()],
        ];
        let t = RawTable::from_grid(grid);
        assert_eq!(t.column_names(), vec!["UF", "column_2", "Total", "Total.1"]);
        assert_eq!(t.n_rows(), 1);
    }

    #[test]
    fn empty_grid_gives_empty_table() {
        let t = RawTable::from_grid(vec![]);
        assert_eq!(t.n_cols(), 0);
        assert!(t.is_empty());
    }

    #[test]
    fn tagged_table_lookup() {
        let t = TaggedTable {
            columns: vec!["UF".into(), "value".into()],
            rows: vec![TaggedRow {
                year: 2022,
                cells: vec!["Acre".into(), Cell::Number(3.0)],
            }],
            region_column: Some("UF".into()),
        };
        assert_eq!(t.get(0, "value"), Some(&Cell::Number(3.0)));
        assert_eq!(t.get(0, "missing"), None);
        assert_eq!(t.get(5, "UF"), None);
    }
}
