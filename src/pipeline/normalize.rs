//! Normalization: raw tables → year-tagged rows → long-format records.
//!
//! ## Why infer the region column?
//!
//! Yearbook tables have no stable schema. The state names may sit in a column
//! headed `UF`, `Unidade da Federação`, `Estado` or nothing at all, and the
//! column position moves between editions. Instead of trusting headers we
//! look at the cell contents: the first column whose text mentions one of the
//! target regions is taken to be the region column.
//!
//! ## Stages
//!
//! 1. [`normalize`] drops blank rows, filters rows to the target regions and
//!    tags each survivor with the publication year (wide form).
//! 2. [`reshape_to_long`] melts the category columns into `category`/`value`
//!    pairs, coercing each value to a number.
//! 3. [`to_records`] maps long rows onto [`Record`]s with canonical region
//!    spellings.

use crate::table::{Cell, Column, RawTable, TaggedRow, TaggedTable};
use crate::output::Record;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Name of the category column produced by [`reshape_to_long`].
pub const CATEGORY_COLUMN: &str = "category";
/// Name of the value column produced by [`reshape_to_long`].
pub const VALUE_COLUMN: &str = "value";

// ── Region detection ─────────────────────────────────────────────────────

/// Index of the first column whose lower-cased, space-joined cells contain
/// any lower-cased target region.
///
/// Headers are not consulted. Returns `None` when no column qualifies.
pub fn infer_region_column(columns: &[Column], target_regions: &[String]) -> Option<usize> {
    let targets = lowercase_all(target_regions);
    if targets.is_empty() {
        return None;
    }
    columns.iter().position(|col| {
        let joined = col
            .cells
            .iter()
            .map(|c| c.as_str().to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        targets.iter().any(|t| joined.contains(t.as_str()))
    })
}

/// First target (in configured order) contained in `text`, case-insensitive.
pub fn match_region<'a>(text: &str, target_regions: &'a [String]) -> Option<&'a str> {
    let text = text.to_lowercase();
    target_regions
        .iter()
        .find(|t| !t.is_empty() && text.contains(&t.to_lowercase()))
        .map(String::as_str)
}

fn lowercase_all(labels: &[String]) -> Vec<String> {
    labels
        .iter()
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .collect()
}

// ── Wide normalization ───────────────────────────────────────────────────

/// Drop all-empty rows, keep only rows of the target regions and tag every
/// surviving row with `year`.
///
/// When no region column is detected the rows are kept unfiltered. An empty
/// or all-empty table yields an empty result.
pub fn normalize(raw: &RawTable, year: i32, target_regions: &[String]) -> TaggedTable {
    let columns = raw.column_names();
    let region_idx = infer_region_column(&raw.columns, target_regions);

    let rows: Vec<TaggedRow> = (0..raw.n_rows())
        .map(|i| raw.row(i))
        .filter(|cells| !cells.iter().all(Cell::is_empty))
        .filter(|cells| match region_idx {
            Some(idx) => cells
                .get(idx)
                .is_some_and(|c| match_region(&c.as_str(), target_regions).is_some()),
            None => true,
        })
        .map(|cells| TaggedRow { year, cells })
        .collect();

    debug!(
        "Normalized table ({} cols): {} of {} rows kept, region column {:?}",
        columns.len(),
        rows.len(),
        raw.n_rows(),
        region_idx.map(|i| &columns[i])
    );

    TaggedTable {
        region_column: region_idx.map(|i| columns[i].clone()),
        columns,
        rows,
    }
}

/// Columns to melt: those whose header contains any target category
/// (case-insensitive). With no target categories, every column except the
/// region column.
pub fn select_value_columns(table: &TaggedTable, target_categories: &[String]) -> Vec<String> {
    let targets = lowercase_all(target_categories);
    table
        .columns
        .iter()
        .filter(|name| table.region_column.as_deref() != Some(name.as_str()))
        .filter(|name| {
            targets.is_empty() || {
                let lower = name.to_lowercase();
                targets.iter().any(|t| lower.contains(t.as_str()))
            }
        })
        .cloned()
        .collect()
}

// ── Long reshape ─────────────────────────────────────────────────────────

/// Melt `value_columns` into `category`/`value` pairs.
///
/// Rows are emitted row-major: every category of the first row, then the
/// second row, and so on. Identifying columns (everything not melted) are
/// carried over. Values that do not coerce to a number are dropped. When
/// none of `value_columns` is present the table is returned unchanged.
pub fn reshape_to_long(table: &TaggedTable, value_columns: &[String]) -> TaggedTable {
    let melt: Vec<usize> = value_columns
        .iter()
        .filter_map(|name| table.column_index(name))
        .collect();
    if melt.is_empty() {
        return table.clone();
    }

    let keep: Vec<usize> = (0..table.columns.len())
        .filter(|i| !melt.contains(i))
        .collect();

    let mut columns: Vec<String> = keep.iter().map(|&i| table.columns[i].clone()).collect();
    columns.push(CATEGORY_COLUMN.to_string());
    columns.push(VALUE_COLUMN.to_string());

    let mut rows = Vec::new();
    for row in &table.rows {
        for &m in &melt {
            let Some(value) = row.cells.get(m).and_then(cell_number) else {
                continue;
            };
            let mut cells: Vec<Cell> = keep
                .iter()
                .map(|&i| row.cells.get(i).cloned().unwrap_or_default())
                .collect();
            cells.push(Cell::Text(table.columns[m].trim().to_string()));
            cells.push(Cell::Number(value));
            rows.push(TaggedRow {
                year: row.year,
                cells,
            });
        }
    }

    TaggedTable {
        columns,
        rows,
        region_column: table.region_column.clone(),
    }
}

/// Turn long rows into records.
///
/// The region is the first target contained in the row's region cell; rows
/// of a table without a region column, or without `category`/`value`
/// columns, produce nothing.
pub fn to_records(long: &TaggedTable, target_regions: &[String]) -> Vec<Record> {
    let (Some(region_idx), Some(cat_idx), Some(val_idx)) = (
        long.region_column.as_deref().and_then(|c| long.column_index(c)),
        long.column_index(CATEGORY_COLUMN),
        long.column_index(VALUE_COLUMN),
    ) else {
        return Vec::new();
    };

    long.rows
        .iter()
        .filter_map(|row| {
            let region = match_region(&row.cells.get(region_idx)?.as_str(), target_regions)?;
            let category = row.cells.get(cat_idx)?.as_str().trim().to_string();
            let value = cell_number(row.cells.get(val_idx)?)?;
            Some(Record::new(row.year, region, category, value))
        })
        .collect()
}

/// Normalize, reshape and convert one raw table in a single call.
pub fn table_to_records(
    raw: &RawTable,
    year: i32,
    target_regions: &[String],
    target_categories: &[String],
) -> Vec<Record> {
    let wide = normalize(raw, year, target_regions);
    if wide.is_empty() || wide.region_column.is_none() {
        return Vec::new();
    }
    let value_columns = select_value_columns(&wide, target_categories);
    let long = reshape_to_long(&wide, &value_columns);
    to_records(&long, target_regions)
}

// ── Numeric coercion ─────────────────────────────────────────────────────

static RE_INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());
static RE_DOT_GROUPED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,3}(\.\d{3})+$").unwrap());
static RE_GROUPED_DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}(\.\d{3})+,\d+$").unwrap());
static RE_COMMA_DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+,\d+$").unwrap());
static RE_DOT_DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+$").unwrap());
static RE_SPACE_GROUPED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}(\s\d{3})+(,\d+)?$").unwrap());

/// Parse a non-negative count written in Brazilian Portuguese conventions.
///
/// `1.234` is one thousand two hundred thirty-four; `12,5` is twelve and a
/// half; `1.234,5` combines both; `3.5` (not a thousands group) stays a
/// decimal. A space may only separate thousands groups (`1 234`); two
/// numbers fused into one cell (`10 20`) are rejected, as are negatives,
/// dashes, ellipses and free text.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let s: String = if trimmed.contains(char::is_whitespace) {
        if !RE_SPACE_GROUPED.is_match(trimmed) {
            return None;
        }
        trimmed.chars().filter(|c| !c.is_whitespace()).collect()
    } else {
        trimmed.to_string()
    };

    let normalized = if RE_DOT_GROUPED.is_match(&s) {
        s.replace('.', "")
    } else if RE_GROUPED_DECIMAL.is_match(&s) {
        s.replace('.', "").replace(',', ".")
    } else if RE_COMMA_DECIMAL.is_match(&s) {
        s.replace(',', ".")
    } else if RE_INTEGER.is_match(&s) || RE_DOT_DECIMAL.is_match(&s) {
        s
    } else {
        return None;
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Numeric value of a cell, if it holds a non-negative number.
pub fn cell_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Empty => None,
        Cell::Number(n) => Some(*n).filter(|v| v.is_finite() && *v >= 0.0),
        Cell::Text(s) => parse_number(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions() -> Vec<String> {
        vec!["Amazonas".into(), "Roraima".into(), "Acre".into()]
    }

    fn categories() -> Vec<String> {
        vec!["Feminicídio".into(), "Estupro".into()]
    }

    fn yearbook_table() -> RawTable {
        RawTable::from_rows(
            vec!["UF", "Feminicídio", "Estupro"],
            vec![
                vec!["Amazonas".into(), "10".into(), "20".into()],
                vec!["Pará".into(), "5".into(), "7".into()],
                vec!["Roraima".into(), "3".into(), "4".into()],
            ],
        )
    }

    #[test]
    fn region_column_is_first_qualifying_column() {
        let t = RawTable::from_rows(
            vec!["Ano", "Local", "Destino", "Total"],
            vec![
                vec!["2020".into(), "Manaus, Amazonas".into(), "Acre".into(), "1".into()],
                vec!["2020".into(), "Belém".into(), "Pará".into(), "2".into()],
            ],
        );
        assert_eq!(infer_region_column(&t.columns, &regions()), Some(1));
    }

    #[test]
    fn region_column_ignores_headers() {
        let t = RawTable::from_rows(vec!["Amazonas", "UF"], vec![vec!["1".into(), "ACRE".into()]]);
        assert_eq!(infer_region_column(&t.columns, &regions()), Some(1));
    }

    #[test]
    fn no_region_column_keeps_all_rows() {
        let t = RawTable::from_rows(
            vec!["a", "b"],
            vec![vec!["x".into(), "1".into()], vec!["y".into(), "2".into()]],
        );
        let wide = normalize(&t, 2020, &regions());
        assert_eq!(wide.len(), 2);
        assert!(wide.region_column.is_none());
    }

    #[test]
    fn normalize_filters_rows_and_tags_year() {
        let wide = normalize(&yearbook_table(), 2022, &regions());
        assert_eq!(wide.len(), 2);
        assert_eq!(wide.region_column.as_deref(), Some("UF"));
        for row in &wide.rows {
            assert_eq!(row.year, 2022);
            assert!(match_region(&row.cells[0].as_str(), &regions()).is_some());
        }
        assert!(wide.rows.iter().all(|r| r.cells[0].as_str() != "Pará"));
    }

    #[test]
    fn normalize_drops_blank_rows() {
        let t = RawTable::from_rows(
            vec!["UF", "Total"],
            vec![
                vec![Cell::Empty, Cell::text("  ")],
                vec!["Acre".into(), "9".into()],
            ],
        );
        assert_eq!(normalize(&t, 2020, &regions()).len(), 1);
    }

    #[test]
    fn empty_table_normalizes_to_empty() {
        let wide = normalize(&RawTable::default(), 2020, &regions());
        assert!(wide.is_empty());
        let blank = RawTable::from_rows(vec!["a"], vec![vec![Cell::Empty], vec![Cell::Empty]]);
        assert!(normalize(&blank, 2020, &regions()).is_empty());
    }

    #[test]
    fn reshape_scenario_is_row_major() {
        let wide = normalize(&yearbook_table(), 2022, &regions());
        let values = select_value_columns(&wide, &categories());
        assert_eq!(values, vec!["Feminicídio", "Estupro"]);

        let long = reshape_to_long(&wide, &values);
        assert_eq!(long.columns, vec!["UF", "category", "value"]);
        assert_eq!(long.len(), 4);

        let records = to_records(&long, &regions());
        assert_eq!(
            records,
            vec![
                Record::new(2022, "Amazonas", "Feminicídio", 10.0),
                Record::new(2022, "Amazonas", "Estupro", 20.0),
                Record::new(2022, "Roraima", "Feminicídio", 3.0),
                Record::new(2022, "Roraima", "Estupro", 4.0),
            ]
        );
    }

    #[test]
    fn reshape_without_value_columns_is_identity() {
        let wide = normalize(&yearbook_table(), 2022, &regions());
        let long = reshape_to_long(&wide, &["Homicídio".to_string()]);
        assert_eq!(long, wide);
        assert_eq!(reshape_to_long(&wide, &[]), wide);
    }

    #[test]
    fn reshape_drops_uncoercible_values() {
        let t = RawTable::from_rows(
            vec!["UF", "Estupro"],
            vec![
                vec!["Acre".into(), "-".into()],
                vec!["Roraima".into(), "1.234".into()],
            ],
        );
        let records = table_to_records(&t, 2021, &regions(), &categories());
        assert_eq!(records, vec![Record::new(2021, "Roraima", "Estupro", 1234.0)]);
    }

    #[test]
    fn region_is_canonicalised_to_target_spelling() {
        let t = RawTable::from_rows(
            vec!["Estado", "Estupro"],
            vec![vec!["AMAZONAS (AM)".into(), "7".into()]],
        );
        let records = table_to_records(&t, 2020, &regions(), &categories());
        assert_eq!(records[0].region, "Amazonas");
    }

    #[test]
    fn no_target_categories_melts_every_non_region_column() {
        let t = RawTable::from_rows(
            vec!["UF", "Homicídio", "Roubo"],
            vec![vec!["Acre".into(), "2".into(), "3".into()]],
        );
        let records = table_to_records(&t, 2020, &regions(), &[]);
        let cats: Vec<&str> = records.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(cats, vec!["Homicídio", "Roubo"]);
    }

    #[test]
    fn table_without_region_column_yields_no_records() {
        let t = RawTable::from_rows(vec!["Tipo", "Estupro"], vec![vec!["x".into(), "1".into()]]);
        assert!(table_to_records(&t, 2020, &regions(), &categories()).is_empty());
    }

    #[test]
    fn parse_number_pt_br() {
        assert_eq!(parse_number("10"), Some(10.0));
        assert_eq!(parse_number(" 3.5 "), Some(3.5));
        assert_eq!(parse_number("1.234"), Some(1234.0));
        assert_eq!(parse_number("12.345.678"), Some(12_345_678.0));
        assert_eq!(parse_number("1.234,5"), Some(1234.5));
        assert_eq!(parse_number("12,5"), Some(12.5));
        assert_eq!(parse_number("1 234"), Some(1234.0));
        assert_eq!(parse_number("12 345 678"), Some(12_345_678.0));
        assert_eq!(parse_number("1\u{a0}234,5"), Some(1234.5));
    }

    #[test]
    fn parse_number_rejects_fused_cells() {
        for s in ["3 4", "10 20", "12 5,5", "1 23", "1234 567", "1.234 5"] {
            assert_eq!(parse_number(s), None, "input {s:?}");
        }
    }

    #[test]
    fn fused_value_cells_drop_the_pair() {
        let t = RawTable::from_rows(
            vec!["UF", "Feminicídio", "Estupro"],
            vec![vec!["Acre".into(), "10 20".into(), "7".into()]],
        );
        let records = table_to_records(&t, 2021, &regions(), &categories());
        assert_eq!(records, vec![Record::new(2021, "Acre", "Estupro", 7.0)]);
    }

    #[test]
    fn parse_number_rejects_non_counts() {
        for s in ["", "-", "...", "-5", "n/a", "12a", "1,2,3"] {
            assert_eq!(parse_number(s), None, "input {s:?}");
        }
        assert_eq!(cell_number(&Cell::Number(-1.0)), None);
        assert_eq!(cell_number(&Cell::Number(4.0)), Some(4.0));
    }
}
