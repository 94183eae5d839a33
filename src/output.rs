//! Output types: the consolidated dataset, per-year outcomes and CSV I/O.
//!
//! ## Why long format?
//!
//! Yearbooks change their table layouts from one edition to the next: a
//! category that is a column in 2019 may be split in two in 2021. Storing one
//! `(year, region, category, value)` row per observation keeps the dataset
//! shape stable no matter how the source tables were laid out, and every
//! chart is a group-by over those four fields.

use crate::error::{ExtractionError, YearbookError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Header row of the dataset CSV.
pub const CSV_HEADER: [&str; 4] = ["year", "region", "category", "value"];

/// One observation: a count for a region and category in a given year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub year: i32,
    pub region: String,
    pub category: String,
    pub value: f64,
}

impl Record {
    pub fn new(year: i32, region: impl Into<String>, category: impl Into<String>, value: f64) -> Self {
        Self {
            year,
            region: region.into(),
            category: category.into(),
            value,
        }
    }
}

/// The consolidated long-format dataset.
///
/// Records keep the order they were produced in: ascending year, then the
/// order tables were found in each document. Duplicates are kept.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Distinct years, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.records.iter().map(|r| r.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Distinct regions in first-appearance order.
    pub fn regions(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.region.as_str()))
    }

    /// Distinct categories in first-appearance order.
    pub fn categories(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.category.as_str()))
    }

    /// Sum of values per region, in first-appearance order.
    pub fn totals_by_region(&self) -> Vec<(String, f64)> {
        totals(self.records.iter().map(|r| (r.region.as_str(), r.value)))
    }

    /// Sum of values per category, in first-appearance order.
    pub fn totals_by_category(&self) -> Vec<(String, f64)> {
        totals(self.records.iter().map(|r| (r.category.as_str(), r.value)))
    }

    pub fn total(&self) -> f64 {
        self.records.iter().map(|r| r.value).sum()
    }

    /// Write the dataset as UTF-8 CSV with header `year,region,category,value`.
    ///
    /// Uses atomic write (temp file + rename) so a crash never leaves a
    /// truncated dataset behind. Parent directories are created.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), YearbookError> {
        let path = path.as_ref();
        let write_err = |source: std::io::Error| YearbookError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let tmp_path = path.with_extension("csv.tmp");
        let result = self
            .write_rows(&tmp_path, path)
            .and_then(|()| std::fs::rename(&tmp_path, path).map_err(write_err));
        if result.is_err() {
            let _ = std::fs::remove_file(&tmp_path);
            return result;
        }
        debug!("Wrote {} records to {}", self.records.len(), path.display());
        Ok(())
    }

    fn write_rows(&self, tmp_path: &Path, path: &Path) -> Result<(), YearbookError> {
        let mut writer = csv::Writer::from_path(tmp_path).map_err(|e| csv_error(path, e))?;
        writer
            .write_record(CSV_HEADER)
            .map_err(|e| csv_error(path, e))?;
        for r in &self.records {
            writer
                .write_record([
                    r.year.to_string(),
                    r.region.clone(),
                    r.category.clone(),
                    crate::table::format_number(r.value),
                ])
                .map_err(|e| csv_error(path, e))?;
        }
        writer
            .flush()
            .map_err(|source| YearbookError::OutputWriteFailed {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Read a dataset previously written by [`Dataset::write_csv`].
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self, YearbookError> {
        let path = path.as_ref();
        let read_err = |detail: String| YearbookError::DatasetRead {
            path: path.to_path_buf(),
            detail,
        };

        let mut reader = csv::Reader::from_path(path).map_err(|e| read_err(e.to_string()))?;
        let headers = reader.headers().map_err(|e| read_err(e.to_string()))?;
        let headers: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        if headers != CSV_HEADER {
            return Err(read_err(format!(
                "expected header {}, found {}",
                CSV_HEADER.join(","),
                headers.join(",")
            )));
        }
        reader.set_headers(csv::StringRecord::from(CSV_HEADER.to_vec()));

        let mut records = Vec::new();
        for row in reader.deserialize::<Record>() {
            records.push(row.map_err(|e| read_err(e.to_string()))?);
        }
        Ok(Self { records })
    }
}

impl FromIterator<Record> for Dataset {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

fn csv_error(path: &Path, e: csv::Error) -> YearbookError {
    YearbookError::CsvWrite {
        path: path.to_path_buf(),
        detail: e.to_string(),
    }
}

fn distinct<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.iter().any(|o| o == item) {
            out.push(item.to_string());
        }
    }
    out
}

fn totals<'a>(items: impl Iterator<Item = (&'a str, f64)>) -> Vec<(String, f64)> {
    let mut out: Vec<(String, f64)> = Vec::new();
    for (key, value) in items {
        match out.iter_mut().find(|(k, _)| k == key) {
            Some((_, sum)) => *sum += value,
            None => out.push((key.to_string(), value)),
        }
    }
    out
}

// ── Batch outcomes ───────────────────────────────────────────────────────

/// What happened to one manifest entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum YearStatus {
    /// At least one record was extracted.
    Extracted { records: usize, tables: usize },
    /// The document was read but no table yielded records.
    Empty { tables: usize },
    /// The document path does not exist.
    Missing,
    /// The document could not be read.
    Failed { error: ExtractionError },
}

/// Outcome for one year of the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearOutcome {
    pub year: i32,
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: YearStatus,
}

/// Per-year outcomes of one consolidation run, ascending by year.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub outcomes: Vec<YearOutcome>,
    pub total_records: usize,
    pub duration_ms: u64,
}

impl BatchSummary {
    fn count(&self, pred: impl Fn(&YearStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }

    pub fn extracted_years(&self) -> usize {
        self.count(|s| matches!(s, YearStatus::Extracted { .. }))
    }

    pub fn empty_years(&self) -> usize {
        self.count(|s| matches!(s, YearStatus::Empty { .. }))
    }

    pub fn missing_years(&self) -> usize {
        self.count(|s| matches!(s, YearStatus::Missing))
    }

    pub fn failed_years(&self) -> usize {
        self.count(|s| matches!(s, YearStatus::Failed { .. }))
    }

    /// Records contributed per year, for the years that contributed any.
    pub fn records_by_year(&self) -> BTreeMap<i32, usize> {
        self.outcomes
            .iter()
            .filter_map(|o| match o.status {
                YearStatus::Extracted { records, .. } => Some((o.year, records)),
                _ => None,
            })
            .collect()
    }
}

/// Result of [`crate::consolidate::consolidate`]: the dataset plus what
/// happened to each year.
#[derive(Debug, Clone, Default)]
pub struct ConsolidationOutput {
    pub dataset: Dataset,
    pub summary: BatchSummary,
}
