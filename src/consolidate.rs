//! Batch consolidation: every yearbook in the manifest → one dataset.
//!
//! ## Why never fail the batch?
//!
//! Yearbook archives are messy: one year is missing from the download
//! folder, another was saved from a browser as an HTML page, a third is
//! encrypted. A six-year study should still come out with five years of
//! data. Each year's outcome is therefore recorded in the
//! [`BatchSummary`] and the loop moves on; only an empty *result* is left
//! for the caller to interpret.

use crate::config::PipelineConfig;
use crate::engine;
use crate::error::{ExtractionError, YearbookError};
use crate::output::{BatchSummary, ConsolidationOutput, Dataset, Record, YearOutcome, YearStatus};
use crate::pipeline::extract::TableExtractor;
use crate::pipeline::input::Manifest;
use crate::pipeline::layout::{LayoutSource, PdfiumLayoutSource};
use crate::pipeline::normalize::table_to_records;
use std::time::Instant;
use tracing::{info, warn};

/// Extract, normalize and concatenate the tables of every manifest entry.
///
/// Years are processed in ascending order and records keep year order, then
/// extraction order. Missing or unreadable documents are logged and tagged in
/// the summary; they never abort the batch. An empty dataset is a valid
/// result.
pub fn consolidate(
    manifest: &Manifest,
    source: &dyn LayoutSource,
    config: &PipelineConfig,
) -> ConsolidationOutput {
    let start = Instant::now();
    let extractor = TableExtractor::new(source, config);
    let total_years = manifest.len();

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total_years);
    }

    let mut records: Vec<Record> = Vec::new();
    let mut outcomes = Vec::with_capacity(total_years);

    for (index, (year, path)) in manifest.iter().enumerate() {
        if let Some(ref cb) = config.progress_callback {
            cb.on_year_start(year, index, total_years);
        }

        let status = if !path.exists() {
            warn!("{}: yearbook not found at {}, skipping", year, path.display());
            YearStatus::Missing
        } else {
            match extractor.extract_detailed(path, &config.pages) {
                Err(ExtractionError::NotFound { .. }) => {
                    warn!("{}: yearbook not found at {}, skipping", year, path.display());
                    YearStatus::Missing
                }
                Err(error) => {
                    warn!("{}: {}", year, error);
                    YearStatus::Failed { error }
                }
                Ok(tables) => {
                    let before = records.len();
                    for table in &tables {
                        records.extend(table_to_records(
                            table,
                            year,
                            &config.target_regions,
                            &config.target_categories,
                        ));
                    }
                    let added = records.len() - before;
                    if added > 0 {
                        info!("{}: {} records from {} tables", year, added, tables.len());
                        YearStatus::Extracted {
                            records: added,
                            tables: tables.len(),
                        }
                    } else {
                        info!("{}: no data for the target regions", year);
                        YearStatus::Empty {
                            tables: tables.len(),
                        }
                    }
                }
            }
        };

        if let Some(ref cb) = config.progress_callback {
            match &status {
                YearStatus::Extracted { records, .. } => cb.on_year_complete(year, *records),
                YearStatus::Empty { .. } => cb.on_year_skipped(year, "no matching rows"),
                YearStatus::Missing => cb.on_year_skipped(year, "file not found"),
                YearStatus::Failed { error } => cb.on_year_error(year, &error.to_string()),
            }
        }

        outcomes.push(YearOutcome {
            year,
            path: path.to_path_buf(),
            status,
        });
    }

    if records.is_empty() {
        warn!("No records extracted from {} yearbooks", total_years);
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total_years, records.len());
    }

    let summary = BatchSummary {
        outcomes,
        total_records: records.len(),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    ConsolidationOutput {
        dataset: Dataset::new(records),
        summary,
    }
}

/// [`consolidate`] with layouts read through a freshly bound pdfium.
///
/// # Errors
/// Only when pdfium cannot be bound; per-document failures are recorded in
/// the summary.
pub fn consolidate_pdfs(
    manifest: &Manifest,
    config: &PipelineConfig,
) -> Result<ConsolidationOutput, YearbookError> {
    let pdfium = engine::bind_pdfium()?;
    let source = PdfiumLayoutSource::new(&pdfium);
    Ok(consolidate(manifest, &source, config))
}
