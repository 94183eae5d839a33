//! # yearbook-tables
//!
//! Extract statistics tables from yearly PDF publications, consolidate them
//! into one tidy dataset, chart it and assemble a PDF report.
//!
//! ## Why this crate?
//!
//! Public-security yearbooks publish the same indicators every year, but
//! only as tables inside PDFs: one region per row, one indicator per column,
//! numbers written with Brazilian separators (`1.234,5`). Building a time
//! series means opening every edition, finding the right tables and copying
//! the rows of interest by hand. This crate reads the page layout through
//! pdfium, recovers tables with two heuristics (whitespace-aligned *stream*
//! and ruled *lattice*), keeps only the target regions and indicators, and
//! emits one long-format `year,region,category,value` dataset.
//!
//! ## Pipeline Overview
//!
//! ```text
//! manifest {year → PDF}
//!  │
//!  ├─ 1. Input      check each path (exists, %PDF magic)
//!  ├─ 2. Layout     text fragments + path rectangles per page (pdfium)
//!  ├─ 3. Extract    stream → lattice cascade, first non-empty wins
//!  ├─ 4. Normalize  region column, row filter, wide → long, number coercion
//!  ├─ 5. Dataset    concatenated records + per-year outcome summary
//!  ├─ 6. Charts     time series / comparison / heatmap / trend PNGs
//!  └─ 7. Report     A4 PDF with methodology, figures and references
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use yearbook_tables::{consolidate_pdfs, Manifest, PipelineConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manifest = Manifest::from_dir("dados", &[2019, 2020, 2022]);
//!     let config = PipelineConfig::default();
//!     let output = consolidate_pdfs(&manifest, &config)?;
//!     output.dataset.write_csv("dados_consolidados.csv")?;
//!     eprintln!(
//!         "{} records from {} of {} years",
//!         output.dataset.len(),
//!         output.summary.extracted_years(),
//!         manifest.len()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `yearbook` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! yearbook-tables = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! Reading yearbooks, painting charts and writing the report all go through
//! a pdfium shared library bound at runtime. See [`engine::bind_pdfium`] for
//! the lookup order (`PDFIUM_LIB_PATH`, working directory, system library).
//! Table normalization, the dataset, synthetic data and every layout step
//! are pure and need no library.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod chart;
pub mod config;
pub mod consolidate;
pub mod draw;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod synthetic;
pub mod table;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use chart::{ChartKind, ChartLabels, ChartOptions, ChartRenderer};
pub use config::{
    LatticeSettings, PageSelection, PipelineConfig, PipelineConfigBuilder, StrategyKind, StreamSettings,
};
pub use consolidate::{consolidate, consolidate_pdfs};
pub use error::{ExtractionError, YearbookError};
pub use output::{BatchSummary, ConsolidationOutput, Dataset, Record, YearOutcome, YearStatus};
pub use pipeline::extract::TableExtractor;
pub use pipeline::input::Manifest;
pub use pipeline::layout::{
    path_lines, DocumentLayout, LayoutSource, PageLayout, PathStep, PdfiumLayoutSource, Rect,
    TextFragment,
};
pub use pipeline::normalize::{normalize, reshape_to_long, table_to_records};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use report::{ReportAssembler, ReportContent, ReportMetadata, ReportSummary};
pub use table::{Cell, Column, RawTable, TaggedTable};
