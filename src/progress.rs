//! Progress-callback trait for per-year batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the consolidator walks the manifest. The CLI forwards them to a
//! terminal progress bar; tests count them.
//!
//! # Example
//!
//! ```rust
//! use yearbook_tables::{BatchProgressCallback, PipelineConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct RowCounter {
//!     rows: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for RowCounter {
//!     fn on_year_complete(&self, year: i32, records: usize) {
//!         self.rows.fetch_add(records, Ordering::SeqCst);
//!         eprintln!("{year}: {records} records");
//!     }
//! }
//!
//! let counter = Arc::new(RowCounter { rows: AtomicUsize::new(0) });
//! let config = PipelineConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the consolidator as it processes each manifest entry.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events arrive in ascending year order on the
/// calling thread.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first year is processed.
    ///
    /// # Arguments
    /// * `total_years`: number of manifest entries
    fn on_batch_start(&self, total_years: usize) {
        let _ = total_years;
    }

    /// Called before a year's document is opened.
    fn on_year_start(&self, year: i32, index: usize, total_years: usize) {
        let _ = (year, index, total_years);
    }

    /// Called when a year contributed at least one record.
    fn on_year_complete(&self, year: i32, records: usize) {
        let _ = (year, records);
    }

    /// Called when a year contributed nothing: the file is missing or no
    /// table matched the target regions.
    ///
    /// # Arguments
    /// * `reason`: short human-readable explanation
    fn on_year_skipped(&self, year: i32, reason: &str) {
        let _ = (year, reason);
    }

    /// Called when the document for a year could not be read.
    fn on_year_error(&self, year: i32, error: &str) {
        let _ = (year, error);
    }

    /// Called once after every year has been attempted.
    ///
    /// # Arguments
    /// * `total_years`  : manifest entries attempted
    /// * `total_records`: records in the consolidated dataset
    fn on_batch_complete(&self, total_years: usize, total_records: usize) {
        let _ = (total_years, total_records);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
