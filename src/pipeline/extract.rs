//! Table extraction: run the strategy cascade over one document.
//!
//! The layout is read once; strategies are then tried in the configured
//! order and the first one that finds at least one table wins. Stream goes
//! first because most yearbook tables are borderless; lattice picks up the
//! ruled ones that stream splits badly.

use crate::config::{PageSelection, PipelineConfig};
use crate::error::ExtractionError;
use crate::pipeline::input;
use crate::pipeline::layout::LayoutSource;
use crate::pipeline::strategy::{strategy_for, TableStrategy};
use crate::table::RawTable;
use std::path::Path;
use tracing::{debug, info, warn};

/// Reads documents through a [`LayoutSource`] and applies the strategy cascade.
pub struct TableExtractor<'a> {
    source: &'a dyn LayoutSource,
    strategies: Vec<Box<dyn TableStrategy>>,
    password: Option<String>,
}

impl<'a> TableExtractor<'a> {
    pub fn new(source: &'a dyn LayoutSource, config: &PipelineConfig) -> Self {
        let strategies = config
            .strategies
            .iter()
            .map(|&kind| strategy_for(kind, config.stream, config.lattice))
            .collect();
        Self {
            source,
            strategies,
            password: config.password.clone(),
        }
    }

    /// Tables found in `path`, or an empty list when the document is missing,
    /// unreadable or holds no tables. Failures are logged, never returned.
    pub fn extract(&self, path: &Path, pages: &PageSelection) -> Vec<RawTable> {
        match self.extract_detailed(path, pages) {
            Ok(tables) => tables,
            Err(e) => {
                warn!("Extraction failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Like [`TableExtractor::extract`] but reports why a document could not
    /// be read.
    pub fn extract_detailed(
        &self,
        path: &Path,
        pages: &PageSelection,
    ) -> Result<Vec<RawTable>, ExtractionError> {
        input::check_pdf(path)?;
        let layout = self.source.load(path, pages, self.password.as_deref())?;

        for strategy in &self.strategies {
            let tables = strategy.attempt(&layout);
            if !tables.is_empty() {
                info!(
                    "{}: {} tables via {}",
                    path.display(),
                    tables.len(),
                    strategy.kind()
                );
                return Ok(tables);
            }
            debug!("{}: {} found nothing", path.display(), strategy.kind());
        }

        info!("{}: no tables found", path.display());
        Ok(Vec::new())
    }
}
