//! Configuration types for the extraction pipeline.
//!
//! All extraction behaviour is controlled through [`PipelineConfig`], built
//! via its [`PipelineConfigBuilder`]. Target regions, target categories, the
//! page selection, the strategy order and the geometric tolerances of both
//! table heuristics live in one struct, so two runs can be compared by
//! diffing their configs.

use crate::error::YearbookError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Regions kept by default: the three northern states the yearbook study covers.
pub const DEFAULT_REGIONS: [&str; 3] = ["Amazonas", "Roraima", "Acre"];

/// Violence-index categories reshaped by default.
pub const DEFAULT_CATEGORIES: [&str; 4] = [
    "Feminicídio",
    "Estupro",
    "Lesão Corporal",
    "Violência Doméstica",
];

/// Configuration for one extraction + consolidation run.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use yearbook_tables::{PipelineConfig, PageSelection};
///
/// let config = PipelineConfig::builder()
///     .regions(["Amazonas", "Acre"])
///     .pages(PageSelection::Range(40, 60))
///     .build()
///     .unwrap();
/// assert_eq!(config.target_regions.len(), 2);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Region allow-list, matched case-insensitively as substrings.
    pub target_regions: Vec<String>,

    /// Category labels. A column whose header contains one of these
    /// (case-insensitive) is melted into long format. Empty means every
    /// non-region column is a value column.
    pub target_categories: Vec<String>,

    /// Pages to read from every document. Default: all pages.
    pub pages: PageSelection,

    /// Extraction strategies in the order they are attempted.
    /// Default: stream, then lattice.
    pub strategies: Vec<StrategyKind>,

    /// Tolerances for the whitespace (stream) heuristic.
    pub stream: StreamSettings,

    /// Tolerances for the ruling-line (lattice) heuristic.
    pub lattice: LatticeSettings,

    /// PDF user password for encrypted yearbooks.
    pub password: Option<String>,

    /// Optional per-year progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_regions: DEFAULT_REGIONS.iter().map(|s| s.to_string()).collect(),
            target_categories: DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            pages: PageSelection::default(),
            strategies: vec![StrategyKind::Stream, StrategyKind::Lattice],
            stream: StreamSettings::default(),
            lattice: LatticeSettings::default(),
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("target_regions", &self.target_regions)
            .field("target_categories", &self.target_categories)
            .field("pages", &self.pages)
            .field("strategies", &self.strategies)
            .field("stream", &self.stream)
            .field("lattice", &self.lattice)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.target_regions = regions.into_iter().map(Into::into).collect();
        self
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.target_categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn strategies(mut self, order: Vec<StrategyKind>) -> Self {
        self.config.strategies = order;
        self
    }

    pub fn stream(mut self, settings: StreamSettings) -> Self {
        self.config.stream = settings;
        self
    }

    pub fn lattice(mut self, settings: LatticeSettings) -> Self {
        self.config.lattice = settings;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<PipelineConfig, YearbookError> {
        let c = &mut self.config;
        c.target_regions = tidy_labels(&c.target_regions);
        c.target_categories = tidy_labels(&c.target_categories);

        if c.target_regions.is_empty() {
            return Err(YearbookError::InvalidConfig(
                "at least one target region is required".into(),
            ));
        }
        if c.strategies.is_empty() {
            return Err(YearbookError::InvalidConfig(
                "at least one extraction strategy is required".into(),
            ));
        }
        if c.stream.min_cols < 2 || c.stream.min_rows < 2 {
            return Err(YearbookError::InvalidConfig(format!(
                "stream tables need at least 2 rows and 2 columns, got {}x{}",
                c.stream.min_rows, c.stream.min_cols
            )));
        }
        if c.stream.row_tolerance <= 0.0 || c.stream.column_gap <= 0.0 {
            return Err(YearbookError::InvalidConfig(
                "stream tolerances must be positive".into(),
            ));
        }
        if c.lattice.max_ruling_thickness <= 0.0 || c.lattice.snap_tolerance <= 0.0 {
            return Err(YearbookError::InvalidConfig(
                "lattice tolerances must be positive".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Trim labels and drop blanks and exact duplicates, keeping order.
fn tidy_labels(labels: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        let label = label.trim();
        if !label.is_empty() && !out.iter().any(|l| l == label) {
            out.push(label.to_string());
        }
    }
    out
}

// ── Strategy settings ────────────────────────────────────────────────────

/// Named table-extraction heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Borderless tables: columns inferred from whitespace between text.
    Stream,
    /// Ruled tables: cells inferred from drawn horizontal/vertical lines.
    Lattice,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Stream => f.write_str("stream"),
            StrategyKind::Lattice => f.write_str("lattice"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = YearbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stream" => Ok(StrategyKind::Stream),
            "lattice" => Ok(StrategyKind::Lattice),
            other => Err(YearbookError::InvalidConfig(format!(
                "unknown strategy '{other}' (expected stream or lattice)"
            ))),
        }
    }
}

/// Geometry thresholds for the stream heuristic, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Fragments whose vertical centres differ by at most this share a line.
    pub row_tolerance: f32,
    /// A horizontal gap wider than this splits two fragments into two cells.
    pub column_gap: f32,
    /// Minimum consecutive multi-cell lines that form a table.
    pub min_rows: usize,
    /// Minimum cells per line for the line to count as tabular.
    pub min_cols: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            row_tolerance: 3.0,
            column_gap: 8.0,
            min_rows: 2,
            min_cols: 2,
        }
    }
}

/// Geometry thresholds for the lattice heuristic, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatticeSettings {
    /// Path objects thinner than this are treated as ruling lines.
    pub max_ruling_thickness: f32,
    /// Coordinates closer than this are snapped together.
    pub snap_tolerance: f32,
    /// Rulings shorter than this are ignored (tick marks, bullets).
    pub min_ruling_length: f32,
}

impl Default for LatticeSettings {
    fn default() -> Self {
        Self {
            max_ruling_thickness: 2.0,
            snap_tolerance: 3.0,
            min_ruling_length: 10.0,
        }
    }
}

// ── Page selection ───────────────────────────────────────────────────────

/// Specifies which pages of each yearbook to read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Read all pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let in_range = |p: usize| p >= 1 && p <= total_pages;
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) if in_range(*p) => vec![p - 1],
            PageSelection::Single(_) => Vec::new(),
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .copied()
                .filter(|&p| in_range(p))
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

impl FromStr for PageSelection {
    type Err = YearbookError;

    /// Parse `all`, `5`, `3-15`, `1,3,5` or a mix such as `1-3,5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s.is_empty() || s == "all" {
            return Ok(PageSelection::All);
        }

        if s.contains(',') {
            let mut pages = Vec::new();
            for part in s.split(',') {
                match parse_page_range(part)? {
                    (start, end) if start == end => pages.push(start),
                    (start, end) => pages.extend(start..=end),
                }
            }
            pages.sort_unstable();
            pages.dedup();
            return Ok(PageSelection::Set(pages));
        }

        Ok(match parse_page_range(&s)? {
            (start, end) if start == end && !s.contains('-') => PageSelection::Single(start),
            (start, end) => PageSelection::Range(start, end),
        })
    }
}

/// One `N` or `A-B` term of a page list, as an inclusive range.
fn parse_page_range(term: &str) -> Result<(usize, usize), YearbookError> {
    let page = |p: &str| -> Result<usize, YearbookError> {
        let n: usize = p.trim().parse().map_err(|_| {
            YearbookError::InvalidConfig(format!("invalid page number '{}'", p.trim()))
        })?;
        if n < 1 {
            return Err(YearbookError::InvalidConfig(
                "pages are 1-indexed, minimum is 1".into(),
            ));
        }
        Ok(n)
    };

    match term.split_once('-') {
        Some((start, end)) => {
            let (start, end) = (page(start)?, page(end)?);
            if start > end {
                return Err(YearbookError::InvalidConfig(format!(
                    "invalid page range '{start}-{end}': start must be <= end"
                )));
            }
            Ok((start, end))
        }
        None => {
            let n = page(term)?;
            Ok((n, n))
        }
    }
}
