//! Chart rendering: dataset → fixed family of PNG charts.
//!
//! ## The chart family
//!
//! | Kind | One per | Lines / cells | File |
//! |------|---------|---------------|------|
//! | time series | region | one line per category | `timeseries_{region}.png` |
//! | comparison | category | one line per region | `comparison_{category}.png` |
//! | heatmap | category | region × year, summed | `heatmap_{category}.png` |
//! | overall trend | dataset | one line per category, summed over regions | `trend_overall.png` |
//!
//! Charts are planned as [`Scene`]s by pure code ([`ChartRenderer::plan`]),
//! then painted and rasterised through pdfium.

pub mod data;
pub mod plot;

use crate::draw::{slug, Scene};
use crate::error::YearbookError;
use crate::output::Dataset;
use crate::pipeline::paint::Painter;
use pdfium_render::prelude::Pdfium;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

use self::plot::Frame;

/// The kinds of chart the renderer produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    TimeSeries,
    Comparison,
    Heatmap,
    Trend,
}

impl ChartKind {
    pub fn file_prefix(self) -> &'static str {
        match self {
            ChartKind::TimeSeries => "timeseries",
            ChartKind::Comparison => "comparison",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Trend => "trend",
        }
    }

    /// Recognise a chart kind from a file name such as `heatmap_estupro.png`.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.to_lowercase();
        [
            ChartKind::TimeSeries,
            ChartKind::Comparison,
            ChartKind::Heatmap,
            ChartKind::Trend,
        ]
        .into_iter()
        .find(|k| stem.starts_with(k.file_prefix()))
    }
}

/// Titles and axis labels. Defaults are in Portuguese, matching the
/// yearbooks the dataset comes from.
#[derive(Debug, Clone)]
pub struct ChartLabels {
    pub timeseries_title: String,
    pub comparison_title: String,
    pub heatmap_title: String,
    pub trend_title: String,
    pub year_axis: String,
    pub count_axis: String,
    pub total_axis: String,
    pub category_legend: String,
    pub region_legend: String,
    pub heat_legend: String,
}

impl Default for ChartLabels {
    fn default() -> Self {
        Self {
            timeseries_title: "Índices de Violência contra Mulheres".into(),
            comparison_title: "Comparativo entre Estados".into(),
            heatmap_title: "Mapa de Calor".into(),
            trend_title: "Tendência Geral de Violência - Região Norte".into(),
            year_axis: "Ano".into(),
            count_axis: "Número de Ocorrências".into(),
            total_axis: "Total de Ocorrências".into(),
            category_legend: "Tipo de Violência".into(),
            region_legend: "Estado".into(),
            heat_legend: "Ocorrências".into(),
        }
    }
}

/// Chart sizes and labels.
#[derive(Debug, Clone)]
pub struct ChartOptions {
    /// Line-chart page size in points.
    pub line_size: (f32, f32),
    /// Heatmap page size in points.
    pub heatmap_size: (f32, f32),
    /// PNG width in pixels.
    pub width_px: u32,
    pub labels: ChartLabels,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            line_size: (720.0, 420.0),
            heatmap_size: (840.0, 360.0),
            width_px: 1800,
            labels: ChartLabels::default(),
        }
    }
}

/// One chart ready to paint.
#[derive(Debug, Clone)]
pub struct PlannedChart {
    pub kind: ChartKind,
    pub file_name: String,
    pub scene: Scene,
}

/// `2015-2025`, or the single year.
fn period(dataset: &Dataset) -> String {
    let years = dataset.years();
    match (years.first(), years.last()) {
        (Some(a), Some(b)) if a != b => format!("{a}-{b}"),
        (Some(a), _) => a.to_string(),
        _ => String::new(),
    }
}

/// Renders the chart family for a dataset.
pub struct ChartRenderer<'a> {
    painter: Painter<'a>,
    options: ChartOptions,
}

impl<'a> ChartRenderer<'a> {
    pub fn new(pdfium: &'a Pdfium, options: ChartOptions) -> Self {
        Self {
            painter: Painter::new(pdfium),
            options,
        }
    }

    /// Lay out every chart without painting.
    pub fn plan(
        dataset: &Dataset,
        options: &ChartOptions,
    ) -> Result<Vec<PlannedChart>, YearbookError> {
        if dataset.is_empty() {
            return Err(YearbookError::EmptyDataset { stage: "chart" });
        }
        let labels = &options.labels;
        let period = period(dataset);
        let (lw, lh) = options.line_size;
        let (hw, hh) = options.heatmap_size;
        let mut names = FileNames::default();
        let mut charts = Vec::new();

        for region in dataset.regions() {
            let title = format!("{} - {} ({})", labels.timeseries_title, region, period);
            let frame = Frame {
                title: &title,
                x_label: &labels.year_axis,
                y_label: &labels.count_axis,
                legend_title: &labels.category_legend,
            };
            let series = data::region_timeseries(dataset, &region);
            charts.push(PlannedChart {
                kind: ChartKind::TimeSeries,
                file_name: names.claim("timeseries", &region),
                scene: plot::line_chart(&frame, &series, lw, lh),
            });
        }

        let categories = dataset.categories();
        for category in &categories {
            let title = format!("{} - {} ({})", labels.comparison_title, category, period);
            let frame = Frame {
                title: &title,
                x_label: &labels.year_axis,
                y_label: &labels.count_axis,
                legend_title: &labels.region_legend,
            };
            let series = data::category_comparison(dataset, category);
            charts.push(PlannedChart {
                kind: ChartKind::Comparison,
                file_name: names.claim("comparison", category),
                scene: plot::line_chart(&frame, &series, lw, lh),
            });
        }

        for category in &categories {
            let title = format!("{} - {} ({})", labels.heatmap_title, category, period);
            let frame = Frame {
                title: &title,
                x_label: &labels.year_axis,
                y_label: &labels.region_legend,
                legend_title: &labels.heat_legend,
            };
            let grid = data::heat_grid(dataset, category);
            charts.push(PlannedChart {
                kind: ChartKind::Heatmap,
                file_name: names.claim("heatmap", category),
                scene: plot::heatmap(&frame, &grid, hw, hh),
            });
        }

        let title = format!("{} ({})", labels.trend_title, period);
        let frame = Frame {
            title: &title,
            x_label: &labels.year_axis,
            y_label: &labels.total_axis,
            legend_title: &labels.category_legend,
        };
        charts.push(PlannedChart {
            kind: ChartKind::Trend,
            file_name: "trend_overall.png".to_string(),
            scene: plot::line_chart(&frame, &data::overall_trend(dataset), lw, lh),
        });

        Ok(charts)
    }

    /// Render every chart into `out_dir` and return the PNG paths in
    /// rendering order.
    pub fn render_all(
        &self,
        dataset: &Dataset,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, YearbookError> {
        let charts = Self::plan(dataset, &self.options)?;
        std::fs::create_dir_all(out_dir).map_err(|source| YearbookError::OutputWriteFailed {
            path: out_dir.to_path_buf(),
            source,
        })?;

        let mut paths = Vec::with_capacity(charts.len());
        for chart in &charts {
            let path = out_dir.join(&chart.file_name);
            self.painter.render_png(&chart.scene, &path, self.options.width_px)?;
            info!("Chart saved: {}", path.display());
            paths.push(path);
        }
        Ok(paths)
    }
}

/// PNG names handed out so far. Labels that slug alike (`Acre` and `ACRE`)
/// get `_2`, `_3`… suffixes instead of overwriting each other.
#[derive(Default)]
struct FileNames {
    taken: HashSet<String>,
}

impl FileNames {
    fn claim(&mut self, prefix: &str, label: &str) -> String {
        let stem = format!("{prefix}_{}", slug(label));
        let mut name = format!("{stem}.png");
        let mut n = 2;
        while self.taken.contains(&name) {
            name = format!("{stem}_{n}.png");
            n += 1;
        }
        self.taken.insert(name.clone());
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Record;
    use crate::synthetic;

    #[test]
    fn empty_dataset_is_refused() {
        let err = ChartRenderer::plan(&Dataset::default(), &ChartOptions::default()).unwrap_err();
        assert!(matches!(err, YearbookError::EmptyDataset { stage: "chart" }));
    }

    #[test]
    fn plan_covers_the_whole_family() {
        let dataset = synthetic::generate(&[2020, 2021, 2022], 42);
        let charts = ChartRenderer::plan(&dataset, &ChartOptions::default()).unwrap();
        // 3 regions + 4 comparisons + 4 heatmaps + 1 trend
        assert_eq!(charts.len(), 12);
        let names: Vec<&str> = charts.iter().map(|c| c.file_name.as_str()).collect();
        assert!(names.contains(&"timeseries_amazonas.png"));
        assert!(names.contains(&"comparison_lesao_corporal.png"));
        assert!(names.contains(&"heatmap_violencia_domestica.png"));
        assert_eq!(names.last(), Some(&"trend_overall.png"));
    }

    #[test]
    fn labels_with_the_same_slug_get_distinct_files() {
        let dataset = Dataset::new(vec![
            Record::new(2020, "Acre", "Lesão Corporal", 3.0),
            Record::new(2020, "ACRE", "Lesao corporal", 5.0),
        ]);
        let charts = ChartRenderer::plan(&dataset, &ChartOptions::default()).unwrap();
        let names: Vec<&str> = charts.iter().map(|c| c.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "timeseries_acre.png",
                "timeseries_acre_2.png",
                "comparison_lesao_corporal.png",
                "comparison_lesao_corporal_2.png",
                "heatmap_lesao_corporal.png",
                "heatmap_lesao_corporal_2.png",
                "trend_overall.png",
            ]
        );
    }

    #[test]
    fn titles_carry_the_period() {
        let dataset = Dataset::new(vec![
            Record::new(2019, "Acre", "Estupro", 3.0),
            Record::new(2023, "Acre", "Estupro", 5.0),
        ]);
        let charts = ChartRenderer::plan(&dataset, &ChartOptions::default()).unwrap();
        let trend = charts.iter().find(|c| c.kind == ChartKind::Trend).unwrap();
        assert!(trend.scene.texts()[0].ends_with("(2019-2023)"));
    }

    #[test]
    fn kind_from_file_name() {
        assert_eq!(ChartKind::from_file_name("heatmap_estupro.png"), Some(ChartKind::Heatmap));
        assert_eq!(ChartKind::from_file_name("trend_overall.png"), Some(ChartKind::Trend));
        assert_eq!(ChartKind::from_file_name("logo.png"), None);
    }
}
