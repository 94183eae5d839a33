//! Report assembly: chart images + text → multi-page A4 PDF.
//!
//! ## Page structure
//!
//! ```text
//! title page   title, subtitle, period, rule, author, institution, place, date
//! 1.           Introdução (only when given)
//! 2.           Metodologia
//! 3.           Resultados e Análise, two figures per page
//! 4.           Conclusão (given or default)
//! 5.           Fontes e Referências
//! ```
//!
//! Every page but the first carries a running header with the report title;
//! every page carries a footer with the date and `Página n/N`.
//!
//! Layout is pure ([`layout_report`]) and produces [`Scene`]s; only
//! [`ReportAssembler::assemble`] touches pdfium.

use crate::chart::ChartKind;
use crate::draw::{wrap_text, Align, Color, FontStyle, Scene};
use crate::error::YearbookError;
use crate::pipeline::paint::Painter;
use chrono::{Datelike, Local, NaiveDate};
use pdfium_render::prelude::Pdfium;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ── Page geometry (points) ───────────────────────────────────────────────

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 57.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const BODY_TOP: f32 = 90.0;
const BODY_BOTTOM: f32 = PAGE_HEIGHT - 70.0;
const FIGURE_MAX_HEIGHT: f32 = 255.0;

const BODY_SIZE: f32 = 11.0;
const BODY_LEADING: f32 = 15.0;

const TITLE_COLOR: Color = Color::rgb(30, 30, 80);
const MUTED: Color = Color::rgb(100, 100, 100);
const RULE: Color = Color::rgb(200, 200, 200);

const MONTHS_PT: [&str; 12] = [
    "Janeiro", "Fevereiro", "Março", "Abril", "Maio", "Junho", "Julho", "Agosto", "Setembro",
    "Outubro", "Novembro", "Dezembro",
];

/// Title-page and header information.
#[derive(Debug, Clone)]
pub struct ReportMetadata {
    pub title: String,
    pub subtitle: String,
    pub period: String,
    pub author: Option<String>,
    pub institution: Option<String>,
    pub place: Option<String>,
    pub date: NaiveDate,
}

impl Default for ReportMetadata {
    fn default() -> Self {
        Self {
            title: "Análise de Violência contra Mulheres".into(),
            subtitle: "Região Norte - Amazonas, Roraima e Acre".into(),
            period: "2015-2025".into(),
            author: None,
            institution: None,
            place: None,
            date: Local::now().date_naive(),
        }
    }
}

impl ReportMetadata {
    /// `Outubro de 2026`
    pub fn long_date(&self) -> String {
        format!("{} de {}", MONTHS_PT[self.date.month0() as usize], self.date.year())
    }

    /// `16/10/2026`
    pub fn short_date(&self) -> String {
        self.date.format("%d/%m/%Y").to_string()
    }
}

/// Prose sections of the report.
#[derive(Debug, Clone)]
pub struct ReportContent {
    pub introduction: Option<String>,
    /// Default text is built from the metadata period when `None`.
    pub methodology: Option<String>,
    pub conclusion: Option<String>,
    pub sources: String,
    pub references: Vec<String>,
    /// Caption overrides keyed by image path.
    pub captions: HashMap<PathBuf, String>,
}

impl Default for ReportContent {
    fn default() -> Self {
        Self {
            introduction: None,
            methodology: None,
            conclusion: None,
            sources: DEFAULT_SOURCES.to_string(),
            references: [2024, 2023, 2022, 2020, 2019, 2017]
                .into_iter()
                .map(yearbook_reference)
                .collect(),
            captions: HashMap::new(),
        }
    }
}

const DEFAULT_CONCLUSION: &str = "A análise dos dados de violência contra mulheres na região Norte do Brasil, \
especificamente nos estados do Amazonas, Roraima e Acre, revela a necessidade urgente de políticas \
públicas efetivas de prevenção e combate à violência de gênero.\n\
Os gráficos apresentados evidenciam padrões e tendências que devem ser considerados na formulação de \
estratégias de enfrentamento à violência contra a mulher, levando em conta as particularidades \
regionais e os desafios específicos de cada estado.";

const DEFAULT_SOURCES: &str = "Os dados analisados neste relatório foram extraídos das tabelas dos \
Anuários Brasileiros de Segurança Pública, publicados pelo Fórum Brasileiro de Segurança Pública \
(FBSP), e consolidados em uma série histórica por ano, estado e tipo de ocorrência.";

fn default_methodology(period: &str) -> String {
    format!(
        "Este relatório apresenta uma análise quantitativa dos índices de violência contra mulheres \
nos estados do Amazonas, Roraima e Acre, no período {period}. Os dados foram extraídos das tabelas \
dos Anuários Brasileiros de Segurança Pública publicados pelo Fórum Brasileiro de Segurança Pública.\n\
A análise contempla diferentes tipos de violência, incluindo feminicídio, estupro, lesão corporal e \
violência doméstica. Os dados foram consolidados em séries temporais para permitir a identificação \
de tendências e padrões ao longo do tempo."
    )
}

/// ABNT-style reference for one yearbook edition.
pub fn yearbook_reference(year: i32) -> String {
    format!(
        "FÓRUM BRASILEIRO DE SEGURANÇA PÚBLICA. Anuário Brasileiro de Segurança Pública {year}. \
São Paulo: FBSP, {year}. Disponível em: https://forumseguranca.org.br/."
    )
}

/// Section heading for a figure, from its file-name kind.
fn figure_heading(number: usize, path: &Path) -> Option<String> {
    let name = path.file_stem()?.to_string_lossy().into_owned();
    let kind = ChartKind::from_file_name(&name)?;
    let title = match kind {
        ChartKind::TimeSeries => {
            let region = name.trim_start_matches("timeseries_").replace('_', " ");
            format!("Análise Temporal - {}", title_case(&region))
        }
        ChartKind::Comparison => "Análise Comparativa entre Estados".to_string(),
        ChartKind::Heatmap => "Mapa de Intensidade".to_string(),
        ChartKind::Trend => "Tendência Geral da Região".to_string(),
    };
    Some(format!("3.{number}. {title}"))
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

// ── Flow layout ──────────────────────────────────────────────────────────

/// Top-to-bottom text flow over a growing list of pages.
struct Flow {
    pages: Vec<Scene>,
    y: f32,
}

impl Flow {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            y: BODY_TOP,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(Scene::new(PAGE_WIDTH, PAGE_HEIGHT));
        self.y = BODY_TOP;
    }

    fn page(&mut self) -> &mut Scene {
        if self.pages.is_empty() {
            self.new_page();
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Start a new page unless `space` points fit below the cursor.
    fn ensure(&mut self, space: f32) {
        if self.pages.is_empty() || self.y + space > BODY_BOTTOM {
            self.new_page();
        }
    }

    fn chapter(&mut self, title: &str) {
        self.ensure(60.0);
        self.y += 22.0;
        let y = self.y;
        let page = self.page();
        page.text(MARGIN, y, title, 16.0, FontStyle::Bold, TITLE_COLOR, Align::Left);
        page.line(MARGIN, y + 7.0, MARGIN + 227.0, y + 7.0, TITLE_COLOR, 1.4);
        self.y += 30.0;
    }

    fn section(&mut self, title: &str) {
        self.ensure(40.0);
        self.y += 14.0;
        let y = self.y;
        self.page()
            .text(MARGIN, y, title, 13.0, FontStyle::Bold, Color::DARK_GREY, Align::Left);
        self.y += 12.0;
    }

    fn paragraph(&mut self, text: &str, size: f32) {
        let leading = size * BODY_LEADING / BODY_SIZE;
        for line in wrap_text(text, size, FontStyle::Regular, CONTENT_WIDTH) {
            self.ensure(leading);
            self.y += leading;
            if line.is_empty() {
                continue;
            }
            let y = self.y;
            self.page()
                .text(MARGIN, y, line, size, FontStyle::Regular, Color::BLACK, Align::Left);
        }
        self.y += leading * 0.6;
    }

    fn figure(&mut self, path: &Path, aspect: f32, caption: &str) {
        let mut w = CONTENT_WIDTH;
        let mut h = w / aspect;
        if h > FIGURE_MAX_HEIGHT {
            h = FIGURE_MAX_HEIGHT;
            w = h * aspect;
        }
        let caption_lines = wrap_text(caption, 9.0, FontStyle::Italic, CONTENT_WIDTH);
        self.ensure(h + 8.0 + caption_lines.len() as f32 * 12.0);

        let x = (PAGE_WIDTH - w) / 2.0;
        let y = self.y + 4.0;
        self.page().image(path, x, y, w, h);
        self.y = y + h + 6.0;
        for line in caption_lines {
            self.y += 12.0;
            let y = self.y;
            self.page()
                .text(PAGE_WIDTH / 2.0, y, line, 9.0, FontStyle::Italic, Color::GREY, Align::Center);
        }
        self.y += 10.0;
    }
}

fn title_page(meta: &ReportMetadata) -> Scene {
    let mut page = Scene::new(PAGE_WIDTH, PAGE_HEIGHT);
    let center = PAGE_WIDTH / 2.0;
    let mut y = 190.0;

    for line in wrap_text(&meta.title, 24.0, FontStyle::Bold, CONTENT_WIDTH) {
        page.text(center, y, line, 24.0, FontStyle::Bold, TITLE_COLOR, Align::Center);
        y += 32.0;
    }
    y += 8.0;
    for line in wrap_text(&meta.subtitle, 16.0, FontStyle::Regular, CONTENT_WIDTH) {
        page.text(center, y, line, 16.0, FontStyle::Regular, Color::rgb(80, 80, 80), Align::Center);
        y += 24.0;
    }
    y += 6.0;
    page.text(
        center,
        y,
        format!("Período: {}", meta.period),
        14.0,
        FontStyle::Italic,
        MUTED,
        Align::Center,
    );
    y += 30.0;
    page.line(center - 85.0, y, center + 85.0, y, TITLE_COLOR, 1.4);

    if meta.author.is_some() || meta.institution.is_some() {
        y += 110.0;
        if let Some(author) = &meta.author {
            page.text(center, y, format!("Autor: {author}"), 12.0, FontStyle::Regular, Color::BLACK, Align::Center);
            y += 26.0;
        }
        if let Some(institution) = &meta.institution {
            page.text(
                center,
                y,
                format!("Instituição: {institution}"),
                12.0,
                FontStyle::Regular,
                Color::BLACK,
                Align::Center,
            );
            y += 26.0;
        }
    }

    y += 56.0;
    if let Some(place) = &meta.place {
        page.text(center, y, place.as_str(), 11.0, FontStyle::Italic, MUTED, Align::Center);
        y += 26.0;
    }
    page.text(center, y, meta.long_date(), 11.0, FontStyle::Italic, MUTED, Align::Center);
    page
}

/// Running header (pages after the first) and footer (every page).
fn decorate(pages: &mut [Scene], meta: &ReportMetadata) {
    let total = pages.len();
    let date = meta.short_date();
    let right = PAGE_WIDTH - MARGIN;
    for (i, page) in pages.iter_mut().enumerate() {
        if i > 0 {
            page.text(PAGE_WIDTH / 2.0, 40.0, meta.title.as_str(), 9.0, FontStyle::Italic, MUTED, Align::Center);
            page.line(MARGIN, 50.0, right, 50.0, RULE, 0.6);
        }
        let fy = PAGE_HEIGHT - 42.0;
        page.line(MARGIN, fy - 12.0, right, fy - 12.0, RULE, 0.6);
        page.text(MARGIN, fy, date.as_str(), 8.0, FontStyle::Italic, MUTED, Align::Left);
        page.text(right, fy, format!("Página {}/{}", i + 1, total), 8.0, FontStyle::Italic, MUTED, Align::Right);
    }
}

/// Laid-out report pages plus what was placed.
#[derive(Debug, Clone)]
pub struct ReportLayout {
    pub pages: Vec<Scene>,
    pub figures: usize,
    pub skipped: Vec<PathBuf>,
}

impl ReportLayout {
    /// Refuse a layout with no placed figure: a results chapter without
    /// charts is not a report.
    pub fn require_figures(self) -> Result<Self, YearbookError> {
        if self.figures == 0 {
            warn!("No readable chart among {} images", self.skipped.len());
            return Err(YearbookError::EmptyDataset { stage: "report" });
        }
        Ok(self)
    }
}

/// Lay out the whole report. Images that cannot be read are skipped with a
/// warning.
pub fn layout_report(images: &[PathBuf], content: &ReportContent, meta: &ReportMetadata) -> ReportLayout {
    let mut flow = Flow::new();
    flow.pages.push(title_page(meta));

    if let Some(intro) = content.introduction.as_deref().filter(|s| !s.trim().is_empty()) {
        flow.new_page();
        flow.chapter("1. Introdução");
        flow.paragraph(intro, BODY_SIZE);
    }

    flow.new_page();
    flow.chapter("2. Metodologia");
    let methodology = content
        .methodology
        .clone()
        .unwrap_or_else(|| default_methodology(&meta.period));
    flow.paragraph(&methodology, BODY_SIZE);

    flow.new_page();
    flow.chapter("3. Resultados e Análise");

    let placeable: Vec<(&PathBuf, f32)> = images
        .iter()
        .filter_map(|path| match image::image_dimensions(path) {
            Ok((w, h)) if w > 0 && h > 0 => Some((path, w as f32 / h as f32)),
            Ok(_) => {
                warn!("Skipping empty image {}", path.display());
                None
            }
            Err(e) => {
                warn!("Skipping image {}: {}", path.display(), e);
                None
            }
        })
        .collect();
    let skipped: Vec<PathBuf> = images
        .iter()
        .filter(|p| !placeable.iter().any(|(q, _)| q == p))
        .cloned()
        .collect();

    for (i, (path, aspect)) in placeable.iter().enumerate() {
        let number = i + 1;
        if let Some(heading) = figure_heading(number, path) {
            flow.section(&heading);
        }
        let caption = content.captions.get(*path).cloned().unwrap_or_else(|| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            format!("Figura {number}: {name}")
        });
        flow.figure(path, *aspect, &caption);
        if number % 2 == 0 && number < placeable.len() {
            flow.new_page();
        }
    }

    flow.new_page();
    flow.chapter("4. Conclusão");
    let conclusion = content
        .conclusion
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_CONCLUSION);
    flow.paragraph(conclusion, BODY_SIZE);

    flow.new_page();
    flow.chapter("5. Fontes e Referências");
    flow.section("5.1. Origem dos Dados");
    flow.paragraph(&content.sources, BODY_SIZE);
    if !content.references.is_empty() {
        flow.section("5.2. Referências Bibliográficas");
        for reference in &content.references {
            flow.paragraph(reference, 10.0);
        }
    }

    let mut pages = flow.pages;
    decorate(&mut pages, meta);
    ReportLayout {
        pages,
        figures: placeable.len(),
        skipped,
    }
}

/// What [`ReportAssembler::assemble`] wrote.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub path: PathBuf,
    pub pages: usize,
    pub figures: usize,
    pub skipped: Vec<PathBuf>,
}

/// Paints a laid-out report through pdfium.
pub struct ReportAssembler<'a> {
    painter: Painter<'a>,
    metadata: ReportMetadata,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(pdfium: &'a Pdfium, metadata: ReportMetadata) -> Self {
        Self {
            painter: Painter::new(pdfium),
            metadata,
        }
    }

    /// Lay out and write the report to `output`.
    ///
    /// # Errors
    /// [`YearbookError::EmptyDataset`] when none of `images` can be placed;
    /// nothing is written in that case.
    pub fn assemble(
        &self,
        images: &[PathBuf],
        content: &ReportContent,
        output: &Path,
    ) -> Result<ReportSummary, YearbookError> {
        let layout = layout_report(images, content, &self.metadata).require_figures()?;
        self.painter.write_pdf(&layout.pages, output)?;
        info!(
            "Report written: {} ({} pages, {} figures)",
            output.display(),
            layout.pages.len(),
            layout.figures
        );
        Ok(ReportSummary {
            path: output.to_path_buf(),
            pages: layout.pages.len(),
            figures: layout.figures,
            skipped: layout.skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::{text_width, DrawOp};

    fn widest_text(scene: &Scene) -> f32 {
        scene
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, size, style, .. } => Some(text_width(text, *size, *style)),
                _ => None,
            })
            .fold(0.0, f32::max)
    }

    fn meta() -> ReportMetadata {
        ReportMetadata {
            title: "Relatório".into(),
            date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            ..ReportMetadata::default()
        }
    }

    fn charts(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|n| {
                let path = dir.join(n);
                image::RgbImage::new(72, 42).save(&path).unwrap();
                path
            })
            .collect()
    }

    fn image_count(scene: &Scene) -> usize {
        scene.ops.iter().filter(|op| matches!(op, DrawOp::Image { .. })).count()
    }

    #[test]
    fn two_figures_per_results_page() {
        let dir = tempfile::tempdir().unwrap();
        let images = charts(
            dir.path(),
            &["timeseries_acre.png", "comparison_estupro.png", "heatmap_estupro.png", "trend_overall.png", "extra.png"],
        );
        let layout = layout_report(&images, &ReportContent::default(), &meta());
        let per_page: Vec<usize> = layout.pages.iter().map(image_count).filter(|&n| n > 0).collect();
        assert_eq!(per_page, vec![2, 2, 1]);
        assert_eq!(layout.figures, 5);
        assert!(layout.skipped.is_empty());
    }

    #[test]
    fn missing_image_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut images = charts(dir.path(), &["heatmap_estupro.png"]);
        images.insert(0, dir.path().join("gone.png"));
        let layout = layout_report(&images, &ReportContent::default(), &meta());
        assert_eq!(layout.figures, 1);
        assert_eq!(layout.skipped, vec![dir.path().join("gone.png")]);
        let texts: Vec<&str> = layout.pages.iter().flat_map(|p| p.texts()).collect();
        assert!(texts.contains(&"3.1. Mapa de Intensidade"));
        assert!(texts.contains(&"Figura 1: heatmap_estupro.png"));
    }

    #[test]
    fn layout_without_figures_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let unreadable = vec![dir.path().join("timeseries_acre.png")];
        let layout = layout_report(&unreadable, &ReportContent::default(), &meta());
        assert!(matches!(
            layout.require_figures(),
            Err(YearbookError::EmptyDataset { stage: "report" })
        ));

        let images = charts(dir.path(), &["trend_overall.png"]);
        let layout = layout_report(&images, &ReportContent::default(), &meta());
        assert_eq!(layout.require_figures().unwrap().figures, 1);
    }

    #[test]
    fn header_and_footer_numbering() {
        let layout = layout_report(&[], &ReportContent::default(), &meta());
        let total = layout.pages.len();
        // title, methodology, results, conclusion, sources
        assert_eq!(total, 5);
        for (i, page) in layout.pages.iter().enumerate() {
            let texts = page.texts();
            assert!(texts.contains(&format!("Página {}/{}", i + 1, total).as_str()));
            assert!(texts.contains(&"16/10/2026"));
            let title_count = texts.iter().filter(|t| **t == "Relatório").count();
            assert_eq!(title_count, 1, "page {}", i + 1);
        }
        assert!(layout.pages[0].texts().contains(&"Outubro de 2026"));
    }

    #[test]
    fn introduction_only_when_given() {
        let without = layout_report(&[], &ReportContent::default(), &meta());
        let has_intro = |l: &ReportLayout| l.pages.iter().any(|p| p.texts().contains(&"1. Introdução"));
        assert!(!has_intro(&without));

        let content = ReportContent {
            introduction: Some("Texto de introdução.".into()),
            conclusion: Some("Fim.".into()),
            ..ReportContent::default()
        };
        let with = layout_report(&[], &content, &meta());
        assert!(has_intro(&with));
        assert_eq!(with.pages.len(), 6);
        assert!(with.pages.iter().any(|p| p.texts().contains(&"Fim.")));
    }

    #[test]
    fn caption_override_and_heading() {
        let dir = tempfile::tempdir().unwrap();
        let images = charts(dir.path(), &["timeseries_amazonas.png"]);
        let mut content = ReportContent::default();
        content.captions.insert(images[0].clone(), "Série do Amazonas".into());
        let layout = layout_report(&images, &content, &meta());
        let texts: Vec<&str> = layout.pages.iter().flat_map(|p| p.texts()).collect();
        assert!(texts.contains(&"3.1. Análise Temporal - Amazonas"));
        assert!(texts.contains(&"Série do Amazonas"));
    }

    #[test]
    fn body_text_stays_within_margins() {
        let content = ReportContent {
            introduction: Some("palavra ".repeat(600)),
            ..ReportContent::default()
        };
        let layout = layout_report(&[], &content, &meta());
        for page in &layout.pages[1..] {
            assert!(widest_text(page) <= CONTENT_WIDTH + 1.0);
        }
        for page in &layout.pages {
            for op in &page.ops {
                if let DrawOp::Text { y, .. } = op {
                    assert!(*y <= PAGE_HEIGHT - 30.0);
                }
            }
        }
    }
}
