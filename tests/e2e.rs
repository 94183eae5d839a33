//! End-to-end integration tests for yearbook-tables.
//!
//! These tests bind a real pdfium library: they paint small yearbook-like
//! PDFs, read their tables back, render the chart family and assemble the
//! report. They are gated behind the `E2E_ENABLED` environment variable so
//! they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=. cargo test --test e2e -- --nocapture

use pdfium_render::prelude::Pdfium;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use yearbook_tables::draw::{Align, Color, FontStyle, Scene};
use yearbook_tables::engine;
use yearbook_tables::pipeline::paint::Painter;
use yearbook_tables::synthetic;
use yearbook_tables::{
    consolidate, ChartOptions, ChartRenderer, Dataset, ExtractionError, LayoutSource, Manifest,
    PageSelection, PdfiumLayoutSource, PipelineConfig, Record, ReportAssembler, ReportContent,
    ReportMetadata, StrategyKind, YearStatus, YearbookError,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set and pdfium binds.
macro_rules! e2e_pdfium {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        match engine::bind_pdfium() {
            Ok(p) => p,
            Err(e) => {
                println!("SKIP: {e}");
                return;
            }
        }
    }};
}

/// Paint a yearbook page holding `rows` as a borderless table, optionally
/// ruled.
fn paint_yearbook(pdfium: &Pdfium, path: &Path, rows: &[[&str; 3]], ruled: bool) {
    let mut page = Scene::new(595.0, 842.0);
    page.text(60.0, 80.0, "Tabela 14", 12.0, FontStyle::Bold, Color::BLACK, Align::Left);
    let xs = [60.0, 220.0, 360.0];
    for (r, row) in rows.iter().enumerate() {
        let y = 140.0 + r as f32 * 24.0;
        for (text, x) in row.iter().zip(xs) {
            page.text(x + 4.0, y, *text, 10.0, FontStyle::Regular, Color::BLACK, Align::Left);
        }
    }
    if ruled {
        let top = 124.0;
        let bottom = top + rows.len() as f32 * 24.0;
        for r in 0..=rows.len() {
            let y = top + r as f32 * 24.0;
            page.line(60.0, y, 500.0, y, Color::BLACK, 0.8);
        }
        for x in [60.0, 220.0, 360.0, 500.0] {
            page.line(x, top, x, bottom, Color::BLACK, 0.8);
        }
    }
    Painter::new(pdfium).write_pdf(&[page], path).unwrap();
}

const ROWS: [[&str; 3]; 4] = [
    ["UF", "Feminicídio", "Estupro"],
    ["Amazonas", "10", "1.234"],
    ["Pará", "5", "7"],
    ["Roraima", "3", "4"],
];

fn expected_2022() -> Vec<Record> {
    vec![
        Record::new(2022, "Amazonas", "Feminicídio", 10.0),
        Record::new(2022, "Amazonas", "Estupro", 1234.0),
        Record::new(2022, "Roraima", "Feminicídio", 3.0),
        Record::new(2022, "Roraima", "Estupro", 4.0),
    ]
}

fn pngs(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "png"))
        .collect();
    files.sort();
    files
}

// ── Extraction ───────────────────────────────────────────────────────────────

#[test]
fn test_stream_table_round_trip() {
    let pdfium = e2e_pdfium!();
    let dir = TempDir::new().unwrap();
    let pdf = dir.path().join("anuario_2022.pdf");
    paint_yearbook(&pdfium, &pdf, &ROWS, false);

    let manifest: Manifest = [(2022, pdf)].into_iter().collect();
    let output = consolidate(&manifest, &PdfiumLayoutSource::new(&pdfium), &PipelineConfig::default());
    println!("{:#?}", output.summary);
    assert_eq!(output.dataset, Dataset::new(expected_2022()));
}

#[test]
fn test_lattice_table_round_trip() {
    let pdfium = e2e_pdfium!();
    let dir = TempDir::new().unwrap();
    let pdf = dir.path().join("anuario_2022.pdf");
    paint_yearbook(&pdfium, &pdf, &ROWS, true);

    let config = PipelineConfig::builder()
        .strategies(vec![StrategyKind::Lattice])
        .build()
        .unwrap();
    let manifest: Manifest = [(2022, pdf)].into_iter().collect();
    let output = consolidate(&manifest, &PdfiumLayoutSource::new(&pdfium), &config);
    assert_eq!(output.dataset, Dataset::new(expected_2022()));
}

#[test]
fn test_fault_isolation_with_real_files() {
    let pdfium = e2e_pdfium!();
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("anuario_2022.pdf");
    paint_yearbook(&pdfium, &good, &ROWS, false);
    let html = dir.path().join("anuario_2021.pdf");
    std::fs::write(&html, "<!DOCTYPE html><html></html>").unwrap();
    let truncated = dir.path().join("anuario_2023.pdf");
    std::fs::write(&truncated, "%PDF-1.7\n1 0 obj\n").unwrap();

    let mut manifest = Manifest::from_dir(dir.path(), &[2020, 2021, 2022, 2023]);
    manifest.insert(2021, html);

    let output = consolidate(&manifest, &PdfiumLayoutSource::new(&pdfium), &PipelineConfig::default());
    assert!(output.dataset.iter().all(|r| r.year == 2022));
    assert_eq!(output.dataset.len(), 4);

    let status: Vec<&YearStatus> = output.summary.outcomes.iter().map(|o| &o.status).collect();
    assert_eq!(status[0], &YearStatus::Missing);
    assert!(matches!(
        status[1],
        YearStatus::Failed {
            error: ExtractionError::NotAPdf { .. }
        }
    ));
    assert!(matches!(status[3], YearStatus::Failed { .. }));
}

// ── Charts and report ────────────────────────────────────────────────────────

#[test]
fn test_chart_family_and_report() {
    let pdfium = e2e_pdfium!();
    let dir = TempDir::new().unwrap();
    let charts_dir = dir.path().join("graficos");
    let dataset = synthetic::generate(&[2019, 2020, 2021, 2022], 7);

    let options = ChartOptions {
        width_px: 900,
        ..ChartOptions::default()
    };
    let images = ChartRenderer::new(&pdfium, options)
        .render_all(&dataset, &charts_dir)
        .unwrap();
    assert_eq!(images.len(), 12);
    assert_eq!(pngs(&charts_dir).len(), 12);
    let (w, _) = image::image_dimensions(&images[0]).unwrap();
    assert_eq!(w, 900);

    let report = dir.path().join("relatorio.pdf");
    let meta = ReportMetadata {
        period: "2019-2022".into(),
        author: Some("Equipe de Pesquisa".into()),
        ..ReportMetadata::default()
    };
    let summary = ReportAssembler::new(&pdfium, meta)
        .assemble(&images, &ReportContent::default(), &report)
        .unwrap();
    assert_eq!(summary.figures, 12);
    assert!(summary.skipped.is_empty());

    let document = pdfium.load_pdf_from_file(&report, None).unwrap();
    assert_eq!(document.pages().len() as usize, summary.pages);
    assert!(!report.with_extension("pdf.tmp").exists());
}

#[test]
fn test_charts_refuse_empty_dataset() {
    let pdfium = e2e_pdfium!();
    let dir = TempDir::new().unwrap();
    let result = ChartRenderer::new(&pdfium, ChartOptions::default()).render_all(&Dataset::default(), dir.path());
    assert!(result.is_err());
    assert!(pngs(dir.path()).is_empty());
}

#[test]
fn test_report_refuses_missing_charts() {
    let pdfium = e2e_pdfium!();
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("relatorio.pdf");
    let images = vec![dir.path().join("timeseries_acre.png")];
    let result = ReportAssembler::new(&pdfium, ReportMetadata::default()).assemble(
        &images,
        &ReportContent::default(),
        &report,
    );
    assert!(matches!(result, Err(YearbookError::EmptyDataset { stage: "report" })));
    assert!(!report.exists());
}

// ── Painting ─────────────────────────────────────────────────────────────────

#[test]
fn test_aligned_text_lands_on_its_anchor() {
    let pdfium = e2e_pdfium!();
    let dir = TempDir::new().unwrap();
    let pdf = dir.path().join("alinhamento.pdf");
    let mut page = Scene::new(595.0, 842.0);
    page.text(400.0, 100.0, "Violência Doméstica", 12.0, FontStyle::Bold, Color::BLACK, Align::Right);
    page.text(300.0, 200.0, "Lesão Corporal", 10.0, FontStyle::Regular, Color::BLACK, Align::Center);
    Painter::new(&pdfium).write_pdf(&[page], &pdf).unwrap();

    let layout = PdfiumLayoutSource::new(&pdfium)
        .load(&pdf, &PageSelection::All, None)
        .unwrap();
    let fragments = &layout.pages[0].fragments;
    let right = fragments.iter().find(|f| f.text.contains("Doméstica")).unwrap();
    assert!((right.bbox.x1 - 400.0).abs() < 2.0, "right edge {}", right.bbox.x1);
    let centered = fragments.iter().find(|f| f.text.contains("Corporal")).unwrap();
    assert!((centered.bbox.center_x() - 300.0).abs() < 2.0, "centre {}", centered.bbox.center_x());
}

#[test]
fn test_failed_pdf_write_leaves_no_temp_file() {
    let pdfium = e2e_pdfium!();
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("relatorio.pdf");
    std::fs::create_dir(&target).unwrap();
    std::fs::write(target.join("keep.txt"), "x").unwrap();

    let result = Painter::new(&pdfium).write_pdf(&[Scene::new(595.0, 842.0)], &target);
    assert!(matches!(result, Err(YearbookError::OutputWriteFailed { .. })));
    assert!(!target.with_extension("pdf.tmp").exists());
}
