//! CLI binary for yearbook-tables.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, `ChartOptions` and `ReportMetadata` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use yearbook_tables::engine;
use yearbook_tables::synthetic::{self, DEFAULT_SEED, DEMO_YEARS};
use yearbook_tables::{
    consolidate, BatchProgressCallback, BatchSummary, ChartOptions, ChartRenderer, ConsolidationOutput, Dataset,
    Manifest, PageSelection, PdfiumLayoutSource, PipelineConfig, ProgressCallback, ReportAssembler,
    ReportContent, ReportMetadata, StrategyKind, YearStatus,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the manifest years plus a log
/// line per year.
struct CliProgressCallback {
    bar: ProgressBar,
    problems: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>2}/{len} years  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            problems: AtomicUsize::new(0),
        })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_years: usize) {
        self.bar.set_length(total_years as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Reading {total_years} yearbooks…"))
        ));
    }

    fn on_year_start(&self, year: i32, _index: usize, _total_years: usize) {
        self.bar.set_message(format!("{year}"));
    }

    fn on_year_complete(&self, year: i32, records: usize) {
        self.bar.println(format!(
            "  {} {}  {}",
            green("✓"),
            year,
            dim(&format!("{records:>4} records"))
        ));
        self.bar.inc(1);
    }

    fn on_year_skipped(&self, year: i32, reason: &str) {
        self.problems.fetch_add(1, Ordering::SeqCst);
        self.bar
            .println(format!("  {} {}  {}", yellow("–"), year, dim(reason)));
        self.bar.inc(1);
    }

    fn on_year_error(&self, year: i32, error: &str) {
        self.problems.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!("  {} {}  {}", red("✗"), year, red(&msg)));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_years: usize, total_records: usize) {
        self.bar.finish_and_clear();
        let problems = self.problems.load(Ordering::SeqCst);
        let mark = if problems == 0 {
            green("✔")
        } else if problems == total_years {
            red("✘")
        } else {
            cyan("⚠")
        };
        eprintln!(
            "{} {} records from {}/{} years",
            mark,
            bold(&total_records.to_string()),
            total_years.saturating_sub(problems),
            total_years
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Consolidate the yearbooks in ./dados (anuario_{year}.pdf)
  yearbook extract --data-dir dados --years 2017,2019,2020,2022-2024

  # Explicit files and a narrower region list
  yearbook extract --pdf 2020=anuario_2020.pdf --pdf 2022=fbsp_2022.pdf \
      --regions Amazonas,Acre -o norte.csv

  # Manifest file: {"2020": "anuario_2020.pdf", "2022": "anuario_2022.pdf"}
  yearbook extract --manifest anuarios.json --summary resumo.json

  # Synthetic demo dataset
  yearbook synth --years 2015-2025 --seed 42 -o dados_sinteticos.csv

  # Charts from an existing dataset
  yearbook charts dados_consolidados.csv --charts-dir graficos

  # Everything: extract, chart, report (synthetic data if nothing is found)
  yearbook run --data-dir dados --author "Maria Silva" --institution "IFPI"

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH       pdfium shared library (file or directory)
  YEARBOOK_REGIONS      Default for --regions
  YEARBOOK_CATEGORIES   Default for --categories
  YEARBOOK_PASSWORD     Default for --password
  RUST_LOG              Overrides --verbose / --quiet log filtering
"#;

/// Extract, consolidate, chart and report statistics tables from yearly PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "yearbook",
    version,
    about = "Extract statistics tables from yearly PDF publications into one dataset",
    long_about = "Read the tables of yearly PDF publications (public-security yearbooks), keep \
the target regions and indicators, and consolidate every year into one long-format CSV \
(year,region,category,value). The dataset can then be charted and assembled into a PDF report.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "YEARBOOK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "YEARBOOK_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract tables from yearbooks and write the consolidated CSV.
    Extract {
        #[command(flatten)]
        input: ManifestArgs,
        #[command(flatten)]
        filters: FilterArgs,
        /// Output CSV.
        #[arg(short, long, default_value = "dados_consolidados.csv")]
        out: PathBuf,
        /// Also write the per-year outcome summary as JSON.
        #[arg(long)]
        summary: Option<PathBuf>,
        /// Disable progress bar.
        #[arg(long)]
        no_progress: bool,
    },
    /// Generate a synthetic dataset with the same shape as an extracted one.
    Synth {
        /// Years: `2015-2025` or `2017,2019,2020`.
        #[arg(long, default_value = "2015-2025")]
        years: String,
        /// Random seed; the same seed and years give the same dataset.
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
        /// Output CSV.
        #[arg(short, long, default_value = "dados_sinteticos.csv")]
        out: PathBuf,
    },
    /// Render the chart family from a dataset CSV.
    Charts {
        /// Dataset CSV (year,region,category,value).
        csv: PathBuf,
        #[command(flatten)]
        charts: ChartArgs,
    },
    /// Extract, chart and assemble the report in one go.
    Run {
        #[command(flatten)]
        input: ManifestArgs,
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        charts: ChartArgs,
        #[command(flatten)]
        report: ReportArgs,
        /// Dataset CSV written before charting.
        #[arg(short, long, default_value = "dados_consolidados.csv")]
        out: PathBuf,
        /// Skip extraction and use the synthetic demo dataset.
        #[arg(long)]
        demo: bool,
        /// Seed for synthetic data (demo or fallback).
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
        /// Disable progress bar.
        #[arg(long)]
        no_progress: bool,
    },
}

#[derive(Args, Debug)]
struct ManifestArgs {
    /// One yearbook as YEAR=PATH; repeatable.
    #[arg(long = "pdf", value_name = "YEAR=PATH")]
    pdfs: Vec<String>,

    /// JSON manifest mapping years to paths.
    #[arg(long, conflicts_with = "pdfs")]
    manifest: Option<PathBuf>,

    /// Directory holding `anuario_{year}.pdf` files.
    #[arg(long, default_value = "dados")]
    data_dir: PathBuf,

    /// Years to look for in --data-dir.
    #[arg(long, default_value = "2017,2019,2020,2022,2023,2024")]
    years: String,
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Comma-separated target regions.
    #[arg(long, env = "YEARBOOK_REGIONS", value_delimiter = ',')]
    regions: Vec<String>,

    /// Comma-separated target categories (column headers).
    #[arg(long, env = "YEARBOOK_CATEGORIES", value_delimiter = ',')]
    categories: Vec<String>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "YEARBOOK_PAGES", default_value = "all")]
    pages: String,

    /// Strategy order, e.g. `stream,lattice` or `lattice`.
    #[arg(long, env = "YEARBOOK_STRATEGIES", value_delimiter = ',', default_value = "stream,lattice")]
    strategies: Vec<String>,

    /// PDF user password for encrypted yearbooks.
    #[arg(long, env = "YEARBOOK_PASSWORD")]
    password: Option<String>,
}

#[derive(Args, Debug)]
struct ChartArgs {
    /// Directory for chart PNGs.
    #[arg(long, default_value = "graficos")]
    charts_dir: PathBuf,

    /// PNG width in pixels.
    #[arg(long, default_value_t = 1800, value_parser = clap::value_parser!(u32).range(300..=6000))]
    chart_width: u32,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Output report PDF.
    #[arg(long, default_value = "relatorio.pdf")]
    report: PathBuf,

    #[arg(long, env = "YEARBOOK_TITLE")]
    title: Option<String>,

    #[arg(long, env = "YEARBOOK_SUBTITLE")]
    subtitle: Option<String>,

    #[arg(long, env = "YEARBOOK_AUTHOR")]
    author: Option<String>,

    #[arg(long, env = "YEARBOOK_INSTITUTION")]
    institution: Option<String>,

    #[arg(long, env = "YEARBOOK_PLACE")]
    place: Option<String>,

    /// Text file with the introduction.
    #[arg(long)]
    intro_file: Option<PathBuf>,

    /// Text file with the conclusion (a default is used otherwise).
    #[arg(long)]
    conclusion_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Extract {
            ref input,
            ref filters,
            ref out,
            ref summary,
            no_progress,
        } => {
            let manifest = build_manifest(input)?;
            let config = build_config(filters, progress(cli.quiet, no_progress))?;
            let pdfium = engine::bind_pdfium().context("Failed to bind pdfium")?;
            let output = consolidate(&manifest, &PdfiumLayoutSource::new(&pdfium), &config);

            output
                .dataset
                .write_csv(out)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            if let Some(path) = summary {
                write_summary(&output.summary, path)?;
            }
            if !cli.quiet {
                print_summary(&output);
                eprintln!("{} {}", green("→"), bold(&out.display().to_string()));
            }
        }

        Command::Synth {
            ref years,
            seed,
            ref out,
        } => {
            let years = parse_years(years)?;
            let dataset = synthetic::generate(&years, seed);
            dataset
                .write_csv(out)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            if !cli.quiet {
                eprintln!(
                    "{} {} synthetic records  →  {}",
                    green("✔"),
                    dataset.len(),
                    bold(&out.display().to_string())
                );
            }
        }

        Command::Charts { ref csv, ref charts } => {
            let dataset =
                Dataset::read_csv(csv).with_context(|| format!("Failed to read {}", csv.display()))?;
            let pdfium = engine::bind_pdfium().context("Failed to bind pdfium")?;
            let paths = render_charts(&pdfium, &dataset, charts)?;
            if !cli.quiet {
                eprintln!(
                    "{} {} charts  →  {}",
                    green("✔"),
                    paths.len(),
                    bold(&charts.charts_dir.display().to_string())
                );
            }
        }

        Command::Run {
            ref input,
            ref filters,
            ref charts,
            ref report,
            ref out,
            demo,
            seed,
            no_progress,
        } => {
            let pdfium = engine::bind_pdfium().context("Failed to bind pdfium")?;

            let dataset = if demo {
                synthetic::demo_dataset(seed)
            } else {
                let manifest = build_manifest(input)?;
                let config = build_config(filters, progress(cli.quiet, no_progress))?;
                let output = consolidate(&manifest, &PdfiumLayoutSource::new(&pdfium), &config);
                if !cli.quiet {
                    print_summary(&output);
                }
                if output.dataset.is_empty() {
                    let years = manifest.available_years();
                    warn!("No records extracted; falling back to synthetic data");
                    if !cli.quiet {
                        eprintln!(
                            "{} no records extracted, using synthetic data ({})",
                            yellow("⚠"),
                            fallback_years_label(&years)
                        );
                    }
                    synthetic::fallback_dataset(&years, seed)
                } else {
                    output.dataset
                }
            };

            dataset
                .write_csv(out)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            let images = render_charts(&pdfium, &dataset, charts)?;

            let metadata = build_metadata(report, &dataset);
            let content = build_content(report)?;
            let summary = ReportAssembler::new(&pdfium, metadata)
                .assemble(&images, &content, &report.report)
                .context("Report assembly failed")?;

            if !cli.quiet {
                eprintln!(
                    "{}  {} records  {} charts  {} pages  →  {}",
                    green("✔"),
                    dataset.len(),
                    images.len(),
                    summary.pages,
                    bold(&report.report.display().to_string())
                );
                for path in &summary.skipped {
                    eprintln!("   {} skipped {}", yellow("–"), dim(&path.display().to_string()));
                }
            }
        }
    }

    Ok(())
}

fn fallback_years_label(available: &[i32]) -> String {
    match (available.first(), available.last()) {
        (Some(first), Some(last)) if first == last => first.to_string(),
        (Some(first), Some(last)) => format!("{first}-{last}"),
        _ => format!("{}-{}", DEMO_YEARS.start(), DEMO_YEARS.end()),
    }
}

fn progress(quiet: bool, no_progress: bool) -> Option<ProgressCallback> {
    if quiet || no_progress {
        None
    } else {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    }
}

/// `--pdf` entries, else `--manifest`, else `--data-dir` + `--years`.
fn build_manifest(args: &ManifestArgs) -> Result<Manifest> {
    if !args.pdfs.is_empty() {
        return args
            .pdfs
            .iter()
            .map(|entry| Manifest::parse_entry(entry).context("Invalid --pdf entry"))
            .collect();
    }
    if let Some(ref path) = args.manifest {
        return Manifest::from_json(path).context("Failed to load manifest");
    }
    let years = parse_years(&args.years)?;
    Ok(Manifest::from_dir(&args.data_dir, &years))
}

/// Map CLI args to `PipelineConfig`.
fn build_config(args: &FilterArgs, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let pages: PageSelection = args.pages.parse().context("Invalid --pages")?;
    let strategies = args
        .strategies
        .iter()
        .map(|s| s.parse::<StrategyKind>())
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid --strategies")?;

    let mut builder = PipelineConfig::builder().pages(pages).strategies(strategies);
    if !args.regions.is_empty() {
        builder = builder.regions(args.regions.iter().cloned());
    }
    if !args.categories.is_empty() {
        builder = builder.categories(args.categories.iter().cloned());
    }
    if let Some(ref pwd) = args.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}

fn build_metadata(args: &ReportArgs, dataset: &Dataset) -> ReportMetadata {
    let mut meta = ReportMetadata::default();
    let years = dataset.years();
    if let (Some(first), Some(last)) = (years.first(), years.last()) {
        meta.period = if first == last {
            first.to_string()
        } else {
            format!("{first}-{last}")
        };
    }
    if let Some(ref t) = args.title {
        meta.title = t.clone();
    }
    if let Some(ref s) = args.subtitle {
        meta.subtitle = s.clone();
    }
    meta.author = args.author.clone();
    meta.institution = args.institution.clone();
    meta.place = args.place.clone();
    meta
}

fn build_content(args: &ReportArgs) -> Result<ReportContent> {
    let read = |path: &Option<PathBuf>| -> Result<Option<String>> {
        path.as_ref()
            .map(|p| std::fs::read_to_string(p).with_context(|| format!("Failed to read {}", p.display())))
            .transpose()
    };
    Ok(ReportContent {
        introduction: read(&args.intro_file)?,
        conclusion: read(&args.conclusion_file)?,
        ..ReportContent::default()
    })
}

fn render_charts(pdfium: &pdfium_render::prelude::Pdfium, dataset: &Dataset, args: &ChartArgs) -> Result<Vec<PathBuf>> {
    let options = ChartOptions {
        width_px: args.chart_width,
        ..ChartOptions::default()
    };
    ChartRenderer::new(pdfium, options)
        .render_all(dataset, &args.charts_dir)
        .context("Chart rendering failed")
}

/// Parse `2015-2025`, `2017,2019` or a mix such as `2017,2020-2022`.
fn parse_years(s: &str) -> Result<Vec<i32>> {
    let mut years = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if let Some((a, b)) = part.split_once('-') {
            let a: i32 = a.trim().parse().with_context(|| format!("Invalid year '{a}'"))?;
            let b: i32 = b.trim().parse().with_context(|| format!("Invalid year '{b}'"))?;
            if a > b {
                anyhow::bail!("Invalid year range '{part}': start must be <= end");
            }
            years.extend(a..=b);
        } else {
            years.push(part.parse().with_context(|| format!("Invalid year '{part}'"))?);
        }
    }
    if years.is_empty() {
        anyhow::bail!("No years given");
    }
    years.sort_unstable();
    years.dedup();
    Ok(years)
}

fn write_summary(summary: &BatchSummary, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialise summary")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

fn print_summary(output: &ConsolidationOutput) {
    let summary = &output.summary;
    for outcome in &summary.outcomes {
        let line = match &outcome.status {
            YearStatus::Extracted { records, tables } => {
                format!("{} {}  {records} records from {tables} tables", green("✓"), outcome.year)
            }
            YearStatus::Empty { tables } => format!(
                "{} {}  {}",
                yellow("–"),
                outcome.year,
                dim(&format!("{tables} tables, no target rows"))
            ),
            YearStatus::Missing => format!(
                "{} {}  {}",
                yellow("–"),
                outcome.year,
                dim(&format!("not found: {}", outcome.path.display()))
            ),
            YearStatus::Failed { error } => format!("{} {}  {}", red("✗"), outcome.year, red(&error.to_string())),
        };
        eprintln!("  {line}");
    }
    eprintln!(
        "{} years: {} extracted, {} empty, {} missing, {} failed  {}",
        bold(&summary.outcomes.len().to_string()),
        summary.extracted_years(),
        summary.empty_years(),
        summary.missing_years(),
        summary.failed_years(),
        dim(&format!("{}ms", summary.duration_ms)),
    );
    for (region, total) in output.dataset.totals_by_region() {
        eprintln!("   {:<20} {:>10.0}", region, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn years_accept_ranges_and_lists() {
        assert_eq!(parse_years("2022-2024").unwrap(), vec![2022, 2023, 2024]);
        assert_eq!(parse_years("2019, 2017,2020-2021").unwrap(), vec![2017, 2019, 2020, 2021]);
        assert!(parse_years("2024-2022").is_err());
        assert!(parse_years("").is_err());
        assert!(parse_years("abc").is_err());
    }

    #[test]
    fn fallback_label_names_the_covered_years() {
        assert_eq!(fallback_years_label(&[2019, 2020, 2022]), "2019-2022");
        assert_eq!(fallback_years_label(&[2023]), "2023");
        assert_eq!(fallback_years_label(&[]), "2015-2025");
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn pdf_entries_take_precedence() {
        let args = ManifestArgs {
            pdfs: vec!["2020=a.pdf".into(), "2019=b.pdf".into()],
            manifest: None,
            data_dir: PathBuf::from("dados"),
            years: "2017".into(),
        };
        let manifest = build_manifest(&args).unwrap();
        assert_eq!(manifest.years(), vec![2019, 2020]);
    }
}
