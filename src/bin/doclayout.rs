//! CLI binary for edgequake-layout.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ServiceConfig` / `OverlayConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use edgequake_layout::config::{
    DEFAULT_API_VERSION, DEFAULT_MODEL_ID, ENDPOINT_ENV, KEY_ENV, PDFIUM_LIB_ENV,
};
use edgequake_layout::model::to_json_pretty;
use edgequake_layout::pipeline::overlay::{color_for_label, Rgb, CATEGORY_STYLES};
use edgequake_layout::{
    analyze, analyze_to_file, analyze_to_report, default_output_path, verify_credentials,
    visualize, AnalysisProgressCallback, ElementCategory, LayoutError, OverlayConfig,
    ProgressCallback, ServiceConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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
fn swatch(color: Rgb) -> String {
    let [r, g, b] = color.to_u8();
    format!("\x1b[38;2;{r};{g};{b}m■\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner shown while the remote operation runs.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Instant,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style =
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Instant::now(),
        })
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_analysis_start(&self, source: &str) {
        self.bar.set_prefix("Analyzing");
        self.bar.set_message(format!("submitting {source}"));
    }

    fn on_operation_status(&self, attempt: u32, status: &str) {
        self.bar.set_message(format!("{status} {}", dim(&format!("(check {attempt})"))));
    }

    fn on_analysis_complete(&self, page_count: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages analyzed  {}",
            green("✔"),
            bold(&page_count.to_string()),
            dim(&format!("{:.1}s", self.started.elapsed().as_secs_f64()))
        );
    }

    fn on_analysis_error(&self, _error: &str) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyze a document and print the Analysis Document JSON
  doclayout analyze invoice.pdf

  # Analyze to a file (parent directories are created)
  doclayout analyze invoice.pdf -o out/invoice.json

  # Analyze a public URL; the service downloads it
  doclayout analyze https://example.com/form.pdf -o form.json

  # Write the legacy text report instead of JSON
  doclayout analyze invoice.pdf --format report -o invoice.txt

  # Draw the first page's layout onto a copy of the PDF
  doclayout visualize invoice.pdf out/invoice.json -o out/invoice_annotated.pdf

  # Verify endpoint and key
  doclayout check

  # Show the overlay colors, or the color for given category labels
  doclayout legend
  doclayout legend word cell

OVERLAY COLORS (back to front):
  paragraph  green     line  blue     word  red
  table      purple    cell  orange   selection mark  teal

ENVIRONMENT VARIABLES:
  AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT  Resource endpoint URL
  AZURE_DOCUMENT_INTELLIGENCE_KEY       Resource access key
  PDFIUM_LIB_PATH                       libpdfium file or directory (visualize)
  RUST_LOG                              Override log filter

  Variables may also come from a .env file in the working directory;
  variables already set in the environment take precedence.
"#;

/// Analyze document layout with Azure Document Intelligence and overlay it on PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "doclayout",
    version,
    about = "Analyze document layout and overlay the detected geometry on PDFs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCLAYOUT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCLAYOUT_QUIET")]
    quiet: bool,

    /// Disable the progress spinner.
    #[arg(long, global = true, env = "DOCLAYOUT_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a document and emit the Analysis Document.
    Analyze(AnalyzeArgs),
    /// Draw first-page layout polygons onto a copy of a PDF.
    ///
    /// Needs the pdfium library at run time. It is looked up at
    /// --pdfium-lib (or PDFIUM_LIB_PATH), then in the working directory,
    /// then on the system library path.
    Visualize(VisualizeArgs),
    /// Check that the endpoint and key are accepted by the service.
    Check(ServiceArgs),
    /// Print the overlay color of each element category.
    Legend(LegendArgs),
}

#[derive(Args, Debug)]
struct LegendArgs {
    /// Category labels to look up, e.g. `word` or `selection_mark`.
    /// Default: every category in drawing order.
    labels: Vec<String>,
}

#[derive(Args, Debug)]
struct ServiceArgs {
    /// Document Intelligence endpoint URL.
    #[arg(long, env = ENDPOINT_ENV)]
    endpoint: Option<String>,

    /// Document Intelligence access key.
    #[arg(long, env = KEY_ENV, hide_env_values = true)]
    key: Option<String>,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Local document path or HTTP/HTTPS URL.
    input: String,

    /// Write to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,

    #[command(flatten)]
    service: ServiceArgs,

    /// Analysis model ID.
    #[arg(long, default_value = DEFAULT_MODEL_ID)]
    model: String,

    /// REST API version.
    #[arg(long, default_value = DEFAULT_API_VERSION)]
    api_version: String,

    /// Delay between status checks when the service sends no Retry-After.
    #[arg(long, env = "DOCLAYOUT_POLL_INTERVAL_MS", default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Status checks before giving up.
    #[arg(long, env = "DOCLAYOUT_MAX_POLLS", default_value_t = 120)]
    max_polls: u32,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "DOCLAYOUT_TIMEOUT", default_value_t = 120)]
    timeout: u64,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Report,
}

#[derive(Args, Debug)]
struct VisualizeArgs {
    /// The original PDF.
    pdf: PathBuf,

    /// Analysis Document JSON or legacy text report.
    analysis: PathBuf,

    /// Annotated PDF path. Default: <pdf stem>_annotated.pdf next to the input.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// libpdfium file or the directory containing it.
    #[arg(long, env = PDFIUM_LIB_ENV)]
    pdfium_lib: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOCLAYOUT_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

/// Load variables from `path`, or from the nearest `.env` when `None`.
/// Variables already present in the process environment are kept.
fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(path) => dotenvy::from_path(path).ok().map(|()| path.to_path_buf()),
        None => dotenvy::dotenv().ok(),
    }
}

fn main() -> ExitCode {
    let env_file = load_env_file(None);
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives the feedback that matters; keep INFO logs out of its way.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if let Some(ref path) = env_file {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{} failed to start tokio runtime: {e}", red("error [internal]:"));
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&cli, show_progress)) {
        Ok(code) => code,
        Err(e) => {
            let stage = e
                .downcast_ref::<LayoutError>()
                .map(LayoutError::stage)
                .unwrap_or("cli");
            eprintln!("{} {e:#}", red(&format!("error [{stage}]:")));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, show_progress: bool) -> Result<ExitCode> {
    match &cli.command {
        Command::Analyze(args) => run_analyze(cli, args, show_progress).await,
        Command::Visualize(args) => run_visualize(cli, args).await,
        Command::Check(args) => run_check(cli, args).await,
        Command::Legend(args) => {
            for line in legend_lines(&args.labels) {
                println!("{line}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// One line per category (or per requested label): swatch, label, hex color.
fn legend_lines(labels: &[String]) -> Vec<String> {
    let line = |label: &str, color: Rgb, note: &str| {
        let [r, g, b] = color.to_u8();
        format!("{} {label:<15} #{r:02x}{g:02x}{b:02x}{note}", swatch(color))
    };

    if labels.is_empty() {
        return CATEGORY_STYLES
            .iter()
            .map(|style| line(style.category.label(), style.color, ""))
            .collect();
    }

    labels
        .iter()
        .map(|label| {
            let note = match ElementCategory::from_label(label) {
                Some(_) => "",
                None => "  (unknown category, drawn black)",
            };
            line(label, color_for_label(label), note)
        })
        .collect()
}

async fn run_analyze(cli: &Cli, args: &AnalyzeArgs, show_progress: bool) -> Result<ExitCode> {
    let spinner = show_progress.then(CliProgressCallback::new);
    let progress = spinner
        .clone()
        .map(|cb| cb as Arc<dyn AnalysisProgressCallback>);

    let result = analyze_and_emit(cli, args, progress).await;
    if let Some(ref spinner) = spinner {
        // Early failures (configuration, input) happen before any progress event.
        spinner.bar.finish_and_clear();
    }
    result
}

async fn analyze_and_emit(
    cli: &Cli,
    args: &AnalyzeArgs,
    progress: Option<ProgressCallback>,
) -> Result<ExitCode> {
    let config = build_service_config(args, progress)?;

    match (&args.output, args.format) {
        (Some(path), OutputFormat::Json) => {
            let analysis = analyze_to_file(&args.input, path, &config)
                .await
                .context("Analysis failed")?;
            print_summary(cli, analysis.pages.len(), analysis.word_count(), path);
        }
        (Some(path), OutputFormat::Report) => {
            let analysis = analyze_to_report(&args.input, path, &config)
                .await
                .context("Analysis failed")?;
            print_summary(cli, analysis.pages.len(), analysis.word_count(), path);
        }
        (None, format) => {
            let analysis = analyze(&args.input, &config)
                .await
                .context("Analysis failed")?;
            let text = match format {
                OutputFormat::Json => to_json_pretty(&analysis)?,
                OutputFormat::Report => edgequake_layout::report::write_report(&analysis),
            };
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
            if !text.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn run_visualize(cli: &Cli, args: &VisualizeArgs) -> Result<ExitCode> {
    let mut builder = OverlayConfig::builder();
    if let Some(ref lib) = args.pdfium_lib {
        builder = builder.pdfium_lib_path(lib);
    }
    if let Some(ref pw) = args.password {
        builder = builder.password(pw);
    }
    let config = builder.build();

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.pdf));

    let stats = visualize(&args.pdf, &args.analysis, &output, &config)
        .await
        .context("Visualization failed")?;

    if !cli.quiet {
        let mark = if stats.failures.is_empty() {
            green("✔")
        } else {
            cyan("⚠")
        };
        eprintln!(
            "{}  page {}  {} drawn  {} skipped  {} failed  →  {}",
            mark,
            stats.page_number,
            stats.drawn,
            dim(&stats.skipped.to_string()),
            if stats.failures.is_empty() {
                "0".to_string()
            } else {
                red(&stats.failures.len().to_string())
            },
            bold(&output.display().to_string()),
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_check(cli: &Cli, args: &ServiceArgs) -> Result<ExitCode> {
    let config = ServiceConfig {
        endpoint: args.endpoint.clone(),
        api_key: args.key.clone(),
        ..ServiceConfig::default()
    };
    let check = verify_credentials(&config).await;

    if check.ok {
        if !cli.quiet {
            eprintln!("{} {}", green("✔"), check.message);
        }
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("{} {}", red("✘"), check.message);
        Ok(ExitCode::FAILURE)
    }
}

/// Map CLI args to `ServiceConfig`.
fn build_service_config(
    args: &AnalyzeArgs,
    progress: Option<ProgressCallback>,
) -> Result<ServiceConfig> {
    let mut builder = ServiceConfig::builder()
        .model_id(&args.model)
        .api_version(&args.api_version)
        .poll_interval_ms(args.poll_interval_ms)
        .max_polls(args.max_polls)
        .request_timeout_secs(args.timeout);

    if let Some(ref endpoint) = args.service.endpoint {
        builder = builder.endpoint(endpoint);
    }
    if let Some(ref key) = args.service.key {
        builder = builder.api_key(key);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(cli: &Cli, pages: usize, words: usize, path: &std::path::Path) {
    if !cli.quiet {
        eprintln!(
            "   {} pages  {} words  →  {}",
            pages,
            dim(&words.to_string()),
            bold(&path.display().to_string()),
        );
    }
}
