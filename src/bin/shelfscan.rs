//! CLI binary for shelfscan.
//!
//! A thin shim over the library crate that maps CLI flags to `ScanConfig`
//! and prints the candidate batch.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use shelfscan::{
    scan, scan_to_file, Candidate, ScanConfig, ScanMode, SelectionSink, SharedSelectionSink,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
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

// ── CLI selection sink using indicatif ───────────────────────────────────────

/// Terminal sink: renders a live progress bar and per-spine log lines.
/// Spines resolve strictly in order, so the bar only ever moves forward.
struct CliSelectionSink {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliSelectionSink {
    /// Create a sink whose progress-bar length is set dynamically by
    /// `on_recognition_complete` (spine count is unknown until then).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_recognition_complete

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Uploading");
        bar.set_message("Sending photo to the recognizer…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once we know the spine count.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>2}/{len} spines  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Resolving");
    }
}

impl SelectionSink for CliSelectionSink {
    fn on_recognition_complete(&self, spines_total: usize) {
        self.activate_bar(spines_total);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Recognized {spines_total} spine(s)…"))
        ));
    }

    fn on_spine_start(&self, spine: usize, _total: usize) {
        self.bar.set_message(format!("spine {}", spine + 1));
    }

    fn on_spine_resolved(&self, spine: usize, total: usize, found: usize) {
        self.bar.println(format!(
            "  {} Spine {:>2}/{:<2}  {}",
            green("✓"),
            spine + 1,
            total,
            dim(&format!("{found} match(es)")),
        ));
        self.bar.inc(1);
    }

    fn on_spine_error(&self, spine: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            let mut s: String = error.chars().take(79).collect();
            s.push('\u{2026}');
            s
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Spine {:>2}/{:<2}  {}",
            red("✗"),
            spine + 1,
            total,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_selection_start(&self, candidates: &[Candidate], _is_shelf: bool) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} candidate(s) ready",
                green("✔"),
                bold(&candidates.len().to_string())
            );
        } else {
            eprintln!(
                "{} {} candidate(s) ready  ({} spine(s) failed)",
                cyan("⚠"),
                bold(&candidates.len().to_string()),
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Identify a single book from its cover
  shelfscan cover.jpg

  # Identify every book on a shelf photo
  shelfscan --mode shelf shelf.jpg

  # Write the candidate batch as JSON to a file
  shelfscan --mode shelf shelf.jpg -o candidates.json

  # Scan a photo straight from a URL
  shelfscan https://example.com/shelf.jpg --mode shelf

  # Keep more fuzzy matches per spine
  shelfscan --mode shelf --max-per-spine 5 shelf.jpg

  # Structured JSON on stdout
  shelfscan --json cover.jpg > batch.json

ENVIRONMENT VARIABLES:
  SHELFSCAN_GPU_HOST   Base URL of the recognition service
  SHELFSCAN_CPU_HOST   Base URL of the book-search service

SETUP:
  1. Point at your services:  export SHELFSCAN_GPU_HOST=https://gpu.example.com
                              export SHELFSCAN_CPU_HOST=https://api.example.com
  2. Scan:                    shelfscan --mode shelf shelf.jpg
"#;

/// Identify books from cover and shelf photos.
#[derive(Parser, Debug)]
#[command(
    name = "shelfscan",
    version,
    about = "Identify books from cover and shelf photos",
    long_about = "Upload a cover or shelf photo to a recognition service, resolve every \
title/author guess against a book-search service, and print the deduplicated candidate list.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local image file path or HTTP/HTTPS URL.
    input: String,

    /// Write the candidate batch as JSON to this file instead of stdout.
    #[arg(short, long, env = "SHELFSCAN_OUTPUT")]
    output: Option<PathBuf>,

    /// Recognition flow: cover (one book) or shelf (many spines).
    #[arg(long, env = "SHELFSCAN_MODE", value_enum, default_value = "cover")]
    mode: ModeArg,

    /// Base URL of the recognition service.
    #[arg(long, env = "SHELFSCAN_GPU_HOST")]
    gpu_host: Option<String>,

    /// Base URL of the book-search service.
    #[arg(long, env = "SHELFSCAN_CPU_HOST")]
    cpu_host: Option<String>,

    /// Search hits kept per shelf spine.
    #[arg(long, env = "SHELFSCAN_MAX_PER_SPINE", default_value_t = 3)]
    max_per_spine: usize,

    /// Longest edge of the uploaded image in pixels.
    #[arg(long, env = "SHELFSCAN_MAX_EDGE", default_value_t = 1600)]
    max_edge: u32,

    /// JPEG quality of the uploaded image (1-100).
    #[arg(long, env = "SHELFSCAN_JPEG_QUALITY", default_value_t = 40,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Recognition upload timeout in seconds.
    #[arg(long, env = "SHELFSCAN_UPLOAD_TIMEOUT", default_value_t = 60)]
    upload_timeout: u64,

    /// Per-search request timeout in seconds.
    #[arg(long, env = "SHELFSCAN_SEARCH_TIMEOUT", default_value_t = 30)]
    search_timeout: u64,

    /// HTTP download timeout for URL inputs in seconds.
    #[arg(long, env = "SHELFSCAN_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Output structured JSON (the full ScanOutput) instead of a table.
    #[arg(long, env = "SHELFSCAN_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "SHELFSCAN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SHELFSCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the candidate list.
    #[arg(short, long, env = "SHELFSCAN_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Cover,
    Shelf,
}

impl From<ModeArg> for ScanMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Cover => ScanMode::Cover,
            ModeArg::Shelf => ScanMode::Shelf,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Build config ─────────────────────────────────────────────────────
    // Keep a concrete handle so the bar can be cleared on the empty-batch
    // and error paths, where the handoff never fires.
    let cli_sink: Option<Arc<CliSelectionSink>> = if show_progress {
        Some(CliSelectionSink::new_dynamic())
    } else {
        None
    };
    let sink = cli_sink
        .clone()
        .map(|s| s as SharedSelectionSink);
    let config = build_config(&cli, sink)?;

    // ── Run scan ─────────────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let result = scan_to_file(&cli.input, output_path, &config).await;
        if let Some(ref s) = cli_sink {
            s.bar.finish_and_clear();
        }
        let stats = result.context("Scan failed")?;

        if !cli.quiet {
            eprintln!(
                "{}  {} candidate(s) from {} spine(s)  {}ms  →  {}",
                if stats.spines_failed == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                stats.candidates_found,
                stats.spines_total,
                stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
    } else {
        let result = scan(&cli.input, &config).await;
        if let Some(ref s) = cli_sink {
            s.bar.finish_and_clear();
        }
        let output = result.context("Scan failed")?;

        if cli.json {
            let json =
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            println!("{json}");
        } else if output.is_empty() {
            // One alert line, same wording the capture UI has always shown.
            eprintln!("{}", red("No books found. Please try again"));
        } else {
            print_candidates(&output.candidates)?;
            if !cli.quiet {
                let s = &output.stats;
                eprintln!(
                    "   {}",
                    dim(&format!(
                        "{} spine(s): {} searched, {} skipped, {} failed, {} duplicate(s) dropped — {}ms",
                        s.spines_total,
                        s.spines_searched,
                        s.spines_skipped,
                        s.spines_failed,
                        s.duplicates_dropped,
                        s.total_duration_ms
                    ))
                );
            }
        }
    }

    Ok(())
}

/// Print the numbered candidate table the user picks from.
fn print_candidates(candidates: &[Candidate]) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for (i, c) in candidates.iter().enumerate() {
        let author = if c.author.is_empty() {
            dim("unknown author")
        } else {
            c.author.clone()
        };
        writeln!(
            handle,
            "{:>3}. {}  {}  {}",
            i + 1,
            bold(&c.title),
            author,
            dim(&format!("ISBN {}", c.isbn)),
        )
        .context("Failed to write to stdout")?;
        if !c.publisher.is_empty() || !c.published_date.is_empty() {
            writeln!(
                handle,
                "     {}",
                dim(&format!("{} {}", c.publisher, c.published_date).trim().to_string()),
            )
            .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

/// Map CLI args to `ScanConfig`.
fn build_config(cli: &Cli, sink: Option<SharedSelectionSink>) -> Result<ScanConfig> {
    let mut builder = ScanConfig::builder()
        .mode(cli.mode.into())
        .max_per_spine(cli.max_per_spine)
        .max_edge(cli.max_edge)
        .jpeg_quality(cli.jpeg_quality)
        .upload_timeout_secs(cli.upload_timeout)
        .search_timeout_secs(cli.search_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref host) = cli.gpu_host {
        builder = builder.gpu_host(host);
    }
    if let Some(ref host) = cli.cpu_host {
        builder = builder.cpu_host(host);
    }
    if let Some(sink) = sink {
        builder = builder.selection_sink(sink);
    }

    builder.build().context("Invalid configuration")
}
