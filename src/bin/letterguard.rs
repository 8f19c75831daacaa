//! CLI binary for letterguard.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `SanitiseConfig`, runs one operation and writes the result.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use letterguard::pipeline::input::read_pdf_file;
use letterguard::{
    GeometryScan, OverlayFormat, SanitiseConfig, SanitiseOutcome, Sanitiser, ScanProgress,
    ScanProgressCallback,
};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar over the per-page bounds scan. Dirty pages get their own
/// log line above the bar.
struct CliScanProgress {
    bar: ProgressBar,
}

impl CliScanProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Scanning");
        Arc::new(Self { bar })
    }
}

impl ScanProgressCallback for CliScanProgress {
    fn on_scan_start(&self, total_pages: usize) {
        self.bar.set_length(total_pages as u64);
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_page_scanned(&self, page_num: usize, total_pages: usize, clean: bool) {
        if !clean {
            self.bar.println(format!(
                "  {} Page {:>3}/{:<3}  {}",
                red("✗"),
                page_num,
                total_pages,
                dim("content outside the printable area"),
            ));
        }
        self.bar.inc(1);
    }

    fn on_scan_complete(&self, _total_pages: usize, _failing_pages: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Check, convert to CMYK and tag a letter for print
  letterguard sanitise letter.pdf -o letter.print.pdf

  # Layout check only, as JSON with base64 PNG previews
  letterguard validate --preview --json letter.pdf > report.json

  # Tint the areas that must stay blank
  letterguard overlay letter.pdf --format png --page 2 -o page2.png

  # Page sizes and rotations
  letterguard inspect letter.pdf

EXIT STATUS:
  0  success / letter accepted
  1  letter rejected by the layout check
  2  error (unreadable input, rendering failure, bad configuration)

ENVIRONMENT VARIABLES:
  LETTERGUARD_DPI               Rasterisation resolution (72–400)
  LETTERGUARD_PDFIUM_LIB_PATH   Directory or file of the pdfium library
  LETTERGUARD_GS_PATH           Ghostscript executable
  LETTERGUARD_LOGO_TABLE        JSON file of extra organisation logos
  RUST_LOG                      Overrides --verbose / --quiet
"#;

/// Validate and sanitise precompiled A4 letters.
#[derive(Parser, Debug)]
#[command(
    name = "letterguard",
    version,
    about = "Validate and sanitise precompiled A4 letters for print",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Rendering DPI (72–400).
    #[arg(long, global = true, env = "LETTERGUARD_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Only check page 1 for A4 portrait size.
    #[arg(long, global = true, env = "LETTERGUARD_FIRST_PAGE_ONLY")]
    first_page_only: bool,

    /// Timeout for the whole check in seconds.
    #[arg(long, global = true, env = "LETTERGUARD_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Timeout for the ghostscript CMYK conversion in seconds.
    #[arg(long, global = true, env = "LETTERGUARD_GS_TIMEOUT", default_value_t = 60)]
    gs_timeout: u64,

    /// Ghostscript executable.
    #[arg(long, global = true, env = "LETTERGUARD_GS_PATH", default_value = "gs")]
    gs_path: PathBuf,

    /// Directory or file of the pdfium shared library.
    #[arg(long, global = true, env = "LETTERGUARD_PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// JSON file of extra organisation logos.
    #[arg(long, global = true, env = "LETTERGUARD_LOGO_TABLE")]
    logo_table: Option<PathBuf>,

    /// Disable the progress bar.
    #[arg(long, global = true, env = "LETTERGUARD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "LETTERGUARD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "LETTERGUARD_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the layout, convert to CMYK and add the marker.
    Sanitise {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Stamp the marker on page 1 without any checks.
    AddTag {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Run the layout check and report the verdict.
    Validate {
        input: PathBuf,
        /// Render a PNG preview of every page.
        #[arg(long)]
        preview: bool,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Tint the areas that must stay blank.
    Overlay {
        input: PathBuf,
        /// Output type: pdf or png.
        #[arg(long, default_value = "pdf")]
        format: String,
        /// Page to render when the format is png (1-indexed).
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print page sizes, rotations and the A4 verdict.
    Inspect {
        input: PathBuf,
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
}

impl Command {
    fn shows_progress(&self) -> bool {
        match self {
            Command::Sanitise { .. } => true,
            Command::Validate { json, .. } => !json,
            Command::AddTag { .. } | Command::Overlay { .. } | Command::Inspect { .. } => false,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", red("error:"), e);
            ExitCode::from(2)
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && cli.command.shows_progress();
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

    let progress: Option<ScanProgress> = if show_progress {
        Some(CliScanProgress::new() as Arc<dyn ScanProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress)?;
    let sanitiser = Sanitiser::with_pdfium(config).context("Failed to start the PDF engine")?;

    match cli.command {
        Command::Sanitise { input, output } => {
            let pdf = read_input(&input)?;
            match sanitiser.sanitise_async(pdf).await.context("Sanitise failed")? {
                SanitiseOutcome::Sanitised {
                    pdf,
                    page_count,
                    recipient_address,
                } => {
                    write_output(&output, &pdf).await?;
                    if !cli.quiet {
                        eprintln!(
                            "{}  {} pages  →  {}",
                            green("✔"),
                            page_count,
                            bold(&output.display().to_string())
                        );
                        for line in recipient_address.lines() {
                            eprintln!("   {}", dim(line));
                        }
                    }
                    Ok(ExitCode::SUCCESS)
                }
                SanitiseOutcome::Rejected(rejection) => {
                    eprintln!("{}  {}", red("✘"), rejection);
                    Ok(ExitCode::from(1))
                }
            }
        }

        Command::AddTag { input, output } => {
            let pdf = read_input(&input)?;
            let tagged = sanitiser.add_tag_async(pdf).await.context("Tagging failed")?;
            write_output(&output, &tagged).await?;
            if !cli.quiet {
                eprintln!("{}  → {}", green("✔"), bold(&output.display().to_string()));
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Validate {
            input,
            preview,
            json,
        } => {
            let pdf = read_input(&input)?;
            let report = sanitiser
                .validate_async(pdf, preview)
                .await
                .context("Validation failed")?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("Failed to serialise report")?
                );
            } else {
                let mark = if report.result { green("✔") } else { red("✘") };
                let message = report.message.clone().unwrap_or_else(|| {
                    if report.result {
                        "Layout check passed".to_string()
                    } else {
                        "Layout check failed".to_string()
                    }
                });
                println!("{}  {}", mark, message);
                if let Some(pages) = &report.pages {
                    println!("   {}", dim(&format!("{} preview pages rendered", pages.len())));
                }
            }
            Ok(if report.result {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }

        Command::Overlay {
            input,
            format,
            page,
            output,
        } => {
            let format = OverlayFormat::from_file_type(&format, page)?;
            let pdf = read_input(&input)?;
            let bytes = sanitiser
                .overlay_async(pdf, format)
                .await
                .context("Overlay failed")?;
            write_output(&output, &bytes).await?;
            if !cli.quiet {
                eprintln!("{}  → {}", green("✔"), bold(&output.display().to_string()));
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Inspect { input, json } => {
            let pdf = read_input(&input)?;
            let pages = sanitiser
                .inspect_async(pdf)
                .await
                .context("Failed to inspect PDF")?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&pages).context("Failed to serialise pages")?
                );
            } else {
                println!("File:   {}", input.display());
                println!("Pages:  {}", pages.len());
                for page in &pages {
                    println!(
                        "  {:>3}  {:>6.1} × {:<6.1} mm  rot {:>3}°  {}",
                        page.page,
                        page.width_mm,
                        page.height_mm,
                        page.rotation,
                        if page.a4_portrait {
                            green("A4 portrait")
                        } else {
                            red("not A4 portrait")
                        }
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Map CLI args to `SanitiseConfig`.
fn build_config(cli: &Cli, progress: Option<ScanProgress>) -> Result<SanitiseConfig> {
    let scan = if cli.first_page_only {
        GeometryScan::FirstPageOnly
    } else {
        GeometryScan::AllPages
    };
    let mut builder = SanitiseConfig::builder()
        .dpi(cli.dpi)
        .geometry_scan(scan)
        .render_timeout_secs(cli.timeout)
        .colour_timeout_secs(cli.gs_timeout)
        .ghostscript_path(&cli.gs_path);
    if let Some(path) = &cli.pdfium_lib_path {
        builder = builder.pdfium_lib_path(path);
    }
    if let Some(path) = &cli.logo_table {
        builder = builder.logo_table_path(path);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    read_pdf_file(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Write via a temp file and rename so a failed run never leaves a partial
/// output behind.
async fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if path.as_os_str().is_empty() {
        bail!("Output path is empty");
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to move output to {}", path.display()))?;
    Ok(())
}
