//! Binary entry point for the stubfix CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Generate stubs into the default directory and print the diff
//! stubfix
//!
//! # Generate into a chosen directory with a custom configuration
//! stubfix --into build/stubs --config stubfix.toml
//!
//! # Re-run the post-processing on existing stubs without writing them
//! stubfix --into build/stubs --skip-generate --dry-run --format json
//! ```

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use stubfix::config::Config;
use stubfix::error::StubfixError;
use stubfix::output::{emit_response, ErrorResponse, PostprocessReport};
use stubfix::{run, RunOptions};

// ============================================================================
// CLI Structure
// ============================================================================

/// Generate Python type stubs for the f3d binding and post-process them.
///
/// Runs pybind11-stubgen, rewrites the type annotations of every stub it
/// changed and prints a unified diff of the post-processing.
#[derive(Parser, Debug)]
#[command(name = "stubfix", version)]
struct Cli {
    /// Output directory for the post-processed stubs (default: <temp dir>/stubs).
    #[arg(short = 'o', long = "into")]
    into: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Python interpreter running the generator.
    #[arg(long)]
    python: Option<PathBuf>,

    /// Do not run the generator; process every stub matching the glob.
    #[arg(long)]
    skip_generate: bool,

    /// Report the diff without writing files.
    #[arg(long)]
    dry_run: bool,

    /// Report format.
    #[arg(long, value_enum, default_value = "diff")]
    format: ReportFormat,

    /// Log level for tracing output.
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Report format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    /// Unified diff lines (default).
    #[default]
    Diff,
    /// Full JSON response.
    Json,
    /// Brief text summary.
    Summary,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.log_level);

    let format = cli.format;
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err, format);
            ExitCode::from(err.exit_code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run_options(cli: &Cli) -> Result<RunOptions, StubfixError> {
    let config = Config::load_or_default(cli.config.as_deref())?;
    let output_dir = cli
        .into
        .clone()
        .unwrap_or_else(|| env::temp_dir().join("stubs"));
    Ok(RunOptions {
        output_dir,
        config,
        python: cli.python.clone(),
        skip_generate: cli.skip_generate,
        dry_run: cli.dry_run,
    })
}

/// Execute the run and print its report.
fn execute(cli: Cli) -> Result<(), StubfixError> {
    let options = run_options(&cli)?;
    let report = run(&options)?;
    print_report(&report, cli.format).map_err(|e| StubfixError::internal(e.to_string()))
}

fn print_report(report: &PostprocessReport, format: ReportFormat) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    match format {
        ReportFormat::Diff => {
            if !report.diff.is_empty() {
                writeln!(stdout, "{}", report.diff.join("\n"))?;
            }
        }
        ReportFormat::Json => emit_response(report, &mut stdout)?,
        ReportFormat::Summary => writeln!(stdout, "{}", report.summary())?,
    }
    stdout.flush()
}

/// Print an error: JSON on stdout in `json` mode, text on stderr otherwise.
fn report_error(err: &StubfixError, format: ReportFormat) {
    if format == ReportFormat::Json {
        let response = ErrorResponse::from_error(err);
        let _ = emit_response(&response, &mut io::stdout());
        let _ = io::stdout().flush();
        return;
    }
    match err {
        StubfixError::Syntax { rendered, .. } if !rendered.is_empty() => {
            eprintln!("{}", rendered);
        }
        _ => eprintln!("error: {}", err),
    }
}

// ============================================================================
// Tests
// ============================================================================
