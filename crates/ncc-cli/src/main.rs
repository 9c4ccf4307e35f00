//! ncc command-line interface.
//!
//! Loads a registry spec, compiles it, builds the verification tables,
//! runs the WFC and CC checks, and renders the report. Exits 0 only
//! when convergence is guaranteed; any parse, compile, or evaluation
//! error and any WFC/CC failure exits 1.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ncc_check::{compile, load_file, verify, CheckOptions, Report, DEFAULT_MAX_STATES};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Output format for verification results
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output (default)
    #[default]
    Human,
    /// Structured JSON output for automation
    Json,
}

/// Log output format for structured logging
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum LogFormat {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// JSON lines format for machine parsing
    Json,
}

#[derive(Parser)]
#[command(name = "ncc", version, about = "Normalization-confluence verifier for registry-governed state machines")]
struct Cli {
    /// Registry spec file (JSON)
    spec: PathBuf,

    /// Ceiling on the enumerable state count
    #[arg(long, default_value_t = DEFAULT_MAX_STATES)]
    max_states: u64,

    /// Cap on repair iterations per state
    #[arg(long, default_value_t = 1000)]
    max_repair_iter: u32,

    /// Output format: human (default) or json
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    output: OutputFormat,

    /// Verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format (text or json)
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(&cli) {
        eprintln!("ERROR: {err:#}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(converged) => {
            if converged {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    match cli.log_format {
        LogFormat::Text => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_target(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set tracing subscriber")?;
        }
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set tracing subscriber")?;
        }
    }
    Ok(())
}

/// Run the full pipeline; `Ok(true)` means convergence is guaranteed.
fn run(cli: &Cli) -> Result<bool> {
    let start = Instant::now();
    let source = cli.spec.display().to_string();

    // The spec file is read once, before any computation.
    let registry = load_file(&cli.spec)?;
    info!(registry = %registry.name, "spec loaded");

    let options = CheckOptions {
        max_states: cli.max_states,
        max_repair_iter: cli.max_repair_iter,
    };

    let compiled = match compile(registry, &options) {
        Ok(compiled) => compiled,
        Err(err) => {
            // Expression-level failures render as diagnostics against
            // the expression that caused them.
            if let Some((decl, expr, diagnostic)) = err.expr_diagnostic() {
                diagnostic.eprint(decl, expr);
            }
            return Err(err).context("compile failed");
        }
    };
    debug!(
        states = compiled.schema.total(),
        events = compiled.registry.events.len(),
        "registry compiled"
    );

    let verification = verify(&compiled, &options).context("table build failed")?;

    let report = Report {
        cr: &compiled,
        verification: &verification,
        source: &source,
        options,
        elapsed: start.elapsed(),
    };

    match cli.output {
        OutputFormat::Human => print!("{}", report.render_human()),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report.to_json())
                .context("serialize JSON report")?;
            println!("{json}");
        }
    }

    Ok(verification.converged())
}
