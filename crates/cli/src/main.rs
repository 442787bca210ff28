// hkdecl - builds the HK customs declaration workbook from carrier, manifest,
// invoice and packing exports.

mod decl;
mod exit_codes;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "hkdecl")]
#[command(about = "Reconcile shipment exports into an HK customs declaration workbook")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the declaration workbook from a TOML config
    #[command(after_help = "\
Examples:
  hkdecl run decl.toml
  hkdecl run decl.toml --manifest today/order.xlsx --carrier today/north.xlsx
  hkdecl run decl.toml --out-dir out/ --json
  hkdecl run decl.toml --dry-run

Logging goes to stderr; set HKDECL_LOG=debug for per-stage detail.")]
    Run(decl::RunArgs),

    /// Parse and validate a config without reading any sources
    #[command(after_help = "\
Examples:
  hkdecl validate decl.toml")]
    Validate {
        /// Path to the declaration TOML config
        config: PathBuf,
    },

    /// List the sheets of a workbook, with the index usable as a sheet selector
    #[command(after_help = "\
Examples:
  hkdecl sheets north.xlsx")]
    Sheets {
        /// Workbook or CSV file
        file: PathBuf,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  hkdecl-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

/// Structured logs on stderr; stdout is reserved for `--json` output.
fn init_logging() {
    let filter = EnvFilter::try_from_env("HKDECL_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => decl::cmd_run(args),
        Commands::Validate { config } => decl::cmd_validate(config),
        Commands::Sheets { file } => decl::cmd_sheets(file),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
