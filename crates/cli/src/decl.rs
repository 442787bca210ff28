//! `hkdecl run` / `hkdecl validate` / `hkdecl sheets`: config-driven declaration builds.

use std::path::{Path, PathBuf};

use clap::Args;
use hkdecl_io::{business_date, load_sources, report_file_name, sheet_names, write_report, ReportLayout, SourceFiles};
use hkdecl_recon::{DeclConfig, DeclError, DeclarationReport};
use tracing::{debug, info};

use crate::exit_codes::{decl_exit_code, EXIT_ERROR, EXIT_USAGE};
use crate::CliError;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the declaration TOML config
    pub config: PathBuf,

    /// Order manifest (overrides [sources].manifest)
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Carrier workbook with the export-detail and bag-count sheets
    #[arg(long)]
    pub carrier: Option<PathBuf>,

    /// Commercial invoice (overrides [sources].invoice)
    #[arg(long)]
    pub invoice: Option<PathBuf>,

    /// Packing list (overrides [sources].packing)
    #[arg(long)]
    pub packing: Option<PathBuf>,

    /// Write the report to this exact path
    #[arg(long, short = 'o', conflicts_with = "out_dir")]
    pub output: Option<PathBuf>,

    /// Directory for the dated report file (default: the config's directory)
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print the reconciled declaration as JSON to stdout
    #[arg(long)]
    pub json: bool,

    /// Reconcile and report, but do not write the workbook
    #[arg(long)]
    pub dry_run: bool,
}

fn decl_err(err: DeclError) -> CliError {
    let code = decl_exit_code(&err);
    let hint = match &err {
        DeclError::SourceRead { .. } => Some("check the file path and the sheet names in the config"),
        DeclError::BrandNotIdentified { .. } => {
            Some("add a [[brands]] profile whose keyword appears in the invoice")
        }
        DeclError::BrandMismatch { .. } => {
            Some("the invoice, packing list and carrier document must come from the same shipment")
        }
        _ => None,
    };
    CliError {
        code,
        message: err.to_string(),
        hint: hint.map(str::to_string),
    }
}

fn load_config(path: &Path) -> Result<DeclConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::usage(format!("cannot read config {}: {e}", path.display()))
    })?;
    DeclConfig::from_toml(&text).map_err(decl_err)
}

fn config_dir(config_path: &Path) -> &Path {
    match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// A flag wins over the config entry; config entries are relative to the config file.
fn resolve(flag: Option<PathBuf>, configured: Option<&String>, base: &Path, role: &str) -> Result<PathBuf, CliError> {
    if let Some(path) = flag {
        return Ok(path);
    }
    match configured {
        Some(rel) => Ok(base.join(rel)),
        None => Err(CliError::usage(format!("no {role} file given"))
            .with_hint(format!("set [sources].{role} in the config or pass --{role}"))),
    }
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = load_config(&args.config)?;
    let base = config_dir(&args.config);

    let files = SourceFiles {
        manifest: resolve(args.manifest, config.sources.manifest.as_ref(), base, "manifest")?,
        carrier: resolve(args.carrier, config.sources.carrier.as_ref(), base, "carrier")?,
        invoice: resolve(args.invoice, config.sources.invoice.as_ref(), base, "invoice")?,
        packing: resolve(args.packing, config.sources.packing.as_ref(), base, "packing")?,
    };
    debug!(?files, "resolved sources");

    let sources = load_sources(&files, &config).map_err(decl_err)?;
    let report = hkdecl_recon::run(&config, &sources).map_err(decl_err)?;

    let date = business_date(chrono::Utc::now(), config.report.utc_offset_hours).map_err(decl_err)?;
    let output = match args.output {
        Some(path) => path,
        None => {
            let dir = args.out_dir.unwrap_or_else(|| base.to_path_buf());
            dir.join(report_file_name(date, &report.attributes.file_suffix))
        }
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError { code: EXIT_ERROR, message: format!("JSON serialization error: {e}"), hint: None })?;
        println!("{json}");
    }

    eprintln!("{}", summary_line(&report));

    if args.dry_run {
        eprintln!("dry run: would write {}", output.display());
        return Ok(());
    }

    write_report(&report, &ReportLayout::from_config(&config.report), &output).map_err(decl_err)?;
    info!(path = %output.display(), "declaration written");
    eprintln!("wrote {}", output.display());
    Ok(())
}

fn summary_line(report: &DeclarationReport) -> String {
    let s = &report.summary;
    let brand = report
        .brand
        .as_ref()
        .map(|b| format!(" [{}]", b.keyword))
        .unwrap_or_default();
    format!(
        "{} rows{brand}: {} bags, GW {} / NW {}, qty {}, amount {} {}",
        report.rows.len(),
        s.bag_count,
        s.total_gross_weight,
        s.total_net_weight,
        s.total_quantity,
        s.total_amount,
        s.currency,
    )
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let stages: Vec<String> = config.pipeline.stages.iter().map(|s| s.to_string()).collect();
    eprintln!(
        "config ok: '{}' (stages: {}; {} brand profile(s); barcode key: {})",
        config.name,
        stages.join(" -> "),
        config.brands.len(),
        config.carrier.barcode_key,
    );
    Ok(())
}

pub fn cmd_sheets(file: PathBuf) -> Result<(), CliError> {
    let names = sheet_names(&file).map_err(decl_err)?;
    if names.is_empty() {
        return Err(CliError { code: EXIT_USAGE, message: format!("{} has no sheets", file.display()), hint: None });
    }
    for (i, name) in names.iter().enumerate() {
        println!("{i}\t{name}");
    }
    Ok(())
}
