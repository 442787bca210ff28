use std::path::PathBuf;

use hkdecl_recon::{DeclConfig, DeclError, Sources};
use tracing::info;

use crate::table::{load_grid, load_table, load_table_with_blanks};

/// The four input files of one declaration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFiles {
    pub manifest: PathBuf,
    /// Carrier workbook holding both the export-detail and bag-count sheets.
    pub carrier: PathBuf,
    pub invoice: PathBuf,
    pub packing: PathBuf,
}

/// Prefix a read failure with the document's role so the operator knows which
/// upload was wrong.
fn in_document(role: &'static str) -> impl Fn(DeclError) -> DeclError {
    move |err| match err {
        DeclError::SourceRead { source_name, detail } => {
            DeclError::source_read(format!("{role} ({source_name})"), detail)
        }
        other => other,
    }
}

/// Load every table the engine needs, using the sheet layout from `config`.
pub fn load_sources(files: &SourceFiles, config: &DeclConfig) -> Result<Sources, DeclError> {
    let load_manifest = if config.manifest.keep_blank_rows {
        load_table_with_blanks
    } else {
        load_table
    };
    let manifest = load_manifest(&files.manifest, &config.manifest.sheet, config.manifest.header_rows)
        .map_err(in_document("manifest"))?;
    let export_detail = load_table(&files.carrier, &config.carrier.export_sheet, config.carrier.header_rows)
        .map_err(in_document("carrier"))?;
    let bag_count = load_table(&files.carrier, &config.carrier.bag_sheet, config.carrier.header_rows)
        .map_err(in_document("carrier"))?;
    let invoice = load_grid(&files.invoice, &config.invoice.sheet).map_err(in_document("invoice"))?;
    let packing = load_table(&files.packing, &config.packing.sheet, config.packing.header_rows)
        .map_err(in_document("packing"))?;

    info!(
        manifest = manifest.len(),
        export_detail = export_detail.len(),
        bag_count = bag_count.len(),
        invoice = invoice.len(),
        packing = packing.len(),
        "sources loaded"
    );

    Ok(Sources {
        manifest,
        export_detail,
        bag_count,
        invoice,
        packing,
    })
}
