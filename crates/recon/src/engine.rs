use tracing::{debug, info};

use crate::brand::{identify_brand, BrandExcerpts};
use crate::config::{BrandProfile, DeclConfig, FixedAttributes, Stage};
use crate::error::DeclError;
use crate::index::{build_indexes, count_bags, Indexes};
use crate::model::{
    header_cell, DeclarationReport, HeaderField, ReconciledRow, ReportMeta, Sources, SummaryRecord,
};
use crate::reconcile::{reconcile, shipment_records, RowContext};
use crate::sort::sort_rows;
use crate::summary::{packing_reference, summarize};

/// Private per-run state threaded through the stages.
struct RunContext<'a> {
    config: &'a DeclConfig,
    sources: &'a Sources,
    indexes: Indexes,
    brand: Option<BrandProfile>,
    attributes: FixedAttributes,
    rows: Option<Vec<ReconciledRow>>,
    sorted: bool,
    summary: Option<SummaryRecord>,
}

/// Run the configured pipeline over one document set.
///
/// Either every stage succeeds and a complete report comes back, or the first
/// failing stage's error is returned and nothing else is produced.
pub fn run(config: &DeclConfig, sources: &Sources) -> Result<DeclarationReport, DeclError> {
    config.validate()?;

    let header = extract_header(config, sources)?;
    let indexes = build_indexes(&sources.export_detail, &sources.bag_count, &config.carrier);

    let mut ctx = RunContext {
        config,
        sources,
        indexes,
        brand: None,
        attributes: config.attributes.clone(),
        rows: None,
        sorted: false,
        summary: None,
    };

    for stage in &config.pipeline.stages {
        debug!(%stage, "running stage");
        match stage {
            Stage::BrandCheck => brand_check(&mut ctx)?,
            Stage::Reconcile => reconcile_stage(&mut ctx),
            Stage::Sort => sort_stage(&mut ctx)?,
            Stage::Summarize => summarize_stage(&mut ctx)?,
        }
    }

    let rows = ctx.rows.ok_or_else(|| stage_missing(Stage::Reconcile))?;
    let summary = ctx.summary.ok_or_else(|| stage_missing(Stage::Summarize))?;

    info!(
        config = %config.name,
        rows = rows.len(),
        bags = summary.bag_count,
        gross = %summary.total_gross_weight,
        "declaration reconciled"
    );

    Ok(DeclarationReport {
        meta: ReportMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            stages: config.pipeline.stages.iter().map(|s| s.to_string()).collect(),
            sorted: ctx.sorted,
        },
        brand: ctx.brand,
        attributes: ctx.attributes,
        header,
        rows,
        summary,
    })
}

fn stage_missing(stage: Stage) -> DeclError {
    DeclError::ConfigValidation(format!("pipeline did not run the '{stage}' stage"))
}

/// Pull the configured header cells out of the raw invoice grid.
pub fn extract_header(config: &DeclConfig, sources: &Sources) -> Result<Vec<HeaderField>, DeclError> {
    Ok(config
        .header_addresses()?
        .into_iter()
        .map(|addr| HeaderField {
            address: addr.to_string(),
            value: header_cell(&sources.invoice, addr).to_string(),
        })
        .collect())
}

fn brand_check(ctx: &mut RunContext<'_>) -> Result<(), DeclError> {
    let remark_column = ctx.config.carrier.remark_column.ok_or_else(|| {
        DeclError::ConfigValidation("brand_check stage requires carrier.remark_column".into())
    })?;
    let excerpts = BrandExcerpts::from_sources(
        &ctx.sources.invoice,
        &ctx.sources.packing,
        &ctx.sources.export_detail,
        remark_column,
    );
    let brand = identify_brand(&excerpts, &ctx.config.brands)?;
    ctx.attributes = ctx.config.attributes.with_brand(brand);
    ctx.brand = Some(brand.clone());
    Ok(())
}

fn reconcile_stage(ctx: &mut RunContext<'_>) {
    let records = shipment_records(&ctx.sources.manifest, &ctx.config.manifest);
    let row_ctx = RowContext {
        indexes: &ctx.indexes,
        barcode_key: ctx.config.carrier.barcode_key,
        weights: &ctx.config.weights,
        attributes: &ctx.attributes,
    };
    ctx.rows = Some(reconcile(&records, &row_ctx));
}

fn sort_stage(ctx: &mut RunContext<'_>) -> Result<(), DeclError> {
    let rows = ctx.rows.as_mut().ok_or_else(|| stage_missing(Stage::Reconcile))?;
    sort_rows(rows, &ctx.config.weights);
    ctx.sorted = true;
    Ok(())
}

fn summarize_stage(ctx: &mut RunContext<'_>) -> Result<(), DeclError> {
    let rows = ctx.rows.as_deref().ok_or_else(|| stage_missing(Stage::Reconcile))?;
    let bag_count = count_bags(&ctx.sources.bag_count, ctx.config.carrier.barcode_column);
    ctx.summary = Some(summarize(
        rows,
        packing_reference(&ctx.sources.packing),
        bag_count,
        &ctx.attributes.currency,
    ));
    Ok(())
}
