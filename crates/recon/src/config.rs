use serde::{Deserialize, Serialize};

use crate::error::DeclError;
use crate::model::CellAddress;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DeclConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub sources: SourcePaths,
    #[serde(default)]
    pub manifest: ManifestColumns,
    #[serde(default)]
    pub carrier: CarrierLayout,
    #[serde(default)]
    pub invoice: InvoiceLayout,
    #[serde(default)]
    pub packing: PackingLayout,
    #[serde(default)]
    pub weights: WeightRule,
    #[serde(default)]
    pub attributes: FixedAttributes,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub brands: Vec<BrandProfile>,
    #[serde(default)]
    pub report: ReportConfig,
}

fn default_name() -> String {
    "HK declaration".into()
}

impl Default for DeclConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            sources: SourcePaths::default(),
            manifest: ManifestColumns::default(),
            carrier: CarrierLayout::default(),
            invoice: InvoiceLayout::default(),
            packing: PackingLayout::default(),
            weights: WeightRule::default(),
            attributes: FixedAttributes::default(),
            pipeline: PipelineConfig::default(),
            brands: Vec::new(),
            report: ReportConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Source file paths, relative to the config file. Command-line flags override.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcePaths {
    pub manifest: Option<String>,
    pub carrier: Option<String>,
    pub invoice: Option<String>,
    pub packing: Option<String>,
}

/// Picks a sheet by name or by 0-based position.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl std::fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(i) => write!(f, "#{i}"),
            Self::Name(name) => write!(f, "'{name}'"),
        }
    }
}

// ---------------------------------------------------------------------------
// Column mappings
// ---------------------------------------------------------------------------

/// Positional layout of the order manifest. Exporters disagree on the gross
/// weight column (29 vs 30), so every offset is configurable.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ManifestColumns {
    pub sheet: SheetSelector,
    pub header_rows: usize,
    /// Keep fully blank manifest lines as (empty) declaration rows instead of
    /// dropping them, so item N matches source line N.
    pub keep_blank_rows: bool,
    pub shipment_id: usize,
    pub order_id: usize,
    pub gross_weight: usize,
    pub chinese_name: usize,
    pub remark: usize,
    pub origin: usize,
    pub quantity: usize,
    pub unit_price: usize,
    pub amount: usize,
}

impl Default for ManifestColumns {
    fn default() -> Self {
        Self {
            sheet: SheetSelector::Index(0),
            header_rows: 1,
            keep_blank_rows: false,
            shipment_id: 1,
            order_id: 3,
            gross_weight: 29,
            chinese_name: 33,
            remark: 34,
            origin: 36,
            quantity: 37,
            unit_price: 39,
            amount: 40,
        }
    }
}

/// Which manifest field is looked up in the bag-count sheet to find a barcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeKey {
    ByOrderId,
    #[default]
    ByBagNumber,
    ByShipmentId,
}

impl std::fmt::Display for BarcodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ByOrderId => write!(f, "by_order_id"),
            Self::ByBagNumber => write!(f, "by_bag_number"),
            Self::ByShipmentId => write!(f, "by_shipment_id"),
        }
    }
}

/// Layout of the carrier ("north") document's two sheets.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CarrierLayout {
    pub export_sheet: SheetSelector,
    pub bag_sheet: SheetSelector,
    pub header_rows: usize,
    /// Export-detail column holding the shipment id (HAWB).
    pub hawb_column: usize,
    /// Export-detail column holding the bag number.
    pub bag_column: usize,
    /// Export-detail column searched by the brand check.
    pub remark_column: Option<usize>,
    /// Bag-count column holding the lookup key.
    pub barcode_key_column: usize,
    /// Bag-count column holding the barcode.
    pub barcode_column: usize,
    pub barcode_key: BarcodeKey,
}

impl Default for CarrierLayout {
    fn default() -> Self {
        Self {
            export_sheet: SheetSelector::Name("出口明細".into()),
            bag_sheet: SheetSelector::Name("袋數編號".into()),
            header_rows: 1,
            hawb_column: 1,
            bag_column: 6,
            remark_column: None,
            barcode_key_column: 0,
            barcode_column: 1,
            barcode_key: BarcodeKey::ByBagNumber,
        }
    }
}

/// Invoice header grid. Read raw (no header row); cells addressed like `A2`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InvoiceLayout {
    pub sheet: SheetSelector,
    pub header_cells: Vec<String>,
}

pub const DEFAULT_HEADER_CELLS: [&str; 16] = [
    "A2", "A3", "E3", "A4", "A5", "E5", "A6", "A7", "E7", "A8", "E8", "A9", "D9", "G9", "A10",
    "E10",
];

impl Default for InvoiceLayout {
    fn default() -> Self {
        Self {
            sheet: SheetSelector::Index(0),
            header_cells: DEFAULT_HEADER_CELLS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PackingLayout {
    pub sheet: SheetSelector,
    pub header_rows: usize,
}

impl Default for PackingLayout {
    fn default() -> Self {
        Self {
            sheet: SheetSelector::Index(0),
            header_rows: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Weights + attributes + brands
// ---------------------------------------------------------------------------

/// Net weight = max(gross - deduction, floor).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct WeightRule {
    pub deduction: f64,
    pub floor: f64,
}

impl Default for WeightRule {
    fn default() -> Self {
        Self {
            deduction: 0.2,
            floor: 0.01,
        }
    }
}

/// Declaration attributes that are fixed per brand rather than per line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FixedAttributes {
    pub english_name: String,
    pub brand_label: String,
    pub unit: String,
    pub currency: String,
    pub file_suffix: String,
}

impl Default for FixedAttributes {
    fn default() -> Self {
        Self {
            english_name: "COSMETICS".into(),
            brand_label: "TRUU+TRUE YOU".into(),
            unit: "SET".into(),
            currency: "TWD".into(),
            file_suffix: "GM".into(),
        }
    }
}

impl FixedAttributes {
    /// Attributes with the brand-specific fields taken from a matched profile.
    pub fn with_brand(&self, brand: &BrandProfile) -> Self {
        Self {
            english_name: brand.english_name.clone(),
            brand_label: brand.brand_label.clone(),
            file_suffix: brand.file_suffix.clone(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BrandProfile {
    pub keyword: String,
    pub english_name: String,
    pub brand_label: String,
    pub file_suffix: String,
}

// ---------------------------------------------------------------------------
// Pipeline + report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    BrandCheck,
    Reconcile,
    Sort,
    Summarize,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BrandCheck => write!(f, "brand_check"),
            Self::Reconcile => write!(f, "reconcile"),
            Self::Sort => write!(f, "sort"),
            Self::Summarize => write!(f, "summarize"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub stages: Vec<Stage>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stages: vec![Stage::Reconcile, Stage::Summarize],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Offset of the business timezone used for the output file date.
    pub utc_offset_hours: i32,
    pub sheet_title: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: 8,
            sheet_title: "HK最終報關檔".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl DeclConfig {
    pub fn from_toml(input: &str) -> Result<Self, DeclError> {
        let config: DeclConfig =
            toml::from_str(input).map_err(|e| DeclError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DeclError> {
        validate_stages(&self.pipeline.stages)?;

        if self.invoice.header_cells.len() > DEFAULT_HEADER_CELLS.len() {
            return Err(DeclError::ConfigValidation(format!(
                "invoice.header_cells has {} entries; the report template has {} header slots",
                self.invoice.header_cells.len(),
                DEFAULT_HEADER_CELLS.len()
            )));
        }
        for cell in &self.invoice.header_cells {
            CellAddress::parse(cell)?;
        }

        let w = &self.weights;
        if !w.deduction.is_finite() || w.deduction < 0.0 {
            return Err(DeclError::ConfigValidation(format!(
                "weights.deduction must be a non-negative number, got {}",
                w.deduction
            )));
        }
        if !w.floor.is_finite() || w.floor <= 0.0 {
            return Err(DeclError::ConfigValidation(format!(
                "weights.floor must be positive, got {}",
                w.floor
            )));
        }

        if !(-12..=14).contains(&self.report.utc_offset_hours) {
            return Err(DeclError::ConfigValidation(format!(
                "report.utc_offset_hours out of range: {}",
                self.report.utc_offset_hours
            )));
        }

        if self.has_stage(Stage::BrandCheck) {
            if self.brands.is_empty() {
                return Err(DeclError::ConfigValidation(
                    "brand_check stage requires at least one [[brands]] profile".into(),
                ));
            }
            if self.carrier.remark_column.is_none() {
                return Err(DeclError::ConfigValidation(
                    "brand_check stage requires carrier.remark_column".into(),
                ));
            }
        }

        for (i, brand) in self.brands.iter().enumerate() {
            if brand.keyword.trim().is_empty() {
                return Err(DeclError::ConfigValidation(format!(
                    "brands[{i}]: keyword must not be empty"
                )));
            }
        }

        Ok(())
    }

    pub fn has_stage(&self, stage: Stage) -> bool {
        self.pipeline.stages.contains(&stage)
    }

    pub fn header_addresses(&self) -> Result<Vec<CellAddress>, DeclError> {
        self.invoice
            .header_cells
            .iter()
            .map(|c| CellAddress::parse(c))
            .collect()
    }
}

/// Stage order rules: reconcile and summarize exactly once, brand check
/// before reconcile, sort between reconcile and summarize.
fn validate_stages(stages: &[Stage]) -> Result<(), DeclError> {
    let position = |stage: Stage| -> Result<Option<usize>, DeclError> {
        let hits: Vec<usize> = stages
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == stage)
            .map(|(i, _)| i)
            .collect();
        match hits.as_slice() {
            [] => Ok(None),
            [i] => Ok(Some(*i)),
            _ => Err(DeclError::ConfigValidation(format!(
                "pipeline stage '{stage}' listed more than once"
            ))),
        }
    };

    let reconcile = position(Stage::Reconcile)?.ok_or_else(|| {
        DeclError::ConfigValidation("pipeline must include the 'reconcile' stage".into())
    })?;
    let summarize = position(Stage::Summarize)?.ok_or_else(|| {
        DeclError::ConfigValidation("pipeline must include the 'summarize' stage".into())
    })?;
    if summarize < reconcile {
        return Err(DeclError::ConfigValidation(
            "'summarize' must come after 'reconcile'".into(),
        ));
    }
    if let Some(brand) = position(Stage::BrandCheck)? {
        if brand > reconcile {
            return Err(DeclError::ConfigValidation(
                "'brand_check' must come before 'reconcile'".into(),
            ));
        }
    }
    if let Some(sort) = position(Stage::Sort)? {
        if sort < reconcile || sort > summarize {
            return Err(DeclError::ConfigValidation(
                "'sort' must come between 'reconcile' and 'summarize'".into(),
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
