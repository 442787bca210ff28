use std::fmt;

use serde::Serialize;

use crate::config::{BrandProfile, FixedAttributes};
use crate::error::DeclError;
use crate::number::Centi;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A sheet normalized to rows of string cells. Missing cells read as `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, `""` where a row is too short.
    pub fn column(&self, col: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |r| r.get(col).map(String::as_str).unwrap_or(""))
    }

    /// All non-blank cells, row-major, joined with single spaces.
    pub fn text(&self) -> String {
        self.rows
            .iter()
            .flatten()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// The loaded document set for one run. Each run owns its tables.
#[derive(Debug, Clone, Default)]
pub struct Sources {
    /// Order manifest data rows (header row already skipped).
    pub manifest: Table,
    /// Carrier "export detail" sheet data rows.
    pub export_detail: Table,
    /// Carrier "bag count" sheet data rows.
    pub bag_count: Table,
    /// Invoice raw grid, every row kept so logical addresses line up.
    pub invoice: Table,
    /// Packing list data rows.
    pub packing: Table,
}

// ---------------------------------------------------------------------------
// Cell addresses
// ---------------------------------------------------------------------------

/// A logical spreadsheet address such as `A2` (0-based internally).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    pub row: usize,
    pub col: usize,
}

impl CellAddress {
    pub fn parse(input: &str) -> Result<Self, DeclError> {
        let bad = || DeclError::ConfigValidation(format!("invalid cell address '{input}'"));
        let s = input.trim();
        let split = s.find(|c: char| !c.is_ascii_alphabetic()).ok_or_else(bad)?;
        let (letters, digits) = s.split_at(split);
        if letters.is_empty() || letters.len() > 3 || digits.is_empty() {
            return Err(bad());
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }

        let mut col = 0usize;
        for b in letters.bytes() {
            col = col * 26 + (b.to_ascii_uppercase() - b'A') as usize + 1;
        }
        let row: usize = digits.parse().map_err(|_| bad())?;
        if row == 0 {
            return Err(bad());
        }

        Ok(Self { row: row - 1, col: col - 1 })
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut letters = String::new();
        let mut n = self.col;
        loop {
            letters.insert(0, (b'A' + (n % 26) as u8) as char);
            if n < 26 {
                break;
            }
            n = n / 26 - 1;
        }
        write!(f, "{letters}{}", self.row + 1)
    }
}

/// Read a cell from a raw grid by logical address; out of range reads `""`.
pub fn header_cell(grid: &Table, address: CellAddress) -> &str {
    grid.cell(address.row, address.col)
}

// ---------------------------------------------------------------------------
// Engine records
// ---------------------------------------------------------------------------

/// One invoice-header value, keyed by its logical address in the invoice grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderField {
    pub address: String,
    pub value: String,
}

/// One order-manifest line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentRecord {
    pub shipment_id: String,
    pub order_id: String,
    pub raw_gross_weight: String,
    pub chinese_name: String,
    pub remark: String,
    pub origin: String,
    pub quantity: String,
    pub unit_price: String,
    pub amount: String,
}

/// One output line of the declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledRow {
    pub item_no: usize,
    pub shipment_id: String,
    pub order_id: String,
    pub bag_number: String,
    pub barcode: String,
    pub gross_weight: String,
    pub net_weight: String,
    /// Manifest gross weight before carry-forward; sorting and redisplay read it.
    #[serde(skip)]
    pub raw_gross_weight: String,
    pub english_name: String,
    pub chinese_name: String,
    pub remark: String,
    pub brand_label: String,
    pub origin: String,
    pub quantity: String,
    pub unit: String,
    pub unit_price: String,
    pub amount: String,
    pub currency: String,
}

impl ReconciledRow {
    /// The sixteen report columns, in title-row order (item number excluded).
    pub fn cells(&self) -> [&str; 16] {
        [
            self.shipment_id.as_str(),
            self.order_id.as_str(),
            self.bag_number.as_str(),
            self.barcode.as_str(),
            self.gross_weight.as_str(),
            self.net_weight.as_str(),
            self.english_name.as_str(),
            self.chinese_name.as_str(),
            self.remark.as_str(),
            self.brand_label.as_str(),
            self.origin.as_str(),
            self.quantity.as_str(),
            self.unit.as_str(),
            self.unit_price.as_str(),
            self.amount.as_str(),
            self.currency.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRecord {
    pub packing_reference: String,
    pub bag_count: usize,
    pub total_gross_weight: Centi,
    pub total_net_weight: Centi,
    pub total_quantity: Centi,
    pub total_amount: Centi,
    pub currency: String,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub config_name: String,
    pub engine_version: String,
    pub stages: Vec<String>,
    pub sorted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeclarationReport {
    pub meta: ReportMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<BrandProfile>,
    pub attributes: FixedAttributes,
    pub header: Vec<HeaderField>,
    pub rows: Vec<ReconciledRow>,
    pub summary: SummaryRecord,
}
