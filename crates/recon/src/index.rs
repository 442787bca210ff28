use std::collections::HashMap;

use tracing::debug;

use crate::config::CarrierLayout;
use crate::model::Table;

/// Lookup tables built from the carrier document.
#[derive(Debug, Clone, Default)]
pub struct Indexes {
    /// shipment id (HAWB) → bag number.
    pub bags: HashMap<String, String>,
    /// key (per `BarcodeKey`) → barcode.
    pub barcodes: HashMap<String, String>,
}

impl Indexes {
    pub fn bag_number(&self, shipment_id: &str) -> &str {
        self.bags.get(shipment_id).map(String::as_str).unwrap_or("")
    }

    pub fn barcode(&self, key: &str) -> &str {
        self.barcodes.get(key).map(String::as_str).unwrap_or("")
    }
}

/// Build a key → value map from two columns. Later rows overwrite earlier
/// ones; blank keys are skipped.
pub fn build_lookup(table: &Table, key_col: usize, value_col: usize) -> HashMap<String, String> {
    let mut map = HashMap::with_capacity(table.len());
    let mut overwritten = 0usize;

    for row in 0..table.len() {
        let key = table.cell(row, key_col).trim();
        if key.is_empty() {
            continue;
        }
        let value = table.cell(row, value_col).trim().to_string();
        if map.insert(key.to_string(), value).is_some() {
            overwritten += 1;
        }
    }

    if overwritten > 0 {
        debug!(table = %table.name, overwritten, "duplicate lookup keys, last row wins");
    }
    map
}

pub fn build_indexes(export_detail: &Table, bag_count: &Table, layout: &CarrierLayout) -> Indexes {
    let indexes = Indexes {
        bags: build_lookup(export_detail, layout.hawb_column, layout.bag_column),
        barcodes: build_lookup(bag_count, layout.barcode_key_column, layout.barcode_column),
    };
    debug!(
        bags = indexes.bags.len(),
        barcodes = indexes.barcodes.len(),
        "carrier indexes built"
    );
    indexes
}

/// Number of bags declared on the bag-count sheet: non-blank barcode cells.
pub fn count_bags(bag_count: &Table, barcode_column: usize) -> usize {
    bag_count
        .column(barcode_column)
        .filter(|c| !c.trim().is_empty())
        .count()
}
