use tracing::debug;

use crate::config::{BarcodeKey, FixedAttributes, ManifestColumns, WeightRule};
use crate::index::Indexes;
use crate::model::{ReconciledRow, ShipmentRecord, Table};
use crate::number::{format2, parse_number};

/// Read one record per manifest data row, in manifest order.
pub fn shipment_records(manifest: &Table, cols: &ManifestColumns) -> Vec<ShipmentRecord> {
    (0..manifest.len())
        .map(|r| {
            let cell = |c: usize| manifest.cell(r, c).to_string();
            ShipmentRecord {
                shipment_id: manifest.cell(r, cols.shipment_id).trim().to_string(),
                order_id: manifest.cell(r, cols.order_id).trim().to_string(),
                raw_gross_weight: cell(cols.gross_weight),
                chinese_name: cell(cols.chinese_name),
                remark: cell(cols.remark),
                origin: cell(cols.origin),
                quantity: cell(cols.quantity),
                unit_price: cell(cols.unit_price),
                amount: cell(cols.amount),
            }
        })
        .collect()
}

/// Net weight for a displayed gross weight: `max(gross - deduction, floor)`
/// to two decimals. Blank or non-numeric gross gives `""`.
pub fn net_weight(gross: &str, rule: &WeightRule) -> String {
    match parse_number(gross) {
        Some(g) => {
            let net = g - rule.deduction;
            // a container never declares zero or negative net weight
            let net = if net >= rule.floor { net } else { rule.floor };
            format2(net)
        }
        None => String::new(),
    }
}

/// State carried between manifest rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Carry {
    /// Shipment id of the previous record; `None` before the first row.
    pub previous_id: Option<String>,
    pub next_item_no: usize,
}

impl Default for Carry {
    fn default() -> Self {
        Self {
            previous_id: None,
            next_item_no: 1,
        }
    }
}

impl Carry {
    /// Gross and net weight for the next row of `shipment_id`. Only the first
    /// line of a run of the same shipment shows a weight.
    fn weights(&self, shipment_id: &str, raw_gross: &str, rule: &WeightRule) -> (String, String) {
        if self.previous_id.as_deref() == Some(shipment_id) {
            return (String::new(), String::new());
        }
        (raw_gross.to_string(), net_weight(raw_gross, rule))
    }

    fn advance(self, shipment_id: &str) -> Carry {
        Carry {
            previous_id: Some(shipment_id.to_string()),
            next_item_no: self.next_item_no + 1,
        }
    }
}

/// Everything a row needs besides the record itself.
pub struct RowContext<'a> {
    pub indexes: &'a Indexes,
    pub barcode_key: BarcodeKey,
    pub weights: &'a WeightRule,
    pub attributes: &'a FixedAttributes,
}

/// One fold step: build the row for `record` and advance the carry.
pub fn reconcile_step(carry: Carry, record: &ShipmentRecord, ctx: &RowContext<'_>) -> (Carry, ReconciledRow) {
    let bag_number = ctx.indexes.bag_number(&record.shipment_id).to_string();

    let barcode_key = match ctx.barcode_key {
        BarcodeKey::ByOrderId => record.order_id.as_str(),
        BarcodeKey::ByBagNumber => bag_number.as_str(),
        BarcodeKey::ByShipmentId => record.shipment_id.as_str(),
    };
    let barcode = ctx.indexes.barcode(barcode_key).to_string();

    let (gross_weight, net_weight) = carry.weights(&record.shipment_id, &record.raw_gross_weight, ctx.weights);

    let attrs = ctx.attributes;
    let row = ReconciledRow {
        item_no: carry.next_item_no,
        shipment_id: record.shipment_id.clone(),
        order_id: record.order_id.clone(),
        bag_number,
        barcode,
        gross_weight,
        net_weight,
        raw_gross_weight: record.raw_gross_weight.clone(),
        english_name: attrs.english_name.clone(),
        chinese_name: record.chinese_name.clone(),
        remark: record.remark.clone(),
        brand_label: attrs.brand_label.clone(),
        origin: record.origin.clone(),
        quantity: record.quantity.clone(),
        unit: attrs.unit.clone(),
        unit_price: record.unit_price.clone(),
        amount: record.amount.clone(),
        currency: attrs.currency.clone(),
    };

    (carry.advance(&record.shipment_id), row)
}

/// Reconcile every record in manifest order.
pub fn reconcile(records: &[ShipmentRecord], ctx: &RowContext<'_>) -> Vec<ReconciledRow> {
    let (_, rows) = records.iter().fold(
        (Carry::default(), Vec::with_capacity(records.len())),
        |(carry, mut rows), record| {
            let (carry, row) = reconcile_step(carry, record, ctx);
            rows.push(row);
            (carry, rows)
        },
    );

    let unresolved = rows.iter().filter(|r| r.bag_number.is_empty()).count();
    debug!(rows = rows.len(), unresolved_bags = unresolved, "manifest reconciled");
    rows
}

/// Redo carry-forward, net weight and numbering over rows in their current
/// order. Runs after anything that reorders rows.
pub fn redisplay(rows: &mut [ReconciledRow], rule: &WeightRule) {
    rows.iter_mut().fold(Carry::default(), |carry, row| {
        let (gross, net) = carry.weights(&row.shipment_id, &row.raw_gross_weight, rule);
        row.item_no = carry.next_item_no;
        row.gross_weight = gross;
        row.net_weight = net;
        carry.advance(&row.shipment_id)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn record(hawb: &str, oid: &str, gw: &str, qty: &str) -> ShipmentRecord {
        ShipmentRecord {
            shipment_id: hawb.into(),
            order_id: oid.into(),
            raw_gross_weight: gw.into(),
            chinese_name: "面霜".into(),
            remark: "50ml".into(),
            origin: "TW".into(),
            quantity: qty.into(),
            unit_price: "100".into(),
            amount: "200".into(),
        }
    }

    fn indexes() -> Indexes {
        Indexes {
            bags: HashMap::from([
                ("H1".to_string(), "BAG-01".to_string()),
                ("H2".to_string(), "BAG-02".to_string()),
            ]),
            barcodes: HashMap::from([
                ("BAG-01".to_string(), "880001".to_string()),
                ("O3".to_string(), "770003".to_string()),
                ("H2".to_string(), "660002".to_string()),
            ]),
        }
    }

    fn run(records: &[ShipmentRecord], key: BarcodeKey) -> Vec<ReconciledRow> {
        let idx = indexes();
        let weights = WeightRule::default();
        let attrs = FixedAttributes::default();
        let ctx = RowContext {
            indexes: &idx,
            barcode_key: key,
            weights: &weights,
            attributes: &attrs,
        };
        reconcile(records, &ctx)
    }

    #[test]
    fn carry_forward_scenario() {
        let rows = run(
            &[
                record("H1", "O1", "10.50", "2"),
                record("H1", "O2", "10.50", "3"),
                record("H2", "O3", "5.00", "1"),
            ],
            BarcodeKey::ByBagNumber,
        );
        assert_eq!(rows.len(), 3);
        assert_eq!((rows[0].gross_weight.as_str(), rows[0].net_weight.as_str()), ("10.50", "10.30"));
        assert_eq!((rows[1].gross_weight.as_str(), rows[1].net_weight.as_str()), ("", ""));
        assert_eq!((rows[2].gross_weight.as_str(), rows[2].net_weight.as_str()), ("5.00", "4.80"));
        assert_eq!(rows.iter().map(|r| r.item_no).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn non_adjacent_repeat_shows_weight_again() {
        let rows = run(
            &[
                record("H1", "O1", "1.00", "1"),
                record("H2", "O2", "2.00", "1"),
                record("H1", "O3", "1.00", "1"),
            ],
            BarcodeKey::ByBagNumber,
        );
        assert_eq!(rows[2].gross_weight, "1.00");
    }

    #[test]
    fn lookups_resolve_and_miss_quietly() {
        let rows = run(
            &[record("H1", "O1", "1", "1"), record("H9", "O9", "1", "1")],
            BarcodeKey::ByBagNumber,
        );
        assert_eq!(rows[0].bag_number, "BAG-01");
        assert_eq!(rows[0].barcode, "880001");
        assert_eq!(rows[1].bag_number, "");
        assert_eq!(rows[1].barcode, "");
    }

    #[test]
    fn barcode_key_variants() {
        let recs = [record("H2", "O3", "1", "1")];
        assert_eq!(run(&recs, BarcodeKey::ByOrderId)[0].barcode, "770003");
        assert_eq!(run(&recs, BarcodeKey::ByShipmentId)[0].barcode, "660002");
        // BAG-02 has no barcode entry
        assert_eq!(run(&recs, BarcodeKey::ByBagNumber)[0].barcode, "");
    }

    #[test]
    fn fixed_attributes_pass_through() {
        let rows = run(&[record("H1", "O1", "1", "2")], BarcodeKey::ByBagNumber);
        let r = &rows[0];
        assert_eq!(r.english_name, "COSMETICS");
        assert_eq!(r.brand_label, "TRUU+TRUE YOU");
        assert_eq!(r.unit, "SET");
        assert_eq!(r.currency, "TWD");
        assert_eq!(r.chinese_name, "面霜");
        assert_eq!(r.quantity, "2");
    }

    #[test]
    fn net_weight_clamps_to_floor() {
        let rule = WeightRule::default();
        assert_eq!(net_weight("0.15", &rule), "0.01");
        assert_eq!(net_weight("0.2", &rule), "0.01");
        assert_eq!(net_weight("0.21", &rule), "0.01");
        assert_eq!(net_weight("0.22", &rule), "0.02");
        assert_eq!(net_weight("0", &rule), "0.01");
    }

    #[test]
    fn net_weight_blank_for_non_numeric() {
        let rule = WeightRule::default();
        assert_eq!(net_weight("", &rule), "");
        assert_eq!(net_weight("n/a", &rule), "");
    }

    #[test]
    fn unparsable_gross_kept_verbatim() {
        let rows = run(&[record("H1", "O1", "approx 3kg", "1")], BarcodeKey::ByBagNumber);
        assert_eq!(rows[0].gross_weight, "approx 3kg");
        assert_eq!(rows[0].net_weight, "");
    }

    #[test]
    fn step_advances_carry() {
        let idx = Indexes::default();
        let weights = WeightRule::default();
        let attrs = FixedAttributes::default();
        let ctx = RowContext {
            indexes: &idx,
            barcode_key: BarcodeKey::ByBagNumber,
            weights: &weights,
            attributes: &attrs,
        };
        let (carry, row) = reconcile_step(Carry::default(), &record("H1", "O1", "3", "1"), &ctx);
        assert_eq!(row.item_no, 1);
        assert_eq!(carry, Carry { previous_id: Some("H1".into()), next_item_no: 2 });
    }

    #[test]
    fn redisplay_follows_new_order() {
        let mut rows = run(
            &[
                record("H1", "O1", "1.00", "1"),
                record("H2", "O2", "2.00", "1"),
                record("H1", "O3", "1.00", "1"),
            ],
            BarcodeKey::ByBagNumber,
        );
        rows.swap(1, 2);
        redisplay(&mut rows, &WeightRule::default());

        let shown: Vec<_> = rows
            .iter()
            .map(|r| (r.item_no, r.order_id.as_str(), r.gross_weight.as_str(), r.net_weight.as_str()))
            .collect();
        assert_eq!(
            shown,
            vec![(1, "O1", "1.00", "0.80"), (2, "O3", "", ""), (3, "O2", "2.00", "1.80")]
        );
        assert!(rows.iter().all(|r| !r.raw_gross_weight.is_empty()));
    }

    #[test]
    fn empty_shipment_id_first_row_still_displays() {
        let rows = run(&[record("", "O1", "2.5", "1")], BarcodeKey::ByBagNumber);
        assert_eq!(rows[0].gross_weight, "2.5");
        assert_eq!(rows[0].net_weight, "2.30");
    }

    #[test]
    fn records_from_manifest_columns() {
        let mut row = vec![String::new(); 41];
        row[1] = " H1 ".into();
        row[3] = "O1".into();
        row[29] = "10.50".into();
        row[33] = "面霜".into();
        row[37] = "2".into();
        row[40] = "200".into();
        let manifest = Table::new("orders", vec![row, vec!["short".into()]]);
        let recs = shipment_records(&manifest, &ManifestColumns::default());
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].shipment_id, "H1");
        assert_eq!(recs[0].raw_gross_weight, "10.50");
        assert_eq!(recs[0].amount, "200");
        assert_eq!(recs[1].order_id, "");
        assert_eq!(recs[1].raw_gross_weight, "");
    }
}
