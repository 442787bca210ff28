use std::cmp::Ordering;

use crate::config::WeightRule;
use crate::model::ReconciledRow;
use crate::number::parse_number;
use crate::reconcile::redisplay;

fn sort_weight(row: &ReconciledRow) -> f64 {
    parse_number(&row.raw_gross_weight).unwrap_or(0.0)
}

fn compare(a: &ReconciledRow, b: &ReconciledRow) -> Ordering {
    a.barcode
        .cmp(&b.barcode)
        .then_with(|| a.shipment_id.cmp(&b.shipment_id))
        .then_with(|| sort_weight(a).total_cmp(&sort_weight(b)))
}

/// Order rows by (barcode, shipment id, manifest gross weight), then redo the
/// weight display and numbering for the new order. Ties keep manifest order.
pub fn sort_rows(rows: &mut [ReconciledRow], rule: &WeightRule) {
    rows.sort_by(compare);
    redisplay(rows, rule);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(item_no: usize, barcode: &str, hawb: &str, gw: &str, oid: &str) -> ReconciledRow {
        ReconciledRow {
            item_no,
            shipment_id: hawb.into(),
            order_id: oid.into(),
            bag_number: String::new(),
            barcode: barcode.into(),
            gross_weight: gw.into(),
            net_weight: String::new(),
            raw_gross_weight: gw.into(),
            english_name: String::new(),
            chinese_name: String::new(),
            remark: String::new(),
            brand_label: String::new(),
            origin: String::new(),
            quantity: String::new(),
            unit: String::new(),
            unit_price: String::new(),
            amount: String::new(),
            currency: String::new(),
        }
    }

    fn order_ids(rows: &[ReconciledRow]) -> Vec<&str> {
        rows.iter().map(|r| r.order_id.as_str()).collect()
    }

    #[test]
    fn sorts_by_barcode_then_shipment() {
        let mut rows = vec![
            row(1, "B", "H1", "1", "o1"),
            row(2, "A", "H2", "1", "o2"),
            row(3, "A", "H1", "1", "o3"),
        ];
        sort_rows(&mut rows, &WeightRule::default());
        assert_eq!(order_ids(&rows), vec!["o3", "o2", "o1"]);
        assert_eq!(rows.iter().map(|r| r.item_no).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn weight_compared_numerically() {
        let mut rows = vec![
            row(1, "A", "H1", "10", "heavy"),
            row(2, "A", "H1", "9.5", "light"),
        ];
        sort_rows(&mut rows, &WeightRule::default());
        assert_eq!(order_ids(&rows), vec!["light", "heavy"]);
    }

    #[test]
    fn blank_weight_sorts_as_zero_and_ties_are_stable() {
        let mut rows = vec![
            row(1, "A", "H1", "2", "first"),
            row(2, "A", "H1", "", "blank"),
            row(3, "A", "H1", "x", "text"),
        ];
        sort_rows(&mut rows, &WeightRule::default());
        assert_eq!(order_ids(&rows), vec!["blank", "text", "first"]);
    }

    #[test]
    fn empty_barcode_sorts_first() {
        let mut rows = vec![row(1, "880", "H1", "1", "a"), row(2, "", "H2", "1", "b")];
        sort_rows(&mut rows, &WeightRule::default());
        assert_eq!(order_ids(&rows), vec!["b", "a"]);
    }

    #[test]
    fn scattered_shipment_shows_one_weight() {
        let mut rows = vec![
            row(1, "", "H1", "1.00", "a"),
            row(2, "", "H2", "2.00", "b"),
            row(3, "", "H1", "1.00", "c"),
            row(4, "", "H3", "3.00", "d"),
            row(5, "", "H3", "3.00", "e"),
        ];
        // reconciled in manifest order, so the second H1 line showed its weight
        rows[4].gross_weight.clear();
        sort_rows(&mut rows, &WeightRule::default());

        let shown: Vec<_> = rows
            .iter()
            .map(|r| (r.item_no, r.shipment_id.as_str(), r.gross_weight.as_str(), r.net_weight.as_str()))
            .collect();
        assert_eq!(
            shown,
            vec![
                (1, "H1", "1.00", "0.80"),
                (2, "H1", "", ""),
                (3, "H2", "2.00", "1.80"),
                (4, "H3", "3.00", "2.80"),
                (5, "H3", "", ""),
            ]
        );
    }

    #[test]
    fn weighted_line_leads_its_shipment() {
        // a continuation line has a blank displayed weight but still sorts on
        // the manifest value, so it stays behind the first line
        let mut rows = vec![row(1, "A", "H1", "4.00", "first"), row(2, "A", "H1", "4.00", "second")];
        rows[1].gross_weight.clear();
        sort_rows(&mut rows, &WeightRule::default());
        assert_eq!(order_ids(&rows), vec!["first", "second"]);
        assert_eq!(rows[0].gross_weight, "4.00");
        assert_eq!(rows[1].gross_weight, "");
    }
}
