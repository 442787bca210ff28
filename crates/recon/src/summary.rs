use crate::model::{ReconciledRow, SummaryRecord, Table};
use crate::number::Centi;

/// Reference printed on the summary line: first cell of the packing list's last row.
pub fn packing_reference(packing: &Table) -> String {
    packing
        .rows
        .last()
        .and_then(|r| r.first())
        .map(|c| c.trim().to_string())
        .unwrap_or_default()
}

/// Compute the declaration totals.
///
/// Weights count once per physical shipment (only rows that display a numeric
/// gross weight), while quantity and amount count every line item.
pub fn summarize(
    rows: &[ReconciledRow],
    packing_reference: String,
    bag_count: usize,
    currency: &str,
) -> SummaryRecord {
    let mut total_gross_weight = Centi::ZERO;
    let mut total_net_weight = Centi::ZERO;

    for row in rows {
        if let Some(gross) = Centi::from_cell(&row.gross_weight) {
            total_gross_weight = total_gross_weight + gross;
            total_net_weight = total_net_weight + Centi::from_cell(&row.net_weight).unwrap_or_default();
        }
    }

    let total_quantity: Centi = rows
        .iter()
        .map(|r| Centi::from_cell(&r.quantity).unwrap_or_default())
        .sum();
    let total_amount: Centi = rows
        .iter()
        .map(|r| Centi::from_cell(&r.amount).unwrap_or_default())
        .sum();

    SummaryRecord {
        packing_reference,
        bag_count,
        total_gross_weight,
        total_net_weight,
        total_quantity,
        total_amount,
        currency: currency.to_string(),
    }
}
