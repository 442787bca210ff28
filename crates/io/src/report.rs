// Declaration report export (XLSX via rust_xlsxwriter).
//
// The sheet follows the customs broker's fixed template: a merged invoice
// header block on rows 1-12, the column titles on row 13, one line per
// reconciled row from row 14, then a single summary row.

use std::path::Path;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use hkdecl_recon::config::ReportConfig;
use hkdecl_recon::model::HeaderField;
use hkdecl_recon::number::parse_number;
use hkdecl_recon::{DeclError, DeclarationReport};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use tracing::debug;

/// Column titles on row 13, columns B..Q.
pub const TITLES: [&str; 16] = [
    "提單編號",
    "訂單編號",
    "好馬吉袋號",
    "條碼",
    "單箱重量(GW)",
    "品項淨重",
    "品項英文名稱",
    "品項中文名稱",
    "品項備註",
    "品項品牌",
    "品項產地",
    "品項數量",
    "單位",
    "品項單價",
    "品項小計",
    "幣別",
];

const COLUMN_WIDTHS: [f64; 16] = [
    20.8, 19.2, 14.7, 12.09, 14.0, 8.7, 13.0, 51.82, 30.0, 17.9, 8.7, 8.7, 8.09, 10.91, 9.0, 8.09,
];

const FONT: &str = "Arial";
const GREEN: u32 = 0xC6E0B4;
const YELLOW: u32 = 0xFFFF00;

/// 0-based rows.
const TITLE_ROW: u32 = 12;
const FIRST_DATA_ROW: u32 = 13;

/// Where each extracted invoice header value lands: merged range
/// `(row, first_col, last_col)` plus whether the text wraps. Paired with the
/// configured header cells by position.
const HEADER_PLACEMENTS: [(u32, u16, u16, bool); 16] = [
    (1, 1, 8, true),   // B2:I2
    (2, 1, 4, false),  // B3:E3
    (2, 5, 8, false),  // F3:I3
    (3, 1, 8, false),  // B4:I4
    (4, 1, 4, false),  // B5:E5
    (4, 5, 8, false),  // F5:I5
    (5, 1, 8, false),  // B6:I6
    (6, 1, 4, false),  // B7:E7
    (6, 5, 8, true),   // F7:I7
    (7, 1, 4, true),   // B8:E8
    (7, 5, 8, false),  // F8:I8
    (8, 1, 3, false),  // B9:D9
    (8, 4, 6, false),  // E9:G9
    (8, 7, 8, false),  // H9:I9
    (9, 1, 4, false),  // B10:E10
    (9, 5, 8, false),  // F10:I10
];

/// Data columns (0-based, within the 16 title columns) written as numbers
/// when the text parses: gross weight, quantity, unit price and amount.
const NUMERIC_COLUMNS: [usize; 4] = [4, 11, 13, 14];

/// Name and remark columns wrap.
const WRAP_COLUMNS: [usize; 2] = [7, 8];

/// Sheet-level options for the rendered report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLayout {
    pub sheet_title: String,
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self::from_config(&ReportConfig::default())
    }
}

impl ReportLayout {
    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            sheet_title: config.sheet_title.clone(),
        }
    }
}

fn render_err(e: XlsxError) -> DeclError {
    DeclError::Render(e.to_string())
}

fn base_format() -> Format {
    Format::new()
        .set_font_name(FONT)
        .set_font_size(10)
        .set_align(FormatAlign::VerticalCenter)
}

/// Render the report to XLSX bytes.
pub fn render(report: &DeclarationReport, layout: &ReportLayout) -> Result<Vec<u8>, DeclError> {
    let mut workbook = build_workbook(report, layout)?;
    workbook.save_to_buffer().map_err(render_err)
}

/// Render the report and write it to `path`.
pub fn write_report(report: &DeclarationReport, layout: &ReportLayout, path: &Path) -> Result<(), DeclError> {
    let bytes = render(report, layout)?;
    std::fs::write(path, bytes).map_err(|e| DeclError::Io(format!("{}: {e}", path.display())))?;
    debug!(path = %path.display(), rows = report.rows.len(), "report written");
    Ok(())
}

fn build_workbook(report: &DeclarationReport, layout: &ReportLayout) -> Result<Workbook, DeclError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name(&layout.sheet_title)
        .map_err(render_err)?;

    apply_layout(worksheet).map_err(render_err)?;
    write_header(worksheet, &report.header).map_err(render_err)?;
    write_titles(worksheet).map_err(render_err)?;
    write_rows(worksheet, report).map_err(render_err)?;
    write_summary(worksheet, report).map_err(render_err)?;

    Ok(workbook)
}

fn apply_layout(worksheet: &mut Worksheet) -> Result<(), XlsxError> {
    for (i, width) in COLUMN_WIDTHS.iter().enumerate() {
        worksheet.set_column_width(i as u16 + 1, *width)?;
    }

    worksheet.set_row_height(0, 77)?;
    worksheet.set_row_height(1, 25.2)?;
    worksheet.set_row_height(6, 49.5)?;
    worksheet.set_row_height(7, 25.2)?;
    for row in (2..6).chain(8..12) {
        worksheet.set_row_height(row, 12.5)?;
    }
    Ok(())
}

fn write_header(worksheet: &mut Worksheet, header: &[HeaderField]) -> Result<(), XlsxError> {
    let banner = Format::new()
        .set_font_name(FONT)
        .set_font_size(28)
        .set_bold()
        .set_align(FormatAlign::Left)
        .set_align(FormatAlign::VerticalCenter);
    worksheet.merge_range(0, 1, 0, 4, "INVOICE/PACKING", &banner)?;

    for (i, &(row, first_col, last_col, wrap)) in HEADER_PLACEMENTS.iter().enumerate() {
        let value = header.get(i).map(|h| h.value.as_str()).unwrap_or("");
        let format = if wrap { base_format().set_text_wrap() } else { base_format() };
        worksheet.merge_range(row, first_col, row, last_col, value, &format)?;
    }

    let fob = base_format()
        .set_bold()
        .set_background_color(Color::RGB(YELLOW));
    worksheet.write_string_with_format(10, 1, "FOB", &fob)?;
    Ok(())
}

fn write_titles(worksheet: &mut Worksheet) -> Result<(), XlsxError> {
    let format = base_format()
        .set_bold()
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center)
        .set_background_color(Color::RGB(GREEN));
    for (i, title) in TITLES.iter().enumerate() {
        worksheet.write_string_with_format(TITLE_ROW, i as u16 + 1, *title, &format)?;
    }
    Ok(())
}

fn write_rows(worksheet: &mut Worksheet, report: &DeclarationReport) -> Result<(), XlsxError> {
    let item_format = base_format().set_align(FormatAlign::Center);
    let cell_format = base_format().set_border(FormatBorder::Thin);
    let wrap_format = cell_format.clone().set_text_wrap();

    for (offset, row) in report.rows.iter().enumerate() {
        let r = FIRST_DATA_ROW + offset as u32;
        worksheet.write_number_with_format(r, 0, row.item_no as f64, &item_format)?;

        for (i, value) in row.cells().iter().enumerate() {
            let col = i as u16 + 1;
            let format = if WRAP_COLUMNS.contains(&i) { &wrap_format } else { &cell_format };
            match parse_number(value).filter(|_| NUMERIC_COLUMNS.contains(&i)) {
                Some(n) => worksheet.write_number_with_format(r, col, n, format)?,
                None => worksheet.write_string_with_format(r, col, *value, format)?,
            };
        }
    }
    Ok(())
}

fn write_summary(worksheet: &mut Worksheet, report: &DeclarationReport) -> Result<(), XlsxError> {
    let r = FIRST_DATA_ROW + report.rows.len() as u32;
    let s = &report.summary;
    let format = base_format()
        .set_bold()
        .set_border(FormatBorder::Thin)
        .set_background_color(Color::RGB(YELLOW));
    let decimals = format.clone().set_num_format("0.00");

    for col in 1..=16u16 {
        worksheet.write_blank(r, col, &format)?;
    }
    worksheet.write_string_with_format(r, 1, &s.packing_reference, &format)?;
    worksheet.write_number_with_format(r, 3, s.bag_count as f64, &format)?;
    worksheet.write_number_with_format(r, 5, s.total_gross_weight.to_f64(), &decimals)?;
    worksheet.write_number_with_format(r, 6, s.total_net_weight.to_f64(), &decimals)?;
    worksheet.write_number_with_format(r, 12, s.total_quantity.to_f64(), &format)?;
    worksheet.write_number_with_format(r, 15, s.total_amount.to_f64(), &decimals)?;
    worksheet.write_string_with_format(r, 16, &s.currency, &format)?;
    Ok(())
}

/// The calendar date in the business timezone.
pub fn business_date(now: DateTime<Utc>, utc_offset_hours: i32) -> Result<NaiveDate, DeclError> {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600).ok_or_else(|| {
        DeclError::ConfigValidation(format!("invalid UTC offset: {utc_offset_hours} hours"))
    })?;
    Ok(now.with_timezone(&offset).date_naive())
}

/// `YYYYMMDD_HK_<suffix>_Final.xlsx`
pub fn report_file_name(date: NaiveDate, suffix: &str) -> String {
    format!("{}_HK_{}_Final.xlsx", date.format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::load_grid;
    use chrono::TimeZone;
    use hkdecl_recon::config::{FixedAttributes, SheetSelector};
    use hkdecl_recon::model::{ReportMeta, SummaryRecord};
    use hkdecl_recon::number::Centi;
    use hkdecl_recon::ReconciledRow;
    use tempfile::tempdir;

    fn row(item_no: usize, hawb: &str, gw: &str, nw: &str) -> ReconciledRow {
        ReconciledRow {
            item_no,
            shipment_id: hawb.into(),
            order_id: format!("O{item_no}"),
            bag_number: "BAG-01".into(),
            barcode: "880001".into(),
            gross_weight: gw.into(),
            net_weight: nw.into(),
            raw_gross_weight: gw.into(),
            english_name: "COSMETICS".into(),
            chinese_name: "保濕面霜".into(),
            remark: "50ml".into(),
            brand_label: "TRUU+TRUE YOU".into(),
            origin: "TW".into(),
            quantity: "2".into(),
            unit: "SET".into(),
            unit_price: "100".into(),
            amount: "200".into(),
            currency: "TWD".into(),
        }
    }

    fn report() -> DeclarationReport {
        DeclarationReport {
            meta: ReportMeta {
                config_name: "test".into(),
                engine_version: "0.0.0".into(),
                stages: vec!["reconcile".into(), "summarize".into()],
                sorted: false,
            },
            brand: None,
            attributes: FixedAttributes::default(),
            header: vec![
                HeaderField { address: "A2".into(), value: "Shipper: ACME TRADING".into() },
                HeaderField { address: "A3".into(), value: "Invoice No: 42".into() },
            ],
            rows: vec![row(1, "H1", "10.50", "10.30"), row(2, "H1", "", "")],
            summary: SummaryRecord {
                packing_reference: "TOTAL 2 CTNS".into(),
                bag_count: 3,
                total_gross_weight: Centi(1050),
                total_net_weight: Centi(1030),
                total_quantity: Centi::from_units(4),
                total_amount: Centi::from_units(400),
                currency: "TWD".into(),
            },
        }
    }

    #[test]
    fn rendered_sheet_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        write_report(&report(), &ReportLayout::default(), &path).unwrap();

        let grid = load_grid(&path, &SheetSelector::Name("HK最終報關檔".into())).unwrap();
        assert_eq!(grid.cell(0, 1), "INVOICE/PACKING");
        assert_eq!(grid.cell(1, 1), "Shipper: ACME TRADING");
        assert_eq!(grid.cell(2, 1), "Invoice No: 42");
        assert_eq!(grid.cell(10, 1), "FOB");

        for (i, title) in TITLES.iter().enumerate() {
            assert_eq!(grid.cell(12, i + 1), *title);
        }

        assert_eq!(grid.cell(13, 0), "1");
        assert_eq!(grid.cell(13, 1), "H1");
        assert_eq!(grid.cell(13, 5), "10.5");
        assert_eq!(grid.cell(13, 6), "10.30");
        assert_eq!(grid.cell(13, 8), "保濕面霜");
        assert_eq!(grid.cell(14, 0), "2");
        assert_eq!(grid.cell(14, 5), "");
        assert_eq!(grid.cell(14, 6), "");

        // summary row follows the data
        assert_eq!(grid.cell(15, 1), "TOTAL 2 CTNS");
        assert_eq!(grid.cell(15, 3), "3");
        assert_eq!(grid.cell(15, 5), "10.5");
        assert_eq!(grid.cell(15, 6), "10.3");
        assert_eq!(grid.cell(15, 12), "4");
        assert_eq!(grid.cell(15, 15), "400");
        assert_eq!(grid.cell(15, 16), "TWD");
        assert_eq!(grid.len(), 16);
    }

    #[test]
    fn empty_report_still_has_template() {
        let mut empty = report();
        empty.rows.clear();
        empty.header.clear();
        let bytes = render(&empty, &ReportLayout::default()).unwrap();
        assert!(bytes.starts_with(b"PK"));

        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        std::fs::write(&path, &bytes).unwrap();
        let grid = load_grid(&path, &SheetSelector::Index(0)).unwrap();
        assert_eq!(grid.cell(12, 1), "提單編號");
        assert_eq!(grid.cell(13, 1), "TOTAL 2 CTNS");
    }

    #[test]
    fn custom_sheet_title() {
        let layout = ReportLayout { sheet_title: "HK".into() };
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        write_report(&report(), &layout, &path).unwrap();
        assert_eq!(crate::table::sheet_names(&path).unwrap(), vec!["HK"]);
    }

    #[test]
    fn invalid_sheet_title_is_render_error() {
        let layout = ReportLayout { sheet_title: "bad[title]".into() };
        assert!(matches!(render(&report(), &layout), Err(DeclError::Render(_))));
    }

    #[test]
    fn write_to_missing_directory_is_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.xlsx");
        let err = write_report(&report(), &ReportLayout::default(), &path).unwrap_err();
        assert!(matches!(err, DeclError::Io(_)));
    }

    #[test]
    fn business_date_crosses_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 17, 30, 0).unwrap();
        assert_eq!(business_date(now, 8).unwrap(), NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert_eq!(business_date(now, 0).unwrap(), NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
        assert!(business_date(now, 30).is_err());
    }

    #[test]
    fn file_name_pattern() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(report_file_name(date, "GM"), "20260309_HK_GM_Final.xlsx");
        assert_eq!(report_file_name(date, "MK"), "20260309_HK_MK_Final.xlsx");
    }
}
