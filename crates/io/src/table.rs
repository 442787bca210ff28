// Source table loading: spreadsheets through calamine, delimited text through csv.

use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{NaiveDate, TimeDelta};
use encoding_rs::{Encoding, BIG5, UTF_8, WINDOWS_1252};
use hkdecl_recon::config::SheetSelector;
use hkdecl_recon::{DeclError, Table};
use tracing::debug;

/// Input formats the loader understands, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Workbook,
    Csv,
    Tsv,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(SourceFormat::Workbook),
            "csv" | "txt" => Some(SourceFormat::Csv),
            "tsv" | "tab" => Some(SourceFormat::Tsv),
            _ => None,
        }
    }
}

/// Load data rows from one sheet: the first `header_rows` rows are skipped and
/// fully blank rows are dropped.
pub fn load_table(path: &Path, selector: &SheetSelector, header_rows: usize) -> Result<Table, DeclError> {
    load_data_rows(path, selector, header_rows, false)
}

/// Like [`load_table`], but blank rows between data rows are kept, so every
/// source line becomes a row of its own.
pub fn load_table_with_blanks(path: &Path, selector: &SheetSelector, header_rows: usize) -> Result<Table, DeclError> {
    load_data_rows(path, selector, header_rows, true)
}

fn load_data_rows(
    path: &Path,
    selector: &SheetSelector,
    header_rows: usize,
    keep_blank: bool,
) -> Result<Table, DeclError> {
    let (name, grid) = read_grid(path, selector)?;
    let total = grid.len();
    let rows: Vec<Vec<String>> = grid
        .into_iter()
        .skip(header_rows)
        .filter(|row| keep_blank || !is_blank_row(row))
        .collect();
    debug!(path = %path.display(), sheet = %name, total, kept = rows.len(), keep_blank, "table loaded");
    Ok(Table::new(name, rows))
}

/// Load a sheet as a raw grid. Every row is kept so logical cell addresses
/// (`A2`, `E7`, ...) line up with the source.
pub fn load_grid(path: &Path, selector: &SheetSelector) -> Result<Table, DeclError> {
    let (name, grid) = read_grid(path, selector)?;
    debug!(path = %path.display(), sheet = %name, rows = grid.len(), "grid loaded");
    Ok(Table::new(name, grid))
}

/// Sheet names in workbook order. Delimited files report their file stem.
pub fn sheet_names(path: &Path) -> Result<Vec<String>, DeclError> {
    match detect(path)? {
        SourceFormat::Workbook => {
            let workbook = open_workbook_auto(path).map_err(|e| read_error(path, e))?;
            Ok(workbook.sheet_names())
        }
        SourceFormat::Csv | SourceFormat::Tsv => Ok(vec![file_stem(path)]),
    }
}

fn detect(path: &Path) -> Result<SourceFormat, DeclError> {
    SourceFormat::from_path(path).ok_or_else(|| {
        DeclError::source_read(
            path.display().to_string(),
            "unsupported file type (expected xlsx, xlsm, xls, xlsb, ods, csv or tsv)",
        )
    })
}

fn read_grid(path: &Path, selector: &SheetSelector) -> Result<(String, Vec<Vec<String>>), DeclError> {
    match detect(path)? {
        SourceFormat::Workbook => read_workbook_sheet(path, selector),
        SourceFormat::Csv => read_delimited(path, selector, None),
        SourceFormat::Tsv => read_delimited(path, selector, Some(b'\t')),
    }
}

fn read_error(path: &Path, detail: impl std::fmt::Display) -> DeclError {
    DeclError::source_read(path.display().to_string(), detail.to_string())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Workbooks
// ---------------------------------------------------------------------------

fn read_workbook_sheet(path: &Path, selector: &SheetSelector) -> Result<(String, Vec<Vec<String>>), DeclError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| read_error(path, e))?;
    let names = workbook.sheet_names();

    let name = match selector {
        SheetSelector::Name(wanted) => names.iter().find(|n| *n == wanted).cloned(),
        SheetSelector::Index(i) => names.get(*i).cloned(),
    };
    let Some(name) = name else {
        return Err(read_error(
            path,
            format!("sheet {selector} not found (available: {})", names.join(", ")),
        ));
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| read_error(path, format!("sheet '{name}': {e}")))?;
    Ok((name, range_to_grid(&range)))
}

/// Convert a calamine range into an A1-anchored grid of strings.
fn range_to_grid(range: &Range<Data>) -> Vec<Vec<String>> {
    let (height, width) = range.get_size();
    if height == 0 || width == 0 {
        return Vec::new();
    }

    // Data may not begin at A1; pad so positional addressing stays absolute.
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let start_row = start_row as usize;
    let start_col = start_col as usize;

    let mut grid = vec![Vec::new(); start_row];
    for row in range.rows() {
        let mut cells = vec![String::new(); start_col];
        cells.extend(row.iter().map(cell_text));
        while cells.last().is_some_and(|c| c.is_empty()) {
            cells.pop();
        }
        grid.push(cells);
    }
    grid
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => format_float(*n),
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{e:?}"),
        Data::DateTime(dt) => serial_to_iso(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// Integral floats print without decimals, everything else in shortest form.
fn format_float(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Excel serial date (1900 system) to ISO text. Times are kept only when present.
fn serial_to_iso(serial: f64) -> String {
    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0)) else {
        return format_float(serial);
    };
    let seconds = (serial * 86_400.0).round() as i64;
    let Some(stamp) = TimeDelta::try_seconds(seconds).and_then(|d| epoch.checked_add_signed(d)) else {
        return format_float(serial);
    };
    if seconds % 86_400 == 0 {
        stamp.format("%Y-%m-%d").to_string()
    } else {
        stamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

// ---------------------------------------------------------------------------
// Delimited text
// ---------------------------------------------------------------------------

fn read_delimited(
    path: &Path,
    selector: &SheetSelector,
    delimiter: Option<u8>,
) -> Result<(String, Vec<Vec<String>>), DeclError> {
    if let SheetSelector::Index(i) = selector {
        if *i != 0 {
            return Err(read_error(path, format!("sheet {selector} not found (delimited files have one sheet)")));
        }
    }

    let content = read_text(path).map_err(|e| read_error(path, e))?;
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&content));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| read_error(path, e))?;
        grid.push(record.iter().map(str::to_string).collect());
    }
    Ok((file_stem(path), grid))
}

/// Delimiters tried when a `.csv`/`.txt` export does not say which it uses.
const DELIMITERS: [u8; 4] = [b'\t', b';', b',', b'|'];

/// Guess the delimiter of a delimited export from its first lines.
///
/// A candidate scores the number of sample records whose width matches the
/// first record, times that width. It must split the first record at all.
/// Ties go to the earlier candidate; nothing viable means comma.
fn sniff_delimiter(content: &str) -> u8 {
    let sample: String = content.lines().take(10).collect::<Vec<_>>().join("\n");

    DELIMITERS
        .iter()
        .rev()
        .filter_map(|&delim| {
            let widths: Vec<usize> = csv::ReaderBuilder::new()
                .delimiter(delim)
                .has_headers(false)
                .flexible(true)
                .from_reader(sample.as_bytes())
                .records()
                .map(|r| r.map_or(1, |r| r.len()))
                .collect();
            let first = *widths.first()?;
            (first > 1).then(|| (widths.iter().filter(|&&w| w == first).count() * first, delim))
        })
        .max_by_key(|&(score, _)| score)
        .map_or(b',', |(_, delim)| delim)
}

/// Decode an exported text file.
///
/// A byte-order mark decides outright (Excel's "Unicode text" export is
/// UTF-16LE). Without one: strict UTF-8, then strict Big5 for Traditional
/// Chinese office exports, then Windows-1252 as the lossy last resort.
fn read_text(path: &Path) -> std::io::Result<String> {
    let mut bytes = Vec::new();
    std::fs::File::open(path)?.read_to_end(&mut bytes)?;

    if let Some((encoding, bom_len)) = Encoding::for_bom(&bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return Ok(text.into_owned());
    }
    let text = [UTF_8, BIG5]
        .into_iter()
        .find_map(|encoding| encoding.decode_without_bom_handling_and_without_replacement(&bytes))
        .unwrap_or_else(|| WINDOWS_1252.decode_without_bom_handling(&bytes).0);
    Ok(text.into_owned())
}
