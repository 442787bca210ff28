//! Spreadsheet and CSV sources in, declaration workbook out.

pub mod report;
pub mod sources;
pub mod table;

pub use report::{business_date, render, report_file_name, write_report, ReportLayout};
pub use sources::{load_sources, SourceFiles};
pub use table::{load_grid, load_table, sheet_names};
