// ============================================================
// XLSX INFRASTRUCTURE LAYER
// ============================================================
// Workbook export (rust_xlsxwriter) and workbook input (calamine)

mod xlsx_exporter;
mod xlsx_reader;

pub use xlsx_exporter::{SpreadsheetExporter, FIXED_CREATION_DATE, MAX_SHEET_ROWS};
pub use xlsx_reader::read_first_sheet;
