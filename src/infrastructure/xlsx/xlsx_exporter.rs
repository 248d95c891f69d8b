//! XLSX export of a consolidated table.
//!
//! The workbook has one sheet: a bold header row holding the batch schema followed by
//! the consolidated rows in order. Every cell is written as a string, so re-reading the
//! document yields the same values (empty strings come back as empty cells).
//!
//! Output is byte-for-byte reproducible: the creation timestamp stored in the document
//! properties is pinned to [`FIXED_CREATION_DATE`].

use std::time::Instant;

use rust_xlsxwriter::{DocProperties, ExcelDateTime, Format, Workbook, Worksheet, XlsxError};
use tracing::info;

use crate::domain::error::{AppError, Result};
use crate::domain::pipeline::{ConsolidatedResult, ExportedDocument};

/// Creation date written into every exported workbook (year, month, day).
pub const FIXED_CREATION_DATE: (u16, u8, u8) = (2000, 1, 1);

/// Largest row index an xlsx worksheet can address (0-based, header included).
pub const MAX_SHEET_ROWS: usize = 1_048_576;

/// Largest column count an xlsx worksheet can address.
pub const MAX_SHEET_COLUMNS: usize = 16_384;

#[derive(Debug, Clone)]
pub struct SpreadsheetExporter {
    sheet_name: String,
    filename: String,
}

impl SpreadsheetExporter {
    pub fn new(sheet_name: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            filename: filename.into(),
        }
    }

    pub fn export(&self, result: &ConsolidatedResult) -> Result<ExportedDocument> {
        let started = Instant::now();

        if result.rows.len() + 1 > MAX_SHEET_ROWS {
            return Err(AppError::ExportError(format!(
                "{} rows exceed the worksheet limit of {}",
                result.rows.len(),
                MAX_SHEET_ROWS - 1
            )));
        }
        if result.schema.len() > MAX_SHEET_COLUMNS {
            return Err(AppError::ExportError(format!(
                "{} columns exceed the worksheet limit of {}",
                result.schema.len(),
                MAX_SHEET_COLUMNS
            )));
        }

        let bytes = self
            .build_workbook(result)
            .map_err(|e| AppError::ExportError(e.to_string()))?;

        info!(
            rows = result.rows.len(),
            columns = result.schema.len(),
            bytes = bytes.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Exported consolidated spreadsheet"
        );

        Ok(ExportedDocument::xlsx(self.filename.clone(), bytes))
    }

    fn build_workbook(&self, result: &ConsolidatedResult) -> std::result::Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();

        let (year, month, day) = FIXED_CREATION_DATE;
        let created = ExcelDateTime::from_ymd(year, month, day)?;
        let properties = DocProperties::new().set_creation_datetime(&created);
        workbook.set_properties(&properties);

        let header_format = Format::new().set_bold();

        {
            let sheet = workbook.add_worksheet();
            sheet.set_name(&self.sheet_name)?;
            write_headers(sheet, result.schema.columns(), &header_format)?;

            let mut row: u32 = 1;
            for record in &result.rows {
                for (col, value) in record.values().iter().enumerate() {
                    sheet.write_string(row, col as u16, value)?;
                }
                row += 1;
            }
        }

        workbook.save_to_buffer()
    }
}

fn write_headers(
    sheet: &mut Worksheet,
    headers: &[String],
    format: &Format,
) -> std::result::Result<(), XlsxError> {
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, header, format)?;
    }
    Ok(())
}
