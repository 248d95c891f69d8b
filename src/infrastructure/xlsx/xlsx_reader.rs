//! Workbook input: the first worksheet read as a header row plus data rows.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};

use crate::domain::error::IngestError;
use crate::domain::table::{Row, Schema, Table};

/// Read the first worksheet of an `.xlsx` workbook held in memory.
///
/// Every cell becomes a string: empty cells read as `""`, numbers use their shortest
/// display form. Rows whose cells are all empty are skipped, since the xlsx format does
/// not record them.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Table, IngestError> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| IngestError::Unreadable {
            reason: format!("failed to open workbook: {}", e),
        })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::Unreadable {
            reason: "workbook has no worksheet".to_string(),
        })?
        .map_err(|e| IngestError::Unreadable {
            reason: format!("failed to read worksheet: {}", e),
        })?;

    let mut records = range
        .rows()
        .filter(|cells| cells.iter().any(|c| !matches!(c, Data::Empty)));

    let headers = match records.next() {
        Some(cells) => cells
            .iter()
            .map(|c| cell_to_string(c).trim().to_string())
            .collect(),
        None => Vec::new(),
    };
    let schema = Schema::from_headers(headers)?;

    let rows = records
        .map(|cells| Row::new(cells.iter().map(cell_to_string).collect()))
        .collect();

    Ok(Table::new(schema, rows))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => unescape_ooxml(s),
        other => other.to_string(),
    }
}

/// Decode `_xHHHH_` escapes that writers use for control characters and for literal
/// `_x...` text (`_x005F_` is an escaped underscore).
fn unescape_ooxml(value: &str) -> String {
    if !value.contains("_x") {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find("_x") {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        let decoded = candidate
            .get(2..6)
            .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .filter(|_| candidate.as_bytes().get(6) == Some(&b'_'))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);

        match decoded {
            Some(c) => {
                out.push(c);
                rest = &candidate[7..];
            }
            None => {
                out.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }
    out.push_str(rest);
    out
}
