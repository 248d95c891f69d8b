use tracing::debug;

use crate::domain::error::IngestError;
use crate::domain::table::{FileFormat, InputFile, Table};
use crate::infrastructure::csv::{decode_text, CsvParser};
use crate::infrastructure::xlsx::read_first_sheet;

/// Parses one raw [`InputFile`] into a validated [`Table`].
#[derive(Debug, Clone)]
pub struct TableIngestor {
    max_file_bytes: usize,
}

impl TableIngestor {
    pub fn new(max_file_bytes: usize) -> Self {
        Self { max_file_bytes }
    }

    pub fn parse(&self, file: &InputFile) -> Result<Table, IngestError> {
        if file.content.len() > self.max_file_bytes {
            return Err(IngestError::Unreadable {
                reason: format!(
                    "file is {} bytes, limit is {}",
                    file.content.len(),
                    self.max_file_bytes
                ),
            });
        }

        match file.format() {
            FileFormat::Workbook => {
                debug!(file = %file.name, "Reading workbook");
                read_first_sheet(&file.content)
            }
            FileFormat::Delimited(delimiter) => {
                let decoded = decode_text(&file.content);
                debug!(
                    file = %file.name,
                    encoding = decoded.encoding,
                    delimiter = ?delimiter.map(char::from),
                    "Reading delimited text"
                );
                let parser = match delimiter {
                    Some(d) => CsvParser::new().with_delimiter(d),
                    None => CsvParser::new(),
                };
                parser.parse_content(&decoded.text)
            }
        }
    }
}
