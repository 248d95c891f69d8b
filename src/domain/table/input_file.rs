// ============================================================
// INPUT FILE
// ============================================================
// One uploaded file: a name plus its raw bytes

use std::path::Path;

/// Leading bytes of every ZIP container (and therefore every .xlsx workbook).
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// How the bytes of an [`InputFile`] should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Delimited text; `None` means the delimiter must be detected.
    Delimited(Option<u8>),
    Workbook,
}

/// Raw file submitted to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub name: String,
    pub content: Vec<u8>,
    /// Explicitly declared delimiter, overrides detection.
    pub delimiter: Option<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            delimiter: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    /// Resolve the format: declared delimiter, then extension, then content sniffing.
    pub fn format(&self) -> FileFormat {
        if let Some(delimiter) = self.delimiter {
            return FileFormat::Delimited(Some(delimiter));
        }

        match self.extension().as_deref() {
            Some("xlsx") | Some("xlsm") => FileFormat::Workbook,
            Some("tsv") | Some("tab") => FileFormat::Delimited(Some(b'\t')),
            Some("csv") => FileFormat::Delimited(Some(b',')),
            _ if self.content.starts_with(ZIP_MAGIC) => FileFormat::Workbook,
            _ => FileFormat::Delimited(None),
        }
    }
}
