use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppError {
    Internal(String),
    ValidationError(String),
    /// Zero files in a batch produced a usable table.
    AllFilesFailed(Vec<FileFailure>),
    PersistenceError(String),
    ExportError(String),
    IoError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::AllFilesFailed(failures) => {
                write!(f, "No usable files in batch")?;
                for failure in failures {
                    write!(f, "; {}: {}", failure.file, failure.error)?;
                }
                Ok(())
            }
            AppError::PersistenceError(msg) => write!(f, "Persistence error: {}", msg),
            AppError::ExportError(msg) => write!(f, "Export error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Per-file ingestion problem. Never fatal to a batch on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IngestError {
    MissingColumn { column: String },
    MalformedRecord { line: u64, expected: usize, found: usize },
    SchemaMismatch { expected: Vec<String>, found: Vec<String> },
    DuplicateColumn { column: String },
    Unreadable { reason: String },
}

impl IngestError {
    /// Stable kind label used in reports and HTTP headers.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::MissingColumn { .. } => "MissingColumnError",
            IngestError::MalformedRecord { .. } => "MalformedRecordError",
            IngestError::SchemaMismatch { .. } => "SchemaMismatchError",
            IngestError::DuplicateColumn { .. } => "DuplicateColumnError",
            IngestError::Unreadable { .. } => "UnreadableFileError",
        }
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::MissingColumn { column } => {
                write!(f, "required column '{}' not found in header", column)
            }
            IngestError::MalformedRecord {
                line,
                expected,
                found,
            } => write!(
                f,
                "record on line {} has {} fields, header has {}",
                line, found, expected
            ),
            IngestError::SchemaMismatch { expected, found } => write!(
                f,
                "columns [{}] do not match batch schema [{}]",
                found.join(", "),
                expected.join(", ")
            ),
            IngestError::DuplicateColumn { column } => {
                write!(f, "column '{}' appears more than once", column)
            }
            IngestError::Unreadable { reason } => write!(f, "unreadable file: {}", reason),
        }
    }
}

impl std::error::Error for IngestError {}

/// A file that was skipped, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub file: String,
    pub error: IngestError,
}

impl FileFailure {
    pub fn new(file: impl Into<String>, error: IngestError) -> Self {
        Self {
            file: file.into(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_error_kinds() {
        let missing = IngestError::MissingColumn {
            column: "Keyword Phrase".to_string(),
        };
        assert_eq!(missing.kind(), "MissingColumnError");
        assert!(missing.to_string().contains("Keyword Phrase"));

        let malformed = IngestError::MalformedRecord {
            line: 3,
            expected: 2,
            found: 3,
        };
        assert_eq!(malformed.kind(), "MalformedRecordError");
        assert_eq!(
            malformed.to_string(),
            "record on line 3 has 3 fields, header has 2"
        );
    }

    #[test]
    fn test_all_files_failed_lists_each_file() {
        let err = AppError::AllFilesFailed(vec![
            FileFailure::new(
                "a.csv",
                IngestError::MissingColumn {
                    column: "Keyword Phrase".to_string(),
                },
            ),
            FileFailure::new(
                "b.csv",
                IngestError::Unreadable {
                    reason: "empty".to_string(),
                },
            ),
        ]);
        let message = err.to_string();
        assert!(message.starts_with("No usable files in batch"));
        assert!(message.contains("a.csv"));
        assert!(message.contains("b.csv"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: AppError = io.into();
        assert!(matches!(err, AppError::IoError(_)));
    }
}
