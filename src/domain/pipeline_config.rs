// ============================================================
// PIPELINE CONFIGURATION
// ============================================================
// Knobs for filtering, consolidation and export

use serde::{Deserialize, Serialize};

/// Characters Excel refuses in worksheet names.
const INVALID_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// How negative keywords are matched against a Keyword Phrase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Case-sensitive substring: "shoe" drops "running shoes".
    #[default]
    Substring,
    /// Whole word, case-insensitive. Keeps more rows than `Substring`; opt-in only.
    LegacyWord,
}

/// Configuration for one pipeline invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub match_mode: MatchMode,

    /// Drop rows whose Keyword Phrase is empty or whitespace (default: false)
    pub drop_blank_phrases: bool,

    /// Keep only the first row for each exact Keyword Phrase across the batch (default: false)
    pub dedupe_keyword_phrases: bool,

    /// When set, append a column with this name holding each row's file name
    pub source_column: Option<String>,

    /// Worksheet name of the exported document
    pub sheet_name: String,

    /// Download name of the exported document
    pub output_filename: String,

    /// Maximum number of files per batch
    pub max_files: usize,

    /// Maximum size of a single file in bytes
    pub max_file_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            match_mode: MatchMode::Substring,
            drop_blank_phrases: false,
            dedupe_keyword_phrases: false,
            source_column: None,
            sheet_name: "Consolidated".to_string(),
            output_filename: "combined_spreadsheet.xlsx".to_string(),
            max_files: 50,
            max_file_bytes: 25 * 1024 * 1024, // 25MB
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.max_files == 0 {
            return Err("max_files must be > 0".to_string());
        }
        if self.max_file_bytes == 0 {
            return Err("max_file_bytes must be > 0".to_string());
        }
        if self.sheet_name.trim().is_empty() {
            return Err("sheet_name must not be empty".to_string());
        }
        if self.sheet_name.chars().count() > 31 {
            return Err("sheet_name must be at most 31 characters".to_string());
        }
        if self.sheet_name.contains(&INVALID_SHEET_CHARS[..]) {
            return Err("sheet_name must not contain any of [ ] : * ? / \\".to_string());
        }
        if self.output_filename.trim().is_empty() {
            return Err("output_filename must not be empty".to_string());
        }
        if let Some(column) = &self.source_column {
            if column.trim().is_empty() {
                return Err("source_column must not be empty when set".to_string());
            }
        }
        Ok(())
    }
}
