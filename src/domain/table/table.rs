// ============================================================
// TABLE TYPES
// ============================================================
// Parsed tabular content: a shared schema plus positional rows

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::error::IngestError;

/// Column every input file must carry. Compared case-sensitively.
pub const KEYWORD_PHRASE_COLUMN: &str = "Keyword Phrase";

/// Ordered column names of a table plus the position of the keyword column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<String>,
    keyword_index: usize,
}

impl Schema {
    /// Validate a header record: unique names and a "Keyword Phrase" column.
    pub fn from_headers(columns: Vec<String>) -> Result<Self, IngestError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(IngestError::DuplicateColumn {
                    column: column.clone(),
                });
            }
        }

        let keyword_index = columns
            .iter()
            .position(|c| c == KEYWORD_PHRASE_COLUMN)
            .ok_or_else(|| IngestError::MissingColumn {
                column: KEYWORD_PHRASE_COLUMN.to_string(),
            })?;

        Ok(Self {
            columns,
            keyword_index,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn keyword_index(&self) -> usize {
        self.keyword_index
    }

    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Same schema with one more trailing column.
    pub fn with_trailing_column(&self, column: &str) -> Result<Self, IngestError> {
        if self.index_of(column).is_some() {
            return Err(IngestError::DuplicateColumn {
                column: column.to_string(),
            });
        }
        let mut columns = self.columns.clone();
        columns.push(column.to_string());
        Ok(Self {
            columns,
            keyword_index: self.keyword_index,
        })
    }
}

/// One data record. Values line up with the owning table's [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    values: Vec<String>,
}

impl Row {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    pub fn push(&mut self, value: String) {
        self.values.push(value);
    }

    pub fn into_values(self) -> Vec<String> {
        self.values
    }
}

/// Rows sharing one schema, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    schema: Arc<Schema>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(schema: Schema, rows: Vec<Row>) -> Self {
        Self {
            schema: Arc::new(schema),
            rows,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn shared_schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keyword Phrase value of `row`; empty when the row is short.
    pub fn keyword_phrase<'a>(&self, row: &'a Row) -> &'a str {
        row.get(self.schema.keyword_index()).unwrap_or("")
    }

    pub fn into_parts(self) -> (Arc<Schema>, Vec<Row>) {
        (self.schema, self.rows)
    }
}
