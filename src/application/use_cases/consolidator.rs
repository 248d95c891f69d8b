use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::use_cases::row_filter::RowFilter;
use crate::domain::error::{AppError, FileFailure, IngestError, Result};
use crate::domain::pipeline::{ConsolidatedResult, FileStats};
use crate::domain::pipeline_config::PipelineConfig;
use crate::domain::table::{InputFile, Row, Schema, Table};
use crate::infrastructure::table_ingestor::TableIngestor;

/// Ingests, filters and concatenates a batch of files in submission order.
///
/// The first file that parses fixes the batch schema. Later files whose ordered column
/// list differs are skipped with `SchemaMismatch`. Files are consumed one at a time and
/// their bytes are released as soon as they are parsed.
pub struct Consolidator {
    ingestor: TableIngestor,
    drop_blank_phrases: bool,
    dedupe_keyword_phrases: bool,
    source_column: Option<String>,
}

impl Consolidator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            ingestor: TableIngestor::new(config.max_file_bytes),
            drop_blank_phrases: config.drop_blank_phrases,
            dedupe_keyword_phrases: config.dedupe_keyword_phrases,
            source_column: config.source_column.clone(),
        }
    }

    pub fn run<I>(&self, files: I, filter: &RowFilter) -> Result<ConsolidatedResult>
    where
        I: IntoIterator<Item = InputFile>,
    {
        let mut batch = Batch::default();

        for file in files {
            let name = file.name.clone();
            let parsed = self.ingestor.parse(&file);
            drop(file);

            let table = match parsed.and_then(|table| self.accept(&batch, table)) {
                Ok(table) => table,
                Err(error) => {
                    warn!(file = %name, kind = error.kind(), "Skipping file: {}", error);
                    batch.failures.push(FileFailure::new(name, error));
                    continue;
                }
            };

            let stats = self.append(&mut batch, &name, table, filter);
            debug!(
                file = %stats.file,
                rows_read = stats.rows_read,
                rows_kept = stats.rows_kept,
                "Consolidated file"
            );
            batch.stats.push(stats);
        }

        let Some(file_schema) = batch.schema else {
            return Err(AppError::AllFilesFailed(batch.failures));
        };

        let schema = match &self.source_column {
            Some(column) => Arc::new(
                file_schema
                    .with_trailing_column(column)
                    .map_err(|e| AppError::Internal(e.to_string()))?,
            ),
            None => file_schema,
        };

        Ok(ConsolidatedResult {
            schema,
            rows: batch.rows,
            failures: batch.failures,
            stats: batch.stats,
        })
    }

    /// Per-file checks that depend on the batch rather than on the file alone.
    fn accept(&self, batch: &Batch, table: Table) -> std::result::Result<Table, IngestError> {
        if let Some(column) = &self.source_column {
            if table.schema().index_of(column).is_some() {
                return Err(IngestError::DuplicateColumn {
                    column: column.clone(),
                });
            }
        }

        if let Some(schema) = &batch.schema {
            if schema.columns() != table.schema().columns() {
                return Err(IngestError::SchemaMismatch {
                    expected: schema.columns().to_vec(),
                    found: table.schema().columns().to_vec(),
                });
            }
        }

        Ok(table)
    }

    fn append(&self, batch: &mut Batch, name: &str, table: Table, filter: &RowFilter) -> FileStats {
        let (schema, rows) = table.into_parts();
        let keyword_index = schema.keyword_index();
        if batch.schema.is_none() {
            batch.schema = Some(schema);
        }

        let mut stats = FileStats {
            file: name.to_string(),
            rows_read: rows.len(),
            ..Default::default()
        };

        for mut row in rows {
            let phrase = row.get(keyword_index).unwrap_or("");

            if !filter.should_keep(phrase) {
                stats.dropped_by_keyword += 1;
                continue;
            }
            if self.drop_blank_phrases && phrase.trim().is_empty() {
                stats.dropped_blank += 1;
                continue;
            }
            if self.dedupe_keyword_phrases && !batch.seen_phrases.insert(phrase.to_string()) {
                stats.dropped_duplicate += 1;
                continue;
            }

            if self.source_column.is_some() {
                row.push(name.to_string());
            }
            batch.rows.push(row);
            stats.rows_kept += 1;
        }

        stats
    }
}

#[derive(Default)]
struct Batch {
    schema: Option<Arc<Schema>>,
    rows: Vec<Row>,
    failures: Vec<FileFailure>,
    stats: Vec<FileStats>,
    seen_phrases: HashSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::keywords::KeywordSet;
    use crate::domain::pipeline_config::MatchMode;

    fn filter(keywords: &[&str]) -> RowFilter {
        RowFilter::new(
            Arc::new(KeywordSet::normalized(keywords)),
            MatchMode::Substring,
        )
        .unwrap()
    }

    fn phrases(result: &ConsolidatedResult) -> Vec<String> {
        let index = result.schema.keyword_index();
        result
            .rows
            .iter()
            .map(|row| row.get(index).unwrap_or("").to_string())
            .collect()
    }

    #[test]
    fn test_filters_and_concatenates_in_order() {
        let files = vec![
            InputFile::new("file1.csv", "Keyword Phrase\nred shoes\nblue hat\n"),
            InputFile::new("file2.csv", "Keyword Phrase\nred socks\n"),
        ];
        let result = Consolidator::new(&PipelineConfig::default())
            .run(files, &filter(&["red"]))
            .unwrap();

        assert_eq!(phrases(&result), ["blue hat"]);
        assert!(result.failures.is_empty());
        assert_eq!(result.stats.len(), 2);
        assert_eq!(result.stats[0].dropped_by_keyword, 1);
        assert_eq!(result.stats[1].rows_kept, 0);
    }

    #[test]
    fn test_missing_column_in_only_file_fails_batch() {
        let files = vec![InputFile::new("bad.csv", "Phrase,Volume\nred shoes,1\n")];
        let err = Consolidator::new(&PipelineConfig::default())
            .run(files, &filter(&[]))
            .unwrap_err();

        match err {
            AppError::AllFilesFailed(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].file, "bad.csv");
                assert_eq!(failures[0].error.kind(), "MissingColumnError");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_schema_mismatch_skips_only_that_file() {
        let files = vec![
            InputFile::new("one.csv", "Keyword Phrase,Volume\nalpha,1\n"),
            InputFile::new("two.csv", "Keyword Phrase,Clicks\nbeta,2\n"),
            InputFile::new("three.csv", "Keyword Phrase,Volume\ngamma,3\n"),
        ];
        let result = Consolidator::new(&PipelineConfig::default())
            .run(files, &filter(&[]))
            .unwrap();

        assert_eq!(phrases(&result), ["alpha", "gamma"]);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].file, "two.csv");
        assert_eq!(result.failures[0].error.kind(), "SchemaMismatchError");
        assert_eq!(result.schema.columns(), ["Keyword Phrase", "Volume"]);
    }

    #[test]
    fn test_column_order_matters_for_schema() {
        let files = vec![
            InputFile::new("one.csv", "Keyword Phrase,Volume\nalpha,1\n"),
            InputFile::new("two.csv", "Volume,Keyword Phrase\n2,beta\n"),
        ];
        let result = Consolidator::new(&PipelineConfig::default())
            .run(files, &filter(&[]))
            .unwrap();
        assert_eq!(phrases(&result), ["alpha"]);
        assert_eq!(result.failures[0].error.kind(), "SchemaMismatchError");
    }

    #[test]
    fn test_failed_first_file_does_not_fix_schema() {
        let files = vec![
            InputFile::new("broken.csv", "Keyword Phrase,Volume\nalpha,1,extra\n"),
            InputFile::new("ok.csv", "Keyword Phrase\nbeta\n"),
        ];
        let result = Consolidator::new(&PipelineConfig::default())
            .run(files, &filter(&[]))
            .unwrap();
        assert_eq!(phrases(&result), ["beta"]);
        assert_eq!(result.failures[0].error.kind(), "MalformedRecordError");
    }

    #[test]
    fn test_header_only_file_is_accepted() {
        let files = vec![InputFile::new("empty.csv", "Keyword Phrase,Volume\n")];
        let result = Consolidator::new(&PipelineConfig::default())
            .run(files, &filter(&[]))
            .unwrap();
        assert!(result.rows.is_empty());
        assert_eq!(result.schema.columns(), ["Keyword Phrase", "Volume"]);
    }

    #[test]
    fn test_blank_phrases_kept_by_default() {
        let files = vec![InputFile::new("a.csv", "Keyword Phrase,Volume\n,1\nhat,2\n")];
        let result = Consolidator::new(&PipelineConfig::default())
            .run(files, &filter(&["red"]))
            .unwrap();
        assert_eq!(phrases(&result), ["", "hat"]);
    }

    #[test]
    fn test_optional_blank_and_duplicate_policies() {
        let config = PipelineConfig {
            drop_blank_phrases: true,
            dedupe_keyword_phrases: true,
            ..Default::default()
        };
        let files = vec![
            InputFile::new("a.csv", "Keyword Phrase,Volume\nhat,1\n  ,2\nhat,3\n"),
            InputFile::new("b.csv", "Keyword Phrase,Volume\nhat,4\ncap,5\n"),
        ];
        let result = Consolidator::new(&config).run(files, &filter(&[])).unwrap();

        assert_eq!(phrases(&result), ["hat", "cap"]);
        assert_eq!(result.rows[0].values(), ["hat", "1"]);
        assert_eq!(result.stats[0].dropped_blank, 1);
        assert_eq!(result.stats[0].dropped_duplicate, 1);
        assert_eq!(result.stats[1].dropped_duplicate, 1);
    }

    #[test]
    fn test_source_column_is_appended() {
        let config = PipelineConfig {
            source_column: Some("Source File".to_string()),
            ..Default::default()
        };
        let files = vec![
            InputFile::new("a.csv", "Keyword Phrase\nhat\n"),
            InputFile::new("b.csv", "Keyword Phrase,Source File\ncap,x\n"),
            InputFile::new("c.csv", "Keyword Phrase\nscarf\n"),
        ];
        let result = Consolidator::new(&config).run(files, &filter(&[])).unwrap();

        assert_eq!(result.schema.columns(), ["Keyword Phrase", "Source File"]);
        assert_eq!(result.rows[0].values(), ["hat", "a.csv"]);
        assert_eq!(result.rows[1].values(), ["scarf", "c.csv"]);
        assert_eq!(result.failures[0].error.kind(), "DuplicateColumnError");
    }

    #[test]
    fn test_empty_batch_is_all_failed() {
        let err = Consolidator::new(&PipelineConfig::default())
            .run(Vec::<InputFile>::new(), &filter(&[]))
            .unwrap_err();
        assert_eq!(err, AppError::AllFilesFailed(Vec::new()));
    }
}
