// ============================================================
// CSV PARSER
// ============================================================
// Parse delimited text into a validated Table

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::domain::error::IngestError;
use crate::domain::table::{Row, Schema, Table};

/// Delimiters tried by [`CsvParser::detect_delimiter`], in tie-break order.
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Delimited-text parser
pub struct CsvParser {
    /// Delimiter byte; `None` means detect from content
    delimiter: Option<u8>,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self { delimiter: None }
    }
}

impl CsvParser {
    /// Create a parser that detects the delimiter
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Parse decoded text. The first record is the header and defines the schema.
    ///
    /// Header names are trimmed; cell values are kept verbatim. Blank lines, including
    /// lines holding only whitespace, are skipped.
    pub fn parse_content(&self, content: &str) -> Result<Table, IngestError> {
        let delimiter = self
            .delimiter
            .unwrap_or_else(|| Self::detect_delimiter(content));

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .trim(Trim::Headers)
            .flexible(true) // field counts are checked below with line numbers
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| IngestError::Unreadable {
                reason: format!("failed to read header: {}", e),
            })?
            .clone();

        let schema = Schema::from_headers(headers.iter().map(str::to_string).collect())?;

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| IngestError::Unreadable {
                reason: format!("failed to read record: {}", e),
            })?;
            if Self::is_blank_line(&record) {
                continue;
            }
            rows.push(Self::parse_row(&schema, &record)?);
        }

        Ok(Table::new(schema, rows))
    }

    fn is_blank_line(record: &StringRecord) -> bool {
        record.len() == 1 && record[0].trim().is_empty()
    }

    /// Convert one record, rejecting it when its width differs from the header's
    fn parse_row(schema: &Schema, record: &StringRecord) -> Result<Row, IngestError> {
        if record.len() != schema.len() {
            return Err(IngestError::MalformedRecord {
                line: record.position().map(|p| p.line()).unwrap_or(0),
                expected: schema.len(),
                found: record.len(),
            });
        }
        Ok(Row::new(record.iter().map(str::to_string).collect()))
    }

    /// Detect delimiter from content (comma, semicolon, tab, pipe)
    ///
    /// A header with none of the candidates is a single-column file, which falls back to
    /// comma whatever the data rows contain.
    pub fn detect_delimiter(content: &str) -> u8 {
        let sample_lines: Vec<&str> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .take(10)
            .collect();

        let Some(header) = sample_lines.first() else {
            return b',';
        };
        if !header.bytes().any(|b| DELIMITER_CANDIDATES.contains(&b)) {
            return b',';
        }

        let mut best_delimiter = b',';
        let mut best_score = 0.0f32;

        for &delimiter in &DELIMITER_CANDIDATES {
            let field_counts: Vec<usize> = sample_lines
                .iter()
                .map(|line| line.bytes().filter(|&b| b == delimiter).count())
                .collect();

            // Score by consistency (low standard deviation) and frequency
            let avg = field_counts.iter().sum::<usize>() as f32 / field_counts.len() as f32;
            let variance = field_counts
                .iter()
                .map(|&x| (x as f32 - avg).powi(2))
                .sum::<f32>()
                / field_counts.len() as f32;

            let score = avg / (1.0 + variance.sqrt());

            if score > best_score {
                best_score = score;
                best_delimiter = delimiter;
            }
        }

        best_delimiter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_csv() {
        let content = "Keyword Phrase,Search Volume\nred shoes,100\nblue hat,20";
        let table = CsvParser::new().parse_content(content).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.schema().columns(), ["Keyword Phrase", "Search Volume"]);
        assert_eq!(table.keyword_phrase(&table.rows()[0]), "red shoes");
        assert_eq!(table.rows()[1].values(), ["blue hat", "20"]);
    }

    #[test]
    fn test_missing_keyword_column() {
        let err = CsvParser::new()
            .parse_content("Keyword,Volume\nred,1")
            .unwrap_err();
        assert_eq!(err.kind(), "MissingColumnError");
    }

    #[test]
    fn test_keyword_column_is_case_sensitive() {
        let err = CsvParser::new()
            .parse_content("keyword phrase,Volume\nred,1")
            .unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn { .. }));
    }

    #[test]
    fn test_empty_content_has_no_keyword_column() {
        let err = CsvParser::new().parse_content("").unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn { .. }));
    }

    #[test]
    fn test_malformed_record_reports_line() {
        let content = "Keyword Phrase,Volume\nred shoes,100\nblue hat,20,extra\n";
        let err = CsvParser::new()
            .with_delimiter(b',')
            .parse_content(content)
            .unwrap_err();
        assert_eq!(
            err,
            IngestError::MalformedRecord {
                line: 3,
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn test_blank_phrases_are_retained() {
        let content = "Keyword Phrase,Volume\n,5\n   ,6\nhat,7";
        let table = CsvParser::new()
            .with_delimiter(b',')
            .parse_content(content)
            .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.keyword_phrase(&table.rows()[0]), "");
        assert_eq!(table.keyword_phrase(&table.rows()[1]), "   ");
    }

    #[test]
    fn test_headers_trimmed_values_verbatim() {
        let content = " Keyword Phrase , Volume\n  padded  ,1";
        let table = CsvParser::new()
            .with_delimiter(b',')
            .parse_content(content)
            .unwrap();
        assert_eq!(table.schema().columns(), ["Keyword Phrase", "Volume"]);
        assert_eq!(table.rows()[0].values(), ["  padded  ", "1"]);
    }

    #[test]
    fn test_quoted_fields_with_delimiters() {
        let content = "Keyword Phrase,Notes\n\"shoes, red\",\"say \"\"hi\"\"\"";
        let table = CsvParser::new()
            .with_delimiter(b',')
            .parse_content(content)
            .unwrap();
        assert_eq!(table.rows()[0].values(), ["shoes, red", "say \"hi\""]);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(CsvParser::detect_delimiter("a,b,c\nd,e,f"), b',');
        assert_eq!(CsvParser::detect_delimiter("a;b;c\nd;e;f"), b';');
        assert_eq!(CsvParser::detect_delimiter("a\tb\tc\nd\te\tf"), b'\t');
        assert_eq!(CsvParser::detect_delimiter(""), b',');
    }

    #[test]
    fn test_single_column_header_falls_back_to_comma() {
        let content = "Keyword Phrase\nfoo; bar\nbaz; qux\nplain\n";
        assert_eq!(CsvParser::detect_delimiter(content), b',');

        let table = CsvParser::new().parse_content(content).unwrap();
        assert_eq!(table.schema().columns(), ["Keyword Phrase"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[0].values(), ["foo; bar"]);
        assert_eq!(table.rows()[2].values(), ["plain"]);
    }

    #[test]
    fn test_whitespace_only_lines_are_skipped() {
        let content = "Keyword Phrase,Volume\nred,1\n   \n\t\nblue,2\n  \n";
        let table = CsvParser::new().parse_content(content).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].values(), ["red", "1"]);
        assert_eq!(table.rows()[1].values(), ["blue", "2"]);
    }

    #[test]
    fn test_detected_tab_delimiter_parses() {
        let content = "Keyword Phrase\tVolume\nred shoes\t100";
        let table = CsvParser::new().parse_content(content).unwrap();
        assert_eq!(table.rows()[0].values(), ["red shoes", "100"]);
    }
}
