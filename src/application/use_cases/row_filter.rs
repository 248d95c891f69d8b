//! Negative-keyword row filter.
//!
//! The default policy is a case-sensitive substring test: a row is dropped when its
//! Keyword Phrase contains any negative keyword verbatim ("shoe" drops "running shoes",
//! "Shoe" does not). `MatchMode::LegacyWord` switches to whole-word, case-insensitive
//! matching and is only used when configured explicitly.

use std::sync::Arc;

use regex::{Regex, RegexBuilder};

use crate::domain::error::{AppError, Result};
use crate::domain::keywords::KeywordSet;
use crate::domain::pipeline_config::MatchMode;
use crate::domain::table::{Row, Table};

/// Case-sensitive substring decision for a single phrase.
pub fn should_keep(phrase: &str, keywords: &KeywordSet) -> bool {
    !keywords.iter().any(|keyword| phrase.contains(keyword))
}

pub struct RowFilter {
    keywords: Arc<KeywordSet>,
    mode: MatchMode,
    word_pattern: Option<Regex>,
}

impl RowFilter {
    pub fn new(keywords: Arc<KeywordSet>, mode: MatchMode) -> Result<Self> {
        // The store never hands out an empty keyword; an empty one would drop every row.
        debug_assert!(!keywords.contains(""), "keyword set holds an empty entry");

        let word_pattern = match mode {
            MatchMode::LegacyWord if !keywords.is_empty() => {
                Some(build_word_pattern(&keywords)?)
            }
            _ => None,
        };

        Ok(Self {
            keywords,
            mode,
            word_pattern,
        })
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn should_keep(&self, phrase: &str) -> bool {
        match self.mode {
            MatchMode::Substring => should_keep(phrase, &self.keywords),
            MatchMode::LegacyWord => match &self.word_pattern {
                Some(pattern) => !pattern.is_match(phrase),
                None => true,
            },
        }
    }

    pub fn should_keep_row(&self, table: &Table, row: &Row) -> bool {
        self.should_keep(table.keyword_phrase(row))
    }
}

fn build_word_pattern(keywords: &KeywordSet) -> Result<Regex> {
    let alternation = keywords
        .iter()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");

    RegexBuilder::new(&format!(r"\b(?:{})\b", alternation))
        .case_insensitive(true)
        .size_limit(64 * 1024 * 1024)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to compile keyword pattern: {}", e)))
}
