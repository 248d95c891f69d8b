//! Pipeline results and the per-invocation state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::domain::error::{AppError, FileFailure};
use crate::domain::table::{Row, Schema};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Row accounting for one accepted file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    pub file: String,
    pub rows_read: usize,
    pub dropped_by_keyword: usize,
    pub dropped_blank: usize,
    pub dropped_duplicate: usize,
    pub rows_kept: usize,
}

/// Surviving rows of a batch plus what was skipped along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedResult {
    pub schema: Arc<Schema>,
    pub rows: Vec<Row>,
    pub failures: Vec<FileFailure>,
    pub stats: Vec<FileStats>,
}

impl ConsolidatedResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Finished spreadsheet ready for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Arc<[u8]>,
}

impl ExportedDocument {
    pub fn xlsx(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: XLSX_CONTENT_TYPE,
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    ReceivingKeywords,
    KeywordsCommitted,
    Ingesting,
    Filtering,
    Consolidating,
    Exporting,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }

    /// The only forward move out of `self`. Terminal stages have none.
    pub fn next(self) -> Option<PipelineStage> {
        match self {
            PipelineStage::ReceivingKeywords => Some(PipelineStage::KeywordsCommitted),
            PipelineStage::KeywordsCommitted => Some(PipelineStage::Ingesting),
            PipelineStage::Ingesting => Some(PipelineStage::Filtering),
            PipelineStage::Filtering => Some(PipelineStage::Consolidating),
            PipelineStage::Consolidating => Some(PipelineStage::Exporting),
            PipelineStage::Exporting => Some(PipelineStage::Done),
            PipelineStage::Done | PipelineStage::Failed => None,
        }
    }

    pub fn can_transition_to(self, to: PipelineStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == PipelineStage::Failed || self.next() == Some(to)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::ReceivingKeywords => "ReceivingKeywords",
            PipelineStage::KeywordsCommitted => "KeywordsCommitted",
            PipelineStage::Ingesting => "Ingesting",
            PipelineStage::Filtering => "Filtering",
            PipelineStage::Consolidating => "Consolidating",
            PipelineStage::Exporting => "Exporting",
            PipelineStage::Done => "Done",
            PipelineStage::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}

/// Tracks the stage of one invocation and refuses out-of-order moves.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    stage: PipelineStage,
    visited: Vec<PipelineStage>,
}

impl PipelineRun {
    pub fn start_at(stage: PipelineStage) -> Self {
        Self {
            stage,
            visited: vec![stage],
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn visited(&self) -> &[PipelineStage] {
        &self.visited
    }

    pub fn advance(&mut self, to: PipelineStage) -> Result<(), AppError> {
        if !self.stage.can_transition_to(to) {
            return Err(AppError::Internal(format!(
                "illegal pipeline transition {} -> {}",
                self.stage, to
            )));
        }
        tracing::debug!(from = %self.stage, to = %to, "pipeline stage transition");
        self.stage = to;
        self.visited.push(to);
        Ok(())
    }

    /// Move to `Failed` and wrap `error` with the stage it happened in.
    pub fn fail(&mut self, error: AppError) -> PipelineFailure {
        let stage = self.stage;
        if !stage.is_terminal() {
            self.stage = PipelineStage::Failed;
            self.visited.push(PipelineStage::Failed);
        }
        PipelineFailure { stage, error }
    }
}

/// Successful invocation.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub document: ExportedDocument,
    pub failures: Vec<FileFailure>,
    pub stats: Vec<FileStats>,
    pub keyword_count: usize,
    pub row_count: usize,
    pub stages: Vec<PipelineStage>,
}

/// Terminal failure of an invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineFailure {
    /// Stage that was active when the error surfaced.
    pub stage: PipelineStage,
    pub error: AppError,
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (during {})", self.error, self.stage)
    }
}

impl std::error::Error for PipelineFailure {}

impl From<PipelineFailure> for AppError {
    fn from(failure: PipelineFailure) -> Self {
        failure.error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_only_transitions() {
        let mut run = PipelineRun::start_at(PipelineStage::ReceivingKeywords);
        for stage in [
            PipelineStage::KeywordsCommitted,
            PipelineStage::Ingesting,
            PipelineStage::Filtering,
            PipelineStage::Consolidating,
            PipelineStage::Exporting,
            PipelineStage::Done,
        ] {
            run.advance(stage).unwrap();
        }
        assert_eq!(run.stage(), PipelineStage::Done);
        assert_eq!(run.visited().len(), 7);
        assert!(run.advance(PipelineStage::Failed).is_err());
    }

    #[test]
    fn test_skipping_a_stage_is_rejected() {
        let mut run = PipelineRun::start_at(PipelineStage::KeywordsCommitted);
        let err = run.advance(PipelineStage::Exporting).unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(run.stage(), PipelineStage::KeywordsCommitted);
    }

    #[test]
    fn test_fail_records_origin_stage() {
        let mut run = PipelineRun::start_at(PipelineStage::KeywordsCommitted);
        run.advance(PipelineStage::Ingesting).unwrap();
        let failure = run.fail(AppError::ExportError("boom".to_string()));
        assert_eq!(failure.stage, PipelineStage::Ingesting);
        assert_eq!(run.stage(), PipelineStage::Failed);
        assert_eq!(run.visited().last(), Some(&PipelineStage::Failed));
    }
}
