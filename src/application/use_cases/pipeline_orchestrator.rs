use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::application::use_cases::consolidator::Consolidator;
use crate::application::use_cases::row_filter::RowFilter;
use crate::domain::error::{AppError, Result};
use crate::domain::keywords::KeywordSet;
use crate::domain::pipeline::{PipelineFailure, PipelineReport, PipelineRun, PipelineStage};
use crate::domain::pipeline_config::PipelineConfig;
use crate::domain::table::InputFile;
use crate::infrastructure::keyword_store::KeywordStore;
use crate::infrastructure::xlsx::SpreadsheetExporter;

/// Sequences keyword lookup, consolidation and export for one invocation.
pub struct PipelineOrchestrator {
    store: Arc<dyn KeywordStore>,
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    pub fn new(store: Arc<dyn KeywordStore>, config: PipelineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn keywords(&self) -> Arc<KeywordSet> {
        self.store.get()
    }

    pub fn commit_keywords(&self, entries: &[String]) -> Result<Arc<KeywordSet>> {
        let before = self.store.get().len();
        let set = self.store.merge(entries)?;
        info!(
            submitted = entries.len(),
            added = set.len().saturating_sub(before),
            total = set.len(),
            "Merged negative keywords"
        );
        Ok(set)
    }

    pub fn replace_keywords(&self, entries: &[String]) -> Result<Arc<KeywordSet>> {
        let set = self.store.replace_all(entries)?;
        info!(total = set.len(), "Replaced negative keywords");
        Ok(set)
    }

    /// Run ingest, filter, consolidate and export against the committed keyword set.
    ///
    /// `files` is pulled one item at a time, so a lazily decoding iterator keeps only the
    /// current file in memory.
    pub fn process<I>(&self, files: I) -> std::result::Result<PipelineReport, PipelineFailure>
    where
        I: IntoIterator<Item = InputFile>,
        I::IntoIter: ExactSizeIterator,
    {
        let files = files.into_iter();
        let mut run = PipelineRun::start_at(PipelineStage::KeywordsCommitted);
        if let Err(error) = self.check_batch(files.len()) {
            return Err(self.fail(&mut run, error));
        }
        self.execute(run, files)
    }

    /// Commit `edits` first, then process `files` with the resulting set.
    pub fn run<I>(
        &self,
        edits: &[String],
        files: I,
    ) -> std::result::Result<PipelineReport, PipelineFailure>
    where
        I: IntoIterator<Item = InputFile>,
        I::IntoIter: ExactSizeIterator,
    {
        let files = files.into_iter();
        let mut run = PipelineRun::start_at(PipelineStage::ReceivingKeywords);
        if let Err(error) = self.check_batch(files.len()) {
            return Err(self.fail(&mut run, error));
        }
        if let Err(error) = self.commit_keywords(edits) {
            return Err(self.fail(&mut run, error));
        }
        if let Err(error) = run.advance(PipelineStage::KeywordsCommitted) {
            return Err(self.fail(&mut run, error));
        }
        self.execute(run, files)
    }

    fn check_batch(&self, file_count: usize) -> Result<()> {
        if file_count == 0 {
            return Err(AppError::ValidationError(
                "At least one file is required".to_string(),
            ));
        }
        if file_count > self.config.max_files {
            return Err(AppError::ValidationError(format!(
                "{} files submitted, at most {} allowed",
                file_count,
                self.config.max_files
            )));
        }
        Ok(())
    }

    fn execute<I>(
        &self,
        mut run: PipelineRun,
        files: I,
    ) -> std::result::Result<PipelineReport, PipelineFailure>
    where
        I: ExactSizeIterator<Item = InputFile>,
    {
        let started = Instant::now();
        let file_count = files.len();

        match self.stages(&mut run, files) {
            Ok(mut report) => {
                report.stages = run.visited().to_vec();
                info!(
                    files = file_count,
                    skipped = report.failures.len(),
                    rows = report.row_count,
                    keywords = report.keyword_count,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Pipeline finished"
                );
                Ok(report)
            }
            Err(error) => Err(self.fail(&mut run, error)),
        }
    }

    fn stages<I>(&self, run: &mut PipelineRun, files: I) -> Result<PipelineReport>
    where
        I: Iterator<Item = InputFile>,
    {
        let keywords = self.store.get();

        run.advance(PipelineStage::Ingesting)?;
        let consolidator = Consolidator::new(&self.config);

        run.advance(PipelineStage::Filtering)?;
        let filter = RowFilter::new(Arc::clone(&keywords), self.config.match_mode)?;

        run.advance(PipelineStage::Consolidating)?;
        let result = consolidator.run(files, &filter)?;

        run.advance(PipelineStage::Exporting)?;
        let exporter =
            SpreadsheetExporter::new(&self.config.sheet_name, &self.config.output_filename);
        let document = exporter.export(&result)?;

        run.advance(PipelineStage::Done)?;
        Ok(PipelineReport {
            document,
            row_count: result.rows.len(),
            failures: result.failures,
            stats: result.stats,
            keyword_count: keywords.len(),
            stages: Vec::new(),
        })
    }

    fn fail(&self, run: &mut PipelineRun, error: AppError) -> PipelineFailure {
        let failure = run.fail(error);
        warn!(stage = %failure.stage, "Pipeline failed: {}", failure.error);
        failure
    }
}
