pub mod use_cases;

pub use use_cases::consolidator::Consolidator;
pub use use_cases::pipeline_orchestrator::PipelineOrchestrator;
pub use use_cases::row_filter::RowFilter;
