pub mod consolidator;
pub mod pipeline_orchestrator;
pub mod row_filter;
