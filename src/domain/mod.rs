pub mod error;
pub mod keywords;
pub mod pipeline;
pub mod pipeline_config;

// Tabular input model
pub mod table;
