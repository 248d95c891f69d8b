pub mod config;
pub mod csv;
pub mod keyword_store;
pub mod storage;
pub mod table_ingestor;
pub mod xlsx;
