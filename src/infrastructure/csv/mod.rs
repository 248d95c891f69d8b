// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Delimited-text parsing and encoding detection

mod csv_parser;
mod decoding;

pub use csv_parser::CsvParser;
pub use decoding::{decode_text, DecodedText};
