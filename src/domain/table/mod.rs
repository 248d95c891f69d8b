// ============================================================
// TABLE DOMAIN LAYER
// ============================================================
// Input files, schemas and rows. No I/O.

mod input_file;
#[allow(clippy::module_inception)]
mod table;

pub use input_file::{FileFormat, InputFile};
pub use table::{Row, Schema, Table, KEYWORD_PHRASE_COLUMN};
