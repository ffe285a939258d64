pub mod cache;
pub mod client;
pub mod error;
pub mod load;
pub mod normalize;
pub mod parse;
pub(crate) mod retry;
pub mod table;

pub use client::SheetsClient;
pub use error::SheetsError;
pub use load::{load_sheet, SheetLoad};
pub use normalize::{
    normalize_table, ColumnSelection, DropReason, DroppedRow, NormalizeOptions, NormalizedBatch,
};
pub use parse::{parse_identifier, ParsedIdentifier};
