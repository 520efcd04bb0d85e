//! SVODMP core: imports per-store retail sales reports from Excel files
//! into a shared Google Sheets ledger with per-period summaries and a
//! global rollup.
//!
//! Pipeline, per input file: file-name resolution ([`context`]) → grid
//! loading ([`reader`]) → header discovery ([`schema`]) → row extraction
//! ([`extract`]) → ledger write ([`ledger`]) → rollup ([`summary`]),
//! orchestrated by [`processor`].

pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod period;
pub mod processor;
pub mod reader;
pub mod schema;
pub mod sheets;
pub mod summary;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{AppConfig, extract_spreadsheet_id};
pub use context::{FileContext, Store};
pub use error::ImportError;
pub use processor::{FileOutcome, FileStatus, ProcessOptions, Processor};
pub use sheets::{HttpSheetsClient, SheetsApi};
