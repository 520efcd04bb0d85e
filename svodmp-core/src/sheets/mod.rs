//! Google Sheets v4 API surface
//!
//! The pipeline talks to the remote document through the [`SheetsApi`]
//! trait; the blocking HTTP implementation lives in [`client`]. Tests
//! substitute a recording fake.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub mod client;

pub use client::HttpSheetsClient;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Google Sheets API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to sign JWT assertion: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Worksheet identity inside the target document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetInfo {
    pub sheet_id: i64,
    pub title: String,
}

/// Half-open grid rectangle as the API reports merges. The API omits
/// zero-valued indices, hence the per-field defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridRange {
    pub start_row_index: u32,
    pub end_row_index: u32,
    pub start_column_index: u32,
    pub end_column_index: u32,
}

/// Per-worksheet metadata fetched once per run: identity plus merge
/// rectangles (needed for aggregate block discovery)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetMeta {
    pub info: SheetInfo,
    pub merges: Vec<GridRange>,
}

/// How written values are interpreted by the remote document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueInput {
    /// Stored verbatim
    Raw,
    /// Parsed as if typed by a user; formulas stay formulas
    UserEntered,
}

impl ValueInput {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueInput::Raw => "RAW",
            ValueInput::UserEntered => "USER_ENTERED",
        }
    }
}

/// The remote operations the pipeline needs, strictly sequential
pub trait SheetsApi {
    /// All worksheets of the document with their row-1 merges
    fn fetch_sheets(&self, spreadsheet_id: &str) -> Result<Vec<SheetMeta>, SheetsError>;

    /// Read a value range; trailing empty rows/cells are absent
    fn get_values(&self, spreadsheet_id: &str, range: &str)
    -> Result<Vec<Vec<Value>>, SheetsError>;

    /// Write a rectangular block of values
    fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<Value>>,
        input: ValueInput,
    ) -> Result<(), SheetsError>;

    /// Structural requests (row insertion, formatting, grouping)
    fn batch_update(&self, spreadsheet_id: &str, requests: Vec<Value>) -> Result<(), SheetsError>;
}

/// Zero-based column index to A1 letters (0 -> "A", 26 -> "AA")
pub fn column_letter(zero_based: u32) -> String {
    let mut col = zero_based + 1;
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A1 range over whole columns of one worksheet, e.g. `'МП Привоз'!A:H`
pub fn sheet_range(title: &str, range: &str) -> String {
    format!("'{}'!{}", title.replace('\'', "''"), range)
}
