//! Remote ledger update protocol
//!
//! Per file the writer runs a strict sequence against the store's "МП"
//! worksheet: find the current end of data, insert one summary row, fill
//! it with aggregate formulas over the data block about to be written
//! below it, write the data, add per-row ratio formulas, group the block,
//! and read the computed summary back. There is no rollback; a transport
//! failure mid-sequence leaves the rows written so far in place and aborts
//! only the current file.

use crate::context::Store;
use crate::error::ImportError;
use crate::period::Period;
use crate::sheets::{SheetInfo, SheetMeta, SheetsApi, ValueInput, sheet_range};
use serde_json::{Value, json};
use tracing::info;

/// Ledger worksheet titles carry this marker
const LEDGER_MARKER: &str = "мп";

/// Highlight applied to the summary row (light green)
const SUMMARY_FILL: (f64, f64, f64) = (0.76, 0.87, 0.78);

/// Result of one completed ledger import
#[derive(Debug, Clone)]
pub struct LedgerOutcome {
    pub summary_row: u32,
    pub rows_written: usize,
    /// Computed values of the summary row, read back after the write
    pub summary_values: Vec<Value>,
}

pub struct LedgerWriter<'a> {
    api: &'a dyn SheetsApi,
    spreadsheet_id: &'a str,
}

impl<'a> LedgerWriter<'a> {
    pub fn new(api: &'a dyn SheetsApi, spreadsheet_id: &'a str) -> Self {
        Self { api, spreadsheet_id }
    }

    /// Pick the store's ledger worksheet: title must carry the "МП"
    /// marker and one of the store's sheet keywords
    pub fn find_ledger_sheet(sheets: &[SheetMeta], store: Store) -> Option<&SheetInfo> {
        sheets
            .iter()
            .map(|meta| &meta.info)
            .filter(|info| info.title.to_lowercase().contains(LEDGER_MARKER))
            .find(|info| {
                let title = info.title.to_lowercase();
                store
                    .sheet_keywords()
                    .iter()
                    .any(|keyword| title.contains(keyword))
            })
    }

    /// Run the full insert-and-write sequence for one file
    pub fn import(
        &self,
        sheet: &SheetInfo,
        period: &Period,
        rows: &[Vec<Value>],
    ) -> Result<LedgerOutcome, ImportError> {
        let last_row = self.last_filled_row(&sheet.title)?;
        let summary_row = last_row + 1;
        let data_start = summary_row + 1;
        let data_end = summary_row + rows.len() as u32;

        info!(
            sheet = %sheet.title,
            rows = rows.len(),
            range = format!("{data_start}-{data_end}"),
            "writing ledger block"
        );

        self.insert_blank_row(sheet.sheet_id, summary_row)?;
        self.highlight_summary_row(sheet.sheet_id, summary_row)?;
        self.write_summary_row(&sheet.title, summary_row, period, data_start, data_end)?;
        if !rows.is_empty() {
            self.write_data_rows(&sheet.title, data_start, rows)?;
            self.write_ratio_formulas(&sheet.title, data_start, data_end)?;
            self.group_data_rows(sheet.sheet_id, data_start, data_end)?;
        }
        let summary_values = self.fetch_row(&sheet.title, summary_row)?;

        Ok(LedgerOutcome {
            summary_row,
            rows_written: rows.len(),
            summary_values,
        })
    }

    /// Last 1-based row with any value in columns A:H (0 when empty)
    fn last_filled_row(&self, title: &str) -> Result<u32, ImportError> {
        let values = self
            .api
            .get_values(self.spreadsheet_id, &sheet_range(title, "A:H"))?;
        let mut last_row = 0;
        for (index, row) in values.iter().enumerate() {
            if row.iter().any(|cell| !json_cell_is_empty(cell)) {
                last_row = index as u32 + 1;
            }
        }
        Ok(last_row)
    }

    /// Structural insert: pushes all following rows down
    fn insert_blank_row(&self, sheet_id: i64, row: u32) -> Result<(), ImportError> {
        self.api.batch_update(
            self.spreadsheet_id,
            vec![json!({
                "insertDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": row - 1,
                        "endIndex": row,
                    },
                    "inheritFromBefore": false,
                }
            })],
        )?;
        Ok(())
    }

    fn highlight_summary_row(&self, sheet_id: i64, row: u32) -> Result<(), ImportError> {
        let (red, green, blue) = SUMMARY_FILL;
        self.api.batch_update(
            self.spreadsheet_id,
            vec![json!({
                "repeatCell": {
                    "range": {
                        "sheetId": sheet_id,
                        "startRowIndex": row - 1,
                        "endRowIndex": row,
                        "startColumnIndex": 0,
                        "endColumnIndex": 8,
                    },
                    "cell": {
                        "userEnteredFormat": {
                            "backgroundColor": { "red": red, "green": green, "blue": blue }
                        }
                    },
                    "fields": "userEnteredFormat.backgroundColor",
                }
            })],
        )?;
        Ok(())
    }

    /// Month label plus five aggregates over the data range below. The
    /// data range does not exist yet at write time; formulas are lazily
    /// evaluated by the remote document, so forward references are valid.
    fn write_summary_row(
        &self,
        title: &str,
        row: u32,
        period: &Period,
        data_start: u32,
        data_end: u32,
    ) -> Result<(), ImportError> {
        let summary = vec![vec![
            json!(period.month_name()),
            json!(""),
            json!(format!("=SUM(C{data_start}:C{data_end})")),
            json!(format!("=SUM(D{data_start}:D{data_end})")),
            json!(format!("=AVERAGE(E{data_start}:E{data_end})")),
            json!(format!("=SUM(F{data_start}:F{data_end})")),
            json!(""),
            json!(format!("=SUM(H{data_start}:H{data_end})")),
        ]];
        self.api.update_values(
            self.spreadsheet_id,
            &sheet_range(title, &format!("A{row}:H{row}")),
            summary,
            ValueInput::UserEntered,
        )?;
        Ok(())
    }

    fn write_data_rows(
        &self,
        title: &str,
        start_row: u32,
        rows: &[Vec<Value>],
    ) -> Result<(), ImportError> {
        let end_row = start_row + rows.len() as u32 - 1;
        self.api.update_values(
            self.spreadsheet_id,
            &sheet_range(title, &format!("A{start_row}:H{end_row}")),
            rows.to_vec(),
            ValueInput::Raw,
        )?;
        Ok(())
    }

    /// Turnover per check, one formula per data row in column E
    fn write_ratio_formulas(
        &self,
        title: &str,
        start_row: u32,
        end_row: u32,
    ) -> Result<(), ImportError> {
        let formulas: Vec<Vec<Value>> = (start_row..=end_row)
            .map(|row| vec![json!(format!("=C{row}/D{row}"))])
            .collect();
        self.api.update_values(
            self.spreadsheet_id,
            &sheet_range(title, &format!("E{start_row}:E{end_row}")),
            formulas,
            ValueInput::UserEntered,
        )?;
        Ok(())
    }

    /// Collapse the imported block into an outline band, summary row
    /// excluded
    fn group_data_rows(&self, sheet_id: i64, start_row: u32, end_row: u32) -> Result<(), ImportError> {
        self.api.batch_update(
            self.spreadsheet_id,
            vec![json!({
                "addDimensionGroup": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": start_row - 1,
                        "endIndex": end_row,
                    }
                }
            })],
        )?;
        Ok(())
    }

    /// Read the summary row back; forces evaluation and yields concrete
    /// numbers for the aggregate worksheet
    fn fetch_row(&self, title: &str, row: u32) -> Result<Vec<Value>, ImportError> {
        let mut values = self
            .api
            .get_values(self.spreadsheet_id, &sheet_range(title, &format!("A{row}:H{row}")))?;
        Ok(if values.is_empty() {
            Vec::new()
        } else {
            values.remove(0)
        })
    }
}

pub(crate) fn json_cell_is_empty(cell: &Value) -> bool {
    match cell {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}
