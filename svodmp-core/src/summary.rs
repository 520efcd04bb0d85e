//! Global rollup into the aggregate worksheet
//!
//! The aggregate worksheet dedicates one fixed-height column block per
//! store, labelled by a row-1 merged header. Each ledger import appends
//! one row of computed figures into the store's block. Everything here is
//! non-fatal: by the time the rollup runs, the per-store ledger write has
//! already succeeded.

use crate::context::Store;
use crate::error::ImportError;
use crate::ledger::json_cell_is_empty;
use crate::period::Period;
use crate::sheets::{SheetMeta, SheetsApi, ValueInput, column_letter, sheet_range};
use serde_json::{Value, json};
use tracing::info;

/// Aggregate worksheet titles carry this keyword
const AGGREGATE_TITLE_KEYWORD: &str = "свод";

/// Rows per store block, below the row-1 header
const BLOCK_HEIGHT: u32 = 7;

/// A store's region inside the aggregate worksheet: starting column and
/// width, both derived from the row-1 merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryBlockLocation {
    /// Zero-based first column of the block
    pub start_col: u32,
    pub width: u32,
}

pub struct SummaryAggregator<'a> {
    api: &'a dyn SheetsApi,
    spreadsheet_id: &'a str,
}

impl<'a> SummaryAggregator<'a> {
    pub fn new(api: &'a dyn SheetsApi, spreadsheet_id: &'a str) -> Self {
        Self { api, spreadsheet_id }
    }

    /// Append one rollup row for a store. `ledger_title` is excluded from
    /// the aggregate worksheet search so a ledger named "Свод МП" can
    /// never receive its own rollup.
    pub fn append(
        &self,
        sheets: &[SheetMeta],
        ledger_title: &str,
        store: Store,
        period: &Period,
        summary_values: &[Value],
    ) -> Result<(), ImportError> {
        let aggregate = sheets
            .iter()
            .find(|meta| {
                meta.info.title != ledger_title
                    && meta
                        .info
                        .title
                        .to_lowercase()
                        .contains(AGGREGATE_TITLE_KEYWORD)
            })
            .ok_or(ImportError::AggregateBlockNotFound {
                store: store.name().to_string(),
            })?;

        let header_row = self
            .api
            .get_values(self.spreadsheet_id, &sheet_range(&aggregate.info.title, "1:1"))?
            .into_iter()
            .next()
            .unwrap_or_default();

        let block = find_store_block(aggregate, &header_row, store).ok_or(
            ImportError::AggregateBlockNotFound {
                store: store.name().to_string(),
            },
        )?;

        let target_row = self.find_free_slot(&aggregate.info.title, block)?;
        let row = build_rollup_row(period, summary_values, block.width as usize);

        let start_letter = column_letter(block.start_col);
        let end_letter = column_letter(block.start_col + block.width - 1);
        let range = sheet_range(
            &aggregate.info.title,
            &format!("{start_letter}{target_row}:{end_letter}{target_row}"),
        );
        info!(sheet = %aggregate.info.title, %range, store = store.name(), "appending rollup row");
        self.api
            .update_values(self.spreadsheet_id, &range, vec![row], ValueInput::Raw)?;
        Ok(())
    }

    /// First all-empty row inside the block (row 2 downward); a full
    /// block appends immediately past the last scanned row
    fn find_free_slot(
        &self,
        title: &str,
        block: SummaryBlockLocation,
    ) -> Result<u32, ImportError> {
        let start_letter = column_letter(block.start_col);
        let end_letter = column_letter(block.start_col + block.width - 1);
        let last_scanned = 1 + BLOCK_HEIGHT;
        let range = sheet_range(title, &format!("{start_letter}2:{end_letter}{last_scanned}"));
        let rows = self.api.get_values(self.spreadsheet_id, &range)?;

        for offset in 0..BLOCK_HEIGHT {
            let occupied = rows
                .get(offset as usize)
                .is_some_and(|row| row.iter().any(|cell| !json_cell_is_empty(cell)));
            if !occupied {
                return Ok(2 + offset);
            }
        }
        Ok(last_scanned + 1)
    }
}

/// Scan row-1 merges for one whose top-left text carries a store keyword
fn find_store_block(
    sheet: &SheetMeta,
    header_row: &[Value],
    store: Store,
) -> Option<SummaryBlockLocation> {
    for merge in &sheet.merges {
        if merge.start_row_index != 0 {
            continue;
        }
        let text = header_row
            .get(merge.start_column_index as usize)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();
        if store
            .sheet_keywords()
            .iter()
            .any(|keyword| text.contains(keyword))
        {
            let width = merge.end_column_index.saturating_sub(merge.start_column_index);
            if width > 0 {
                return Some(SummaryBlockLocation {
                    start_col: merge.start_column_index,
                    width,
                });
            }
        }
    }
    None
}

/// Period label followed by the five computed figures of the summary row
/// (turnover, checks, average check, goods, gift certificates), truncated
/// to the block width
fn build_rollup_row(period: &Period, summary_values: &[Value], width: usize) -> Vec<Value> {
    let figure = |index: usize| summary_values.get(index).cloned().unwrap_or(Value::Null);
    let mut row = vec![
        json!(period.aggregate_label()),
        figure(2),
        figure(3),
        figure(4),
        figure(5),
        figure(7),
    ];
    row.truncate(width);
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::{GridRange, SheetInfo};
    use crate::testutil::FakeSheetsApi;

    fn aggregate_sheet() -> SheetMeta {
        SheetMeta {
            info: SheetInfo {
                sheet_id: 99,
                title: "Свод по магазинам".to_string(),
            },
            merges: vec![
                GridRange {
                    start_row_index: 0,
                    end_row_index: 1,
                    start_column_index: 0,
                    end_column_index: 6,
                },
                GridRange {
                    start_row_index: 0,
                    end_row_index: 1,
                    start_column_index: 6,
                    end_column_index: 12,
                },
            ],
        }
    }

    fn header_row() -> Vec<Vec<Value>> {
        let mut row = vec![Value::Null; 12];
        row[0] = json!("Привоз");
        row[6] = json!("ЦУМ (Советница)");
        vec![row]
    }

    fn summary_values() -> Vec<Value> {
        vec![
            json!("Март"),
            json!(""),
            json!(120000),
            json!(340),
            json!(352.9),
            json!(410),
            json!(""),
            json!(12),
        ]
    }

    #[test]
    fn writes_into_first_free_row_of_matching_block() {
        let api = FakeSheetsApi::new(vec![aggregate_sheet()]);
        api.set_values("'Свод по магазинам'!1:1", header_row());
        api.set_values(
            "'Свод по магазинам'!G2:L8",
            vec![vec![json!("02-2025"), json!(1)]],
        );

        let aggregator = SummaryAggregator::new(&api, "sheet-id");
        let period = Period { year: 2025, month: 3 };
        aggregator
            .append(&api.sheets, "МП ЦУМ", Store::Tsum, &period, &summary_values())
            .unwrap();

        let updates = api.updates.borrow();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].range, "'Свод по магазинам'!G3:L3");
        assert_eq!(updates[0].values[0][0], json!("03-2025"));
        assert_eq!(updates[0].values[0][1], json!(120000));
        assert_eq!(updates[0].values[0][5], json!(12));
    }

    #[test]
    fn full_block_appends_past_the_scanned_range() {
        let api = FakeSheetsApi::new(vec![aggregate_sheet()]);
        api.set_values("'Свод по магазинам'!1:1", header_row());
        api.set_values(
            "'Свод по магазинам'!A2:F8",
            (0..7).map(|i| vec![json!(format!("{i:02}-2024"))]).collect(),
        );

        let aggregator = SummaryAggregator::new(&api, "sheet-id");
        let period = Period { year: 2025, month: 1 };
        aggregator
            .append(&api.sheets, "МП Привоз", Store::Privoz, &period, &summary_values())
            .unwrap();

        let updates = api.updates.borrow();
        assert_eq!(updates[0].range, "'Свод по магазинам'!A9:F9");
    }

    #[test]
    fn unmatched_store_block_is_reported() {
        let api = FakeSheetsApi::new(vec![aggregate_sheet()]);
        api.set_values("'Свод по магазинам'!1:1", header_row());

        let aggregator = SummaryAggregator::new(&api, "sheet-id");
        let period = Period { year: 2025, month: 1 };
        let err = aggregator
            .append(&api.sheets, "МП Европа", Store::Evropa, &period, &summary_values())
            .unwrap_err();
        assert!(matches!(err, ImportError::AggregateBlockNotFound { .. }));
    }

    #[test]
    fn transport_failure_is_propagated() {
        let api = FakeSheetsApi::new(vec![aggregate_sheet()]);
        *api.fail_all.borrow_mut() = true;
        let aggregator = SummaryAggregator::new(&api, "sheet-id");
        let period = Period { year: 2025, month: 1 };
        let err = aggregator
            .append(&api.sheets, "МП Привоз", Store::Privoz, &period, &summary_values())
            .unwrap_err();
        assert!(matches!(err, ImportError::Transport(_)));
        assert!(api.updates.borrow().is_empty());
    }

    #[test]
    fn missing_aggregate_worksheet_is_reported() {
        let api = FakeSheetsApi::new(vec![SheetMeta {
            info: SheetInfo {
                sheet_id: 1,
                title: "МП Привоз".to_string(),
            },
            merges: Vec::new(),
        }]);
        let aggregator = SummaryAggregator::new(&api, "sheet-id");
        let period = Period { year: 2025, month: 1 };
        let err = aggregator
            .append(&api.sheets, "МП Привоз", Store::Privoz, &period, &summary_values())
            .unwrap_err();
        assert!(matches!(err, ImportError::AggregateBlockNotFound { .. }));
    }
}
