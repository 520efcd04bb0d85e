//! Data-row extraction once a schema has been located

use crate::reader::{CellValue, RawGrid};
use crate::schema::SchemaLocation;

/// Width of the ledger block (columns A:H)
pub const LEDGER_WIDTH: usize = 8;

/// One extracted daily record, laid out exactly as the ledger expects:
/// `[date, weekday, turnover, checks, <ratio placeholder>, goods,
/// static column, gift certificates]`. Field 4 stays blank; the ledger
/// writes the ratio formula there.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    pub fields: [CellValue; LEDGER_WIDTH],
}

impl DataRow {
    pub fn date(&self) -> &CellValue {
        &self.fields[0]
    }
}

/// Slice the contiguous data block into ledger rows. An empty block is a
/// valid outcome, never an error.
pub fn extract(grid: &RawGrid, schema: &SchemaLocation) -> Vec<DataRow> {
    let Some(end_row) = find_data_end(grid, schema.data_start_row) else {
        return Vec::new();
    };
    (schema.data_start_row..=end_row)
        .map(|row| build_row(grid, row, schema))
        .collect()
}

/// Reverse scan from the sheet's last physical row: the first row with any
/// value in the first eight columns is the data end. Isolated rows below
/// an all-blank gap are therefore still included.
fn find_data_end(grid: &RawGrid, start_row: u32) -> Option<u32> {
    (start_row..=grid.max_row().max(start_row))
        .rev()
        .find(|&row| row_has_data(grid, row))
}

fn row_has_data(grid: &RawGrid, row: u32) -> bool {
    (1..=LEDGER_WIDTH as u32).any(|col| !grid.value(row, col).is_empty())
}

fn build_row(grid: &RawGrid, row: u32, schema: &SchemaLocation) -> DataRow {
    let at = |zero_based_col: u32| grid.value(row, zero_based_col + 1).clone();
    DataRow {
        fields: [
            at(schema.date_col),
            at(schema.day_col),
            at(2),
            at(schema.columns.checks),
            CellValue::Empty,
            at(schema.columns.goods),
            at(4),
            at(schema.columns.gift_cert),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FallbackTable, locate};

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_string())
    }

    fn schema_for(grid: &RawGrid) -> SchemaLocation {
        locate(grid, None, &FallbackTable::default()).unwrap()
    }

    fn populated_grid(data_rows: std::ops::RangeInclusive<u32>) -> RawGrid {
        let mut grid = RawGrid::new();
        grid.insert(40, 10, CellValue::Empty);
        grid.insert(2, 1, text("Дата"));
        grid.insert(2, 4, text("Чеки"));
        grid.insert(2, 6, text("Товары"));
        grid.insert(2, 7, text("Подарочные сертификаты"));
        for row in data_rows {
            grid.insert(row, 1, text(&format!("{:02}.03.2025", (row - 2).min(31))));
            grid.insert(row, 2, text("пн"));
            grid.insert(row, 3, CellValue::Number(1000.0));
            grid.insert(row, 4, CellValue::Number(f64::from(row)));
            grid.insert(row, 6, CellValue::Number(2.0));
            grid.insert(row, 7, CellValue::Number(0.0));
        }
        grid
    }

    #[test]
    fn scenario_a_extracts_31_rows() {
        let grid = populated_grid(3..=33);
        let rows = extract(&grid, &schema_for(&grid));
        assert_eq!(rows.len(), 31);
        // checks drawn from sheet column 4
        assert_eq!(rows[0].fields[3], CellValue::Number(3.0));
        // turnover from static column C, ratio placeholder blank
        assert_eq!(rows[0].fields[2], CellValue::Number(1000.0));
        assert_eq!(rows[0].fields[4], CellValue::Empty);
    }

    #[test]
    fn empty_data_block_yields_empty_sequence() {
        let grid = populated_grid(3..=2); // no data rows at all
        let rows = extract(&grid, &schema_for(&grid));
        assert!(rows.is_empty());
    }

    #[test]
    fn isolated_row_below_a_gap_is_included() {
        let mut grid = populated_grid(3..=10);
        grid.insert(25, 3, CellValue::Number(42.0));
        let rows = extract(&grid, &schema_for(&grid));
        // reverse scan stops at row 25, gap rows come along as blanks
        assert_eq!(rows.len(), 23);
        assert_eq!(rows[22].fields[2], CellValue::Number(42.0));
        assert!(rows[12].fields.iter().all(CellValue::is_empty));
    }

    #[test]
    fn whitespace_only_cells_do_not_extend_the_block() {
        let mut grid = populated_grid(3..=5);
        grid.insert(20, 2, text("   "));
        let rows = extract(&grid, &schema_for(&grid));
        assert_eq!(rows.len(), 3);
    }
}
