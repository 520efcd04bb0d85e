//! Spreadsheet file reader built on calamine
//!
//! Both source formats (legacy binary `.xls` and zipped-XML `.xlsx`)
//! normalize into the same [`RawGrid`]. Only the first worksheet of a
//! report file is read; that is where every store exports its figures.

use calamine::{Data, Range, Reader as _, Xls, Xlsx, open_workbook};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

pub mod grid;
pub mod xml_parser;

pub use grid::{CellValue, MergedRange, RawGrid};

use crate::error::ImportError;

/// Read the first worksheet of an Excel file into a [`RawGrid`]
pub fn read_grid(path: &Path) -> Result<RawGrid, ImportError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "xlsx" => read_xlsx(path),
        "xls" => read_xls(path),
        _ => Err(ImportError::UnsupportedFormat(extension)),
    }
}

fn read_xlsx(path: &Path) -> Result<RawGrid, ImportError> {
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(calamine::Error::Xlsx)?;
    let first_sheet = first_sheet_name(workbook.sheet_names())?;
    let range = workbook
        .worksheet_range(&first_sheet)
        .map_err(calamine::Error::Xlsx)?;
    let mut grid = grid_from_range(&range);

    // Merge rectangles come from the worksheet XML; a malformed part only
    // loses merge resolution, not the whole file.
    let file = File::open(path)?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|e| std::io::Error::other(e.to_string()))?;
    match xml_parser::extract_merged_cells(&mut archive, 0) {
        Ok(merges) => {
            for merge in merges {
                grid.add_merge(merge);
            }
        }
        Err(error) => debug!(%error, "failed to extract merged cells, continuing without"),
    }

    Ok(grid)
}

fn read_xls(path: &Path) -> Result<RawGrid, ImportError> {
    let mut workbook: Xls<_> = open_workbook(path).map_err(calamine::Error::Xls)?;
    let first_sheet = first_sheet_name(workbook.sheet_names())?;
    let range = workbook
        .worksheet_range(&first_sheet)
        .map_err(calamine::Error::Xls)?;
    let mut grid = grid_from_range(&range);

    // The binary format carries merges in the sheet record itself
    if let Some(merges) = workbook.worksheet_merge_cells(&first_sheet) {
        for dims in merges.iter() {
            grid.add_merge(MergedRange {
                start_row: dims.start.0 + 1,
                start_col: dims.start.1 + 1,
                end_row: dims.end.0 + 1,
                end_col: dims.end.1 + 1,
            });
        }
    }
    Ok(grid)
}

fn first_sheet_name(names: Vec<String>) -> Result<String, ImportError> {
    names.into_iter().next().ok_or(ImportError::NoWorksheet)
}

/// Convert a calamine value range into a 1-indexed grid. The range end
/// widens the grid bounds so that the sheet's last physical row is
/// preserved even when it is empty in the first eight columns.
fn grid_from_range(range: &Range<Data>) -> RawGrid {
    let mut grid = RawGrid::new();
    if let Some((end_row, end_col)) = range.end() {
        grid.insert(end_row + 1, end_col + 1, CellValue::Empty);
    }
    for (row, col, data) in range.used_cells() {
        grid.insert(row as u32 + 1, col as u32 + 1, cell_value(data));
    }
    grid
}

fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
