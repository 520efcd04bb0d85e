//! In-memory grid model shared by both spreadsheet formats

use std::collections::HashMap;

/// Cell value types
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    /// Date/time as a spreadsheet serial number (1899-12-30 epoch)
    DateTime(f64),
    Boolean(bool),
}

impl CellValue {
    /// Check if the cell is empty (a whitespace-only string counts as empty)
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// JSON form used when writing literal values to the remote document.
    /// Date serials stay numeric; only the date column gets canonicalized
    /// text, elsewhere in the pipeline.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Empty => serde_json::Value::Null,
            CellValue::Text(text) => serde_json::Value::String(text.clone()),
            CellValue::Number(n) | CellValue::DateTime(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            CellValue::Boolean(b) => serde_json::Value::Bool(*b),
        }
    }
}

/// Merged cell rectangle, 1-indexed inclusive bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedRange {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl MergedRange {
    pub fn contains(&self, row: u32, col: u32) -> bool {
        self.start_row <= row && row <= self.end_row && self.start_col <= col && col <= self.end_col
    }
}

/// A single worksheet as a sparse, 1-indexed cell map plus its merge
/// rectangles. Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct RawGrid {
    cells: HashMap<(u32, u32), CellValue>,
    merges: Vec<MergedRange>,
    max_row: u32,
    max_col: u32,
}

impl RawGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cell value at a 1-indexed position. Empty values are not
    /// stored but still widen the tracked bounds.
    pub fn insert(&mut self, row: u32, col: u32, value: CellValue) {
        debug_assert!(row >= 1 && col >= 1, "grid positions are 1-indexed");
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
        if !matches!(value, CellValue::Empty) {
            self.cells.insert((row, col), value);
        }
    }

    pub fn add_merge(&mut self, merge: MergedRange) {
        self.merges.push(merge);
    }

    /// Last physical row of the sheet (0 when the sheet is empty)
    pub fn max_row(&self) -> u32 {
        self.max_row
    }

    pub fn max_col(&self) -> u32 {
        self.max_col
    }

    pub fn merges(&self) -> &[MergedRange] {
        &self.merges
    }

    pub fn value(&self, row: u32, col: u32) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cells.get(&(row, col)).unwrap_or(&EMPTY)
    }

    pub fn merge_containing(&self, row: u32, col: u32) -> Option<&MergedRange> {
        self.merges.iter().find(|m| m.contains(row, col))
    }

    /// Normalized header text at a position. A cell inside a merge with no
    /// own value reads through to the merge's top-left cell.
    pub fn header_text(&self, row: u32, col: u32) -> Option<String> {
        if let Some(text) = normalize_header_value(self.value(row, col)) {
            return Some(text);
        }
        let merge = self.merge_containing(row, col)?;
        normalize_header_value(self.value(merge.start_row, merge.start_col))
    }
}

/// Lowercase, NBSP-collapsed, whitespace-normalized header text
pub fn normalize_header_value(value: &CellValue) -> Option<String> {
    let raw = match value {
        CellValue::Text(text) => text.clone(),
        CellValue::Number(n) => n.to_string(),
        CellValue::Boolean(b) => b.to_string(),
        CellValue::Empty | CellValue::DateTime(_) => return None,
    };
    let lowered = raw.replace('\u{a0}', " ").to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() { None } else { Some(collapsed) }
}
