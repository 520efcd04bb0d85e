//! Header discovery inside an unlabeled report grid
//!
//! The locator runs a fixed chain of heuristics: each one is a pure
//! function over the grid, tried in order, first success wins. The chain
//! handles the real-world mess of these reports: headers at different
//! rows, merged header cells, relocated date columns, and files that ship
//! with no machine-readable header text at all.

use crate::context::Store;
use crate::error::ImportError;
use crate::period::is_date_like;
use crate::reader::RawGrid;
use std::collections::HashMap;

/// Header rows probed when the data start itself cannot be detected
const FALLBACK_HEADER_ROWS: [u32; 4] = [2, 3, 4, 5];

/// Column scan width for the widened header search (A:Z)
const WIDE_SCAN_COLS: u32 = 26;

/// The three semantically required metric columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKey {
    Checks,
    Goods,
    GiftCert,
}

impl MetricKey {
    pub const ALL: [MetricKey; 3] = [MetricKey::Checks, MetricKey::Goods, MetricKey::GiftCert];

    /// Primary header keyword, lowercase
    pub fn keyword(self) -> &'static str {
        match self {
            MetricKey::Checks => "чеки",
            MetricKey::Goods => "товары",
            MetricKey::GiftCert => "подарочные сертификаты",
        }
    }

    /// Alternate labels used by some stores
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            MetricKey::Goods => &["штуки"],
            _ => &[],
        }
    }

    fn matches(self, text: &str) -> bool {
        text.contains(self.keyword()) || self.aliases().iter().any(|alias| text.contains(alias))
    }
}

/// Zero-based column indices of the three metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricColumns {
    pub checks: u32,
    pub goods: u32,
    pub gift_cert: u32,
}

impl MetricColumns {
    pub fn get(&self, key: MetricKey) -> u32 {
        match key {
            MetricKey::Checks => self.checks,
            MetricKey::Goods => self.goods,
            MetricKey::GiftCert => self.gift_cert,
        }
    }
}

/// Where the schema was found inside a grid. Row indices are 1-based,
/// column indices zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaLocation {
    pub header_row: u32,
    pub data_start_row: u32,
    pub date_col: u32,
    pub day_col: u32,
    pub columns: MetricColumns,
}

/// Hand-tuned per-store metric columns for files that ship without header
/// text for a metric. Immutable configuration, passed into [`locate`].
#[derive(Debug, Clone)]
pub struct FallbackTable {
    columns: HashMap<Store, MetricColumns>,
}

impl Default for FallbackTable {
    fn default() -> Self {
        let mut columns = HashMap::new();
        columns.insert(
            Store::Akhtubinsk,
            MetricColumns { checks: 3, goods: 5, gift_cert: 7 },
        );
        columns.insert(
            Store::Bakhturova,
            MetricColumns { checks: 3, goods: 5, gift_cert: 7 },
        );
        columns.insert(
            Store::Prostor,
            MetricColumns { checks: 3, goods: 6, gift_cert: 7 },
        );
        Self { columns }
    }
}

impl FallbackTable {
    pub fn get(&self, store: Store) -> Option<MetricColumns> {
        self.columns.get(&store).copied()
    }
}

/// Locate the header row, the date/weekday columns and the three metric
/// columns. `store` feeds the static fallback table when keyword search
/// comes up empty.
pub fn locate(
    grid: &RawGrid,
    store: Option<Store>,
    fallback: &FallbackTable,
) -> Result<SchemaLocation, ImportError> {
    let (data_start_row, date_col, day_col) = find_data_start(grid).ok_or_else(|| {
        ImportError::SchemaNotFound { missing: vec!["дата".to_string()] }
    })?;

    let header_rows = candidate_header_rows(data_start_row);
    let header_row = header_rows.first().copied().unwrap_or(FALLBACK_HEADER_ROWS[0]);

    let mut found: HashMap<MetricKey, u32> = HashMap::new();
    for &row in &header_rows {
        scan_header_row(grid, row, &mut found);
        if found.len() == MetricKey::ALL.len() {
            break;
        }
    }

    let mut missing = Vec::new();
    let mut resolved: HashMap<MetricKey, u32> = HashMap::new();
    for key in MetricKey::ALL {
        match found.get(&key).copied() {
            Some(col) => {
                resolved.insert(key, col);
            }
            None => match store.and_then(|s| fallback.get(s)) {
                Some(columns) => {
                    resolved.insert(key, columns.get(key));
                }
                None => missing.push(key.keyword().to_string()),
            },
        }
    }
    if !missing.is_empty() {
        return Err(ImportError::SchemaNotFound { missing });
    }

    Ok(SchemaLocation {
        header_row,
        data_start_row,
        date_col,
        day_col,
        columns: MetricColumns {
            checks: resolved[&MetricKey::Checks],
            goods: resolved[&MetricKey::Goods],
            gift_cert: resolved[&MetricKey::GiftCert],
        },
    })
}

/// Every row above the data start, lowest first; the static fallback
/// rows when the data starts at the very top.
fn candidate_header_rows(data_start_row: u32) -> Vec<u32> {
    if data_start_row <= 1 {
        return FALLBACK_HEADER_ROWS.to_vec();
    }
    (1..data_start_row).collect()
}

/// Match metric keywords against one header row. A key resolved by an
/// earlier row is never overwritten. Merged headers resolve to the
/// merge's leftmost column.
fn scan_header_row(grid: &RawGrid, row: u32, found: &mut HashMap<MetricKey, u32>) {
    for col in 1..=grid.max_col() {
        let Some(text) = grid.header_text(row, col) else {
            continue;
        };
        for key in MetricKey::ALL {
            if found.contains_key(&key) || !key.matches(&text) {
                continue;
            }
            let left_col = grid
                .merge_containing(row, col)
                .map(|merge| merge.start_col)
                .unwrap_or(col);
            found.insert(key, left_col - 1);
        }
    }
}

/// (data_start_row, date_col, day_col) via the heuristic chain
fn find_data_start(grid: &RawGrid) -> Option<(u32, u32, u32)> {
    const STRATEGIES: [fn(&RawGrid) -> Option<(u32, u32, u32)>; 4] = [
        date_header_in_first_column,
        date_header_widened,
        weekday_header_inferred,
        date_like_scan,
    ];
    STRATEGIES.iter().find_map(|strategy| strategy(grid))
}

fn is_date_header(text: &str) -> bool {
    text.contains("дата")
}

fn is_day_header(text: &str) -> bool {
    text.contains("день нед")
}

/// "Дата" in column A, the usual layout
fn date_header_in_first_column(grid: &RawGrid) -> Option<(u32, u32, u32)> {
    (1..=grid.max_row())
        .find(|&row| grid.header_text(row, 1).is_some_and(|t| is_date_header(&t)))
        .map(|row| (row + 1, 0, 1))
}

/// "Дата" anywhere in the first ~26 columns
fn date_header_widened(grid: &RawGrid) -> Option<(u32, u32, u32)> {
    let max_col = grid.max_col().min(WIDE_SCAN_COLS);
    for row in 1..=grid.max_row() {
        for col in 1..=max_col {
            if grid.header_text(row, col).is_some_and(|t| is_date_header(&t)) {
                return Some((row + 1, col - 1, col));
            }
        }
    }
    None
}

/// No date header at all: find the weekday header and assume the date
/// column sits immediately before it
fn weekday_header_inferred(grid: &RawGrid) -> Option<(u32, u32, u32)> {
    let max_col = grid.max_col().min(WIDE_SCAN_COLS);
    for row in 1..=grid.max_row() {
        for col in 1..=max_col {
            if grid.header_text(row, col).is_some_and(|t| is_day_header(&t)) {
                let day_col = col - 1;
                return Some((row + 1, day_col.saturating_sub(1), day_col));
            }
        }
    }
    None
}

/// Last resort: the row after the first date-looking cell anywhere in the
/// sheet is taken as the data start
fn date_like_scan(grid: &RawGrid) -> Option<(u32, u32, u32)> {
    for row in 1..=grid.max_row() {
        for col in 1..=grid.max_col() {
            if is_date_like(grid.value(row, col)) {
                return Some((row + 1, 0, 1));
            }
        }
    }
    None
}
