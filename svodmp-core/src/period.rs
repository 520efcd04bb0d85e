//! Reporting period parsing and date canonicalization

use crate::error::ImportError;
use crate::reader::CellValue;
use chrono::{Duration, NaiveDate};
use std::fmt;

/// Month names as they appear in file names and the manual period picker
pub const MONTH_NAMES: [&str; 12] = [
    "январь",
    "февраль",
    "март",
    "апрель",
    "май",
    "июнь",
    "июль",
    "август",
    "сентябрь",
    "октябрь",
    "ноябрь",
    "декабрь",
];

/// Spreadsheet date serial epoch (the classic Lotus off-by-two epoch)
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// A reporting period: one calendar month of one year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    /// Parse a period of the form "Месяц ГГГГ" (case-insensitive)
    pub fn parse(text: &str) -> Result<Self, ImportError> {
        let mut parts = text.split_whitespace();
        let (Some(month_part), Some(year_part)) = (parts.next(), parts.next()) else {
            return Err(ImportError::InvalidPeriod(text.to_string()));
        };
        let month_lower = month_part.to_lowercase();
        let month = MONTH_NAMES
            .iter()
            .position(|name| *name == month_lower)
            .map(|idx| idx as u32 + 1)
            .ok_or_else(|| ImportError::InvalidPeriod(text.to_string()))?;
        let year: i32 = year_part
            .parse()
            .map_err(|_| ImportError::InvalidPeriod(text.to_string()))?;
        Ok(Self { year, month })
    }

    /// Month name with a capitalized first letter, e.g. "Март"
    pub fn month_name(&self) -> String {
        capitalize(MONTH_NAMES[(self.month - 1) as usize])
    }

    /// Label used in the aggregate worksheet, e.g. "03-2025"
    pub fn aggregate_label(&self) -> String {
        format!("{:02}-{}", self.month, self.year)
    }

    /// Gregorian day count of the month, leap-year aware
    pub fn days_in_month(&self) -> u32 {
        let first = NaiveDate::from_ymd_opt(self.year, self.month, 1);
        let next = if self.month == 12 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
        };
        match (first, next) {
            (Some(first), Some(next)) => (next - first).num_days() as u32,
            _ => 31,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month_name(), self.year)
    }
}

pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Canonicalize a date cell into `DD.MM.YYYY` text.
///
/// Accepts native date serials, plain numbers (treated as serials), and
/// `DD.MM.YYYY` / `DD.MM.YY` text. Anything else passes through unchanged
/// rather than failing the row.
pub fn format_date_value(value: &CellValue) -> Option<String> {
    match value {
        CellValue::Empty => None,
        CellValue::DateTime(serial) => {
            Some(serial_to_date(*serial).unwrap_or_else(|| serial.to_string()))
        }
        CellValue::Number(number) => {
            Some(serial_to_date(*number).unwrap_or_else(|| number.to_string()))
        }
        CellValue::Boolean(b) => Some(b.to_string()),
        CellValue::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            let normalized = text.replace(',', ".");
            if let Ok(serial) = normalized.parse::<f64>() {
                return Some(serial_to_date(serial).unwrap_or_else(|| text.to_string()));
            }
            if let Some(date) = parse_dotted_date(text) {
                return Some(date.format("%d.%m.%Y").to_string());
            }
            Some(text.to_string())
        }
    }
}

/// Check whether a cell looks like a date (used by the last-resort
/// data-start heuristic)
pub fn is_date_like(value: &CellValue) -> bool {
    match value {
        CellValue::DateTime(_) => true,
        CellValue::Text(text) => parse_dotted_date(text.trim()).is_some(),
        _ => false,
    }
}

/// Parse `DD.MM.YYYY` or `DD.MM.YY` text. chrono's `%Y` accepts a
/// two-digit year as-is, so the format is picked by the width of the
/// year segment instead of ordered trial.
fn parse_dotted_date(text: &str) -> Option<NaiveDate> {
    let format = match text.rsplit('.').next()?.len() {
        2 => "%d.%m.%y",
        4 => "%d.%m.%Y",
        _ => return None,
    };
    NaiveDate::parse_from_str(text, format).ok()
}

fn serial_to_date(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial.abs() > 3_000_000.0 {
        return None;
    }
    let (year, month, day) = SERIAL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(year, month, day)?;
    let date = epoch.checked_add_signed(Duration::days(serial.trunc() as i64))?;
    Some(date.format("%d.%m.%Y").to_string())
}
