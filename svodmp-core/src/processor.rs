//! Per-run orchestration: one file at a time, one remote step at a time
//!
//! Errors scoped to a single file are caught here and turned into
//! per-file outcomes; the run continues with the next file. Run-setup
//! failures (missing directory, no files, unreachable document) abort the
//! whole run.

use crate::config::extract_spreadsheet_id;
use crate::context::{self, FileContext};
use crate::error::ImportError;
use crate::extract::{self, DataRow};
use crate::ledger::LedgerWriter;
use crate::period::{Period, format_date_value};
use crate::reader::read_grid;
use crate::schema::{FallbackTable, locate};
use crate::sheets::{SheetMeta, SheetsApi};
use crate::summary::SummaryAggregator;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Caller-supplied run parameters
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub input_dir: PathBuf,
    /// Manual "Месяц ГГГГ" period, used only for files without one in
    /// the name
    pub period: Option<String>,
    /// Bare id or full document URL
    pub spreadsheet_id: String,
    /// Log-only mode: no remote writes, no local renames
    pub dry_run: bool,
}

/// What happened to one input file
#[derive(Debug)]
pub enum FileStatus {
    Imported { rows: usize },
    DryRun { rows: usize },
    /// Readable file with nothing to transfer
    Empty,
    Failed(ImportError),
}

#[derive(Debug)]
pub struct FileOutcome {
    pub file: String,
    pub status: FileStatus,
}

/// Invoked synchronously after each file completes; must not block
pub type ProgressFn<'a> = &'a mut dyn FnMut(usize, usize, &str);

pub struct Processor<'a> {
    options: ProcessOptions,
    api: Option<&'a dyn SheetsApi>,
    fallback: FallbackTable,
}

impl<'a> Processor<'a> {
    /// `api` may be `None` only for dry runs
    pub fn new(options: ProcessOptions, api: Option<&'a dyn SheetsApi>) -> Self {
        Self {
            options,
            api,
            fallback: FallbackTable::default(),
        }
    }

    pub fn run(&self, mut progress: Option<ProgressFn<'_>>) -> Result<Vec<FileOutcome>, ImportError> {
        let directory = &self.options.input_dir;
        if !directory.is_dir() {
            return Err(ImportError::InputDirNotFound(directory.clone()));
        }
        let files = collect_input_files(directory)?;
        if files.is_empty() {
            return Err(ImportError::NoInputFiles(directory.clone()));
        }

        let spreadsheet_id = extract_spreadsheet_id(&self.options.spreadsheet_id)
            .unwrap_or_else(|| self.options.spreadsheet_id.clone());

        // Read-mostly metadata cache: fetched once per run, staleness
        // under concurrent edits is an accepted risk
        let sheets: Vec<SheetMeta> = match (self.options.dry_run, self.api) {
            (true, _) => Vec::new(),
            (false, Some(api)) => api.fetch_sheets(&spreadsheet_id)?,
            (false, None) => {
                return Err(ImportError::Transport(crate::sheets::SheetsError::Auth(
                    "no Sheets client configured for a live run".to_string(),
                )));
            }
        };

        let total = files.len();
        let mut outcomes = Vec::with_capacity(total);
        for (index, path) in files.iter().enumerate() {
            let file_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default()
                .to_string();
            let status = match self.process_file(path, &spreadsheet_id, &sheets) {
                Ok(status) => status,
                Err(err) => {
                    error!(file = %file_name, %err, "file skipped");
                    FileStatus::Failed(err)
                }
            };
            outcomes.push(FileOutcome { file: file_name.clone(), status });
            if let Some(callback) = progress.as_deref_mut() {
                callback(index + 1, total, &file_name);
            }
        }
        Ok(outcomes)
    }

    fn process_file(
        &self,
        path: &Path,
        spreadsheet_id: &str,
        sheets: &[SheetMeta],
    ) -> Result<FileStatus, ImportError> {
        let context: FileContext =
            context::resolve(path, self.options.period.as_deref(), self.options.dry_run)?;
        info!(
            file = %context.path.display(),
            store = context.store.name(),
            period = %context.period,
            "processing file"
        );

        let grid = read_grid(&context.path)?;
        let schema = locate(&grid, Some(context.store), &self.fallback)?;
        info!(
            checks = schema.columns.checks,
            goods = schema.columns.goods,
            gift_cert = schema.columns.gift_cert,
            "resolved metric columns"
        );

        let rows = extract::extract(&grid, &schema);
        if rows.is_empty() {
            warn!(file = %context.path.display(), "no data rows to transfer");
            return Ok(FileStatus::Empty);
        }
        let prepared = prepare_rows(&rows, &context.period);
        if prepared.is_empty() {
            warn!(file = %context.path.display(), "no rows left after period filtering");
            return Ok(FileStatus::Empty);
        }

        if self.options.dry_run {
            info!(rows = prepared.len(), "[dry run] would import rows");
            return Ok(FileStatus::DryRun { rows: prepared.len() });
        }
        let Some(api) = self.api else {
            return Err(ImportError::Transport(crate::sheets::SheetsError::Auth(
                "no Sheets client configured for a live run".to_string(),
            )));
        };

        let sheet = LedgerWriter::find_ledger_sheet(sheets, context.store).ok_or_else(|| {
            ImportError::TargetWorksheetNotFound {
                store: context.store.name().to_string(),
            }
        })?;

        let writer = LedgerWriter::new(api, spreadsheet_id);
        let outcome = writer.import(sheet, &context.period, &prepared)?;

        // The ledger write already succeeded; a failed rollup is only a
        // warning
        let aggregator = SummaryAggregator::new(api, spreadsheet_id);
        if let Err(err) = aggregator.append(
            sheets,
            &sheet.title,
            context.store,
            &context.period,
            &outcome.summary_values,
        ) {
            warn!(store = context.store.name(), %err, "aggregate rollup skipped");
        }

        info!(rows = outcome.rows_written, "file imported");
        Ok(FileStatus::Imported { rows: outcome.rows_written })
    }
}

/// Sorted `.xls` files first, then sorted `.xlsx`
fn collect_input_files(directory: &Path) -> Result<Vec<PathBuf>, ImportError> {
    let mut xls = Vec::new();
    let mut xlsx = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("xls") => xls.push(path),
            Some("xlsx") => xlsx.push(path),
            _ => {}
        }
    }
    xls.sort();
    xlsx.sort();
    xls.extend(xlsx);
    Ok(xls)
}

/// Canonicalize the date field and cap the row count at the period's day
/// count; stray rows beyond it are dropped in order
fn prepare_rows(rows: &[DataRow], period: &Period) -> Vec<Vec<Value>> {
    let limit = period.days_in_month() as usize;
    rows.iter()
        .take(limit)
        .map(|row| {
            row.fields
                .iter()
                .enumerate()
                .map(|(index, field)| {
                    if index == 0 {
                        match format_date_value(field) {
                            Some(text) => Value::String(text),
                            None => Value::Null,
                        }
                    } else {
                        field.to_json()
                    }
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::LEDGER_WIDTH;
    use crate::reader::CellValue;
    use serde_json::json;

    fn day_row(day: u32) -> DataRow {
        let mut fields: [CellValue; LEDGER_WIDTH] = [
            CellValue::Empty,
            CellValue::Text("пн".to_string()),
            CellValue::Number(1000.0),
            CellValue::Number(30.0),
            CellValue::Empty,
            CellValue::Number(40.0),
            CellValue::Empty,
            CellValue::Number(2.0),
        ];
        fields[0] = CellValue::Text(format!("{day:02}.02.2024"));
        DataRow { fields }
    }

    #[test]
    fn rows_are_capped_at_days_in_month() {
        let rows: Vec<DataRow> = (1..=35).map(|d| day_row(d.min(29))).collect();
        let period = Period { year: 2024, month: 2 };
        let prepared = prepare_rows(&rows, &period);
        assert_eq!(prepared.len(), 29);
        assert_eq!(prepared[0][0], json!("01.02.2024"));
        assert_eq!(prepared[28][0], json!("29.02.2024"));
    }

    #[test]
    fn date_field_is_canonicalized_and_blanks_stay_null() {
        let mut row = day_row(1);
        row.fields[0] = CellValue::Number(45658.0);
        let period = Period { year: 2025, month: 1 };
        let prepared = prepare_rows(&[row], &period);
        assert_eq!(prepared[0][0], json!("01.01.2025"));
        assert_eq!(prepared[0][4], Value::Null);
        assert_eq!(prepared[0][3], json!(30.0));
    }

    #[test]
    fn missing_directory_is_fatal() {
        let options = ProcessOptions {
            input_dir: PathBuf::from("/nonexistent/reports"),
            period: None,
            spreadsheet_id: "abc".to_string(),
            dry_run: true,
        };
        let processor = Processor::new(options, None);
        assert!(matches!(
            processor.run(None),
            Err(ImportError::InputDirNotFound(_))
        ));
    }

    #[test]
    fn empty_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let options = ProcessOptions {
            input_dir: dir.path().to_path_buf(),
            period: None,
            spreadsheet_id: "abc".to_string(),
            dry_run: true,
        };
        let processor = Processor::new(options, None);
        assert!(matches!(
            processor.run(None),
            Err(ImportError::NoInputFiles(_))
        ));
    }

    #[test]
    fn unreadable_file_is_a_per_file_outcome_not_a_run_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("привоз март 2025.xlsx"), b"not a zip").unwrap();
        let options = ProcessOptions {
            input_dir: dir.path().to_path_buf(),
            period: None,
            spreadsheet_id: "abc".to_string(),
            dry_run: true,
        };
        let processor = Processor::new(options, None);

        let mut seen = Vec::new();
        let mut progress = |current: usize, total: usize, name: &str| {
            seen.push((current, total, name.to_string()));
        };
        let outcomes = processor.run(Some(&mut progress)).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0].status, FileStatus::Failed(_)));
        assert_eq!(seen, vec![(1, 1, "привоз март 2025.xlsx".to_string())]);
    }

    #[test]
    fn unrecognized_store_skips_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("загадка март 2025.xlsx"), b"x").unwrap();
        let options = ProcessOptions {
            input_dir: dir.path().to_path_buf(),
            period: None,
            spreadsheet_id: "abc".to_string(),
            dry_run: true,
        };
        let processor = Processor::new(options, None);
        let outcomes = processor.run(None).unwrap();
        assert!(matches!(
            outcomes[0].status,
            FileStatus::Failed(ImportError::StoreNotRecognized(_))
        ));
    }
}
