//! In-memory Sheets API fake used across unit tests

use crate::sheets::{SheetMeta, SheetsApi, SheetsError, ValueInput};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpdate {
    pub range: String,
    pub values: Vec<Vec<Value>>,
    pub input: ValueInput,
}

/// Records every call and serves canned value ranges
pub struct FakeSheetsApi {
    pub sheets: Vec<SheetMeta>,
    pub canned: RefCell<HashMap<String, Vec<Vec<Value>>>>,
    pub updates: RefCell<Vec<RecordedUpdate>>,
    pub batches: RefCell<Vec<Value>>,
    /// When set, every remote call fails with an API error
    pub fail_all: RefCell<bool>,
    /// When set, only value writes fail; reads and batch requests
    /// still go through
    pub fail_updates: RefCell<bool>,
}

impl FakeSheetsApi {
    pub fn new(sheets: Vec<SheetMeta>) -> Self {
        Self {
            sheets,
            canned: RefCell::new(HashMap::new()),
            updates: RefCell::new(Vec::new()),
            batches: RefCell::new(Vec::new()),
            fail_all: RefCell::new(false),
            fail_updates: RefCell::new(false),
        }
    }

    pub fn set_values(&self, range: &str, values: Vec<Vec<Value>>) {
        self.canned.borrow_mut().insert(range.to_string(), values);
    }

    fn maybe_fail(&self) -> Result<(), SheetsError> {
        if *self.fail_all.borrow() {
            return Err(injected_failure());
        }
        Ok(())
    }
}

fn injected_failure() -> SheetsError {
    SheetsError::Api {
        status: 500,
        message: "injected failure".to_string(),
    }
}

impl SheetsApi for FakeSheetsApi {
    fn fetch_sheets(&self, _spreadsheet_id: &str) -> Result<Vec<SheetMeta>, SheetsError> {
        self.maybe_fail()?;
        Ok(self.sheets.clone())
    }

    fn get_values(
        &self,
        _spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<Value>>, SheetsError> {
        self.maybe_fail()?;
        Ok(self.canned.borrow().get(range).cloned().unwrap_or_default())
    }

    fn update_values(
        &self,
        _spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<Value>>,
        input: ValueInput,
    ) -> Result<(), SheetsError> {
        self.maybe_fail()?;
        if *self.fail_updates.borrow() {
            return Err(injected_failure());
        }
        self.updates.borrow_mut().push(RecordedUpdate {
            range: range.to_string(),
            values,
            input,
        });
        Ok(())
    }

    fn batch_update(&self, _spreadsheet_id: &str, requests: Vec<Value>) -> Result<(), SheetsError> {
        self.maybe_fail()?;
        self.batches.borrow_mut().extend(requests);
        Ok(())
    }
}
