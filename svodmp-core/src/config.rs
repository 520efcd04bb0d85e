//! Run configuration: the JSON config file and spreadsheet-id extraction

use crate::error::ImportError;
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
}

impl AppConfig {
    /// Load `config.json`. A missing file is tolerated (empty config);
    /// a malformed one is not.
    pub fn load(path: &Path) -> Result<Self, ImportError> {
        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| ImportError::InvalidConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Accept a bare spreadsheet id or a full document URL and return the id
pub fn extract_spreadsheet_id(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Some((_, rest)) = value.split_once("/spreadsheets/d/") {
        let id = rest.split('/').next().unwrap_or(rest);
        return Some(id.to_string());
    }
    if let Some((id, _)) = value.split_once("/edit") {
        return Some(id.to_string());
    }
    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_id_passes_through() {
        assert_eq!(
            extract_spreadsheet_id("1AbC_dEf").as_deref(),
            Some("1AbC_dEf")
        );
        assert_eq!(extract_spreadsheet_id("  "), None);
    }

    #[test]
    fn full_url_is_stripped_to_the_id() {
        let url = "https://docs.google.com/spreadsheets/d/1AbC_dEf/edit#gid=0";
        assert_eq!(extract_spreadsheet_id(url).as_deref(), Some("1AbC_dEf"));
    }

    #[test]
    fn edit_suffix_without_path_segment_is_truncated() {
        assert_eq!(
            extract_spreadsheet_id("1AbC_dEf/edit").as_deref(),
            Some("1AbC_dEf")
        );
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/config.json")).unwrap();
        assert!(config.spreadsheet_id.is_none());
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ImportError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn config_reads_spreadsheet_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"spreadsheet_id": "1AbC"}"#).unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.spreadsheet_id.as_deref(), Some("1AbC"));
    }
}
