//! Record of the last successful import

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::report::ImportReport;

/// Errors reading or writing the last-import record
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("could not determine a data directory for csvgrader")]
    NoDataDir,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("corrupt last-import record: {0}")]
    Parse(#[from] serde_json::Error),
}

/// What was last imported, and when
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastImport {
    pub summary: String,
    pub count: usize,
    pub target: String,
    pub imported_at: DateTime<Utc>,
}

impl LastImport {
    pub fn from_report(report: &ImportReport, target: &str) -> Self {
        Self {
            summary: report.summary.clone(),
            count: report.results.len(),
            target: target.to_string(),
            imported_at: Utc::now(),
        }
    }

    /// Default record location.
    ///
    /// `CSVGRADER_DATA_DIR` overrides the platform data directory.
    pub fn default_path() -> Result<PathBuf, HistoryError> {
        if let Ok(dir) = std::env::var("CSVGRADER_DATA_DIR") {
            return Ok(PathBuf::from(dir).join("last_import.json"));
        }
        directories::ProjectDirs::from("", "", "csvgrader")
            .map(|dirs| dirs.data_dir().join("last_import.json"))
            .ok_or(HistoryError::NoDataDir)
    }

    pub fn load(path: &Path) -> Result<Option<Self>, HistoryError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    pub fn save(&self, path: &Path) -> Result<(), HistoryError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
