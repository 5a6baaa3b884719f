//! The persisted cross-session usage record and its JSON file.
//!
//! File format: `{"date": "YYYY-MM-DD", "total_calls": <u64>}`.  Writes go
//! through a temp file in the same directory followed by a rename, so a
//! reader never sees a truncated record.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crowd_domain::error::{Error, Result};

/// Calls accepted across all sessions on `date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub date: NaiveDate,
    pub total_calls: u64,
}

impl UsageRecord {
    /// A zeroed record for `today`.
    pub fn fresh(today: NaiveDate) -> Self {
        Self {
            date: today,
            total_calls: 0,
        }
    }
}

/// JSON file holding a single [`UsageRecord`].
#[derive(Debug, Clone)]
pub struct UsageFile {
    path: PathBuf,
}

impl UsageFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record.  `Ok(None)` when the file does not exist.
    pub fn read(&self) -> Result<Option<UsageRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let record = serde_json::from_str(&raw)?;
        Ok(Some(record))
    }

    /// Replace the file contents with `record`.
    pub fn write(&self, record: &UsageRecord) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer(tmp.as_file_mut(), record)?;
        tmp.as_file_mut().flush()?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}
