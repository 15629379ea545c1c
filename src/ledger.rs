//! Commit ledger for reversible organize runs.
//!
//! Each successful move is recorded as a [`CommitRecord`]. At the end of a pass
//! the whole ledger is written to `<output_root>/.sortback_ledger.json`,
//! replacing whatever the previous run left there.
//!
//! Only the most recent run can be undone. Two organize passes without a
//! reversal in between lose the first pass's records for good.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the persisted ledger under the output root.
pub const LEDGER_FILE_NAME: &str = ".sortback_ledger.json";

/// Returns the fixed ledger location for `output_root`.
pub fn ledger_path(output_root: &Path) -> PathBuf {
    output_root.join(LEDGER_FILE_NAME)
}

/// One successful move: where the file was and where it went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub previous: PathBuf,
    pub current: PathBuf,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Failed to write ledger {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },
    #[error("Failed to read ledger {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },
    #[error("Invalid ledger format in {}: {source}", path.display())]
    InvalidFormat {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Ordered moves of one run, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitLedger {
    records: Vec<CommitRecord>,
}

impl CommitLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a move from `previous` to `current`.
    ///
    /// # Example
    ///
    /// ```
    /// use sortback::CommitLedger;
    ///
    /// let mut ledger = CommitLedger::new();
    /// ledger.record("/in/a.pdf", "/out/Documents/a.pdf");
    /// assert_eq!(ledger.len(), 1);
    /// ```
    pub fn record(&mut self, previous: impl Into<PathBuf>, current: impl Into<PathBuf>) {
        self.records.push(CommitRecord {
            previous: previous.into(),
            current: current.into(),
        });
    }

    /// Appends an already built record.
    pub fn push(&mut self, record: CommitRecord) {
        self.records.push(record);
    }

    /// The recorded moves, oldest first. This is the order reversal replays.
    pub fn records(&self) -> &[CommitRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Writes the ledger as a JSON array to `path`, overwriting any existing file.
    pub fn persist(&self, path: &Path) -> Result<(), LedgerError> {
        let json = serde_json::to_string_pretty(&self.records).map_err(|e| {
            LedgerError::WriteFailed {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            }
        })?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| LedgerError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        fs::write(path, json).map_err(|e| LedgerError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Reads a persisted ledger. Returns `Ok(None)` when there is none.
    pub fn load(path: &Path) -> Result<Option<Self>, LedgerError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(LedgerError::ReadFailed {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };

        let records: Vec<CommitRecord> =
            serde_json::from_str(&content).map_err(|e| LedgerError::InvalidFormat {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(Some(Self { records }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_keeps_order() {
        let mut ledger = CommitLedger::new();
        ledger.record("/in/a.txt", "/out/Documents/a.txt");
        ledger.record("/in/b.png", "/out/Images/b.png");

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.records()[0].previous, PathBuf::from("/in/a.txt"));
        assert_eq!(ledger.records()[1].current, PathBuf::from("/out/Images/b.png"));
    }

    #[test]
    fn test_load_missing_ledger() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let loaded = CommitLedger::load(&ledger_path(temp_dir.path())).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_persist_writes_documented_shape() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = ledger_path(temp_dir.path());

        let mut ledger = CommitLedger::new();
        ledger.record("/in/a.txt", "/out/Documents/a.txt");
        ledger.persist(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{ "previous": "/in/a.txt", "current": "/out/Documents/a.txt" }])
        );

        let loaded = CommitLedger::load(&path).unwrap().unwrap();
        assert_eq!(loaded, ledger);
    }

    #[test]
    fn test_persist_overwrites_previous_run() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = ledger_path(temp_dir.path());

        let mut first = CommitLedger::new();
        first.record("/in/a.txt", "/out/Documents/a.txt");
        first.record("/in/b.txt", "/out/Documents/b.txt");
        first.persist(&path).unwrap();

        let mut second = CommitLedger::new();
        second.record("/in/c.png", "/out/Images/c.png");
        second.persist(&path).unwrap();

        let loaded = CommitLedger::load(&path).unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.records()[0].previous, PathBuf::from("/in/c.png"));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = ledger_path(temp_dir.path());
        fs::write(&path, "{\"operations\": 3}").unwrap();

        let result = CommitLedger::load(&path);
        assert!(matches!(result, Err(LedgerError::InvalidFormat { .. })));
    }
}
