//! Reversal of the most recent organize run.
//!
//! The [`Reverser`] replays the persisted ledger, oldest move first, moving each
//! file from its recorded `current` path back to its `previous` path.

use crate::file_organizer::move_file;
use crate::ledger::{CommitLedger, CommitRecord, LedgerError, ledger_path};
use crate::run_log::RunLog;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReverseError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Represents the result of a reversal.
#[derive(Debug, Default)]
pub struct ReverseReport {
    /// Whether a ledger was found at all.
    pub ledger_found: bool,
    /// Number of files moved back.
    pub restored_files: usize,
    /// Records whose file was no longer at its recorded location.
    pub skipped_files: Vec<PathBuf>,
    /// Files that were in the way at an original location, renamed aside.
    pub backups: Vec<PathBuf>,
    /// Records that could not be restored, with the reason.
    pub failed_restores: Vec<(PathBuf, String)>,
}

impl ReverseReport {
    /// Returns the total number of records processed.
    pub fn total_processed(&self) -> usize {
        self.restored_files + self.failed_restores.len() + self.skipped_files.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed_restores.is_empty()
    }
}

/// Replays the commit ledger of an output root in reverse.
pub struct Reverser<'a> {
    log: &'a RunLog,
}

impl<'a> Reverser<'a> {
    pub fn new(log: &'a RunLog) -> Self {
        Self { log }
    }

    /// Restores every file recorded in the ledger under `output_root`.
    ///
    /// A missing ledger is only a warning. Records whose file has already gone
    /// from its `current` path are skipped, so running this twice in a row is a
    /// no-op the second time. The ledger itself is left in place.
    ///
    /// If another file now occupies a `previous` path it is renamed aside to
    /// `<name>.bak.<YYYYmmdd-HHMMSS>` first.
    ///
    /// # Errors
    ///
    /// Only an unreadable or malformed ledger is an error. Failed moves are
    /// recorded in the report and the remaining records are still processed.
    pub fn reverse(&self, output_root: &Path) -> Result<ReverseReport, ReverseError> {
        let path = ledger_path(output_root);
        let mut report = ReverseReport::default();

        let Some(ledger) = CommitLedger::load(&path)? else {
            self.log
                .warn(format!("No commit log found at {}.", path.display()));
            return Ok(report);
        };
        report.ledger_found = true;

        for record in ledger.records() {
            if !record.current.exists() {
                self.log.debug(format!(
                    "Skipping {}: no longer at its recorded location.",
                    record.current.display()
                ));
                report.skipped_files.push(record.current.clone());
                continue;
            }

            match self.restore(record, &mut report) {
                Ok(()) => {
                    report.restored_files += 1;
                    self.log.info(format!(
                        "Reversed {} to {}.",
                        record.current.display(),
                        record.previous.display()
                    ));
                }
                Err(reason) => {
                    self.log.error(format!(
                        "Could not reverse {}: {}",
                        record.current.display(),
                        reason
                    ));
                    report
                        .failed_restores
                        .push((record.current.clone(), reason));
                }
            }
        }

        self.log.info("Reversal of changes completed.");
        Ok(report)
    }

    fn restore(&self, record: &CommitRecord, report: &mut ReverseReport) -> Result<(), String> {
        if let Some(parent) = record.previous.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Could not create {}: {}", parent.display(), e))?;
        }

        if record.previous.exists() {
            let backup = backup_path(&record.previous);
            fs::rename(&record.previous, &backup)
                .map_err(|e| format!("Could not back up conflicting file: {}", e))?;
            self.log.warn(format!(
                "{} was occupied; moved it to {}.",
                record.previous.display(),
                backup.display()
            ));
            report.backups.push(backup);
        }

        move_file(&record.current, &record.previous)
            .map_err(|e| format!("Failed to restore file: {}", e))
    }
}

/// Example: `file.txt` becomes `file.txt.bak.20251109-143052`.
fn backup_path(original_path: &Path) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let filename = original_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    original_path.with_file_name(format!("{}.bak.{}", filename, timestamp))
}

/// Reverses the last organize run recorded under `output_root`.
pub fn reverse(output_root: &Path, log: &RunLog) -> Result<ReverseReport, ReverseError> {
    Reverser::new(log).reverse(output_root)
}
