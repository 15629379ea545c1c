//! Run-scoped text log.
//!
//! Every component receives a `&RunLog` at construction or call time instead of
//! reaching for a global logger. Entries are appended to a timestamped text file
//! (when one is attached), kept in memory for the caller to inspect, and mirrored
//! to the `log` facade so a terminal logger can echo them.

use chrono::Local;
use log::Level;
use std::cell::RefCell;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Name of the log file written under the output root.
pub const LOG_FILE_NAME: &str = "sortback.log";

/// A single entry written to the run log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
}

/// Append-only, timestamped log for one organize or reverse run.
#[derive(Debug)]
pub struct RunLog {
    sink: Option<File>,
    entries: RefCell<Vec<LogEntry>>,
}

impl RunLog {
    /// Opens (or creates) the log file at `path` in append mode.
    ///
    /// The parent directory is created if it does not exist yet.
    pub fn to_file(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            sink: Some(file),
            entries: RefCell::new(Vec::new()),
        })
    }

    /// A log that only keeps entries in memory. Used by tests and dry runs.
    pub fn memory() -> Self {
        Self {
            sink: None,
            entries: RefCell::new(Vec::new()),
        }
    }

    /// Records a normal progress entry.
    pub fn info(&self, message: impl Into<String>) {
        self.write(Level::Info, message.into());
    }

    /// Records something that did not stop the current file, such as a collision
    /// or a missing ledger.
    pub fn warn(&self, message: impl Into<String>) {
        self.write(Level::Warn, message.into());
    }

    /// Records a failure. Per-file errors land here as well as in the report.
    pub fn error(&self, message: impl Into<String>) {
        self.write(Level::Error, message.into());
    }

    /// Records timing and other detail only shown with `--verbose`.
    pub fn debug(&self, message: impl Into<String>) {
        self.write(Level::Debug, message.into());
    }

    /// Returns a copy of everything logged so far.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.borrow().clone()
    }

    /// True if any entry at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|e| e.level == level && e.message.contains(needle))
    }

    fn write(&self, level: Level, message: String) {
        log::log!(level, "{}", message);

        if let Some(mut file) = self.sink.as_ref() {
            let line = format!(
                "{} - {} - {}\n",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                level,
                message
            );
            // A broken log sink must not abort file moves.
            if let Err(e) = file.write_all(line.as_bytes()) {
                log::warn!("Could not write to run log: {}", e);
            }
        }

        self.entries.borrow_mut().push(LogEntry { level, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_log_keeps_entries() {
        let log = RunLog::memory();
        log.info("first");
        log.warn("second");

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, Level::Info);
        assert!(log.contains(Level::Warn, "second"));
        assert!(!log.contains(Level::Error, "second"));
    }

    #[test]
    fn test_file_log_appends_timestamped_lines() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("nested").join(LOG_FILE_NAME);

        {
            let log = RunLog::to_file(&path).expect("Failed to open log");
            log.info("run one");
        }
        {
            let log = RunLog::to_file(&path).expect("Failed to reopen log");
            log.error("run two");
        }

        let content = fs::read_to_string(&path).expect("Failed to read log");
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" - INFO - run one"));
        assert!(lines[1].ends_with(" - ERROR - run two"));
    }
}
