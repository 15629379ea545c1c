//! Organize passes: moving files from an input directory into category folders.
//!
//! An [`Organizer`] takes one snapshot of the input directory's immediate
//! children, computes a destination for each file, arbitrates collisions, and
//! records every move it makes in a [`CommitLedger`]. The ledger is persisted
//! once, after the pass, replacing the previous run's ledger.

use crate::config::{Config, ConfigError, FileFilters};
use crate::duplicate::{
    DecisionProvider, DuplicatePolicyResolver, MergeStrategy, PromptDecisionProvider, Resolution,
};
use crate::file_category::{CategoryMapper, Placement, ensure_directory};
use crate::ledger::{CommitLedger, CommitRecord, LEDGER_FILE_NAME, LedgerError, ledger_path};
use crate::run_log::{LOG_FILE_NAME, RunLog};
use indicatif::ProgressBar;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Errors that end an organize pass as a whole.
///
/// Per-file problems never show up here; they are collected in
/// [`OrganizeReport::failures`] and the pass moves on.
#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("Invalid filter configuration: {0}")]
    Filters(#[from] ConfigError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Result type for organize passes.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Moves `source` to `destination`.
///
/// Uses a rename; when the two paths live on different filesystems the file is
/// copied and the original removed.
pub fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(source, destination)?;
            fs::remove_file(source)
        }
        Err(e) => Err(e),
    }
}

/// A move a dry run would perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub placement: Placement,
    /// The destination is already occupied; the duplicate policy will decide.
    pub collides: bool,
}

/// What a dry run would do.
#[derive(Debug, Default)]
pub struct Plan {
    /// Files a rule (or the `Other` fallback) would move, in snapshot order.
    pub moves: Vec<PlannedMove>,
    /// Admitted files no rule claims; they would stay put.
    pub unmatched: Vec<PathBuf>,
}

/// What happened during one organize pass.
#[derive(Debug, Default)]
pub struct OrganizeReport {
    /// Files in the snapshot that passed the filters.
    pub files_seen: usize,
    /// Successful moves with their category, in ledger order.
    pub moved: Vec<(String, CommitRecord)>,
    /// Files merged into an existing destination.
    pub merged: Vec<PathBuf>,
    /// Files left in place because of a `do_nothing` collision decision.
    pub skipped: Vec<PathBuf>,
    /// Files no rule claimed, left in place.
    pub unmatched: Vec<PathBuf>,
    /// Files whose processing failed, with the reason.
    pub failures: Vec<(PathBuf, String)>,
    /// Whether the ledger was written at the end of the pass.
    pub ledger_written: bool,
}

impl OrganizeReport {
    /// Number of moved files per category.
    pub fn category_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for (category, _) in &self.moved {
            *counts.entry(category.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs organize passes for one configuration.
pub struct Organizer<'a> {
    config: &'a Config,
    log: &'a RunLog,
    resolver: DuplicatePolicyResolver<'a>,
    progress: ProgressBar,
}

impl<'a> Organizer<'a> {
    /// Creates an organizer that asks on the terminal when a collision has no
    /// configured policy, and has no merge strategy.
    pub fn new(config: &'a Config, log: &'a RunLog) -> Self {
        Self {
            config,
            log,
            resolver: DuplicatePolicyResolver::new(
                config.duplicate_policy,
                Box::new(PromptDecisionProvider::stdio()),
                log,
            ),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_decision_provider(mut self, decider: impl DecisionProvider + 'a) -> Self {
        self.resolver.set_decision_provider(Box::new(decider));
        self
    }

    pub fn with_merge_strategy(mut self, strategy: impl MergeStrategy + 'a) -> Self {
        self.resolver.set_merge_strategy(Box::new(strategy));
        self
    }

    /// Reports per-file progress on `progress`. Its length is set from the snapshot.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Organizes the files directly inside `input_dir` into `output_dir`.
    ///
    /// A missing or empty input directory is not an error: the pass logs that no
    /// files were found and leaves any existing ledger alone. Otherwise the ledger
    /// is overwritten with this pass's moves, even if there were none.
    pub fn organize(
        &mut self,
        input_dir: &Path,
        output_dir: &Path,
    ) -> OrganizeResult<OrganizeReport> {
        let mut report = OrganizeReport::default();
        let files = self.snapshot(input_dir, output_dir)?;

        if files.is_empty() {
            self.log
                .info("It seems like there are no files or resources here.");
            return Ok(report);
        }

        report.files_seen = files.len();
        self.progress.set_length(files.len() as u64);

        let mapper = CategoryMapper::new(self.config, output_dir);
        let mut ledger = CommitLedger::new();

        for file in &files {
            let started = Instant::now();
            self.organize_file(&mapper, file, &mut ledger, &mut report);
            self.progress.suspend(|| {
                self.log.debug(format!(
                    "Processed file: {}, Duration: {:?}",
                    file.display(),
                    started.elapsed()
                ))
            });
            self.progress.inc(1);
        }
        self.progress.finish_and_clear();

        let path = ledger_path(output_dir);
        ledger.persist(&path)?;
        report.ledger_written = true;
        self.log.info(format!(
            "File commits saved to {} ({} moves).",
            path.display(),
            ledger.len()
        ));

        if !report.failures.is_empty() {
            self.log.error(format!(
                "{} file(s) could not be organized.",
                report.failures.len()
            ));
        }
        self.log.info("File automation completed.");

        Ok(report)
    }

    /// Computes what [`organize`](Self::organize) would do without touching the
    /// filesystem.
    pub fn plan(&self, input_dir: &Path, output_dir: &Path) -> OrganizeResult<Plan> {
        let mapper = CategoryMapper::new(self.config, output_dir);
        let mut plan = Plan::default();

        for file in self.snapshot(input_dir, output_dir)? {
            match mapper.place(&file) {
                Ok(Some(placement)) => {
                    let collides = placement.destination.exists();
                    plan.moves.push(PlannedMove {
                        source: file,
                        placement,
                        collides,
                    });
                }
                Ok(None) => plan.unmatched.push(file),
                Err(e) => self
                    .log
                    .warn(format!("Cannot plan {}: {}", file.display(), e)),
            }
        }

        Ok(plan)
    }

    /// Lists the regular files directly inside `input_dir` that this pass may touch.
    ///
    /// The ledger and run log are never candidates when the input and output
    /// directories are the same, however the two paths are spelled.
    fn snapshot(&self, input_dir: &Path, output_dir: &Path) -> OrganizeResult<Vec<PathBuf>> {
        let filters = self.config.file_filters()?;
        let shares_output = same_directory(input_dir, output_dir);

        let entries = match fs::read_dir(input_dir) {
            Ok(entries) => entries,
            Err(e) => {
                self.log.warn(format!(
                    "Cannot read input directory {}: {}",
                    input_dir.display(),
                    e
                ));
                return Ok(Vec::new());
            }
        };

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| !(shares_output && is_own_artifact(path)))
            .filter(|path| admitted(&filters, path))
            .collect();
        files.sort();

        Ok(files)
    }

    fn organize_file(
        &mut self,
        mapper: &CategoryMapper<'_>,
        file: &Path,
        ledger: &mut CommitLedger,
        report: &mut OrganizeReport,
    ) {
        let placement = match mapper.place(file) {
            Ok(Some(placement)) => placement,
            Ok(None) => {
                self.progress.suspend(|| {
                    self.log.info(format!(
                        "File {} does not match any category and will not be moved.",
                        file.display()
                    ))
                });
                report.unmatched.push(file.to_path_buf());
                return;
            }
            Err(e) => {
                self.fail(report, file, format!("cannot determine destination: {}", e));
                return;
            }
        };

        if let Err(e) = ensure_directory(&placement.directory) {
            self.fail(
                report,
                file,
                format!(
                    "failed to create directory {}: {}",
                    placement.directory.display(),
                    e
                ),
            );
            return;
        }

        if !placement.destination.exists() {
            match move_file(file, &placement.destination) {
                Ok(()) => {
                    self.progress.suspend(|| {
                        self.log.info(format!(
                            "Moved {} to {}.",
                            file.display(),
                            placement.destination.display()
                        ))
                    });
                    let record = CommitRecord {
                        previous: file.to_path_buf(),
                        current: placement.destination.clone(),
                    };
                    ledger.push(record.clone());
                    report.moved.push((placement.category, record));
                }
                Err(e) => self.fail(
                    report,
                    file,
                    format!(
                        "failed to move to {}: {}",
                        placement.destination.display(),
                        e
                    ),
                ),
            }
            return;
        }

        // The bar is hidden while a prompt may be waiting for input.
        let resolution = self
            .progress
            .suspend(|| self.resolver.resolve(file, &placement.destination));
        match resolution {
            Ok(Resolution::Replaced(record)) => {
                ledger.push(record.clone());
                report.moved.push((placement.category, record));
            }
            Ok(Resolution::Merged) => report.merged.push(file.to_path_buf()),
            Ok(Resolution::Skipped) => report.skipped.push(file.to_path_buf()),
            Err(e) => self.fail(report, file, e.to_string()),
        }
    }

    fn fail(&self, report: &mut OrganizeReport, file: &Path, reason: String) {
        // The run log echoes to stderr, which would tear through the bar.
        self.progress.suspend(|| {
            self.log
                .error(format!("Error organizing {}: {}", file.display(), reason))
        });
        report.failures.push((file.to_path_buf(), reason));
    }
}

fn admitted(filters: &FileFilters, path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| filters.admits(&name.to_string_lossy()))
}

/// Compares two directories by their canonical form, falling back to the paths
/// as given when either cannot be resolved.
fn same_directory(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn is_own_artifact(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name == LEDGER_FILE_NAME || name == LOG_FILE_NAME)
}

/// Runs one organize pass with the default collaborators.
///
/// Collisions without a configured policy are asked on the terminal, and
/// `merge` has no strategy.
pub fn organize(
    input_dir: &Path,
    output_dir: &Path,
    config: &Config,
    log: &RunLog,
) -> OrganizeResult<OrganizeReport> {
    Organizer::new(config, log).organize(input_dir, output_dir)
}
