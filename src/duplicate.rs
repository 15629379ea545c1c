//! Collision handling for destinations that already exist.
//!
//! When the computed destination of a move is occupied, the
//! [`DuplicatePolicyResolver`] decides what happens:
//!
//! - a run-level [`DuplicatePolicy`] from the config is applied directly;
//! - otherwise a [`DecisionProvider`] is asked, once per collision;
//! - `merge` is delegated to a pluggable [`MergeStrategy`]. There is no
//!   built-in merge; selecting it without a strategy fails that one file.
//!
//! The existence check done by the caller and the move done here are separate
//! filesystem calls. Nothing locks the destination in between.

use crate::config::DuplicatePolicy;
use crate::file_organizer::move_file;
use crate::ledger::CommitRecord;
use crate::run_log::RunLog;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Supplies a duplicate policy when the configuration does not fix one.
pub trait DecisionProvider {
    fn decide(&mut self, source: &Path, destination: &Path) -> io::Result<DuplicatePolicy>;
}

/// Always answers with the same policy.
#[derive(Debug, Clone, Copy)]
pub struct FixedDecision(pub DuplicatePolicy);

impl DecisionProvider for FixedDecision {
    fn decide(&mut self, _source: &Path, _destination: &Path) -> io::Result<DuplicatePolicy> {
        Ok(self.0)
    }
}

/// Asks a human on a line-oriented terminal.
///
/// Only `merge`, `replace` and `do_nothing` are accepted; anything else is
/// re-prompted. Running out of input is an error, never a default answer.
pub struct PromptDecisionProvider<R, W> {
    input: R,
    output: W,
}

impl PromptDecisionProvider<io::BufReader<io::Stdin>, io::Stdout> {
    /// Prompts on stdout and reads answers from stdin. Stdin is only locked
    /// while a line is being read.
    pub fn stdio() -> Self {
        Self::new(io::BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> PromptDecisionProvider<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Gives back the output sink, mostly so tests can read what was printed.
    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> DecisionProvider for PromptDecisionProvider<R, W> {
    fn decide(&mut self, source: &Path, destination: &Path) -> io::Result<DuplicatePolicy> {
        writeln!(
            self.output,
            "Duplicate found: {} already exists (incoming {})",
            destination.display(),
            source.display()
        )?;
        writeln!(self.output, "Options: [merge, replace, do_nothing]")?;
        write!(self.output, "Choose an action for duplicates: ")?;
        self.output.flush()?;

        let mut line = String::new();
        loop {
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "input closed before a duplicate action was chosen",
                ));
            }
            if let Some(policy) = DuplicatePolicy::parse(&line) {
                return Ok(policy);
            }
            write!(self.output, "Invalid option. Choose an action for duplicates: ")?;
            self.output.flush()?;
        }
    }
}

/// Combines an incoming file into an existing destination.
///
/// Implementations decide what happens to `source`. A merge never produces a
/// commit record, so it cannot be undone by reversal.
pub trait MergeStrategy {
    fn merge(&self, source: &Path, destination: &Path) -> io::Result<()>;
}

/// Outcome of resolving one collision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The destination was replaced; the record must go into the ledger.
    Replaced(CommitRecord),
    /// The merge strategy ran.
    Merged,
    /// The source was left where it is.
    Skipped,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("merge selected for {} but no merge strategy is configured", .0.display())]
    MissingMergeStrategy(PathBuf),
    #[error("no duplicate action chosen for {}: {source}", path.display())]
    Decision { path: PathBuf, source: io::Error },
    #[error("failed to remove existing {}: {source}", path.display())]
    RemoveFailed { path: PathBuf, source: io::Error },
    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    #[error("failed to merge {} into {}: {source}", from.display(), to.display())]
    MergeFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

pub struct DuplicatePolicyResolver<'a> {
    policy: Option<DuplicatePolicy>,
    decider: Box<dyn DecisionProvider + 'a>,
    merge: Option<Box<dyn MergeStrategy + 'a>>,
    log: &'a RunLog,
}

impl<'a> DuplicatePolicyResolver<'a> {
    pub fn new(
        policy: Option<DuplicatePolicy>,
        decider: Box<dyn DecisionProvider + 'a>,
        log: &'a RunLog,
    ) -> Self {
        Self {
            policy,
            decider,
            merge: None,
            log,
        }
    }

    pub fn set_decision_provider(&mut self, decider: Box<dyn DecisionProvider + 'a>) {
        self.decider = decider;
    }

    pub fn set_merge_strategy(&mut self, strategy: Box<dyn MergeStrategy + 'a>) {
        self.merge = Some(strategy);
    }

    /// Resolves a collision between `source` and the existing `destination`.
    pub fn resolve(
        &mut self,
        source: &Path,
        destination: &Path,
    ) -> Result<Resolution, ResolveError> {
        self.log
            .warn(format!("Duplicate found for {}.", source.display()));

        let action = match self.policy {
            Some(policy) => policy,
            None => self
                .decider
                .decide(source, destination)
                .map_err(|e| ResolveError::Decision {
                    path: source.to_path_buf(),
                    source: e,
                })?,
        };

        match action {
            DuplicatePolicy::Replace => self.replace(source, destination),
            DuplicatePolicy::Merge => self.merge(source, destination),
            DuplicatePolicy::DoNothing => {
                self.log.info(format!("Skipping {}.", source.display()));
                Ok(Resolution::Skipped)
            }
        }
    }

    fn replace(&self, source: &Path, destination: &Path) -> Result<Resolution, ResolveError> {
        self.log.info(format!(
            "Replacing {} with {}.",
            destination.display(),
            source.display()
        ));

        std::fs::remove_file(destination).map_err(|e| ResolveError::RemoveFailed {
            path: destination.to_path_buf(),
            source: e,
        })?;
        move_file(source, destination).map_err(|e| ResolveError::MoveFailed {
            from: source.to_path_buf(),
            to: destination.to_path_buf(),
            source: e,
        })?;

        Ok(Resolution::Replaced(CommitRecord {
            previous: source.to_path_buf(),
            current: destination.to_path_buf(),
        }))
    }

    fn merge(&self, source: &Path, destination: &Path) -> Result<Resolution, ResolveError> {
        let Some(strategy) = self.merge.as_ref() else {
            return Err(ResolveError::MissingMergeStrategy(source.to_path_buf()));
        };

        self.log.info(format!(
            "Merging {} into {}.",
            source.display(),
            destination.display()
        ));
        strategy
            .merge(source, destination)
            .map_err(|e| ResolveError::MergeFailed {
                from: source.to_path_buf(),
                to: destination.to_path_buf(),
                source: e,
            })?;

        Ok(Resolution::Merged)
    }
}
