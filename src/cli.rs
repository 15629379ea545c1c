//! Command-line interface module for sortback.
//!
//! This module handles:
//! - Argument parsing (`organize` and `reverse` subcommands)
//! - Configuration discovery and loading
//! - Wiring the run log, organizer and reverser together
//! - Reporting results through [`OutputFormatter`]

use crate::config::{Config, DuplicatePolicy};
use crate::file_organizer::Organizer;
use crate::output::OutputFormatter;
use crate::run_log::{LOG_FILE_NAME, RunLog};
use crate::undo::Reverser;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "sortback", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Echo run-log entries to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Represents a CLI command to execute.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Sort the files in INPUT into category folders under OUTPUT.
    Organize {
        input: PathBuf,
        output: PathBuf,
        /// Category mapping document (JSON, or TOML with a .toml extension).
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Policy for occupied destinations: merge, replace or do_nothing.
        /// Overrides the configuration; without either you are asked per file.
        #[arg(long, value_parser = parse_policy)]
        on_duplicate: Option<DuplicatePolicy>,
        /// Show what would happen without moving anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Move the files of the last organize run under OUTPUT back.
    Reverse { output: PathBuf },
}

fn parse_policy(value: &str) -> Result<DuplicatePolicy, String> {
    DuplicatePolicy::parse(value)
        .ok_or_else(|| format!("'{}' is not one of merge, replace, do_nothing", value))
}

/// Runs the CLI application with the given command.
///
/// # Examples
///
/// ```no_run
/// use sortback::cli::{run_cli, Command};
/// use std::path::PathBuf;
///
/// let result = run_cli(Command::Reverse { output: PathBuf::from("/data/sorted") });
/// if let Err(e) = result {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(command: Command) -> Result<(), String> {
    match command {
        Command::Organize {
            input,
            output,
            config,
            on_duplicate,
            dry_run,
        } => {
            if dry_run {
                organize_dry_run(&input, &output, config.as_deref(), on_duplicate)
            } else {
                organize_directory(&input, &output, config.as_deref(), on_duplicate)
            }
        }
        Command::Reverse { output } => reverse_directory(&output),
    }
}

/// Loads the configuration the way every organize run does and applies the
/// command-line duplicate policy override.
pub fn load_config(
    config_path: Option<&Path>,
    on_duplicate: Option<DuplicatePolicy>,
    log: &RunLog,
) -> Config {
    let mut config = match Config::discover(config_path) {
        Some(path) => Config::load(&path, log),
        None => {
            log.info("No configuration file found; no category rules are active.");
            Config::default()
        }
    };
    if on_duplicate.is_some() {
        config.duplicate_policy = on_duplicate;
    }
    config
}

/// Organizes `input` into `output`, then prints the summary.
///
/// The output directory is created if needed and receives the run log and the
/// ledger. Files that could not be organized make this return an error after
/// the ledger for the successful moves has been saved.
pub fn organize_directory(
    input: &Path,
    output: &Path,
    config_path: Option<&Path>,
    on_duplicate: Option<DuplicatePolicy>,
) -> Result<(), String> {
    OutputFormatter::info(&format!(
        "Organizing contents of {} into {}",
        input.display(),
        output.display()
    ));

    if !output.exists() {
        fs::create_dir_all(output)
            .map_err(|e| format!("Error creating output directory {}: {}", output.display(), e))?;
        OutputFormatter::warning(&format!("Output directory {} created.", output.display()));
    }

    let log = RunLog::to_file(&output.join(LOG_FILE_NAME))
        .map_err(|e| format!("Error opening run log: {}", e))?;
    log.info("File automation started.");

    let config = load_config(config_path, on_duplicate, &log);
    let report = Organizer::new(&config, &log)
        .with_progress(OutputFormatter::progress_bar())
        .organize(input, output)
        .map_err(|e| {
            log.error(e.to_string());
            format!("Error: {}", e)
        })?;

    OutputFormatter::organize_report(&report, output);

    if !report.is_complete_success() {
        return Err(format!(
            "{} file(s) could not be organized; see {}",
            report.failures.len(),
            output.join(LOG_FILE_NAME).display()
        ));
    }
    Ok(())
}

/// Shows what [`organize_directory`] would do. Nothing is created or moved and
/// no log file is written.
pub fn organize_dry_run(
    input: &Path,
    output: &Path,
    config_path: Option<&Path>,
    on_duplicate: Option<DuplicatePolicy>,
) -> Result<(), String> {
    OutputFormatter::dry_run_notice(&format!("Analyzing contents of {}", input.display()));

    let log = RunLog::memory();
    let config = load_config(config_path, on_duplicate, &log);
    let organizer = Organizer::new(&config, &log);
    let plan = organizer
        .plan(input, output)
        .map_err(|e| format!("Error: {}", e))?;

    if plan.moves.is_empty() {
        OutputFormatter::info("No files found to organize.");
        return Ok(());
    }

    OutputFormatter::plan(&plan.moves, plan.unmatched.len());
    Ok(())
}

/// Reverses the last organize run recorded under `output`.
fn reverse_directory(output: &Path) -> Result<(), String> {
    OutputFormatter::info("Reversing previous organization...");

    // Without an output directory there is no ledger, and nothing to log into.
    let log = if output.is_dir() {
        RunLog::to_file(&output.join(LOG_FILE_NAME))
            .map_err(|e| format!("Error opening run log: {}", e))?
    } else {
        RunLog::memory()
    };

    let report = Reverser::new(&log)
        .reverse(output)
        .map_err(|e| format!("Error: {}", e))?;

    OutputFormatter::reverse_report(&report);

    if !report.is_complete_success() {
        return Err(format!(
            "{} file(s) could not be restored",
            report.failed_restores.len()
        ));
    }
    Ok(())
}
