//! Terminal output for the `sortback` binary.
//!
//! Colored status lines, the per-file progress bar, and the summary tables
//! printed after organize, dry-run and reverse runs all live here, so the rest
//! of the crate never prints directly.

use crate::file_organizer::{OrganizeReport, PlannedMove};
use crate::undo::ReverseReport;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::Path;

/// Entry point for everything the binary prints.
///
/// Status lines come in four flavors:
/// - success (green ✓)
/// - error (red ✗, on stderr)
/// - warning (yellow ⚠)
/// - info (cyan)
///
/// The report printers build on those and end with a per-category table.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sortback::output::OutputFormatter;
    /// OutputFormatter::success("report.pdf → Documents/");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark, on stderr.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sortback::output::OutputFormatter;
    /// OutputFormatter::error("2 file(s) could not be organized");
    /// ```
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sortback::output::OutputFormatter;
    /// OutputFormatter::warning("notes.txt skipped (destination exists)");
    /// ```
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sortback::output::OutputFormatter;
    /// OutputFormatter::info("Reversing previous organization...");
    /// ```
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a bold section header preceded by a blank line.
    ///
    /// # Arguments
    ///
    /// * `header` - The header text
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a yellow line tagged `[DRY RUN]`.
    ///
    /// # Arguments
    ///
    /// * `message` - The dry-run message
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates the progress bar for one organize pass.
    ///
    /// The bar starts empty; [`Organizer`](crate::Organizer) sets its length once
    /// the directory snapshot is taken.
    ///
    /// # Returns
    ///
    /// A styled `ProgressBar`, ready to hand to
    /// [`Organizer::with_progress`](crate::Organizer::with_progress).
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sortback::output::OutputFormatter;
    /// let pb = OutputFormatter::progress_bar();
    /// pb.set_length(10);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn progress_bar() -> ProgressBar {
        let pb = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} Organizing files")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints the outcome of an organize pass.
    ///
    /// One line per moved, merged, skipped, unmatched and failed file, then the
    /// summary table and a pointer to `sortback reverse` when a ledger was saved.
    ///
    /// # Arguments
    ///
    /// * `report` - The report returned by [`Organizer::organize`](crate::Organizer::organize)
    /// * `output_dir` - The output root the ledger was written under
    pub fn organize_report(report: &OrganizeReport, output_dir: &Path) {
        if report.files_seen == 0 {
            Self::info("No files found to organize.");
            return;
        }

        for (category, record) in &report.moved {
            Self::success(&format!(
                "{} → {}/",
                display_name(&record.previous),
                category
            ));
        }
        for path in &report.merged {
            Self::info(&format!("{} merged into existing file", display_name(path)));
        }
        for path in &report.skipped {
            Self::warning(&format!(
                "{} skipped (destination exists)",
                display_name(path)
            ));
        }
        for path in &report.unmatched {
            Self::plain_dim(&format!(
                "{} left in place (no matching category)",
                display_name(path)
            ));
        }
        for (path, reason) in &report.failures {
            Self::error(&format!("{}: {}", display_name(path), reason));
        }

        Self::summary_table(&report.category_counts(), report.moved.len());

        if report.ledger_written {
            println!(
                "\nLedger saved. Use 'sortback reverse {}' to revert this run.",
                output_dir.display()
            );
        }
    }

    /// Prints what a dry run would do.
    ///
    /// # Arguments
    ///
    /// * `planned` - The moves from [`Organizer::plan`](crate::Organizer::plan)
    /// * `files_left` - How many admitted files no rule claims
    pub fn plan(planned: &[PlannedMove], files_left: usize) {
        Self::header("DRY RUN: Files would be organized as follows:");

        let mut counts: HashMap<String, usize> = HashMap::new();
        for entry in planned {
            let marker = if entry.collides {
                " (destination exists)".yellow().to_string()
            } else {
                String::new()
            };
            println!(
                " - {} → {}{}",
                display_name(&entry.source),
                entry.placement.destination.display(),
                marker
            );
            *counts.entry(entry.placement.category.clone()).or_insert(0) += 1;
        }

        Self::summary_table(&counts, planned.len());
        if files_left > 0 {
            Self::plain_dim(&format!(
                "{} file(s) match no category and would stay put.",
                files_left
            ));
        }
        Self::dry_run_notice("No files were modified.");
    }

    /// Prints the outcome of a reversal.
    ///
    /// # Arguments
    ///
    /// * `report` - The report returned by [`Reverser::reverse`](crate::Reverser::reverse)
    pub fn reverse_report(report: &ReverseReport) {
        if !report.ledger_found {
            Self::warning("No ledger found; there is nothing to reverse.");
            return;
        }

        Self::success(&format!("Restored: {}", report.restored_files));
        if !report.skipped_files.is_empty() {
            Self::info(&format!(
                "Skipped: {} (no longer at their recorded location)",
                report.skipped_files.len()
            ));
        }
        for backup in &report.backups {
            Self::warning(&format!("Conflicting file kept as {}", backup.display()));
        }
        for (path, reason) in &report.failed_restores {
            Self::error(&format!("{}: {}", path.display(), reason));
        }
    }

    /// Prints file counts per category, busiest category first.
    ///
    /// Ties are broken by category name so the table is stable between runs.
    ///
    /// # Arguments
    ///
    /// * `category_counts` - Category names mapped to file counts
    /// * `total_files` - Total shown in the last row
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sortback::output::OutputFormatter;
    /// use std::collections::HashMap;
    ///
    /// let counts = HashMap::from([
    ///     ("Documents".to_string(), 4),
    ///     ("Images".to_string(), 9),
    /// ]);
    /// OutputFormatter::summary_table(&counts, 13);
    /// ```
    pub fn summary_table(category_counts: &HashMap<String, usize>, total_files: usize) {
        let mut rows: Vec<(&str, usize)> = category_counts
            .iter()
            .map(|(category, count)| (category.as_str(), *count))
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let width = rows
            .iter()
            .map(|(category, _)| category.len())
            .fold("Category".len(), usize::max);
        let rule = "=".repeat(width + 14);

        Self::header("SUMMARY");
        println!("{:<width$}  {:>5}", "Category".bold(), "Files".bold());
        println!("{}", rule.dimmed());
        for (category, count) in rows {
            println!(
                "{:<width$}  {:>5} {}",
                category,
                count.to_string().green(),
                plural(count)
            );
        }
        println!("{}", rule.dimmed());
        println!(
            "{:<width$}  {:>5} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural(total_files)
        );
    }

    fn plain_dim(message: &str) {
        println!("{}", message.dimmed());
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
