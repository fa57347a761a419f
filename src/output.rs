//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored output,
//! a progress spinner, and formatted tables. The engine reports through the
//! [`Logger`] trait, so it never prints directly.

use crate::report::{ActionKind, ActionRecord, RunReport, RunSummary};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::time::Duration;

/// Receives every action of a run as it happens, then the final report.
pub trait Logger {
    fn action(&self, record: &ActionRecord);
    fn summary(&self, report: &RunReport);
}

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Progress spinners while walking
/// - Summary tables with statistics
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use autosort::output::OutputFormatter;
    /// OutputFormatter::success("MOVED: a.jpg -> Images/a.jpg");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Prints one action record, styled by its kind.
    pub fn record(record: &ActionRecord, dry_run: bool) {
        let line = record.to_string();
        match record.kind {
            ActionKind::Moved
            | ActionKind::Copied
            | ActionKind::Extracted
            | ActionKind::Removed => Self::success(&line),
            ActionKind::Skipped if dry_run => Self::dry_run_notice(&line),
            ActionKind::Skipped => Self::warning(&line),
            ActionKind::Failed => Self::error(&line),
        }
    }

    /// Creates a spinner counting processed entries.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use autosort::output::OutputFormatter;
    /// let pb = OutputFormatter::create_spinner();
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_spinner() -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {pos} processed {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }

    /// Prints the per-kind action counts of a run.
    pub fn action_counts(summary: &RunSummary) {
        Self::header("ACTIONS");
        let rows = [
            ("Moved", summary.moved, Color::Green),
            ("Copied", summary.copied, Color::Green),
            ("Extracted", summary.extracted, Color::Green),
            ("Removed", summary.removed, Color::Green),
            ("Skipped", summary.skipped, Color::Yellow),
            ("Failed", summary.failed, Color::Red),
        ];
        for (label, count, color) in rows {
            let count = if count > 0 {
                count.to_string().color(color)
            } else {
                count.to_string().normal()
            };
            println!("{:<10} {}", label, count);
        }
    }

    /// Prints a summary table with file statistics by category.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use autosort::output::OutputFormatter;
    /// use std::collections::BTreeMap;
    ///
    /// let mut counts = BTreeMap::new();
    /// counts.insert("Documents".to_string(), 15);
    /// counts.insert("Images".to_string(), 8);
    /// OutputFormatter::summary_table(&counts, 23);
    /// ```
    pub fn summary_table(category_counts: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let max_category_len = category_counts
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max(8); // At least "Category" width

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = max_category_len
        );
        println!("{}", "-".repeat(max_category_len + 10));

        for (category, count) in category_counts {
            let file_word = if *count == 1 { "file" } else { "files" };
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                file_word,
                width = max_category_len
            );
        }

        println!("{}", "-".repeat(max_category_len + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            if total_files == 1 { "file" } else { "files" },
            width = max_category_len
        );
    }
}

/// Prints a live action log and the final summary to the terminal.
///
/// In quiet mode only the summary is printed.
pub struct ConsoleLogger {
    quiet: bool,
    dry_run: bool,
    progress: ProgressBar,
}

impl ConsoleLogger {
    pub fn new(quiet: bool, dry_run: bool) -> Self {
        let progress = if quiet {
            ProgressBar::hidden()
        } else {
            OutputFormatter::create_spinner()
        };
        Self {
            quiet,
            dry_run,
            progress,
        }
    }
}

impl Logger for ConsoleLogger {
    fn action(&self, record: &ActionRecord) {
        self.progress.inc(1);
        if let Some(name) = record.source.file_name() {
            self.progress.set_message(name.to_string_lossy().into_owned());
        }
        if !self.quiet {
            self.progress
                .suspend(|| OutputFormatter::record(record, self.dry_run));
        }
    }

    fn summary(&self, report: &RunReport) {
        self.progress.finish_and_clear();

        let summary = report.summary();
        OutputFormatter::action_counts(&summary);
        let counts = report.category_counts();
        if !counts.is_empty() {
            OutputFormatter::summary_table(counts, counts.values().sum());
        }

        if report.interrupted {
            OutputFormatter::warning("Run interrupted, empty directories were not cleaned.");
        }
        if report.dry_run {
            OutputFormatter::dry_run_notice("No files were modified.");
        } else if summary.failed > 0 {
            OutputFormatter::warning(&format!(
                "{} action(s) failed. Please review errors above.",
                summary.failed
            ));
        } else {
            OutputFormatter::success("Sorting complete!");
        }
    }
}

/// Keeps everything it is told in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: RefCell<Vec<ActionRecord>>,
    summaries: Cell<usize>,
}

impl MemoryLogger {
    pub fn records(&self) -> Vec<ActionRecord> {
        self.records.borrow().clone()
    }

    /// How many times a summary was reported.
    pub fn summaries(&self) -> usize {
        self.summaries.get()
    }
}

impl Logger for MemoryLogger {
    fn action(&self, record: &ActionRecord) {
        self.records.borrow_mut().push(record.clone());
    }

    fn summary(&self, _report: &RunReport) {
        self.summaries.set(self.summaries.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_logger_collects_actions() {
        let logger = MemoryLogger::default();
        logger.action(&ActionRecord::new("/a.jpg", "/Images/a.jpg", ActionKind::Moved));
        logger.action(&ActionRecord::skipped("/b", "/b", "already in place"));
        logger.summary(&RunReport::new(false));

        assert_eq!(logger.records().len(), 2);
        assert_eq!(logger.records()[1].kind, ActionKind::Skipped);
        assert_eq!(logger.summaries(), 1);
    }

    #[test]
    fn test_quiet_console_logger_counts_actions() {
        let logger = ConsoleLogger::new(true, false);
        logger.action(&ActionRecord::new("/a.jpg", "/Images/a.jpg", ActionKind::Moved));
        logger.action(&ActionRecord::new("/b.jpg", "/Images/b.jpg", ActionKind::Moved));
        assert_eq!(logger.progress.position(), 2);
    }
}
