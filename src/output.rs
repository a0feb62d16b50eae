//! Output formatting and styling module.
//!
//! Centralises all terminal output: coloured status lines, the batch
//! progress bar, summary tables for sorts and undos, and JSON reports.

use crate::sorter::BatchReport;
use crate::undo::UndoReport;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeMap;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// ```no_run
    /// use filesorter::output::OutputFormatter;
    /// OutputFormatter::success("Files sorted");
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

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar for a batch of `total` files.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        let pb = ProgressBar::new(total);
        pb.set_style(style);
        pb
    }

    /// Prints a table of file counts per category.
    ///
    /// ```no_run
    /// use filesorter::output::OutputFormatter;
    /// use std::collections::BTreeMap;
    ///
    /// let mut counts = BTreeMap::new();
    /// counts.insert("Documents".to_string(), 15);
    /// counts.insert("Images".to_string(), 8);
    /// OutputFormatter::summary_table(&counts, 23);
    /// ```
    pub fn summary_table(category_counts: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let width = category_counts
            .keys()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max(8); // At least "Category" width

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));

        for (category, count) in category_counts {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }

        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural(total_files),
            width = width
        );
    }

    /// Prints the outcome of a sort batch.
    pub fn batch_summary(report: &BatchReport) {
        if !report.per_category.is_empty() {
            Self::summary_table(&report.per_category, report.moved);
        }

        Self::header("RESULT");
        Self::success(&format!("Moved: {} {}", report.moved, plural(report.moved)));
        if report.skipped > 0 {
            Self::plain(&format!("  Left in place: {}", report.skipped));
        }
        if !report.failures.is_empty() {
            Self::error(&format!("Errors: {}", report.error_count()));
            for failure in &report.failures {
                eprintln!("    - {}: {}", failure.path.display(), failure.reason);
            }
        }
        Self::plain(&format!(
            "  Time taken: {:.2} seconds",
            report.elapsed.as_secs_f64()
        ));
        Self::plain(&format!("  Session: {}", report.session));
    }

    /// Prints the outcome of an undo.
    pub fn undo_summary(report: &UndoReport) {
        Self::success(&format!("Restored: {}", report.restored));

        if !report.missing.is_empty() {
            Self::warning(&format!("Already missing: {}", report.missing.len()));
            for path in &report.missing {
                println!("    - {}", path.display());
            }
        }

        if !report.failures.is_empty() {
            Self::error(&format!("Failed: {}", report.error_count()));
            for (path, reason) in &report.failures {
                eprintln!("    - {}: {}", path.display(), reason);
            }
            Self::warning("The session was removed from the journal; it cannot be undone again.");
        }
    }

    /// Prints any serialisable report as pretty JSON.
    pub fn json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
