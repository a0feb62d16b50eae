//! Command-line interface module for filesorter.
//!
//! This module handles all CLI-related functionality including:
//! - Command parsing (`clap` derive)
//! - Wiring configuration, journal and engines together
//! - Dry runs, progress display and result reporting
//! - Undo and history commands

use crate::config::{ConfigError, SorterConfig};
use crate::file_category::{CategoryTable, Classifier, EnabledCategories};
use crate::journal::{FileJournal, Journal, JournalError, SessionId};
use crate::output::OutputFormatter;
use crate::sorter::{
    Destination, ItemOutcome, SortEngine, SortError, SortPlan, SortRequest, Selection,
};
use crate::system_folders::SystemFolderMap;
use crate::undo::{UndoError, UndoManager, UndoOutcome};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Sort files into category folders by extension, with one-step undo.
#[derive(Debug, Parser)]
#[command(name = "filesorter", version, about)]
pub struct Cli {
    /// Configuration file (defaults to .filesorter.toml, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Journal file, overriding the configured location
    #[arg(long, global = true, value_name = "PATH")]
    pub journal: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sort files into category folders under a destination (default: the source folder)
    Sort {
        #[command(flatten)]
        batch: BatchArgs,

        /// Destination root; category folders are created inside it
        #[arg(short, long, value_name = "DIR")]
        dest: Option<PathBuf>,
    },
    /// Sort files into the user's standard folders (Pictures, Documents, Music, Videos)
    SortSystem {
        #[command(flatten)]
        batch: BatchArgs,
    },
    /// Undo the most recent sort
    Undo {
        /// Only undo if this is still the most recent session
        #[arg(long, value_name = "ID")]
        session: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the most recent sort session recorded in the journal
    History,
}

/// Options shared by both sort commands.
#[derive(Debug, Clone, Args)]
pub struct BatchArgs {
    /// Folder whose files are sorted
    pub source: PathBuf,

    /// Only sort these categories (repeatable; default: all)
    #[arg(short, long = "category", value_name = "NAME")]
    pub categories: Vec<String>,

    /// Only sort the first N files (takes precedence over --last)
    #[arg(long, value_name = "N")]
    pub first: Option<usize>,

    /// Only sort the last N files
    #[arg(long, value_name = "N")]
    pub last: Option<usize>,

    /// Show what would be moved without touching anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Errors surfaced to the user by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Error loading configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sort(#[from] SortError),
    #[error(transparent)]
    Undo(#[from] UndoError),
    #[error(transparent)]
    Journal(#[from] JournalError),
    #[error("Could not encode JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything a command needs, built once from configuration.
struct Context {
    table: CategoryTable,
    engine: SortEngine,
    journal: FileJournal,
}

impl Context {
    fn new(cli: &Cli, config: &SorterConfig) -> Result<Self, CliError> {
        let table = config.category_table()?;
        let journal_path = cli.journal.clone().unwrap_or_else(|| config.journal_path());
        tracing::debug!(journal = %journal_path.display(), "Using journal");

        let engine = SortEngine::new(Classifier::new(table.clone()))
            .with_filters(config.compile_filters()?)
            .excluding(&journal_path);

        Ok(Self {
            table,
            engine,
            journal: FileJournal::new(journal_path, config.journal.max_undo_steps),
        })
    }
}

/// Runs the parsed command against the loaded configuration.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use filesorter::cli::{Cli, run};
/// use filesorter::config::SorterConfig;
///
/// let cli = Cli::parse_from(["filesorter", "sort", "/home/me/Downloads", "--dry-run"]);
/// if let Err(e) = run(&cli, SorterConfig::default()) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run(cli: &Cli, config: SorterConfig) -> Result<(), CliError> {
    let mut context = Context::new(cli, &config)?;

    match &cli.command {
        Command::Sort { batch, dest } => {
            let root = dest.clone().unwrap_or_else(|| batch.source.clone());
            sort(&mut context, batch, Destination::Root(root))
        }
        Command::SortSystem { batch } => {
            let folders = SystemFolderMap::resolve();
            if let Some(warning) = missing_folders_warning(&folders, batch.json) {
                OutputFormatter::warning(warning);
            }
            sort(&mut context, batch, Destination::SystemFolders(folders))
        }
        Command::Undo { session, json } => {
            let session = session.as_deref().map(SessionId::from);
            undo(&mut context, session.as_ref(), *json)
        }
        Command::History => history(&context),
    }
}

/// Warning for an empty system folder map. JSON output stays clean.
fn missing_folders_warning(folders: &SystemFolderMap, json: bool) -> Option<&'static str> {
    (folders.is_empty() && !json)
        .then_some("No system folders could be resolved; nothing will move.")
}

fn build_request(
    table: &CategoryTable,
    batch: &BatchArgs,
    destination: Destination,
) -> Result<SortRequest, SortError> {
    let enabled = if batch.categories.is_empty() {
        EnabledCategories::all(table)
    } else {
        EnabledCategories::only(table, &batch.categories)?
    };
    let selection = Selection::from_bounds(batch.first, batch.last)?;

    Ok(SortRequest::new(&batch.source, enabled)
        .with_destination(destination)
        .with_selection(selection))
}

fn sort(context: &mut Context, batch: &BatchArgs, destination: Destination) -> Result<(), CliError> {
    let request = build_request(&context.table, batch, destination)?;
    let plan = context.engine.plan(&request)?;

    if batch.dry_run {
        return print_plan(&request.source_dir, &plan, batch.json);
    }

    if !batch.json {
        OutputFormatter::info(&format!("Sorting contents of: {}", request.source_dir.display()));
    }

    if plan.moves.is_empty() {
        if batch.json {
            OutputFormatter::json(&plan)?;
        } else {
            OutputFormatter::plain("No files to sort.");
        }
        return Ok(());
    }

    let progress = if batch.json {
        indicatif::ProgressBar::hidden()
    } else {
        OutputFormatter::create_progress_bar(plan.moves.len() as u64)
    };

    let report = context
        .engine
        .run_batch_with(&request, &mut context.journal, |outcome| {
            match outcome {
                ItemOutcome::Moved { source, category, .. } => progress.set_message(format!(
                    "{} → {}",
                    file_name(source),
                    category
                )),
                ItemOutcome::Failed(failure) => {
                    progress.println(format!("✗ {}: {}", failure.path.display(), failure.reason))
                }
            }
            progress.inc(1);
        });
    progress.finish_and_clear();
    let report = report?;

    if batch.json {
        OutputFormatter::json(&report)?;
    } else {
        OutputFormatter::batch_summary(&report);
        if report.moved > 0 {
            OutputFormatter::plain("\nUse 'filesorter undo' to revert this sort.");
        }
    }
    Ok(())
}

fn print_plan(source_dir: &Path, plan: &SortPlan, json: bool) -> Result<(), CliError> {
    if json {
        OutputFormatter::json(plan)?;
        return Ok(());
    }

    OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", source_dir.display()));
    if plan.moves.is_empty() {
        OutputFormatter::plain("No files found to sort.");
        return Ok(());
    }

    OutputFormatter::header("Files would be sorted as follows:");
    for planned in &plan.moves {
        OutputFormatter::plain(&format!(
            " - {}\n   → {}",
            file_name(&planned.source),
            planned.destination_dir.display()
        ));
    }
    if !plan.skipped.is_empty() {
        OutputFormatter::plain(&format!("\nLeft in place: {}", plan.skipped.len()));
    }

    OutputFormatter::summary_table(&plan.per_category(), plan.moves.len());
    OutputFormatter::success("Dry run complete. No files were modified.");
    Ok(())
}

fn undo(context: &mut Context, session: Option<&SessionId>, json: bool) -> Result<(), CliError> {
    let outcome = UndoManager::undo_last_session(&mut context.journal, session)?;

    if json {
        OutputFormatter::json(&outcome)?;
        return Ok(());
    }

    match outcome {
        UndoOutcome::NoOp => OutputFormatter::info("No operations to undo!"),
        UndoOutcome::Undone(report) => {
            OutputFormatter::info(&format!("Undid session {}", report.session));
            OutputFormatter::undo_summary(&report);
        }
    }
    Ok(())
}

fn history(context: &Context) -> Result<(), CliError> {
    let Some(last) = context.journal.read_last_session()? else {
        OutputFormatter::info("No sort sessions recorded.");
        return Ok(());
    };

    let started = last
        .started_at()
        .map(|t| t.format(crate::journal::TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default();
    OutputFormatter::header(&format!("Last sort: {} ({})", started, last.session));
    for record in &last.records {
        OutputFormatter::plain(&format!(
            " - {} → {}",
            record.source.display(),
            record.destination.display()
        ));
    }
    OutputFormatter::plain(&format!(
        "\n{} {} can be restored with 'filesorter undo'.",
        last.records.len(),
        if last.records.len() == 1 { "file" } else { "files" }
    ));
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sort_command() {
        let cli = Cli::try_parse_from([
            "filesorter",
            "sort",
            "/tmp/in",
            "--dest",
            "/tmp/out",
            "-c",
            "Images",
            "--category",
            "Others",
            "--first",
            "5",
            "--dry-run",
        ])
        .unwrap();

        match cli.command {
            Command::Sort { batch, dest } => {
                assert_eq!(batch.source, PathBuf::from("/tmp/in"));
                assert_eq!(dest, Some(PathBuf::from("/tmp/out")));
                assert_eq!(batch.categories, vec!["Images", "Others"]);
                assert_eq!(batch.first, Some(5));
                assert!(batch.dry_run);
                assert!(!batch.json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_non_numeric_n() {
        assert!(Cli::try_parse_from(["filesorter", "sort", "/tmp/in", "--last", "abc"]).is_err());
        assert!(Cli::try_parse_from(["filesorter", "sort", "/tmp/in", "--first", "-2"]).is_err());
    }

    #[test]
    fn test_parse_undo_with_global_journal() {
        let cli = Cli::try_parse_from([
            "filesorter",
            "undo",
            "--session",
            "abc",
            "--journal",
            "/tmp/log.txt",
        ])
        .unwrap();
        assert_eq!(cli.journal, Some(PathBuf::from("/tmp/log.txt")));
        assert!(matches!(cli.command, Command::Undo { session: Some(ref s), json: false } if s == "abc"));
    }

    #[test]
    fn test_missing_folders_warning_skipped_for_json() {
        let empty = SystemFolderMap::default();
        assert!(missing_folders_warning(&empty, false).is_some());
        assert!(missing_folders_warning(&empty, true).is_none());

        let mapped = SystemFolderMap::from_pairs([("Images", "/tmp/Pictures")]);
        assert!(missing_folders_warning(&mapped, false).is_none());
    }

    #[test]
    fn test_build_request_validates_input() {
        let table = CategoryTable::default();
        let batch = BatchArgs {
            source: PathBuf::from("/tmp/in"),
            categories: vec!["Nope".to_string()],
            first: None,
            last: None,
            dry_run: false,
            json: false,
        };
        let root = Destination::Root(PathBuf::from("/tmp/in"));

        assert!(matches!(
            build_request(&table, &batch, root.clone()),
            Err(SortError::Categories(_))
        ));

        let batch = BatchArgs {
            categories: vec![],
            last: Some(0),
            ..batch
        };
        assert!(matches!(
            build_request(&table, &batch, root),
            Err(SortError::InvalidSelection(_))
        ));
    }
}
