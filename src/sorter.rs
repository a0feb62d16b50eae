//! Batch sorting.
//!
//! A batch lists the regular files directly inside a source folder, narrows
//! the listing (filters, first/last N), classifies each file and moves it
//! into its category folder. Every successful move is appended to the
//! journal under a session id minted for the batch, in the order the moves
//! happen. A file that fails to move is counted and the batch goes on.

use crate::config::CompiledFilters;
use crate::file_category::{CategoryError, Classifier, EnabledCategories, OTHERS};
use crate::file_organizer::FileOrganizer;
use crate::journal::{Journal, JournalError, MoveRecord, SessionId, is_journalable};
use crate::system_folders::SystemFolderMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors that stop a batch. Per-file move failures are not among them.
#[derive(Debug, Error)]
pub enum SortError {
    #[error("Source folder does not exist or is not a directory: {}", path.display())]
    InvalidSource { path: PathBuf },
    #[error("Destination exists but is not a directory: {}", path.display())]
    InvalidDestination { path: PathBuf },
    #[error("Invalid file selection: {0}")]
    InvalidSelection(String),
    #[error(transparent)]
    Categories(#[from] CategoryError),
    #[error("Error reading directory {}: {source}", path.display())]
    ReadDir { path: PathBuf, source: io::Error },
    #[error("Journal failure, batch aborted: {0}")]
    Journal(#[from] JournalError),
    /// A move could be neither journaled nor reverted.
    #[error(
        "Journal failure, batch aborted: {} was moved to {} but could not be recorded or moved back ({reason}): {journal}",
        original.display(),
        moved_to.display()
    )]
    Unjournaled {
        original: PathBuf,
        moved_to: PathBuf,
        #[source]
        journal: JournalError,
        reason: String,
    },
}

/// Which part of the listing a batch processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    /// The first N files of the listing.
    First(usize),
    /// The last N files of the listing.
    Last(usize),
}

impl Selection {
    /// Builds a selection from optional first-N / last-N caps.
    ///
    /// When both are given, first-N wins. Zero is rejected.
    pub fn from_bounds(first: Option<usize>, last: Option<usize>) -> Result<Self, SortError> {
        if first == Some(0) || last == Some(0) {
            return Err(SortError::InvalidSelection(
                "the number of files must be at least 1".to_string(),
            ));
        }

        Ok(match (first, last) {
            (Some(n), Some(ignored)) => {
                tracing::warn!(first = n, last = ignored, "both first and last given, using first");
                Self::First(n)
            }
            (Some(n), None) => Self::First(n),
            (None, Some(n)) => Self::Last(n),
            (None, None) => Self::All,
        })
    }

    fn apply<T>(self, mut items: Vec<T>) -> Vec<T> {
        match self {
            Self::All => items,
            Self::First(n) => {
                items.truncate(n);
                items
            }
            Self::Last(n) => {
                let skip = items.len().saturating_sub(n);
                items.split_off(skip)
            }
        }
    }
}

/// Where classified files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// `<root>/<category>/` for every category.
    Root(PathBuf),
    /// A fixed folder per category; unmapped categories stay in place.
    SystemFolders(SystemFolderMap),
}

/// Parameters of one batch.
#[derive(Debug, Clone)]
pub struct SortRequest {
    pub source_dir: PathBuf,
    pub destination: Destination,
    pub enabled: EnabledCategories,
    pub selection: Selection,
}

impl SortRequest {
    /// Sorts `source_dir` into category folders inside itself.
    pub fn new(source_dir: impl Into<PathBuf>, enabled: EnabledCategories) -> Self {
        let source_dir = source_dir.into();
        Self {
            destination: Destination::Root(source_dir.clone()),
            source_dir,
            enabled,
            selection: Selection::All,
        }
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }
}

/// A move the batch intends to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub category: String,
    pub destination_dir: PathBuf,
}

/// Result of classifying the listing, before anything is moved.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SortPlan {
    pub moves: Vec<PlannedMove>,
    /// Files left in place (unclassified, unmapped, or already in their folder).
    pub skipped: Vec<PathBuf>,
}

impl SortPlan {
    /// Planned file counts per category.
    pub fn per_category(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for planned in &self.moves {
            *counts.entry(planned.category.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// A file the batch failed to move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedMove {
    pub path: PathBuf,
    pub kind: String,
    pub reason: String,
}

/// What happened to one planned file, reported as the batch runs.
#[derive(Debug, Clone)]
pub enum ItemOutcome {
    Moved {
        source: PathBuf,
        destination: PathBuf,
        category: String,
    },
    Failed(FailedMove),
}

/// Summary of a completed batch.
///
/// The journal remains the authoritative record of what moved where.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub session: SessionId,
    pub moved: usize,
    pub skipped: usize,
    pub failures: Vec<FailedMove>,
    pub per_category: BTreeMap<String, usize>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn error_count(&self) -> usize {
        self.failures.len()
    }
}

/// Runs sort batches.
#[derive(Debug, Clone, Default)]
pub struct SortEngine {
    classifier: Classifier,
    filters: CompiledFilters,
    excluded: Vec<PathBuf>,
}

impl SortEngine {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            classifier,
            filters: CompiledFilters::default(),
            excluded: Vec::new(),
        }
    }

    pub fn with_filters(mut self, filters: CompiledFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Never sorts `path`, e.g. the journal file when it lives in the source folder.
    pub fn excluding(mut self, path: impl Into<PathBuf>) -> Self {
        self.excluded.push(path.into());
        self
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Runs a batch without progress reporting.
    pub fn run_batch(
        &self,
        request: &SortRequest,
        journal: &mut dyn Journal,
    ) -> Result<BatchReport, SortError> {
        self.run_batch_with(request, journal, |_| {})
    }

    /// Runs a batch, calling `on_item` after each attempted move.
    ///
    /// # Errors
    ///
    /// Input errors are returned before anything is touched. A journal
    /// failure aborts the batch after the move that could not be recorded.
    pub fn run_batch_with<F>(
        &self,
        request: &SortRequest,
        journal: &mut dyn Journal,
        mut on_item: F,
    ) -> Result<BatchReport, SortError>
    where
        F: FnMut(&ItemOutcome),
    {
        let started = Instant::now();
        let session = SessionId::mint();
        let plan = self.plan(request)?;

        tracing::info!(
            %session,
            source = %request.source_dir.display(),
            planned = plan.moves.len(),
            skipped = plan.skipped.len(),
            "Starting sort batch"
        );

        let mut moved = 0;
        let mut failures = Vec::new();
        let mut per_category = BTreeMap::new();

        for planned in plan.moves {
            let outcome = match self.execute(&planned, &session, journal)? {
                Ok(destination) => {
                    moved += 1;
                    *per_category.entry(planned.category.clone()).or_insert(0) += 1;
                    ItemOutcome::Moved {
                        source: planned.source,
                        destination,
                        category: planned.category,
                    }
                }
                Err(failure) => {
                    failures.push(failure.clone());
                    ItemOutcome::Failed(failure)
                }
            };
            on_item(&outcome);
        }

        let report = BatchReport {
            session,
            moved,
            skipped: plan.skipped.len(),
            failures,
            per_category,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            session = %report.session,
            moved = report.moved,
            errors = report.error_count(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Sort batch finished"
        );
        Ok(report)
    }

    /// Moves one planned file and journals it.
    ///
    /// The outer `Result` is a fatal journal failure; the inner one is the
    /// per-file outcome.
    fn execute(
        &self,
        planned: &PlannedMove,
        session: &SessionId,
        journal: &mut dyn Journal,
    ) -> Result<Result<PathBuf, FailedMove>, SortError> {
        let target = planned
            .destination_dir
            .join(planned.source.file_name().unwrap_or_default());
        if !is_journalable(&planned.source) || !is_journalable(&target) {
            tracing::warn!(file = %planned.source.display(), "path cannot be journaled, skipping move");
            return Ok(Err(FailedMove {
                path: planned.source.clone(),
                kind: "unrepresentable_path".to_string(),
                reason: "path contains '|', a line break or invalid UTF-8".to_string(),
            }));
        }

        match FileOrganizer::move_file(&planned.source, &planned.destination_dir) {
            Ok(destination) => {
                let record =
                    MoveRecord::new(session.clone(), planned.source.clone(), destination.clone());
                if let Err(e) = journal.append(&record) {
                    tracing::error!(
                        from = %planned.source.display(),
                        to = %destination.display(),
                        error = %e,
                        "move succeeded but could not be journaled"
                    );
                    return Err(Self::roll_back(planned, destination, e));
                }
                tracing::debug!(
                    from = %planned.source.display(),
                    to = %destination.display(),
                    category = %planned.category,
                    "moved"
                );
                Ok(Ok(destination))
            }
            Err(e) => {
                tracing::warn!(file = %planned.source.display(), error = %e, "move failed");
                Ok(Err(FailedMove {
                    path: planned.source.clone(),
                    kind: e.kind().to_string(),
                    reason: e.to_string(),
                }))
            }
        }
    }

    /// Moves an unjournaled file back to where it came from.
    ///
    /// Every file left at its destination must have a journal record, so a
    /// move that could not be recorded is reverted before the batch aborts.
    fn roll_back(planned: &PlannedMove, moved_to: PathBuf, journal: JournalError) -> SortError {
        let restored = match planned.source.parent() {
            Some(original_dir) => FileOrganizer::move_file(&moved_to, original_dir)
                .map(|_| ())
                .map_err(|e| e.to_string()),
            None => Err(format!("no parent directory for {}", planned.source.display())),
        };

        match restored {
            Ok(()) => {
                tracing::info!(file = %planned.source.display(), "unjournaled move reverted");
                if fs::remove_dir(&planned.destination_dir).is_ok() {
                    tracing::debug!(dir = %planned.destination_dir.display(), "removed empty destination directory");
                }
                SortError::Journal(journal)
            }
            Err(reason) => {
                tracing::error!(
                    file = %planned.source.display(),
                    at = %moved_to.display(),
                    %reason,
                    "unjournaled move could not be reverted"
                );
                SortError::Unjournaled {
                    original: planned.source.clone(),
                    moved_to,
                    journal,
                    reason,
                }
            }
        }
    }

    /// Lists, narrows and classifies the source folder without moving anything.
    pub fn plan(&self, request: &SortRequest) -> Result<SortPlan, SortError> {
        if !request.source_dir.is_dir() {
            return Err(SortError::InvalidSource {
                path: request.source_dir.clone(),
            });
        }
        if let Destination::Root(root) = &request.destination
            && root.exists()
            && !root.is_dir()
        {
            return Err(SortError::InvalidDestination { path: root.clone() });
        }

        let files = request.selection.apply(self.list_files(&request.source_dir)?);
        let source_dir = normalize(&request.source_dir);

        let mut plan = SortPlan::default();
        for source in files {
            let file_name = source
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            let category = match self.classifier.classify(&file_name, &request.enabled) {
                Some(category) => category.name.clone(),
                None if request.enabled.others_enabled() => OTHERS.to_string(),
                None => {
                    tracing::debug!(file = %file_name, "unclassified, left in place");
                    plan.skipped.push(source);
                    continue;
                }
            };

            let destination_dir = match &request.destination {
                Destination::Root(root) => root.join(&category),
                Destination::SystemFolders(map) => match map.folder_for(&category) {
                    Some(folder) => folder.to_path_buf(),
                    None => {
                        tracing::debug!(file = %file_name, %category, "no system folder, left in place");
                        plan.skipped.push(source);
                        continue;
                    }
                },
            };

            if normalize(&destination_dir) == source_dir {
                plan.skipped.push(source);
                continue;
            }

            plan.moves.push(PlannedMove {
                source,
                category,
                destination_dir,
            });
        }

        Ok(plan)
    }

    /// Regular files directly inside `dir`, sorted by name.
    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, SortError> {
        let entries = fs::read_dir(dir).map_err(|e| SortError::ReadDir {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let excluded: Vec<PathBuf> = self.excluded.iter().map(|p| normalize(p)).collect();

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            // Follows symlinks, so links to regular files are sorted too
            .filter(|path| path.is_file())
            .filter(|path| self.filters.should_include(path))
            .filter(|path| !excluded.contains(&normalize(path)))
            .collect();

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }
}

/// Best-effort canonical form of a path whose final component may not exist.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => fs::canonicalize(parent)
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_category::CategoryTable;
    use crate::journal::{JournalResult, MemoryJournal};
    use tempfile::TempDir;

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            fs::write(dir.join(name), name.as_bytes()).expect("Failed to write file");
        }
    }

    fn enabled(names: &[&str]) -> EnabledCategories {
        EnabledCategories::only(&CategoryTable::default(), names).unwrap()
    }

    fn all() -> EnabledCategories {
        EnabledCategories::all(&CategoryTable::default())
    }

    #[test]
    fn test_selection_from_bounds() {
        assert_eq!(Selection::from_bounds(None, None).unwrap(), Selection::All);
        assert_eq!(Selection::from_bounds(Some(3), None).unwrap(), Selection::First(3));
        assert_eq!(Selection::from_bounds(None, Some(2)).unwrap(), Selection::Last(2));
        assert_eq!(Selection::from_bounds(Some(3), Some(2)).unwrap(), Selection::First(3));
        assert!(matches!(
            Selection::from_bounds(Some(0), None),
            Err(SortError::InvalidSelection(_))
        ));
        assert!(Selection::from_bounds(None, Some(0)).is_err());
    }

    #[test]
    fn test_selection_apply() {
        let items = vec![1, 2, 3, 4, 5];
        assert_eq!(Selection::All.apply(items.clone()), vec![1, 2, 3, 4, 5]);
        assert_eq!(Selection::First(2).apply(items.clone()), vec![1, 2]);
        assert_eq!(Selection::Last(2).apply(items.clone()), vec![4, 5]);
        assert_eq!(Selection::First(10).apply(items.clone()), items);
        assert_eq!(Selection::Last(10).apply(items.clone()), items);
    }

    #[test]
    fn test_plan_classifies_and_skips() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path();
        touch(src, &["a.jpg", "b.txt", "c.xyz"]);
        fs::create_dir(src.join("folder.jpg")).unwrap();

        let engine = SortEngine::default();
        let plan = engine
            .plan(&SortRequest::new(src, enabled(&["Images", "Documents"])))
            .unwrap();

        let categories: Vec<_> = plan.moves.iter().map(|m| m.category.as_str()).collect();
        assert_eq!(categories, vec!["Images", "Documents"]);
        assert_eq!(plan.moves[1].destination_dir, src.join("Documents"));
        assert_eq!(plan.skipped, vec![src.join("c.xyz")]);
        // Dry planning moves nothing
        assert!(src.join("a.jpg").exists());
    }

    #[test]
    fn test_plan_uses_others_when_enabled() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), &["c.xyz", "Makefile"]);

        let plan = SortEngine::default()
            .plan(&SortRequest::new(temp_dir.path(), all()))
            .unwrap();
        assert_eq!(plan.moves.len(), 2);
        assert!(plan.moves.iter().all(|m| m.category == OTHERS));
    }

    #[test]
    fn test_plan_applies_selection_in_name_order() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), &["d.txt", "a.txt", "c.txt", "b.txt"]);

        let engine = SortEngine::default();
        let first = engine
            .plan(&SortRequest::new(temp_dir.path(), all()).with_selection(Selection::First(2)))
            .unwrap();
        let last = engine
            .plan(&SortRequest::new(temp_dir.path(), all()).with_selection(Selection::Last(1)))
            .unwrap();

        let names = |plan: &SortPlan| -> Vec<String> {
            plan.moves
                .iter()
                .map(|m| m.source.file_name().unwrap().to_string_lossy().to_string())
                .collect()
        };
        assert_eq!(names(&first), vec!["a.txt", "b.txt"]);
        assert_eq!(names(&last), vec!["d.txt"]);
    }

    #[test]
    fn test_plan_rejects_missing_source() {
        let result = SortEngine::default().plan(&SortRequest::new("/non/existent/path", all()));
        assert!(matches!(result, Err(SortError::InvalidSource { .. })));
    }

    #[test]
    fn test_plan_rejects_file_as_destination_root() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), &["a.txt", "dest"]);

        let request = SortRequest::new(temp_dir.path(), all())
            .with_destination(Destination::Root(temp_dir.path().join("dest")));
        assert!(matches!(
            SortEngine::default().plan(&request),
            Err(SortError::InvalidDestination { .. })
        ));
    }

    #[test]
    fn test_plan_excludes_journal_file() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), &["sorting_log.txt", "b.txt"]);

        let engine = SortEngine::default().excluding(temp_dir.path().join("sorting_log.txt"));
        let plan = engine.plan(&SortRequest::new(temp_dir.path(), all())).unwrap();
        assert_eq!(plan.moves.len(), 1);
        assert_eq!(plan.moves[0].source, temp_dir.path().join("b.txt"));
    }

    #[test]
    fn test_system_folders_leave_unmapped_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("downloads");
        let pictures = temp_dir.path().join("Pictures");
        fs::create_dir(&src).unwrap();
        touch(&src, &["a.jpg", "b.zip", "c.xyz"]);

        let request = SortRequest::new(&src, all()).with_destination(Destination::SystemFolders(
            SystemFolderMap::from_pairs([("Images", &pictures)]),
        ));
        let mut journal = MemoryJournal::default();
        let report = SortEngine::default().run_batch(&request, &mut journal).unwrap();

        assert_eq!(report.moved, 1);
        assert_eq!(report.skipped, 2);
        assert!(pictures.join("a.jpg").exists());
        assert!(src.join("b.zip").exists());
        assert!(src.join("c.xyz").exists());
    }

    #[test]
    fn test_run_batch_journals_in_move_order() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path();
        touch(src, &["b.txt", "a.jpg", "c.mp3"]);

        let mut journal = MemoryJournal::default();
        let mut seen = Vec::new();
        let report = SortEngine::default()
            .run_batch_with(&SortRequest::new(src, all()), &mut journal, |outcome| {
                if let ItemOutcome::Moved { category, .. } = outcome {
                    seen.push(category.clone());
                }
            })
            .unwrap();

        assert_eq!(report.moved, 3);
        assert_eq!(report.error_count(), 0);
        assert_eq!(seen, vec!["Images", "Documents", "Music"]);

        let records = journal.records().unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.session == report.session));
        assert_eq!(records[0].source, src.join("a.jpg"));
        assert_eq!(records[0].destination, src.join("Images").join("a.jpg"));
        assert_eq!(records[2].destination, src.join("Music").join("c.mp3"));
        assert_eq!(report.per_category.get("Documents"), Some(&1));
    }

    #[test]
    fn test_run_batch_continues_after_failure() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path();
        touch(src, &["a.txt", "b.txt", "c.txt", "d.txt", "e.txt"]);
        fs::create_dir(src.join("Documents")).unwrap();
        fs::write(src.join("Documents").join("c.txt"), "already here").unwrap();

        let mut journal = MemoryJournal::default();
        let report = SortEngine::default()
            .run_batch(&SortRequest::new(src, all()), &mut journal)
            .unwrap();

        assert_eq!(report.moved, 4);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.failures[0].path, src.join("c.txt"));
        assert_eq!(report.failures[0].kind, "destination_exists");
        assert_eq!(journal.len(), 4);
        assert!(src.join("c.txt").exists());
    }

    #[test]
    fn test_run_batch_rejects_unjournalable_paths_before_moving() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), &["a|b.txt", "ok.txt"]);

        let mut journal = MemoryJournal::default();
        let report = SortEngine::default()
            .run_batch(&SortRequest::new(temp_dir.path(), all()), &mut journal)
            .unwrap();

        assert_eq!(report.moved, 1);
        assert_eq!(report.failures[0].kind, "unrepresentable_path");
        assert!(temp_dir.path().join("a|b.txt").exists());
    }

    #[test]
    fn test_each_batch_gets_a_new_session() {
        let temp_dir = TempDir::new().unwrap();
        let mut journal = MemoryJournal::default();
        let engine = SortEngine::default();

        touch(temp_dir.path(), &["a.txt"]);
        let first = engine
            .run_batch(&SortRequest::new(temp_dir.path(), all()), &mut journal)
            .unwrap();
        touch(temp_dir.path(), &["b.txt"]);
        let second = engine
            .run_batch(&SortRequest::new(temp_dir.path(), all()), &mut journal)
            .unwrap();

        assert_ne!(first.session, second.session);
    }

    /// Journal whose appends always fail. With `occupy_source` set it also
    /// drops a new file at the original location, so the revert fails too.
    struct BrokenJournal {
        occupy_source: bool,
    }

    impl Journal for BrokenJournal {
        fn append(&mut self, record: &MoveRecord) -> JournalResult<()> {
            if self.occupy_source {
                fs::write(&record.source, "newcomer").unwrap();
            }
            Err(JournalError::Write {
                path: PathBuf::from("sorting_log.txt"),
                source: io::Error::other("disk full"),
            })
        }

        fn trim(&mut self, _max_records: usize) -> JournalResult<usize> {
            Ok(0)
        }

        fn records(&self) -> JournalResult<Vec<MoveRecord>> {
            Ok(Vec::new())
        }

        fn remove_session(&mut self, _session: &SessionId) -> JournalResult<usize> {
            Ok(0)
        }
    }

    #[test]
    fn test_journal_failure_aborts_and_reverts_move() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path();
        touch(src, &["a.txt", "b.txt"]);

        let mut journal = BrokenJournal {
            occupy_source: false,
        };
        let result = SortEngine::default().run_batch(&SortRequest::new(src, all()), &mut journal);

        assert!(matches!(result, Err(SortError::Journal(JournalError::Write { .. }))));
        // The unrecorded move was undone and the batch stopped before b.txt
        assert!(src.join("a.txt").exists());
        assert!(src.join("b.txt").exists());
        assert!(!src.join("Documents").exists());
    }

    #[test]
    fn test_journal_failure_names_file_that_could_not_be_reverted() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path();
        touch(src, &["a.txt", "b.txt"]);

        let mut journal = BrokenJournal {
            occupy_source: true,
        };
        let result = SortEngine::default().run_batch(&SortRequest::new(src, all()), &mut journal);

        match result {
            Err(SortError::Unjournaled {
                original, moved_to, ..
            }) => {
                assert_eq!(original, src.join("a.txt"));
                assert_eq!(moved_to, src.join("Documents").join("a.txt"));
            }
            other => panic!("expected Unjournaled, got {:?}", other),
        }
        assert!(src.join("Documents").join("a.txt").exists());
        assert_eq!(fs::read_to_string(src.join("a.txt")).unwrap(), "newcomer");
        assert!(src.join("b.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_plan_follows_symlinks_to_files() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("in");
        fs::create_dir(&src).unwrap();
        let target = temp_dir.path().join("real.jpg");
        fs::write(&target, "jpg").unwrap();
        std::os::unix::fs::symlink(&target, src.join("link.jpg")).unwrap();
        std::os::unix::fs::symlink(temp_dir.path().join("gone.jpg"), src.join("dangling.jpg"))
            .unwrap();

        let plan = SortEngine::default().plan(&SortRequest::new(&src, all())).unwrap();
        assert_eq!(plan.moves.len(), 1);
        assert_eq!(plan.moves[0].source, src.join("link.jpg"));
    }
}
