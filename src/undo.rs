//! Undo of the most recent sort batch.
//!
//! Undo reads the last session from the journal, moves each file back in
//! reverse order, prunes destination folders left empty, and finally purges
//! the session's records. Undo is one-shot: records are purged even when some
//! files could not be restored, so a session can never be undone twice.
use crate::file_organizer::FileOrganizer;
use crate::journal::{Journal, JournalError, MoveRecord, SessionId};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort an undo. Per-file restoration problems are reported in
/// [`UndoReport`] instead.
#[derive(Debug, Error)]
pub enum UndoError {
    #[error(transparent)]
    Journal(#[from] JournalError),
    /// The caller asked for a session that is not the most recent one.
    #[error("Session {requested} is not the most recent session ({latest}); only the last sort can be undone")]
    NotLatestSession {
        requested: SessionId,
        latest: SessionId,
    },
}

/// Represents the result of undoing one session.
#[derive(Debug, Clone, Serialize)]
pub struct UndoReport {
    /// The session that was undone.
    pub session: SessionId,
    /// Number of files successfully restored.
    pub restored: usize,
    /// Destinations that no longer existed (moved or deleted by the user).
    pub missing: Vec<PathBuf>,
    /// Files that failed to restore, with the reason.
    pub failures: Vec<(PathBuf, String)>,
    /// Journal records purged for the session.
    pub purged_records: usize,
}

impl UndoReport {
    fn new(session: SessionId) -> Self {
        Self {
            session,
            restored: 0,
            missing: Vec::new(),
            failures: Vec::new(),
            purged_records: 0,
        }
    }

    pub fn error_count(&self) -> usize {
        self.failures.len()
    }

    /// Returns true if every record was restored.
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty() && self.missing.is_empty()
    }
}

/// Outcome of an undo request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UndoOutcome {
    /// The journal held nothing to undo.
    NoOp,
    Undone(UndoReport),
}

/// Manages undo operations.
pub struct UndoManager;

impl UndoManager {
    /// Undoes the most recently written session.
    ///
    /// `expected` optionally pins the session the caller believes is the
    /// latest (for instance the id printed after a sort). If it is not the
    /// latest, nothing is touched and [`UndoError::NotLatestSession`] is
    /// returned.
    ///
    /// # Edge Cases Handled
    ///
    /// * **Empty journal**: returns [`UndoOutcome::NoOp`]
    /// * **Destination gone**: counted in `missing`, not attempted
    /// * **Original location occupied**: recorded as a failure, nothing overwritten
    /// * **Permission denied**: recorded as a failure with the error reason
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use filesorter::journal::FileJournal;
    /// use filesorter::undo::{UndoManager, UndoOutcome};
    ///
    /// let mut journal = FileJournal::new("sorting_log.txt", 100);
    /// match UndoManager::undo_last_session(&mut journal, None) {
    ///     Ok(UndoOutcome::Undone(report)) => println!("Restored {} files", report.restored),
    ///     Ok(UndoOutcome::NoOp) => println!("Nothing to undo"),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo_last_session(
        journal: &mut dyn Journal,
        expected: Option<&SessionId>,
    ) -> Result<UndoOutcome, UndoError> {
        let Some(last) = journal.read_last_session()? else {
            tracing::info!("Journal is empty, nothing to undo");
            return Ok(UndoOutcome::NoOp);
        };

        if let Some(requested) = expected
            && requested != &last.session
        {
            return Err(UndoError::NotLatestSession {
                requested: requested.clone(),
                latest: last.session,
            });
        }

        tracing::info!(
            session = %last.session,
            records = last.records.len(),
            "Undoing last session"
        );

        // Undo is LIFO: the last move is reverted first
        let mut report = UndoReport::new(last.session.clone());
        for record in last.records.iter().rev() {
            if fs::symlink_metadata(&record.destination).is_err() {
                tracing::warn!(path = %record.destination.display(), "moved file no longer exists, skipping");
                report.missing.push(record.destination.clone());
                continue;
            }

            match Self::restore_file(record) {
                Ok(()) => {
                    report.restored += 1;
                    if let Some(dir) = record.destination.parent() {
                        Self::remove_if_empty(dir);
                    }
                }
                Err(reason) => {
                    tracing::warn!(path = %record.destination.display(), %reason, "restore failed");
                    report.failures.push((record.destination.clone(), reason));
                }
            }
        }

        report.purged_records = journal.remove_session(&last.session)?;

        tracing::info!(
            session = %report.session,
            restored = report.restored,
            missing = report.missing.len(),
            errors = report.error_count(),
            "Undo finished"
        );
        Ok(UndoOutcome::Undone(report))
    }

    /// Moves one file back to where it came from.
    fn restore_file(record: &MoveRecord) -> Result<(), String> {
        let original_dir = record
            .source
            .parent()
            .ok_or_else(|| format!("no parent directory for {}", record.source.display()))?;

        let restored = FileOrganizer::move_file(&record.destination, original_dir)
            .map_err(|e| e.to_string())?;

        // Same parent and file name, so this only differs if the record was tampered with
        if restored != record.source {
            tracing::warn!(
                expected = %record.source.display(),
                actual = %restored.display(),
                "restored path differs from recorded source"
            );
        }
        Ok(())
    }

    /// Removes `dir` if it is empty. Non-empty or missing directories are fine.
    fn remove_if_empty(dir: &Path) {
        if let Err(e) = fs::remove_dir(dir) {
            tracing::trace!(dir = %dir.display(), error = %e, "destination directory kept");
        } else {
            tracing::debug!(dir = %dir.display(), "removed empty destination directory");
        }
    }
}
