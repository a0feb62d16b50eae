//! Session-scoped move journal.
//!
//! Every successful move is recorded as a [`MoveRecord`] tagged with the
//! [`SessionId`] of the batch that produced it. The journal is append-only
//! apart from two maintenance operations: trimming to the most recent
//! records once the bound is exceeded, and removing one session's records
//! after that session has been undone.
//!
//! # File format
//!
//! [`FileJournal`] stores one record per line:
//!
//! ```text
//! 2024-05-01 14:03:22|5b0c7c1e-8f0e-4d53-9a43-6f1f0f0b2a11|/home/me/Downloads/a.jpg|/home/me/Downloads/Images/a.jpg
//! ```
//!
//! Fields are separated by `|` with no escaping, so paths containing `|` or a
//! line break cannot be recorded and are rejected up front.

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Timestamp layout used in the journal file. Sorts lexicographically.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default number of records kept in the journal.
pub const DEFAULT_MAX_UNDO_STEPS: usize = 100;

const FIELD_SEPARATOR: char = '|';

/// Opaque identifier grouping the records of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Mints a fresh random (UUID v4) session id.
    pub fn mint() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A journaled fact: `source` was moved to `destination` during `session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub timestamp: NaiveDateTime,
    pub session: SessionId,
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl MoveRecord {
    /// Creates a record stamped with the current local time (whole seconds).
    pub fn new(session: SessionId, source: PathBuf, destination: PathBuf) -> Self {
        let now = Local::now().naive_local();
        Self {
            timestamp: now.with_nanosecond(0).unwrap_or(now),
            session,
            source,
            destination,
        }
    }

    /// Formats the record as a journal line (without the trailing newline).
    pub fn to_line(&self) -> JournalResult<String> {
        let source = journal_str(&self.source)?;
        let destination = journal_str(&self.destination)?;
        Ok(format!(
            "{}{sep}{}{sep}{}{sep}{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.session,
            source,
            destination,
            sep = FIELD_SEPARATOR
        ))
    }

    /// Parses a journal line, returning a reason when it is malformed.
    pub fn parse_line(line: &str) -> Result<Self, String> {
        let mut fields = line.trim_end_matches(['\r', '\n']).splitn(4, FIELD_SEPARATOR);
        let (Some(timestamp), Some(session), Some(source), Some(destination)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err("expected 4 '|'-separated fields".to_string());
        };

        let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .map_err(|e| format!("invalid timestamp '{}': {}", timestamp, e))?;
        if session.trim().is_empty() {
            return Err("empty session id".to_string());
        }

        Ok(Self {
            timestamp,
            session: SessionId::from(session),
            source: PathBuf::from(source),
            destination: PathBuf::from(destination),
        })
    }
}

/// Returns true if `path` can be written to the journal without corrupting it.
pub fn is_journalable(path: &Path) -> bool {
    path.to_str()
        .is_some_and(|s| !s.contains([FIELD_SEPARATOR, '\n', '\r']))
}

fn journal_str(path: &Path) -> JournalResult<&str> {
    match path.to_str() {
        Some(s) if is_journalable(path) => Ok(s),
        _ => Err(JournalError::UnrepresentablePath {
            path: path.to_path_buf(),
        }),
    }
}

/// All records of one session, in the order the moves were performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecords {
    pub session: SessionId,
    pub records: Vec<MoveRecord>,
}

impl SessionRecords {
    /// Timestamp of the session's first recorded move.
    pub fn started_at(&self) -> Option<NaiveDateTime> {
        self.records.first().map(|r| r.timestamp)
    }

    /// Groups the records of the most recently written session.
    ///
    /// The session is identified by the last record; every record bearing
    /// its id is collected, wherever it sits in the sequence.
    pub fn latest(records: Vec<MoveRecord>) -> Option<Self> {
        let session = records.last()?.session.clone();
        let records = records
            .into_iter()
            .filter(|r| r.session == session)
            .collect();
        Some(Self { session, records })
    }
}

/// Journal failures. These are fatal for the operation that hit them.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("Failed to read journal {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to write journal {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("Path cannot be recorded in the journal (contains '|', a line break or invalid UTF-8): {}", path.display())]
    UnrepresentablePath { path: PathBuf },
}

pub type JournalResult<T> = Result<T, JournalError>;

/// Storage for move records.
///
/// Implementations must keep records in append order and keep at most
/// their configured bound after every append.
pub trait Journal {
    /// Appends a record, then trims to the journal's bound.
    fn append(&mut self, record: &MoveRecord) -> JournalResult<()>;

    /// Keeps only the most recent `max_records` entries. Returns how many were dropped.
    fn trim(&mut self, max_records: usize) -> JournalResult<usize>;

    /// All readable records, oldest first.
    fn records(&self) -> JournalResult<Vec<MoveRecord>>;

    /// Removes every record of `session`. Returns how many were removed.
    fn remove_session(&mut self, session: &SessionId) -> JournalResult<usize>;

    /// Records of the most recently written session, or `None` when empty.
    fn read_last_session(&self) -> JournalResult<Option<SessionRecords>> {
        Ok(SessionRecords::latest(self.records()?))
    }
}

/// Text-file journal, one record per line.
#[derive(Debug, Clone)]
pub struct FileJournal {
    path: PathBuf,
    max_records: usize,
}

impl FileJournal {
    /// Opens (lazily) the journal at `path`. Nothing is created until the first append.
    pub fn new(path: impl Into<PathBuf>, max_records: usize) -> Self {
        Self {
            path: path.into(),
            max_records,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    fn read_lines(&self) -> JournalResult<Vec<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(String::from)
                .collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(JournalError::Read {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    /// Rewrites the whole file through a sibling temp file and a rename.
    fn write_lines(&self, lines: &[String]) -> JournalResult<()> {
        self.ensure_parent()?;

        let mut tmp_name = self.path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        let mut content = lines.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }

        fs::write(&tmp_path, content).map_err(|e| self.write_error(e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| self.write_error(e))
    }

    fn ensure_parent(&self) -> JournalResult<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|e| self.write_error(e))
            }
            _ => Ok(()),
        }
    }

    fn write_error(&self, source: io::Error) -> JournalError {
        JournalError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl Journal for FileJournal {
    fn append(&mut self, record: &MoveRecord) -> JournalResult<()> {
        let line = record.to_line()?;
        self.ensure_parent()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_error(e))?;
        writeln!(file, "{}", line).map_err(|e| self.write_error(e))?;
        drop(file);

        self.trim(self.max_records)?;
        Ok(())
    }

    fn trim(&mut self, max_records: usize) -> JournalResult<usize> {
        let lines = self.read_lines()?;
        if lines.len() <= max_records {
            return Ok(0);
        }

        let dropped = lines.len() - max_records;
        self.write_lines(&lines[dropped..])?;
        tracing::debug!(dropped, kept = max_records, "journal trimmed");
        Ok(dropped)
    }

    fn records(&self) -> JournalResult<Vec<MoveRecord>> {
        let records = self
            .read_lines()?
            .iter()
            .enumerate()
            .filter_map(|(index, line)| match MoveRecord::parse_line(line) {
                Ok(record) => Some(record),
                Err(reason) => {
                    tracing::warn!(
                        journal = %self.path.display(),
                        line = index + 1,
                        %reason,
                        "skipping malformed journal line"
                    );
                    None
                }
            })
            .collect();
        Ok(records)
    }

    fn remove_session(&mut self, session: &SessionId) -> JournalResult<usize> {
        let lines = self.read_lines()?;
        let before = lines.len();

        // Lines that fail to parse are kept; only the session field is compared.
        let kept: Vec<String> = lines
            .into_iter()
            .filter(|line| {
                line.split(FIELD_SEPARATOR)
                    .nth(1)
                    .is_none_or(|s| s.trim() != session.as_str())
            })
            .collect();

        let removed = before - kept.len();
        if removed > 0 {
            self.write_lines(&kept)?;
        }
        Ok(removed)
    }
}

/// In-memory journal with the same ordering and bound semantics as [`FileJournal`].
#[derive(Debug, Clone)]
pub struct MemoryJournal {
    records: Vec<MoveRecord>,
    max_records: usize,
}

impl MemoryJournal {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: Vec::new(),
            max_records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MemoryJournal {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNDO_STEPS)
    }
}

impl Journal for MemoryJournal {
    fn append(&mut self, record: &MoveRecord) -> JournalResult<()> {
        // Same representability rule as the file journal
        record.to_line()?;
        self.records.push(record.clone());
        self.trim(self.max_records)?;
        Ok(())
    }

    fn trim(&mut self, max_records: usize) -> JournalResult<usize> {
        let dropped = self.records.len().saturating_sub(max_records);
        self.records.drain(..dropped);
        Ok(dropped)
    }

    fn records(&self) -> JournalResult<Vec<MoveRecord>> {
        Ok(self.records.clone())
    }

    fn remove_session(&mut self, session: &SessionId) -> JournalResult<usize> {
        let before = self.records.len();
        self.records.retain(|r| &r.session != session);
        Ok(before - self.records.len())
    }
}
