//! filesorter - sort files into category folders by extension
//!
//! This library classifies the files of a folder by extension, moves them
//! into per-category folders (or the user's standard folders), records every
//! move in a session-scoped journal, and can undo the most recent sort.

pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod journal;
pub mod logging;
pub mod output;
pub mod sorter;
pub mod system_folders;
pub mod undo;

pub use config::{CompiledFilters, ConfigError, SorterConfig};
pub use file_category::{Category, CategoryTable, Classifier, EnabledCategories};
pub use file_organizer::{FileOrganizer, MoveError};
pub use journal::{FileJournal, Journal, MemoryJournal, MoveRecord, SessionId};
pub use sorter::{BatchReport, Destination, Selection, SortEngine, SortRequest};
pub use system_folders::SystemFolderMap;
pub use undo::{UndoManager, UndoOutcome, UndoReport};
