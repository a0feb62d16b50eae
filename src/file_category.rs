//! File categorization by extension.
//!
//! This module holds the static category table (category name to a list of
//! lower-cased extensions) and the classifier that maps a file name onto it.
//! The table is ordered: when an extension is listed under more than one
//! category, the first one in the table wins.
//!
//! # Examples
//!
//! ```
//! use filesorter::file_category::{Classifier, EnabledCategories};
//!
//! let classifier = Classifier::default();
//! let enabled = EnabledCategories::all(classifier.table());
//! assert_eq!(classifier.classify("holiday.JPG", &enabled).map(|c| c.name.as_str()), Some("Images"));
//! assert_eq!(classifier.classify("notes.txt", &enabled).map(|c| c.name.as_str()), Some("Documents"));
//! assert!(classifier.classify("README", &enabled).is_none());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

/// Name of the catch-all category for files no other category claims.
pub const OTHERS: &str = "Others";

/// A named group of extensions routed to the same destination folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Folder name files of this category are moved into.
    pub name: String,
    /// Lower-cased extensions including the leading dot (e.g. `.jpg`).
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl Category {
    /// Creates a category from a name and a list of extensions.
    ///
    /// Extensions are normalised to lower case with a leading dot.
    pub fn new(name: &str, extensions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            extensions: extensions.iter().map(|e| normalize_extension(e)).collect(),
        }
    }

    /// Returns true if `ext` (lower-cased, with leading dot) belongs to this category.
    pub fn matches_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e == ext)
    }

    /// Returns true for the catch-all `Others` category.
    pub fn is_fallback(&self) -> bool {
        self.name == OTHERS
    }
}

/// Errors raised while building a category table or an enabled subset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    #[error("category name must not be empty")]
    EmptyName,
    #[error("category name '{0}' must not contain path separators")]
    InvalidName(String),
    #[error("category '{0}' is defined more than once")]
    Duplicate(String),
    #[error("unknown category '{0}'")]
    Unknown(String),
    #[error("at least one category must be enabled")]
    NoneEnabled,
}

/// The ordered category table.
///
/// Built once at start-up (defaults or configuration) and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    categories: Vec<Category>,
}

impl CategoryTable {
    /// Builds a table from configured categories.
    ///
    /// Extensions are normalised, and an empty `Others` category is appended
    /// when the list does not define one. Any extensions configured for
    /// `Others` are dropped since it only ever acts as the fallback.
    pub fn from_categories(categories: Vec<Category>) -> Result<Self, CategoryError> {
        let mut seen = BTreeSet::new();
        let mut normalized = Vec::with_capacity(categories.len() + 1);

        for category in categories {
            let mut name = category.name.trim().to_string();
            if name.eq_ignore_ascii_case(OTHERS) {
                name = OTHERS.to_string();
            }
            if name.is_empty() {
                return Err(CategoryError::EmptyName);
            }
            if name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(CategoryError::InvalidName(name));
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(CategoryError::Duplicate(name));
            }

            let extensions = if name == OTHERS {
                Vec::new()
            } else {
                category
                    .extensions
                    .iter()
                    .map(|e| normalize_extension(e))
                    .filter(|e| e.len() > 1)
                    .collect()
            };
            normalized.push(Category { name, extensions });
        }

        if !normalized.iter().any(Category::is_fallback) {
            normalized.push(Category::new(OTHERS, &[]));
        }

        Ok(Self {
            categories: normalized,
        })
    }

    /// Iterates over the categories in table order.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    /// Looks up a category by its exact name.
    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Resolves a user-supplied name to the canonical category name, ignoring case.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
            .map(|c| c.name.as_str())
    }

    /// Number of categories in the table, including `Others`.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self {
            categories: vec![
                Category::new(
                    "Documents",
                    &[
                        ".pdf", ".docx", ".txt", ".xlsx", ".pptx", ".doc", ".rtf", ".csv", ".odt",
                    ],
                ),
                Category::new(
                    "Images",
                    &[
                        ".jpg", ".png", ".jpeg", ".gif", ".bmp", ".tiff", ".svg", ".webp", ".heic",
                    ],
                ),
                Category::new(
                    "Videos",
                    &[
                        ".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv", ".webm", ".m4v", ".mpg",
                    ],
                ),
                Category::new(
                    "Music",
                    &[".mp3", ".wav", ".aac", ".flac", ".ogg", ".wma", ".m4a", ".opus"],
                ),
                Category::new(
                    "Archives",
                    &[".zip", ".rar", ".tar", ".7z", ".gz", ".bz2", ".xz", ".iso"],
                ),
                Category::new(
                    "Executables",
                    &[".exe", ".msi", ".bat", ".sh", ".app", ".dmg", ".pkg"],
                ),
                Category::new(
                    "Code",
                    &[
                        // Source code
                        ".py", ".java", ".c", ".cpp", ".h", ".hpp", ".cs", ".js", ".ts", ".php",
                        ".rb", ".go", ".swift", ".kt", ".scala", ".m", ".pl",
                        // Web
                        ".html", ".htm", ".css", ".scss", ".sass", ".less", ".jsx", ".tsx",
                        // Configuration
                        ".json", ".yml", ".yaml", ".xml", ".toml", ".ini", ".cfg", ".conf",
                        // Scripts
                        ".sh", ".bash", ".zsh", ".ps1", ".bat", ".cmd",
                        // Docs and repository metadata
                        ".md", ".markdown", ".rst", ".dockerfile", ".gitignore",
                        ".gitattributes",
                        // Data
                        ".sql", ".db", ".sqlite", ".dump",
                        // Misc development files
                        ".ipynb", ".env", ".lock",
                    ],
                ),
                Category::new(OTHERS, &[]),
            ],
        }
    }
}

/// The subset of category names enabled for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnabledCategories {
    names: BTreeSet<String>,
}

impl EnabledCategories {
    /// Enables every category in the table, `Others` included.
    pub fn all(table: &CategoryTable) -> Self {
        Self {
            names: table.iter().map(|c| c.name.clone()).collect(),
        }
    }

    /// Enables only the named categories.
    ///
    /// Names are matched case-insensitively against the table. Unknown names
    /// and an empty list are rejected.
    pub fn only<I, S>(table: &CategoryTable, names: I) -> Result<Self, CategoryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut enabled = BTreeSet::new();
        for name in names {
            let name = name.as_ref();
            let canonical = table
                .canonical_name(name)
                .ok_or_else(|| CategoryError::Unknown(name.to_string()))?;
            enabled.insert(canonical.to_string());
        }

        if enabled.is_empty() {
            return Err(CategoryError::NoneEnabled);
        }

        Ok(Self { names: enabled })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Returns true if unmatched files should fall through to `Others`.
    pub fn others_enabled(&self) -> bool {
        self.contains(OTHERS)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Maps file names to categories using a [`CategoryTable`].
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    table: CategoryTable,
}

impl Classifier {
    pub fn new(table: CategoryTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    /// Returns the first enabled category (in table order) claiming the
    /// file's extension, or `None` when the file is unclassified.
    ///
    /// `Others` never matches here; callers decide whether an unclassified
    /// file falls back to it.
    ///
    /// # Examples
    ///
    /// ```
    /// use filesorter::file_category::{Classifier, EnabledCategories};
    ///
    /// let classifier = Classifier::default();
    /// let enabled = EnabledCategories::only(classifier.table(), ["Code"]).unwrap();
    ///
    /// // `.sh` is listed under Executables first, but Executables is disabled here.
    /// assert_eq!(classifier.classify("deploy.sh", &enabled).map(|c| c.name.as_str()), Some("Code"));
    /// assert!(classifier.classify("photo.png", &enabled).is_none());
    /// ```
    pub fn classify(&self, file_name: &str, enabled: &EnabledCategories) -> Option<&Category> {
        let ext = extension_of(file_name)?;
        self.table
            .iter()
            .filter(|c| enabled.contains(&c.name))
            .find(|c| c.matches_extension(&ext))
    }
}

/// Extracts the lower-cased extension of a file name, with its leading dot.
///
/// Dot-files such as `.gitignore` have no extension, matching how
/// [`Path::extension`] treats them.
pub fn extension_of(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_string_lossy();
    if ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_lowercase()))
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}
