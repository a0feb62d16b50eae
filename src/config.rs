//! Configuration loading.
//!
//! Configuration is read once at start-up from a TOML file and covers the
//! journal location and bound, the log level, the category table and the
//! file filtering rules applied to a batch listing.
//!
//! # Configuration File Format
//!
//! ```toml
//! [journal]
//! path = "/home/me/.local/share/filesorter/sorting_log.txt"
//! max_undo_steps = 100
//!
//! [logging]
//! level = "info"
//!
//! # Optional: replaces the built-in table. "Others" is appended if missing.
//! [[categories]]
//! name = "Images"
//! extensions = [".jpg", ".png"]
//!
//! [filters]
//! include_hidden_files = true
//!
//! [filters.exclude]
//! filenames = ["desktop.ini", "Thumbs.db"]
//! patterns = ["*.part"]
//! extensions = ["crdownload"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//! ```

use crate::file_category::{Category, CategoryError, CategoryTable};
use crate::journal::DEFAULT_MAX_UNDO_STEPS;
use directories::ProjectDirs;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Application name used for platform directories.
pub const APP_NAME: &str = "filesorter";

/// Per-directory configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = ".filesorter.toml";

/// File name of the journal inside the platform data directory.
pub const JOURNAL_FILE_NAME: &str = "sorting_log.txt";

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax, structure or values.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    /// Invalid glob pattern provided.
    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided with the actual error reason.
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },
    /// The configured category table is unusable.
    #[error("Invalid category table: {0}")]
    Categories(#[from] CategoryError),
    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    IoError(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SorterConfig {
    #[serde(default)]
    pub journal: JournalConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Replacement category table. Empty means the built-in table.
    #[serde(default)]
    pub categories: Vec<Category>,

    #[serde(default)]
    pub filters: FilterRules,
}

/// Journal location and size bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Journal file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Number of records kept for undo.
    #[serde(default = "default_max_undo_steps")]
    pub max_undo_steps: usize,
}

fn default_max_undo_steps() -> usize {
    DEFAULT_MAX_UNDO_STEPS
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_undo_steps: DEFAULT_MAX_UNDO_STEPS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. "info" or "filesorter=debug".
    #[serde(default)]
    pub level: Option<String>,
}

/// Rules deciding which files of a listing take part in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether files starting with "." are sorted. Defaults to true.
    #[serde(default = "default_include_hidden_files")]
    pub include_hidden_files: bool,

    /// Rules for excluding files.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Rules for including files (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

fn default_include_hidden_files() -> bool {
    true
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            include_hidden_files: default_include_hidden_files(),
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

/// Rules for excluding files from a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., "desktop.ini", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the file name (e.g., "*.part").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude, with or without the dot.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Rules for including files, overriding exclude rules (whitelist).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    /// Glob patterns that override exclude rules.
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl SorterConfig {
    /// Load configuration, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.filesorter.toml` in the current directory
    /// 3. Look for `config.toml` in the platform config directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but
    /// cannot be read, or if any discovered file is invalid.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(dirs) = ProjectDirs::from("", "", APP_NAME) {
            let user_config = dirs.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::load_from_file(&user_config);
            }
        }

        tracing::debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.journal.max_undo_steps == 0 {
            return Err(ConfigError::ConfigInvalid(
                "journal.max_undo_steps must be at least 1".to_string(),
            ));
        }
        self.category_table()?;
        Ok(())
    }

    /// The category table: configured categories, or the built-in table.
    pub fn category_table(&self) -> Result<CategoryTable, ConfigError> {
        if self.categories.is_empty() {
            Ok(CategoryTable::default())
        } else {
            Ok(CategoryTable::from_categories(self.categories.clone())?)
        }
    }

    /// Journal location: configured path or `<data dir>/sorting_log.txt`.
    pub fn journal_path(&self) -> PathBuf {
        self.journal.path.clone().unwrap_or_else(default_journal_path)
    }

    /// Compile filter rules into matchers.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters)
    }
}

/// Default journal location inside the platform data directory.
///
/// Falls back to the working directory when no data directory can be
/// determined.
pub fn default_journal_path() -> PathBuf {
    match ProjectDirs::from("", "", APP_NAME) {
        Some(dirs) => dirs.data_dir().join(JOURNAL_FILE_NAME),
        None => {
            tracing::warn!("Could not determine platform data directory, using current directory");
            PathBuf::from(JOURNAL_FILE_NAME)
        }
    }
}

/// Compiled filter rules for efficient file matching.
#[derive(Debug, Clone)]
pub struct CompiledFilters {
    include_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl Default for CompiledFilters {
    /// Accepts every file.
    fn default() -> Self {
        Self {
            include_hidden_files: true,
            exclude_filenames: HashSet::new(),
            exclude_extensions: HashSet::new(),
            exclude_patterns: Vec::new(),
            exclude_regexes: Vec::new(),
            include_patterns: Vec::new(),
        }
    }
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let compile_globs = |patterns: &[String]| {
            patterns
                .iter()
                .map(|p| Pattern::new(p).map_err(|_| ConfigError::InvalidGlobPattern(p.clone())))
                .collect::<Result<Vec<_>, _>>()
        };

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            include_hidden_files: rules.include_hidden_files,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns: compile_globs(&rules.exclude.patterns)?,
            exclude_regexes,
            include_patterns: compile_globs(&rules.include.patterns)?,
        })
    }

    /// Check whether a file takes part in the batch.
    ///
    /// Checks are performed in this order, with early termination:
    /// 1. Include patterns (whitelist) - if matched, always include
    /// 2. Hidden file filter - if hidden and disabled, exclude
    /// 3. Exact filename match - if matched, exclude
    /// 4. File extension match - if matched, exclude
    /// 5. Glob pattern match - if matched, exclude
    /// 6. Regex pattern match - if matched, exclude
    /// 7. Default: include
    pub fn should_include(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.include_patterns.iter().any(|p| p.matches(&file_name)) {
            return true;
        }

        if !self.include_hidden_files && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = file_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if self.exclude_patterns.iter().any(|p| p.matches(&file_name)) {
            return false;
        }

        !self.exclude_regexes.iter().any(|r| r.is_match(&file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(rules: FilterRules) -> CompiledFilters {
        CompiledFilters::new(&rules).expect("filters should compile")
    }

    #[test]
    fn test_defaults() {
        let config = SorterConfig::default();
        assert_eq!(config.journal.max_undo_steps, 100);
        assert!(config.journal.path.is_none());
        assert!(config.filters.include_hidden_files);
        assert_eq!(config.category_table().unwrap(), CategoryTable::default());
        assert!(config.journal_path().ends_with(JOURNAL_FILE_NAME));
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = SorterConfig::from_toml("").unwrap();
        assert_eq!(config.journal.max_undo_steps, DEFAULT_MAX_UNDO_STEPS);
        assert!(config.categories.is_empty());
    }

    #[test]
    fn test_full_toml() {
        let config = SorterConfig::from_toml(
            r#"
            [journal]
            path = "/var/tmp/sorter.log"
            max_undo_steps = 25

            [logging]
            level = "debug"

            [[categories]]
            name = "Photos"
            extensions = ["JPG", ".png"]

            [filters]
            include_hidden_files = false

            [filters.exclude]
            extensions = [".part"]
            "#,
        )
        .unwrap();

        assert_eq!(config.journal_path(), PathBuf::from("/var/tmp/sorter.log"));
        assert_eq!(config.journal.max_undo_steps, 25);
        assert_eq!(config.logging.level.as_deref(), Some("debug"));

        let table = config.category_table().unwrap();
        assert_eq!(table.get("Photos").unwrap().extensions, vec![".jpg", ".png"]);
        assert!(table.get("Others").is_some());
        assert!(table.get("Images").is_none());

        let compiled = config.compile_filters().unwrap();
        assert!(!compiled.should_include(Path::new(".hidden.jpg")));
        assert!(!compiled.should_include(Path::new("movie.PART")));
        assert!(compiled.should_include(Path::new("movie.mkv")));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            SorterConfig::from_toml("[journal]\nmax_undo_steps = 0"),
            Err(ConfigError::ConfigInvalid(_))
        ));
        assert!(matches!(
            SorterConfig::from_toml("[[categories]]\nname = \"a/b\""),
            Err(ConfigError::Categories(CategoryError::InvalidName(_)))
        ));
        assert!(matches!(
            SorterConfig::from_toml("this is not toml"),
            Err(ConfigError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = SorterConfig::load(Some(Path::new("/non/existent/filesorter.toml")));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[journal]\nmax_undo_steps = 7\n").unwrap();

        let config = SorterConfig::load(Some(&path)).unwrap();
        assert_eq!(config.journal.max_undo_steps, 7);
    }

    #[test]
    fn test_default_filters_accept_everything() {
        let compiled = CompiledFilters::default();
        assert!(compiled.should_include(Path::new(".DS_Store")));
        assert!(compiled.should_include(Path::new("a.jpg")));
    }

    #[test]
    fn test_hidden_files_excluded_when_disabled() {
        let compiled = filters(FilterRules {
            include_hidden_files: false,
            ..Default::default()
        });
        assert!(!compiled.should_include(Path::new(".DS_Store")));
        assert!(compiled.should_include(Path::new("photo.jpg")));
    }

    #[test]
    fn test_exclude_filenames_extensions_globs_and_regex() {
        let compiled = filters(FilterRules {
            exclude: ExcludeRules {
                filenames: vec!["Thumbs.db".to_string()],
                patterns: vec!["*.part".to_string(), "[0-9]*.tmp".to_string()],
                extensions: vec!["bak".to_string(), ".crdownload".to_string()],
                regex: vec![r"^~\$".to_string()],
            },
            ..Default::default()
        });

        assert!(!compiled.should_include(Path::new("/dl/Thumbs.db")));
        assert!(!compiled.should_include(Path::new("/dl/movie.part")));
        assert!(!compiled.should_include(Path::new("/dl/1cache.tmp")));
        assert!(compiled.should_include(Path::new("/dl/cache.tmp")));
        assert!(!compiled.should_include(Path::new("/dl/notes.BAK")));
        assert!(!compiled.should_include(Path::new("/dl/setup.crdownload")));
        assert!(!compiled.should_include(Path::new("/dl/~$report.docx")));
        assert!(compiled.should_include(Path::new("/dl/report.docx")));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let compiled = filters(FilterRules {
            include_hidden_files: false,
            exclude: ExcludeRules {
                extensions: vec!["env".to_string()],
                ..Default::default()
            },
            include: IncludeRules {
                patterns: vec![".important*".to_string(), "prod.env".to_string()],
            },
        });

        assert!(compiled.should_include(Path::new(".important")));
        assert!(!compiled.should_include(Path::new(".other")));
        assert!(compiled.should_include(Path::new("prod.env")));
        assert!(!compiled.should_include(Path::new("dev.env")));
    }

    #[test]
    fn test_invalid_patterns_return_errors() {
        let bad_regex = FilterRules {
            exclude: ExcludeRules {
                regex: vec!["[invalid(".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            CompiledFilters::new(&bad_regex),
            Err(ConfigError::InvalidRegexPattern { .. })
        ));

        let bad_glob = FilterRules {
            exclude: ExcludeRules {
                patterns: vec!["[invalid".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            CompiledFilters::new(&bad_glob),
            Err(ConfigError::InvalidGlobPattern(_))
        ));
    }
}
