//! Single-file relocation.
//!
//! The mover relocates one file into a destination directory, creating the
//! directory as needed. It never touches the journal; recording a move is
//! the caller's job, and only after the move succeeded.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while relocating a single file.
///
/// These are per-file failures: batch callers count them and move on.
#[derive(Debug, Error)]
pub enum MoveError {
    /// Failed to create the destination directory.
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },
    /// The source file vanished before it could be moved.
    #[error("Source file not found: {}", path.display())]
    SourceMissing { path: PathBuf },
    /// A file with the same name already exists at the destination.
    #[error("Destination already exists: {}", path.display())]
    DestinationExists { path: PathBuf },
    /// The source path has no file name component.
    #[error("Path has no file name: {}", path.display())]
    NoFileName { path: PathBuf },
    /// The rename (or copy fallback) itself failed.
    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

impl MoveError {
    /// Short machine-friendly tag for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DirectoryCreationFailed { .. } => "directory_creation_failed",
            Self::SourceMissing { .. } => "source_missing",
            Self::DestinationExists { .. } => "destination_exists",
            Self::NoFileName { .. } => "no_file_name",
            Self::MoveFailed { .. } => "move_failed",
        }
    }
}

/// Result type for single-file moves.
pub type MoveResult<T> = Result<T, MoveError>;

/// Relocates files into destination directories.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Moves `source` into `destination_dir`, keeping its file name.
    ///
    /// The destination directory (and its parents) is created if missing.
    /// An existing file at the destination is never overwritten; the move
    /// fails with [`MoveError::DestinationExists`] instead. When a plain
    /// rename is impossible because the paths are on different filesystems,
    /// the file is copied and the source removed.
    ///
    /// # Returns
    ///
    /// The full destination path on success.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use filesorter::file_organizer::FileOrganizer;
    /// use std::path::Path;
    ///
    /// match FileOrganizer::move_file(Path::new("/tmp/in/a.jpg"), Path::new("/tmp/out/Images")) {
    ///     Ok(dest) => println!("Moved to {}", dest.display()),
    ///     Err(e) => eprintln!("Move failed: {}", e),
    /// }
    /// ```
    pub fn move_file(source: &Path, destination_dir: &Path) -> MoveResult<PathBuf> {
        let file_name = source.file_name().ok_or_else(|| MoveError::NoFileName {
            path: source.to_path_buf(),
        })?;

        if fs::symlink_metadata(source).is_err() {
            return Err(MoveError::SourceMissing {
                path: source.to_path_buf(),
            });
        }

        fs::create_dir_all(destination_dir).map_err(|e| MoveError::DirectoryCreationFailed {
            path: destination_dir.to_path_buf(),
            source: e,
        })?;

        let destination = destination_dir.join(file_name);
        if fs::symlink_metadata(&destination).is_ok() {
            return Err(MoveError::DestinationExists { path: destination });
        }

        match fs::rename(source, &destination) {
            Ok(()) => Ok(destination),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                tracing::debug!(
                    from = %source.display(),
                    to = %destination.display(),
                    "rename crosses filesystems, copying instead"
                );
                Self::copy_then_remove(source, &destination)?;
                Ok(destination)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound && !source.exists() => {
                Err(MoveError::SourceMissing {
                    path: source.to_path_buf(),
                })
            }
            Err(e) => Err(MoveError::MoveFailed {
                from: source.to_path_buf(),
                to: destination,
                source: e,
            }),
        }
    }

    /// Copy fallback for cross-filesystem moves.
    ///
    /// If the source cannot be removed after copying, the copy is deleted so
    /// the file exists in exactly one place.
    fn copy_then_remove(source: &Path, destination: &Path) -> MoveResult<()> {
        let failed = |e: io::Error| MoveError::MoveFailed {
            from: source.to_path_buf(),
            to: destination.to_path_buf(),
            source: e,
        };

        fs::copy(source, destination).map_err(failed)?;
        if let Err(e) = fs::remove_file(source) {
            let _ = fs::remove_file(destination);
            return Err(failed(e));
        }
        Ok(())
    }
}
