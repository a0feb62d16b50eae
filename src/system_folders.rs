//! Category to OS special folder mapping.
//!
//! Used by the "sort to system folders" batch: instead of one destination
//! root, each category is routed to the user's standard folder for it
//! (Images to Pictures and so on). Categories without a standard folder are
//! left where they are.

use directories::UserDirs;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Fixed map from category name to destination folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemFolderMap {
    folders: BTreeMap<String, PathBuf>,
}

impl SystemFolderMap {
    /// Resolves the current user's special folders.
    ///
    /// Folders the platform cannot determine are simply absent from the map.
    pub fn resolve() -> Self {
        let Some(dirs) = UserDirs::new() else {
            tracing::warn!("Could not determine the user's home directory; no system folders available");
            return Self::default();
        };

        let candidates = [
            ("Documents", dirs.document_dir()),
            ("Images", dirs.picture_dir()),
            ("Videos", dirs.video_dir()),
            ("Music", dirs.audio_dir()),
        ];

        let folders = candidates
            .into_iter()
            .filter_map(|(category, dir)| dir.map(|d| (category.to_string(), d.to_path_buf())))
            .collect::<BTreeMap<_, _>>();

        tracing::debug!(?folders, "System folders resolved");
        Self { folders }
    }

    /// Builds a map from explicit `(category, folder)` pairs.
    pub fn from_pairs<I, S, P>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, P)>,
        S: Into<String>,
        P: Into<PathBuf>,
    {
        Self {
            folders: pairs
                .into_iter()
                .map(|(category, folder)| (category.into(), folder.into()))
                .collect(),
        }
    }

    /// Destination folder for `category`, if it has one.
    pub fn folder_for(&self, category: &str) -> Option<&Path> {
        self.folders.get(category).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.folders
            .iter()
            .map(|(category, folder)| (category.as_str(), folder.as_path()))
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pairs_lookup() {
        let map = SystemFolderMap::from_pairs([
            ("Images", "/home/me/Pictures"),
            ("Music", "/home/me/Music"),
        ]);
        assert_eq!(map.folder_for("Images"), Some(Path::new("/home/me/Pictures")));
        assert_eq!(map.folder_for("Archives"), None);
        assert_eq!(map.iter().count(), 2);
    }

    #[test]
    fn test_resolve_only_maps_known_categories() {
        let map = SystemFolderMap::resolve();
        for (category, _) in map.iter() {
            assert!(["Documents", "Images", "Videos", "Music"].contains(&category));
        }
        assert_eq!(map.folder_for("Others"), None);
    }
}
