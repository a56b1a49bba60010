use crate::photocull_core::asset::{PhotoAsset, Tag};
use crate::photocull_core::error::{PhotocullError, Result};
use crate::photocull_core::registry::LoadWarning;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// In-memory tagging session over one directory.
///
/// Assets keep the enumeration order from load; that order is the
/// navigation order and the commit order. Nothing here is persisted.
#[derive(Debug)]
pub struct Session {
    root: PathBuf,
    assets: Vec<PhotoAsset>,
    index: HashMap<PathBuf, usize>,
    warnings: Vec<LoadWarning>,
}

/// Number of assets per tag.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TagCounts {
    pub unmarked: usize,
    pub selected: usize,
    pub to_remove: usize,
}

impl Session {
    pub(crate) fn new(root: PathBuf, assets: Vec<PhotoAsset>, warnings: Vec<LoadWarning>) -> Self {
        let index = assets
            .iter()
            .enumerate()
            .map(|(i, asset)| (asset.id().to_path_buf(), i))
            .collect();

        Session {
            root,
            assets,
            index,
            warnings,
        }
    }

    /// Get the session root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn assets(&self) -> &[PhotoAsset] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Files that were skipped or downgraded during load.
    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    /// Navigation position of an asset.
    pub fn position(&self, id: &Path) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &Path) -> Result<&PhotoAsset> {
        self.position(id)
            .map(|i| &self.assets[i])
            .ok_or_else(|| PhotocullError::UnknownAsset(id.to_path_buf()))
    }

    pub(crate) fn get_mut(&mut self, id: &Path) -> Result<&mut PhotoAsset> {
        match self.position(id) {
            Some(i) => Ok(&mut self.assets[i]),
            None => Err(PhotocullError::UnknownAsset(id.to_path_buf())),
        }
    }

    /// Look up an asset by its file name inside the root directory.
    pub fn resolve(&self, filename: &str) -> Result<&PhotoAsset> {
        self.get(&self.root.join(filename))
    }

    pub fn tag_counts(&self) -> TagCounts {
        self.assets
            .iter()
            .fold(TagCounts::default(), |mut counts, asset| {
                match asset.tag() {
                    Tag::Unmarked => counts.unmarked += 1,
                    Tag::Selected => counts.selected += 1,
                    Tag::ToRemove => counts.to_remove += 1,
                }
                counts
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photocull_core::asset::PhotoKind;

    fn session_of(names: &[&str]) -> Session {
        let root = PathBuf::from("/photos");
        let assets = names
            .iter()
            .map(|name| PhotoAsset::new(root.join(name), PhotoKind::Ordinary))
            .collect();
        Session::new(root, assets, Vec::new())
    }

    #[test]
    fn test_lookup_by_id_and_name() {
        let session = session_of(&["a.jpg", "b.jpg"]);
        assert_eq!(session.position(Path::new("/photos/b.jpg")), Some(1));
        assert_eq!(session.resolve("a.jpg").unwrap().filename(), "a.jpg");
        assert!(matches!(
            session.get(Path::new("/photos/zzz.jpg")),
            Err(PhotocullError::UnknownAsset(_))
        ));
    }

    #[test]
    fn test_tag_counts_start_unmarked() {
        let session = session_of(&["a.jpg", "b.jpg", "c.jpg"]);
        assert_eq!(
            session.tag_counts(),
            TagCounts {
                unmarked: 3,
                selected: 0,
                to_remove: 0
            }
        );
    }
}
