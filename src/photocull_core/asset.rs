use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Disposition the user has chosen for a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tag {
    #[default]
    Unmarked,
    Selected,
    ToRemove,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Unmarked => "unmarked",
            Tag::Selected => "selected",
            Tag::ToRemove => "to-remove",
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Byte range of the video clip embedded at the end of a motion photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionClip {
    pub source: PathBuf,
    pub offset: u64,
    pub length: u64,
}

/// What the registry found when it inspected a file. Decided once at load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoKind {
    Ordinary,
    Motion {
        clip: MotionClip,
        /// Sampled clip frames, not counting the primary still.
        clip_frames: usize,
    },
}

impl PhotoKind {
    pub fn frame_count(&self) -> usize {
        match self {
            PhotoKind::Ordinary => 1,
            PhotoKind::Motion { clip_frames, .. } => 1 + clip_frames,
        }
    }
}

/// A photo in the session.
#[derive(Debug, Clone)]
pub struct PhotoAsset {
    id: PathBuf,
    kind: PhotoKind,
    selected_frame_index: usize,
    tag: Tag,
}

impl PhotoAsset {
    pub fn new(path: PathBuf, kind: PhotoKind) -> Self {
        PhotoAsset {
            id: path,
            kind,
            selected_frame_index: 0,
            tag: Tag::Unmarked,
        }
    }

    /// Absolute source path, which doubles as the asset id.
    pub fn id(&self) -> &Path {
        &self.id
    }

    pub fn source_path(&self) -> &Path {
        &self.id
    }

    /// File name exactly as on disk; destinations are built from this.
    pub fn file_name(&self) -> &OsStr {
        self.id.file_name().unwrap_or_default()
    }

    /// Lossy file name for display and logs.
    pub fn filename(&self) -> String {
        self.id
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    pub fn kind(&self) -> &PhotoKind {
        &self.kind
    }

    pub fn is_motion_photo(&self) -> bool {
        matches!(self.kind, PhotoKind::Motion { .. })
    }

    pub fn motion_clip(&self) -> Option<&MotionClip> {
        match &self.kind {
            PhotoKind::Motion { clip, .. } => Some(clip),
            PhotoKind::Ordinary => None,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.kind.frame_count()
    }

    pub fn selected_frame_index(&self) -> usize {
        self.selected_frame_index
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// True when committing this asset means writing a decoded still instead
    /// of copying the source file.
    pub fn needs_materialized_frame(&self) -> bool {
        self.is_motion_photo() && self.selected_frame_index != 0
    }

    pub(crate) fn set_tag(&mut self, tag: Tag) {
        self.tag = tag;
    }

    /// Callers validate the index against `frame_count` first.
    pub(crate) fn set_selected_frame_index(&mut self, index: usize) {
        debug_assert!(index < self.frame_count());
        self.selected_frame_index = index;
    }
}

/// Image file extensions (lowercase) the registry picks up.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tif", "tiff", "bmp"];

/// Only JPEGs can carry an embedded motion clip.
const MOTION_CAPABLE_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Check if a file is a supported image based on its extension.
pub fn is_supported_image(path: &Path) -> bool {
    lowercase_extension(path)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

pub fn may_be_motion_photo(path: &Path) -> bool {
    lowercase_extension(path)
        .map(|ext| MOTION_CAPABLE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("scan.Tif")));
        assert!(is_supported_image(Path::new("shot.webp")));
        assert!(!is_supported_image(Path::new("clip.mp4")));
        assert!(!is_supported_image(Path::new("photo.xmp")));
        assert!(!is_supported_image(Path::new("README")));
    }

    #[test]
    fn test_motion_capable_extensions() {
        assert!(may_be_motion_photo(Path::new("PXL_0001.MP.jpg")));
        assert!(may_be_motion_photo(Path::new("IMG.JPG")));
        assert!(!may_be_motion_photo(Path::new("IMG.png")));
    }

    #[test]
    fn test_new_asset_defaults() {
        let asset = PhotoAsset::new(PathBuf::from("/photos/a.jpg"), PhotoKind::Ordinary);
        assert_eq!(asset.tag(), Tag::Unmarked);
        assert_eq!(asset.frame_count(), 1);
        assert_eq!(asset.selected_frame_index(), 0);
        assert_eq!(asset.filename(), "a.jpg");
        assert!(!asset.needs_materialized_frame());
    }

    #[test]
    fn test_motion_frame_count_includes_primary_still() {
        let kind = PhotoKind::Motion {
            clip: MotionClip {
                source: PathBuf::from("/photos/m.jpg"),
                offset: 100,
                length: 50,
            },
            clip_frames: 12,
        };
        assert_eq!(kind.frame_count(), 13);
    }

    #[test]
    fn test_tag_display() {
        assert_eq!(Tag::Unmarked.to_string(), "unmarked");
        assert_eq!(Tag::Selected.to_string(), "selected");
        assert_eq!(Tag::ToRemove.to_string(), "to-remove");
    }
}
