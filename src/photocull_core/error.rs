use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhotocullError {
    // Session errors
    #[error("Failed to load {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Unknown asset: {0}")]
    UnknownAsset(PathBuf),

    // Motion photo errors
    #[error("Failed to decode motion photo {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Frame index {index} out of range for {asset} ({frame_count} frames)")]
    InvalidFrameIndex {
        asset: PathBuf,
        index: usize,
        frame_count: usize,
    },

    // Commit errors
    #[error("Failed to prepare destination directory {path}: {source}")]
    DestinationDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Commit worker stopped unexpectedly")]
    WorkerLost,

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Directory walker error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("Argument error: {0}")]
    Argument(String),
}

impl PhotocullError {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PhotocullError::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// A single file operation that did not complete during a commit.
#[derive(Debug, Clone, Serialize)]
pub struct CommitFailure {
    pub asset: PathBuf,
    pub destination: Option<PathBuf>,
    pub reason: String,
}

impl std::fmt::Display for CommitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.destination {
            Some(dest) => write!(
                f,
                "{} -> {}: {}",
                self.asset.display(),
                dest.display(),
                self.reason
            ),
            None => write!(f, "{}: {}", self.asset.display(), self.reason),
        }
    }
}

/// Result type for photocull operations.
pub type Result<T> = std::result::Result<T, PhotocullError>;
