use crate::photocull_core::asset::{PhotoAsset, PhotoKind, is_supported_image, may_be_motion_photo};
use crate::photocull_core::error::{PhotocullError, Result};
use crate::photocull_core::motion::{MotionDecoder, probe_motion_clip};
use crate::photocull_core::session::Session;
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// A file that was skipped, or kept in a degraded form, during load.
#[derive(Debug, Clone, Serialize)]
pub struct LoadWarning {
    pub path: PathBuf,
    pub reason: String,
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

/// Outcome of inspecting one candidate file.
enum Inspection {
    Kept(PhotoAsset, Option<LoadWarning>),
    Skipped(LoadWarning),
}

/// Navigation order: case-insensitive file name, exact name as tie-breaker.
fn by_file_name(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a = a.file_name().to_string_lossy();
    let b = b.file_name().to_string_lossy();
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(&b))
}

impl Session {
    /// Enumerate the images directly under `root` and start a session.
    ///
    /// Only container metadata is probed here; no frame is decoded. Files
    /// that cannot be read are skipped with a warning, and motion photos
    /// with a broken container are kept as ordinary photos with a warning.
    pub fn load(root: &Path, decoder: &dyn MotionDecoder) -> Result<Session> {
        let root = fs::canonicalize(root).map_err(|e| PhotocullError::Load {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;

        if !root.is_dir() {
            return Err(PhotocullError::NotADirectory(root));
        }

        // Surface an unreadable root as a load failure rather than an empty session.
        fs::read_dir(&root).map_err(|e| PhotocullError::Load {
            path: root.clone(),
            reason: e.to_string(),
        })?;

        log::info!("Loading photos from {}", root.display());

        let mut warnings = Vec::new();
        let mut candidates = Vec::new();

        for entry in WalkDir::new(&root)
            .min_depth(1)
            .max_depth(1)
            .sort_by(by_file_name)
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && is_supported_image(path) {
                        candidates.push(root.join(entry.file_name()));
                    }
                }
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                    log::warn!("Skipping {}: {}", path.display(), e);
                    warnings.push(LoadWarning {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        // Probe in parallel; collect keeps enumeration order.
        let inspections: Vec<Inspection> = candidates
            .into_par_iter()
            .map(|path| inspect_candidate(path, decoder))
            .collect();

        let mut assets = Vec::with_capacity(inspections.len());
        for inspection in inspections {
            match inspection {
                Inspection::Kept(asset, warning) => {
                    assets.push(asset);
                    warnings.extend(warning);
                }
                Inspection::Skipped(warning) => warnings.push(warning),
            }
        }

        log::info!(
            "Loaded {} photos ({} motion, {} warnings)",
            assets.len(),
            assets.iter().filter(|a| a.is_motion_photo()).count(),
            warnings.len()
        );

        Ok(Session::new(root, assets, warnings))
    }
}

fn inspect_candidate(path: PathBuf, decoder: &dyn MotionDecoder) -> Inspection {
    match inspect(&path, decoder) {
        Ok(kind) => Inspection::Kept(PhotoAsset::new(path, kind), None),
        Err(PhotocullError::Decode { reason, .. }) => {
            log::warn!("Treating {} as an ordinary photo: {}", path.display(), reason);
            let warning = LoadWarning {
                path: path.clone(),
                reason: format!("motion photo not usable: {}", reason),
            };
            Inspection::Kept(PhotoAsset::new(path, PhotoKind::Ordinary), Some(warning))
        }
        Err(e) => {
            log::warn!("Skipping unreadable file {}: {}", path.display(), e);
            Inspection::Skipped(LoadWarning {
                path,
                reason: e.to_string(),
            })
        }
    }
}

/// Decide whether a file is an ordinary photo or a motion photo.
///
/// Decode errors mean the file is readable but its motion container is not
/// usable; any other error means the file itself could not be read.
pub fn inspect(path: &Path, decoder: &dyn MotionDecoder) -> Result<PhotoKind> {
    if !may_be_motion_photo(path) {
        File::open(path)?;
        return Ok(PhotoKind::Ordinary);
    }

    let Some(clip) = probe_motion_clip(path)? else {
        return Ok(PhotoKind::Ordinary);
    };

    let clip_frames = decoder.count_clip_frames(&clip)?;
    if clip_frames == 0 {
        return Err(PhotocullError::decode(path, "embedded clip has no frames"));
    }

    log::debug!("{} is a motion photo with {} clip frames", path.display(), clip_frames);
    Ok(PhotoKind::Motion { clip, clip_frames })
}
