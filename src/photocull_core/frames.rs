use crate::photocull_core::asset::{PhotoAsset, Tag};
use crate::photocull_core::error::{PhotocullError, Result};
use crate::photocull_core::motion::{MotionDecoder, read_primary_still};
use crate::photocull_core::session::Session;
use image::DynamicImage;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Sharpness of one candidate frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameScore {
    pub index: usize,
    pub score: f64,
}

/// Variance of the 4-neighbour Laplacian over the luma channel.
///
/// Higher means more high-frequency detail, i.e. a sharper frame.
pub fn sharpness(image: &DynamicImage) -> f64 {
    let gray = image.to_luma8();
    let (width, height) = gray.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let px = |x: u32, y: u32| gray.get_pixel(x, y).0[0] as f64;

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let lap = 4.0 * px(x, y) - px(x - 1, y) - px(x + 1, y) - px(x, y - 1) - px(x, y + 1);
            sum += lap;
            sum_sq += lap * lap;
        }
    }

    let n = ((width - 2) * (height - 2)) as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

/// Decode every frame of an asset: the primary still followed by the clip frames.
fn decode_all_frames(asset: &PhotoAsset, decoder: &dyn MotionDecoder) -> Result<Vec<DynamicImage>> {
    let Some(clip) = asset.motion_clip() else {
        return Ok(vec![image::open(asset.source_path()).map_err(|e| {
            PhotocullError::decode(asset.source_path(), e.to_string())
        })?]);
    };

    let mut frames = vec![read_primary_still(clip)?];
    frames.extend(decoder.decode_clip_frames(clip)?);

    // The probe at load fixed frame_count; never hand out indices beyond it.
    if frames.len() != asset.frame_count() {
        log::warn!(
            "{}: decoded {} frames, expected {}",
            asset.source_path().display(),
            frames.len(),
            asset.frame_count()
        );
        frames.truncate(asset.frame_count());
    }

    Ok(frames)
}

/// Score every frame of an asset, sharpest first; equal scores keep index order.
pub fn rank_frames(asset: &PhotoAsset, decoder: &dyn MotionDecoder) -> Result<Vec<FrameScore>> {
    let frames = decode_all_frames(asset, decoder)?;

    let mut ranking: Vec<FrameScore> = frames
        .par_iter()
        .enumerate()
        .map(|(index, frame)| FrameScore {
            index,
            score: sharpness(frame),
        })
        .collect();

    ranking.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.index.cmp(&b.index)));

    log::debug!(
        "Ranked {} frames of {}",
        ranking.len(),
        asset.source_path().display()
    );
    Ok(ranking)
}

/// Index of the sharpest frame; the earliest one wins a tie.
pub fn extract_best_frame(asset: &PhotoAsset, decoder: &dyn MotionDecoder) -> Result<usize> {
    if !asset.is_motion_photo() {
        return Ok(0);
    }

    rank_frames(asset, decoder)?
        .first()
        .map(|best| best.index)
        .ok_or_else(|| PhotocullError::decode(asset.source_path(), "no frames decoded"))
}

/// Decode the still image for a given frame index.
pub fn materialize_frame(asset: &PhotoAsset, index: usize, decoder: &dyn MotionDecoder) -> Result<DynamicImage> {
    check_frame_index(asset, index)?;

    match (asset.motion_clip(), index) {
        (Some(clip), 0) => read_primary_still(clip),
        (Some(clip), n) => decoder.decode_clip_frame(clip, n - 1),
        (None, _) => Ok(image::open(asset.source_path())?),
    }
}

fn check_frame_index(asset: &PhotoAsset, index: usize) -> Result<()> {
    if index >= asset.frame_count() {
        return Err(PhotocullError::InvalidFrameIndex {
            asset: asset.id().to_path_buf(),
            index,
            frame_count: asset.frame_count(),
        });
    }
    Ok(())
}

impl Session {
    /// Choose which frame represents the asset. Setting the current index again is a no-op.
    pub fn set_frame(&mut self, id: &Path, index: usize) -> Result<()> {
        let asset = self.get_mut(id)?;
        check_frame_index(asset, index)?;

        if asset.selected_frame_index() != index {
            log::debug!("{}: frame {} -> {}", id.display(), asset.selected_frame_index(), index);
            asset.set_selected_frame_index(index);
        }
        Ok(())
    }

    /// Find the sharpest frame and select it. On failure the previous frame stays selected.
    pub fn apply_best_frame(&mut self, id: &Path, decoder: &dyn MotionDecoder) -> Result<usize> {
        let best = extract_best_frame(self.get(id)?, decoder)?;
        self.set_frame(id, best)?;
        Ok(best)
    }

    /// Select the sharpest frame of every SELECTED motion photo, except those
    /// in `keep`, whose frame was chosen explicitly.
    ///
    /// Outcomes are per asset; an asset that fails keeps its previous frame.
    pub fn apply_best_frames(
        &mut self,
        decoder: &dyn MotionDecoder,
        keep: &HashSet<PathBuf>,
    ) -> Vec<(PathBuf, Result<usize>)> {
        let candidates: Vec<PathBuf> = self
            .assets()
            .iter()
            .filter(|a| a.tag() == Tag::Selected && a.is_motion_photo() && !keep.contains(a.id()))
            .map(|a| a.id().to_path_buf())
            .collect();

        candidates
            .into_iter()
            .map(|id| {
                let outcome = self.apply_best_frame(&id, decoder);
                (id, outcome)
            })
            .collect()
    }
}
