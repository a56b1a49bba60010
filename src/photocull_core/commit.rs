use crate::photocull_core::asset::{PhotoAsset, Tag};
use crate::photocull_core::error::{CommitFailure, PhotocullError, Result};
use crate::photocull_core::frames::materialize_frame;
use crate::photocull_core::motion::MotionDecoder;
use crate::photocull_core::session::Session;
use crate::photocull_core::workers::hash_file;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use serde::Serialize;
use std::ffi::{OsStr, OsString};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use time::OffsetDateTime;
use time::macros::format_description;

/// Folder under the session root receiving copies of SELECTED photos.
pub const SELECTED_DIR: &str = "SELECTED";
/// Folder under the session root receiving TO_REMOVE photos.
pub const TO_REMOVE_DIR: &str = "TOBEREMOVED";
/// Human-readable log written next to the photos after a commit.
pub const COMMIT_LOG_FILE: &str = "commit_log.txt";

/// Gives up on collision suffixes after this many candidates.
const MAX_NAME_ATTEMPTS: usize = 10_000;

const MATERIALIZED_JPEG_QUALITY: u8 = 95;

/// Snapshot of the work a commit will do, detached from the session so it
/// can be handed to a worker thread.
#[derive(Debug, Clone)]
pub struct CommitPlan {
    root: PathBuf,
    to_copy: Vec<PhotoAsset>,
    to_move: Vec<PhotoAsset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Copy,
    Move,
}

/// One planned file operation, as shown before committing.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedOperation {
    pub kind: OperationKind,
    pub source: PathBuf,
    pub destination: PathBuf,
    /// The plain destination name is already taken; a suffix will be added.
    pub collides: bool,
    /// A decoded motion frame will be written instead of the source file.
    pub materialized_frame: Option<usize>,
}

/// A completed copy or move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transfer {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Outcome of one commit. Never merged with earlier commits.
#[derive(Debug, Default, Serialize)]
pub struct CommitReport {
    pub copied: Vec<Transfer>,
    pub moved: Vec<Transfer>,
    pub failures: Vec<CommitFailure>,
    /// Assets never started because the commit was cancelled.
    pub skipped: Vec<PathBuf>,
    pub cancelled: bool,
}

impl CommitReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

impl std::fmt::Display for CommitReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} copied, {} moved, {} failed",
            self.copied.len(),
            self.moved.len(),
            self.failures.len()
        )?;
        if self.cancelled {
            write!(f, " (cancelled, {} not started)", self.skipped.len())?;
        }
        Ok(())
    }
}

/// Progress notification sent after each asset is processed.
#[derive(Debug, Clone)]
pub struct CommitProgress {
    pub done: usize,
    pub total: usize,
    pub asset: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CommitOptions {
    /// Write `commit_log.txt` into the session root.
    pub write_log: bool,
}

impl Default for CommitOptions {
    fn default() -> Self {
        CommitOptions { write_log: true }
    }
}

/// Cooperative stop flag, checked between file operations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl CommitPlan {
    /// Partition the session by tag, keeping session order. UNMARKED assets are left out.
    pub fn from_session(session: &Session) -> Self {
        let pick = |tag: Tag| -> Vec<PhotoAsset> {
            session
                .assets()
                .iter()
                .filter(|a| a.tag() == tag)
                .cloned()
                .collect()
        };

        CommitPlan {
            root: session.root().to_path_buf(),
            to_copy: pick(Tag::Selected),
            to_move: pick(Tag::ToRemove),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn to_copy(&self) -> &[PhotoAsset] {
        &self.to_copy
    }

    pub fn to_move(&self) -> &[PhotoAsset] {
        &self.to_move
    }

    pub fn len(&self) -> usize {
        self.to_copy.len() + self.to_move.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn selected_dir(&self) -> PathBuf {
        self.root.join(SELECTED_DIR)
    }

    pub fn to_remove_dir(&self) -> PathBuf {
        self.root.join(TO_REMOVE_DIR)
    }

    /// Planned destinations, flagging names that already exist on disk.
    pub fn preview(&self) -> Vec<PlannedOperation> {
        let planned = |kind: OperationKind, dir: PathBuf, asset: &PhotoAsset| {
            let destination = dir.join(asset.file_name());
            PlannedOperation {
                kind,
                source: asset.source_path().to_path_buf(),
                collides: destination.exists(),
                destination,
                materialized_frame: (kind == OperationKind::Copy && asset.needs_materialized_frame())
                    .then(|| asset.selected_frame_index()),
            }
        };

        let selected_dir = self.selected_dir();
        let to_remove_dir = self.to_remove_dir();

        self.to_copy
            .iter()
            .map(|a| planned(OperationKind::Copy, selected_dir.clone(), a))
            .chain(
                self.to_move
                    .iter()
                    .map(|a| planned(OperationKind::Move, to_remove_dir.clone(), a)),
            )
            .collect()
    }
}

/// Commit a session synchronously: copy SELECTED, move TO_REMOVE.
pub fn commit(session: &Session, decoder: &dyn MotionDecoder, options: &CommitOptions) -> Result<CommitReport> {
    execute(
        &CommitPlan::from_session(session),
        decoder,
        options,
        &CancelToken::new(),
        |_| {},
    )
}

/// Run a commit plan.
///
/// Each asset is handled on its own: a failure is recorded in the report
/// and the batch continues. Only failing to create the destination folders
/// aborts the commit. Cancellation stops new operations from starting;
/// finished ones are kept.
pub fn execute(
    plan: &CommitPlan,
    decoder: &dyn MotionDecoder,
    options: &CommitOptions,
    cancel: &CancelToken,
    mut on_progress: impl FnMut(&CommitProgress),
) -> Result<CommitReport> {
    let selected_dir = plan.selected_dir();
    let to_remove_dir = plan.to_remove_dir();

    for dir in [&selected_dir, &to_remove_dir] {
        fs::create_dir_all(dir).map_err(|source| PhotocullError::DestinationDir {
            path: dir.clone(),
            source,
        })?;
    }

    log::info!(
        "Committing {}: {} to copy, {} to move",
        plan.root.display(),
        plan.to_copy.len(),
        plan.to_move.len()
    );

    let started_at = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let operations: Vec<(OperationKind, &PhotoAsset)> = plan
        .to_copy
        .iter()
        .map(|a| (OperationKind::Copy, a))
        .chain(plan.to_move.iter().map(|a| (OperationKind::Move, a)))
        .collect();
    let total = operations.len();

    let mut report = CommitReport::default();
    let mut log_lines = Vec::with_capacity(total);

    for (done, (kind, asset)) in operations.iter().enumerate() {
        if cancel.is_cancelled() {
            report.cancelled = true;
            report.skipped = operations[done..]
                .iter()
                .map(|(_, a)| a.id().to_path_buf())
                .collect();
            log::warn!("Commit cancelled, {} operations not started", report.skipped.len());
            log_lines.push(format!("CANCELLED: {} operations not started", report.skipped.len()));
            break;
        }

        let outcome = match kind {
            OperationKind::Copy => copy_asset(asset, &selected_dir, decoder),
            OperationKind::Move => move_asset(asset, &to_remove_dir),
        };

        match outcome {
            Ok(destination) => {
                log::debug!("{:?}: {} -> {}", kind, asset.source_path().display(), destination.display());
                log_lines.push(format!(
                    "{}: {} -> {}",
                    if *kind == OperationKind::Copy { "COPY" } else { "MOVE" },
                    asset.filename(),
                    relative_to(&destination, &plan.root).display()
                ));
                let transfer = Transfer {
                    source: asset.source_path().to_path_buf(),
                    destination,
                };
                match kind {
                    OperationKind::Copy => report.copied.push(transfer),
                    OperationKind::Move => report.moved.push(transfer),
                }
            }
            Err(failure) => {
                log::warn!("Failed to commit {}", failure);
                log_lines.push(format!("ERROR: {}: {}", asset.filename(), failure.reason));
                report.failures.push(failure);
            }
        }

        on_progress(&CommitProgress {
            done: done + 1,
            total,
            asset: asset.id().to_path_buf(),
        });
    }

    if options.write_log && total > 0 {
        if let Err(e) = write_commit_log(&plan.root, started_at, &log_lines) {
            log::warn!("Could not write {}: {}", COMMIT_LOG_FILE, e);
        }
    }

    log::info!("Commit finished: {}", report);
    Ok(report)
}

fn relative_to<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

fn failure(asset: &PhotoAsset, destination: Option<&Path>, reason: impl std::fmt::Display) -> CommitFailure {
    CommitFailure {
        asset: asset.id().to_path_buf(),
        destination: destination.map(Path::to_path_buf),
        reason: reason.to_string(),
    }
}

/// `photo.jpg` for attempt 0, then `photo_1.jpg`, `photo_2.jpg`, ...
fn candidate_name(filename: &OsStr, attempt: usize) -> OsString {
    if attempt == 0 {
        return filename.to_os_string();
    }
    let path = Path::new(filename);
    let mut name = path.file_stem().unwrap_or(filename).to_os_string();
    name.push(format!("_{}", attempt));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    name
}

/// Create the first free destination name with create-new semantics, so an
/// existing file is never opened for writing.
fn reserve_destination(dir: &Path, filename: &OsStr) -> io::Result<(PathBuf, File)> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = dir.join(candidate_name(filename, attempt));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => {
                if attempt > 0 {
                    log::debug!("{} taken, using {}", filename.to_string_lossy(), candidate.display());
                }
                return Ok((candidate, file));
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!(
            "no free name for {} after {} attempts",
            filename.to_string_lossy(),
            MAX_NAME_ATTEMPTS
        ),
    ))
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        log::warn!("Could not remove incomplete file {}: {}", path.display(), e);
    }
}

/// Stream `source` into an already reserved destination and check the length.
fn copy_into(source: &Path, mut dest: File) -> io::Result<()> {
    let mut src = File::open(source)?;
    let expected = src.metadata()?.len();
    let written = io::copy(&mut src, &mut dest)?;
    dest.sync_all()?;

    if written != expected || dest.metadata()?.len() != expected {
        return Err(io::Error::other(format!(
            "wrote {} of {} bytes",
            written, expected
        )));
    }
    Ok(())
}

fn write_jpeg(image: &DynamicImage, dest: File) -> Result<()> {
    let mut writer = BufWriter::new(dest);
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_with_encoder(JpegEncoder::new_with_quality(&mut writer, MATERIALIZED_JPEG_QUALITY))?;
    let dest = writer.into_inner().map_err(|e| e.into_error())?;
    dest.sync_all()?;
    Ok(())
}

/// Copy a SELECTED asset into `SELECTED/`, materializing the chosen frame of
/// motion photos whose selection is not the primary still.
fn copy_asset(asset: &PhotoAsset, dir: &Path, decoder: &dyn MotionDecoder) -> std::result::Result<PathBuf, CommitFailure> {
    let source = asset.source_path();
    if !source.is_file() {
        return Err(failure(asset, None, "source file is missing"));
    }

    // Decode before reserving a name so a decode failure leaves nothing behind.
    let frame = if asset.needs_materialized_frame() {
        let index = asset.selected_frame_index();
        let image = materialize_frame(asset, index, decoder)
            .map_err(|e| failure(asset, None, format!("frame {}: {}", index, e)))?;
        Some(image)
    } else {
        None
    };

    let (dest_path, dest) = reserve_destination(dir, asset.file_name())
        .map_err(|e| failure(asset, None, e))?;

    let written = match &frame {
        Some(image) => write_jpeg(image, dest),
        None => copy_into(source, dest).map_err(PhotocullError::from),
    };

    match written {
        Ok(()) => Ok(dest_path),
        Err(e) => {
            discard(&dest_path);
            Err(failure(asset, Some(&dest_path), e))
        }
    }
}

/// Move a TO_REMOVE asset into `TOBEREMOVED/`.
///
/// A rename onto the reserved name is tried first. When that is not possible
/// the file is copied, verified by length and SHA-256, and only then is the
/// source deleted. If anything fails after the copy the destination copy is
/// removed and the source stays where it was.
fn move_asset(asset: &PhotoAsset, dir: &Path) -> std::result::Result<PathBuf, CommitFailure> {
    let source = asset.source_path();
    if !source.is_file() {
        return Err(failure(asset, None, "source file is missing"));
    }

    let (dest_path, dest) = reserve_destination(dir, asset.file_name())
        .map_err(|e| failure(asset, None, e))?;

    match fs::rename(source, &dest_path) {
        Ok(()) => {
            drop(dest);
            return Ok(dest_path);
        }
        Err(e) => log::debug!(
            "Rename of {} failed ({}), falling back to copy",
            source.display(),
            e
        ),
    }

    copy_verify_remove(asset, &dest_path, dest, |path| fs::remove_file(path))?;
    Ok(dest_path)
}

/// Move by copying into the reserved `dest`, confirming the copy by length
/// and SHA-256, and only then removing the source with `remove_source`.
///
/// On any failure the copy at `dest_path` is discarded and the source is
/// left in place.
fn copy_verify_remove(
    asset: &PhotoAsset,
    dest_path: &Path,
    dest: File,
    remove_source: impl FnOnce(&Path) -> io::Result<()>,
) -> std::result::Result<(), CommitFailure> {
    let source = asset.source_path();

    if let Err(e) = copy_into(source, dest) {
        discard(dest_path);
        return Err(failure(asset, Some(dest_path), e));
    }

    match (hash_file(source), hash_file(dest_path)) {
        (Ok(a), Ok(b)) if a == b => {}
        (Ok(_), Ok(_)) => {
            discard(dest_path);
            return Err(failure(asset, Some(dest_path), "copy does not match source"));
        }
        (Err(e), _) | (_, Err(e)) => {
            discard(dest_path);
            return Err(failure(asset, Some(dest_path), format!("could not verify copy: {}", e)));
        }
    }

    if let Err(e) = remove_source(source) {
        discard(dest_path);
        return Err(failure(
            asset,
            Some(dest_path),
            format!("could not remove source after copy: {}", e),
        ));
    }

    Ok(())
}

fn write_commit_log(root: &Path, started_at: OffsetDateTime, lines: &[String]) -> io::Result<()> {
    let timestamp = started_at
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .map_err(io::Error::other)?;

    let mut out = BufWriter::new(File::create(root.join(COMMIT_LOG_FILE))?);
    writeln!(out, "Commit Log")?;
    writeln!(out, "-------------------------")?;
    writeln!(out, "Started: {}", timestamp)?;
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    out.flush()
}
