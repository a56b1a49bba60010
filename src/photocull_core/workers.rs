use crate::photocull_core::asset::PhotoAsset;
use crate::photocull_core::commit::{CancelToken, CommitOptions, CommitPlan, CommitProgress, CommitReport, execute};
use crate::photocull_core::error::{PhotocullError, Result};
use crate::photocull_core::frames::{FrameScore, rank_frames};
use crate::photocull_core::motion::MotionDecoder;
use base64::{Engine, engine::general_purpose};
use crossbeam_channel::{Receiver, RecvTimeoutError, unbounded};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use std::{fs, io};

/// Calculate the SHA256 hash of a file at the given path and returns it as base64.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    let hash = hasher.finalize();
    Ok(general_purpose::STANDARD.encode(hash))
}

/// Messages from a commit running in the background.
#[derive(Debug)]
pub enum CommitEvent {
    Progress(CommitProgress),
    Finished(Result<CommitReport>),
}

/// Handle to a commit running on a worker thread.
pub struct CommitHandle {
    events: Receiver<CommitEvent>,
    cancel: CancelToken,
    worker: Option<JoinHandle<()>>,
}

/// Run a commit plan on a worker thread so the caller stays responsive.
pub fn spawn_commit(
    plan: CommitPlan,
    decoder: Arc<dyn MotionDecoder>,
    options: CommitOptions,
) -> CommitHandle {
    let (event_tx, event_rx) = unbounded();
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();

    let worker = thread::spawn(move || {
        let progress_tx = event_tx.clone();
        let result = execute(&plan, decoder.as_ref(), &options, &worker_cancel, |progress| {
            if progress_tx.send(CommitEvent::Progress(progress.clone())).is_err() {
                log::debug!("Commit progress receiver dropped");
            }
        });
        if event_tx.send(CommitEvent::Finished(result)).is_err() {
            log::error!("Commit finished but nobody is waiting for the report");
        }
    });

    CommitHandle {
        events: event_rx,
        cancel,
        worker: Some(worker),
    }
}

impl CommitHandle {
    /// Ask the worker to stop before its next file operation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Raw event stream, for callers that poll from an event loop.
    pub fn events(&self) -> &Receiver<CommitEvent> {
        &self.events
    }

    /// Block until the commit finishes, passing progress along as it arrives.
    pub fn wait_with(mut self, mut on_progress: impl FnMut(&CommitProgress)) -> Result<CommitReport> {
        let mut finished = None;
        for event in self.events.iter() {
            match event {
                CommitEvent::Progress(progress) => on_progress(&progress),
                CommitEvent::Finished(result) => {
                    finished = Some(result);
                    break;
                }
            }
        }

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Commit worker panicked");
                return Err(PhotocullError::WorkerLost);
            }
        }

        finished.unwrap_or(Err(PhotocullError::WorkerLost))
    }

    pub fn wait(self) -> Result<CommitReport> {
        self.wait_with(|_| {})
    }
}

/// Handle to a frame ranking running on a worker thread.
pub struct FrameRankingHandle {
    result: Receiver<Result<Vec<FrameScore>>>,
}

/// Decode and score the frames of an asset off the calling thread.
pub fn spawn_frame_ranking(asset: PhotoAsset, decoder: Arc<dyn MotionDecoder>) -> FrameRankingHandle {
    let (tx, rx) = unbounded();

    thread::spawn(move || {
        let ranking = rank_frames(&asset, decoder.as_ref());
        if tx.send(ranking).is_err() {
            log::debug!("Frame ranking for {} no longer wanted", asset.source_path().display());
        }
    });

    FrameRankingHandle { result: rx }
}

impl FrameRankingHandle {
    /// Result if ranking has finished, without blocking.
    pub fn try_result(&self) -> Option<Result<Vec<FrameScore>>> {
        self.result.try_recv().ok()
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<Vec<FrameScore>>> {
        match self.result.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(PhotocullError::WorkerLost)),
        }
    }

    pub fn wait(self) -> Result<Vec<FrameScore>> {
        self.result.recv().unwrap_or(Err(PhotocullError::WorkerLost))
    }
}
