pub mod asset;
pub mod cli;
pub mod commit;
pub mod error;
pub mod frames;
pub mod motion;
pub mod output;
pub mod registry;
pub mod session;
pub mod tags;
pub mod workers;

#[cfg(test)]
mod testing;

pub use asset::{PhotoAsset, PhotoKind, Tag};
pub use cli::{Cli, Commands, OutputFormat};
pub use commit::{CancelToken, CommitOptions, CommitPlan, CommitProgress, CommitReport, commit, execute};
pub use error::{CommitFailure, PhotocullError};
pub use frames::{FrameScore, extract_best_frame, materialize_frame, rank_frames, sharpness};
pub use motion::{DecoderConfig, FfmpegDecoder, MotionDecoder, ffmpeg_available};
pub use registry::{LoadWarning, inspect};
pub use session::{Session, TagCounts};
pub use tags::TagCommand;
pub use workers::{CommitEvent, CommitHandle, hash_file, spawn_commit, spawn_frame_ranking};
