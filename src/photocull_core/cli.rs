use clap::{Parser, Subcommand, ValueEnum};
use simplelog::LevelFilter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Triage a folder of photos: keep, discard, and pick the best frame of motion photos")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable file logging to photocull.log
    #[arg(long = "log", global = true)]
    pub log: bool,

    /// Log level for file logging (debug, info, warn, error)
    #[arg(long, default_value_t = LevelFilter::Debug, global = true)]
    pub log_level: LevelFilter,

    /// ffmpeg executable used to decode motion photo clips
    #[arg(long, default_value = "ffmpeg", global = true)]
    pub ffmpeg: PathBuf,

    /// ffprobe executable used to count clip frames
    #[arg(long, default_value = "ffprobe", global = true)]
    pub ffprobe: PathBuf,

    /// Only consider every Nth clip frame when searching for the best frame
    #[arg(long, default_value_t = 1, global = true)]
    pub frame_step: usize,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the photos in a folder, in navigation order
    List {
        /// Folder containing the photos
        #[arg(required = true)]
        dir: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Paths)]
        output: OutputFormat,
    },

    /// Rank the frames of a single motion photo by sharpness
    Frames {
        /// Motion photo to inspect
        #[arg(required = true)]
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },

    /// Tag photos and commit the decisions to disk.
    ///
    /// Selected photos are copied into SELECTED/ and photos marked for
    /// removal are moved into TOBEREMOVED/. Nothing is ever deleted and
    /// existing files are never overwritten; clashing names get a numeric
    /// suffix instead.
    Commit {
        /// Folder containing the photos
        #[arg(required = true)]
        dir: PathBuf,

        /// File name to keep (repeatable)
        #[arg(long = "select", value_name = "NAME")]
        select: Vec<String>,

        /// File name to set aside for removal (repeatable)
        #[arg(long = "remove", value_name = "NAME")]
        remove: Vec<String>,

        /// Frame to export for a motion photo, as NAME=INDEX (repeatable)
        #[arg(long = "frame", value_name = "NAME=INDEX", value_parser = parse_frame_choice)]
        frame: Vec<(String, usize)>,

        /// Pick the sharpest frame of every selected motion photo without an explicit --frame
        #[arg(long)]
        best_frame: bool,

        /// Show what would be done without making changes
        #[arg(long)]
        dry_run: bool,

        /// Do not write commit_log.txt into the folder
        #[arg(long)]
        no_log_file: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// One file path per line
    Paths,
    /// JSON output
    Json,
    /// Detailed table format
    Table,
}

/// Parse a `NAME=INDEX` frame choice. The name may itself contain `=`.
pub fn parse_frame_choice(s: &str) -> Result<(String, usize), String> {
    let (name, index) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=INDEX, got '{}'", s))?;

    if name.is_empty() {
        return Err(format!("missing file name in '{}'", s));
    }

    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("invalid frame index '{}'", index))?;

    Ok((name.to_string(), index))
}
