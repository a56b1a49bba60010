use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use photocull::photocull_core::output::{format_preview, format_ranking, format_report, format_session};
use photocull::photocull_core::{
    Cli, CommitOptions, CommitPlan, Commands, DecoderConfig, FfmpegDecoder, MotionDecoder, PhotoAsset, Session,
    ffmpeg_available, inspect, spawn_commit, spawn_frame_ranking,
};
use simplelog::{CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, WriteLogger};
use std::collections::HashSet;
use std::fs::{self, File};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize loggers
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        LevelFilter::Warn,
        Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )];

    if cli.log {
        loggers.push(WriteLogger::new(
            cli.log_level,
            Config::default(),
            File::create("photocull.log")?,
        ));
    }

    CombinedLogger::init(loggers)?;

    let config = DecoderConfig {
        ffmpeg: cli.ffmpeg,
        ffprobe: cli.ffprobe,
        frame_step: cli.frame_step,
    };
    if !ffmpeg_available(&config) {
        log::info!("ffmpeg/ffprobe not found, motion photos will be treated as ordinary photos");
    }
    let decoder: Arc<dyn MotionDecoder> = Arc::new(FfmpegDecoder::new(config));

    match cli.command {
        Commands::List { dir, output } => {
            let session = Session::load(&dir, decoder.as_ref())?;
            println!("{}", format_session(&session, &output));
        }

        Commands::Frames { file, output } => {
            let path = fs::canonicalize(&file).with_context(|| format!("Cannot open {}", file.display()))?;
            let kind = inspect(&path, decoder.as_ref())?;
            let asset = PhotoAsset::new(path, kind);
            if !asset.is_motion_photo() {
                log::warn!("{} is not a motion photo, it only has frame 0", file.display());
            }

            let spinner = ProgressBar::new_spinner();
            spinner.set_message(format!("Scoring {} frames", asset.frame_count()));

            let handle = spawn_frame_ranking(asset, Arc::clone(&decoder));
            let ranking = loop {
                if let Some(result) = handle.wait_timeout(Duration::from_millis(100)) {
                    break result;
                }
                spinner.tick();
            };
            spinner.finish_and_clear();

            println!("{}", format_ranking(&ranking?, &output));
        }

        Commands::Commit {
            dir,
            select,
            remove,
            frame,
            best_frame,
            dry_run,
            no_log_file,
            output,
        } => {
            let mut session = Session::load(&dir, decoder.as_ref())?;

            for name in &select {
                let id = session.resolve(name)?.id().to_path_buf();
                session.mark_selected(&id)?;
            }
            for name in &remove {
                let id = session.resolve(name)?.id().to_path_buf();
                session.mark_to_remove(&id)?;
            }
            // An explicit --frame wins over --best-frame for that photo.
            let mut explicit_frames = HashSet::new();
            for (name, index) in &frame {
                let id = session.resolve(name)?.id().to_path_buf();
                session.set_frame(&id, *index)?;
                explicit_frames.insert(id);
            }

            if best_frame {
                for (id, outcome) in session.apply_best_frames(decoder.as_ref(), &explicit_frames) {
                    match outcome {
                        Ok(index) => log::info!("{}: best frame is {}", id.display(), index),
                        Err(e) => log::warn!("Keeping current frame for {}: {}", id.display(), e),
                    }
                }
            }

            let plan = CommitPlan::from_session(&session);

            if dry_run {
                println!("{}", format_preview(&plan.preview(), &output));
                return Ok(());
            }

            if plan.is_empty() {
                println!("Nothing to commit");
                return Ok(());
            }

            let bar_style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                .unwrap();
            let bar = ProgressBar::new(plan.len() as u64).with_style(bar_style);
            bar.set_message("Committing");

            let options = CommitOptions {
                write_log: !no_log_file,
            };
            let handle = spawn_commit(plan, Arc::clone(&decoder), options);
            let report = handle.wait_with(|progress| {
                bar.set_position(progress.done as u64);
                bar.set_message(
                    progress
                        .asset
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                );
            })?;
            bar.finish_and_clear();

            println!("{}", format_report(&report, &output));
        }
    }

    Ok(())
}
