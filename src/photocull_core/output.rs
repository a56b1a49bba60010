use crate::photocull_core::asset::PhotoAsset;
use crate::photocull_core::cli::OutputFormat;
use crate::photocull_core::commit::{CommitReport, OperationKind, PlannedOperation};
use crate::photocull_core::frames::FrameScore;
use crate::photocull_core::registry::LoadWarning;
use crate::photocull_core::session::Session;
use serde::Serialize;
use std::path::PathBuf;

/// One row of `list` output.
#[derive(Debug, Serialize)]
pub struct AssetRow {
    pub filename: String,
    pub path: PathBuf,
    pub motion: bool,
    pub frame_count: usize,
    pub selected_frame: usize,
    pub tag: String,
}

impl From<&PhotoAsset> for AssetRow {
    fn from(asset: &PhotoAsset) -> Self {
        AssetRow {
            filename: asset.filename(),
            path: asset.source_path().to_path_buf(),
            motion: asset.is_motion_photo(),
            frame_count: asset.frame_count(),
            selected_frame: asset.selected_frame_index(),
            tag: asset.tag().to_string(),
        }
    }
}

#[derive(Serialize)]
struct SessionListing<'a> {
    root: &'a std::path::Path,
    assets: Vec<AssetRow>,
    warnings: &'a [LoadWarning],
}

pub fn format_session(session: &Session, format: &OutputFormat) -> String {
    let rows: Vec<AssetRow> = session.assets().iter().map(AssetRow::from).collect();

    match format {
        OutputFormat::Paths => rows
            .iter()
            .map(|r| r.path.display().to_string())
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Json => {
            let listing = SessionListing {
                root: session.root(),
                assets: rows,
                warnings: session.warnings(),
            };
            serde_json::to_string_pretty(&listing).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => {
            let mut output = String::new();
            output.push_str(&format!("{:<40} {:>7} {:>7} {:>10}\n", "Filename", "Motion", "Frames", "Tag"));
            output.push_str(&format!("{}\n", "─".repeat(67)));
            for r in &rows {
                output.push_str(&format!(
                    "{:<40} {:>7} {:>7} {:>10}\n",
                    truncate_str(&r.filename, 40),
                    if r.motion { "yes" } else { "" },
                    r.frame_count,
                    r.tag
                ));
            }
            for warning in session.warnings() {
                output.push_str(&format!("warning: {}\n", warning));
            }
            let counts = session.tag_counts();
            output.push_str(&format!(
                "\nTotal: {} photos ({} selected, {} to remove)",
                rows.len(),
                counts.selected,
                counts.to_remove
            ));
            output
        }
    }
}

pub fn format_ranking(ranking: &[FrameScore], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Paths => ranking
            .iter()
            .map(|s| s.index.to_string())
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Json => serde_json::to_string_pretty(ranking).unwrap_or_else(|_| "[]".to_string()),
        OutputFormat::Table => {
            let mut output = String::new();
            output.push_str(&format!("{:>6} {:>14}\n", "Frame", "Sharpness"));
            output.push_str(&format!("{}\n", "─".repeat(21)));
            for s in ranking {
                output.push_str(&format!("{:>6} {:>14.2}\n", s.index, s.score));
            }
            if let Some(best) = ranking.first() {
                output.push_str(&format!("\nBest frame: {}", best.index));
            }
            output
        }
    }
}

pub fn format_preview(preview: &[PlannedOperation], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Paths => preview
            .iter()
            .map(|op| op.destination.display().to_string())
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Json => serde_json::to_string_pretty(preview).unwrap_or_else(|_| "[]".to_string()),
        OutputFormat::Table => {
            let mut output = String::new();
            for op in preview {
                let verb = match op.kind {
                    OperationKind::Copy => "copy",
                    OperationKind::Move => "move",
                };
                output.push_str(&format!("[DRY RUN] Would {} {} -> {}", verb, op.source.display(), op.destination.display()));
                if let Some(frame) = op.materialized_frame {
                    output.push_str(&format!(" (frame {})", frame));
                }
                if op.collides {
                    output.push_str(" (name taken, will be renamed)");
                }
                output.push('\n');
            }
            output.push_str(&format!("\n{} operations planned", preview.len()));
            output
        }
    }
}

pub fn format_report(report: &CommitReport, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Paths => report
            .copied
            .iter()
            .chain(report.moved.iter())
            .map(|t| t.destination.display().to_string())
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string()),
        OutputFormat::Table => {
            let mut output = String::from("Commit complete!\n");
            output.push_str(&format!("  {} files copied\n", report.copied.len()));
            output.push_str(&format!("  {} files moved\n", report.moved.len()));
            output.push_str(&format!("  {} failed\n", report.failures.len()));
            for failure in &report.failures {
                output.push_str(&format!("    {}\n", failure));
            }
            if report.cancelled {
                output.push_str(&format!("  cancelled, {} not started\n", report.skipped.len()));
            }
            output
        }
    }
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
