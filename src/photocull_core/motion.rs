use crate::photocull_core::asset::MotionClip;
use crate::photocull_core::error::{PhotocullError, Result};
use image::{DynamicImage, ImageFormat, RgbImage};
use regex::bytes::Regex;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use tempfile::NamedTempFile;

/// How much of a file is searched for the XMP packet. XMP lives in APP1,
/// right after SOI, so the head is enough.
const HEAD_PROBE_BYTES: u64 = 256 * 1024;

static XMP_PACKET: OnceLock<Regex> = OnceLock::new();
static VIDEO_ITEM_LENGTH: OnceLock<Regex> = OnceLock::new();

fn xmp_packet() -> &'static Regex {
    XMP_PACKET.get_or_init(|| Regex::new(r"(?s)<x:xmpmeta.*?</x:xmpmeta>").unwrap())
}

fn video_item_length() -> &'static Regex {
    VIDEO_ITEM_LENGTH
        .get_or_init(|| Regex::new(r#"(?s)Item:Mime="video/mp4".*?Item:Length="(\d+)""#).unwrap())
}

/// Locate the embedded clip of a motion photo from the file head and total size.
///
/// Returns `Ok(None)` for files without a `GCamera:MotionPhoto` XMP marker and
/// a decode error when the marker is present but the container directory is
/// unusable.
pub fn find_motion_clip(path: &Path, head: &[u8], file_len: u64) -> Result<Option<MotionClip>> {
    let Some(xmp) = xmp_packet().find(head) else {
        return Ok(None);
    };
    let xmp = xmp.as_bytes();

    if !contains(xmp, b"GCamera:MotionPhoto") {
        return Ok(None);
    }

    let length = video_item_length()
        .captures(xmp)
        .and_then(|caps| caps.get(1))
        .and_then(|m| std::str::from_utf8(m.as_bytes()).ok())
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| PhotocullError::decode(path, "no video/mp4 item in motion photo container"))?;

    if length == 0 || length >= file_len {
        return Err(PhotocullError::decode(
            path,
            format!("embedded clip length {} does not fit in {} byte file", length, file_len),
        ));
    }

    Ok(Some(MotionClip {
        source: path.to_path_buf(),
        offset: file_len - length,
        length,
    }))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Read the head of a file and look for an embedded motion clip.
pub fn probe_motion_clip(path: &Path) -> Result<Option<MotionClip>> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();

    let mut head = Vec::new();
    file.take(HEAD_PROBE_BYTES).read_to_end(&mut head)?;

    find_motion_clip(path, &head, file_len)
}

/// Read the raw bytes of the embedded clip.
pub fn read_clip_bytes(clip: &MotionClip) -> Result<Vec<u8>> {
    let mut file = File::open(&clip.source)?;
    file.seek(SeekFrom::Start(clip.offset))?;
    let mut bytes = vec![0u8; clip.length as usize];
    file.read_exact(&mut bytes)
        .map_err(|e| PhotocullError::decode(&clip.source, format!("truncated clip: {}", e)))?;
    Ok(bytes)
}

/// Decode the primary still: the JPEG that precedes the clip.
pub fn read_primary_still(clip: &MotionClip) -> Result<DynamicImage> {
    let mut file = File::open(&clip.source)?;
    let mut bytes = vec![0u8; clip.offset as usize];
    file.read_exact(&mut bytes)?;
    image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)
        .map_err(|e| PhotocullError::decode(&clip.source, format!("primary still: {}", e)))
}

/// Video decoding capability for the clips embedded in motion photos.
///
/// Clip frame `n` is frame `n + 1` of the asset; frame 0 is always the
/// primary still.
pub trait MotionDecoder: Send + Sync {
    /// Number of sampled frames in the clip, without decoding pixels.
    fn count_clip_frames(&self, clip: &MotionClip) -> Result<usize>;

    /// Decode every sampled frame of the clip, in order.
    fn decode_clip_frames(&self, clip: &MotionClip) -> Result<Vec<DynamicImage>>;

    /// Decode a single sampled frame.
    fn decode_clip_frame(&self, clip: &MotionClip, n: usize) -> Result<DynamicImage> {
        let mut frames = self.decode_clip_frames(clip)?;
        if n >= frames.len() {
            return Err(PhotocullError::decode(
                &clip.source,
                format!("clip has {} frames, wanted frame {}", frames.len(), n),
            ));
        }
        Ok(frames.swap_remove(n))
    }
}

/// External tool settings for [`FfmpegDecoder`].
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    /// Keep every `frame_step`-th clip frame.
    pub frame_step: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            frame_step: 1,
        }
    }
}

/// Decodes motion clips by shelling out to ffprobe/ffmpeg.
#[derive(Debug, Clone, Default)]
pub struct FfmpegDecoder {
    config: DecoderConfig,
}

impl FfmpegDecoder {
    pub fn new(mut config: DecoderConfig) -> Self {
        config.frame_step = config.frame_step.max(1);
        FfmpegDecoder { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    fn probe(&self, clip: &MotionClip, clip_file: &Path, extra: &[&str], entries: &str, format: &str) -> Result<String> {
        let output = Command::new(&self.config.ffprobe)
            .args(["-v", "error", "-select_streams", "v:0"])
            .args(extra)
            .args(["-show_entries", entries, "-of", format])
            .arg(clip_file)
            .output()
            .map_err(|e| PhotocullError::decode(&clip.source, format!("cannot run ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(PhotocullError::decode(
                &clip.source,
                format!("ffprobe failed: {}", String::from_utf8_lossy(&output.stderr).trim()),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn dimensions(&self, clip: &MotionClip, clip_file: &Path) -> Result<(u32, u32)> {
        let out = self.probe(clip, clip_file, &[], "stream=width,height", "csv=p=0:s=x")?;
        let parsed: Option<(u32, u32)> = out
            .lines()
            .next()
            .and_then(|line| line.split_once('x'))
            .and_then(|(w, h)| Some((w.trim().parse().ok()?, h.trim().parse().ok()?)));

        match parsed {
            Some((w, h)) if w > 0 && h > 0 => Ok((w, h)),
            _ => Err(PhotocullError::decode(
                &clip.source,
                format!("unreadable clip dimensions '{}'", out),
            )),
        }
    }

    /// Run ffmpeg with the given frame filter and split raw RGB24 output into frames.
    fn decode_raw(&self, clip: &MotionClip, filter: Option<String>, limit: Option<usize>) -> Result<Vec<DynamicImage>> {
        let clip_file = extract_clip(clip)?;
        let (width, height) = self.dimensions(clip, clip_file.path())?;

        let mut cmd = Command::new(&self.config.ffmpeg);
        cmd.args(["-v", "error", "-noautorotate", "-i"])
            .arg(clip_file.path())
            .args(["-map", "0:v:0"]);
        if let Some(filter) = filter {
            cmd.arg("-vf").arg(filter);
        }
        if let Some(limit) = limit {
            cmd.arg("-frames:v").arg(limit.to_string());
        }
        cmd.args(["-vsync", "passthrough", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"]);

        log::debug!("Decoding clip of {} ({}x{})", clip.source.display(), width, height);
        let output = cmd
            .output()
            .map_err(|e| PhotocullError::decode(&clip.source, format!("cannot run ffmpeg: {}", e)))?;

        if !output.status.success() {
            return Err(PhotocullError::decode(
                &clip.source,
                format!("ffmpeg failed: {}", String::from_utf8_lossy(&output.stderr).trim()),
            ));
        }

        let frame_size = width as usize * height as usize * 3;
        let frames: Vec<DynamicImage> = output
            .stdout
            .chunks_exact(frame_size)
            .filter_map(|chunk| RgbImage::from_raw(width, height, chunk.to_vec()))
            .map(DynamicImage::ImageRgb8)
            .collect();

        if frames.is_empty() {
            return Err(PhotocullError::decode(&clip.source, "clip produced no frames"));
        }

        Ok(frames)
    }
}

impl MotionDecoder for FfmpegDecoder {
    fn count_clip_frames(&self, clip: &MotionClip) -> Result<usize> {
        let clip_file = extract_clip(clip)?;
        let out = self.probe(
            clip,
            clip_file.path(),
            &["-count_packets"],
            "stream=nb_read_packets",
            "csv=p=0",
        )?;
        let packets: usize = out.lines().next().unwrap_or_default().trim().parse().map_err(|_| {
            PhotocullError::decode(&clip.source, format!("unreadable packet count '{}'", out))
        })?;

        if packets == 0 {
            return Err(PhotocullError::decode(&clip.source, "clip has no video frames"));
        }

        Ok(packets.div_ceil(self.config.frame_step))
    }

    fn decode_clip_frames(&self, clip: &MotionClip) -> Result<Vec<DynamicImage>> {
        let filter = (self.config.frame_step > 1)
            .then(|| format!("select='not(mod(n\\,{}))'", self.config.frame_step));
        self.decode_raw(clip, filter, None)
    }

    fn decode_clip_frame(&self, clip: &MotionClip, n: usize) -> Result<DynamicImage> {
        let source_frame = n * self.config.frame_step;
        let filter = format!("select='eq(n\\,{})'", source_frame);
        let mut frames = self.decode_raw(clip, Some(filter), Some(1))?;
        Ok(frames.swap_remove(0))
    }
}

/// Check if ffmpeg and ffprobe are available on the system.
pub fn ffmpeg_available(config: &DecoderConfig) -> bool {
    [&config.ffmpeg, &config.ffprobe].iter().all(|program| {
        Command::new(program)
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    })
}

/// Copy the embedded clip out to a fresh temporary `.mp4` in `dir`.
///
/// The file gets a unique name and is removed when the handle is dropped.
fn extract_clip_in(clip: &MotionClip, dir: &Path) -> Result<NamedTempFile> {
    let bytes = read_clip_bytes(clip)?;
    let mut file = tempfile::Builder::new()
        .prefix("photocull-")
        .suffix(".mp4")
        .tempfile_in(dir)?;
    file.write_all(&bytes)?;
    file.flush()?;
    Ok(file)
}

fn extract_clip(clip: &MotionClip) -> Result<NamedTempFile> {
    extract_clip_in(clip, &std::env::temp_dir())
}
