//! Fixtures shared by the unit tests: synthetic JPEGs, motion photo
//! containers and a scripted decoder that needs no ffmpeg.

use crate::photocull_core::asset::MotionClip;
use crate::photocull_core::error::{PhotocullError, Result};
use crate::photocull_core::motion::MotionDecoder;
use image::{DynamicImage, ImageFormat, Luma, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Encode a small JPEG. `checker` is the checkerboard cell size; 0 gives a flat gray image.
pub fn jpeg_bytes(width: u32, height: u32, checker: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        if checker == 0 || ((x / checker) + (y / checker)) % 2 == 0 {
            Rgb([128, 128, 128])
        } else {
            Rgb([255, 255, 255])
        }
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .unwrap();
    buf
}

/// XMP packet marking a motion photo; `clip_len` of `None` omits the video item.
pub fn xmp_packet_for(clip_len: Option<u64>) -> Vec<u8> {
    let item = match clip_len {
        Some(len) => format!(
            r#"<rdf:li rdf:parseType="Resource"><Container:Item Item:Mime="image/jpeg" Item:Semantic="Primary" Item:Length="0"/></rdf:li>
<rdf:li rdf:parseType="Resource"><Container:Item Item:Mime="video/mp4" Item:Semantic="MotionPhoto" Item:Length="{}"/></rdf:li>"#,
            len
        ),
        None => String::new(),
    };
    format!(
        r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF><rdf:Description GCamera:MotionPhoto="1" GCamera:MotionPhotoVersion="1"><Container:Directory><rdf:Seq>{}</rdf:Seq></Container:Directory></rdf:Description></rdf:RDF></x:xmpmeta>"#,
        item
    )
    .into_bytes()
}

/// Build a motion photo: XMP APP1 segment spliced in after SOI, clip appended.
pub fn motion_photo_bytes(primary_jpeg: &[u8], clip: &[u8]) -> Vec<u8> {
    let mut payload = b"http://ns.adobe.com/xap/1.0/\0".to_vec();
    payload.extend(xmp_packet_for(Some(clip.len() as u64)));
    let segment_len = (payload.len() + 2) as u16;

    let mut out = Vec::with_capacity(primary_jpeg.len() + payload.len() + clip.len() + 4);
    out.extend_from_slice(&primary_jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend(payload);
    out.extend_from_slice(&primary_jpeg[2..]);
    out.extend_from_slice(clip);
    out
}

/// Grayscale frame: flat (`checker == 0`) or a checkerboard with the given cell size.
pub fn frame(size: u32, checker: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(image::GrayImage::from_fn(size, size, |x, y| {
        if checker == 0 || ((x / checker) + (y / checker)) % 2 == 0 {
            Luma([40])
        } else {
            Luma([220])
        }
    }))
}

/// Decoder returning scripted clip frames, counting how often it is asked.
pub struct FakeDecoder {
    frames: Vec<DynamicImage>,
    fail_decode: bool,
    count_calls: AtomicUsize,
    decode_calls: AtomicUsize,
}

impl FakeDecoder {
    pub fn new(frames: Vec<DynamicImage>) -> Self {
        FakeDecoder {
            frames,
            fail_decode: false,
            count_calls: AtomicUsize::new(0),
            decode_calls: AtomicUsize::new(0),
        }
    }

    /// Probes succeed with `frames` clip frames but every decode fails.
    pub fn failing(frames: usize) -> Self {
        FakeDecoder {
            fail_decode: true,
            ..FakeDecoder::new(vec![frame(4, 0); frames])
        }
    }

    pub fn decode_calls(&self) -> usize {
        self.decode_calls.load(Ordering::SeqCst)
    }

    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }
}

impl MotionDecoder for FakeDecoder {
    fn count_clip_frames(&self, _clip: &MotionClip) -> Result<usize> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.frames.len())
    }

    fn decode_clip_frames(&self, clip: &MotionClip) -> Result<Vec<DynamicImage>> {
        self.decode_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_decode {
            return Err(PhotocullError::decode(&clip.source, "scripted failure"));
        }
        Ok(self.frames.clone())
    }
}
