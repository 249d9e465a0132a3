//! Random access frame readers for video files.
//!
//! GIF animations are decoded in process with the image crate. Other containers
//! go through a GStreamer pipeline, which requires the `gstreamer` feature.

mod gif;

/// GStreamer backed frame reader (feature-gated).
#[cfg(feature = "gstreamer")]
pub mod gstreamer;

use std::path::Path;

use image::RgbImage;

use crate::{error::MediaError, media::dotted_extension};

pub use gif::GifFrames;

/// A video that can report its length and decode individual frames.
pub trait FrameSource {
    /// Total number of frames in the video.
    fn frame_count(&self) -> usize;

    /// Decode the frame at `index` as RGB8.
    ///
    /// Returns `Ok(None)` when the container reports the frame but it cannot be
    /// decoded, so callers can skip it.
    fn read_frame(&mut self, index: usize) -> Result<Option<RgbImage>, MediaError>;
}

/// Compute which frames to sample from a video with `total_frames` frames.
///
/// When the video is short enough every frame is returned, otherwise `max_frames`
/// evenly spaced indices starting at zero.
pub fn sample_frame_indices(total_frames: usize, max_frames: usize) -> Vec<usize> {
    if total_frames <= max_frames {
        return (0..total_frames).collect();
    }
    let step = total_frames / max_frames;
    (0..max_frames).map(|i| i * step).collect()
}

/// Open a video file and pick the reader that matches its container.
pub fn open_video(path: impl AsRef<Path>) -> Result<Box<dyn FrameSource>, MediaError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MediaError::FileDoesNotExist(path.to_path_buf()));
    }

    let ext = dotted_extension(path);
    if ext == ".gif" {
        return Ok(Box::new(GifFrames::open(path)?));
    }

    open_container(path, ext)
}

#[cfg(feature = "gstreamer")]
fn open_container(path: &Path, _ext: String) -> Result<Box<dyn FrameSource>, MediaError> {
    Ok(Box::new(gstreamer::GstFrameReader::open(path)?))
}

#[cfg(not(feature = "gstreamer"))]
fn open_container(path: &Path, ext: String) -> Result<Box<dyn FrameSource>, MediaError> {
    log::debug!("no video decoder compiled in for {}", path.display());
    Err(MediaError::DecoderNotAvailable(ext))
}

/// Sample up to `max_frames` frames from a source, skipping undecodable ones.
pub fn extract_frames(
    source: &mut dyn FrameSource,
    max_frames: usize,
) -> Result<Vec<RgbImage>, MediaError> {
    let total_frames = source.frame_count();
    let indices = sample_frame_indices(total_frames, max_frames);
    log::debug!("sampling frames {indices:?} out of {total_frames}");

    let mut frames = Vec::with_capacity(indices.len());
    for index in indices {
        match source.read_frame(index)? {
            Some(frame) => frames.push(frame),
            None => log::debug!("frame {index} could not be decoded, skipping"),
        }
    }
    Ok(frames)
}
