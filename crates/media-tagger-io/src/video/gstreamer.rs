use std::path::Path;

use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use image::RgbImage;

use super::FrameSource;
use crate::error::MediaError;

/// How long to wait for the pipeline to preroll after opening or seeking.
const PREROLL_TIMEOUT_SECS: u64 = 5;

/// An error type for the GStreamer frame reader.
#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    /// An error occurred during GStreamer initialization or pipeline parsing.
    #[error(transparent)]
    GStreamerError(#[from] gstreamer::glib::Error),

    /// An error occurred during GStreamer downcast of pipeline element.
    #[error("Failed to downcast pipeline")]
    DowncastPipelineError(gstreamer::Element),

    /// The appsink could not be found in the pipeline.
    #[error("Failed to get an element by name")]
    GetElementByNameError,

    /// An error occurred during GStreamer to set the pipeline state.
    #[error(transparent)]
    SetPipelineStateError(#[from] gstreamer::StateChangeError),

    /// An error occurred mapping a buffer or parsing the caps.
    #[error(transparent)]
    BoolError(#[from] gstreamer::glib::BoolError),

    /// The sample did not carry caps.
    #[error("Failed caps: {0}")]
    GetCapsError(String),

    /// An error occurred during GStreamer to get the buffer from the sample.
    #[error("Failed to get the buffer from the sample")]
    GetBufferError,

    /// The buffer could not be turned into an image.
    #[error("Failed to create an image frame")]
    CreateImageFrameError,

    /// The pipeline refused the seek.
    #[error("Failed to seek to frame {0}")]
    SeekError(usize),
}

/// Reads individual frames of a video file through a paused GStreamer pipeline.
///
/// Every read is an accurate flushing seek followed by a preroll pull, so frames
/// can be requested in any order.
pub struct GstFrameReader {
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
    fps: gstreamer::Fraction,
    frame_count: usize,
}

impl GstFrameReader {
    /// Open the video at `path` and read its frame rate and duration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MediaError> {
        let path = path.as_ref();

        // make sure that we do not initialize gstreamer several times
        if !gstreamer::INITIALIZED.load(std::sync::atomic::Ordering::Relaxed) {
            gstreamer::init().map_err(StreamError::from)?;
        }

        let pipeline_desc = format!(
            "filesrc location=\"{}\" ! \
            decodebin ! \
            videoconvert ! \
            video/x-raw,format=RGB ! \
            appsink name=sink sync=false",
            path.to_string_lossy()
        );

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(StreamError::from)?
            .dynamic_cast::<gstreamer::Pipeline>()
            .map_err(StreamError::DowncastPipelineError)?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or(StreamError::GetElementByNameError)?
            .dynamic_cast::<AppSink>()
            .map_err(StreamError::DowncastPipelineError)?;

        pipeline
            .set_state(gstreamer::State::Paused)
            .map_err(StreamError::from)?;

        let timeout = gstreamer::ClockTime::from_seconds(PREROLL_TIMEOUT_SECS);
        let (res, _, _) = pipeline.state(timeout);
        let preroll = match res {
            Ok(_) => appsink.try_pull_preroll(timeout),
            Err(_) => None,
        };
        let Some(sample) = preroll else {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(MediaError::VideoOpenError(path.to_path_buf()));
        };

        let caps = sample
            .caps()
            .ok_or_else(|| StreamError::GetCapsError("no caps in preroll sample".into()))?;
        let info = gstreamer_video::VideoInfo::from_caps(caps).map_err(StreamError::from)?;
        let fps = info.fps();

        let frame_count = pipeline
            .query_duration::<gstreamer::ClockTime>()
            .map(|duration| frames_in_duration(duration.nseconds(), fps))
            .unwrap_or(0);

        log::debug!(
            "opened {} ({}x{}, {}/{} fps, {} frames)",
            path.display(),
            info.width(),
            info.height(),
            fps.numer(),
            fps.denom(),
            frame_count
        );

        Ok(Self {
            pipeline,
            appsink,
            fps,
            frame_count,
        })
    }

    fn frame_position(&self, index: usize) -> gstreamer::ClockTime {
        let numer = self.fps.numer().max(1) as u128;
        let denom = self.fps.denom().max(1) as u128;
        let nanos = index as u128 * 1_000_000_000 * denom / numer;
        gstreamer::ClockTime::from_nseconds(nanos as u64)
    }
}

impl FrameSource for GstFrameReader {
    fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn read_frame(&mut self, index: usize) -> Result<Option<RgbImage>, MediaError> {
        if index >= self.frame_count {
            return Err(MediaError::FrameOutOfRange {
                index,
                total: self.frame_count,
            });
        }

        self.pipeline
            .seek_simple(
                gstreamer::SeekFlags::FLUSH | gstreamer::SeekFlags::ACCURATE,
                self.frame_position(index),
            )
            .map_err(|_| StreamError::SeekError(index))?;

        let timeout = gstreamer::ClockTime::from_seconds(PREROLL_TIMEOUT_SECS);
        let (res, _, _) = self.pipeline.state(timeout);
        if res.is_err() {
            return Ok(None);
        }

        match self.appsink.try_pull_preroll(timeout) {
            Some(sample) => Ok(Some(sample_to_rgb8(&sample)?)),
            None => Ok(None),
        }
    }
}

impl Drop for GstFrameReader {
    fn drop(&mut self) {
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            log::warn!("failed to stop video pipeline: {e}");
        }
    }
}

fn frames_in_duration(duration_ns: u64, fps: gstreamer::Fraction) -> usize {
    if fps.numer() <= 0 || fps.denom() <= 0 {
        return 0;
    }
    let frames =
        duration_ns as u128 * fps.numer() as u128 / (fps.denom() as u128 * 1_000_000_000);
    frames as usize
}

/// Copy an RGB sample into a tightly packed image, dropping the row padding.
fn sample_to_rgb8(sample: &gstreamer::Sample) -> Result<RgbImage, StreamError> {
    let caps = sample
        .caps()
        .ok_or_else(|| StreamError::GetCapsError("no caps in sample".into()))?;
    let info = gstreamer_video::VideoInfo::from_caps(caps)?;

    let buffer = sample
        .buffer()
        .ok_or(StreamError::GetBufferError)?
        .map_readable()?;
    let data = buffer.as_slice();

    let width = info.width() as usize;
    let height = info.height() as usize;
    let stride = info.stride()[0] as usize;
    let row_bytes = width * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height);
    for row in 0..height {
        let start = row * stride;
        let line = data
            .get(start..start + row_bytes)
            .ok_or(StreamError::CreateImageFrameError)?;
        pixels.extend_from_slice(line);
    }

    RgbImage::from_raw(info.width(), info.height(), pixels)
        .ok_or(StreamError::CreateImageFrameError)
}
