use std::path::Path;

use media_tagger_io::{
    functional::read_image_rgb8,
    video::{extract_frames, open_video, FrameSource},
    MediaError,
};
use media_tagger_vlm::Captioner;

/// Caption returned for a video without any decodable frame.
pub const NO_FRAMES_CAPTION: &str = "No frames extracted from video";

/// Separator between per-frame captions of a video.
pub const FRAME_SEPARATOR: &str = " | ";

/// Captions still images.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageProcessor;

impl ImageProcessor {
    /// Decode an image as RGB and caption it.
    pub fn process(
        &self,
        path: impl AsRef<Path>,
        captioner: &mut dyn Captioner,
    ) -> Result<String, MediaError> {
        let image = read_image_rgb8(path)?;
        Ok(captioner.caption(&image))
    }
}

/// Captions videos by sampling frames uniformly.
#[derive(Debug, Clone, Copy)]
pub struct VideoProcessor {
    max_frames: usize,
}

impl Default for VideoProcessor {
    fn default() -> Self {
        Self::new(5)
    }
}

impl VideoProcessor {
    /// Create a processor that captions at most `max_frames` frames per video.
    pub fn new(max_frames: usize) -> Self {
        Self {
            max_frames: max_frames.max(1),
        }
    }

    /// The maximum number of frames captioned per video.
    #[inline]
    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Open a video and caption its sampled frames.
    pub fn process(
        &self,
        path: impl AsRef<Path>,
        captioner: &mut dyn Captioner,
    ) -> Result<String, MediaError> {
        let mut source = open_video(path)?;
        self.caption_frames(source.as_mut(), captioner)
    }

    /// Caption the sampled frames of an opened source and join the captions.
    pub fn caption_frames(
        &self,
        source: &mut dyn FrameSource,
        captioner: &mut dyn Captioner,
    ) -> Result<String, MediaError> {
        let frames = extract_frames(source, self.max_frames)?;
        if frames.is_empty() {
            return Ok(NO_FRAMES_CAPTION.to_string());
        }

        let captions = frames
            .iter()
            .enumerate()
            .map(|(i, frame)| {
                let caption = captioner.caption(frame);
                log::debug!("frame {}/{}: {caption}", i + 1, frames.len());
                caption
            })
            .collect::<Vec<_>>();

        Ok(captions.join(FRAME_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// Describes an image by its size and first red value.
    struct PixelCaptioner;

    impl Captioner for PixelCaptioner {
        fn caption(&mut self, image: &RgbImage) -> String {
            format!("red {}", image.get_pixel(0, 0)[0])
        }
    }

    struct FakeVideo {
        total: usize,
    }

    impl FrameSource for FakeVideo {
        fn frame_count(&self) -> usize {
            self.total
        }

        fn read_frame(&mut self, index: usize) -> Result<Option<RgbImage>, MediaError> {
            Ok(Some(RgbImage::from_pixel(4, 4, Rgb([index as u8, 0, 0]))))
        }
    }

    #[test]
    fn image_is_captioned() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("red.png");
        RgbImage::from_pixel(8, 8, Rgb([200, 10, 10])).save(&path)?;

        let caption = ImageProcessor.process(&path, &mut PixelCaptioner)?;
        assert_eq!(caption, "red 200");
        Ok(())
    }

    #[test]
    fn corrupt_image_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("broken.jpg");
        std::fs::write(&path, b"not really a jpeg")?;

        assert!(ImageProcessor.process(&path, &mut PixelCaptioner).is_err());
        Ok(())
    }

    #[test]
    fn video_frames_are_joined() -> Result<(), MediaError> {
        let processor = VideoProcessor::new(5);
        let caption = processor.caption_frames(&mut FakeVideo { total: 100 }, &mut PixelCaptioner)?;
        assert_eq!(caption, "red 0 | red 20 | red 40 | red 60 | red 80");

        let caption = processor.caption_frames(&mut FakeVideo { total: 2 }, &mut PixelCaptioner)?;
        assert_eq!(caption, "red 0 | red 1");
        Ok(())
    }

    #[test]
    fn empty_video() -> Result<(), MediaError> {
        let caption =
            VideoProcessor::default().caption_frames(&mut FakeVideo { total: 0 }, &mut PixelCaptioner)?;
        assert_eq!(caption, NO_FRAMES_CAPTION);
        Ok(())
    }

    #[test]
    fn missing_video_is_an_error() {
        let res = VideoProcessor::default().process("/no/such/clip.mp4", &mut PixelCaptioner);
        assert!(matches!(res, Err(MediaError::FileDoesNotExist(_))));
    }
}
