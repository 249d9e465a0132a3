use std::{fs::File, io::BufReader, path::Path};

use image::{codecs::gif::GifDecoder, AnimationDecoder, DynamicImage, RgbImage, RgbaImage};

use super::FrameSource;
use crate::error::MediaError;

/// An animated GIF decoded fully into memory.
pub struct GifFrames {
    frames: Vec<RgbaImage>,
}

impl GifFrames {
    /// Decode every frame of the GIF at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MediaError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            log::debug!("failed to open {}: {e}", path.display());
            MediaError::VideoOpenError(path.to_path_buf())
        })?;

        let decoder = GifDecoder::new(BufReader::new(file))?;
        let frames = decoder
            .into_frames()
            .collect_frames()?
            .into_iter()
            .map(|frame| frame.into_buffer())
            .collect::<Vec<_>>();

        log::debug!("decoded {} gif frames from {}", frames.len(), path.display());

        Ok(Self { frames })
    }
}

impl FrameSource for GifFrames {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn read_frame(&mut self, index: usize) -> Result<Option<RgbImage>, MediaError> {
        let frame = self.frames.get(index).ok_or(MediaError::FrameOutOfRange {
            index,
            total: self.frames.len(),
        })?;
        Ok(Some(DynamicImage::ImageRgba8(frame.clone()).into_rgb8()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{codecs::gif::GifEncoder, Frame, Rgba};

    fn write_gif(path: &Path, num_frames: u8) -> Result<(), Box<dyn std::error::Error>> {
        let file = File::create(path)?;
        let mut encoder = GifEncoder::new(file);
        let frames = (0..num_frames)
            .map(|i| Frame::new(RgbaImage::from_pixel(4, 4, Rgba([i * 40, 0, 0, 255]))));
        encoder.encode_frames(frames)?;
        Ok(())
    }

    #[test]
    fn gif_frame_count_and_access() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("blink.gif");
        write_gif(&file_path, 3)?;

        let mut gif = GifFrames::open(&file_path)?;
        assert_eq!(gif.frame_count(), 3);

        let frame = gif.read_frame(2)?.ok_or("missing frame")?;
        assert_eq!(frame.dimensions(), (4, 4));

        assert!(matches!(
            gif.read_frame(3),
            Err(MediaError::FrameOutOfRange { index: 3, total: 3 })
        ));
        Ok(())
    }

    #[test]
    fn gif_corrupt_data() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("broken.gif");
        std::fs::write(&file_path, b"GIF89a garbage")?;

        assert!(GifFrames::open(&file_path).is_err());
        Ok(())
    }
}
