use std::path::Path;

use image::{ImageReader, RgbImage};

use crate::error::MediaError;

/// Reads an image from the given file path and converts it to 8-bit RGB.
///
/// The format is guessed from the file content, so any format supported by the
/// image crate can be read. Grayscale, alpha and high bit depth images are
/// normalized to RGB8.
///
/// # Arguments
///
/// * `file_path` - The path to a valid image file.
///
/// # Returns
///
/// An RGB8 image containing the decoded pixels.
pub fn read_image_rgb8(file_path: impl AsRef<Path>) -> Result<RgbImage, MediaError> {
    let file_path = file_path.as_ref();

    if !file_path.exists() {
        return Err(MediaError::FileDoesNotExist(file_path.to_path_buf()));
    }

    // open the file and map it to memory
    let file = std::fs::File::open(file_path)?;
    let mmap = unsafe { memmap2::Mmap::map(&file)? };

    let img = ImageReader::new(std::io::Cursor::new(&mmap))
        .with_guessed_format()?
        .decode()?;

    Ok(img.into_rgb8())
}

/// Reads the width and height of an image without decoding the pixels.
pub fn read_image_dimensions(file_path: impl AsRef<Path>) -> Result<(u32, u32), MediaError> {
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(MediaError::FileDoesNotExist(file_path.to_path_buf()));
    }
    Ok(image::image_dimensions(file_path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayAlphaImage, LumaA};

    #[test]
    fn read_rgb8_from_png() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("gradient.png");

        let img = RgbImage::from_fn(6, 4, |x, y| image::Rgb([x as u8, y as u8, 7]));
        img.save(&file_path)?;

        let decoded = read_image_rgb8(&file_path)?;
        assert_eq!(decoded.dimensions(), (6, 4));
        assert_eq!(decoded.get_pixel(5, 3).0, [5, 3, 7]);
        Ok(())
    }

    #[test]
    fn read_rgb8_converts_gray_alpha() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("gray.png");

        GrayAlphaImage::from_pixel(3, 2, LumaA([200, 128])).save(&file_path)?;

        let decoded = read_image_rgb8(&file_path)?;
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(0, 0).0, [200, 200, 200]);
        Ok(())
    }

    #[test]
    fn read_missing_file() {
        let res = read_image_rgb8("/definitely/not/here.png");
        assert!(matches!(res, Err(MediaError::FileDoesNotExist(_))));
    }

    #[test]
    fn read_corrupt_file() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("broken.jpg");
        std::fs::write(&file_path, b"this is not a jpeg")?;

        assert!(read_image_rgb8(&file_path).is_err());
        Ok(())
    }

    #[test]
    fn dimensions_from_header() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("wide.png");
        RgbImage::new(640, 2).save(&file_path)?;

        assert_eq!(read_image_dimensions(&file_path)?, (640, 2));
        Ok(())
    }
}
