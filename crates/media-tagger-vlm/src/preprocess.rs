use candle_core::{DType, Device, Tensor};
use image::{imageops::FilterType, RgbImage};

use crate::error::CaptionError;

/// Input resolution of the BLIP vision encoder.
pub const IMAGE_SIZE: u32 = 384;

// CLIP mean and std used by the BLIP image processor
const MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];
const STD: [f32; 3] = [0.26862954, 0.26130258, 0.27577711];

/// Resize and normalize an RGB image into a `[3, 384, 384]` f32 tensor.
pub fn preprocess_image(image: &RgbImage, device: &Device) -> Result<Tensor, CaptionError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(CaptionError::EmptyImage(width, height));
    }

    let resized = image::imageops::resize(image, IMAGE_SIZE, IMAGE_SIZE, FilterType::CatmullRom);
    let size = IMAGE_SIZE as usize;

    let mean = Tensor::from_slice(&MEAN, (3, 1, 1), device)?;
    let std = Tensor::from_slice(&STD, (3, 1, 1), device)?;

    let tensor = Tensor::from_vec(resized.into_raw(), (size, size, 3), device)?
        .permute((2, 0, 1))?
        .to_dtype(DType::F32)?
        .affine(1. / 255., 0.)?
        .broadcast_sub(&mean)?
        .broadcast_div(&std)?;

    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preprocess_shape_and_range() -> Result<(), CaptionError> {
        let image = RgbImage::from_pixel(20, 10, image::Rgb([255, 0, 128]));
        let tensor = preprocess_image(&image, &Device::Cpu)?;
        assert_eq!(tensor.dims(), &[3, 384, 384]);

        let red = tensor.get(0)?.flatten_all()?.to_vec1::<f32>()?;
        let expected = (1.0 - MEAN[0]) / STD[0];
        assert!(red.iter().all(|v| (v - expected).abs() < 1e-4));

        let green = tensor.get(1)?.flatten_all()?.to_vec1::<f32>()?;
        let expected = -MEAN[1] / STD[1];
        assert!(green.iter().all(|v| (v - expected).abs() < 1e-4));
        Ok(())
    }

    #[test]
    fn preprocess_rejects_empty() {
        let image = RgbImage::new(0, 4);
        assert!(matches!(
            preprocess_image(&image, &Device::Cpu),
            Err(CaptionError::EmptyImage(0, 4))
        ));
    }
}
