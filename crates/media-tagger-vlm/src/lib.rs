//! # Media tagger vision-language models
//!
//! Image captioning with the BLIP model family on top of candle.
//!
//! The [`Captioner`] trait is the seam the processing pipeline depends on; the
//! [`blip::BlipCaptioner`] implementation downloads a pretrained checkpoint from
//! the Hugging Face hub and decodes captions with deterministic beam search.

/// Beam search decoding with repetition controls.
pub mod beam;

/// BLIP captioning model integration.
pub mod blip;

/// Compute device selection.
pub mod device;

/// Error types for model loading and inference.
pub mod error;

/// Image to tensor preprocessing for the BLIP vision encoder.
pub mod preprocess;

pub use error::CaptionError;

use image::RgbImage;

/// Caption returned in place of a real caption when inference fails.
pub const CAPTION_FAILED: &str = "Caption generation failed";

/// Something that can describe an image with a short text.
///
/// Implementations must not fail: inference errors are reported through the
/// returned text (see [`CAPTION_FAILED`]) so a batch keeps going.
pub trait Captioner {
    /// Generate a caption for an RGB image.
    fn caption(&mut self, image: &RgbImage) -> String;
}

impl<C: Captioner + ?Sized> Captioner for Box<C> {
    fn caption(&mut self, image: &RgbImage) -> String {
        (**self).caption(image)
    }
}
