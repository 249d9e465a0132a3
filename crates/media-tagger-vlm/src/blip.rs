use candle_core::{DType, Device, Tensor, D};
use candle_nn::VarBuilder;
use candle_transformers::models::blip;
use hf_hub::{api::sync::Api, Repo, RepoType};
use image::RgbImage;
use tokenizers::Tokenizer;

use crate::{
    beam::{beam_search, BeamSearchConfig},
    device::select_device,
    error::CaptionError,
    preprocess::preprocess_image,
    Captioner, CAPTION_FAILED,
};

// BERT `[DEC]` start token and `[SEP]` end token of the BLIP text decoder
const BOS_TOKEN_ID: u32 = 30522;
const SEP_TOKEN_ID: u32 = 102;

/// The pretrained BLIP captioning checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlipVariant {
    /// `Salesforce/blip-image-captioning-base`, ViT-B vision encoder.
    #[default]
    Base,
    /// `Salesforce/blip-image-captioning-large`, ViT-L vision encoder.
    Large,
}

impl BlipVariant {
    /// The hub repository holding the checkpoint.
    pub fn model_id(&self) -> &'static str {
        match self {
            BlipVariant::Base => "Salesforce/blip-image-captioning-base",
            BlipVariant::Large => "Salesforce/blip-image-captioning-large",
        }
    }

    /// The hub revision with the safetensors weights.
    pub fn default_revision(&self) -> &'static str {
        match self {
            BlipVariant::Base => "main",
            BlipVariant::Large => "refs/pr/18",
        }
    }

    /// The model architecture for this checkpoint.
    pub fn config(&self) -> blip::Config {
        let mut config = blip::Config::image_captioning_large();
        if let BlipVariant::Base = self {
            config.vision_config.hidden_size = 768;
            config.vision_config.intermediate_size = 3072;
            config.vision_config.num_hidden_layers = 12;
            config.vision_config.num_attention_heads = 12;
            config.text_config.encoder_hidden_size = 768;
        }
        config
    }
}

impl std::str::FromStr for BlipVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base" => Ok(BlipVariant::Base),
            "large" => Ok(BlipVariant::Large),
            other => Err(format!("unknown model variant `{other}`, expected base or large")),
        }
    }
}

/// Configuration for the BLIP captioner.
#[derive(Debug, Clone)]
pub struct BlipConfig {
    /// Which checkpoint to load.
    pub variant: BlipVariant,
    /// Hub revision override, defaults to the variant's revision.
    pub revision: Option<String>,
    /// Decoding parameters.
    pub generation: BeamSearchConfig,
    /// Load the weights in half precision on accelerators.
    pub half_precision: bool,
}

impl Default for BlipConfig {
    fn default() -> Self {
        Self {
            variant: BlipVariant::Base,
            revision: None,
            generation: BeamSearchConfig::default(),
            half_precision: false,
        }
    }
}

/// The BLIP image captioning model.
///
/// NOTE: to run the model with Cuda or Metal, build with `--features cuda` or `--features metal`.
pub struct BlipCaptioner {
    model: blip::BlipForConditionalGeneration,
    tokenizer: Tokenizer,
    device: Device,
    dtype: DType,
    generation: BeamSearchConfig,
}

impl BlipCaptioner {
    /// Download (or reuse the cached) checkpoint and build the model.
    pub fn new(config: BlipConfig) -> Result<Self, CaptionError> {
        let (device, dtype) = select_device(config.half_precision);

        log::info!("Loading BLIP model {}...", config.variant.model_id());
        let (model, tokenizer) = Self::load_model(&config, dtype, &device)?;
        log::info!("Model loaded on {device:?}");

        Ok(Self {
            model,
            tokenizer,
            device,
            dtype,
            generation: config.generation,
        })
    }

    /// Generate a caption, propagating any failure.
    ///
    /// The trait method [`Captioner::caption`] wraps this and turns errors into
    /// the sentinel caption.
    pub fn try_caption(&mut self, image: &RgbImage) -> Result<String, CaptionError> {
        let pixel_values = preprocess_image(image, &self.device)?
            .to_dtype(self.dtype)?
            .unsqueeze(0)?;
        let image_embeds = pixel_values.apply(self.model.vision_model())?;

        let device = &self.device;
        let model = &mut self.model;
        let tokens = beam_search(&self.generation, BOS_TOKEN_ID, SEP_TOKEN_ID, |tokens| {
            // beams diverge, so every step runs the decoder on the whole sequence
            model.reset_kv_cache();
            let input_ids = Tensor::new(tokens, device)?.unsqueeze(0)?;
            let logits = model.text_decoder().forward(&input_ids, &image_embeds)?;
            let logits = logits.squeeze(0)?;
            let logits = logits.get(logits.dim(0)? - 1)?.to_dtype(DType::F32)?;
            let log_probs = candle_nn::ops::log_softmax(&logits, D::Minus1)?;
            Ok::<_, CaptionError>(log_probs.to_vec1::<f32>()?)
        });
        self.model.reset_kv_cache();

        let tokens = tokens?.ok_or(CaptionError::NoHypothesis)?;
        let caption = self.tokenizer.decode(&tokens, true)?;
        Ok(caption.trim().to_string())
    }

    // utility function to load the model
    fn load_model(
        config: &BlipConfig,
        dtype: DType,
        device: &Device,
    ) -> Result<(blip::BlipForConditionalGeneration, Tokenizer), CaptionError> {
        let api = Api::new()?;
        let revision = config
            .revision
            .clone()
            .unwrap_or_else(|| config.variant.default_revision().to_string());
        let repo = api.repo(Repo::with_revision(
            config.variant.model_id().to_string(),
            RepoType::Model,
            revision,
        ));

        let tokenizer_filename = repo.get("tokenizer.json")?;
        let weights_filename = repo.get("model.safetensors")?;

        let tokenizer = Tokenizer::from_file(tokenizer_filename)?;

        let model_config = config.variant.config();
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_filename], dtype, device)? };
        let model = blip::BlipForConditionalGeneration::new(&model_config, vb)?;

        Ok((model, tokenizer))
    }
}

impl Captioner for BlipCaptioner {
    fn caption(&mut self, image: &RgbImage) -> String {
        match self.try_caption(image) {
            Ok(caption) => caption,
            Err(e) => {
                log::error!("Caption generation failed: {e}");
                CAPTION_FAILED.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_from_str() {
        assert_eq!("base".parse::<BlipVariant>(), Ok(BlipVariant::Base));
        assert_eq!("large".parse::<BlipVariant>(), Ok(BlipVariant::Large));
        assert!("huge".parse::<BlipVariant>().is_err());
    }

    #[test]
    fn base_config_uses_vit_base() {
        let config = BlipVariant::Base.config();
        assert_eq!(config.vision_config.hidden_size, 768);
        assert_eq!(config.text_config.encoder_hidden_size, 768);

        let config = BlipVariant::Large.config();
        assert_eq!(config.vision_config.hidden_size, 1024);
    }

    // cargo test -p media-tagger-vlm caption_generated_image -- --ignored --nocapture
    #[test]
    #[ignore = "Downloads the BLIP weights from the hub"]
    fn caption_generated_image() -> Result<(), Box<dyn std::error::Error>> {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut captioner = BlipCaptioner::new(BlipConfig::default())?;
        let image = RgbImage::from_fn(320, 240, |x, _| {
            if x < 160 {
                image::Rgb([220, 30, 30])
            } else {
                image::Rgb([30, 30, 220])
            }
        });

        let caption = captioner.try_caption(&image)?;
        println!("caption: {caption}");
        assert!(!caption.is_empty());
        Ok(())
    }
}
