/// An error type for loading and running the caption model.
#[derive(thiserror::Error, Debug)]
pub enum CaptionError {
    /// The model files could not be fetched from the hub.
    #[error(transparent)]
    FailedToLoadModel(#[from] hf_hub::api::sync::ApiError),

    /// A tensor operation failed.
    #[error(transparent)]
    CandleError(#[from] candle_core::Error),

    /// The tokenizer failed to load or decode.
    #[error(transparent)]
    TokenizerError(#[from] tokenizers::Error),

    /// The input image has a zero dimension.
    #[error("Cannot caption an empty image ({0}x{1})")]
    EmptyImage(u32, u32),

    /// Beam search ended without any hypothesis.
    #[error("Beam search produced no hypothesis")]
    NoHypothesis,
}
