#![deny(missing_docs)]
//! # Media tagger
//!
//! Caption folders of images and videos with a vision-language model and keep
//! the results in a CSV ledger that can be resumed after an interruption.
//!
//! The [`tagger::Tagger`] drives a run: it discovers the supported files,
//! skips the ones already in the ledger, captions the rest one at a time and
//! records a row per file. Any [`media_tagger_vlm::Captioner`] can be plugged
//! in.

/// Run configuration and ledger formats.
pub mod config;

/// Supported file discovery.
pub mod discovery;

/// Error types for a tagging run.
pub mod error;

/// The CSV ledger.
pub mod ledger;

/// Image and video captioning.
pub mod processors;

/// Ledger rows and file details.
pub mod record;

/// The batch orchestrator.
pub mod tagger;

pub use config::{OutputFormat, TaggerConfig};
pub use error::TaggerError;
pub use tagger::{RunSummary, Tagger};
