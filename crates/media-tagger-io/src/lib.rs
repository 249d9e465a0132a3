#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for media operations.
///
/// Defines [`error::MediaError`] variants for file access, decoding failures and
/// unsupported containers.
pub mod error;

/// Image decoding helpers.
///
/// See [`functional::read_image_rgb8`] for reading any supported image as RGB8.
pub mod functional;

/// Media classification by file extension.
pub mod media;

/// Video frame access and uniform frame sampling.
///
/// GIF is always available. Other containers need the `gstreamer` feature and
/// the system GStreamer libraries.
pub mod video;

pub use error::MediaError;
pub use media::{MediaFile, MediaKind};
