use std::path::{Path, PathBuf};

use crate::error::MediaError;

/// Image extensions accepted by the tagger, lowercase and without the dot.
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "tiff", "webp"];

/// Video extensions accepted by the tagger, lowercase and without the dot.
pub const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "avi", "mov", "mkv", "gif", "webm"];

/// The kind of media a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// A still image.
    Image,
    /// A video or an animated image.
    Video,
}

impl MediaKind {
    /// Classify a path by its extension, ignoring case.
    ///
    /// Returns `None` when the extension is missing or not supported.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = lowercase_extension(path.as_ref())?;
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

/// A path with a recognized media extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    path: PathBuf,
    kind: MediaKind,
}

impl MediaFile {
    /// Create a media file from a path, failing when the extension is not supported.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, MediaError> {
        let path = path.into();
        match MediaKind::from_path(&path) {
            Some(kind) => Ok(Self { path, kind }),
            None => Err(MediaError::UnsupportedFileType(dotted_extension(&path))),
        }
    }

    /// The full path of the file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file is an image or a video.
    #[inline]
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// The final path component, used as the ledger key.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The lowercase extension including the leading dot, e.g. `.jpg`.
    pub fn extension(&self) -> String {
        dotted_extension(&self.path)
    }
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// The lowercase extension of a path with its leading dot, or an empty string.
pub fn dotted_extension(path: impl AsRef<Path>) -> String {
    lowercase_extension(path.as_ref())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}
