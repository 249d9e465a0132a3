/// An error type for the media io module.
#[derive(thiserror::Error, Debug)]
pub enum MediaError {
    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(std::path::PathBuf),

    /// The file extension is not one of the supported media types.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Error to open or read the file.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// Error to decode the image.
    #[error("Failed to decode the image. {0}")]
    ImageDecodeError(#[from] image::ImageError),

    /// The video container could not be opened.
    #[error("Could not open video file: {0}")]
    VideoOpenError(std::path::PathBuf),

    /// The video container needs a decoder that was not compiled in.
    #[error("Decoding {0} requires the `gstreamer` feature")]
    DecoderNotAvailable(String),

    /// The requested frame is outside the video.
    #[error("Frame index {index} out of range, the video has {total} frames")]
    FrameOutOfRange {
        /// The requested frame index.
        index: usize,
        /// The number of frames in the video.
        total: usize,
    },

    /// An error reported by the GStreamer pipeline.
    #[cfg(feature = "gstreamer")]
    #[error(transparent)]
    Stream(#[from] crate::video::gstreamer::StreamError),
}
