use media_tagger_io::{functional::read_image_dimensions, MediaFile, MediaKind};

/// Caption written in place of a real one when a file could not be processed.
pub const ERROR_CAPTION: &str = "ERROR";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Extra file information stored by the detailed ledger format.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDetails {
    /// File size in kilobytes, rounded to one decimal; `None` when unknown.
    pub size_kb: Option<f64>,
    /// `WxH` for images, `N/A` for videos, `unknown` when it cannot be read.
    pub dimensions: String,
    /// Lowercase extension with its leading dot.
    pub file_type: String,
    /// Local time the file was processed.
    pub date_processed: String,
}

impl FileDetails {
    /// Gather the size, dimensions and type of a media file.
    pub fn gather(file: &MediaFile) -> Self {
        let metadata = match std::fs::metadata(file.path()) {
            Ok(metadata) => metadata,
            Err(e) => {
                log::debug!("cannot stat {}: {e}", file.path().display());
                return Self::placeholder(file);
            }
        };

        let dimensions = match file.kind() {
            MediaKind::Image => match read_image_dimensions(file.path()) {
                Ok((width, height)) => format!("{width}x{height}"),
                Err(_) => "unknown".to_string(),
            },
            MediaKind::Video => "N/A".to_string(),
        };

        Self {
            size_kb: Some((metadata.len() as f64 / 1024.0 * 10.0).round() / 10.0),
            dimensions,
            file_type: file.extension(),
            date_processed: now(),
        }
    }

    /// Details recorded for a file that failed to process.
    pub fn placeholder(file: &MediaFile) -> Self {
        Self {
            size_kb: None,
            dimensions: "unknown".to_string(),
            file_type: file.extension(),
            date_processed: now(),
        }
    }
}

fn now() -> String {
    chrono::Local::now().format(DATE_FORMAT).to_string()
}

/// One ledger row: a file name, its caption and optionally its details.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionResult {
    /// File name without directories, used as the resume key.
    pub filename: String,
    /// Generated caption or a placeholder.
    pub caption: String,
    /// Present when the detailed format is selected.
    pub details: Option<FileDetails>,
}

impl CaptionResult {
    /// The CSV fields of this row.
    pub fn to_record(&self) -> Vec<String> {
        let mut record = vec![self.filename.clone(), self.caption.clone()];
        if let Some(details) = &self.details {
            record.extend([
                details
                    .size_kb
                    .map_or_else(|| "0".to_string(), |kb| format!("{kb:.1}")),
                details.dimensions.clone(),
                details.file_type.clone(),
                details.date_processed.clone(),
            ]);
        }
        record
    }
}
