use std::fmt;

/// Columns of the basic ledger format.
pub const BASIC_HEADER: [&str; 2] = ["filename", "caption"];

/// Columns of the detailed ledger format.
pub const DETAILED_HEADER: [&str; 6] = [
    "filename",
    "caption",
    "size_kb",
    "dimensions",
    "file_type",
    "date_processed",
];

/// The column layout of the output ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `filename,caption`
    Basic,
    /// `filename,caption,size_kb,dimensions,file_type,date_processed`
    #[default]
    Detailed,
}

impl OutputFormat {
    /// The header row written at the top of the ledger.
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            OutputFormat::Basic => &BASIC_HEADER,
            OutputFormat::Detailed => &DETAILED_HEADER,
        }
    }

    /// Number of columns per row.
    #[inline]
    pub fn num_columns(&self) -> usize {
        self.header().len()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Basic => write!(f, "basic"),
            OutputFormat::Detailed => write!(f, "detailed"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(OutputFormat::Basic),
            "detailed" => Ok(OutputFormat::Detailed),
            other => Err(format!("unknown format `{other}`, expected basic or detailed")),
        }
    }
}

/// Configuration for a tagging run.
#[derive(Debug, Clone)]
pub struct TaggerConfig {
    /// Ledger column layout.
    pub format: OutputFormat,
    /// Skip files whose name is already in the ledger.
    pub skip_existing: bool,
    /// Append each row as soon as its file is done instead of once at the end.
    pub continuous_save: bool,
    /// Maximum number of frames captioned per video.
    pub max_frames: usize,
    /// Draw a progress bar on the terminal.
    pub show_progress: bool,
    /// Log the run settings before starting.
    pub verbose: bool,
    /// The model was loaded in half precision for throughput.
    pub batch_mode: bool,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Detailed,
            skip_existing: true,
            continuous_save: true,
            max_frames: 5,
            show_progress: true,
            verbose: false,
            batch_mode: false,
        }
    }
}
