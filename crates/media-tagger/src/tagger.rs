use std::{collections::HashSet, path::Path};

use indicatif::{ProgressBar, ProgressStyle};
use media_tagger_io::{MediaError, MediaFile, MediaKind};
use media_tagger_vlm::Captioner;

use crate::{
    config::{OutputFormat, TaggerConfig},
    discovery::discover_files,
    error::TaggerError,
    ledger::{Ledger, LedgerError},
    processors::{ImageProcessor, VideoProcessor},
    record::{CaptionResult, FileDetails, ERROR_CAPTION},
};

/// Counters of a finished run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Supported files found under the input.
    pub discovered: usize,
    /// Files left out because the ledger already lists them.
    pub skipped: usize,
    /// Files that got a row in this run, failures included.
    pub processed: usize,
    /// Files recorded with an `ERROR` row.
    pub failed: usize,
}

/// Captions a tree of media files into a CSV ledger.
pub struct Tagger<C: Captioner> {
    captioner: C,
    config: TaggerConfig,
    images: ImageProcessor,
    videos: VideoProcessor,
}

impl<C: Captioner> Tagger<C> {
    /// Create a tagger around a loaded captioner.
    pub fn new(captioner: C, config: TaggerConfig) -> Self {
        let videos = VideoProcessor::new(config.max_frames);
        Self {
            captioner,
            config,
            images: ImageProcessor,
            videos,
        }
    }

    /// The run configuration.
    #[inline]
    pub fn config(&self) -> &TaggerConfig {
        &self.config
    }

    /// Give back the captioner.
    pub fn into_captioner(self) -> C {
        self.captioner
    }

    /// Caption every supported file under `input` into the ledger at `output`.
    pub fn process(
        &mut self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<RunSummary, TaggerError> {
        let input = input.as_ref();
        let output = output.as_ref();
        let mut summary = RunSummary::default();

        if self.config.verbose {
            self.log_settings();
        }

        let files = discover_files(input)?;
        summary.discovered = files.len();
        if files.is_empty() {
            log::info!("No supported files found");
            return Ok(summary);
        }
        log::info!("Found {} files to process", files.len());

        let ledger = Ledger::new(output, self.config.format);

        // a buffered run without resume rewrites the ledger from scratch
        let rewrite = !self.config.continuous_save && !self.config.skip_existing;
        if !rewrite {
            match ledger.check_format() {
                Err(e @ LedgerError::FormatMismatch { .. }) => return Err(e.into()),
                Err(e) => log::warn!("Could not read the header of {}: {e}", output.display()),
                Ok(()) => {}
            }
        }

        let processed = if self.config.skip_existing {
            self.already_processed(&ledger)
        } else {
            HashSet::new()
        };

        let pending = files
            .into_iter()
            .filter(|file| !processed.contains(&file.file_name()))
            .collect::<Vec<_>>();
        summary.skipped = summary.discovered - pending.len();
        if summary.skipped > 0 {
            log::info!("Skipping {} files (already processed)", summary.skipped);
        }

        if pending.is_empty() {
            log::info!("All files already processed!");
            return Ok(summary);
        }

        if self.config.continuous_save && ledger.ensure_header()? {
            log::info!("Created new CSV file: {}", output.display());
        }

        let pb = self.progress_bar(pending.len());
        let mut results = Vec::new();

        for file in &pending {
            pb.set_message(file.file_name());
            let (result, ok) = pb.suspend(|| self.caption_result(file));
            summary.processed += 1;
            if !ok {
                summary.failed += 1;
            }

            if self.config.continuous_save {
                ledger.append(std::slice::from_ref(&result))?;
            } else {
                results.push(result);
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        if !self.config.continuous_save {
            if self.config.skip_existing && ledger.has_content() {
                ledger.append(&results)?;
            } else {
                ledger.write(&results)?;
            }
        }

        log::info!(
            "Processed {} files ({} failed)",
            summary.processed,
            summary.failed
        );
        log::info!("Done! Check {}", output.display());

        Ok(summary)
    }

    /// Caption one file, turning any failure into an `ERROR` row.
    ///
    /// The flag is `false` when the file failed.
    fn caption_result(&mut self, file: &MediaFile) -> (CaptionResult, bool) {
        let detailed = self.config.format == OutputFormat::Detailed;

        match self.caption_file(file) {
            Ok(caption) => {
                log::info!("{}: {caption}", file.file_name());
                let result = CaptionResult {
                    filename: file.file_name(),
                    caption,
                    details: detailed.then(|| FileDetails::gather(file)),
                };
                (result, true)
            }
            Err(e) => {
                log::warn!("Error processing {}: {e}", file.path().display());
                let result = CaptionResult {
                    filename: file.file_name(),
                    caption: ERROR_CAPTION.to_string(),
                    details: detailed.then(|| FileDetails::placeholder(file)),
                };
                (result, false)
            }
        }
    }

    fn caption_file(&mut self, file: &MediaFile) -> Result<String, MediaError> {
        match file.kind() {
            MediaKind::Image => self.images.process(file.path(), &mut self.captioner),
            MediaKind::Video => self.videos.process(file.path(), &mut self.captioner),
        }
    }

    fn already_processed(&self, ledger: &Ledger) -> HashSet<String> {
        match ledger.processed_files() {
            Ok(processed) => {
                if !processed.is_empty() {
                    log::info!("Found {} files already in CSV", processed.len());
                }
                processed
            }
            Err(e) => {
                log::warn!("Could not read {}: {e}", ledger.path().display());
                HashSet::new()
            }
        }
    }

    fn log_settings(&self) {
        log::debug!("Output format: {}", self.config.format);
        log::debug!("Frames per video: {}", self.videos.max_frames());
        if self.config.batch_mode {
            log::debug!("Batch mode enabled");
        }
        if self.config.skip_existing {
            log::debug!("Skipping files already in the CSV");
        }
        if self.config.continuous_save {
            log::debug!("Saving results as each file finishes");
        }
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>7}/{len:7} ({eta}) {msg}")
        {
            pb.set_style(style.progress_chars("##>-"));
        }
        pb
    }
}
