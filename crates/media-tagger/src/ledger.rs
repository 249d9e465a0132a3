use std::{
    collections::HashSet,
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use crate::{config::OutputFormat, record::CaptionResult};

/// An error type for reading and writing the ledger.
#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    /// The ledger could not be opened or written.
    #[error("Failed to access the ledger. {0}")]
    Io(#[from] std::io::Error),

    /// The ledger content is not valid CSV.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// The existing ledger was written with another column layout.
    #[error("Ledger {path} has header `{found}` but the {expected} format was selected")]
    FormatMismatch {
        /// The ledger file.
        path: PathBuf,
        /// The selected format.
        expected: OutputFormat,
        /// The header found in the file.
        found: String,
    },

    /// A row does not have as many fields as the header.
    #[error("Row for {filename} has {found} fields, expected {expected}")]
    ColumnMismatch {
        /// The file the row describes.
        filename: String,
        /// Columns of the selected format.
        expected: usize,
        /// Fields in the row.
        found: usize,
    },
}

/// The CSV file that accumulates caption results.
///
/// Every row shares the column layout of the header; rows are appended and
/// flushed one at a time so a partially written ledger stays readable.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    format: OutputFormat,
}

impl Ledger {
    /// Create a handle on the ledger at `path`; nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    /// The ledger file path.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The column layout of the ledger.
    #[inline]
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Whether the ledger exists and holds at least one byte.
    pub fn has_content(&self) -> bool {
        std::fs::metadata(&self.path)
            .map(|m| m.len() > 0)
            .unwrap_or(false)
    }

    /// Read the header row, `None` when the file is missing or empty.
    pub fn read_header(&self) -> Result<Option<Vec<String>>, LedgerError> {
        if !self.has_content() {
            return Ok(None);
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;

        let mut record = csv::StringRecord::new();
        if !reader.read_record(&mut record)? {
            return Ok(None);
        }
        Ok(Some(record.iter().map(str::to_string).collect()))
    }

    /// Fail when the existing header does not match the selected format.
    pub fn check_format(&self) -> Result<(), LedgerError> {
        let Some(header) = self.read_header()? else {
            return Ok(());
        };
        if header.iter().map(String::as_str).eq(self.format.header().iter().copied()) {
            return Ok(());
        }
        Err(LedgerError::FormatMismatch {
            path: self.path.clone(),
            expected: self.format,
            found: header.join(","),
        })
    }

    /// Write the header if the ledger is missing or empty.
    ///
    /// Returns `true` when the header was written.
    pub fn ensure_header(&self) -> Result<bool, LedgerError> {
        if self.has_content() {
            return Ok(false);
        }
        self.write(&[])?;
        Ok(true)
    }

    /// Collect the first column of every data row.
    pub fn processed_files(&self) -> Result<HashSet<String>, LedgerError> {
        let mut processed = HashSet::new();
        if !self.path.exists() {
            return Ok(processed);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;

        for record in reader.records() {
            let record = record?;
            if let Some(filename) = record.get(0) {
                processed.insert(filename.to_string());
            }
        }
        Ok(processed)
    }

    /// Append rows to the end of the ledger without touching the header.
    pub fn append(&self, results: &[CaptionResult]) -> Result<(), LedgerError> {
        if results.is_empty() {
            return Ok(());
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.write_rows(file, results, false)
    }

    /// Replace the ledger with a header followed by `results`.
    pub fn write(&self, results: &[CaptionResult]) -> Result<(), LedgerError> {
        let file = File::create(&self.path)?;
        self.write_rows(file, results, true)
    }

    fn write_rows(
        &self,
        file: File,
        results: &[CaptionResult],
        with_header: bool,
    ) -> Result<(), LedgerError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if with_header {
            writer.write_record(self.format.header())?;
        }

        let expected = self.format.num_columns();
        for result in results {
            let record = result.to_record();
            if record.len() != expected {
                return Err(LedgerError::ColumnMismatch {
                    filename: result.filename.clone(),
                    expected,
                    found: record.len(),
                });
            }
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(name: &str, caption: &str) -> CaptionResult {
        CaptionResult {
            filename: name.to_string(),
            caption: caption.to_string(),
            details: None,
        }
    }

    #[test]
    fn ensure_header_only_once() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let ledger = Ledger::new(tmp_dir.path().join("out.csv"), OutputFormat::Basic);

        assert!(ledger.ensure_header()?);
        assert!(!ledger.ensure_header()?);
        assert_eq!(std::fs::read_to_string(ledger.path())?, "filename,caption\n");
        Ok(())
    }

    #[test]
    fn ensure_header_fills_empty_file() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("out.csv");
        File::create(&path)?;

        let ledger = Ledger::new(&path, OutputFormat::Basic);
        assert!(ledger.ensure_header()?);
        assert_eq!(ledger.read_header()?, Some(vec!["filename".into(), "caption".into()]));
        Ok(())
    }

    #[test]
    fn append_then_read_back() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let ledger = Ledger::new(tmp_dir.path().join("out.csv"), OutputFormat::Basic);

        ledger.ensure_header()?;
        ledger.append(&[basic("a.jpg", "a cat, sleeping")])?;
        ledger.append(&[basic("b.png", "a \"quoted\" sign")])?;

        let processed = ledger.processed_files()?;
        assert_eq!(processed.len(), 2);
        assert!(processed.contains("a.jpg"));
        assert!(processed.contains("b.png"));

        let mut reader = csv::Reader::from_path(ledger.path())?;
        assert_eq!(reader.headers()?.len(), 2);
        for record in reader.records() {
            assert_eq!(record?.len(), 2);
        }
        Ok(())
    }

    #[test]
    fn write_overwrites() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let ledger = Ledger::new(tmp_dir.path().join("out.csv"), OutputFormat::Basic);

        ledger.write(&[basic("old.jpg", "old")])?;
        ledger.write(&[basic("new.jpg", "new")])?;

        let processed = ledger.processed_files()?;
        assert_eq!(processed, HashSet::from(["new.jpg".to_string()]));
        Ok(())
    }

    #[test]
    fn processed_files_of_missing_ledger() -> Result<(), LedgerError> {
        let ledger = Ledger::new("/no/such/dir/out.csv", OutputFormat::Basic);
        assert!(ledger.processed_files()?.is_empty());
        assert_eq!(ledger.read_header()?, None);
        Ok(())
    }

    #[test]
    fn format_mismatch_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("out.csv");

        Ledger::new(&path, OutputFormat::Basic).ensure_header()?;

        let detailed = Ledger::new(&path, OutputFormat::Detailed);
        match detailed.check_format() {
            Err(LedgerError::FormatMismatch {
                expected, found, ..
            }) => {
                assert_eq!(expected, OutputFormat::Detailed);
                assert_eq!(found, "filename,caption");
            }
            other => panic!("expected a format mismatch, got {other:?}"),
        }

        Ledger::new(&path, OutputFormat::Basic).check_format()?;
        Ok(())
    }

    #[test]
    fn row_width_is_enforced() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let ledger = Ledger::new(tmp_dir.path().join("out.csv"), OutputFormat::Detailed);

        let res = ledger.append(&[basic("a.jpg", "too short")]);
        assert!(matches!(
            res,
            Err(LedgerError::ColumnMismatch {
                expected: 6,
                found: 2,
                ..
            })
        ));
        Ok(())
    }
}
