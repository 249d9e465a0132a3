use std::path::PathBuf;

use media_tagger_io::MediaError;

use crate::ledger::LedgerError;

/// An error type that stops a tagging run.
///
/// Failures of a single file never surface here; they become `ERROR` rows.
#[derive(thiserror::Error, Debug)]
pub enum TaggerError {
    /// The input path does not exist.
    #[error("{} does not exist", .0.display())]
    InputNotFound(PathBuf),

    /// Reading or writing the ledger failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A media file could not be opened or decoded.
    #[error(transparent)]
    Media(#[from] MediaError),
}
