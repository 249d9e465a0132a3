use std::path::Path;

use media_tagger_io::{media::dotted_extension, MediaFile};
use walkdir::WalkDir;

use crate::error::TaggerError;

/// Collect the media files under `input`, sorted by path.
///
/// A single file is kept when its extension is supported. A directory is walked
/// recursively, following symbolic links. Unsupported files and entries that
/// cannot be read (e.g. a link pointing back to an ancestor) are skipped.
pub fn discover_files(input: impl AsRef<Path>) -> Result<Vec<MediaFile>, TaggerError> {
    let input = input.as_ref();
    if !input.exists() {
        return Err(TaggerError::InputNotFound(input.to_path_buf()));
    }

    if input.is_file() {
        return match MediaFile::new(input) {
            Ok(file) => Ok(vec![file]),
            Err(_) => {
                log::warn!("Unsupported file type: {}", dotted_extension(input));
                Ok(Vec::new())
            }
        };
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry under {}: {e}", input.display());
                continue;
            }
        };
        if !entry.path().is_file() {
            continue;
        }
        if let Ok(file) = MediaFile::new(entry.path()) {
            files.push(file);
        }
    }

    files.sort_by(|a, b| a.path().cmp(b.path()));
    Ok(files)
}
