//! ZIP (DEFLATE) packaging of downloaded documents.

use std::io::{Cursor, Write};

use thiserror::Error;
use tracing::debug;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::links::UniqueNames;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to write archive entry {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Builds an in-memory ZIP from `(filename, bytes)` pairs in order.
///
/// A name already present in the archive is renamed `name_2.ext`,
/// `name_3.ext`, ...; entries are never overwritten.
///
/// # Errors
///
/// Returns [`ArchiveError`] if the zip writer fails.
pub fn build_archive(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>, ArchiveError> {
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut names = UniqueNames::new();

    for (filename, bytes) in files {
        let name = names.claim(filename);
        if &name != filename {
            debug!(requested = %filename, stored = %name, "renamed colliding archive entry");
        }
        writer.start_file(name.as_str(), options)?;
        writer
            .write_all(bytes)
            .map_err(|source| ArchiveError::Io { name, source })?;
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}
