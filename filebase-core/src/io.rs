// filebase-core/src/io.rs
// Filesystem primitives, blocking and async flavours of the same contract

use std::io::ErrorKind;
use std::path::Path;

use crate::error::Result;

/// What a load found at the document path
#[derive(Debug)]
pub(crate) enum Source {
    /// Nothing usable: the path does not exist or is not a regular file
    Missing,
    Bytes(Vec<u8>),
}

pub(crate) fn read_source_blocking(path: &Path) -> Result<Source> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(Source::Bytes(std::fs::read(path)?)),
        Ok(_) => Ok(Source::Missing),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Source::Missing),
        Err(e) => Err(e.into()),
    }
}

pub(crate) async fn read_source(path: &Path) -> Result<Source> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(Source::Bytes(tokio::fs::read(path).await?)),
        Ok(_) => Ok(Source::Missing),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Source::Missing),
        Err(e) => Err(e.into()),
    }
}

/// Overwrites the file in place (no temp file + rename, no fsync)
pub(crate) fn write_text_blocking(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text)?;
    Ok(())
}

pub(crate) async fn write_text(path: &Path, text: &str) -> Result<()> {
    tokio::fs::write(path, text).await?;
    Ok(())
}
