// filebase-core/src/error.rs

use std::path::PathBuf;
use thiserror::Error;

use crate::codec::CodecError;

/// FileBase error
#[derive(Debug, Error)]
pub enum FileBaseError {
    /// Load attempted on a missing path (or a non-file) with no defaults configured
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Any read/write/stat failure from the filesystem layer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The codec could not parse the file contents
    #[error("Decode error in {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("Encode error: {0}")]
    Encode(#[source] CodecError),

    /// Content accessed or saved before a successful load
    #[error("Document not loaded: {}", .0.display())]
    NotLoaded(PathBuf),

    /// The ensure-loaded gate refuses to retry a failed load until reset
    #[error("Previous load of {} failed: {reason}", .path.display())]
    LoadFailed { path: PathBuf, reason: String },

    #[error("Collection '{name}' is not an array (found {found})")]
    InvalidCollection { name: String, found: &'static str },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Record <-> model conversion failed
    #[error("Model conversion error: {0}")]
    Model(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, FileBaseError>;
