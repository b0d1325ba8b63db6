// filebase-core/src/config.rs
//! TOML configuration for opening a database file.
//!
//! ```toml
//! path = "data/app.json"
//! collections = ["users", "posts"]
//! create_if_missing = true
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::database::FileDatabase;
use crate::error::{FileBaseError, Result};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FileBaseConfig {
    /// Document file
    pub path: PathBuf,

    /// Collections registered up front (each defaults to `[]`)
    #[serde(default)]
    pub collections: Vec<String>,

    /// Start from defaults when the file is missing instead of failing
    #[serde(default = "default_create_if_missing")]
    pub create_if_missing: bool,
}

fn default_create_if_missing() -> bool {
    true
}

impl FileBaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileBaseConfig {
            path: path.into(),
            collections: Vec::new(),
            create_if_missing: default_create_if_missing(),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| FileBaseError::Config(e.to_string()))
    }

    /// Reads a config file. A relative `path` inside it is resolved against
    /// the config file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&text)?;

        if config.path.is_relative() {
            if let Some(dir) = path.parent() {
                config.path = dir.join(&config.path);
            }
        }
        Ok(config)
    }

    /// Database handle for this config, with every listed collection registered
    pub fn open_database(&self) -> FileDatabase {
        let db = if self.create_if_missing {
            FileDatabase::open(&self.path)
        } else {
            FileDatabase::open_existing(&self.path)
        };

        for name in &self.collections {
            db.collection::<serde_json::Value>(name);
        }
        db
    }
}
