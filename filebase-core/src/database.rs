// filebase-core/src/database.rs
// Several collections sharing one document file

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::collection::FileCollection;
use crate::data_file::{DataFile, SharedDataFile};
use crate::error::Result;
use crate::model::Model;

/// One document file, handed out as collections.
///
/// Every collection returned by [`collection`](Self::collection) holds the
/// same [`SharedDataFile`], so a `save` from any of them writes all of them.
#[derive(Debug, Clone)]
pub struct FileDatabase {
    file: SharedDataFile,
}

impl FileDatabase {
    /// Open (or lazily create) a database file. A missing file starts as `{}`
    /// plus one empty array per registered collection.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let file = DataFile::new(path.as_ref()).with_defaults(Map::new());
        FileDatabase {
            file: SharedDataFile::new(file),
        }
    }

    /// Open a database file that must already exist
    pub fn open_existing<P: AsRef<Path>>(path: P) -> Self {
        FileDatabase {
            file: SharedDataFile::new(DataFile::new(path.as_ref())),
        }
    }

    /// Wrap an already configured file
    pub fn from_file(file: DataFile) -> Self {
        FileDatabase {
            file: SharedDataFile::new(file),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.file.path()
    }

    pub fn file(&self) -> &SharedDataFile {
        &self.file
    }

    /// Collection handle; registers `name: []` as a default for a missing
    /// file (only matters before the first load)
    pub fn collection<M: Model>(&self, name: &str) -> FileCollection<M> {
        {
            let mut file = self.file.write();
            if !file.is_loaded() && file.defaults().is_some() {
                file.set_default(name, Value::Array(Vec::new()));
            }
        }
        debug!(collection = name, "collection handle created");
        FileCollection::attach(name, self.file.clone())
    }

    /// Names of the top-level keys holding arrays; empty before load
    pub fn list_collections(&self) -> Vec<String> {
        let file = self.file.read();
        file.content()
            .map(|content| {
                content
                    .iter()
                    .filter(|(_, value)| value.is_array())
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Removes a collection from memory; persisted on the next save
    pub fn drop_collection(&self, name: &str) -> Option<Value> {
        self.file.write().remove_key(name)
    }

    pub async fn load(&self) -> Result<()> {
        self.file.load().await
    }

    pub fn load_sync(&self) -> Result<()> {
        self.file.load_sync()
    }

    pub async fn ensure_loaded(&self) -> Result<()> {
        self.file.ensure_loaded().await
    }

    pub async fn save(&self) -> Result<()> {
        self.file.save().await
    }

    pub fn save_sync(&self) -> Result<()> {
        self.file.save_sync()
    }
}
