// filebase-core/src/data_file.rs
//! The structured document wrapper.
//!
//! A [`DataFile`] owns one on-disk document: its path, the parsed top-level
//! object and the optional defaults used when the file is absent. Loading
//! and saving come in a blocking and an async flavour; both share the same
//! decode/fallback logic and differ only in the I/O primitive.
//!
//! [`SharedDataFile`] is the handle collections hold. It owns the
//! ensure-loaded gate and never keeps the lock across an `.await`.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::codec::{CodecError, DocumentCodec, EncodeOptions, JsonCodec};
use crate::error::{FileBaseError, Result};
use crate::io::{self, Source};

/// Indentation width used by `save` / `save_sync`
pub const SAVE_INDENT: usize = 2;

/// Load state machine: Unloaded -> Loaded | Failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loaded,
    /// Last load attempt failed; carries the error message
    Failed(String),
}

/// One structured document on disk
#[derive(Debug)]
pub struct DataFile {
    path: PathBuf,
    content: Option<Map<String, Value>>,
    defaults: Option<Map<String, Value>>,
    state: LoadState,
    codec: Arc<dyn DocumentCodec>,
}

impl DataFile {
    /// New unloaded document without defaults (a missing file is an error)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DataFile {
            path: path.into(),
            content: None,
            defaults: None,
            state: LoadState::Unloaded,
            codec: Arc::new(JsonCodec),
        }
    }

    /// Content to fall back to (and write through) when the file is missing
    pub fn with_defaults(mut self, defaults: Map<String, Value>) -> Self {
        self.defaults = Some(defaults);
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn DocumentCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LoadState::Loaded
    }

    pub fn defaults(&self) -> Option<&Map<String, Value>> {
        self.defaults.as_ref()
    }

    /// Adds one default entry, enabling the fallback if it was off
    pub fn set_default(&mut self, key: impl Into<String>, value: Value) {
        self.defaults
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
    }

    pub fn content(&self) -> Option<&Map<String, Value>> {
        self.loaded_content()
    }

    /// `content[key]`, or `None` before a successful load
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.loaded_content()?.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        if !self.is_loaded() {
            return None;
        }
        self.content.as_mut()?.get_mut(key)
    }

    /// Removes a top-level key from the loaded content
    pub fn remove_key(&mut self, key: &str) -> Option<Value> {
        if !self.is_loaded() {
            return None;
        }
        self.content.as_mut()?.remove(key)
    }

    /// The array stored under `name`. A missing key reads as empty.
    pub fn records(&self, name: &str) -> Result<&[Value]> {
        let content = self
            .loaded_content()
            .ok_or_else(|| FileBaseError::NotLoaded(self.path.clone()))?;

        match content.get(name) {
            None => Ok(&[][..]),
            Some(Value::Array(items)) => Ok(items.as_slice()),
            Some(other) => Err(FileBaseError::InvalidCollection {
                name: name.to_string(),
                found: value_kind(other),
            }),
        }
    }

    /// Mutable access to the array under `name`, created empty if missing
    pub fn records_mut(&mut self, name: &str) -> Result<&mut Vec<Value>> {
        if !self.is_loaded() {
            return Err(FileBaseError::NotLoaded(self.path.clone()));
        }
        let content = self
            .content
            .as_mut()
            .ok_or_else(|| FileBaseError::NotLoaded(self.path.clone()))?;

        match content
            .entry(name)
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            Value::Array(items) => Ok(items),
            other => Err(FileBaseError::InvalidCollection {
                name: name.to_string(),
                found: value_kind(other),
            }),
        }
    }

    /// Drops the content and returns to `Unloaded`
    pub fn reset(&mut self) {
        self.content = None;
        self.state = LoadState::Unloaded;
    }

    // ========================================================================
    // LOAD / SAVE
    // ========================================================================

    /// Blocking load (or default fallback with write-through)
    pub fn load_sync(&mut self) -> Result<()> {
        let source = match io::read_source_blocking(&self.path) {
            Ok(source) => source,
            Err(e) => return Err(self.fail(e)),
        };

        if let Some(text) = self.apply_source(source)? {
            io::write_text_blocking(&self.path, &text)?;
        }
        Ok(())
    }

    /// Async load (or default fallback with write-through)
    pub async fn load(&mut self) -> Result<()> {
        let source = match io::read_source(&self.path).await {
            Ok(source) => source,
            Err(e) => return Err(self.fail(e)),
        };

        if let Some(text) = self.apply_source(source)? {
            io::write_text(&self.path, &text).await?;
        }
        Ok(())
    }

    pub fn save_sync(&self) -> Result<()> {
        let text = self.render()?;
        io::write_text_blocking(&self.path, &text)?;
        debug!(path = %self.path.display(), bytes = text.len(), "document saved");
        Ok(())
    }

    pub async fn save(&self) -> Result<()> {
        let text = self.render()?;
        io::write_text(&self.path, &text).await?;
        debug!(path = %self.path.display(), bytes = text.len(), "document saved");
        Ok(())
    }

    /// Encodes the current content; touches no files
    pub fn to_text(&self, options: &EncodeOptions<'_>) -> Result<String> {
        let content = self
            .content
            .as_ref()
            .ok_or_else(|| FileBaseError::NotLoaded(self.path.clone()))?;

        // TODO: encode straight from the map once DocumentCodec takes a &Map
        let value = Value::Object(content.clone());
        self.codec
            .encode(&value, options)
            .map_err(FileBaseError::Encode)
    }

    /// Text written by `save`
    pub(crate) fn render(&self) -> Result<String> {
        self.to_text(&EncodeOptions::indented(SAVE_INDENT))
    }

    /// Shared load logic. Returns the text to write through when the
    /// defaults were used.
    pub(crate) fn apply_source(&mut self, source: Source) -> Result<Option<String>> {
        match source {
            Source::Missing => {
                let Some(defaults) = self.defaults.clone() else {
                    return Err(self.fail(FileBaseError::FileNotFound(self.path.clone())));
                };

                warn!(path = %self.path.display(), "document missing, initializing from defaults");
                self.content = Some(defaults);
                self.state = LoadState::Loaded;
                // Loaded stays true even if the write-through fails
                self.render().map(Some)
            }
            Source::Bytes(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                let content = match self.codec.decode(&text) {
                    Ok(Value::Object(map)) => map,
                    Ok(other) => {
                        let source = CodecError::new(
                            self.codec.name(),
                            format!("top-level value must be an object, found {}", value_kind(&other)),
                        );
                        return Err(self.fail(FileBaseError::Decode {
                            path: self.path.clone(),
                            source,
                        }));
                    }
                    Err(source) => {
                        return Err(self.fail(FileBaseError::Decode {
                            path: self.path.clone(),
                            source,
                        }));
                    }
                };

                debug!(path = %self.path.display(), keys = content.len(), "document loaded");
                self.content = Some(content);
                self.state = LoadState::Loaded;
                Ok(None)
            }
        }
    }

    /// Records a failed load and hands the error back
    pub(crate) fn fail(&mut self, err: FileBaseError) -> FileBaseError {
        // A failed reload leaves already-loaded content in place.
        if !self.is_loaded() {
            self.content = None;
            self.state = LoadState::Failed(err.to_string());
        }
        err
    }

    fn loaded_content(&self) -> Option<&Map<String, Value>> {
        if self.is_loaded() {
            self.content.as_ref()
        } else {
            None
        }
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// SHARED HANDLE
// ============================================================================

/// Cloneable handle to one [`DataFile`], shared by every collection in it
#[derive(Debug, Clone)]
pub struct SharedDataFile {
    inner: Arc<RwLock<DataFile>>,
}

impl From<DataFile> for SharedDataFile {
    fn from(file: DataFile) -> Self {
        SharedDataFile::new(file)
    }
}

impl SharedDataFile {
    pub fn new(file: DataFile) -> Self {
        SharedDataFile {
            inner: Arc::new(RwLock::new(file)),
        }
    }

    /// Never hold the guard across an `.await`
    pub fn read(&self) -> RwLockReadGuard<'_, DataFile> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, DataFile> {
        self.inner.write()
    }

    pub fn path(&self) -> PathBuf {
        self.inner.read().path().to_path_buf()
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.read().is_loaded()
    }

    pub fn state(&self) -> LoadState {
        self.inner.read().state().clone()
    }

    /// Re-arms the ensure-loaded gate
    pub fn reset(&self) {
        self.inner.write().reset();
    }

    /// Loads on first use only. A failed load is reported again until
    /// [`reset`](Self::reset).
    pub async fn ensure_loaded(&self) -> Result<()> {
        match self.gate()? {
            Some(path) => self.load_from(path, true).await,
            None => Ok(()),
        }
    }

    pub fn ensure_loaded_blocking(&self) -> Result<()> {
        match self.gate()? {
            Some(path) => self.load_from_blocking(path, true),
            None => Ok(()),
        }
    }

    /// Unconditional (re)load
    pub async fn load(&self) -> Result<()> {
        let path = self.path();
        self.load_from(path, false).await
    }

    pub fn load_sync(&self) -> Result<()> {
        let path = self.path();
        self.load_from_blocking(path, false)
    }

    pub async fn save(&self) -> Result<()> {
        let (path, text) = {
            let file = self.inner.read();
            (file.path().to_path_buf(), file.render()?)
        };
        io::write_text(&path, &text).await?;
        debug!(path = %path.display(), bytes = text.len(), "document saved");
        Ok(())
    }

    pub fn save_sync(&self) -> Result<()> {
        self.inner.read().save_sync()
    }

    /// `Some(path)` when a load is needed
    fn gate(&self) -> Result<Option<PathBuf>> {
        let file = self.inner.read();
        match file.state() {
            LoadState::Loaded => Ok(None),
            LoadState::Unloaded => Ok(Some(file.path().to_path_buf())),
            LoadState::Failed(reason) => Err(FileBaseError::LoadFailed {
                path: file.path().to_path_buf(),
                reason: reason.clone(),
            }),
        }
    }

    async fn load_from(&self, path: PathBuf, gated: bool) -> Result<()> {
        let source = io::read_source(&path).await;

        let pending = {
            let mut file = self.inner.write();
            // Another caller finished the load while we were reading
            if gated && file.is_loaded() {
                return Ok(());
            }
            let source = match source {
                Ok(source) => source,
                Err(e) => return Err(file.fail(e)),
            };
            file.apply_source(source)?
        };

        if let Some(text) = pending {
            io::write_text(&path, &text).await?;
        }
        Ok(())
    }

    fn load_from_blocking(&self, path: PathBuf, gated: bool) -> Result<()> {
        let source = io::read_source_blocking(&path);

        let pending = {
            let mut file = self.inner.write();
            if gated && file.is_loaded() {
                return Ok(());
            }
            let source = match source {
                Ok(source) => source,
                Err(e) => return Err(file.fail(e)),
            };
            file.apply_source(source)?
        };

        if let Some(text) = pending {
            io::write_text_blocking(&path, &text)?;
        }
        Ok(())
    }
}
