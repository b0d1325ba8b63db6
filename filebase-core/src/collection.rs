// filebase-core/src/collection.rs
//! Collections: the generic contract and the file-backed implementation.
//!
//! [`FileCollection`] exposes one array of a [`DataFile`] as a collection of
//! models. Every operation goes through the ensure-loaded gate first, then
//! mutates the array in memory. Nothing is written until `save`.
//!
//! [`DataFile`]: crate::data_file::DataFile

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;
use tracing::trace;

use crate::data_file::{DataFile, SharedDataFile};
use crate::error::Result;
use crate::model::Model;
use crate::query::{Predicate, Query};

/// What a matched slot becomes during `remove` / `remove_one`
#[derive(Debug, Clone, PartialEq)]
pub enum RemoveOptions {
    /// Overwrite the slot in place; the array keeps its length.
    /// The default fill is `null`, which leaves a hole that later
    /// `find(&Query::new())` calls still return.
    Fill(Value),
    /// Drop matched slots, shrinking the array
    Compact,
}

impl Default for RemoveOptions {
    fn default() -> Self {
        RemoveOptions::Fill(Value::Null)
    }
}

impl RemoveOptions {
    pub fn replace_with(value: impl Into<Value>) -> Self {
        RemoveOptions::Fill(value.into())
    }

    pub fn compact() -> Self {
        RemoveOptions::Compact
    }
}

/// Generic collection surface.
///
/// Implementors call the `validate_*` hooks before doing their own work;
/// the default hooks accept everything.
#[async_trait]
pub trait Collection<M>: Send + Sync
where
    M: Model + Send + Sync + 'static,
{
    fn name(&self) -> &str;

    fn validate_query(&self, _query: &Query) -> Result<()> {
        Ok(())
    }

    fn validate_items(&self, _items: &[M]) -> Result<()> {
        Ok(())
    }

    /// Every matching record, wrapped into a model. Zero matches is `Ok(vec![])`.
    async fn find(&self, query: &Query) -> Result<Vec<M>>;

    async fn find_one(&self, query: &Query) -> Result<Option<M>> {
        self.validate_query(query)?;
        Ok(self.find(query).await?.into_iter().next())
    }

    /// Appends each item's record, in order
    async fn add(&self, items: &[M]) -> Result<()>;

    async fn add_one(&self, item: &M) -> Result<()> {
        self.validate_items(std::slice::from_ref(item))?;
        self.add(std::slice::from_ref(item)).await
    }

    /// Applies `options` to every matching slot; returns how many were touched
    async fn remove(&self, query: &Query, options: RemoveOptions) -> Result<usize>;

    /// Applies `options` to the first matching slot only
    async fn remove_one(&self, query: &Query, options: RemoveOptions) -> Result<bool>;

    /// Replaces every matching slot with `item`'s record
    async fn update(&self, query: &Query, item: &M) -> Result<usize> {
        self.validate_query(query)?;
        self.validate_items(std::slice::from_ref(item))?;
        let record = item.to_record()?;
        self.remove(query, RemoveOptions::Fill(record)).await
    }

    async fn update_one(&self, query: &Query, item: &M) -> Result<bool> {
        self.validate_query(query)?;
        self.validate_items(std::slice::from_ref(item))?;
        let record = item.to_record()?;
        self.remove_one(query, RemoveOptions::Fill(record)).await
    }

    /// Persists the whole backing store
    async fn save(&self) -> Result<()>;
}

// ============================================================================
// FILE COLLECTION
// ============================================================================

/// One named array inside a [`SharedDataFile`]
pub struct FileCollection<M> {
    name: String,
    file: SharedDataFile,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for FileCollection<M> {
    fn clone(&self) -> Self {
        FileCollection {
            name: self.name.clone(),
            file: self.file.clone(),
            _model: PhantomData,
        }
    }
}

impl<M> fmt::Debug for FileCollection<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCollection")
            .field("name", &self.name)
            .field("file", &self.file)
            .finish()
    }
}

impl<M> FileCollection<M>
where
    M: Model,
{
    /// Collection with its own file; a missing file starts as `{name: []}`
    pub fn open(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let name = name.into();
        let mut defaults = Map::new();
        defaults.insert(name.clone(), Value::Array(Vec::new()));

        let file = DataFile::new(path).with_defaults(defaults);
        Self::attach(name, SharedDataFile::new(file))
    }

    /// Collection over an existing (possibly shared) file
    pub fn attach(name: impl Into<String>, file: SharedDataFile) -> Self {
        FileCollection {
            name: name.into(),
            file,
            _model: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file(&self) -> &SharedDataFile {
        &self.file
    }

    /// Explicit (re)load of the backing file
    pub async fn load(&self) -> Result<()> {
        self.file.load().await
    }

    pub fn load_sync(&self) -> Result<()> {
        self.file.load_sync()
    }

    pub fn save_sync(&self) -> Result<()> {
        self.file.save_sync()
    }

    /// Snapshot of the raw records; empty before the file is loaded
    pub fn data(&self) -> Result<Vec<Value>> {
        let file = self.file.read();
        if !file.is_loaded() {
            return Ok(Vec::new());
        }
        Ok(file.records(&self.name)?.to_vec())
    }

    /// Like `find`, with an arbitrary predicate
    pub async fn find_where(&self, predicate: &dyn Predicate) -> Result<Vec<M>> {
        self.file.ensure_loaded().await?;

        let matched: Vec<Value> = {
            let file = self.file.read();
            file.records(&self.name)?
                .iter()
                .filter(|record| predicate.matches(record))
                .cloned()
                .collect()
        };

        matched.into_iter().map(M::from_record).collect()
    }

    /// In-place replacement shared by the remove/update family
    fn apply_removal(&self, query: &Query, options: RemoveOptions, limit: Option<usize>) -> Result<usize> {
        let mut file = self.file.write();
        if file.get(&self.name).is_none() {
            return Ok(0);
        }
        let records = file.records_mut(&self.name)?;
        let exhausted = |touched: usize| limit.map_or(false, |limit| touched >= limit);

        let mut touched = 0;
        match options {
            RemoveOptions::Fill(fill) => {
                for slot in records.iter_mut() {
                    if exhausted(touched) {
                        break;
                    }
                    if !query.matches(slot) {
                        continue;
                    }
                    *slot = fill.clone();
                    touched += 1;
                }
            }
            RemoveOptions::Compact => {
                records.retain(|record| {
                    if exhausted(touched) || !query.matches(record) {
                        return true;
                    }
                    touched += 1;
                    false
                });
            }
        }

        trace!(collection = %self.name, touched, "removal applied");
        Ok(touched)
    }
}

#[async_trait]
impl<M> Collection<M> for FileCollection<M>
where
    M: Model + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(&self, query: &Query) -> Result<Vec<M>> {
        self.validate_query(query)?;
        trace!(collection = %self.name, query = %query.to_json(), "find");
        self.find_where(query).await
    }

    async fn add(&self, items: &[M]) -> Result<()> {
        self.validate_items(items)?;
        self.file.ensure_loaded().await?;

        let records = items.iter().map(M::to_record).collect::<Result<Vec<_>>>()?;
        let mut file = self.file.write();
        file.records_mut(&self.name)?.extend(records);
        Ok(())
    }

    async fn remove(&self, query: &Query, options: RemoveOptions) -> Result<usize> {
        self.validate_query(query)?;
        self.file.ensure_loaded().await?;
        self.apply_removal(query, options, None)
    }

    async fn remove_one(&self, query: &Query, options: RemoveOptions) -> Result<bool> {
        self.validate_query(query)?;
        self.file.ensure_loaded().await?;
        Ok(self.apply_removal(query, options, Some(1))? > 0)
    }

    async fn save(&self) -> Result<()> {
        self.file.save().await
    }
}
