// filebase-core/src/model.rs
//! Model contract: a domain type that converts to and from its plain record.
//!
//! Every `Serialize + DeserializeOwned` type is a model, so a collection can
//! hold typed structs, `Option<T>` (to read `null` holes), or raw
//! [`serde_json::Value`] records.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

pub trait Model: Sized {
    /// Wraps an at-rest record into the model
    fn from_record(record: Value) -> Result<Self>;

    /// The plain record persisted for this model
    fn to_record(&self) -> Result<Value>;
}

impl<T> Model for T
where
    T: Serialize + DeserializeOwned,
{
    fn from_record(record: Value) -> Result<Self> {
        Ok(serde_json::from_value(record)?)
    }

    fn to_record(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
