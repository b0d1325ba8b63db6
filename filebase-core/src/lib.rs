// filebase-core/src/lib.rs
//! File-backed document collections.
//!
//! One structured text file holds a top-level object; every key that maps to
//! an array is a collection of plain records. [`DataFile`] owns the parsed
//! document, [`FileCollection`] gives CRUD access to one of its arrays.

pub mod codec;
pub mod collection;
pub mod config;
pub mod data_file;
pub mod database;
pub mod error;
pub mod model;
pub mod query;

mod io;

// Public exports
pub use codec::{CodecError, DocumentCodec, EncodeOptions, JsonCodec, Replacer};
pub use collection::{Collection, FileCollection, RemoveOptions};
pub use config::FileBaseConfig;
pub use data_file::{DataFile, LoadState, SharedDataFile, SAVE_INDENT};
pub use database::FileDatabase;
pub use error::{FileBaseError, Result};
pub use model::Model;
pub use query::{FieldEquals, Predicate, Query};
