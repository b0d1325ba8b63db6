// filebase-core/src/codec.rs
//! Text codec for the on-disk document.
//!
//! The store only needs two things from a format: turn text into a
//! [`Value`] and turn a [`Value`] back into text. [`JsonCodec`] is the
//! default; with `serde_json`'s `preserve_order` feature the key order of
//! the file survives a load/save cycle.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Largest indentation width honoured by [`EncodeOptions::spaces`]
pub const MAX_INDENT: usize = 10;

/// Field filter/transform applied while encoding.
///
/// Called with `("", root)` first, then with every object key (or array
/// index rendered as a decimal string) of the value it returned. Returning
/// `None` drops an object member; a dropped array element or root becomes
/// `null`.
pub type Replacer<'a> = dyn Fn(&str, &Value) -> Option<Value> + Send + Sync + 'a;

/// Codec failure, tagged with the codec that produced it
#[derive(Debug, Error)]
#[error("{codec}: {message}")]
pub struct CodecError {
    pub codec: &'static str,
    pub message: String,
}

impl CodecError {
    pub fn new(codec: &'static str, message: impl Into<String>) -> Self {
        CodecError {
            codec,
            message: message.into(),
        }
    }
}

/// Encoding options
#[derive(Clone, Copy, Default)]
pub struct EncodeOptions<'a> {
    pub replacer: Option<&'a Replacer<'a>>,
    /// Indentation width; `None` or `Some(0)` produces compact output
    pub spaces: Option<usize>,
}

impl<'a> EncodeOptions<'a> {
    /// Compact output, no replacer
    pub fn compact() -> Self {
        EncodeOptions::default()
    }

    /// Indented output, no replacer
    pub fn indented(spaces: usize) -> Self {
        EncodeOptions {
            replacer: None,
            spaces: Some(spaces),
        }
    }

    pub fn with_replacer(mut self, replacer: &'a Replacer<'a>) -> Self {
        self.replacer = Some(replacer);
        self
    }

    fn indent_width(&self) -> usize {
        self.spaces.unwrap_or(0).min(MAX_INDENT)
    }
}

impl fmt::Debug for EncodeOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeOptions")
            .field("replacer", &self.replacer.map(|_| "<fn>"))
            .field("spaces", &self.spaces)
            .finish()
    }
}

/// Converts between the textual document and its in-memory value
pub trait DocumentCodec: Send + Sync + fmt::Debug {
    /// Short name used in error messages
    fn name(&self) -> &'static str;

    fn decode(&self, text: &str) -> Result<Value, CodecError>;

    fn encode(&self, value: &Value, options: &EncodeOptions<'_>) -> Result<String, CodecError>;
}

/// Runs `replacer` over `value` the way `JSON.stringify` does
pub fn apply_replacer(value: &Value, replacer: &Replacer<'_>) -> Value {
    replace_entry("", value, replacer).unwrap_or(Value::Null)
}

fn replace_entry(key: &str, value: &Value, replacer: &Replacer<'_>) -> Option<Value> {
    let replaced = replacer(key, value)?;

    Some(match replaced {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter_map(|(k, v)| replace_entry(k, v, replacer).map(|v| (k.clone(), v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| replace_entry(&i.to_string(), v, replacer).unwrap_or(Value::Null))
                .collect(),
        ),
        other => other,
    })
}

/// Key-ordered JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl DocumentCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn decode(&self, text: &str) -> Result<Value, CodecError> {
        serde_json::from_str(text).map_err(|e| CodecError::new(self.name(), e.to_string()))
    }

    fn encode(&self, value: &Value, options: &EncodeOptions<'_>) -> Result<String, CodecError> {
        let replaced;
        let value = match options.replacer {
            Some(replacer) => {
                replaced = apply_replacer(value, replacer);
                &replaced
            }
            None => value,
        };

        let width = options.indent_width();
        if width == 0 {
            return serde_json::to_string(value)
                .map_err(|e| CodecError::new(self.name(), e.to_string()));
        }

        let indent = " ".repeat(width);
        let mut buf = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
        value
            .serialize(&mut ser)
            .map_err(|e| CodecError::new(self.name(), e.to_string()))?;

        String::from_utf8(buf).map_err(|e| CodecError::new(self.name(), e.to_string()))
    }
}
