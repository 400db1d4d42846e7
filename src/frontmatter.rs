//! Two-section file format: an optional YAML metadata header, a
//! terminator line of five or more `+` characters, then the body.
//!
//! Content files and template files share this format; the split is
//! lossless except for the terminator line itself.

use serde::Serialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

/// Terminator written by the draft and publish workflows.
pub const TERMINATOR_LINE: &str = "++++++++++";

/// Metadata-block errors
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("malformed metadata block {text:?}")]
    Parse {
        text: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("metadata is not a mapping (found {found})")]
    NotMapping { found: &'static str },

    #[error("metadata key {key} is not a string")]
    NonStringKey { key: String },
}

/// A parsed metadata block: string keys mapped to arbitrary YAML values.
///
/// Attached to every content file and every template file. Values stay
/// dynamically typed; callers go through the fallible accessors instead
/// of downcasting.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The value under `key` if it is a YAML string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Copy every entry of `other` into `self`, overwriting on overlap.
    ///
    /// Inheritance merging runs ancestor-last, so the ancestor wins.
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Encode back to a YAML block (keys in sorted order).
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.0)
    }

    /// Parse a raw header block. Empty or all-null input is an empty
    /// mapping; anything else must be a string-keyed YAML mapping.
    fn parse(text: &str) -> Result<Self, MetadataError> {
        let value: Value = serde_yaml::from_str(text).map_err(|source| MetadataError::Parse {
            text: text.to_owned(),
            source,
        })?;

        match value {
            Value::Null => Ok(Self::default()),
            Value::Mapping(mapping) => {
                let mut map = BTreeMap::new();
                for (key, value) in mapping {
                    match key {
                        Value::String(key) => {
                            map.insert(key, value);
                        }
                        other => {
                            return Err(MetadataError::NonStringKey {
                                key: format!("{other:?}"),
                            });
                        }
                    }
                }
                Ok(Self(map))
            }
            other => Err(MetadataError::NotMapping {
                found: value_kind(&other),
            }),
        }
    }
}

/// Split a file into its metadata mapping and body.
///
/// Scans line by line for the first terminator; everything before it
/// parses as YAML, everything after it is returned byte-exact. Without
/// a terminator the whole input is body and the metadata stays empty.
pub fn split(input: &str) -> Result<(Metadata, &str), MetadataError> {
    static TERMINATOR: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"^\+{5,}\n?$").unwrap());

    let mut header_len = 0;
    for line in input.split_inclusive('\n') {
        if TERMINATOR.is_match(line) {
            let header = &input[..header_len];
            let body = &input[header_len + line.len()..];
            return Ok((Metadata::parse(header)?, body));
        }
        header_len += line.len();
    }

    Ok((Metadata::new(), input))
}

/// Human-readable YAML variant name for error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
