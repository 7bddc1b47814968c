use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::object_id::ObjectId;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A single metadata value. Deliberately closed: no nulls, arrays or nested maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum MetadataValue {
    Boolean(bool),
    Number(f64),
    String(String),
    Timestamp(DateTime<Utc>),
}

pub type Metadata = BTreeMap<String, MetadataValue>;

impl MetadataValue {
    /// Convert a JSON scalar. Returns `None` for null, arrays and objects.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(MetadataValue::Boolean(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(MetadataValue::Number),
            serde_json::Value::String(s) => Some(MetadataValue::String(s.clone())),
            _ => None,
        }
    }

    /// Plain JSON form; timestamps render as RFC 3339 strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            MetadataValue::Boolean(b) => serde_json::Value::Bool(*b),
            MetadataValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            MetadataValue::String(s) => serde_json::Value::String(s.clone()),
            MetadataValue::Timestamp(t) => serde_json::Value::String(t.to_rfc3339()),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<f64> for MetadataValue {
    fn from(n: f64) -> Self {
        MetadataValue::Number(n)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Boolean(b)
    }
}

impl From<DateTime<Utc>> for MetadataValue {
    fn from(t: DateTime<Utc>) -> Self {
        MetadataValue::Timestamp(t)
    }
}

/// Build a metadata map from a JSON object, naming the first offending key on failure.
pub fn metadata_from_json(
    object: &serde_json::Map<String, serde_json::Value>,
) -> Result<Metadata, String> {
    object
        .iter()
        .map(|(key, value)| {
            MetadataValue::from_json(value)
                .map(|v| (key.clone(), v))
                .ok_or_else(|| {
                    format!("metadata value for '{key}' must be a string, number or boolean")
                })
        })
        .collect()
}

pub fn metadata_to_json(metadata: &Metadata) -> serde_json::Value {
    serde_json::Value::Object(
        metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

/// The file document of one stored object. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: ObjectId,
    /// Stored verbatim, no sanitization.
    pub filename: String,
    pub content_type: String,
    pub length: u64,
    pub chunk_size: u32,
    pub upload_date: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl FileRecord {
    /// Number of chunks the blob occupies.
    pub fn chunk_count(&self) -> u32 {
        if self.chunk_size == 0 {
            return 0;
        }
        self.length.div_ceil(self.chunk_size as u64) as u32
    }
}

/// Optional attributes supplied with an upload.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub content_type: Option<String>,
    pub metadata: Option<Metadata>,
}

impl UploadOptions {
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Insert a single metadata entry, creating the map if needed.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value.into());
        self
    }

    pub(crate) fn content_type_or_default(&self) -> String {
        self.content_type
            .as_deref()
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string()
    }
}
