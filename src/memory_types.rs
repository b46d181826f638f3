//! Memory store data types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller-supplied key-value payload attached to one source text.
pub type Metadata = serde_json::Map<String, Value>;

/// One stored fragment.
///
/// `metadata_index` points into the store's metadata records; `source_index`
/// is shared by every fragment cut from the same source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub chunk: String,
    /// `None` when the store embeds lazily at search time.
    pub embedding: Option<Vec<f32>>,
    pub metadata_index: usize,
    pub source_index: usize,
}

/// A ranked search hit resolved back to its fragment and metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub chunk: String,
    pub metadata: Metadata,
    /// Squared L2 distance to the query (lower = closer).
    pub distance: f32,
}

/// Source texts passed to `Memory::save`; a single text is a one-element batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texts(pub Vec<String>);

impl From<&str> for Texts {
    fn from(text: &str) -> Self {
        Texts(vec![text.to_string()])
    }
}

impl From<String> for Texts {
    fn from(text: String) -> Self {
        Texts(vec![text])
    }
}

impl From<Vec<String>> for Texts {
    fn from(texts: Vec<String>) -> Self {
        Texts(texts)
    }
}

impl From<Vec<&str>> for Texts {
    fn from(texts: Vec<&str>) -> Self {
        Texts(texts.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Texts {
    fn from(texts: &[&str]) -> Self {
        Texts(texts.iter().map(|text| text.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Texts {
    fn from(texts: [&str; N]) -> Self {
        Texts(texts.iter().map(|text| text.to_string()).collect())
    }
}

/// Metadata passed to `Memory::save`: none, one record, or one per text.
///
/// Shorter batches are padded with empty records by the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetadataBatch(pub Vec<Metadata>);

impl From<Metadata> for MetadataBatch {
    fn from(record: Metadata) -> Self {
        MetadataBatch(vec![record])
    }
}

impl From<Vec<Metadata>> for MetadataBatch {
    fn from(records: Vec<Metadata>) -> Self {
        MetadataBatch(records)
    }
}

impl From<Option<Metadata>> for MetadataBatch {
    fn from(record: Option<Metadata>) -> Self {
        MetadataBatch(record.into_iter().collect())
    }
}

impl From<()> for MetadataBatch {
    fn from(_: ()) -> Self {
        MetadataBatch::default()
    }
}

/// JSON objects become records, arrays become batches, `null` means no metadata.
///
/// Any other JSON value (or non-object array element) is kept under a
/// `"value"` key so nothing the caller passed is silently dropped.
impl From<Value> for MetadataBatch {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => MetadataBatch::default(),
            Value::Array(items) => MetadataBatch(items.into_iter().map(into_record).collect()),
            other => MetadataBatch(vec![into_record(other)]),
        }
    }
}

fn into_record(value: Value) -> Metadata {
    match value {
        Value::Object(record) => record,
        Value::Null => Metadata::new(),
        other => {
            tracing::warn!("Metadata value is not a JSON object; storing it under \"value\"");
            let mut record = Metadata::new();
            record.insert("value".to_string(), other);
            record
        }
    }
}

/// One line of a [`MemoryDump`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DumpedEntry {
    pub chunk: String,
    /// Zero when the entry has not been embedded.
    pub embedding_len: usize,
    pub metadata: Metadata,
    pub source_index: usize,
}

/// Diagnostic snapshot of a store's contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryDump {
    pub entries: Vec<DumpedEntry>,
    pub entry_count: usize,
    pub metadata_count: usize,
}

impl fmt::Display for MemoryDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "Chunk: {}", entry.chunk)?;
            writeln!(f, "Embedding Length: {}", entry.embedding_len)?;
            writeln!(f, "Metadata: {}", Value::Object(entry.metadata.clone()))?;
            writeln!(f, "{}", "-".repeat(40))?;
        }
        writeln!(f, "Total entries: {}", self.entry_count)?;
        write!(f, "Total metadata: {}", self.metadata_count)
    }
}
