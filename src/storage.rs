//! Whole-file persistence of the memory table.
//!
//! The entry table, metadata records and source counter are written together
//! as one bincode blob. Every save overwrites the whole file; there is no
//! journal, so a crash mid-write can leave a truncated file behind.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use bincode::Options;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::Error;
use crate::memory_types::{Entry, Metadata};

/// Layout version written at the head of every snapshot.
pub const FORMAT_VERSION: u32 = 1;

/// Everything the store persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub entries: Vec<Entry>,
    #[serde(with = "metadata_records")]
    pub metadata: Vec<Metadata>,
    /// Source index the next saved text receives.
    pub next_source_index: usize,
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot {
            version: FORMAT_VERSION,
            entries: Vec::new(),
            metadata: Vec::new(),
            next_source_index: 0,
        }
    }
}

impl Snapshot {
    /// Check that every entry's indirection points at an existing record.
    pub fn validate(&self) -> Result<(), Error> {
        for (position, entry) in self.entries.iter().enumerate() {
            if entry.metadata_index >= self.metadata.len() {
                return Err(Error::InvalidInput(format!(
                    "Entry {position} references metadata record {} but only {} exist",
                    entry.metadata_index,
                    self.metadata.len()
                )));
            }
            if entry.source_index >= self.next_source_index {
                return Err(Error::InvalidInput(format!(
                    "Entry {position} has source index {} beyond counter {}",
                    entry.source_index, self.next_source_index
                )));
            }
        }
        Ok(())
    }
}

/// Metadata values are arbitrary JSON, which bincode cannot decode without a
/// schema, so each record is stored as a JSON string inside the blob.
mod metadata_records {
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::memory_types::Metadata;

    pub fn serialize<S: Serializer>(records: &[Metadata], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = records
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()
            .map_err(S::Error::custom)?;
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Metadata>, D::Error> {
        let encoded = Vec::<String>::deserialize(deserializer)?;
        encoded
            .iter()
            .map(|record| serde_json::from_str(record).map_err(D::Error::custom))
            .collect()
    }
}

/// Reads and writes snapshots at a fixed path.
#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Storage { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the memory file with `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be created or written and
    /// `Error::Storage` if encoding fails.
    pub fn save_to_disk(&self, snapshot: &Snapshot) -> Result<(), Error> {
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, snapshot)?;
        writer.flush()?;
        debug!(
            path = %self.path.display(),
            entries = snapshot.entries.len(),
            "Wrote memory file"
        );
        Ok(())
    }

    /// Load the memory file; a missing file is an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` for an undecodable file or an unknown
    /// `FORMAT_VERSION`, and `Error::InvalidInput` if the decoded indirection
    /// tables are inconsistent.
    pub fn load_from_disk(&self) -> Result<Snapshot, Error> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No memory file, starting empty");
            return Ok(Snapshot::default());
        }

        let bytes = std::fs::read(&self.path)?;
        // No length prefix may claim more than the file holds.
        let snapshot: Snapshot = bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .with_limit(bytes.len() as u64)
            .deserialize(&bytes)?;
        if snapshot.version != FORMAT_VERSION {
            return Err(Error::Storage(Box::new(bincode::ErrorKind::Custom(format!(
                "Unsupported memory file version {} (expected {FORMAT_VERSION})",
                snapshot.version
            )))));
        }
        snapshot.validate()?;
        Ok(snapshot)
    }
}
