//! Position-aligned filename/text records, persisted as `metadata.json`, the store's commit record.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::index::{write_atomic, IndexError};
use crate::models::resume::ResumeRecord;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedMetadata {
    generation: u64,
    records: Vec<ResumeRecord>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataStore {
    records: Vec<ResumeRecord>,
    generation: u64,
}

impl MetadataStore {
    /// Loads records from `path`. A missing file is the first-run case and yields an empty store.
    ///
    /// Positions must be dense and match their slot, otherwise the store is corrupt.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        let persisted: PersistedMetadata = serde_json::from_slice(&bytes)?;

        if let Some((slot, record)) = persisted
            .records
            .iter()
            .enumerate()
            .find(|(slot, r)| r.position != *slot)
        {
            return Err(IndexError::CorruptStore(format!(
                "metadata slot {slot} holds position {}",
                record.position
            )));
        }

        debug!(
            "Loaded {} metadata records from {} (generation {})",
            persisted.records.len(),
            path.display(),
            persisted.generation
        );

        Ok(Self {
            records: persisted.records,
            generation: persisted.generation,
        })
    }

    /// Appends `record`, which must claim the next free position.
    pub fn append(&mut self, record: ResumeRecord) -> Result<&ResumeRecord, IndexError> {
        let position = self.records.len();
        if record.position != position {
            return Err(IndexError::InvalidRecord(format!(
                "record claims position {} but next slot is {position}",
                record.position
            )));
        }
        self.records.push(record);
        Ok(&self.records[position])
    }

    /// Swaps in `record` at its own position, returning the stored copy.
    pub fn replace(&mut self, record: ResumeRecord) -> Result<&ResumeRecord, IndexError> {
        let position = record.position;
        let slot = self.records.get_mut(position).ok_or_else(|| {
            IndexError::InvalidRecord(format!("no metadata record at position {position}"))
        })?;
        *slot = record;
        Ok(&self.records[position])
    }

    /// First record (in insertion order) whose filename matches exactly.
    pub fn find_by_filename(&self, filename: &str) -> Option<&ResumeRecord> {
        self.records.iter().find(|r| r.filename == filename)
    }

    /// First record whose text hashes to `content_hash`.
    pub fn find_by_hash(&self, content_hash: &str) -> Option<&ResumeRecord> {
        self.records.iter().find(|r| r.content_hash == content_hash)
    }

    pub fn get(&self, position: usize) -> Option<&ResumeRecord> {
        self.records.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResumeRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        #[derive(Serialize)]
        struct Borrowed<'a> {
            generation: u64,
            records: &'a [ResumeRecord],
        }

        let bytes = serde_json::to_vec_pretty(&Borrowed {
            generation: self.generation,
            records: &self.records,
        })?;
        write_atomic(path, &bytes)
    }
}
