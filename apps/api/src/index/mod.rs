//! Resume index: the flat vector index and its position-aligned metadata, owned as one unit.
//!
//! On disk the unit is `metadata.json` plus one `index.<generation>.vec`. A flush writes the
//! next generation's vector file first and then renames `metadata.json` into place; that rename
//! is the commit. `open` only ever reads the vector file the committed metadata names, so a
//! flush that dies part way leaves the previous generation intact and an orphan file behind.

mod error;
pub mod metadata;
pub mod vector;

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub use error::IndexError;
pub use metadata::MetadataStore;
pub use vector::{inner_product, normalize, FlatIndex};

use crate::models::resume::{ResumeMatch, ResumeRecord};

pub const METADATA_FILE: &str = "metadata.json";
/// all-MiniLM-L6-v2 output width.
pub const EMBEDDING_DIMENSION: usize = 384;

/// Name of the vector file committed by `generation`.
pub fn vector_file_name(generation: u64) -> String {
    format!("index.{generation}.vec")
}

/// Whether `name` looks like a file produced by [`vector_file_name`].
pub fn is_vector_file(name: &str) -> bool {
    name.strip_prefix("index.")
        .and_then(|rest| rest.strip_suffix(".vec"))
        .is_some_and(|g| !g.is_empty() && g.bytes().all(|b| b.is_ascii_digit()))
}

#[derive(Debug, Clone)]
pub struct ResumeIndex {
    dir: PathBuf,
    vectors: FlatIndex,
    metadata: MetadataStore,
    generation: u64,
    dirty: bool,
}

impl ResumeIndex {
    /// Opens the index stored under `dir`, or an empty one if nothing has been committed yet.
    ///
    /// Vector files without a committing `metadata.json` are ignored.
    ///
    /// # Errors
    /// `CorruptStore` when the committed vector file is missing or disagrees with the metadata
    /// on generation or size. `DimensionMismatch` when the stored dimension is not `dimension`.
    pub fn open(dir: impl Into<PathBuf>, dimension: usize) -> Result<Self, IndexError> {
        let dir = dir.into();
        let metadata_path = dir.join(METADATA_FILE);

        if !metadata_path.try_exists()? {
            info!("No committed resume index under {}, starting empty", dir.display());
            return Ok(Self {
                dir,
                vectors: FlatIndex::create_empty(dimension),
                metadata: MetadataStore::default(),
                generation: 0,
                dirty: false,
            });
        }

        let metadata = MetadataStore::load(&metadata_path)?;
        let vector_path = dir.join(vector_file_name(metadata.generation()));
        let vectors = match FlatIndex::load(&vector_path) {
            Ok(v) => v,
            Err(IndexError::StorageNotFound(_)) => {
                return Err(IndexError::CorruptStore(format!(
                    "{} commits generation {} but {} is missing",
                    metadata_path.display(),
                    metadata.generation(),
                    vector_path.display()
                )))
            }
            Err(e) => return Err(e),
        };

        if vectors.dimension() != dimension {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: vectors.dimension(),
            });
        }

        let index = Self {
            generation: metadata.generation(),
            dir,
            vectors,
            metadata,
            dirty: false,
        };
        index.check_consistency()?;

        info!(
            "Opened resume index at {} ({} resumes, generation {})",
            index.dir.display(),
            index.len(),
            index.generation
        );
        Ok(index)
    }

    /// Verifies the alignment invariant between the two halves.
    pub fn check_consistency(&self) -> Result<(), IndexError> {
        if self.vectors.len() != self.metadata.len() {
            return Err(IndexError::CorruptStore(format!(
                "vector index holds {} entries but metadata holds {}",
                self.vectors.len(),
                self.metadata.len()
            )));
        }
        if self.vectors.generation() != self.metadata.generation() {
            return Err(IndexError::CorruptStore(format!(
                "vector index generation {} does not match metadata generation {}",
                self.vectors.generation(),
                self.metadata.generation()
            )));
        }
        Ok(())
    }

    /// Normalizes `embedding` and appends it together with its record.
    ///
    /// Either both halves grow by one or neither does.
    pub fn insert(
        &mut self,
        filename: &str,
        text: String,
        embedding: &[f32],
    ) -> Result<&ResumeRecord, IndexError> {
        let vector = normalize(embedding)?;
        let record = ResumeRecord::new(self.metadata.len(), filename, text)?;

        let position = self.vectors.add(&vector)?;
        match self.metadata.append(record) {
            Ok(record) => {
                self.dirty = true;
                debug!("Indexed {filename} at position {position}");
                Ok(record)
            }
            Err(e) => {
                self.vectors.truncate(position);
                Err(e)
            }
        }
    }

    /// Overwrites the entry at `position` with new text and embedding, keeping its filename.
    ///
    /// Nothing changes unless both halves can be updated.
    pub fn replace(
        &mut self,
        position: usize,
        text: String,
        embedding: &[f32],
    ) -> Result<&ResumeRecord, IndexError> {
        let vector = normalize(embedding)?;
        let filename = self
            .metadata
            .get(position)
            .map(|r| r.filename.clone())
            .ok_or_else(|| {
                IndexError::InvalidRecord(format!("no resume at position {position}"))
            })?;
        let record = ResumeRecord::new(position, &filename, text)?;

        self.vectors.set(position, &vector)?;
        let record = self.metadata.replace(record)?;
        self.dirty = true;
        debug!("Replaced {filename} at position {position}");
        Ok(record)
    }

    /// Exact top-`k` search with an already-embedded query. The query is normalized here.
    pub fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<ResumeMatch>, IndexError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query = normalize(query_embedding)?;
        let hits = self.vectors.search(&query, k)?;

        let mut matches: Vec<ResumeMatch> = hits
            .into_iter()
            .filter_map(|(position, score)| {
                self.metadata
                    .get(position)
                    .map(|record| ResumeMatch::from_record(record, score))
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(matches)
    }

    pub fn find_by_filename(&self, filename: &str) -> Option<&ResumeRecord> {
        self.metadata.find_by_filename(filename)
    }

    pub fn find_by_hash(&self, content_hash: &str) -> Option<&ResumeRecord> {
        self.metadata.find_by_hash(content_hash)
    }

    pub fn records(&self) -> impl Iterator<Item = &ResumeRecord> {
        self.metadata.iter()
    }

    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        self.vectors.vector(position)
    }

    /// Commits the next generation if anything changed since the last flush.
    /// Returns whether it wrote.
    ///
    /// On error the committed generation on disk is unchanged and the in-memory state is
    /// still dirty.
    pub fn flush(&mut self) -> Result<bool, IndexError> {
        if !self.dirty {
            return Ok(false);
        }
        let generation = self.generation + 1;
        self.vectors.set_generation(generation);
        self.metadata.set_generation(generation);

        let vector_path = self.dir.join(vector_file_name(generation));
        if let Err(e) = self.commit(&vector_path) {
            self.vectors.set_generation(self.generation);
            self.metadata.set_generation(self.generation);
            return Err(e);
        }

        self.generation = generation;
        self.dirty = false;
        self.remove_stale_vector_files();
        info!(
            "Flushed resume index ({} resumes, generation {generation})",
            self.len()
        );
        Ok(true)
    }

    fn commit(&self, vector_path: &Path) -> Result<(), IndexError> {
        self.vectors.save(vector_path)?;
        if let Err(e) = self.metadata.save(&self.metadata_path()) {
            if let Err(cleanup) = std::fs::remove_file(vector_path) {
                warn!(
                    "Could not remove uncommitted {}: {cleanup}",
                    vector_path.display()
                );
            }
            return Err(e);
        }
        Ok(())
    }

    /// Deletes vector files from generations other than the committed one.
    fn remove_stale_vector_files(&self) {
        let current = vector_file_name(self.generation);
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not list {}: {e}", self.dir.display());
                return;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name == current || !is_vector_file(name) {
                continue;
            }
            if let Err(e) = std::fs::remove_file(entry.path()) {
                warn!("Could not remove stale {}: {e}", entry.path().display());
            }
        }
    }

    /// Flushes pending changes and releases the index.
    pub fn close(mut self) -> Result<(), IndexError> {
        self.flush()?;
        Ok(())
    }

    /// Drops every in-memory entry. Files are left to the caller.
    pub fn clear(&mut self) {
        self.vectors = FlatIndex::create_empty(self.vectors.dimension());
        self.metadata = MetadataStore::default();
        self.generation = 0;
        self.dirty = false;
    }

    /// Drops every entry and commits the empty state as the next generation.
    ///
    /// Used when the store files could not all be removed: whatever is left on disk is
    /// superseded by a consistent empty commit.
    pub fn reset(&mut self) -> Result<(), IndexError> {
        self.vectors = FlatIndex::create_empty(self.vectors.dimension());
        self.metadata = MetadataStore::default();
        self.dirty = true;
        self.flush()?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Vector file of the committed generation.
    pub fn vector_path(&self) -> PathBuf {
        self.dir.join(vector_file_name(self.generation))
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn dimension(&self) -> usize {
        self.vectors.dimension()
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }
}

/// Writes `bytes` to a temp file beside `path` and renames it over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), IndexError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DIM: usize = 4;

    fn open(dir: &TempDir) -> ResumeIndex {
        ResumeIndex::open(dir.path().join("store"), DIM).unwrap()
    }

    #[test]
    fn test_open_empty_directory_starts_empty() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir);
        assert!(index.is_empty());
        assert_eq!(index.dimension(), DIM);
        assert!(!index.metadata_path().exists());
    }

    #[test]
    fn test_insert_keeps_halves_aligned() {
        let dir = TempDir::new().unwrap();
        let mut index = open(&dir);
        index.insert("a.pdf", "alpha".into(), &[2.0, 0.0, 0.0, 0.0]).unwrap();
        index.insert("b.pdf", "beta".into(), &[0.0, 3.0, 0.0, 0.0]).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.vectors.len(), index.metadata.len());
        let v = index.vector(1).unwrap();
        assert!((inner_product(v, v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_embedding_appends_nothing() {
        let dir = TempDir::new().unwrap();
        let mut index = open(&dir);
        let err = index.insert("empty.pdf", String::new(), &[0.0; DIM]).unwrap_err();
        assert!(matches!(err, IndexError::DegenerateVector));
        assert_eq!(index.vectors.len(), 0);
        assert_eq!(index.metadata.len(), 0);
    }

    #[test]
    fn test_wrong_dimension_appends_nothing() {
        let dir = TempDir::new().unwrap();
        let mut index = open(&dir);
        assert!(index.insert("a.pdf", "x".into(), &[1.0, 1.0]).is_err());
        assert!(index.is_empty());
        index.check_consistency().unwrap();
    }

    #[test]
    fn test_invalid_filename_appends_nothing() {
        let dir = TempDir::new().unwrap();
        let mut index = open(&dir);
        assert!(index.insert("a/b.pdf", "x".into(), &[1.0; DIM]).is_err());
        assert_eq!(index.vectors.len(), 0);
    }

    #[test]
    fn test_flush_then_reopen_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut index = open(&dir);
        index.insert("a.pdf", "alpha".into(), &[1.0, 0.0, 0.0, 0.0]).unwrap();
        index.insert("b.pdf", "beta".into(), &[0.0, 1.0, 1.0, 0.0]).unwrap();
        assert!(index.flush().unwrap());
        assert!(!index.flush().unwrap());

        let reopened = open(&dir);
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.generation, 1);
        assert_eq!(reopened.find_by_filename("b.pdf").unwrap().text, "beta");
        for position in 0..2 {
            let a = index.vector(position).unwrap();
            let b = reopened.vector(position).unwrap();
            assert!(a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-6));
        }
    }

    #[test]
    fn test_close_flushes_pending_changes() {
        let dir = TempDir::new().unwrap();
        let mut index = open(&dir);
        index.insert("a.pdf", "alpha".into(), &[1.0, 0.0, 0.0, 0.0]).unwrap();
        index.close().unwrap();
        assert_eq!(open(&dir).len(), 1);
    }

    #[test]
    fn test_open_missing_committed_vector_file_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let mut index = open(&dir);
        index.insert("a.pdf", "alpha".into(), &[1.0, 0.0, 0.0, 0.0]).unwrap();
        index.flush().unwrap();
        std::fs::remove_file(index.vector_path()).unwrap();

        let err = ResumeIndex::open(dir.path().join("store"), DIM).unwrap_err();
        assert!(matches!(err, IndexError::CorruptStore(_)));
    }

    #[test]
    fn test_open_ignores_uncommitted_vector_files() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("store");
        let mut orphan = FlatIndex::create_empty(DIM);
        orphan.add(&[1.0, 0.0, 0.0, 0.0]).unwrap();
        orphan.set_generation(1);
        orphan.save(&store.join(vector_file_name(1))).unwrap();

        let index = ResumeIndex::open(&store, DIM).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_open_detects_generation_mismatch() {
        let dir = TempDir::new().unwrap();
        let mut index = open(&dir);
        index.insert("a.pdf", "alpha".into(), &[1.0, 0.0, 0.0, 0.0]).unwrap();
        index.flush().unwrap();

        let mut stale = index.vectors.clone();
        stale.set_generation(99);
        stale.save(&index.vector_path()).unwrap();

        let err = ResumeIndex::open(dir.path().join("store"), DIM).unwrap_err();
        assert!(matches!(err, IndexError::CorruptStore(_)));
    }

    #[test]
    fn test_open_detects_size_divergence() {
        let dir = TempDir::new().unwrap();
        let mut index = open(&dir);
        index.insert("a.pdf", "alpha".into(), &[1.0, 0.0, 0.0, 0.0]).unwrap();
        index.flush().unwrap();

        let mut grown = index.vectors.clone();
        grown.add(&[0.0, 1.0, 0.0, 0.0]).unwrap();
        grown.save(&index.vector_path()).unwrap();

        let err = ResumeIndex::open(dir.path().join("store"), DIM).unwrap_err();
        assert!(matches!(err, IndexError::CorruptStore(_)));
    }

    #[test]
    fn test_failed_metadata_commit_leaves_store_openable() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("store");
        let mut index = open(&dir);
        // A non-empty directory in the way makes the metadata rename fail.
        let blocker = store.join(METADATA_FILE);
        std::fs::create_dir_all(blocker.join("held")).unwrap();

        index.insert("a.pdf", "alpha".into(), &[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert!(index.flush().is_err());
        assert!(!store.join(vector_file_name(1)).exists());
        assert_eq!(index.generation(), 0);

        std::fs::remove_dir_all(&blocker).unwrap();
        let reopened = ResumeIndex::open(&store, DIM).unwrap();
        assert!(reopened.is_empty());

        // Still dirty, so the next flush commits the pending entry.
        assert!(index.flush().unwrap());
        assert_eq!(ResumeIndex::open(&store, DIM).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_vector_write_keeps_previous_generation() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("store");
        let mut index = open(&dir);
        index.insert("a.pdf", "alpha".into(), &[1.0, 0.0, 0.0, 0.0]).unwrap();
        index.flush().unwrap();

        std::fs::create_dir_all(store.join(vector_file_name(2)).join("held")).unwrap();
        index.insert("b.pdf", "beta".into(), &[0.0, 1.0, 0.0, 0.0]).unwrap();
        assert!(index.flush().is_err());

        let reopened = ResumeIndex::open(&store, DIM).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.generation(), 1);
        assert_eq!(reopened.find_by_filename("a.pdf").unwrap().text, "alpha");
    }

    #[test]
    fn test_flush_removes_superseded_vector_files() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("store");
        let mut index = open(&dir);
        index.insert("a.pdf", "alpha".into(), &[1.0, 0.0, 0.0, 0.0]).unwrap();
        index.flush().unwrap();
        index.insert("b.pdf", "beta".into(), &[0.0, 1.0, 0.0, 0.0]).unwrap();
        index.flush().unwrap();

        assert!(!store.join(vector_file_name(1)).exists());
        assert!(store.join(vector_file_name(2)).exists());
        assert_eq!(ResumeIndex::open(&store, DIM).unwrap().len(), 2);
    }

    #[test]
    fn test_replace_updates_both_halves_in_place() {
        let dir = TempDir::new().unwrap();
        let mut index = open(&dir);
        index.insert("a.pdf", "alpha".into(), &[1.0, 0.0, 0.0, 0.0]).unwrap();
        index.insert("b.pdf", "beta".into(), &[0.0, 1.0, 0.0, 0.0]).unwrap();

        let record = index.replace(0, "gamma".into(), &[0.0, 0.0, 2.0, 0.0]).unwrap();
        assert_eq!(record.filename, "a.pdf");
        assert_eq!(index.len(), 2);
        assert_eq!(index.vector(0).unwrap(), &[0.0, 0.0, 1.0, 0.0]);
        assert_eq!(index.find_by_filename("a.pdf").unwrap().text, "gamma");
        index.check_consistency().unwrap();
    }

    #[test]
    fn test_replace_with_degenerate_embedding_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut index = open(&dir);
        index.insert("a.pdf", "alpha".into(), &[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert!(index.replace(0, String::new(), &[0.0; DIM]).is_err());
        assert!(index.replace(5, "x".into(), &[1.0; DIM]).is_err());
        assert_eq!(index.find_by_filename("a.pdf").unwrap().text, "alpha");
        assert_eq!(index.vector(0).unwrap(), &[1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_reset_commits_empty_store_over_leftovers() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("store");
        let mut index = open(&dir);
        index.insert("a.pdf", "alpha".into(), &[1.0, 0.0, 0.0, 0.0]).unwrap();
        index.flush().unwrap();
        // The committed vector file vanished while metadata survived.
        std::fs::remove_file(index.vector_path()).unwrap();

        index.reset().unwrap();
        assert!(index.is_empty());
        let reopened = ResumeIndex::open(&store, DIM).unwrap();
        assert!(reopened.is_empty());
        assert_eq!(reopened.generation(), 2);
    }

    #[test]
    fn test_vector_file_names() {
        assert_eq!(vector_file_name(12), "index.12.vec");
        assert!(is_vector_file("index.3.vec"));
        assert!(!is_vector_file("index.vec"));
        assert!(!is_vector_file("index.x.vec"));
        assert!(!is_vector_file("metadata.json"));
    }

    #[test]
    fn test_open_rejects_other_dimension() {
        let dir = TempDir::new().unwrap();
        let mut index = open(&dir);
        index.insert("a.pdf", "alpha".into(), &[1.0, 0.0, 0.0, 0.0]).unwrap();
        index.flush().unwrap();

        let err = ResumeIndex::open(dir.path().join("store"), 8).unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_search_scores_equal_inner_products() {
        let dir = TempDir::new().unwrap();
        let mut index = open(&dir);
        index.insert("a.pdf", "alpha".into(), &[1.0, 0.1, 0.0, 0.0]).unwrap();
        index.insert("b.pdf", "beta".into(), &[0.0, 1.0, 0.0, 0.0]).unwrap();
        index.insert("c.pdf", "gamma".into(), &[0.0, 0.0, 1.0, 1.0]).unwrap();

        let matches = index.search(&[2.0, 0.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].filename, "a.pdf");
        assert!(matches[0].score >= matches[1].score);

        let query = normalize(&[2.0, 0.0, 0.0, 0.0]).unwrap();
        for m in &matches {
            let expected = inner_product(&query, index.vector(m.position).unwrap());
            assert!((m.score - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_clear_empties_memory() {
        let dir = TempDir::new().unwrap();
        let mut index = open(&dir);
        index.insert("a.pdf", "alpha".into(), &[1.0, 0.0, 0.0, 0.0]).unwrap();
        index.clear();
        assert!(index.is_empty());
        assert!(!index.flush().unwrap());
    }

    #[test]
    fn test_write_atomic_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("file.bin");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
    }
}
