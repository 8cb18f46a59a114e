//! Store adapter: the narrow persistence contract the engine consumes
//!
//! The persisted index is an inverted map `address -> [(anchor_ms,
//! work_id)]` across all works plus per-work metadata. Two backends are
//! provided: a volatile in-memory store, and a document store keeping one
//! JSON/BSON file per work under a base directory so state survives
//! process restart. The whole corpus is loaded in parallel at open.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use waveprint_fp::{DocRecord, WorkDocument};

use crate::error::StoreError;
use crate::fingerprint::FingerprintRecord;

/// Registered work metadata.
#[derive(Debug, Clone)]
pub struct Work {
    pub id: u32,
    pub title: String,
    pub author: String,
    pub key: String,
}

/// Dedup key for a work: normalized title and author joined by `---`.
pub fn work_key(title: &str, author: &str) -> String {
    format!("{}---{}", normalize(title), normalize(author))
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Narrow persistence contract consumed by the chunked driver (writes)
/// and the matcher (batched address lookups). Implementations must be
/// safe for concurrent callers; no transactional model beyond single-call
/// atomicity is assumed.
pub trait Store: Send + Sync {
    /// Atomically allocate a fresh work id, rejecting duplicate keys.
    fn register_work(&self, title: &str, author: &str, key: &str) -> Result<u32, StoreError>;

    /// Remove the work's metadata and all of its fingerprints (best effort).
    fn delete_work(&self, work_id: u32) -> Result<(), StoreError>;

    /// Persist fingerprint records. Replacement is idempotent per
    /// `(address, work_id)` pair.
    fn store_fingerprints(&self, records: &[FingerprintRecord]) -> Result<(), StoreError>;

    /// Batched inverted-index lookup; absent addresses are omitted from
    /// the result.
    fn lookup_addresses(
        &self,
        addresses: &[u32],
    ) -> Result<HashMap<u32, Vec<(u32, u32)>>, StoreError>;

    /// Metadata for one work, if registered.
    fn get_work(&self, work_id: u32) -> Result<Option<Work>, StoreError>;

    /// Work id registered under `key`, if any.
    fn get_work_by_key(&self, key: &str) -> Result<Option<u32>, StoreError>;

    fn total_works(&self) -> Result<u64, StoreError>;

    fn total_fingerprints(&self) -> Result<u64, StoreError>;
}

/// Shared index kept by both backends.
#[derive(Debug)]
struct StoreIndex {
    works: HashMap<u32, Work>,
    by_key: HashMap<String, u32>,
    /// address -> (anchor_ms, work_id)
    inverted: HashMap<u32, Vec<(u32, u32)>>,
    /// work -> address -> anchor_ms
    per_work: HashMap<u32, HashMap<u32, u32>>,
    next_id: u32,
}

impl StoreIndex {
    fn new() -> Self {
        Self {
            works: HashMap::new(),
            by_key: HashMap::new(),
            inverted: HashMap::new(),
            per_work: HashMap::new(),
            next_id: 1,
        }
    }

    fn register(&mut self, title: &str, author: &str, key: &str) -> Result<u32, StoreError> {
        if self.by_key.contains_key(key) {
            return Err(StoreError::Duplicate(key.to_string()));
        }

        let id = self.next_id;
        self.next_id += 1;
        self.works.insert(
            id,
            Work {
                id,
                title: title.to_string(),
                author: author.to_string(),
                key: key.to_string(),
            },
        );
        self.by_key.insert(key.to_string(), id);
        Ok(id)
    }

    fn insert_record(&mut self, record: &FingerprintRecord) {
        let entries = self.inverted.entry(record.address).or_default();
        match entries.iter_mut().find(|(_, work)| *work == record.work_id) {
            Some(entry) => entry.0 = record.anchor_time_ms,
            None => entries.push((record.anchor_time_ms, record.work_id)),
        }

        self.per_work
            .entry(record.work_id)
            .or_default()
            .insert(record.address, record.anchor_time_ms);
    }

    fn remove_work(&mut self, work_id: u32) {
        if let Some(work) = self.works.remove(&work_id) {
            self.by_key.remove(&work.key);
        }
        if let Some(addresses) = self.per_work.remove(&work_id) {
            for address in addresses.keys() {
                if let Some(entries) = self.inverted.get_mut(address) {
                    entries.retain(|&(_, work)| work != work_id);
                    if entries.is_empty() {
                        self.inverted.remove(address);
                    }
                }
            }
        }
    }

    fn lookup(&self, addresses: &[u32]) -> HashMap<u32, Vec<(u32, u32)>> {
        let mut hits = HashMap::new();
        for &address in addresses {
            if let Some(entries) = self.inverted.get(&address) {
                hits.insert(address, entries.clone());
            }
        }
        hits
    }

    fn total_fingerprints(&self) -> u64 {
        self.per_work.values().map(|m| m.len() as u64).sum()
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> Result<std::sync::RwLockReadGuard<'_, T>, StoreError> {
    lock.read()
        .map_err(|_| StoreError::Io("store lock poisoned".into()))
}

fn write_lock<T>(lock: &RwLock<T>) -> Result<std::sync::RwLockWriteGuard<'_, T>, StoreError> {
    lock.write()
        .map_err(|_| StoreError::Io("store lock poisoned".into()))
}

/// Volatile backend for tests and ephemeral sessions.
pub struct MemoryStore {
    inner: RwLock<StoreIndex>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreIndex::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn register_work(&self, title: &str, author: &str, key: &str) -> Result<u32, StoreError> {
        write_lock(&self.inner)?.register(title, author, key)
    }

    fn delete_work(&self, work_id: u32) -> Result<(), StoreError> {
        write_lock(&self.inner)?.remove_work(work_id);
        Ok(())
    }

    fn store_fingerprints(&self, records: &[FingerprintRecord]) -> Result<(), StoreError> {
        let mut index = write_lock(&self.inner)?;
        for record in records {
            index.insert_record(record);
        }
        Ok(())
    }

    fn lookup_addresses(
        &self,
        addresses: &[u32],
    ) -> Result<HashMap<u32, Vec<(u32, u32)>>, StoreError> {
        Ok(read_lock(&self.inner)?.lookup(addresses))
    }

    fn get_work(&self, work_id: u32) -> Result<Option<Work>, StoreError> {
        Ok(read_lock(&self.inner)?.works.get(&work_id).cloned())
    }

    fn get_work_by_key(&self, key: &str) -> Result<Option<u32>, StoreError> {
        Ok(read_lock(&self.inner)?.by_key.get(key).copied())
    }

    fn total_works(&self) -> Result<u64, StoreError> {
        Ok(read_lock(&self.inner)?.works.len() as u64)
    }

    fn total_fingerprints(&self) -> Result<u64, StoreError> {
        Ok(read_lock(&self.inner)?.total_fingerprints())
    }
}

/// On-disk codec for work documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocFormat {
    Json,
    Bson,
    /// Read either extension; write JSON.
    Auto,
}

impl Default for DocFormat {
    fn default() -> Self {
        DocFormat::Auto
    }
}

/// Durable backend keeping one fingerprint document per work under a
/// base directory.
pub struct DocumentStore {
    base_dir: PathBuf,
    format: DocFormat,
    inner: RwLock<StoreIndex>,
}

impl DocumentStore {
    /// Open a document store rooted at `base_dir`, creating the directory
    /// if needed and loading every existing work document.
    pub fn open(base_dir: impl Into<PathBuf>, format: DocFormat) -> Result<Self, StoreError> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)
            .map_err(|e| StoreError::Io(format!("failed to create {}: {}", base_dir.display(), e)))?;

        let paths: Vec<PathBuf> = std::fs::read_dir(&base_dir)
            .map_err(|e| StoreError::Io(format!("failed to read {}: {}", base_dir.display(), e)))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|s| s.to_str()),
                    Some("json") | Some("bson")
                )
            })
            .collect();

        let documents: Vec<WorkDocument> = paths
            .par_iter()
            .filter_map(|path| match WorkDocument::load_auto(path) {
                Ok(doc) => Some(doc),
                Err(err) => {
                    log::warn!("skipping unreadable document {}: {}", path.display(), err);
                    None
                }
            })
            .collect();

        let mut index = StoreIndex::new();
        for doc in documents {
            let work_id = doc.work.id;
            index.next_id = index.next_id.max(work_id + 1);
            index.by_key.insert(doc.work.key.clone(), work_id);
            index.works.insert(
                work_id,
                Work {
                    id: work_id,
                    title: doc.work.title,
                    author: doc.work.author,
                    key: doc.work.key,
                },
            );
            for record in &doc.records {
                index.insert_record(&FingerprintRecord {
                    address: record.address,
                    anchor_time_ms: record.anchor_ms,
                    work_id,
                });
            }
        }

        log::info!(
            "opened store at {}: {} works, {} fingerprints",
            base_dir.display(),
            index.works.len(),
            index.total_fingerprints()
        );

        Ok(Self {
            base_dir,
            format,
            inner: RwLock::new(index),
        })
    }

    fn document_path(&self, work_id: u32) -> PathBuf {
        let ext = match self.format {
            DocFormat::Bson => "bson",
            _ => "json",
        };
        self.base_dir.join(format!("{}.{}", work_id, ext))
    }

    fn write_document(&self, index: &StoreIndex, work_id: u32) -> Result<(), StoreError> {
        let work = index
            .works
            .get(&work_id)
            .ok_or_else(|| StoreError::Io(format!("unknown work {}", work_id)))?;

        let mut doc = WorkDocument::new(
            work.id,
            work.title.clone(),
            work.author.clone(),
            work.key.clone(),
        );
        if let Some(addresses) = index.per_work.get(&work_id) {
            let mut records: Vec<DocRecord> = addresses
                .iter()
                .map(|(&address, &anchor_ms)| DocRecord { address, anchor_ms })
                .collect();
            records.sort_by_key(|record| record.address);
            doc.set_records(records);
        }

        let path = self.document_path(work_id);
        let saved = match self.format {
            DocFormat::Bson => doc.save_bson(&path),
            _ => doc.save(&path),
        };
        saved.map_err(|e| StoreError::Io(format!("failed to write {}: {}", path.display(), e)))
    }
}

impl Store for DocumentStore {
    fn register_work(&self, title: &str, author: &str, key: &str) -> Result<u32, StoreError> {
        let mut index = write_lock(&self.inner)?;
        let work_id = index.register(title, author, key)?;

        // persist the reservation so ids stay unique across restarts
        if let Err(err) = self.write_document(&index, work_id) {
            index.remove_work(work_id);
            return Err(err);
        }
        Ok(work_id)
    }

    fn delete_work(&self, work_id: u32) -> Result<(), StoreError> {
        let mut index = write_lock(&self.inner)?;
        index.remove_work(work_id);
        for ext in ["json", "bson"] {
            let _ = std::fs::remove_file(self.base_dir.join(format!("{}.{}", work_id, ext)));
        }
        Ok(())
    }

    fn store_fingerprints(&self, records: &[FingerprintRecord]) -> Result<(), StoreError> {
        let mut index = write_lock(&self.inner)?;

        let mut touched: Vec<u32> = Vec::new();
        for record in records {
            if !index.works.contains_key(&record.work_id) {
                return Err(StoreError::Io(format!(
                    "fingerprints reference unregistered work {}",
                    record.work_id
                )));
            }
            index.insert_record(record);
            if !touched.contains(&record.work_id) {
                touched.push(record.work_id);
            }
        }

        for work_id in touched {
            self.write_document(&index, work_id)?;
        }
        Ok(())
    }

    fn lookup_addresses(
        &self,
        addresses: &[u32],
    ) -> Result<HashMap<u32, Vec<(u32, u32)>>, StoreError> {
        Ok(read_lock(&self.inner)?.lookup(addresses))
    }

    fn get_work(&self, work_id: u32) -> Result<Option<Work>, StoreError> {
        Ok(read_lock(&self.inner)?.works.get(&work_id).cloned())
    }

    fn get_work_by_key(&self, key: &str) -> Result<Option<u32>, StoreError> {
        Ok(read_lock(&self.inner)?.by_key.get(key).copied())
    }

    fn total_works(&self) -> Result<u64, StoreError> {
        Ok(read_lock(&self.inner)?.works.len() as u64)
    }

    fn total_fingerprints(&self) -> Result<u64, StoreError> {
        Ok(read_lock(&self.inner)?.total_fingerprints())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(address: u32, anchor_time_ms: u32, work_id: u32) -> FingerprintRecord {
        FingerprintRecord {
            address,
            anchor_time_ms,
            work_id,
        }
    }

    #[test]
    fn test_work_key_normalization() {
        assert_eq!(
            work_key("  The  Raven ", "Edgar Allan POE"),
            "the raven---edgar allan poe"
        );
        assert_eq!(work_key("A", "B"), work_key("a", "  b "));
    }

    #[test]
    fn test_memory_register_and_duplicate() {
        let store = MemoryStore::new();
        let id = store.register_work("T", "A", "t---a").unwrap();
        assert_eq!(id, 1);
        assert_eq!(store.get_work_by_key("t---a").unwrap(), Some(id));

        let err = store.register_work("T", "A", "t---a").unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        // a different key gets the next id
        assert_eq!(store.register_work("U", "A", "u---a").unwrap(), 2);
    }

    #[test]
    fn test_memory_lookup_omits_absent_addresses() {
        let store = MemoryStore::new();
        let id = store.register_work("T", "A", "t---a").unwrap();
        store
            .store_fingerprints(&[record(10, 100, id), record(20, 200, id)])
            .unwrap();

        let hits = store.lookup_addresses(&[10, 30]).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[&10], vec![(100, id)]);
    }

    #[test]
    fn test_memory_replace_is_idempotent() {
        let store = MemoryStore::new();
        let id = store.register_work("T", "A", "t---a").unwrap();

        store.store_fingerprints(&[record(10, 100, id)]).unwrap();
        store.store_fingerprints(&[record(10, 100, id)]).unwrap();
        store.store_fingerprints(&[record(10, 900, id)]).unwrap();

        assert_eq!(store.total_fingerprints().unwrap(), 1);
        let hits = store.lookup_addresses(&[10]).unwrap();
        assert_eq!(hits[&10], vec![(900, id)]);
    }

    #[test]
    fn test_memory_addresses_hold_multiple_works() {
        let store = MemoryStore::new();
        let first = store.register_work("T", "A", "t---a").unwrap();
        let second = store.register_work("U", "B", "u---b").unwrap();

        store
            .store_fingerprints(&[record(10, 100, first), record(10, 250, second)])
            .unwrap();

        let hits = store.lookup_addresses(&[10]).unwrap();
        assert_eq!(hits[&10].len(), 2);
        assert!(hits[&10].contains(&(100, first)));
        assert!(hits[&10].contains(&(250, second)));
    }

    #[test]
    fn test_memory_delete_work() {
        let store = MemoryStore::new();
        let keep = store.register_work("T", "A", "t---a").unwrap();
        let gone = store.register_work("U", "B", "u---b").unwrap();

        store
            .store_fingerprints(&[
                record(10, 100, keep),
                record(10, 250, gone),
                record(20, 300, gone),
            ])
            .unwrap();

        store.delete_work(gone).unwrap();

        assert_eq!(store.total_works().unwrap(), 1);
        assert_eq!(store.total_fingerprints().unwrap(), 1);
        assert!(store.get_work(gone).unwrap().is_none());
        assert_eq!(store.get_work_by_key("u---b").unwrap(), None);

        let hits = store.lookup_addresses(&[10, 20]).unwrap();
        assert_eq!(hits[&10], vec![(100, keep)]);
        assert!(!hits.contains_key(&20));
    }

    fn temp_store_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "waveprint_store_{}_{}",
            tag,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_document_store_survives_reopen() {
        let dir = temp_store_dir("reopen");

        let first_id;
        {
            let store = DocumentStore::open(&dir, DocFormat::Json).unwrap();
            first_id = store.register_work("Tape A", "X", "tape a---x").unwrap();
            store
                .store_fingerprints(&[record(11, 110, first_id), record(22, 220, first_id)])
                .unwrap();
        }

        let store = DocumentStore::open(&dir, DocFormat::Json).unwrap();
        assert_eq!(store.total_works().unwrap(), 1);
        assert_eq!(store.total_fingerprints().unwrap(), 2);
        assert_eq!(store.get_work_by_key("tape a---x").unwrap(), Some(first_id));

        let work = store.get_work(first_id).unwrap().unwrap();
        assert_eq!(work.title, "Tape A");

        let hits = store.lookup_addresses(&[11, 22, 33]).unwrap();
        assert_eq!(hits[&11], vec![(110, first_id)]);
        assert_eq!(hits[&22], vec![(220, first_id)]);
        assert!(!hits.contains_key(&33));

        // id allocation continues past what is on disk
        let next = store.register_work("Tape B", "X", "tape b---x").unwrap();
        assert_eq!(next, first_id + 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_document_store_bson_round_trip() {
        let dir = temp_store_dir("bson");

        {
            let store = DocumentStore::open(&dir, DocFormat::Bson).unwrap();
            let id = store.register_work("Compact", "Y", "compact---y").unwrap();
            store.store_fingerprints(&[record(77, 700, id)]).unwrap();
            assert!(dir.join(format!("{}.bson", id)).exists());
        }

        let store = DocumentStore::open(&dir, DocFormat::Auto).unwrap();
        assert_eq!(store.total_fingerprints().unwrap(), 1);
        let hits = store.lookup_addresses(&[77]).unwrap();
        assert_eq!(hits[&77].len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_document_store_delete_removes_file() {
        let dir = temp_store_dir("delete");

        let store = DocumentStore::open(&dir, DocFormat::Json).unwrap();
        let id = store.register_work("Gone", "Z", "gone---z").unwrap();
        store.store_fingerprints(&[record(5, 50, id)]).unwrap();

        let path = dir.join(format!("{}.json", id));
        assert!(path.exists());

        store.delete_work(id).unwrap();
        assert!(!path.exists());
        assert_eq!(store.total_works().unwrap(), 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_document_store_rejects_unregistered_work() {
        let dir = temp_store_dir("orphan");

        let store = DocumentStore::open(&dir, DocFormat::Json).unwrap();
        let err = store.store_fingerprints(&[record(1, 10, 99)]).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
