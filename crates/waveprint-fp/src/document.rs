//! Document structures and codecs

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current document format version
pub const FORMAT_VERSION: &str = "1.0";

/// Complete per-work fingerprint document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkDocument {
    pub version: String,
    pub work: DocWork,
    pub num_records: usize,
    pub records: Vec<DocRecord>,
}

/// Work metadata embedded in a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocWork {
    pub id: u32,
    pub title: String,
    pub author: String,
    /// Normalized dedup key derived from title and author
    pub key: String,
    pub created_at: String,
}

/// One stored fingerprint: a 32-bit landmark address and the anchor
/// offset within the work, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocRecord {
    pub address: u32,
    pub anchor_ms: u32,
}

impl WorkDocument {
    /// Create an empty document for a freshly registered work
    pub fn new(id: u32, title: String, author: String, key: String) -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            work: DocWork {
                id,
                title,
                author,
                key,
                created_at: chrono::Utc::now().to_rfc3339(),
            },
            num_records: 0,
            records: Vec::new(),
        }
    }

    /// Replace the record list, keeping `num_records` in sync
    pub fn set_records(&mut self, records: Vec<DocRecord>) {
        self.num_records = records.len();
        self.records = records;
    }

    /// Save to JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json_str = serde_json::to_string(self)?;
        std::fs::write(path, json_str)?;
        Ok(())
    }

    /// Load from JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json_str = std::fs::read_to_string(path)?;
        let doc: WorkDocument = serde_json::from_str(&json_str)?;
        Ok(doc)
    }

    /// Save to BSON file
    pub fn save_bson(&self, path: &Path) -> anyhow::Result<()> {
        let bson_data = bson::to_vec(self)?;
        std::fs::write(path, bson_data)?;
        Ok(())
    }

    /// Load from BSON file
    pub fn load_bson(path: &Path) -> anyhow::Result<Self> {
        let bson_data = std::fs::read(path)?;
        let doc: WorkDocument = bson::from_slice(&bson_data)?;
        Ok(doc)
    }

    /// Load from file, picking the codec from the extension
    pub fn load_auto(path: &Path) -> anyhow::Result<Self> {
        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("json");

        match extension {
            "bson" => Self::load_bson(path),
            _ => Self::load(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> WorkDocument {
        let mut doc = WorkDocument::new(
            7,
            "The Raven".to_string(),
            "Edgar Allan Poe".to_string(),
            "the raven---edgar allan poe".to_string(),
        );
        doc.set_records(vec![
            DocRecord { address: 0x1604_00FA, anchor_ms: 1000 },
            DocRecord { address: 0x0B02_802E, anchor_ms: 2500 },
        ]);
        doc
    }

    #[test]
    fn test_json_round_trip() {
        let doc = sample_document();

        let json_str = serde_json::to_string(&doc).unwrap();
        let loaded: WorkDocument = serde_json::from_str(&json_str).unwrap();

        assert_eq!(loaded.version, FORMAT_VERSION);
        assert_eq!(loaded.work.id, 7);
        assert_eq!(loaded.work.key, doc.work.key);
        assert_eq!(loaded.num_records, 2);
        assert_eq!(loaded.records, doc.records);
    }

    #[test]
    fn test_bson_round_trip() {
        let doc = sample_document();

        let bson_data = bson::to_vec(&doc).unwrap();
        let loaded: WorkDocument = bson::from_slice(&bson_data).unwrap();

        assert_eq!(loaded.work.title, doc.work.title);
        assert_eq!(loaded.work.author, doc.work.author);
        assert_eq!(loaded.records.len(), doc.records.len());
        assert_eq!(loaded.records[0], doc.records[0]);
    }

    #[test]
    fn test_set_records_updates_count() {
        let mut doc = sample_document();
        doc.set_records(Vec::new());
        assert_eq!(doc.num_records, 0);
        assert!(doc.records.is_empty());
    }
}
