//! Waveprint fingerprint documents
//!
//! Per-work document format used by the filesystem-backed fingerprint
//! store: work metadata plus the complete address -> anchor record list,
//! serialized as JSON or BSON.

mod document;

pub use document::{DocRecord, DocWork, WorkDocument, FORMAT_VERSION};
