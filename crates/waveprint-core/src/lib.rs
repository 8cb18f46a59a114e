//! Waveprint Core - Landmark Audio Fingerprinting Library
//!
//! This crate converts audio into sparse 32-bit landmark fingerprints
//! through a bounded-memory chunked DSP pipeline, and ranks indexed works
//! by time-offset alignment against a fingerprint store.

pub mod config;
pub mod dsp;
pub mod error;
pub mod fingerprint;
pub mod matcher;
pub mod peaks;
pub mod pipeline;
pub mod settings;
pub mod spectrogram;
pub mod store;
pub mod transcoder;
pub mod wav;

pub use config::{EngineConfig, TRANSCODE_SAMPLE_RATE};
pub use error::{EngineError, StoreError};
pub use fingerprint::{pack_address, unpack_address, FingerprintEntry, FingerprintRecord};
pub use matcher::{MatchOutcome, MatchResult, Matcher};
pub use peaks::Peak;
pub use pipeline::{fingerprint_file, fingerprint_samples, CancelToken};
pub use settings::Settings;
pub use store::{work_key, DocFormat, DocumentStore, MemoryStore, Store, Work};
pub use transcoder::Transcoder;
