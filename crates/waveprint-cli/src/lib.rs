//! Shared helpers for the waveprint command-line tools.

pub mod output;
pub mod settings_loader;
