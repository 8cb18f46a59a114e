//! Settings resolution shared by the binaries

use anyhow::Result;
use std::path::Path;
use waveprint_core::Settings;

/// Default settings file looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "waveprint.toml";

/// Load settings from an explicit path, the default file if it exists,
/// or the built-in defaults.
pub fn load_settings(path: Option<&str>) -> Result<Settings> {
    match path {
        Some(p) => Settings::load(Path::new(p)),
        None => {
            let default = Path::new(DEFAULT_SETTINGS_FILE);
            if default.exists() {
                Settings::load(default)
            } else {
                Ok(Settings::default())
            }
        }
    }
}
