//! wpstats - fingerprint store statistics
//!
//! Usage: wpstats [OPTIONS]

use anyhow::Result;
use clap::Parser;
use waveprint_cli::output::format_bytes;
use waveprint_cli::settings_loader::load_settings;
use waveprint_core::{DocumentStore, Store};

/// Rough serialized size of one fingerprint record, used for the
/// storage estimate.
const BYTES_PER_FINGERPRINT: u64 = 20;

#[derive(Parser, Debug)]
#[command(name = "wpstats")]
#[command(about = "Show fingerprint store statistics", long_about = None)]
struct Args {
    /// Path to settings file (TOML)
    #[arg(short, long)]
    settings: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    let settings = load_settings(args.settings.as_deref())?;
    let store = DocumentStore::open(&settings.store.base_directory, settings.store.format)?;

    let total_works = store.total_works()?;
    let total_fingerprints = store.total_fingerprints()?;

    let stats = serde_json::json!({
        "store_directory": settings.store.base_directory,
        "total_works": total_works,
        "total_fingerprints": total_fingerprints,
        "storage_estimate": format_bytes(total_fingerprints * BYTES_PER_FINGERPRINT),
    });

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
