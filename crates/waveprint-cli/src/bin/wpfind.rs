//! wpfind - match an audio sample against the fingerprint store
//!
//! Usage: wpfind [OPTIONS] <sample>

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashMap;
use std::path::Path;
use waveprint_cli::output::print_match_report;
use waveprint_cli::settings_loader::load_settings;
use waveprint_core::{DocumentStore, Matcher, Transcoder};

#[derive(Parser, Debug)]
#[command(name = "wpfind")]
#[command(about = "Match an audio sample against the fingerprint store", long_about = None)]
struct Args {
    /// Audio sample to identify
    sample: String,

    /// Maximum number of results to return
    #[arg(short, long)]
    limit: Option<usize>,

    /// Path to settings file (TOML)
    #[arg(short, long)]
    settings: Option<String>,

    /// Preset override (music or audiobook)
    #[arg(short, long)]
    preset: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // default to no logs so the JSON output stays machine-parseable
    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    let mut settings = load_settings(args.settings.as_deref())?;
    if let Some(preset) = &args.preset {
        settings.preset = preset.clone();
        settings.fingerprint = None;
    }

    let config = settings.engine_config()?;
    let transcoder = Transcoder::new(
        &settings.transcoder.probe_bin,
        &settings.transcoder.transcode_bin,
    );
    let store = DocumentStore::open(&settings.store.base_directory, settings.store.format)?;

    let sample_path = Path::new(&args.sample);
    if !sample_path.exists() {
        anyhow::bail!("sample not found: {}", sample_path.display());
    }

    // work id 0 is a throwaway: query fingerprints never reach the store
    let fingerprints = waveprint_core::fingerprint_file(sample_path, 0, &config, &transcoder, None)
        .with_context(|| format!("failed to fingerprint {}", sample_path.display()))?;

    let sample: HashMap<u32, u32> = fingerprints
        .iter()
        .map(|(&address, entry)| (address, entry.anchor_time_ms))
        .collect();
    log::info!("sample yielded {} fingerprints", sample.len());

    let limit = args.limit.unwrap_or(settings.matching.max_results);
    let matcher = Matcher::new(&store).with_min_score(settings.matching.min_score);
    let outcome = matcher.query(&sample, limit)?;

    log::info!(
        "search finished in {:?} with {} result(s)",
        outcome.search_duration,
        outcome.results.len()
    );

    print_match_report(
        &args.sample,
        sample.len(),
        outcome.search_duration.as_millis(),
        &outcome.results,
    );
    Ok(())
}
