//! wpindex - index audio files into the fingerprint store
//!
//! Usage: wpindex [OPTIONS] <path>   (a single file or a directory tree)

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use waveprint_cli::settings_loader::load_settings;
use waveprint_core::{
    work_key, DocumentStore, EngineConfig, FingerprintRecord, Store, Transcoder,
};

#[derive(Parser, Debug)]
#[command(name = "wpindex")]
#[command(about = "Index audio files into the fingerprint store", long_about = None)]
struct Args {
    /// Audio file or directory to index
    path: String,

    /// Title override (single-file mode; container tags win otherwise)
    #[arg(short, long)]
    title: Option<String>,

    /// Author override
    #[arg(short, long)]
    author: Option<String>,

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

const AUDIO_EXTENSIONS: &[&str] = &["wav", "m4a", "mp3", "flac", "ogg"];

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

    let root = Path::new(&args.path);
    if !root.exists() {
        anyhow::bail!("input not found: {}", root.display());
    }

    if root.is_file() {
        let summary = index_file(root, args.title, args.author, &store, &transcoder, &config)?;
        println!("{}", summary);
        return Ok(());
    }

    let files = collect_audio_files(root)?;
    if files.is_empty() {
        println!("no audio files under {}", root.display());
        return Ok(());
    }

    let workers = worker_count();
    log::info!("indexing {} files with {} workers", files.len(), workers);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("failed to build worker pool")?;

    let outcomes: Vec<Result<String>> = pool.install(|| {
        files
            .par_iter()
            .map(|file| index_file(file, None, None, &store, &transcoder, &config))
            .collect()
    });

    let mut succeeded = 0usize;
    let mut failed = 0usize;
    for outcome in outcomes {
        match outcome {
            Ok(line) => {
                succeeded += 1;
                println!("{}", line);
            }
            Err(err) => {
                failed += 1;
                eprintln!("error: {:#}", err);
            }
        }
    }

    println!(
        "\nprocessed {} files: {} successful, {} failed",
        files.len(),
        succeeded,
        failed
    );
    Ok(())
}

/// Half the machine, at least one: fingerprinting is CPU-bound and each
/// file also keeps a transcoder subprocess busy.
fn worker_count() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus / 2).max(1)
}

fn collect_audio_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir)
            .with_context(|| format!("failed to read directory {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase());
            if ext.as_deref().map(|e| AUDIO_EXTENSIONS.contains(&e)).unwrap_or(false) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

fn index_file(
    path: &Path,
    title: Option<String>,
    author: Option<String>,
    store: &DocumentStore,
    transcoder: &Transcoder,
    config: &EngineConfig,
) -> Result<String> {
    let tags = match transcoder.probe_tags(path) {
        Ok(tags) => tags,
        Err(err) => {
            log::warn!("could not read tags from {}: {}", path.display(), err);
            Default::default()
        }
    };

    let title = title
        .or_else(|| tags.get("title").cloned())
        .unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unknown".to_string())
        });
    let author = author
        .or_else(|| tags.get("artist").cloned())
        .unwrap_or_else(|| "unknown".to_string());

    let key = work_key(&title, &author);
    if store.get_work_by_key(&key)?.is_some() {
        anyhow::bail!("'{}' by '{}' already exists", title, author);
    }

    let work_id = store.register_work(&title, &author, &key)?;
    log::info!("registered '{}' by '{}' as work {}", title, author, work_id);

    let fingerprints = match waveprint_core::fingerprint_file(path, work_id, config, transcoder, None)
    {
        Ok(fingerprints) => fingerprints,
        Err(err) => {
            let _ = store.delete_work(work_id);
            return Err(err).with_context(|| format!("failed to fingerprint {}", path.display()));
        }
    };

    let records: Vec<FingerprintRecord> = fingerprints
        .iter()
        .map(|(&address, entry)| FingerprintRecord {
            address,
            anchor_time_ms: entry.anchor_time_ms,
            work_id: entry.work_id,
        })
        .collect();

    if let Err(err) = store.store_fingerprints(&records) {
        let _ = store.delete_work(work_id);
        return Err(err)
            .with_context(|| format!("failed to store fingerprints for {}", path.display()));
    }

    Ok(format!(
        "indexed '{}' by '{}' ({} fingerprints)",
        title,
        author,
        records.len()
    ))
}
