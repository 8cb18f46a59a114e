//! JSON output formatting and byte pretty-printing

use serde::Serialize;
use waveprint_core::MatchResult;

#[derive(Serialize)]
struct MatchReport<'a> {
    query_path: &'a str,
    sample_fingerprints: usize,
    search_time_ms: u128,
    matches: &'a [MatchResult],
}

/// Print the ranked matches of one query as pretty JSON.
pub fn print_match_report(
    query_path: &str,
    sample_fingerprints: usize,
    search_time_ms: u128,
    matches: &[MatchResult],
) {
    let report = MatchReport {
        query_path,
        sample_fingerprints,
        search_time_ms,
        matches,
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("error serializing results: {}", e),
    }
}

/// Human-readable byte count.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1 << 10;
    const MB: u64 = 1 << 20;
    const GB: u64 = 1 << 30;

    match bytes {
        b if b >= GB => format!("{:.1} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.1} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1} KB", b as f64 / KB as f64),
        b => format!("{} B", b),
    }
}
