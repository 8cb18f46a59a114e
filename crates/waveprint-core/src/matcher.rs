//! Offset-histogram matching of query fingerprints against the store
//!
//! Every query address hit contributes one vote to a per-work histogram
//! of `db_anchor - query_anchor` time deltas. A genuine match concentrates
//! its votes in one delta bucket; the bucket size is the score.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::EngineError;
use crate::store::Store;

/// Minimum dominant-bucket size for a candidate to be reported.
pub const MIN_SCORE: f64 = 5.0;

/// Default cap on returned results.
pub const DEFAULT_LIMIT: usize = 20;

/// A ranked candidate work.
///
/// `score` is the size of the dominant time-offset bucket: a pure aligned
/// peak count, with no normalization applied. `timestamp_ms` is the
/// dominant bucket's delta itself: the offset into the work at which the
/// start of the sample aligns, clamped to zero for the degenerate
/// negative case. It is an alignment offset, not the stored anchor time
/// of any individual hit; the two differ whenever the sample's own
/// anchors do not start at zero.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub work_id: u32,
    pub title: String,
    pub author: String,
    pub score: f64,
    pub timestamp_ms: u32,
}

/// Outcome of one query: ranked matches plus the elapsed search time.
#[derive(Debug)]
pub struct MatchOutcome {
    pub results: Vec<MatchResult>,
    pub search_duration: Duration,
}

/// Matcher over a fingerprint store.
pub struct Matcher<'a> {
    store: &'a dyn Store,
    min_score: f64,
}

impl<'a> Matcher<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self {
            store,
            min_score: MIN_SCORE,
        }
    }

    /// Override the reporting threshold.
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    /// Rank works by time-offset alignment against the sample
    /// fingerprints (`address -> query anchor ms`), returning at most
    /// `limit` results. An empty result set is a valid outcome.
    pub fn query(
        &self,
        sample: &HashMap<u32, u32>,
        limit: usize,
    ) -> Result<MatchOutcome, EngineError> {
        let started = Instant::now();

        let addresses: Vec<u32> = sample.keys().copied().collect();
        let hits = self.store.lookup_addresses(&addresses)?;

        // counts[work][delta] = votes; deltas are true signed differences
        let mut counts: HashMap<u32, HashMap<i64, u32>> = HashMap::new();
        for (address, entries) in &hits {
            let query_anchor = match sample.get(address) {
                Some(&anchor) => anchor,
                None => continue,
            };
            for &(db_anchor, work_id) in entries {
                let delta = db_anchor as i64 - query_anchor as i64;
                *counts.entry(work_id).or_default().entry(delta).or_insert(0) += 1;
            }
        }

        let candidate_works = counts.len();

        // (work_id, peak_count, dominant delta)
        let mut candidates: Vec<(u32, u32, i64)> = Vec::new();
        for (work_id, buckets) in counts {
            let mut best: Option<(i64, u32)> = None;
            for (&delta, &count) in &buckets {
                let better = match best {
                    None => true,
                    // prefer the smaller delta among equal buckets
                    Some((best_delta, best_count)) => {
                        count > best_count || (count == best_count && delta < best_delta)
                    }
                };
                if better {
                    best = Some((delta, count));
                }
            }
            if let Some((delta, count)) = best {
                if count as f64 >= self.min_score {
                    candidates.push((work_id, count, delta));
                }
            }
        }

        // score descending, ties by smaller work id for stable output
        candidates.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut results = Vec::new();
        for (work_id, count, delta) in candidates {
            if results.len() >= limit {
                break;
            }
            match self.store.get_work(work_id)? {
                Some(work) => results.push(MatchResult {
                    work_id,
                    title: work.title,
                    author: work.author,
                    score: count as f64,
                    timestamp_ms: delta.max(0) as u32,
                }),
                None => log::debug!("dropping match for unknown work {}", work_id),
            }
        }

        let search_duration = started.elapsed();
        log::debug!(
            "query: {} sample addresses, {} candidate works, {} results in {:?}",
            sample.len(),
            candidate_works,
            results.len(),
            search_duration
        );

        Ok(MatchOutcome {
            results,
            search_duration,
        })
    }
}

#[cfg(test)]
mod tests;
