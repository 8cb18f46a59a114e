//! Tests for the offset-histogram matcher

use super::*;
use crate::config::{EngineConfig, TRANSCODE_SAMPLE_RATE};
use crate::error::StoreError;
use crate::fingerprint::{fingerprint_peaks, FingerprintEntry, FingerprintRecord};
use crate::peaks::Peak;
use crate::pipeline::fingerprint_samples;
use crate::store::{MemoryStore, Store, Work};

fn to_records(map: &HashMap<u32, FingerprintEntry>) -> Vec<FingerprintRecord> {
    map.iter()
        .map(|(&address, entry)| FingerprintRecord {
            address,
            anchor_time_ms: entry.anchor_time_ms,
            work_id: entry.work_id,
        })
        .collect()
}

fn to_sample(map: &HashMap<u32, FingerprintEntry>) -> HashMap<u32, u32> {
    map.iter()
        .map(|(&address, entry)| (address, entry.anchor_time_ms))
        .collect()
}

fn staircase_peaks(count: usize) -> Vec<Peak> {
    (0..count)
        .map(|i| Peak {
            freq_hz: 80.0 + 30.0 * i as f64,
            time_sec: 0.2 * i as f64,
        })
        .collect()
}

#[test]
fn test_self_identification() {
    let store = MemoryStore::new();
    let config = EngineConfig {
        target_zone_size: 3,
        ..EngineConfig::music()
    };

    let work_id = store
        .register_work("Nocturne", "Field", "nocturne---field")
        .unwrap();

    let fingerprints = fingerprint_peaks(&staircase_peaks(40), work_id, &config);
    store.store_fingerprints(&to_records(&fingerprints)).unwrap();

    let sample = to_sample(&fingerprints);
    let outcome = Matcher::new(&store).query(&sample, DEFAULT_LIMIT).unwrap();

    // querying a work with its own fingerprints puts every vote in the
    // zero-offset bucket
    assert_eq!(outcome.results.len(), 1);
    let top = &outcome.results[0];
    assert_eq!(top.work_id, work_id);
    assert_eq!(top.title, "Nocturne");
    assert_eq!(top.score, fingerprints.len() as f64);
    assert_eq!(top.timestamp_ms, 0);
}

#[test]
fn test_subset_query_monotonicity() {
    let store = MemoryStore::new();
    let config = EngineConfig {
        target_zone_size: 3,
        ..EngineConfig::music()
    };

    let work_id = store.register_work("Full", "Set", "full---set").unwrap();
    let fingerprints = fingerprint_peaks(&staircase_peaks(40), work_id, &config);
    store.store_fingerprints(&to_records(&fingerprints)).unwrap();

    let subset: HashMap<u32, u32> = to_sample(&fingerprints).into_iter().take(20).collect();
    let outcome = Matcher::new(&store).query(&subset, DEFAULT_LIMIT).unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert!(outcome.results[0].score >= subset.len() as f64);
}

#[test]
fn test_tie_breaks_by_smaller_work_id() {
    let store = MemoryStore::new();

    let first = store.register_work("First", "A", "first---a").unwrap();
    let second = store.register_work("Second", "B", "second---b").unwrap();
    assert!(first < second);

    // both works match the same 10 addresses at a consistent 4000 ms
    // offset; the sample anchors start mid-clip so the offset differs
    // from every stored anchor time
    let mut records = Vec::new();
    let mut sample = HashMap::new();
    for i in 0..10u32 {
        let address = 0x0100_0000 + i;
        sample.insert(address, i * 100 + 500);
        for work_id in [second, first] {
            records.push(FingerprintRecord {
                address,
                anchor_time_ms: i * 100 + 4500,
                work_id,
            });
        }
    }
    store.store_fingerprints(&records).unwrap();

    let outcome = Matcher::new(&store).query(&sample, DEFAULT_LIMIT).unwrap();
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.results[0].work_id, first);
    assert_eq!(outcome.results[1].work_id, second);
    assert_eq!(outcome.results[0].score, outcome.results[1].score);
    assert_eq!(outcome.results[0].timestamp_ms, 4000);
}

#[test]
fn test_timestamp_is_the_alignment_offset() {
    // mid-clip sample: query anchors start at 1000 ms and the work's
    // matching anchors at 4000 ms, so the alignment offset (3000 ms) and
    // the smallest stored anchor in the dominant bucket (4000 ms) are
    // different numbers; the reported timestamp is the offset
    let store = MemoryStore::new();
    let work_id = store.register_work("Mid", "Clip", "mid---clip").unwrap();

    let mut records = Vec::new();
    let mut sample = HashMap::new();
    for i in 0..8u32 {
        let address = 0x0400_0000 + i;
        sample.insert(address, 1000 + i * 100);
        records.push(FingerprintRecord {
            address,
            anchor_time_ms: 4000 + i * 100,
            work_id,
        });
    }
    store.store_fingerprints(&records).unwrap();

    let outcome = Matcher::new(&store).query(&sample, DEFAULT_LIMIT).unwrap();
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].score, 8.0);
    assert_eq!(outcome.results[0].timestamp_ms, 3000);
}

#[test]
fn test_min_score_filters_weak_candidates() {
    let store = MemoryStore::new();
    let work_id = store.register_work("Weak", "W", "weak---w").unwrap();

    let mut records = Vec::new();
    let mut sample = HashMap::new();
    for i in 0..3u32 {
        let address = 0x0200_0000 + i;
        sample.insert(address, i * 50);
        records.push(FingerprintRecord {
            address,
            anchor_time_ms: i * 50 + 1000,
            work_id,
        });
    }
    store.store_fingerprints(&records).unwrap();

    let outcome = Matcher::new(&store).query(&sample, DEFAULT_LIMIT).unwrap();
    assert!(outcome.results.is_empty());

    // the same three aligned votes pass once the threshold allows them
    let outcome = Matcher::new(&store)
        .with_min_score(3.0)
        .query(&sample, DEFAULT_LIMIT)
        .unwrap();
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].score, 3.0);
}

#[test]
fn test_limit_caps_results() {
    let store = MemoryStore::new();

    let mut records = Vec::new();
    let mut sample = HashMap::new();
    for work in 0..4u32 {
        let work_id = store
            .register_work(&format!("W{}", work), "X", &format!("w{}---x", work))
            .unwrap();
        for i in 0..(6 + work) {
            let address = 0x0300_0000 + work * 100 + i;
            sample.insert(address, i * 10);
            records.push(FingerprintRecord {
                address,
                anchor_time_ms: i * 10,
                work_id,
            });
        }
    }
    store.store_fingerprints(&records).unwrap();

    let outcome = Matcher::new(&store).query(&sample, 2).unwrap();
    assert_eq!(outcome.results.len(), 2);
    // the two largest aligned sets come back first
    assert!(outcome.results[0].score >= outcome.results[1].score);
}

#[test]
fn test_empty_sample_is_not_an_error() {
    let store = MemoryStore::new();
    let outcome = Matcher::new(&store).query(&HashMap::new(), DEFAULT_LIMIT).unwrap();
    assert!(outcome.results.is_empty());
}

/// Store stub that produces hits for a work that has no metadata.
struct OrphanStore;

impl Store for OrphanStore {
    fn register_work(&self, _: &str, _: &str, _: &str) -> Result<u32, StoreError> {
        unimplemented!()
    }

    fn delete_work(&self, _: u32) -> Result<(), StoreError> {
        Ok(())
    }

    fn store_fingerprints(&self, _: &[FingerprintRecord]) -> Result<(), StoreError> {
        Ok(())
    }

    fn lookup_addresses(
        &self,
        addresses: &[u32],
    ) -> Result<HashMap<u32, Vec<(u32, u32)>>, StoreError> {
        Ok(addresses
            .iter()
            .map(|&address| (address, vec![(500, 42)]))
            .collect())
    }

    fn get_work(&self, _: u32) -> Result<Option<Work>, StoreError> {
        Ok(None)
    }

    fn get_work_by_key(&self, _: &str) -> Result<Option<u32>, StoreError> {
        Ok(None)
    }

    fn total_works(&self) -> Result<u64, StoreError> {
        Ok(0)
    }

    fn total_fingerprints(&self) -> Result<u64, StoreError> {
        Ok(0)
    }
}

#[test]
fn test_results_without_metadata_are_dropped() {
    let sample: HashMap<u32, u32> = (0..10u32).map(|i| (i, 0)).collect();
    let outcome = Matcher::new(&OrphanStore).query(&sample, DEFAULT_LIMIT).unwrap();
    assert!(outcome.results.is_empty());
}

/// Five simultaneous staircase tones, one per analysis band of the music
/// preset, stepping at mutually coprime periods so the combined spectral
/// state never repeats within the signal.
fn staircase_signal(duration_sec: f64, rising: bool) -> Vec<f64> {
    const BASES: [f64; 5] = [115.0, 225.0, 445.0, 880.0, 1800.0];
    const STEPS: [f64; 5] = [6.0, 15.0, 30.0, 60.0, 60.0];
    const PERIODS: [f64; 5] = [0.23, 0.37, 0.41, 0.53, 0.61];
    const MODULI: [u64; 5] = [14, 13, 13, 13, 13];

    let rate = TRANSCODE_SAMPLE_RATE as f64;
    let total = (duration_sec * rate) as usize;

    (0..total)
        .map(|i| {
            let t = i as f64 / rate;
            let mut acc = 0.0;
            for s in 0..5 {
                let level = (t / PERIODS[s]) as u64 % MODULI[s];
                let level = if rising { level } else { MODULI[s] - 1 - level };
                let freq = BASES[s] + STEPS[s] * level as f64;
                acc += 0.15 * (2.0 * std::f64::consts::PI * freq * t).sin();
            }
            acc
        })
        .collect()
}

#[test]
fn test_end_to_end_sample_alignment() {
    let config = EngineConfig::music();
    let store = MemoryStore::new();
    let rate = TRANSCODE_SAMPLE_RATE;

    let full = staircase_signal(30.0, true);
    let target_id = store
        .register_work("Staircase", "Synth", "staircase---synth")
        .unwrap();
    let fingerprints = fingerprint_samples(&full, rate, 30.0, 0.0, target_id, &config).unwrap();
    store.store_fingerprints(&to_records(&fingerprints)).unwrap();

    let decoy = staircase_signal(30.0, false);
    let decoy_id = store
        .register_work("Descending", "Synth", "descending---synth")
        .unwrap();
    let fingerprints = fingerprint_samples(&decoy, rate, 30.0, 0.0, decoy_id, &config).unwrap();
    store.store_fingerprints(&to_records(&fingerprints)).unwrap();

    // 10 second slice starting at 10s, fingerprinted as a standalone clip
    let start = 10 * rate as usize;
    let slice = &full[start..start + 10 * rate as usize];
    let sample_fp = fingerprint_samples(slice, rate, 10.0, 0.0, 0, &config).unwrap();
    let sample = to_sample(&sample_fp);

    let outcome = Matcher::new(&store).query(&sample, DEFAULT_LIMIT).unwrap();
    assert!(!outcome.results.is_empty());

    let top = &outcome.results[0];
    assert_eq!(top.work_id, target_id, "expected the sampled work first");
    assert!(top.score >= MIN_SCORE);
    // alignment at ~10s, allowing for frame-grid skew between the clip
    // and the full recording
    assert!(
        (9_900..=10_100).contains(&top.timestamp_ms),
        "aligned at {} ms",
        top.timestamp_ms
    );
}
