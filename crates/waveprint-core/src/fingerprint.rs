//! Landmark pair hashing into 32-bit fingerprint addresses
//!
//! Each anchor peak is paired with the peaks in its target zone; the pair
//! is packed into an address encoding both frequency bins and the
//! inter-peak time delta. The address layout is part of the on-disk
//! contract: works indexed by any conforming implementation must remain
//! mutually queryable.

use std::collections::HashMap;

use crate::config::EngineConfig;
use crate::peaks::Peak;

const FREQ_BITS: u32 = 9;
const DELTA_BITS: u32 = 14;

/// Value side of the fingerprint mapping: where the anchor sits in a work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintEntry {
    pub anchor_time_ms: u32,
    pub work_id: u32,
}

/// A stored fingerprint row. The persisted index is the inverted map
/// `address -> [(anchor_time_ms, work_id)]` across all works.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintRecord {
    pub address: u32,
    pub anchor_time_ms: u32,
    pub work_id: u32,
}

/// Pair every anchor peak with its next `target_zone_size` peaks and hash
/// each pair into an address.
///
/// The result is a mapping, so a later identical address overwrites the
/// earlier anchor time. The scheme is sparse enough that collisions are
/// rare, and deterministic replacement also absorbs the duplicates
/// produced by overlapping chunks.
pub fn fingerprint_peaks(
    peaks: &[Peak],
    work_id: u32,
    config: &EngineConfig,
) -> HashMap<u32, FingerprintEntry> {
    let mut fingerprints = HashMap::new();

    for (i, anchor) in peaks.iter().enumerate() {
        for target in peaks.iter().skip(i + 1).take(config.target_zone_size) {
            let address = pack_address(anchor, target);
            fingerprints.insert(
                address,
                FingerprintEntry {
                    anchor_time_ms: (anchor.time_sec * 1000.0) as u32,
                    work_id,
                },
            );
        }
    }

    fingerprints
}

/// Pack an anchor/target pair into the 32-bit address layout:
/// bits 31..23 anchor frequency bin, 22..14 target frequency bin,
/// 13..0 time delta in milliseconds. Bins are 10 Hz wide; every field
/// wraps modulo its width.
pub fn pack_address(anchor: &Peak, target: &Peak) -> u32 {
    let anchor_bin = (anchor.freq_hz / 10.0) as u32 & ((1 << FREQ_BITS) - 1);
    let target_bin = (target.freq_hz / 10.0) as u32 & ((1 << FREQ_BITS) - 1);
    let delta_ms = ((target.time_sec - anchor.time_sec) * 1000.0) as u32 & ((1 << DELTA_BITS) - 1);

    (anchor_bin << 23) | (target_bin << 14) | delta_ms
}

/// Split an address back into `(anchor_bin, target_bin, delta_ms)`.
pub fn unpack_address(address: u32) -> (u32, u32, u32) {
    (
        address >> 23,
        (address >> 14) & ((1 << FREQ_BITS) - 1),
        address & ((1 << DELTA_BITS) - 1),
    )
}
