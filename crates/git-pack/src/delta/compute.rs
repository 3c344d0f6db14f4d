//! Compute deltas between objects.
//!
//! Implements a simplified version of git's diff-delta algorithm.
//! The algorithm builds a hash table of fixed-size blocks from the source,
//! then scans the target looking for matching blocks. Matching regions
//! become copy instructions; non-matching regions become insert instructions.

use std::collections::HashMap;

use super::{encode_copy, encode_insert, write_varint};

/// Block size for the rolling hash (must be a power of 2 for efficiency).
const BLOCK_SIZE: usize = 16;

/// A computed delta together with the efficiency figures a [`super::strategy::DeltaStrategy`]
/// needs to decide whether it's worth using over storing the target whole.
#[derive(Debug, Clone)]
pub struct ComputedDelta {
    pub delta: Vec<u8>,
    /// `target.len() / delta.len()`. Higher means more compression; `2.0`
    /// means the delta is half the size of the target.
    pub ratio: f64,
    /// Bytes saved by using the delta instead of storing `target` whole.
    /// Negative would mean the delta is actually larger than `target`.
    pub savings: i64,
}

/// Compute a delta that transforms `source` into `target`.
///
/// Returns `None` if no useful delta exists: the instruction stream would
/// not even be smaller than `target` itself, so the caller is better off
/// storing `target` whole. Otherwise returns the delta bytes (applicable
/// with `apply_delta`) plus the ratio/savings a `DeltaStrategy` decides on.
pub fn compute_delta(source: &[u8], target: &[u8]) -> Option<ComputedDelta> {
    let delta = compute_delta_bytes(source, target);
    let savings = target.len() as i64 - delta.len() as i64;
    if savings <= 0 {
        return None;
    }
    let ratio = target.len() as f64 / delta.len() as f64;
    Some(ComputedDelta { delta, ratio, savings })
}

/// Cheap, content-blind estimate of whether a delta between objects of
/// these sizes is likely worth computing, used to skip candidates the
/// expensive `compute_delta` pass would reject anyway.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaQualityEstimate {
    pub worth_trying: bool,
    /// Optimistic upper bound on the ratio an actual delta could reach,
    /// based only on how close the two sizes are.
    pub expected_ratio: f64,
}

/// Base/target size ratios beyond this are treated as not worth trying:
/// the instruction stream overhead dominates whatever overlap remains.
const SIZE_RATIO_LIMIT: f64 = 8.0;

pub fn estimate_delta_quality(base_size: u64, target_size: u64) -> DeltaQualityEstimate {
    if base_size == 0 || target_size == 0 {
        return DeltaQualityEstimate {
            worth_trying: false,
            expected_ratio: 1.0,
        };
    }
    let (small, big) = if base_size < target_size {
        (base_size, target_size)
    } else {
        (target_size, base_size)
    };
    let size_ratio = big as f64 / small as f64;
    DeltaQualityEstimate {
        worth_trying: size_ratio <= SIZE_RATIO_LIMIT,
        expected_ratio: 1.0 + small as f64 / big as f64,
    }
}

/// Raw delta algorithm: always produces an instruction stream that
/// reconstructs `target` from `source`, however large that stream ends up
/// being. `compute_delta` wraps this with the acceptance gate callers
/// actually want; this is exposed directly for round-trip testing and for
/// callers that need the codec without the gate.
pub fn compute_delta_bytes(source: &[u8], target: &[u8]) -> Vec<u8> {
    let mut delta = Vec::new();

    // Write source and target sizes
    delta.extend_from_slice(&write_varint(source.len()));
    delta.extend_from_slice(&write_varint(target.len()));

    if target.is_empty() {
        return delta;
    }

    // Build index of source blocks
    let index = build_block_index(source);

    let mut tpos = 0;
    let mut pending_insert: Vec<u8> = Vec::new();

    while tpos < target.len() {
        let remaining = target.len() - tpos;

        // Try to find a matching block in the source
        if remaining >= BLOCK_SIZE {
            let block = &target[tpos..tpos + BLOCK_SIZE];
            if let Some(&src_offset) = index.get(block) {
                // Found a match! Extend it as far as possible
                let match_len = extend_match(source, src_offset, target, tpos);

                // Flush pending insert
                flush_insert(&mut delta, &mut pending_insert);

                // Emit copy instruction
                emit_copy(&mut delta, src_offset, match_len);
                tpos += match_len;
                continue;
            }
        }

        // No match -- accumulate as insert
        pending_insert.push(target[tpos]);
        tpos += 1;

        // Flush inserts in chunks of 127 (max insert size)
        if pending_insert.len() == 127 {
            flush_insert(&mut delta, &mut pending_insert);
        }
    }

    // Flush remaining insert
    flush_insert(&mut delta, &mut pending_insert);

    delta
}

/// Build a hash map from BLOCK_SIZE chunks of source to their offsets.
fn build_block_index(source: &[u8]) -> HashMap<&[u8], usize> {
    let mut index = HashMap::new();
    if source.len() < BLOCK_SIZE {
        return index;
    }
    // Step by BLOCK_SIZE for non-overlapping blocks (faster indexing)
    for offset in (0..=source.len() - BLOCK_SIZE).step_by(BLOCK_SIZE) {
        let block = &source[offset..offset + BLOCK_SIZE];
        // First occurrence wins (don't overwrite)
        index.entry(block).or_insert(offset);
    }
    index
}

/// Extend a match between source[src_off..] and target[tgt_off..] as far as possible.
fn extend_match(source: &[u8], src_off: usize, target: &[u8], tgt_off: usize) -> usize {
    let max_len = std::cmp::min(source.len() - src_off, target.len() - tgt_off);
    let mut len = BLOCK_SIZE;
    while len < max_len && source[src_off + len] == target[tgt_off + len] {
        len += 1;
    }
    len
}

/// Flush pending insert bytes as one or more insert instructions.
fn flush_insert(delta: &mut Vec<u8>, pending: &mut Vec<u8>) {
    while !pending.is_empty() {
        let chunk_len = std::cmp::min(pending.len(), 127);
        let chunk: Vec<u8> = pending.drain(..chunk_len).collect();
        delta.extend_from_slice(&encode_insert(&chunk));
    }
}

/// Emit a copy instruction, splitting into multiple if needed (max copy size = 0xffffff).
fn emit_copy(delta: &mut Vec<u8>, offset: usize, mut size: usize) {
    let mut off = offset;
    while size > 0 {
        let chunk = std::cmp::min(size, 0x00ff_ffff); // max 24-bit size
        delta.extend_from_slice(&encode_copy(off as u64, chunk));
        off += chunk;
        size -= chunk;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::apply::apply_delta;

    #[test]
    fn identical_objects() {
        let data = b"Hello, World! This is a test of delta compression.";
        let delta = compute_delta_bytes(data, data);
        let result = apply_delta(data, &delta).unwrap();
        assert_eq!(result, data);
    }

    #[test]
    fn completely_different() {
        let source = b"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
        let target = b"BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB";
        let delta = compute_delta_bytes(source, target);
        let result = apply_delta(source, &delta).unwrap();
        assert_eq!(result, target);
    }

    #[test]
    fn empty_target() {
        let source = b"something";
        let target = b"";
        let delta = compute_delta_bytes(source, target);
        let result = apply_delta(source, &delta).unwrap();
        assert_eq!(result, target.as_slice());
    }

    #[test]
    fn empty_source() {
        let source = b"";
        let target = b"new content here";
        let delta = compute_delta_bytes(source, target);
        let result = apply_delta(source, &delta).unwrap();
        assert_eq!(result, target);
    }

    #[test]
    fn prepend_data() {
        // Source has a block that's reused in target, just with a prefix
        let source = b"0123456789abcdef0123456789abcdef"; // 32 bytes
        let mut target = b"PREPENDED_".to_vec();
        target.extend_from_slice(source);
        let delta = compute_delta_bytes(source, &target);
        let result = apply_delta(source, &delta).unwrap();
        assert_eq!(result, target);
    }

    #[test]
    fn append_data() {
        let source = b"0123456789abcdef0123456789abcdef"; // 32 bytes
        let mut target = source.to_vec();
        target.extend_from_slice(b"_APPENDED");
        let delta = compute_delta_bytes(source, &target);
        let result = apply_delta(source, &delta).unwrap();
        assert_eq!(result, target);
    }

    #[test]
    fn large_similar_objects() {
        // Simulate two versions of a file with minor changes
        let source: Vec<u8> = (0..4096).map(|i| (i % 256) as u8).collect();
        let mut target = source.clone();
        // Change a few bytes in the middle
        target[2048] = 0xFF;
        target[2049] = 0xFE;
        target[2050] = 0xFD;

        let delta = compute_delta_bytes(&source, &target);
        let result = apply_delta(&source, &delta).unwrap();
        assert_eq!(result, target);

        // Delta should be smaller than the full target
        assert!(delta.len() < target.len());
    }

    #[test]
    fn gated_compute_delta_reports_ratio_and_savings() {
        let source: Vec<u8> = (0..4096).map(|i| (i % 256) as u8).collect();
        let mut target = source.clone();
        target[2048] = 0xFF;

        let computed = compute_delta(&source, &target).expect("a small edit should be useful");
        assert_eq!(computed.savings, target.len() as i64 - computed.delta.len() as i64);
        assert!(computed.savings > 0);
        assert!(computed.ratio > 1.0);

        let result = apply_delta(&source, &computed.delta).unwrap();
        assert_eq!(result, target);
    }

    #[test]
    fn gated_compute_delta_rejects_no_useful_savings() {
        // No shared blocks at all: the delta is dominated by one big
        // insert instruction, so it can't beat storing the target whole.
        let source = b"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
        let target = b"BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB";
        assert!(compute_delta(source, target).is_none());
    }

    #[test]
    fn quality_estimate_favors_similar_sizes() {
        let close = estimate_delta_quality(1000, 1000);
        let far = estimate_delta_quality(10, 100_000);

        assert!(close.worth_trying);
        assert!(!far.worth_trying);
        assert!(close.expected_ratio > far.expected_ratio);
    }

    #[test]
    fn quality_estimate_rejects_zero_sized_objects() {
        assert!(!estimate_delta_quality(0, 100).worth_trying);
        assert!(!estimate_delta_quality(100, 0).worth_trying);
    }
}
