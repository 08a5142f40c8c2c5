//! `OverlapMerger` + coverage sweep (spec §4.3-§4.4).
//!
//! Grounded on `DnaOverlap`/`Dna::ProcessOverlaps`
//! (`examples/original_source/src/common/dna_overlap.cpp`), generalized per
//! spec §4.3 to the incremental hull-merge with a growth-mismatch bound and
//! a `head_K` verify step the original doesn't have (the original leaves
//! `ProcessOverlaps` empty and never merges anchors into larger intervals).

use std::collections::BTreeMap;

use fxhash::FxHashMap;
use log::warn;

use crate::config::Config;
use crate::overlap::finder::Anchor;
use crate::range::Range;
use crate::seq::{Orientation, SeqStore};

/// A merged interval: the hull of one or more anchors sharing a segment name
/// and orientation, plus the anchor count that built it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedAnchor {
    pub range_ref: Range,
    pub key_seg: String,
    pub range_seg: Range,
    pub orientation: Orientation,
    pub count: usize,
}

pub struct OverlapMerger;

impl OverlapMerger {
    /// Merge `anchors` (already filtered to one reference chromosome) per
    /// spec §4.3: group by `(segment, orientation)`, incrementally hull-merge
    /// within each group, then prune by `MINIMIZER_MIN_COUNT` /
    /// `MINIMIZER_MIN_LEN`. `ref_store` and `seg_store` are separate: anchors
    /// carry a reference chromosome name on `range_ref.owner` and a segment
    /// name on `range_seg.owner`, and the two names are never looked up in
    /// the same store (the driver keeps reference and segment sequences in
    /// separate `SeqStore`s throughout).
    pub fn merge(anchors: Vec<Anchor>, ref_store: &SeqStore, seg_store: &SeqStore, cfg: &Config) -> Vec<MergedAnchor> {
        let mut groups: FxHashMap<(String, Orientation), Vec<MergedAnchor>> = FxHashMap::default();

        for anchor in anchors {
            let key = (anchor.key_seg.clone(), anchor.orientation);
            let bucket = groups.entry(key).or_default();
            let extended = bucket
                .iter_mut()
                .any(|merged| Self::try_extend(merged, &anchor, ref_store, seg_store, cfg));
            if !extended {
                bucket.push(MergedAnchor {
                    range_ref: anchor.range_ref,
                    key_seg: anchor.key_seg,
                    range_seg: anchor.range_seg,
                    orientation: anchor.orientation,
                    count: 1,
                });
            }
        }

        groups
            .into_values()
            .flatten()
            .filter(|m| {
                m.count >= cfg.minimizer_min_count
                    && m.range_ref.len() >= cfg.minimizer_min_len
                    && m.range_seg.len() >= cfg.minimizer_min_len
            })
            .collect()
    }

    /// Try to extend `merged` with `anchor`. Spec §4.3's three conditions:
    /// growth-mismatch bound, and the `head_K` verify invariant (the first
    /// `HASH_SIZE` bytes of the merged reference and segment hulls must
    /// still agree, since both are `Normal`-mode ranges after `OverlapFinder`'s
    /// one-time flip).
    fn try_extend(merged: &mut MergedAnchor, anchor: &Anchor, ref_store: &SeqStore, seg_store: &SeqStore, cfg: &Config) -> bool {
        let new_ref = merged.range_ref.hull(&anchor.range_ref);
        let new_seg = merged.range_seg.hull(&anchor.range_seg);

        let d_ref = new_ref.len() as i64 - merged.range_ref.len() as i64;
        let d_seg = new_seg.len() as i64 - merged.range_seg.len() as i64;
        if (d_ref - d_seg).unsigned_abs() > cfg.minimizer_max_diff {
            return false;
        }

        let k = cfg.hash_size;
        if new_ref.len() < k || new_seg.len() < k {
            return false;
        }

        let ref_owner = match &new_ref.owner {
            Some(o) => o.as_str(),
            None => return false,
        };
        let seg_owner = match &new_seg.owner {
            Some(o) => o.as_str(),
            None => return false,
        };
        let ref_seq = match ref_store.get(ref_owner) {
            Some(s) => s,
            None => return false,
        };
        let seg_seq = match seg_store.get(seg_owner) {
            Some(s) => s,
            None => return false,
        };
        if ref_seq.len() < new_ref.start + k || seg_seq.len() < new_seg.start + k {
            return false;
        }
        let head_ref = &ref_seq[new_ref.start..new_ref.start + k];
        let head_seg = &seg_seq[new_seg.start..new_seg.start + k];
        if head_ref != head_seg {
            return false;
        }

        merged.range_ref = new_ref;
        merged.range_seg = new_seg;
        merged.count += 1;
        true
    }

    /// Chain selection (spec §4.3): for segment names following the
    /// `<base>_<suffix>` convention (Open Question (4): exactly one `_`),
    /// competing copies of the same base name are narrowed down to the one
    /// whose anchors cover the largest fraction of the reference. Names that
    /// don't follow the convention, or that are the only copy of their base
    /// name, pass through untouched.
    pub fn select_chains(merged: Vec<MergedAnchor>, ref_len: usize, seg_store: &SeqStore) -> Vec<MergedAnchor> {
        let mut families: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for m in &merged {
            match segment_base(&m.key_seg) {
                Some(base) => {
                    let names = families.entry(base).or_default();
                    if !names.contains(&m.key_seg.as_str()) {
                        names.push(&m.key_seg);
                    }
                }
                None => warn!(
                    "OverlapMerger: segment name {} does not follow the <base>_<suffix> convention, skipping chain selection for it",
                    m.key_seg
                ),
            }
        }

        let mut winners: BTreeMap<String, String> = BTreeMap::new();
        for (base, names) in families {
            if names.len() < 2 {
                continue;
            }
            let mut best_name = names[0].to_string();
            let mut best_coverage = -1.0f64;
            for name in &names {
                let cov = coverage(&merged, ref_len, seg_store, Some(name));
                if cov > best_coverage {
                    best_coverage = cov;
                    best_name = name.to_string();
                }
            }
            winners.insert(base.to_string(), best_name);
        }

        merged
            .into_iter()
            .filter(|m| match segment_base(&m.key_seg) {
                Some(base) => match winners.get(base) {
                    Some(winner) => winner == &m.key_seg,
                    None => true,
                },
                None => true,
            })
            .collect()
    }
}

/// Split `name` into its `<base>_<suffix>` base, only when it contains
/// exactly one `_` with non-empty parts on both sides (Open Question (4)).
fn segment_base(name: &str) -> Option<&str> {
    let mut parts = name.splitn(2, '_');
    let base = parts.next()?;
    let suffix = parts.next()?;
    if base.is_empty() || suffix.is_empty() || suffix.contains('_') {
        return None;
    }
    Some(base)
}

/// Coverage sweep (spec §4.4): fraction of `[0, ref_len)` covered by at least
/// one anchor's `cover_range`, optionally restricted to anchors for a single
/// segment name (used by chain selection). The padding on each side is the
/// unaligned segment prefix/suffix length; because `OverlapFinder` already
/// remaps `range_seg` into the final, forward-reading coordinate space, no
/// extra left/right swap for `Reverse`/`ReverseComplement` is needed here —
/// the remap already absorbed it.
pub fn coverage(anchors: &[MergedAnchor], ref_len: usize, seg_store: &SeqStore, filter_name: Option<&str>) -> f64 {
    if ref_len == 0 {
        return 0.0;
    }
    let mut delta = vec![0i64; ref_len + 1];

    for anchor in anchors {
        if let Some(name) = filter_name {
            if anchor.key_seg != name {
                continue;
            }
        }
        let seg_len = seg_store.len_of(&anchor.key_seg).unwrap_or(anchor.range_seg.end);
        let left_pad = anchor.range_seg.start;
        let right_pad = seg_len.saturating_sub(anchor.range_seg.end);
        let start = anchor.range_ref.start.saturating_sub(left_pad);
        let end = (anchor.range_ref.end + right_pad).min(ref_len);
        if start >= end {
            continue;
        }
        delta[start] += 1;
        delta[end] -= 1;
    }

    let mut running = 0i64;
    let mut covered_bases = 0usize;
    for slot in delta.iter().take(ref_len) {
        running += slot;
        if running > 0 {
            covered_bases += 1;
        }
    }
    covered_bases as f64 / ref_len as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::finder::Anchor;

    fn anchor(ref_start: usize, ref_end: usize, seg_start: usize, seg_end: usize, seg: &str) -> Anchor {
        Anchor {
            range_ref: Range::new(ref_start, ref_end, "chr1"),
            key_seg: seg.to_string(),
            range_seg: Range::new(seg_start, seg_end, seg),
            orientation: Orientation::Normal,
        }
    }

    fn cfg() -> Config {
        Config {
            hash_size: 4,
            minimizer_min_count: 2,
            minimizer_min_len: 5,
            minimizer_max_diff: 1200,
            ..Config::default()
        }
    }

    /// A combined store, only valid for `coverage`/`select_chains` tests:
    /// those only ever look up segment lengths by `key_seg`, so lumping
    /// `chr1` in with the segments is harmless there.
    fn store() -> SeqStore {
        let mut s = SeqStore::new();
        s.insert("chr1", b"ACGTACGTACGTACGTACGTACGTACGTACGT".to_vec());
        s.insert("seg_1", b"ACGTACGTACGTACGTACGTACGTACGTACGT".to_vec());
        s
    }

    /// `merge`/`try_extend` read the reference chromosome and the segment
    /// from two distinct stores in real use (the driver never puts them in
    /// the same `SeqStore`) — these mirror that split so the head-K verify
    /// is actually exercised against separate stores, not masked by both
    /// names happening to resolve in one combined map.
    fn ref_store() -> SeqStore {
        let mut s = SeqStore::new();
        s.insert("chr1", b"ACGTACGTACGTACGTACGTACGTACGTACGT".to_vec());
        s
    }

    fn seg_store() -> SeqStore {
        let mut s = SeqStore::new();
        s.insert("seg_1", b"ACGTACGTACGTACGTACGTACGTACGTACGT".to_vec());
        s
    }

    #[test]
    fn merges_overlapping_adjacent_anchors() {
        let cfg = cfg();
        let (ref_store, seg_store) = (ref_store(), seg_store());
        let anchors = vec![
            anchor(0, 4, 0, 4, "seg_1"),
            anchor(4, 8, 4, 8, "seg_1"),
            anchor(8, 12, 8, 12, "seg_1"),
        ];
        let merged = OverlapMerger::merge(anchors, &ref_store, &seg_store, &cfg);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].count, 3);
        assert_eq!((merged[0].range_ref.start, merged[0].range_ref.end), (0, 12));
    }

    #[test]
    fn merges_with_ref_and_segments_in_separate_stores() {
        // Same fixture as `merges_overlapping_adjacent_anchors`, but with
        // `chr1` absent from the segment store entirely, matching how
        // `Driver::merge_segments` actually calls this (ref_store and
        // seg_store are two different `SeqStore`s). Prior to fixing the
        // head-K verify's store lookups, this returned count == 1 for every
        // anchor because `ref_owner` ("chr1") could never be found.
        let cfg = cfg();
        let ref_store = ref_store();
        let mut seg_only = SeqStore::new();
        seg_only.insert("seg_1", b"ACGTACGTACGTACGTACGTACGTACGTACGT".to_vec());
        assert!(seg_only.get("chr1").is_none());

        let anchors = vec![
            anchor(0, 4, 0, 4, "seg_1"),
            anchor(4, 8, 4, 8, "seg_1"),
            anchor(8, 12, 8, 12, "seg_1"),
        ];
        let merged = OverlapMerger::merge(anchors, &ref_store, &seg_only, &cfg);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].count, 3);
        assert_eq!((merged[0].range_ref.start, merged[0].range_ref.end), (0, 12));
    }

    #[test]
    fn prunes_below_count_and_length_thresholds() {
        let cfg = Config {
            minimizer_min_count: 10,
            ..cfg()
        };
        let (ref_store, seg_store) = (ref_store(), seg_store());
        let anchors = vec![anchor(0, 4, 0, 4, "seg_1"), anchor(4, 8, 4, 8, "seg_1")];
        let merged = OverlapMerger::merge(anchors, &ref_store, &seg_store, &cfg);
        assert!(merged.is_empty());
    }

    #[test]
    fn coverage_is_bounded_in_0_1() {
        let seg_store = store();
        let merged = vec![MergedAnchor {
            range_ref: Range::new(0, 10, "chr1"),
            key_seg: "seg_1".to_string(),
            range_seg: Range::new(0, 10, "seg_1"),
            orientation: Orientation::Normal,
            count: 5,
        }];
        let cov = coverage(&merged, 32, &seg_store, None);
        assert!((0.0..=1.0).contains(&cov));
    }

    #[test]
    fn coverage_is_one_when_fully_covered() {
        let seg_store = store();
        let merged = vec![MergedAnchor {
            range_ref: Range::new(0, 32, "chr1"),
            key_seg: "seg_1".to_string(),
            range_seg: Range::new(0, 32, "seg_1"),
            orientation: Orientation::Normal,
            count: 5,
        }];
        let cov = coverage(&merged, 32, &seg_store, None);
        assert_eq!(cov, 1.0);
    }

    #[test]
    fn chain_selection_keeps_higher_coverage_copy_and_drops_the_other() {
        let seg_store = store();
        let merged = vec![
            MergedAnchor {
                range_ref: Range::new(0, 30, "chr1"),
                key_seg: "segA_1".to_string(),
                range_seg: Range::new(0, 30, "segA_1"),
                orientation: Orientation::Normal,
                count: 5,
            },
            MergedAnchor {
                range_ref: Range::new(0, 5, "chr1"),
                key_seg: "segA_2".to_string(),
                range_seg: Range::new(0, 5, "segA_2"),
                orientation: Orientation::Normal,
                count: 5,
            },
        ];
        let selected = OverlapMerger::select_chains(merged, 32, &seg_store);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].key_seg, "segA_1");
    }

    #[test]
    fn malformed_segment_name_is_not_excluded() {
        let seg_store = store();
        let merged = vec![MergedAnchor {
            range_ref: Range::new(0, 30, "chr1"),
            key_seg: "weirdname".to_string(),
            range_seg: Range::new(0, 30, "weirdname"),
            orientation: Orientation::Normal,
            count: 5,
        }];
        let selected = OverlapMerger::select_chains(merged, 32, &seg_store);
        assert_eq!(selected.len(), 1);
    }
}
