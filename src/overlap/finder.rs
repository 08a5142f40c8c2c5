//! `OverlapFinder` (spec §4.2).
//!
//! Grounded on `Dna::FindOverlaps` (`examples/original_source/src/common/dna.cpp`):
//! the original slides a rolling hash over one orientation (normal, falling
//! back to an inverted copy if the normal orientation scores fewer anchors)
//! and keeps whichever scored higher. Spec §4.2 generalizes this to all four
//! `Orientation` variants and a hard `OVERLAP_MIN_COUNT` floor rather than a
//! simple "pick whichever is bigger" comparison.

use log::debug;

use crate::config::Config;
use crate::error::SvError;
use crate::index::{next_hash, MinimizerIndex};
use crate::range::{cmp_end_start, Range};
use crate::seq::{Orientation, SeqStore};

/// A minimizer hit linking a position on the reference to a position on a
/// segment (spec §3). `range_seg` is always expressed in the coordinates of
/// the segment's *current* (possibly reoriented) bytes in `SeqStore`, with
/// `mode = Normal` — the one-time flip described in the Design Notes means
/// downstream code never needs to re-apply an orientation transform to read
/// segment evidence. `orientation` records which of the four modes was
/// selected, for merger-side bookkeeping (coverage padding, chain selection)
/// that cares about the original alignment direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub range_ref: Range,
    pub key_seg: String,
    pub range_seg: Range,
    pub orientation: Orientation,
}

pub struct OverlapFinder;

impl OverlapFinder {
    /// Find anchors for every segment in `seq_store` against `index`,
    /// reorienting each selected segment's bytes in place, and return the
    /// anchors grouped by reference chromosome. Per spec §4.2/§7: fails with
    /// `MissingIndex` only when the index is empty; a single segment that
    /// scores below `OVERLAP_MIN_COUNT` under every orientation is skipped
    /// (`BenignSkip`, logged at `debug!`), never fatal to the run.
    pub fn find_all(seq_store: &mut SeqStore, index: &MinimizerIndex, cfg: &Config) -> Result<Vec<Anchor>, SvError> {
        if index.is_empty() {
            return Err(SvError::MissingIndex);
        }

        let seg_names: Vec<String> = seq_store.keys().cloned().collect();
        let mut all_anchors = Vec::new();

        for seg_name in seg_names {
            if let Some(mut anchors) = Self::find_for_segment(seq_store, index, &seg_name, cfg) {
                all_anchors.append(&mut anchors);
            }
        }

        all_anchors.sort_by(|a, b| cmp_end_start(&a.range_ref, &b.range_ref));
        Ok(all_anchors)
    }

    /// Find and select the best orientation for a single segment, reorienting
    /// it in `seq_store` if a non-`Normal` mode wins. Returns `None`
    /// (`BenignSkip`) if no orientation clears `OVERLAP_MIN_COUNT`.
    pub fn find_for_segment(
        seq_store: &mut SeqStore,
        index: &MinimizerIndex,
        seg_name: &str,
        cfg: &Config,
    ) -> Option<Vec<Anchor>> {
        let original = seq_store.get(seg_name)?.to_vec();
        let seg_len = original.len();

        let mut best_mode = Orientation::Normal;
        let mut best_anchors: Vec<Anchor> = Vec::new();

        for &mode in Orientation::ALL.iter() {
            let materialized = mode.materialize(&original);
            let raw_anchors = Self::scan_orientation(seg_name, &materialized, seg_len, mode, index, cfg);
            if raw_anchors.len() > best_anchors.len() {
                best_mode = mode;
                best_anchors = raw_anchors;
            }
        }

        if best_anchors.len() < cfg.overlap_min_count {
            debug!(
                "OverlapFinder: segment {} skipped, best orientation scored {} anchors (< {})",
                seg_name,
                best_anchors.len(),
                cfg.overlap_min_count
            );
            return None;
        }

        if best_mode != Orientation::Normal {
            seq_store.reorient(seg_name, best_mode);
        }

        Some(best_anchors)
    }

    /// Slide k-mers over `materialized` (the segment under `mode`), looking
    /// up each hash in `index`. `range_seg` for each hit is expressed in the
    /// final post-reorientation coordinate space (see `remap_to_oriented`).
    fn scan_orientation(
        seg_name: &str,
        materialized: &[u8],
        seg_len: usize,
        mode: Orientation,
        index: &MinimizerIndex,
        cfg: &Config,
    ) -> Vec<Anchor> {
        let k = cfg.hash_size;
        let mask = cfg.hash_mask();
        let mut anchors = Vec::new();

        if materialized.len() < k {
            return anchors;
        }

        let mut hash = 0u64;
        for &b in &materialized[0..k - 1] {
            hash = next_hash(hash, b, mask);
        }

        for i in (k - 1)..materialized.len() {
            hash = next_hash(hash, materialized[i], mask);
            let p = i + 1 - k;
            if let Some(hits) = index.get(hash) {
                let range_seg = remap_to_oriented(p, k, seg_len, mode, seg_name);
                for (chrom, range_ref) in hits {
                    anchors.push(Anchor {
                        range_ref: Range::new(range_ref.start, range_ref.end, chrom.clone()),
                        key_seg: seg_name.to_string(),
                        range_seg: range_seg.clone(),
                        orientation: mode,
                    });
                }
            }
        }

        anchors
    }
}

/// Map a k-mer hit at position `p` (length `k`) of the *transformed* view of
/// a segment of length `seg_len` back into the segment's final, stored
/// coordinate space (post-reorientation), with `mode = Normal`.
///
/// `Normal`/`Complement` don't reorder bytes, so the position is unchanged.
/// `Reverse`/`ReverseComplement` read the segment back to front, so a hit at
/// transformed position `p` corresponds to stored range
/// `[seg_len - k - p, seg_len - p)` once the segment itself has been
/// reversed in place — this is the algebra behind the one-time flip in
/// `SeqStore::reorient`.
fn remap_to_oriented(p: usize, k: usize, seg_len: usize, mode: Orientation, seg_name: &str) -> Range {
    let (start, end) = match mode {
        Orientation::Normal | Orientation::Complement => (p, p + k),
        Orientation::Reverse | Orientation::ReverseComplement => (seg_len - k - p, seg_len - p),
    };
    Range::new(start, end, seg_name).with_mode(Orientation::Normal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seq::reverse_complement;

    fn cfg() -> Config {
        Config {
            hash_size: 4,
            window_size: 5,
            overlap_min_count: 2,
            ..Config::default()
        }
    }

    #[test]
    fn finds_normal_orientation_segment() {
        let cfg = cfg();
        let mut refs = SeqStore::new();
        refs.insert("chr1", b"ACGTACGTTGCATGCATGCATGCACGTACGTT".to_vec());
        let mut index = MinimizerIndex::new();
        index.build_for_chromosome("chr1", refs.get("chr1").unwrap(), &cfg);

        let mut segs = SeqStore::new();
        segs.insert("seg_a", b"ACGTACGTTGCATGCATGCATGCACGTACGTT".to_vec());

        let anchors = OverlapFinder::find_for_segment(&mut segs, &index, "seg_a", &cfg).unwrap();
        assert!(!anchors.is_empty());
        assert!(anchors.iter().all(|a| a.orientation == Orientation::Normal));
        assert_eq!(segs.get("seg_a").unwrap(), b"ACGTACGTTGCATGCATGCATGCACGTACGTT");
    }

    #[test]
    fn reorients_reverse_complement_segment_and_remaps_coordinates() {
        let cfg = cfg();
        let ref_seq = b"ACGTACGTTGCATGCATGCATGCACGTACGTTACGTACGTTGCATGCATGCATGCACGTACGTT".to_vec();
        let mut refs = SeqStore::new();
        refs.insert("chr1", ref_seq.clone());
        let mut index = MinimizerIndex::new();
        index.build_for_chromosome("chr1", &ref_seq, &cfg);

        let original = b"ACGTACGTTGCATGCATGCATGCACGTACGTT".to_vec();
        let revcomp = reverse_complement(&original);
        let mut segs = SeqStore::new();
        segs.insert("seg_b", revcomp.clone());

        let anchors = OverlapFinder::find_for_segment(&mut segs, &index, "seg_b", &cfg).unwrap();
        assert!(!anchors.is_empty());
        assert!(anchors
            .iter()
            .all(|a| a.orientation == Orientation::ReverseComplement));

        let stored = segs.get("seg_b").unwrap().to_vec();
        assert_eq!(stored, original);

        for a in &anchors {
            assert_eq!(a.range_seg.mode, Orientation::Normal);
            let evidence = a.range_seg.materialize(&stored);
            let ref_evidence = a.range_ref.materialize(&ref_seq);
            assert_eq!(evidence, ref_evidence);
        }
    }

    #[test]
    fn empty_index_fails_with_missing_index() {
        let cfg = cfg();
        let mut segs = SeqStore::new();
        segs.insert("seg_a", b"ACGTACGTTGCATGCATGCATGCACGTACGTT".to_vec());
        let index = MinimizerIndex::new();
        let result = OverlapFinder::find_all(&mut segs, &index, &cfg);
        assert!(matches!(result, Err(SvError::MissingIndex)));
    }

    #[test]
    fn segment_below_threshold_is_skipped_not_fatal() {
        let cfg = Config {
            hash_size: 4,
            window_size: 5,
            overlap_min_count: 1000,
            ..Config::default()
        };
        let mut refs = SeqStore::new();
        refs.insert("chr1", b"ACGTACGTTGCATGCATGCATGCACGTACGTT".to_vec());
        let mut index = MinimizerIndex::new();
        index.build_for_chromosome("chr1", refs.get("chr1").unwrap(), &cfg);

        let mut segs = SeqStore::new();
        segs.insert("seg_a", b"ACGTACGTTGCATGCATGCATGCACGTACGTT".to_vec());
        let anchors = OverlapFinder::find_all(&mut segs, &index, &cfg).unwrap();
        assert!(anchors.is_empty());
    }
}
