//! **Driver** — orchestrates the three user-selectable phases (spec §2,
//! §6.8): build index, merge segments, find deltas. Mirrors
//! `src/bin/reference.rs`'s `run()`/`process_chrom()` split: a per-chromosome
//! `rayon::par_iter()` fan-out with an `indicatif::ProgressBar` ticked once
//! per chromosome, results collected back on the calling thread.

use std::sync::Arc;

use fxhash::FxHashMap;
use indicatif::ProgressBar;
use rayon::prelude::*;

use crate::config::Config;
use crate::delta::postprocess::postprocess;
use crate::delta::store::{DeltaEntry, DeltaKind, DeltaStore, Evidence};
use crate::delta::TraStore;
use crate::diff::myers::{diff, diff_chunk, DeltaKind as DiffKind};
use crate::error::SvError;
use crate::index::MinimizerIndex;
use crate::overlap::finder::{Anchor, OverlapFinder};
use crate::overlap::merger::{MergedAnchor, OverlapMerger};
use crate::seq::SeqStore;

/// The five typed delta tables a `find_deltas_*` phase produces.
pub struct DeltaTables {
    pub ins: DeltaStore,
    pub del: DeltaStore,
    pub dup: DeltaStore,
    pub inv: DeltaStore,
    pub tra: TraStore,
}

pub struct Driver {
    pub cfg: Config,
}

impl Driver {
    pub fn new(cfg: Config) -> Self {
        Driver { cfg }
    }

    /// Phase `-i`: build the minimizer index over every chromosome in
    /// `ref_store`, one `rayon` task per chromosome, merged back into a
    /// single index on the calling thread.
    pub fn build_index(&self, ref_store: &SeqStore, pb: &Arc<ProgressBar>) -> MinimizerIndex {
        let chroms: Vec<String> = ref_store.keys().cloned().collect();
        pb.set_length(chroms.len() as u64);
        pb.set_position(0);

        let partials: Vec<MinimizerIndex> = chroms
            .par_iter()
            .map(|chrom| {
                let mut idx = MinimizerIndex::new();
                if let Some(seq) = ref_store.get(chrom) {
                    idx.build_for_chromosome(chrom, seq, &self.cfg);
                }
                pb.inc(1);
                idx
            })
            .collect();

        let mut merged = MinimizerIndex::new();
        for idx in partials {
            for (hash, chrom, range) in idx.iter() {
                merged.insert(hash, chrom.to_string(), range.clone());
            }
        }
        pb.finish_with_message("index built");
        merged
    }

    /// Phase `-m`: find anchors for every segment in `seq_store` against
    /// `index` (reorienting segments in place), then merge and chain-select
    /// per reference chromosome. Returns `MissingIndex` only when `index` is
    /// empty (spec §4.2) — a segment scoring below threshold under every
    /// orientation is simply dropped, never fatal.
    pub fn merge_segments(
        &self,
        seq_store: &mut SeqStore,
        index: &MinimizerIndex,
        ref_store: &SeqStore,
        pb: &Arc<ProgressBar>,
    ) -> Result<FxHashMap<String, Vec<MergedAnchor>>, SvError> {
        let anchors = OverlapFinder::find_all(seq_store, index, &self.cfg)?;

        let mut by_chrom: FxHashMap<String, Vec<Anchor>> = FxHashMap::default();
        for anchor in anchors {
            let chrom = anchor.range_ref.owner.clone().unwrap_or_default();
            by_chrom.entry(chrom).or_default().push(anchor);
        }
        let grouped: Vec<(String, Vec<Anchor>)> = by_chrom.into_iter().collect();
        pb.set_length(grouped.len() as u64);
        pb.set_position(0);

        let seq_store_ro: &SeqStore = seq_store;
        let merged_per_chrom: Vec<(String, Vec<MergedAnchor>)> = grouped
            .into_par_iter()
            .map(|(chrom, chrom_anchors)| {
                let merged = OverlapMerger::merge(chrom_anchors, ref_store, seq_store_ro, &self.cfg);
                let ref_len = ref_store.len_of(&chrom).unwrap_or(0);
                let selected = OverlapMerger::select_chains(merged, ref_len, seq_store_ro);
                pb.inc(1);
                (chrom, selected)
            })
            .collect();

        pb.finish_with_message("segments merged");
        Ok(merged_per_chrom.into_iter().collect())
    }

    /// Phase `-s`, assembled-query branch: diff each chromosome's reference
    /// sequence against the matching entry in `sv_store`, keyed by the same
    /// chromosome name, in bounded `CHUNK_SIZE` windows (spec §4.5).
    /// Chromosomes present only on one side are skipped.
    pub fn find_deltas_assembled(&self, ref_store: &SeqStore, sv_store: &SeqStore, pb: &Arc<ProgressBar>) -> DeltaTables {
        let chroms: Vec<String> = ref_store.keys().cloned().collect();
        pb.set_length(chroms.len() as u64);
        pb.set_position(0);

        let per_chrom: Vec<(String, usize, Vec<(DiffKind, DeltaEntry)>)> = chroms
            .par_iter()
            .map(|chrom| {
                let entries = match (ref_store.get(chrom), sv_store.get(chrom)) {
                    (Some(ref_seq), Some(sv_seq)) => diff(chrom, ref_seq, sv_seq, &self.cfg)
                        .into_iter()
                        .map(|event| {
                            let kind = event.kind;
                            let entry = DeltaEntry {
                                range_ref: event.range_ref,
                                evidence: Evidence::Owned { bytes: event.evidence, unknown: false },
                            };
                            (kind, entry)
                        })
                        .collect(),
                    _ => Vec::new(),
                };
                let ref_len = ref_store.len_of(chrom).unwrap_or(0);
                pb.inc(1);
                (chrom.clone(), ref_len, entries)
            })
            .collect();
        pb.finish_with_message("deltas diffed");

        let mut ins = DeltaStore::new(DeltaKind::Ins);
        let mut del = DeltaStore::new(DeltaKind::Del);
        for (chrom, ref_len, entries) in per_chrom {
            for (kind, entry) in entries {
                let target = match kind {
                    DiffKind::Ins => &mut ins,
                    DiffKind::Del => &mut del,
                };
                target.set(&chrom, entry.range_ref, entry.evidence, ref_len, ref_store, &self.cfg);
            }
        }
        ins.filter(&self.cfg);
        del.filter(&self.cfg);

        self.postprocess_into_tables(ins, del, ref_store)
    }

    /// Phase `-s`, from-segments branch (spec §4.6): one anchor per segment
    /// (first occurrence wins), diffed against the whole segment in a single
    /// pass (`reach_start = reach_end = true`), then the density sweep merges
    /// any elevated raw-delta band back into one entry.
    pub fn find_deltas_from_segments(
        &self,
        ref_store: &SeqStore,
        seq_store: &SeqStore,
        merged: &FxHashMap<String, Vec<MergedAnchor>>,
        pb: &Arc<ProgressBar>,
    ) -> DeltaTables {
        let chroms: Vec<String> = merged.keys().cloned().collect();
        pb.set_length(chroms.len() as u64);
        pb.set_position(0);

        let per_chrom: Vec<(String, DeltaStore, DeltaStore)> = chroms
            .par_iter()
            .map(|chrom| {
                let mut local_ins = DeltaStore::new(DeltaKind::Ins);
                let mut local_del = DeltaStore::new(DeltaKind::Del);

                if let Some(ref_seq) = ref_store.get(chrom) {
                    let ref_len = ref_seq.len();
                    let anchors = merged.get(chrom).map(|v| v.as_slice()).unwrap_or(&[]);
                    for anchor in dedup_by_segment(anchors) {
                        let seg_seq = match seq_store.get(&anchor.key_seg) {
                            Some(s) => s,
                            None => continue,
                        };
                        let (_, events) = diff_chunk(
                            chrom,
                            ref_seq,
                            anchor.range_ref.start,
                            anchor.range_ref.len(),
                            seg_seq,
                            0,
                            seg_seq.len(),
                            true,
                            true,
                            &self.cfg,
                        );
                        for event in events {
                            let evidence = Evidence::Owned { bytes: event.evidence, unknown: false };
                            match event.kind {
                                DiffKind::Ins => local_ins.set(chrom, event.range_ref, evidence, ref_len, seq_store, &self.cfg),
                                DiffKind::Del => local_del.set(chrom, event.range_ref, evidence, ref_len, seq_store, &self.cfg),
                            }
                        }
                        local_ins.filter(&self.cfg);
                        local_del.filter(&self.cfg);
                        for store in [&mut local_ins, &mut local_del] {
                            let (_, bands) = store.get_density(chrom, &anchor.range_ref, &self.cfg);
                            for band in &bands {
                                store.merge_into_range(chrom, band, seq_store, &self.cfg);
                            }
                        }
                    }
                }

                pb.inc(1);
                (chrom.clone(), local_ins, local_del)
            })
            .collect();
        pb.finish_with_message("deltas found");

        let mut ins = DeltaStore::new(DeltaKind::Ins);
        let mut del = DeltaStore::new(DeltaKind::Del);
        for (chrom, mut local_ins, mut local_del) in per_chrom {
            ins.put_all(&chrom, local_ins.take(&chrom));
            del.put_all(&chrom, local_del.take(&chrom));
        }
        ins.filter(&self.cfg);
        del.filter(&self.cfg);

        self.postprocess_into_tables(ins, del, ref_store)
    }

    fn postprocess_into_tables(&self, mut ins: DeltaStore, mut del: DeltaStore, seq_store: &SeqStore) -> DeltaTables {
        let mut dup = DeltaStore::new(DeltaKind::Dup);
        let mut inv = DeltaStore::new(DeltaKind::Inv);
        let mut tra = TraStore::new();
        postprocess(&mut ins, &mut del, &mut dup, &mut inv, &mut tra, seq_store, &self.cfg);
        DeltaTables { ins, del, dup, inv, tra }
    }
}

/// Spec §4.6: "deduplicate by segment name (use first anchor per segment)".
fn dedup_by_segment(anchors: &[MergedAnchor]) -> Vec<&MergedAnchor> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for anchor in anchors {
        if seen.insert(anchor.key_seg.as_str()) {
            out.push(anchor);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        Config {
            hash_size: 4,
            window_size: 5,
            overlap_min_count: 2,
            minimizer_min_count: 1,
            minimizer_min_len: 4,
            minimizer_max_diff: 1200,
            delta_min_len: 1,
            delta_ignore_len: 0,
            ..Config::default()
        }
    }

    fn pb() -> Arc<ProgressBar> {
        Arc::new(ProgressBar::hidden())
    }

    #[test]
    fn build_index_covers_every_chromosome() {
        let driver = Driver::new(cfg());
        let mut refs = SeqStore::new();
        refs.insert("chr1", b"ACGTACGTTGCATGCATGCATGCACGTACGTT".to_vec());
        refs.insert("chr2", b"TGCATGCATGCACGTACGTTACGTACGTTGCA".to_vec());
        let index = driver.build_index(&refs, &pb());
        assert!(!index.is_empty());
    }

    #[test]
    fn merge_segments_fails_fast_on_empty_index() {
        let driver = Driver::new(cfg());
        let mut segs = SeqStore::new();
        segs.insert("seg_1", b"ACGTACGTTGCATGCATGCATGCACGTACGTT".to_vec());
        let refs = SeqStore::new();
        let empty_index = MinimizerIndex::new();
        let result = driver.merge_segments(&mut segs, &empty_index, &refs, &pb());
        assert!(matches!(result, Err(SvError::MissingIndex)));
    }

    #[test]
    fn find_deltas_assembled_skips_chromosomes_missing_from_sv_store() {
        let driver = Driver::new(cfg());
        let mut refs = SeqStore::new();
        refs.insert("chr1", b"ACGTACGTAC".to_vec());
        refs.insert("chr2", b"TTTTGGGGCC".to_vec());
        let mut sv = SeqStore::new();
        sv.insert("chr1", b"ACGTACGTAC".to_vec());
        let tables = driver.find_deltas_assembled(&refs, &sv, &pb());
        assert!(tables.ins.is_empty());
        assert!(tables.del.is_empty());
    }

    #[test]
    fn dedup_by_segment_keeps_first_occurrence_only() {
        let a = MergedAnchor {
            range_ref: crate::range::Range::new(0, 10, "chr1"),
            key_seg: "seg_1".to_string(),
            range_seg: crate::range::Range::new(0, 10, "seg_1"),
            orientation: crate::seq::Orientation::Normal,
            count: 1,
        };
        let b = MergedAnchor {
            range_ref: crate::range::Range::new(20, 30, "chr1"),
            ..a.clone()
        };
        let anchors = vec![a.clone(), b];
        let deduped = dedup_by_segment(&anchors);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0], &a);
    }
}
