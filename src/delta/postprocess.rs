//! `DeltaPostProcess` (spec §4.8): the sweep that recognizes DUP/INV/TRA on
//! top of the raw INS/DEL tables once diffing has finished.
//!
//! Grounded on `Dna::FindDupDeltas` / `FindInvDeltas` / `FindTraDeltas` /
//! `ProcessDeltas` (`examples/original_source/src/common/dna.cpp`), one to
//! one: DUP scans each insertion's immediate left neighbor, INV pairs
//! insertions against deletions by fuzzy-overlap plus reverse-complement
//! content, and TRA runs the original's two-pass length-then-content match
//! with `DnaMultiDelta::Set`'s asymmetric-pair-key trick (check `(b, a)`
//! before inserting `(a, b)`) to keep a translocation and its mirror from
//! both landing as records.

use log::debug;

use crate::config::Config;
use crate::delta::store::{fuzzy_compare_ranges, DeltaEntry, DeltaStore, Evidence};
use crate::fuzzy::{fuzzy_compare_len, fuzzy_compare_seq};
use crate::range::Range;
use crate::seq::{reverse_complement, SeqStore};

/// A translocation: a deletion on one chromosome and an insertion on another
/// whose lengths and content fuzzy-match. Kept separately from `DeltaStore`
/// since it spans two chromosomes (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraRecord {
    pub chr_ins: String,
    pub range_ins: Range,
    pub chr_del: String,
    pub range_del: Range,
}

/// Collected TRA records, deduplicated against the mirror of each pairing so
/// that swapping which side is called "ins" and which is "del" never yields
/// a second record for the same event (spec §8 "TRA symmetry").
#[derive(Debug, Clone, Default)]
pub struct TraStore {
    records: Vec<TraRecord>,
    seen: std::collections::HashSet<((String, usize, usize), (String, usize, usize))>,
}

impl TraStore {
    pub fn new() -> Self {
        TraStore::default()
    }

    pub fn records(&self) -> &[TraRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert `record` unless its mirror (same two spans, ins/del swapped)
    /// was already recorded.
    pub fn insert(&mut self, record: TraRecord) {
        let key = canonical_pair_key(
            &record.chr_ins,
            &record.range_ins,
            &record.chr_del,
            &record.range_del,
        );
        if self.seen.contains(&key) {
            debug!("TraStore::insert: dropping mirror of already-recorded TRA pair");
            return;
        }
        self.seen.insert(key);
        self.records.push(record);
    }
}

fn canonical_pair_key(
    chr_a: &str,
    range_a: &Range,
    chr_b: &str,
    range_b: &Range,
) -> ((String, usize, usize), (String, usize, usize)) {
    let a = (chr_a.to_string(), range_a.start, range_a.end);
    let b = (chr_b.to_string(), range_b.start, range_b.end);
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Run the full DUP → INV → TRA sweep over the finalized INS/DEL tables,
/// in the order spec §4.8 presents them: DUP only ever promotes from INS,
/// so it runs first; INV then pairs whatever INS survived against DEL; TRA
/// runs last over whatever remains of both, across every chromosome.
///
/// Idempotent: every promotion removes its source entries from INS/DEL via
/// `DeltaStore::take`, so a second call sees only what the first call left
/// behind and reaches a fixed point.
pub fn postprocess(
    ins: &mut DeltaStore,
    del: &mut DeltaStore,
    dup: &mut DeltaStore,
    inv: &mut DeltaStore,
    tra: &mut TraStore,
    seq_store: &SeqStore,
    cfg: &Config,
) {
    find_dup_deltas(ins, dup, seq_store, cfg);
    find_inv_deltas(ins, del, inv, seq_store, cfg);
    find_tra_deltas(ins, del, tra, seq_store, cfg);
}

/// DUP detection (spec §4.8): an insertion at reference `[s, s+L)` is
/// promoted to a DUP at `[s-L, s)` when its evidence fuzzy-matches the
/// reference content immediately to its left. Skipped when `s < L`
/// (containment, spec §8).
fn find_dup_deltas(ins: &mut DeltaStore, dup: &mut DeltaStore, seq_store: &SeqStore, cfg: &Config) {
    let chroms: Vec<String> = ins.chromosomes().cloned().collect();
    for chrom in chroms {
        let entries = ins.take(&chrom);
        let ref_seq = seq_store.get(&chrom);
        let mut kept = Vec::with_capacity(entries.len());
        let mut promoted = Vec::new();

        for entry in entries {
            let s = entry.range_ref.start;
            let l = entry.range_ref.len();
            let promote = match ref_seq {
                Some(seq) if s >= l => {
                    let prev = &seq[s - l..s];
                    let v = entry.evidence.materialize(seq_store);
                    fuzzy_compare_seq(&v, prev, cfg)
                }
                _ => false,
            };

            if promote {
                debug!("DeltaPostProcess: promoted INS {} to DUP", entry.range_ref.stringify());
                promoted.push(DeltaEntry {
                    range_ref: Range::new(s - l, s, chrom.clone()),
                    evidence: entry.evidence,
                });
            } else {
                kept.push(entry);
            }
        }

        ins.put_all(&chrom, kept);
        dup.put_all(&chrom, promoted);
    }
}

/// INV detection (spec §4.8): an INS/DEL pair on the same chromosome whose
/// reference ranges fuzzy-overlap, where the INS evidence fuzzy-matches the
/// reverse-complement of the DEL's reference content, collapses into a
/// single INV entry (the DEL's own range and evidence); both source entries
/// are erased.
fn find_inv_deltas(ins: &mut DeltaStore, del: &mut DeltaStore, inv: &mut DeltaStore, seq_store: &SeqStore, cfg: &Config) {
    let chroms: std::collections::BTreeSet<String> = ins.chromosomes().chain(del.chromosomes()).cloned().collect();

    for chrom in chroms {
        let ins_entries = ins.take(&chrom);
        let del_entries = del.take(&chrom);

        let mut matched_ins = vec![false; ins_entries.len()];
        let mut matched_del = vec![false; del_entries.len()];
        let mut promoted_inv = Vec::new();

        if let Some(seq) = seq_store.get(&chrom) {
            for (i, ins_e) in ins_entries.iter().enumerate() {
                for (j, del_e) in del_entries.iter().enumerate() {
                    if matched_del[j] {
                        continue;
                    }
                    if !fuzzy_compare_ranges(&ins_e.range_ref, &del_e.range_ref, cfg) {
                        continue;
                    }
                    let del_start = del_e.range_ref.start.min(seq.len());
                    let del_end = del_e.range_ref.end.min(seq.len());
                    let rc = reverse_complement(&seq[del_start..del_end]);
                    let ins_evidence = ins_e.evidence.materialize(seq_store);
                    if fuzzy_compare_seq(&ins_evidence, &rc, cfg) {
                        matched_ins[i] = true;
                        matched_del[j] = true;
                        debug!(
                            "DeltaPostProcess: fused INS {} / DEL {} into INV",
                            ins_e.range_ref.stringify(),
                            del_e.range_ref.stringify()
                        );
                        promoted_inv.push(del_e.clone());
                        break;
                    }
                }
            }
        }

        let kept_ins: Vec<DeltaEntry> = ins_entries
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !matched_ins[*i])
            .map(|(_, e)| e)
            .collect();
        let kept_del: Vec<DeltaEntry> = del_entries
            .into_iter()
            .enumerate()
            .filter(|(j, _)| !matched_del[*j])
            .map(|(_, e)| e)
            .collect();

        ins.put_all(&chrom, kept_ins);
        del.put_all(&chrom, kept_del);
        inv.put_all(&chrom, promoted_inv);
    }
}

/// TRA detection (spec §4.8), matching `Dna::FindTraDeltas`'s own two-pass
/// structure one to one:
///
/// Pass 1 is scoped to a single chromosome at a time (an INS never pairs
/// with a DEL on another chromosome here — that only happens in pass 2):
/// for each chromosome's INS entries, scan that *same* chromosome's DEL
/// entries for the first one whose reference length fuzzy-matches, and move
/// both into the ins/del caches, greedily, 1:1 (each DEL can be claimed by
/// at most one INS).
///
/// Pass 2 then pairs across the whole cache — by definition cross-chromosome
/// now, since every cached entry already cleared the same-chromosome length
/// check — greedily matching each cached INS against the first cached DEL
/// whose evidence content fuzzy-matches, and emits a `TraRecord` for each
/// pair. Anything left in either cache after pass 2 is restored to its
/// original chromosome's INS/DEL table.
fn find_tra_deltas(ins: &mut DeltaStore, del: &mut DeltaStore, tra: &mut TraStore, seq_store: &SeqStore, cfg: &Config) {
    let ins_chroms: Vec<String> = ins.chromosomes().cloned().collect();

    let mut ins_cache: Vec<(String, DeltaEntry)> = Vec::new();
    let mut del_cache: Vec<(String, DeltaEntry)> = Vec::new();

    for chrom in &ins_chroms {
        let ins_entries = ins.take(chrom);
        let mut del_entries = del.take(chrom);
        let mut kept_ins = Vec::new();
        for ins_e in ins_entries {
            let matched = del_entries
                .iter()
                .position(|del_e| fuzzy_compare_len(ins_e.range_ref.len() as u64, del_e.range_ref.len() as u64, cfg.gap_max_diff));
            match matched {
                Some(j) => {
                    let del_e = del_entries.remove(j);
                    ins_cache.push((chrom.clone(), ins_e));
                    del_cache.push((chrom.clone(), del_e));
                }
                None => kept_ins.push(ins_e),
            }
        }
        ins.put_all(chrom, kept_ins);
        del.put_all(chrom, del_entries);
    }

    let mut ins_consumed = vec![false; ins_cache.len()];
    let mut del_consumed = vec![false; del_cache.len()];

    for i in 0..ins_cache.len() {
        let ins_evidence = ins_cache[i].1.evidence.materialize(seq_store);
        for j in 0..del_cache.len() {
            if del_consumed[j] {
                continue;
            }
            let del_evidence = del_cache[j].1.evidence.materialize(seq_store);
            if fuzzy_compare_seq(&ins_evidence, &del_evidence, cfg) {
                ins_consumed[i] = true;
                del_consumed[j] = true;
                let record = TraRecord {
                    chr_ins: ins_cache[i].0.clone(),
                    range_ins: ins_cache[i].1.range_ref.clone(),
                    chr_del: del_cache[j].0.clone(),
                    range_del: del_cache[j].1.range_ref.clone(),
                };
                debug!(
                    "DeltaPostProcess: paired TRA {}:{} / {}:{}",
                    record.chr_ins,
                    record.range_ins.stringify(),
                    record.chr_del,
                    record.range_del.stringify()
                );
                tra.insert(record);
                break;
            }
        }
    }

    for (i, (chrom, entry)) in ins_cache.into_iter().enumerate() {
        if !ins_consumed[i] {
            ins.put_all(&chrom, vec![entry]);
        }
    }
    for (j, (chrom, entry)) in del_cache.into_iter().enumerate() {
        if !del_consumed[j] {
            del.put_all(&chrom, vec![entry]);
        }
    }
}
