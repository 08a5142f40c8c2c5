//! `DeltaStore` (spec §4.7).
//!
//! Grounded on `DnaDelta::Set`/`Combine`
//! (`examples/original_source/src/common/dna_delta.cpp`): scan the existing
//! per-chromosome list most-recent-first, try to combine with each, push a
//! new entry only if none accept. Spec §4.7 generalizes `Combine` to the
//! richer synthetic-evidence rule described in the Design Notes (`Evidence`
//! sum type replacing the original's raw-pointer-into-string ownership).

use fxhash::FxHashMap;
use log::debug;

use crate::config::Config;
use crate::fuzzy::fuzzy_compare_len;
use crate::range::Range;
use crate::seq::SeqStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaKind {
    Ins,
    Del,
    Dup,
    Inv,
}

impl DeltaKind {
    pub fn label(self) -> &'static str {
        match self {
            DeltaKind::Ins => "INS",
            DeltaKind::Del => "DEL",
            DeltaKind::Dup => "DUP",
            DeltaKind::Inv => "INV",
        }
    }
}

/// Evidence for a delta entry: a borrowed slice of some `SeqStore` sequence
/// (the common case), or an owned, synthetically constructed buffer (built
/// by `DeltaStore::combine` when two combined entries carry evidence from
/// different sources). Replaces the original's raw-pointer-into-string
/// ownership model (Design Notes §9) — `Owned` bytes are simply dropped by
/// value when an entry is removed, no manual free needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    Borrowed { key: String, start: usize, end: usize },
    Owned { bytes: Vec<u8>, unknown: bool },
}

impl Evidence {
    pub fn len(&self) -> usize {
        match self {
            Evidence::Borrowed { start, end, .. } => end - start,
            Evidence::Owned { bytes, .. } => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Evidence::Owned { unknown: true, .. })
    }

    pub fn materialize(&self, seq_store: &SeqStore) -> Vec<u8> {
        match self {
            Evidence::Borrowed { key, start, end } => {
                seq_store.get(key).map(|s| s[*start..*end].to_vec()).unwrap_or_default()
            }
            Evidence::Owned { bytes, .. } => bytes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaEntry {
    pub range_ref: Range,
    pub evidence: Evidence,
}

/// Per-chromosome table of `DeltaEntry` plus a dense density buffer (spec
/// §4.7/§4.6), all carrying a single `DeltaKind` tag.
#[derive(Debug, Clone)]
pub struct DeltaStore {
    pub kind: DeltaKind,
    entries: FxHashMap<String, Vec<DeltaEntry>>,
    density: FxHashMap<String, Vec<i32>>,
}

impl DeltaStore {
    pub fn new(kind: DeltaKind) -> Self {
        DeltaStore {
            kind,
            entries: FxHashMap::default(),
            density: FxHashMap::default(),
        }
    }

    pub fn chromosomes(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn get(&self, chrom: &str) -> &[DeltaEntry] {
        self.entries.get(chrom).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn take(&mut self, chrom: &str) -> Vec<DeltaEntry> {
        self.entries.remove(chrom).unwrap_or_default()
    }

    pub fn put_all(&mut self, chrom: &str, mut new_entries: Vec<DeltaEntry>) {
        self.entries.entry(chrom.to_string()).or_default().append(&mut new_entries);
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert `range_ref`/`evidence` under `chrom`, combining with an
    /// existing entry when possible (spec §4.7). Entries at or below
    /// `DELTA_IGNORE_LEN` are dropped at set time.
    pub fn set(&mut self, chrom: &str, range_ref: Range, evidence: Evidence, ref_len: usize, seq_store: &SeqStore, cfg: &Config) {
        if range_ref.len() <= cfg.delta_ignore_len {
            debug!("DeltaStore::set: dropping {}-length delta at set time (<= DELTA_IGNORE_LEN)", range_ref.len());
            return;
        }

        self.bump_density(chrom, &range_ref, ref_len, cfg);

        let bucket = self.entries.entry(chrom.to_string()).or_default();
        for existing in bucket.iter_mut().rev() {
            if Self::try_combine(existing, &range_ref, &evidence, seq_store, cfg, false) {
                debug!("DeltaStore::set: combined {} {}", self.kind.label(), range_ref.stringify());
                return;
            }
        }

        debug!("DeltaStore::set: saved {} {}", self.kind.label(), range_ref.stringify());
        bucket.push(DeltaEntry { range_ref, evidence });
    }

    /// Combine rule (spec §4.7): reference ranges overlap with `strict`'s
    /// tighter slack (`GAP_MIN_DIFF`) or the looser `GAP_MAX_DIFF`, and the
    /// combined length stays within `DELTA_ALLOW_LEN`. When both sides point
    /// into the same named sequence, the segment-side hull is extended too;
    /// otherwise a synthetic N-filled buffer is built and painted with both
    /// contributors' bases (non-N wins, later contributor wins ties).
    fn try_combine(base: &mut DeltaEntry, incoming_ref: &Range, incoming_evidence: &Evidence, seq_store: &SeqStore, cfg: &Config, strict: bool) -> bool {
        let slack = if strict { cfg.gap_min_diff } else { cfg.gap_max_diff };
        let overlaps = base.range_ref.end as u64 + slack >= incoming_ref.start as u64
            && incoming_ref.end as u64 + slack >= base.range_ref.start as u64;
        if !overlaps {
            return false;
        }

        let new_ref = base.range_ref.hull(incoming_ref);
        if new_ref.len() as u64 > cfg.delta_allow_len {
            return false;
        }

        let same_source = match (&base.evidence, incoming_evidence) {
            (Evidence::Borrowed { key: k1, .. }, Evidence::Borrowed { key: k2, .. }) => k1 == k2,
            _ => false,
        };

        if same_source {
            if let (Evidence::Borrowed { key, start: s1, end: e1 }, Evidence::Borrowed { start: s2, end: e2, .. }) =
                (&base.evidence, incoming_evidence)
            {
                base.evidence = Evidence::Borrowed {
                    key: key.clone(),
                    start: (*s1).min(*s2),
                    end: (*e1).max(*e2),
                };
            }
        } else {
            base.evidence = synthesize(&base.range_ref, &base.evidence, incoming_ref, incoming_evidence, &new_ref, seq_store, cfg);
        }

        base.range_ref = new_ref;
        true
    }

    /// Drop entries whose reference length falls outside
    /// `[DELTA_MIN_LEN, DELTA_MAX_LEN]`.
    pub fn filter(&mut self, cfg: &Config) {
        for entries in self.entries.values_mut() {
            entries.retain(|e| e.range_ref.len() >= cfg.delta_min_len && e.range_ref.len() <= cfg.delta_max_len);
        }
    }

    fn bump_density(&mut self, chrom: &str, range: &Range, ref_len: usize, cfg: &Config) {
        let padding = cfg.density_window_size;
        let buf = self.density.entry(chrom.to_string()).or_insert_with(|| vec![0i32; ref_len + padding]);
        if buf.len() < ref_len + padding {
            buf.resize(ref_len + padding, 0);
        }
        if range.start < buf.len() {
            buf[range.start] += 1;
        }
        if range.end < buf.len() {
            buf[range.end] -= 1;
        }
    }

    /// Density sweep (spec §4.6/§4.7): windowed mean of the signed density
    /// array over `range`, with hysteresis between `SIGNAL_RATE` (enter a
    /// band) and `SIGNAL_RATE - NOISE_RATE` (leave one). Returns the maximum
    /// windowed mean and the elevated bands found.
    pub fn get_density(&self, chrom: &str, range: &Range, cfg: &Config) -> (f64, Vec<Range>) {
        let density = match self.density.get(chrom) {
            Some(d) => d,
            None => return (0.0, Vec::new()),
        };
        let w = cfg.density_window_size.max(1);
        let mut prefix = vec![0i64; density.len() + 1];
        for i in 0..density.len() {
            prefix[i + 1] = prefix[i] + density[i] as i64;
        }

        let start = range.start.min(density.len());
        let end = range.end.min(density.len());

        let mut bands = Vec::new();
        let mut in_band = false;
        let mut band_start = start;
        let mut max_density = 0.0f64;

        for pos in start..end {
            let win_end = (pos + w).min(density.len());
            let sum = prefix[win_end] - prefix[pos];
            let mean = sum as f64 / w as f64;
            if mean > max_density {
                max_density = mean;
            }
            if !in_band && mean >= cfg.signal_rate {
                in_band = true;
                band_start = pos;
            } else if in_band && mean < cfg.signal_rate - cfg.noise_rate {
                bands.push(Range::new(band_start, pos, chrom));
                in_band = false;
            }
        }
        if in_band {
            bands.push(Range::new(band_start, end, chrom));
        }

        (max_density, bands)
    }

    /// Merge every entry fully contained within `range` into a single entry
    /// covering `range`, used by the from-segments density sweep (spec
    /// §4.6). Contained entries' evidence is discarded in favor of the
    /// reference content itself, since a merged signal band has no single
    /// coherent query-side evidence string.
    pub fn merge_into_range(&mut self, chrom: &str, range: &Range, seq_store: &SeqStore, cfg: &Config) {
        let entries = self.entries.entry(chrom.to_string()).or_default();
        let contained: Vec<DeltaEntry> = entries
            .iter()
            .filter(|e| e.range_ref.start >= range.start && e.range_ref.end <= range.end)
            .cloned()
            .collect();
        if contained.is_empty() {
            return;
        }
        entries.retain(|e| !(e.range_ref.start >= range.start && e.range_ref.end <= range.end));

        let evidence = match self.kind {
            DeltaKind::Del => Evidence::Borrowed {
                key: chrom.to_string(),
                start: range.start,
                end: range.end,
            },
            _ => {
                let bytes = seq_store
                    .get(chrom)
                    .map(|s| s[range.start.min(s.len())..range.end.min(s.len())].to_vec())
                    .unwrap_or_default();
                Evidence::Owned { bytes, unknown: false }
            }
        };
        entries.push(DeltaEntry {
            range_ref: range.clone(),
            evidence,
        });
        let _ = cfg;
    }
}

/// Build a synthetic N-filled evidence buffer covering `new_ref`'s length,
/// painting both contributors' bases at their relative offsets (non-N wins,
/// the later contributor wins an outright conflict), and flag `unknown` once
/// the fraction of remaining Ns reaches `UNKNOWN_RATE` (Open Question (3):
/// pinned here as `>=`, matching the historical behavior spec §9 asks tests
/// to fix).
fn synthesize(
    base_ref: &Range,
    base_evidence: &Evidence,
    incoming_ref: &Range,
    incoming_evidence: &Evidence,
    new_ref: &Range,
    seq_store: &SeqStore,
    cfg: &Config,
) -> Evidence {
    let mut buf = vec![b'N'; new_ref.len()];
    let base_bytes = base_evidence.materialize(seq_store);
    let incoming_bytes = incoming_evidence.materialize(seq_store);

    paint(&mut buf, base_ref.start, base_ref.len(), new_ref.start, &base_bytes);
    paint(&mut buf, incoming_ref.start, incoming_ref.len(), new_ref.start, &incoming_bytes);

    let n_count = buf.iter().filter(|&&b| b == b'N').count();
    let unknown = n_count as f64 >= buf.len() as f64 * cfg.unknown_rate;
    Evidence::Owned { bytes: buf, unknown }
}

fn paint(buf: &mut [u8], src_start: usize, src_len: usize, hull_start: usize, src_bytes: &[u8]) {
    if src_bytes.len() < src_len {
        return;
    }
    let offset = src_start.saturating_sub(hull_start);
    for i in 0..src_len {
        let dest = offset + i;
        if dest < buf.len() && src_bytes[i] != b'N' {
            buf[dest] = src_bytes[i];
        }
    }
}

pub fn fuzzy_compare_ranges(a: &Range, b: &Range, cfg: &Config) -> bool {
    fuzzy_compare_len(a.len() as u64, b.len() as u64, cfg.gap_max_diff)
        && a.end as u64 + cfg.gap_max_diff >= b.start as u64
        && b.end as u64 + cfg.gap_max_diff >= a.start as u64
}
