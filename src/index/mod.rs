//! `RollingHash` / `MinimizerIndex` (spec §4.1).
//!
//! Grounded on `Dna::NextHash` / `Dna::CreateIndex`
//! (`examples/original_source/src/common/dna.cpp`): a 2-bit packed rolling
//! hash fed through a min-priority-queue windowed minimizer selector. The
//! priority queue here is a `BinaryHeap<Reverse<(u64, usize)>>`, the
//! idiomatic Rust min-heap, matching the original's
//! `priority_queue<HashPos, vector<HashPos>, decltype(compare)>` with its
//! greater-than comparator.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use fxhash::FxHashMap;

use crate::config::Config;
use crate::range::Range;
use crate::seq::code;

/// `next_hash(h, base) = ((h << 2) & mask) | code(base)`.
#[inline]
pub fn next_hash(h: u64, base: u8, mask: u64) -> u64 {
    ((h << 2) & mask) | code(base)
}

/// Hash-multimap `u64 -> (chromosome, range_ref)`.
#[derive(Debug, Default, Clone)]
pub struct MinimizerIndex {
    entries: FxHashMap<u64, Vec<(String, Range)>>,
}

impl MinimizerIndex {
    pub fn new() -> Self {
        MinimizerIndex {
            entries: FxHashMap::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, hash: u64, chrom: String, range: Range) {
        self.entries.entry(hash).or_default().push((chrom, range));
    }

    pub fn get(&self, hash: u64) -> Option<&[(String, Range)]> {
        self.entries.get(&hash).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(|v| v.len()).sum()
    }

    /// Enumerate every `(hash, chromosome, range)` record, for writing the
    /// index side-file (spec §6).
    pub fn iter(&self) -> impl Iterator<Item = (u64, &str, &Range)> {
        self.entries
            .iter()
            .flat_map(|(&hash, v)| v.iter().map(move |(chrom, range)| (hash, chrom.as_str(), range)))
    }

    /// Build the minimizer index for one chromosome's sequence and merge its
    /// emissions into this index.
    pub fn build_for_chromosome(&mut self, chrom: &str, seq: &[u8], cfg: &Config) {
        for (hash, start, end) in minimizers(seq, cfg) {
            self.insert(hash, chrom.to_string(), Range::new(start, end, chrom));
        }
    }
}

/// Enumerate the window minimizers of `seq` under `cfg`'s `hash_size` and
/// `window_size`. Returns `(hash, start, end)` triples in position order.
///
/// Mirrors `Dna::CreateIndex`'s windowed min-priority-queue sweep: hashes
/// entering the window older than `window_size` positions are lazily
/// discarded from the top of the heap rather than eagerly swept, and a
/// minimizer is only emitted when the current window minimum differs from
/// the previous step's (spec §4.1: "If top.position differs from the
/// minimum emitted last step, emit...").
pub fn minimizers(seq: &[u8], cfg: &Config) -> Vec<(u64, usize, usize)> {
    let k = cfg.hash_size;
    let w = cfg.window_size;
    let mask = cfg.hash_mask();
    let mut out = Vec::new();

    if seq.len() < k {
        return out;
    }

    let mut hash = 0u64;
    for &b in &seq[0..k - 1] {
        hash = next_hash(hash, b, mask);
    }

    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = BinaryHeap::new();
    let mut last_emitted: Option<usize> = None;

    for i in (k - 1)..seq.len() {
        hash = next_hash(hash, seq[i], mask);
        let pos = i + 1 - k;
        heap.push(Reverse((hash, pos)));

        while let Some(&Reverse((_, top_pos))) = heap.peek() {
            if top_pos + w < i {
                heap.pop();
            } else {
                break;
            }
        }

        if let Some(&Reverse((top_hash, top_pos))) = heap.peek() {
            if last_emitted != Some(top_pos) {
                out.push((top_hash, top_pos, top_pos + k));
                last_emitted = Some(top_pos);
            }
        }
    }

    out
}
