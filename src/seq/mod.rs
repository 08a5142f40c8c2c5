//! `SeqStore` — in-memory mapping from chromosome/segment name to sequence
//! bytes, plus the `Alphabet` base lookups and `Orientation` transform.
//!
//! Grounded on `reference::reference::kmer_codec`'s `static LUT: [u8; 256]`
//! pattern (`examples/LudvigOlsen-reference/src/reference/kmer_codec.rs`):
//! both the 2-bit hashing code and the complement pairing are table lookups
//! indexed by raw `u8`, not a `match` over `char`.

use fxhash::FxHashMap;

/// 2-bit code for hashing: A=0, T=1, C=2, G=3, N collapses onto A's code (0).
/// This is an accepted source of false-positive anchors on N-rich regions,
/// not a defect.
static CODE_LUT: [u8; 256] = {
    let mut t = [0u8; 256];
    t[b'A' as usize] = 0;
    t[b'T' as usize] = 1;
    t[b'C' as usize] = 2;
    t[b'G' as usize] = 3;
    t[b'N' as usize] = 0;
    t
};

/// Complement pairing; N maps to N.
static COMPLEMENT_LUT: [u8; 256] = {
    let mut t = [0u8; 256];
    t[b'A' as usize] = b'T';
    t[b'T' as usize] = b'A';
    t[b'C' as usize] = b'G';
    t[b'G' as usize] = b'C';
    t[b'N' as usize] = b'N';
    t
};

/// Every base accepted by this crate's alphabet.
pub const VALID_BASES: [u8; 5] = [b'A', b'C', b'G', b'T', b'N'];

#[inline(always)]
pub fn is_valid_base(b: u8) -> bool {
    matches!(b, b'A' | b'C' | b'G' | b'T' | b'N')
}

/// 2-bit code used by the rolling hash. N collapses onto A's code.
#[inline(always)]
pub fn code(base: u8) -> u64 {
    CODE_LUT[base as usize] as u64
}

/// Complement of a single base. N maps to N.
#[inline(always)]
pub fn complement(base: u8) -> u8 {
    COMPLEMENT_LUT[base as usize]
}

/// One of the four orientations a segment may be viewed or materialized in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Normal,
    Reverse,
    Complement,
    ReverseComplement,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::Normal,
        Orientation::Reverse,
        Orientation::Complement,
        Orientation::ReverseComplement,
    ];

    /// Read the byte at logical position `i` of `seq` as viewed under this
    /// orientation, without materializing a transformed copy.
    #[inline]
    pub fn value_at(self, seq: &[u8], i: usize) -> u8 {
        let len = seq.len();
        match self {
            Orientation::Normal => seq[i],
            Orientation::Reverse => seq[len - 1 - i],
            Orientation::Complement => complement(seq[i]),
            Orientation::ReverseComplement => complement(seq[len - 1 - i]),
        }
    }

    /// Materialize the full transform. Used only once per segment, when it is
    /// selected in a non-`Normal` mode.
    pub fn materialize(self, seq: &[u8]) -> Vec<u8> {
        (0..seq.len()).map(|i| self.value_at(seq, i)).collect()
    }
}

/// Reverse the byte order of `seq`.
pub fn reverse(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().copied().collect()
}

/// Complement every base in `seq`, preserving order.
pub fn complement_seq(seq: &[u8]) -> Vec<u8> {
    seq.iter().map(|&b| complement(b)).collect()
}

/// Reverse-complement `seq`.
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

/// In-memory mapping from chromosome or segment name to sequence bytes.
///
/// Read-only after import except that a segment's entry may be replaced
/// in-place exactly once, when `OverlapFinder` selects a non-`Normal`
/// orientation for it.
#[derive(Debug, Clone, Default)]
pub struct SeqStore {
    data: FxHashMap<String, Vec<u8>>,
}

impl SeqStore {
    pub fn new() -> Self {
        SeqStore {
            data: FxHashMap::default(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, seq: Vec<u8>) {
        self.data.insert(key.into(), seq);
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.data.get(key).map(|v| v.as_slice())
    }

    pub fn len_of(&self, key: &str) -> Option<usize> {
        self.data.get(key).map(|v| v.len())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<u8>)> {
        self.data.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Replace a segment's sequence in-place with its transformed form. Must
    /// only be called once per segment, before any anchor referring to it is
    /// consumed (spec §5 happens-before requirement).
    pub fn reorient(&mut self, key: &str, mode: Orientation) {
        if mode == Orientation::Normal {
            return;
        }
        if let Some(seq) = self.data.get_mut(key) {
            *seq = mode.materialize(seq);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complement_is_involutive() {
        let s = b"ACGTN".to_vec();
        assert_eq!(complement_seq(&complement_seq(&s)), s);
    }

    #[test]
    fn reverse_is_involutive() {
        let s = b"ACGTACGTN".to_vec();
        assert_eq!(reverse(&reverse(&s)), s);
    }

    #[test]
    fn reverse_complement_is_involutive() {
        let s = b"ACGTACGTN".to_vec();
        assert_eq!(reverse_complement(&reverse_complement(&s)), s);
    }

    #[test]
    fn n_maps_to_n_under_complement() {
        assert_eq!(complement(b'N'), b'N');
    }

    #[test]
    fn n_collides_with_a_for_hashing() {
        assert_eq!(code(b'N'), code(b'A'));
    }

    #[test]
    fn orientation_value_at_matches_materialize() {
        let s = b"ACGGTN".to_vec();
        for &mode in Orientation::ALL.iter() {
            let materialized = mode.materialize(&s);
            for i in 0..s.len() {
                assert_eq!(mode.value_at(&s, i), materialized[i]);
            }
        }
    }

    #[test]
    fn seq_store_reorient_is_one_shot_safe() {
        let mut store = SeqStore::new();
        store.insert("seg_1", b"ACGT".to_vec());
        store.reorient("seg_1", Orientation::ReverseComplement);
        assert_eq!(store.get("seg_1").unwrap(), b"ACGT");
        // ACGT revcomp is ACGT (palindrome), sanity check with a non-palindrome
        store.insert("seg_2", b"AACC".to_vec());
        store.reorient("seg_2", Orientation::ReverseComplement);
        assert_eq!(store.get("seg_2").unwrap(), b"GGTT");
    }
}
