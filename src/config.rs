//! Single configuration record threaded through every subsystem, in place of
//! global constants, so that the pipeline stays testable end to end.

/// Every tunable knob used across the minimizer index, overlap merger, Myers
/// diff engine, delta pipeline, and fuzzy kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// k-mer length used by the rolling hash (valid range 1..30).
    pub hash_size: usize,
    /// Minimizer window size.
    pub window_size: usize,
    /// Size of one Myers diff chunk.
    pub chunk_size: usize,

    /// Minimum anchor count for an orientation to be selected in OverlapFinder.
    pub overlap_min_count: usize,
    /// Minimum merged-anchor count to keep after OverlapMerger.
    pub minimizer_min_count: usize,
    /// Minimum merged-anchor length (both sides) to keep after OverlapMerger.
    pub minimizer_min_len: usize,
    /// Maximum allowed mismatch between reference/segment growth while merging anchors.
    pub minimizer_max_diff: u64,

    /// Delta length band kept after DeltaStore::filter.
    pub delta_min_len: usize,
    pub delta_max_len: usize,
    /// Deltas at or below this reference length are dropped at `Set` time.
    pub delta_ignore_len: usize,
    /// Largest reference length a combined delta may reach.
    pub delta_allow_len: u64,

    /// Density sweep window used by `GetDensity` / from-segments path.
    pub density_window_size: usize,
    pub noise_rate: f64,
    pub signal_rate: f64,

    /// Diagonal runs shorter than this are treated as noise and discarded.
    pub snake_min_len: usize,
    /// Per-mismatch score decay recovered by each subsequent match.
    pub myers_penalty: f64,
    /// Snake extension aborts once accumulated error score exceeds this.
    pub error_max_score: f64,

    /// Mismatch penalty applied by the fuzzy LCSubstring/LCSubsequence DPs.
    pub dp_penalty: i64,

    /// Overlap slack used by strict (Combine) range comparisons.
    pub gap_min_diff: u64,
    /// Overlap slack used by loose (Combine / FuzzyCompare-on-ranges) comparisons.
    pub gap_max_diff: u64,

    /// Strict acceptance ratio for `FuzzyCompare` via LCSubstring.
    pub strict_equal_rate: f64,
    /// Fuzzy acceptance ratio for `FuzzyCompare` via LCSubsequence.
    pub fuzzy_equal_rate: f64,

    /// Fraction of N bases in a synthetic DeltaStore fill above which the
    /// entry is marked `unknown`.
    pub unknown_rate: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            hash_size: 15,
            window_size: 10,
            chunk_size: 50_000,

            overlap_min_count: 30,
            minimizer_min_count: 4,
            minimizer_min_len: 500,
            minimizer_max_diff: 1200,

            delta_min_len: 100,
            delta_max_len: 1000,
            delta_ignore_len: 1,
            delta_allow_len: 1000,

            density_window_size: 40,
            noise_rate: 0.10,
            signal_rate: 0.55,

            snake_min_len: 3,
            myers_penalty: 0.25,
            error_max_score: 0.0,

            dp_penalty: 2,

            gap_min_diff: 1,
            gap_max_diff: 30,

            strict_equal_rate: 0.4,
            fuzzy_equal_rate: 0.6,

            unknown_rate: 0.10,
        }
    }
}

impl Config {
    /// `mask = (1 << 2K) - 1`, the bitmask applied after each hash shift.
    pub fn hash_mask(&self) -> u64 {
        if self.hash_size >= 32 {
            u64::MAX
        } else {
            (1u64 << (self.hash_size * 2)) - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.hash_size, 15);
        assert_eq!(cfg.window_size, 10);
        assert_eq!(cfg.chunk_size, 50_000);
        assert_eq!(cfg.overlap_min_count, 30);
        assert_eq!(cfg.minimizer_min_count, 4);
        assert_eq!(cfg.minimizer_min_len, 500);
        assert_eq!(cfg.minimizer_max_diff, 1200);
        assert_eq!(cfg.delta_min_len, 100);
        assert_eq!(cfg.delta_max_len, 1000);
        assert_eq!(cfg.snake_min_len, 3);
        assert_eq!(cfg.dp_penalty, 2);
        assert_eq!(cfg.gap_min_diff, 1);
        assert_eq!(cfg.gap_max_diff, 30);
    }

    #[test]
    fn hash_mask_covers_2k_bits() {
        let mut cfg = Config::default();
        cfg.hash_size = 15;
        assert_eq!(cfg.hash_mask(), (1u64 << 30) - 1);
    }
}
