//! OverlapFinder + OverlapMerger/Coverage (spec §4.2-§4.4).

pub mod finder;
pub mod merger;

pub use finder::{Anchor, OverlapFinder};
pub use merger::{coverage, MergedAnchor, OverlapMerger};
