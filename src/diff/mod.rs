//! Chunked Myers `O((M+N)D)` edit-script engine (spec §4.5).

pub mod myers;

pub use myers::{diff, DeltaEvent, DeltaKind, Point};
