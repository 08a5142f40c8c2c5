//! External interfaces (spec §6): the plain whitespace-delimited file
//! formats this crate reads and writes at its edges. Grounded on the
//! teacher's `cli/io.rs` / `reference/bed.rs` (`anyhow::Context` on every
//! fallible open, `BufReader`/`split_whitespace` line parsing) — this spec's
//! formats are a toy subset no existing crate targets, so parsing is
//! hand-rolled rather than pulled from a dependency, same as the teacher does
//! for its own BED loader.

pub mod bed;
pub mod fasta;
pub mod index_file;
pub mod overlaps_file;

pub use bed::write_deltas;
pub use fasta::read_fasta;
pub use index_file::{read_index_file, write_index_file};
pub use overlaps_file::{read_overlaps_file, write_overlaps_file};
