//! Typed delta tables (spec §3, §4.7) and the postprocess sweep that
//! extracts DUP/INV/TRA from raw INS/DEL (spec §4.8).

pub mod postprocess;
pub mod store;

pub use postprocess::{postprocess, TraRecord, TraStore};
pub use store::{DeltaEntry, DeltaKind, DeltaStore, Evidence};
