//! Error taxonomy for this crate.
//!
//! Contract violations are deliberately not a variant constructed by normal
//! control flow: they fail fast via `panic!`/`debug_assert!` rather than
//! being returned as recoverable errors. Benign, expected skips are never an
//! error at all — they're logged at `debug!` at the call site and the caller
//! simply moves on.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SvError {
    #[error("input file not found: {path}")]
    InputMissing { path: PathBuf },

    #[error("malformed input: {context}")]
    InputMalformed { context: String },

    #[error("overlap finder invoked with an empty reference index")]
    MissingIndex,
}
