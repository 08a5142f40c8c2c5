//! FASTA-like input (spec §6): whitespace-separated `>key value` pairs.
//! Grounded on the teacher's `reference::bed::load_windows` line-parsing
//! shape, adapted to this format's token stream (the key carries no line
//! structure of its own, unlike BED).

use anyhow::{Context, Result};
use log::warn;

use std::path::Path;

use crate::error::SvError;
use crate::seq::{is_valid_base, SeqStore};

/// Read a FASTA-like file into a `SeqStore`. The key token begins with `>`
/// (stripped to form the name); the following whitespace-separated token is
/// the sequence. Parsing stops at the first empty key, matching spec §6.
/// Sequences must already be uppercase `{A,C,G,T,N}` — unlike lower-casing
/// input, an unrecognized byte is a hard parse error (Design Notes §9).
pub fn read_fasta(path: &Path) -> Result<SeqStore> {
    let content = std::fs::read_to_string(path).map_err(|_| SvError::InputMissing { path: path.to_path_buf() })?;

    let mut tokens = content.split_whitespace();
    let mut store = SeqStore::new();

    loop {
        let Some(key_tok) = tokens.next() else { break };
        if !key_tok.starts_with('>') {
            return Err(SvError::InputMalformed {
                context: format!("expected a '>'-prefixed key token, found {key_tok:?}"),
            }
            .into());
        }
        let name = &key_tok[1..];
        if name.is_empty() {
            break;
        }

        let Some(seq_tok) = tokens.next() else {
            warn!("read_fasta: key {} has no following sequence token, stopping", name);
            break;
        };

        for &b in seq_tok.as_bytes() {
            if !is_valid_base(b) {
                return Err(SvError::InputMalformed {
                    context: format!("sequence {name} contains byte {b:#x} outside {{A,C,G,T,N}}"),
                }
                .into());
            }
        }

        store.insert(name, seq_tok.as_bytes().to_vec());
    }

    Ok(store)
}

/// Write a `SeqStore` back out in the same `>key value` token stream shape,
/// one record per line for readability (the reader tolerates any whitespace).
pub fn write_fasta(store: &SeqStore, path: &Path) -> Result<()> {
    use std::io::Write;
    let mut out = std::io::BufWriter::new(std::fs::File::create(path).context("creating fasta output")?);
    for (name, seq) in store.iter() {
        writeln!(out, ">{} {}", name, String::from_utf8_lossy(seq))?;
    }
    Ok(())
}
