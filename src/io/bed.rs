//! Deltas output (spec §6): one BED-like line per delta, `TYPE key_ref start
//! end`; TRA records append a second `key start end` triple. Grounded on the
//! teacher's `reference::bed::load_windows` for the general shape of reading
//! this style of file back (kept symmetric here since `sv_caller` only needs
//! to write it, but a reader is included for round-trip testing).

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::delta::postprocess::{TraRecord, TraStore};
use crate::delta::store::{DeltaKind, DeltaStore};
use crate::range::Range;

/// Write every entry across the four typed tables plus the TRA list.
pub fn write_deltas(
    ins: &DeltaStore,
    del: &DeltaStore,
    dup: &DeltaStore,
    inv: &DeltaStore,
    tra: &TraStore,
    path: &Path,
) -> Result<()> {
    let mut out = BufWriter::new(File::create(path).context("creating deltas output")?);

    for store in [ins, del, dup, inv] {
        for chrom in store.chromosomes() {
            for entry in store.get(chrom) {
                writeln!(out, "{} {} {} {}", store.kind.label(), chrom, entry.range_ref.start, entry.range_ref.end)?;
            }
        }
    }

    for record in tra.records() {
        writeln!(
            out,
            "TRA {} {} {} {} {} {}",
            record.chr_ins,
            record.range_ins.start,
            record.range_ins.end,
            record.chr_del,
            record.range_del.start,
            record.range_del.end
        )?;
    }

    Ok(())
}

/// Parsed delta record, used by tests and any downstream tooling that wants
/// to read this output back rather than re-run the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaRecord {
    Typed { kind: DeltaKind, chrom: String, range: Range },
    Tra(TraRecord),
}

pub fn read_deltas(path: &Path) -> Result<Vec<DeltaRecord>> {
    let file = File::open(path).context("opening deltas output")?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for line in reader.lines() {
        let line = line.context("reading deltas output line")?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [kind, chrom, start, end] => {
                let kind = parse_kind(*kind)?;
                let start: usize = start.parse().context("parsing delta start")?;
                let end: usize = end.parse().context("parsing delta end")?;
                records.push(DeltaRecord::Typed {
                    kind,
                    chrom: chrom.to_string(),
                    range: Range::new(start, end, *chrom),
                });
            }
            ["TRA", chr_ins, ins_start, ins_end, chr_del, del_start, del_end] => {
                records.push(DeltaRecord::Tra(TraRecord {
                    chr_ins: chr_ins.to_string(),
                    range_ins: Range::new(
                        ins_start.parse().context("parsing TRA ins start")?,
                        ins_end.parse().context("parsing TRA ins end")?,
                        *chr_ins,
                    ),
                    chr_del: chr_del.to_string(),
                    range_del: Range::new(
                        del_start.parse().context("parsing TRA del start")?,
                        del_end.parse().context("parsing TRA del end")?,
                        *chr_del,
                    ),
                }));
            }
            _ => continue,
        }
    }

    Ok(records)
}

fn parse_kind(label: &str) -> Result<DeltaKind> {
    match label {
        "INS" => Ok(DeltaKind::Ins),
        "DEL" => Ok(DeltaKind::Del),
        "DUP" => Ok(DeltaKind::Dup),
        "INV" => Ok(DeltaKind::Inv),
        other => Err(anyhow::anyhow!("unrecognized delta type {other:?}")),
    }
}
