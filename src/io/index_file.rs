//! Index side-file (spec §6): one record per line, `hash key start end`.
//! Grounded on the teacher's `reference::bed::load_windows` reader shape.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::SvError;
use crate::index::MinimizerIndex;
use crate::range::Range;

/// Dump every record of `index` to `path`, one per line.
pub fn write_index_file(index: &MinimizerIndex, path: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(path).context("creating index side-file")?);
    for (hash, chrom, range) in index.iter() {
        writeln!(out, "{} {} {} {}", hash, chrom, range.start, range.end)?;
    }
    Ok(())
}

/// Read `path` back into a `MinimizerIndex`. Parsing stops at the first
/// record with `hash == 0` or an empty key (spec §6).
pub fn read_index_file(path: &Path) -> Result<MinimizerIndex> {
    let file = File::open(path).map_err(|_| SvError::InputMissing { path: path.to_path_buf() })?;
    let reader = BufReader::new(file);
    let mut index = MinimizerIndex::new();

    for line in reader.lines() {
        let line = line.context("reading index side-file line")?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            break;
        }
        let hash: u64 = fields[0].parse().context("parsing index hash")?;
        let key = fields[1];
        if hash == 0 || key.is_empty() {
            break;
        }
        let start: usize = fields[2].parse().context("parsing index start")?;
        let end: usize = fields[3].parse().context("parsing index end")?;
        index.insert(hash, key.to_string(), Range::new(start, end, key));
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::NamedTempFile;

    #[test]
    fn round_trips_through_a_file() {
        let cfg = Config {
            hash_size: 4,
            window_size: 5,
            ..Config::default()
        };
        let mut index = MinimizerIndex::new();
        index.build_for_chromosome("chr1", b"ACGTACGTTGCATGCATGCATGCACGTACGTT", &cfg);
        assert!(!index.is_empty());

        let f = NamedTempFile::new().unwrap();
        write_index_file(&index, f.path()).unwrap();
        let read_back = read_index_file(f.path()).unwrap();
        assert_eq!(read_back.len(), index.len());
    }

    #[test]
    fn stops_on_zero_hash_sentinel() {
        use std::io::Write;
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "123 chr1 0 15").unwrap();
        writeln!(f, "0 chr1 10 25").unwrap();
        writeln!(f, "456 chr1 30 45").unwrap();
        let index = read_index_file(f.path()).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn missing_file_is_input_missing() {
        assert!(read_index_file(Path::new("/nonexistent/sv_caller_index.idx")).is_err());
    }
}
