//! Overlaps side-file (spec §6): one line per anchor record,
//! `key_ref start_ref end_ref key_seg start_seg end_seg`. Orientation is
//! folded into the sign and order of the segment-side pair: negated encodes
//! `Complement`, reversed (`start_seg > end_seg`) encodes `Reverse`, both
//! encodes `ReverseComplement`.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::SvError;
use crate::overlap::finder::Anchor;
use crate::range::Range;
use crate::seq::Orientation;

fn encode_seg(range_seg: &Range, orientation: Orientation) -> (i64, i64) {
    let (s, e) = (range_seg.start as i64, range_seg.end as i64);
    match orientation {
        Orientation::Normal => (s, e),
        Orientation::Complement => (-s, -e),
        Orientation::Reverse => (e, s),
        Orientation::ReverseComplement => (-e, -s),
    }
}

fn decode_seg(raw_start: i64, raw_end: i64) -> (usize, usize, Orientation) {
    let negated = raw_start < 0 || raw_end < 0;
    let reversed = raw_start.abs() > raw_end.abs();
    let (start, end) = if reversed {
        (raw_end.unsigned_abs(), raw_start.unsigned_abs())
    } else {
        (raw_start.unsigned_abs(), raw_end.unsigned_abs())
    };
    let orientation = match (negated, reversed) {
        (false, false) => Orientation::Normal,
        (true, false) => Orientation::Complement,
        (false, true) => Orientation::Reverse,
        (true, true) => Orientation::ReverseComplement,
    };
    (start as usize, end as usize, orientation)
}

pub fn write_overlaps_file(anchors: &[Anchor], path: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(path).context("creating overlaps side-file")?);
    for a in anchors {
        let (seg_start, seg_end) = encode_seg(&a.range_seg, a.orientation);
        writeln!(
            out,
            "{} {} {} {} {} {}",
            a.range_ref.owner.as_deref().unwrap_or(""),
            a.range_ref.start,
            a.range_ref.end,
            a.key_seg,
            seg_start,
            seg_end
        )?;
    }
    Ok(())
}

pub fn read_overlaps_file(path: &Path) -> Result<Vec<Anchor>> {
    let file = File::open(path).map_err(|_| SvError::InputMissing { path: path.to_path_buf() })?;
    let reader = BufReader::new(file);
    let mut anchors = Vec::new();

    for line in reader.lines() {
        let line = line.context("reading overlaps side-file line")?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 6 {
            break;
        }
        let key_ref = fields[0];
        if key_ref.is_empty() {
            break;
        }
        let start_ref: usize = fields[1].parse().context("parsing overlap ref start")?;
        let end_ref: usize = fields[2].parse().context("parsing overlap ref end")?;
        let key_seg = fields[3];
        let raw_start: i64 = fields[4].parse().context("parsing overlap seg start")?;
        let raw_end: i64 = fields[5].parse().context("parsing overlap seg end")?;
        let (seg_start, seg_end, orientation) = decode_seg(raw_start, raw_end);

        anchors.push(Anchor {
            range_ref: Range::new(start_ref, end_ref, key_ref),
            key_seg: key_seg.to_string(),
            range_seg: Range::new(seg_start, seg_end, key_seg).with_mode(Orientation::Normal),
            orientation,
        });
    }

    Ok(anchors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn anchor(orientation: Orientation) -> Anchor {
        Anchor {
            range_ref: Range::new(10, 25, "chr1"),
            key_seg: "seg_a".to_string(),
            range_seg: Range::new(100, 115, "seg_a"),
            orientation,
        }
    }

    #[test]
    fn round_trips_every_orientation() {
        for orientation in Orientation::ALL {
            let anchors = vec![anchor(orientation)];
            let f = NamedTempFile::new().unwrap();
            write_overlaps_file(&anchors, f.path()).unwrap();
            let read_back = read_overlaps_file(f.path()).unwrap();
            assert_eq!(read_back.len(), 1);
            assert_eq!(read_back[0].orientation, orientation);
            assert_eq!(
                (read_back[0].range_seg.start, read_back[0].range_seg.end),
                (100, 115)
            );
        }
    }

    #[test]
    fn missing_file_is_input_missing() {
        assert!(read_overlaps_file(Path::new("/nonexistent/sv_caller_overlaps.txt")).is_err());
    }
}
