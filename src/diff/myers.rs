//! `MyersDiffEngine`, chunked (spec §4.5).
//!
//! Grounded on `Dna::FindDeltasChunk` (`examples/original_source/src/common/dna.cpp`):
//! same `end_xs` k-line array indexed by `k + padding`, the same `is_from_up`
//! tie-break (`k == -step` ⇒ vertical, `k == step` ⇒ horizontal, else compare
//! neighbor `end_xs`), and the same two-pass forward/backtrack structure. The
//! bounded-noise snake extension (`error_len`/`error_score`/`MYERS_PENALTY`/
//! `ERROR_MAX_SCORE`) is spec §4.5's enrichment over the original's bare
//! "stop at the first mismatch" rule; with the spec's default
//! `ERROR_MAX_SCORE = 0.0` the two behave identically; the forward/backtrack
//! `Vec<Vec<i64>>` step history is the Design Notes' accepted `O((M+N)^2)`
//! per-chunk memory tradeoff, kept as-is rather than switching to a
//! Hirschberg-style streaming variant.

use crate::config::Config;
use crate::range::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    const ZERO: Point = Point { x: 0, y: 0 };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaKind {
    Ins,
    Del,
}

/// One insertion or deletion produced by the diff engine, in reference-
/// absolute coordinates. For `Ins`, `evidence` is the matching slice of the
/// query/segment sequence; for `Del`, per spec Open Question (2), `evidence`
/// is the *reference* substring it deletes (there is no query-side content
/// to quote) — this is reproduced literally because the delta postprocess
/// step relies on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaEvent {
    pub kind: DeltaKind,
    pub range_ref: Range,
    pub evidence: Vec<u8>,
}

/// Run the chunked diff over the full `ref_seq`/`sv_seq` pair for one
/// chromosome, splitting into `CHUNK_SIZE`-sized windows per spec §4.5.
/// `reach_start` is always `true` here: every chunk's local coordinate frame
/// genuinely starts at `(0, 0)` once `ref_start`/`sv_start` are added back in
/// by the caller, so the backtrack always fully reconstructs back to the
/// chunk's own origin (see `diff_chunk` docs for the alternative the spec
/// describes but which this driver never needs).
pub fn diff(chrom: &str, ref_seq: &[u8], sv_seq: &[u8], cfg: &Config) -> Vec<DeltaEvent> {
    let mut events = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);

    while i < ref_seq.len() || j < sv_seq.len() {
        let m = (ref_seq.len() - i).min(cfg.chunk_size);
        let n = (sv_seq.len() - j).min(cfg.chunk_size);
        let reach_end = m < cfg.chunk_size || n < cfg.chunk_size;

        let (next, mut chunk_events) = diff_chunk(chrom, ref_seq, i, m, sv_seq, j, n, true, reach_end, cfg);
        events.append(&mut chunk_events);

        if next.x == 0 && next.y == 0 {
            break;
        }
        i += next.x as usize;
        j += next.y as usize;
    }

    events
}

/// Diff `ref_seq[ref_start..ref_start+m]` against `sv_seq[sv_start..sv_start+n]`.
///
/// `reach_end`: forward-pass termination test, per spec §4.5 — `true`
/// requires `x >= m AND y >= n` (both inputs fully consumed, used for the
/// final chunk); `false` requires `x >= m OR y >= n` (used for a chunk that
/// isn't the last, stopping as soon as either input boundary is reached).
///
/// `reach_start`: backtrack termination test — `true` requires `start.x <= 0
/// AND start.y <= 0`; `false` requires either. `diff()` above always passes
/// `true`; a caller driving partial, mid-sequence-window reconstructions
/// (not needed by this crate's two pipelines) would pass `false`.
///
/// Returns the chunk's `next_chunk_start` (local offsets the caller adds to
/// its running `(i, j)`) and the insert/delete deltas reconstructed from the
/// backtrack.
#[allow(clippy::too_many_arguments)]
pub fn diff_chunk(
    chrom: &str,
    ref_seq: &[u8],
    ref_start: usize,
    m: usize,
    sv_seq: &[u8],
    sv_start: usize,
    n: usize,
    reach_start: bool,
    reach_end: bool,
    cfg: &Config,
) -> (Point, Vec<DeltaEvent>) {
    let max_steps = (m + n) as i64;
    let padding = max_steps;
    let width = (max_steps as usize) * 2 + 1;
    let idx = |k: i64| -> usize { (k + padding) as usize };

    let mut end_xs = vec![0i64; width.max(1)];
    let mut history: Vec<Vec<i64>> = Vec::new();
    let mut next_chunk_start = Point { x: m as i64, y: n as i64 };
    let mut solved = false;

    let mut step = 0i64;
    while step <= max_steps {
        let mut k = -step;
        while k <= step {
            let from_up = if k == -step {
                true
            } else if k == step {
                false
            } else {
                end_xs[idx(k + 1)] > end_xs[idx(k - 1)]
            };
            let prev_k = if from_up { k + 1 } else { k - 1 };
            let start_x = end_xs[idx(prev_k)];
            let start = Point { x: start_x, y: start_x - prev_k };

            let mid_x = if from_up { start.x } else { start.x + 1 };
            let mid = Point { x: mid_x, y: mid_x - k };

            let end = extend_snake(mid, ref_seq, ref_start, m, sv_seq, sv_start, n, cfg);
            end_xs[idx(k)] = end.x;

            if if reach_end {
                end.x >= m as i64 && end.y >= n as i64
            } else {
                end.x >= m as i64 || end.y >= n as i64
            } {
                solved = true;
                next_chunk_start = end;
            }

            k += 2;
            if solved {
                break;
            }
        }
        history.push(end_xs.clone());
        if solved {
            break;
        }
        step += 1;
    }

    let events = backtrack(chrom, &mut history, next_chunk_start, padding, reach_start, ref_start, ref_seq, sv_start, sv_seq);
    (next_chunk_start, events)
}

/// Extend the diagonal from `mid` as long as bases match (N matches
/// anything), tolerating a bounded run of mismatches per spec §4.5: each
/// mismatch adds 1 to `error_score`; each match decays it by
/// `MYERS_PENALTY`, clamped at 0, resetting `error_len` once the score hits
/// 0. If the accumulated score ever exceeds `ERROR_MAX_SCORE`, the last
/// `error_len` steps are rolled back and the snake stops there. A final
/// snake shorter than `SNAKE_MIN_LEN` is discarded (`end = mid`) — noise, not
/// a real match run.
#[allow(clippy::too_many_arguments)]
fn extend_snake(
    mid: Point,
    ref_seq: &[u8],
    ref_start: usize,
    m: usize,
    sv_seq: &[u8],
    sv_start: usize,
    n: usize,
    cfg: &Config,
) -> Point {
    let mut end = mid;
    let mut snake = 0i64;
    let mut error_len = 0i64;
    let mut error_score = 0.0f64;

    loop {
        if end.x >= m as i64 || end.y >= n as i64 {
            break;
        }
        let ref_char = ref_seq[ref_start + end.x as usize];
        let sv_char = sv_seq[sv_start + end.y as usize];
        let matches = ref_char == sv_char || ref_char == b'N' || sv_char == b'N';

        if matches {
            end.x += 1;
            end.y += 1;
            snake += 1;
            error_score = (error_score - cfg.myers_penalty).max(0.0);
            if error_score == 0.0 {
                error_len = 0;
            }
        } else {
            error_len += 1;
            error_score += 1.0;
            end.x += 1;
            end.y += 1;
            snake += 1;
            if error_score > cfg.error_max_score {
                end.x -= error_len;
                end.y -= error_len;
                snake -= error_len;
                break;
            }
        }
    }

    if snake < cfg.snake_min_len as i64 {
        end = mid;
    }
    end
}

#[allow(clippy::too_many_arguments)]
fn backtrack(
    chrom: &str,
    history: &mut Vec<Vec<i64>>,
    next_chunk_start: Point,
    padding: i64,
    reach_start: bool,
    ref_start: usize,
    ref_seq: &[u8],
    sv_start: usize,
    sv_seq: &[u8],
) -> Vec<DeltaEvent> {
    let idx = |k: i64| -> usize { (k + padding) as usize };
    let mut events = Vec::new();

    let terminated = |p: Point| {
        if reach_start {
            p.x <= 0 && p.y <= 0
        } else {
            p.x <= 0 || p.y <= 0
        }
    };

    let mut cur = next_chunk_start;
    let mut prev_from_up: Option<bool> = None;
    let mut prev_end = Point::ZERO;
    let mut last_end = Point::ZERO;

    while !terminated(cur) {
        let end_xs = match history.pop() {
            Some(v) => v,
            None => break,
        };
        let step = history.len() as i64;

        let k = cur.x - cur.y;
        let end_x = end_xs[idx(k)];
        let end = Point { x: end_x, y: end_x - k };

        let from_up = if k == -step {
            true
        } else if k == step {
            false
        } else {
            end_xs[idx(k + 1)] > end_xs[idx(k - 1)]
        };
        let prev_k = if from_up { k + 1 } else { k - 1 };
        let start_x = end_xs[idx(prev_k)];
        let start = Point { x: start_x, y: start_x - prev_k };

        let mid_x = if from_up { start.x } else { start.x + 1 };
        let mid = Point { x: mid_x, y: mid_x - k };

        if mid != end || Some(from_up) != prev_from_up {
            match prev_from_up {
                Some(true) if end.y < prev_end.y => {
                    events.push(make_ins(chrom, ref_start, sv_start, sv_seq, end, prev_end));
                }
                Some(false) if end.x < prev_end.x => {
                    events.push(make_del(chrom, ref_start, ref_seq, end, prev_end));
                }
                _ => {}
            }
            prev_end = mid;
        }

        last_end = end;
        prev_from_up = if mid == end { Some(from_up) } else { None };
        cur = start;
    }

    if prev_end != Point::ZERO && last_end != Point::ZERO {
        match prev_from_up {
            Some(true) => events.push(make_ins(chrom, ref_start, sv_start, sv_seq, Point::ZERO, prev_end)),
            Some(false) => events.push(make_del(chrom, ref_start, ref_seq, Point::ZERO, prev_end)),
            None => {}
        }
    }

    events
}

fn make_ins(chrom: &str, ref_start: usize, sv_start: usize, sv_seq: &[u8], end: Point, prev_end: Point) -> DeltaEvent {
    let size = (prev_end.y - end.y) as usize;
    let ref_pos = ref_start + end.x as usize;
    let sv_pos = sv_start + end.y as usize;
    DeltaEvent {
        kind: DeltaKind::Ins,
        range_ref: Range::new(ref_pos, ref_pos + size, chrom),
        evidence: sv_seq[sv_pos..sv_pos + size].to_vec(),
    }
}

fn make_del(chrom: &str, ref_start: usize, ref_seq: &[u8], end: Point, prev_end: Point) -> DeltaEvent {
    let size = (prev_end.x - end.x) as usize;
    let ref_pos = ref_start + end.x as usize;
    DeltaEvent {
        kind: DeltaKind::Del,
        range_ref: Range::new(ref_pos, ref_pos + size, chrom),
        evidence: ref_seq[ref_pos..ref_pos + size].to_vec(),
    }
}
