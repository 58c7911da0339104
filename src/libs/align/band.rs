use crate::libs::chain::{Block, SubMatrix};

/// Which end of the window the alignment is anchored at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Anchored at the start of both windows, extending rightward.
    Forward,
    /// Anchored at the end of both windows, extending leftward.
    Backward,
}

/// Aligns two windows within a band around the anchored diagonal.
///
/// Returned blocks are in window coordinates, ordered, and non-overlapping.
/// An empty result means no extension scores above zero.
pub trait BandExtender: Sync {
    fn band_ext(
        &self,
        query: &[u8],
        target: &[u8],
        direction: Direction,
        max_band_gap: usize,
        matrix: &SubMatrix,
    ) -> Vec<Block>;
}

/// Gotoh affine-gap dynamic programming restricted to `|i - j| <= max_band_gap`.
///
/// A gap of `n` bases costs `gap_open + n * gap_extend` of the matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct BandedAligner;

const NEG: i32 = i32::MIN / 4;

// Traceback bits: low two bits pick the H source, the others record gap extension.
const FROM_DIAG: u8 = 0;
const FROM_E: u8 = 1;
const FROM_F: u8 = 2;
const E_EXTENDED: u8 = 4;
const F_EXTENDED: u8 = 8;

impl BandExtender for BandedAligner {
    fn band_ext(
        &self,
        query: &[u8],
        target: &[u8],
        direction: Direction,
        max_band_gap: usize,
        matrix: &SubMatrix,
    ) -> Vec<Block> {
        match direction {
            Direction::Forward => extend_forward(query, target, max_band_gap, matrix),
            Direction::Backward => {
                let q_rev: Vec<u8> = query.iter().rev().copied().collect();
                let t_rev: Vec<u8> = target.iter().rev().copied().collect();
                let q_len = query.len() as u64;
                let t_len = target.len() as u64;
                extend_forward(&q_rev, &t_rev, max_band_gap, matrix)
                    .into_iter()
                    .rev()
                    .map(|b| {
                        Block::new(
                            q_len - b.q_end,
                            q_len - b.q_start,
                            t_len - b.t_end,
                            t_len - b.t_start,
                        )
                    })
                    .collect()
            }
        }
    }
}

fn extend_forward(query: &[u8], target: &[u8], w: usize, matrix: &SubMatrix) -> Vec<Block> {
    let m = query.len();
    let n = target.len();
    if m == 0 || n == 0 {
        return Vec::new();
    }

    let width = 2 * w + 1;
    let idx = |i: usize, j: usize| i * width + (j + w - i);
    let open = matrix.gap_open + matrix.gap_extend;
    let extend = matrix.gap_extend;

    let cells = (m + 1) * width;
    let mut h = vec![NEG; cells];
    let mut e = vec![NEG; cells];
    let mut f = vec![NEG; cells];
    let mut trace = vec![0u8; cells];

    h[idx(0, 0)] = 0;
    let mut best = (0, 0, 0);

    for i in 0..=m {
        let j_lo = i.saturating_sub(w);
        let j_hi = n.min(i + w);
        for j in j_lo..=j_hi {
            if i == 0 && j == 0 {
                continue;
            }
            let mut bits = 0u8;

            // Gap in the query: consumes a target base
            let e_val = if j > j_lo {
                let from_h = h[idx(i, j - 1)] - open;
                let from_e = e[idx(i, j - 1)] - extend;
                if from_e > from_h {
                    bits |= E_EXTENDED;
                    from_e
                } else {
                    from_h
                }
            } else {
                NEG
            };

            // Gap in the target: consumes a query base
            let f_val = if i > 0 && j < i + w {
                let from_h = h[idx(i - 1, j)] - open;
                let from_f = f[idx(i - 1, j)] - extend;
                if from_f > from_h {
                    bits |= F_EXTENDED;
                    from_f
                } else {
                    from_h
                }
            } else {
                NEG
            };

            let d_val = if i > 0 && j > 0 {
                h[idx(i - 1, j - 1)] + matrix.score(query[i - 1], target[j - 1])
            } else {
                NEG
            };

            let (h_val, source) = if d_val >= e_val && d_val >= f_val {
                (d_val, FROM_DIAG)
            } else if e_val >= f_val {
                (e_val, FROM_E)
            } else {
                (f_val, FROM_F)
            };

            let k = idx(i, j);
            h[k] = h_val;
            e[k] = e_val;
            f[k] = f_val;
            trace[k] = bits | source;

            if h_val > best.0 {
                best = (h_val, i, j);
            }
        }
    }

    if best.0 <= 0 {
        return Vec::new();
    }

    // Walk back from the best cell, collecting aligned pairs
    let mut pairs = Vec::new();
    let (_, mut i, mut j) = best;
    let mut state = FROM_DIAG;
    while i > 0 || j > 0 {
        let bits = trace[idx(i, j)];
        match state {
            FROM_DIAG => match bits & 3 {
                FROM_DIAG => {
                    pairs.push((i - 1, j - 1));
                    i -= 1;
                    j -= 1;
                }
                FROM_E => state = FROM_E,
                _ => state = FROM_F,
            },
            FROM_E => {
                j -= 1;
                if bits & E_EXTENDED == 0 {
                    state = FROM_DIAG;
                }
            }
            _ => {
                i -= 1;
                if bits & F_EXTENDED == 0 {
                    state = FROM_DIAG;
                }
            }
        }
    }
    pairs.reverse();

    let mut blocks: Vec<Block> = Vec::new();
    for (qi, tj) in pairs {
        let (qi, tj) = (qi as u64, tj as u64);
        match blocks.last_mut() {
            Some(b) if b.q_end == qi && b.t_end == tj => {
                b.q_end += 1;
                b.t_end += 1;
            }
            _ => blocks.push(Block::new(qi, qi + 1, tj, tj + 1)),
        }
    }
    for b in blocks.iter_mut() {
        b.score = matrix.score_ungapped(
            &query[b.q_start as usize..b.q_end as usize],
            &target[b.t_start as usize..b.t_end as usize],
        ) as f64;
    }

    blocks
}
