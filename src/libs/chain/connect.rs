use crate::libs::chain::gap_calc::GapCalc;
use crate::libs::chain::record::Block;
use crate::libs::chain::sub_matrix::SubMatrix;
use crate::libs::error::{ChainError, Result};
use itertools::izip;

/// Added to the connection cost when one block would swallow the other
/// on one of the axes.
pub const FULL_OVERLAP_PENALTY: f64 = 100_000_000.0;

/// Best split of the bases two adjacent blocks both claim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossover {
    /// Overlap bases kept by the left block; the rest go to the right block.
    pub pos: u64,
    /// Score counted twice when both blocks keep the whole overlap.
    pub adjustment: f64,
}

/// Context required for scoring blocks and chains against actual sequence data.
///
/// `query` is already in the orientation of the chain's query strand.
#[derive(Clone, Copy)]
pub struct ScoreContext<'a> {
    pub query: &'a [u8],
    pub target: &'a [u8],
    pub matrix: &'a SubMatrix,
    pub gap_calc: &'a GapCalc,
}

fn window(seq: &[u8], start: u64, end: u64) -> &[u8] {
    seq.get(start as usize..end as usize).unwrap_or_default()
}

impl<'a> ScoreContext<'a> {
    pub fn new(
        query: &'a [u8],
        target: &'a [u8],
        matrix: &'a SubMatrix,
        gap_calc: &'a GapCalc,
    ) -> Self {
        ScoreContext {
            query,
            target,
            matrix,
            gap_calc,
        }
    }

    /// Same sequences and matrix, different gap costs.
    pub fn with_gap_calc(&self, gap_calc: &'a GapCalc) -> Self {
        ScoreContext { gap_calc, ..*self }
    }

    /// Gapless substitution score of a block.
    pub fn score_block(&self, b: &Block) -> f64 {
        let q = window(self.query, b.q_start, b.q_end);
        let t = window(self.target, b.t_start, b.t_end);
        self.matrix.score_ungapped(q, t) as f64
    }

    /// Substitution score of `len` bases starting at (`q_start`, `t_start`).
    pub fn score_ungapped(&self, q_start: u64, t_start: u64, len: u64) -> f64 {
        let q = window(self.query, q_start, q_start + len);
        let t = window(self.target, t_start, t_start + len);
        self.matrix.score_ungapped(q, t) as f64
    }

    pub fn score_blocks(&self, blocks: &mut [Block]) {
        for b in blocks.iter_mut() {
            b.score = self.score_block(b);
        }
    }

    pub fn gap_cost(&self, dq: i64, dt: i64) -> f64 {
        self.gap_calc.calc(dq, dt) as f64
    }

    /// Finds the optimal crossover point for two blocks overlapping by `overlap` bases.
    ///
    /// Starts with every overlapped base on the right block and slides the boundary
    /// rightward, one base at a time, handing bases to the left block.
    pub fn find_crossover(&self, left: &Block, right: &Block, overlap: u64) -> Crossover {
        let lq = window(self.query, left.q_end - overlap, left.q_end);
        let lt = window(self.target, left.t_end - overlap, left.t_end);
        let rq = window(self.query, right.q_start, right.q_start + overlap);
        let rt = window(self.target, right.t_start, right.t_start + overlap);

        let left_score = self.matrix.score_ungapped(lq, lt) as f64;
        let right_score = self.matrix.score_ungapped(rq, rt) as f64;

        let mut score = right_score;
        let mut best_score = score;
        let mut best_pos = 0;
        for (i, (&a, &b, &c, &d)) in izip!(lq, lt, rq, rt).enumerate() {
            score += self.matrix.score(a, b) as f64;
            score -= self.matrix.score(c, d) as f64;
            if score > best_score {
                best_score = score;
                best_pos = i + 1;
            }
        }

        Crossover {
            pos: best_pos as u64,
            adjustment: left_score + right_score - best_score,
        }
    }

    /// Cost of following block `a` with block `b` in one chain.
    ///
    /// `a` must start strictly before `b` on both sequences.
    pub fn connect_cost(&self, a: &Block, b: &Block) -> Result<f64> {
        if a.q_start >= b.q_start || a.t_start >= b.t_start {
            return Err(ChainError::BlocksOutOfOrder {
                a_q_start: a.q_start,
                a_t_start: a.t_start,
                b_q_start: b.q_start,
                b_t_start: b.t_start,
            });
        }

        let mut dq = b.q_start as i64 - a.q_end as i64;
        let mut dt = b.t_start as i64 - a.t_end as i64;
        let mut adjustment = 0.0;

        if dq < 0 || dt < 0 {
            let overlap = -dq.min(dt);
            if overlap >= a.q_size() as i64 || overlap >= b.q_size() as i64 {
                adjustment = FULL_OVERLAP_PENALTY;
            } else {
                adjustment = self.find_crossover(a, b, overlap as u64).adjustment;
                dq += overlap;
                dt += overlap;
            }
        }

        Ok(adjustment + self.gap_cost(dq, dt))
    }

    /// Trims every pair of overlapping neighbours at their crossover point,
    /// dropping blocks trimmed to nothing, until no overlap is left.
    ///
    /// Block scores are refreshed afterwards.
    pub fn remove_partial_overlaps(&self, blocks: &mut Vec<Block>) {
        if blocks.len() < 2 {
            return;
        }

        loop {
            let mut trimmed_out = false;
            for i in 0..blocks.len() - 1 {
                let (head, tail) = blocks.split_at_mut(i + 1);
                let (b, next) = (&mut head[i], &mut tail[0]);
                if b.is_dead() {
                    continue;
                }

                let dq = next.q_start as i64 - b.q_end as i64;
                let dt = next.t_start as i64 - b.t_end as i64;
                if dq >= 0 && dt >= 0 {
                    continue;
                }

                let overlap = (-dq.min(dt)) as u64;
                if overlap >= next.q_size().min(next.t_size()) {
                    next.q_start = next.q_end;
                    next.t_start = next.t_end;
                } else if overlap >= b.q_size().min(b.t_size()) {
                    b.q_end = b.q_start;
                    b.t_end = b.t_start;
                } else {
                    let crossover = self.find_crossover(b, next, overlap);
                    let remain = overlap - crossover.pos;
                    b.q_end -= remain;
                    b.t_end -= remain;
                    next.q_start += crossover.pos;
                    next.t_start += crossover.pos;
                }
                if b.is_dead() || next.is_dead() {
                    trimmed_out = true;
                }
            }

            if trimmed_out {
                blocks.retain(|b| !b.is_dead());
                if blocks.len() < 2 {
                    break;
                }
            } else {
                break;
            }
        }

        self.score_blocks(blocks);
    }

    /// Recomputes a chain's score: block substitution scores minus gap costs.
    pub fn calc_score(&self, blocks: &[Block]) -> f64 {
        let mut score = 0.0;
        for (i, b) in blocks.iter().enumerate() {
            score += self.score_block(b);
            if i > 0 {
                let prev = &blocks[i - 1];
                score -= self.gap_cost(
                    b.q_start as i64 - prev.q_end as i64,
                    b.t_start as i64 - prev.t_end as i64,
                );
            }
        }
        score
    }

    /// Best running score over the blocks, where the running score restarts at
    /// zero whenever a gap cost would push it below zero.
    pub fn calc_score_local(&self, blocks: &[Block]) -> f64 {
        let mut score = 0.0;
        let mut max_score = 0.0;
        for (i, b) in blocks.iter().enumerate() {
            if i > 0 {
                let prev = &blocks[i - 1];
                score -= self.gap_cost(
                    b.q_start as i64 - prev.q_end as i64,
                    b.t_start as i64 - prev.t_end as i64,
                );
                if score < 0.0 {
                    score = 0.0;
                }
            }
            score += self.score_block(b);
            if score > max_score {
                max_score = score;
            }
        }
        max_score
    }
}

/// Merges adjacent blocks that abut perfectly on both sequences.
pub fn merge_abutting(blocks: &mut Vec<Block>) {
    if blocks.len() < 2 {
        return;
    }

    let mut write_idx = 0;
    for read_idx in 1..blocks.len() {
        let should_merge = {
            let prev = &blocks[write_idx];
            let curr = &blocks[read_idx];
            curr.t_start == prev.t_end && curr.q_start == prev.q_end
        };

        if should_merge {
            let (t_end, q_end, score) = {
                let curr = &blocks[read_idx];
                (curr.t_end, curr.q_end, curr.score)
            };
            let prev = &mut blocks[write_idx];
            prev.t_end = t_end;
            prev.q_end = q_end;
            prev.score += score;
        } else {
            write_idx += 1;
            if write_idx != read_idx {
                blocks[write_idx] = blocks[read_idx].clone();
            }
        }
    }
    blocks.truncate(write_idx + 1);
}
