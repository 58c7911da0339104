use crate::libs::chain::algo::{ChainItem, KdTree, Search};
use crate::libs::chain::connect::ScoreContext;
use crate::libs::chain::record::Block;
use crate::libs::error::Result;
use std::cmp::Ordering;

/// Cost callbacks handed to a [`Chainer`].
pub trait ChainCosts {
    /// Exact cost of following `a` with `b`; `a` strictly precedes `b`.
    fn connect_cost(&self, a: &Block, b: &Block) -> Result<f64>;
    /// Cost of a plain gap, also used as a lower bound on `connect_cost`.
    fn gap_cost(&self, dq: i64, dt: i64) -> f64;
}

impl ChainCosts for ScoreContext<'_> {
    fn connect_cost(&self, a: &Block, b: &Block) -> Result<f64> {
        ScoreContext::connect_cost(self, a, b)
    }

    fn gap_cost(&self, dq: i64, dt: i64) -> f64 {
        ScoreContext::gap_cost(self, dq, dt)
    }
}

/// Groups scored blocks into highest-scoring chains.
///
/// Every returned chain is ordered by increasing query and target start;
/// the chains themselves come best first.
pub trait Chainer: Sync {
    fn chain_blocks(&self, blocks: Vec<Block>, costs: &dyn ChainCosts) -> Result<Vec<Vec<Block>>>;
}

impl ChainItem for Block {
    fn q_start(&self) -> u64 { self.q_start }
    fn q_end(&self) -> u64 { self.q_end }
    fn t_start(&self) -> u64 { self.t_start }
    fn t_end(&self) -> u64 { self.t_end }
    fn score(&self) -> f64 { self.score }
}

struct DpEntry {
    best_pred: Option<usize>,
    total_score: f64,
    hit: bool,
}

/// Dynamic programming over a KD-tree of block starts.
#[derive(Debug, Clone, Copy, Default)]
pub struct KdChainer;

impl Chainer for KdChainer {
    fn chain_blocks(&self, mut blocks: Vec<Block>, costs: &dyn ChainCosts) -> Result<Vec<Vec<Block>>> {
        if blocks.is_empty() {
            return Ok(Vec::new());
        }

        // Predecessors start strictly earlier on the query, so they are scored first
        blocks.sort_by(|a, b| (a.q_start, a.t_start).cmp(&(b.q_start, b.t_start)));

        let mut dp_entries: Vec<DpEntry> = blocks
            .iter()
            .map(|b| DpEntry {
                best_pred: None,
                total_score: b.score,
                hit: false,
            })
            .collect();

        let mut leaf_indices: Vec<usize> = (0..blocks.len()).collect();
        let mut tree = KdTree::build(&mut leaf_indices, &blocks);

        let bound = |dq: u64, dt: u64| costs.gap_cost(dq as i64, dt as i64);
        for i in 0..blocks.len() {
            let (best_score, best_pred) = {
                let link = |cand_idx: usize, target_idx: usize| -> Result<Option<f64>> {
                    let cand = &blocks[cand_idx];
                    let target = &blocks[target_idx];
                    if cand.q_start >= target.q_start || cand.t_start >= target.t_start {
                        return Ok(None);
                    }
                    let cost = costs.connect_cost(cand, target)?;
                    Ok(Some(dp_entries[cand_idx].total_score + target.score - cost))
                };
                let search = Search {
                    items: &blocks,
                    target: i,
                    link: &link,
                    bound: &bound,
                };
                tree.best_predecessor(&search, dp_entries[i].total_score)?
            };

            if best_score > dp_entries[i].total_score {
                dp_entries[i].total_score = best_score;
                dp_entries[i].best_pred = best_pred;
            }
            tree.record(i, dp_entries[i].total_score, &blocks);
        }

        // Peel chains, best first; a chain stops where it meets a block already taken
        let mut sorted_indices: Vec<usize> = (0..dp_entries.len()).collect();
        sorted_indices.sort_by(|&a, &b| {
            dp_entries[b]
                .total_score
                .partial_cmp(&dp_entries[a].total_score)
                .unwrap_or(Ordering::Equal)
        });

        let mut chains = Vec::new();
        for &leaf_idx in &sorted_indices {
            if dp_entries[leaf_idx].hit {
                continue;
            }

            let mut chain_rev = Vec::new();
            let mut curr_idx = leaf_idx;
            loop {
                dp_entries[curr_idx].hit = true;
                chain_rev.push(blocks[curr_idx].clone());

                match dp_entries[curr_idx].best_pred {
                    Some(pred_idx) if !dp_entries[pred_idx].hit => curr_idx = pred_idx,
                    _ => break,
                }
            }

            chain_rev.reverse();
            chains.push(chain_rev);
        }

        Ok(chains)
    }
}
