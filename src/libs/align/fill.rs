use crate::libs::align::band::{BandExtender, Direction};
use crate::libs::align::lump::{add_clipped, lump_regions, Region};
use crate::libs::align::reduce::{reduce_gaps, slide_introns};
use crate::libs::align::seed::{HitCounts, HitLimiter, Seeder};
use crate::libs::align::{AlignParams, AlignStats};
use crate::libs::chain::{
    merge_abutting, sort_chains, Block, Chain, ChainHeader, Chainer, GapCalc, ScoreContext,
    SubMatrix,
};
use crate::libs::error::Result;
use log::debug;

/// Seeds, chains, extends, and refills the alignments of one query against one target.
///
/// Coarse chains are built with `cheap_gap`, the final ones with `gap_calc`.
/// The strategies are swappable; the aligner itself holds no mutable state.
#[derive(Clone, Copy)]
pub struct Aligner<'a> {
    pub params: AlignParams,
    pub matrix: &'a SubMatrix,
    pub gap_calc: &'a GapCalc,
    pub cheap_gap: &'a GapCalc,
    pub seeder: &'a dyn Seeder,
    pub chainer: &'a dyn Chainer,
    pub extender: &'a dyn BandExtender,
}

/// Drops chains scoring below `min_score`.
pub fn threshold_chains(chains: &mut Vec<Chain>, min_score: f64) {
    chains.retain(|c| c.header.score >= min_score);
}

/// Trims `shrink` bases off each block, split between its two ends.
/// Every block keeps at least one base.
pub fn shrink_blocks(blocks: &mut [Block], shrink: u64) {
    for b in blocks.iter_mut() {
        let size = b.q_size();
        let diff = shrink.min(size.saturating_sub(1));
        let add_start = diff >> 1;
        let sub_end = diff - add_start;
        b.q_start += add_start;
        b.t_start += add_start;
        b.q_end -= sub_end;
        b.t_end -= sub_end;
    }
}

/// Merges blocks on the same diagonal that overlap or abut.
///
/// The result is sorted by query start.
pub fn remove_simple_overlaps(blocks: &mut Vec<Block>) {
    blocks.sort_by_key(|b| (b.diagonal(), b.q_start));

    let mut merged: Vec<Block> = Vec::with_capacity(blocks.len());
    for b in blocks.drain(..) {
        match merged.last_mut() {
            Some(last) if last.diagonal() == b.diagonal() && b.q_start <= last.q_end => {
                if b.q_end > last.q_end {
                    last.q_end = b.q_end;
                    last.t_end = b.t_end;
                }
            }
            _ => merged.push(b),
        }
    }

    merged.sort_by_key(|b| (b.q_start, b.t_start));
    *blocks = merged;
}

impl<'a> Aligner<'a> {
    /// All chains of `query` against `target`, both strands unless disabled,
    /// best first. Chain ids are left at 0.
    pub fn align(
        &self,
        q_name: &str,
        query: &[u8],
        t_name: &str,
        target: &[u8],
        stats: &mut AlignStats,
    ) -> Result<Vec<Chain>> {
        let template = |q_strand| ChainHeader {
            t_name: t_name.to_string(),
            t_size: target.len() as u64,
            t_strand: '+',
            q_name: q_name.to_string(),
            q_size: query.len() as u64,
            q_strand,
            ..Default::default()
        };

        // Target hits accumulate over both strands
        let mut hits = HitCounts::new(query.len(), target.len(), &self.params);
        let mut chains = self.align_strand(query, target, &template('+'), stats, &mut hits)?;
        if self.params.both_strands {
            let rc = crate::libs::seq::rev_comp(query);
            hits.reset_query();
            chains.extend(self.align_strand(&rc, target, &template('-'), stats, &mut hits)?);
        }
        sort_chains(&mut chains);

        debug!(
            "{} vs {}: {} chains from {} seeds",
            q_name,
            t_name,
            chains.len(),
            stats.seeds
        );
        Ok(chains)
    }

    /// One strand: chain and extend, search the gaps again, then rechain everything.
    pub fn align_strand(
        &self,
        query: &[u8],
        target: &[u8],
        template: &ChainHeader,
        stats: &mut AlignStats,
        hits: &mut HitCounts,
    ) -> Result<Vec<Chain>> {
        let ctx = ScoreContext::new(query, target, self.matrix, self.gap_calc);

        let mut limiter = HitLimiter::new(hits, &self.params, 0, 0);
        let chains = self.chain_region(query, target, template, stats, &mut limiter)?;

        let mut extra = Vec::new();
        if self.params.expand_window > 0 {
            let regions = self.clump_gaps_and_ends(&chains, query.len() as u64, target.len() as u64);
            for clump in lump_regions(&regions) {
                extra.extend(self.expand_in_region(query, target, &clump.region, stats, hits)?);
            }
        }

        let mut blocks: Vec<Block> = chains.into_iter().flat_map(|c| c.blocks).collect();
        blocks.append(&mut extra);
        remove_simple_overlaps(&mut blocks);

        let mut chains = self.chains_create(&ctx, blocks, template)?;
        threshold_chains(&mut chains, self.params.min_score);
        if self.params.reduce_gaps {
            for chain in chains.iter_mut() {
                reduce_gaps(&ctx, chain);
            }
            sort_chains(&mut chains);
        }
        if self.params.rna {
            for chain in chains.iter_mut() {
                slide_introns(&ctx, chain);
            }
        }
        Ok(chains)
    }

    /// Scores the blocks, chains them, and cleans each chain up.
    ///
    /// Chains come best first, with scores recomputed from scratch.
    pub fn chains_create(
        &self,
        ctx: &ScoreContext,
        mut blocks: Vec<Block>,
        template: &ChainHeader,
    ) -> Result<Vec<Chain>> {
        ctx.score_blocks(&mut blocks);

        let mut chains = Vec::new();
        for mut chain_blocks in self.chainer.chain_blocks(blocks, ctx)? {
            ctx.remove_partial_overlaps(&mut chain_blocks);
            merge_abutting(&mut chain_blocks);
            if chain_blocks.is_empty() {
                continue;
            }
            let header = ChainHeader {
                score: ctx.calc_score(&chain_blocks),
                ..template.clone()
            };
            chains.push(Chain::new(header, chain_blocks));
        }

        sort_chains(&mut chains);
        Ok(chains)
    }

    /// Seeds the whole window, then chains and extends.
    fn chain_region(
        &self,
        query: &[u8],
        target: &[u8],
        template: &ChainHeader,
        stats: &mut AlignStats,
        limiter: &mut HitLimiter<'_>,
    ) -> Result<Vec<Chain>> {
        let seeds = self.seeder.seed(query, target, self.matrix, &self.params, limiter);
        stats.seeds += seeds.len();
        self.chain_and_extend(query, target, seeds, template, stats)
    }

    /// Coarse chaining with cheap gaps, band extension of the explored chains,
    /// and rechaining of the result with the real gap costs.
    pub fn chain_and_extend(
        &self,
        query: &[u8],
        target: &[u8],
        seeds: Vec<Block>,
        template: &ChainHeader,
        stats: &mut AlignStats,
    ) -> Result<Vec<Chain>> {
        let ctx = ScoreContext::new(query, target, self.matrix, self.gap_calc);
        let cheap = ctx.with_gap_calc(self.cheap_gap);

        let mut chains = self.chains_create(&cheap, seeds, template)?;
        if self.params.best_chain_only {
            chains.truncate(1);
        } else {
            chains.truncate(self.params.max_chains_to_explore);
        }
        threshold_chains(&mut chains, self.params.min_chain);
        stats.chains_explored += chains.len();

        let mut blocks = Vec::new();
        for mut chain in chains {
            shrink_blocks(&mut chain.blocks, self.params.shrink);
            self.band_extend(query, target, &mut chain.blocks);
            stats.blocks_extended += chain.blocks.len();
            blocks.append(&mut chain.blocks);
        }

        self.chains_create(&ctx, blocks, template)
    }

    /// Extends before the first block, between neighbours (forward from the
    /// left one, then backward from the right one), and after the last block.
    fn band_extend(&self, query: &[u8], target: &[u8], blocks: &mut Vec<Block>) {
        let (Some(first), Some(last)) = (blocks.first().cloned(), blocks.last().cloned()) else {
            return;
        };

        let mut extended = self.extend_window(
            query,
            target,
            &Region {
                q_start: 0,
                q_end: first.q_start,
                t_start: 0,
                t_end: first.t_start,
            },
            Direction::Backward,
        );

        for pair in blocks.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            extended.push(a.clone());
            if b.q_start > a.q_end && b.t_start > a.t_end {
                let gap = Region {
                    q_start: a.q_end,
                    q_end: b.q_start,
                    t_start: a.t_end,
                    t_end: b.t_start,
                };
                extended.extend(self.extend_window(query, target, &gap, Direction::Forward));
                extended.extend(self.extend_window(query, target, &gap, Direction::Backward));
            }
        }
        extended.push(last.clone());

        extended.extend(self.extend_window(
            query,
            target,
            &Region {
                q_start: last.q_end,
                q_end: query.len() as u64,
                t_start: last.t_end,
                t_end: target.len() as u64,
            },
            Direction::Forward,
        ));

        extended.sort_by_key(|b| (b.q_start, b.t_start));
        merge_abutting(&mut extended);
        *blocks = extended;
    }

    /// Band extension anchored at one corner of `region`, limited to
    /// `max_extend` bases from that corner. Blocks come back in sequence coordinates.
    fn extend_window(
        &self,
        query: &[u8],
        target: &[u8],
        region: &Region,
        direction: Direction,
    ) -> Vec<Block> {
        if region.q_end <= region.q_start || region.t_end <= region.t_start {
            return Vec::new();
        }
        let q_size = region.q_size().min(self.params.max_extend);
        let t_size = region.t_size().min(self.params.max_extend);
        let (q_start, t_start) = match direction {
            Direction::Forward => (region.q_start, region.t_start),
            Direction::Backward => (region.q_end - q_size, region.t_end - t_size),
        };

        let mut blocks = self.extender.band_ext(
            &query[q_start as usize..(q_start + q_size) as usize],
            &target[t_start as usize..(t_start + t_size) as usize],
            direction,
            self.params.max_band_gap,
            self.matrix,
        );
        for b in blocks.iter_mut() {
            b.shift(q_start, t_start);
        }
        blocks
    }

    /// Regions worth a second, more sensitive look: the gaps inside and the
    /// flanks around every chain scoring at least `min_expand`.
    pub fn clump_gaps_and_ends(&self, chains: &[Chain], q_size: u64, t_size: u64) -> Vec<Region> {
        let min_size = self.params.weight as u64 * 2;
        let window = self.params.expand_window;

        let mut regions = Vec::new();
        for chain in chains.iter().filter(|c| c.header.score >= self.params.min_expand) {
            let (Some(first), Some(last)) = (chain.blocks.first(), chain.blocks.last()) else {
                continue;
            };

            add_clipped(
                &mut regions,
                Region {
                    q_start: first.q_start.saturating_sub(window),
                    q_end: first.q_start,
                    t_start: first.t_start.saturating_sub(window),
                    t_end: first.t_start,
                },
                q_size,
                t_size,
                min_size,
                window,
            );
            for pair in chain.blocks.windows(2) {
                add_clipped(
                    &mut regions,
                    Region {
                        q_start: pair[0].q_end,
                        q_end: pair[1].q_start,
                        t_start: pair[0].t_end,
                        t_end: pair[1].t_start,
                    },
                    q_size,
                    t_size,
                    min_size,
                    window,
                );
            }
            add_clipped(
                &mut regions,
                Region {
                    q_start: last.q_end,
                    q_end: last.q_end + window,
                    t_start: last.t_end,
                    t_end: last.t_end + window,
                },
                q_size,
                t_size,
                min_size,
                window,
            );
        }
        regions
    }

    /// Aligns the windows of `region` again with the focused parameters.
    /// Returned blocks are in full-sequence coordinates.
    pub fn expand_in_region(
        &self,
        query: &[u8],
        target: &[u8],
        region: &Region,
        stats: &mut AlignStats,
        hits: &mut HitCounts,
    ) -> Result<Vec<Block>> {
        stats.regions_expanded += 1;
        stats.expanded_area += region.area();

        let focused = Aligner {
            params: self.params.focused(),
            ..*self
        };
        let sub_query = &query[region.q_start as usize..region.q_end as usize];
        let sub_target = &target[region.t_start as usize..region.t_end as usize];

        let mut limiter = HitLimiter::new(
            hits,
            &focused.params,
            region.q_start as usize,
            region.t_start as usize,
        );
        let chains = focused.chain_region(
            sub_query,
            sub_target,
            &ChainHeader::default(),
            stats,
            &mut limiter,
        )?;
        let mut blocks: Vec<Block> = chains.into_iter().flat_map(|c| c.blocks).collect();
        for b in blocks.iter_mut() {
            b.shift(region.q_start, region.t_start);
        }
        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::align::{BandedAligner, KmerSeeder};
    use crate::libs::chain::connect::tests::random_seq;
    use crate::libs::chain::KdChainer;

    struct Setup {
        matrix: SubMatrix,
        gap_calc: GapCalc,
        cheap_gap: GapCalc,
        seeder: KmerSeeder,
        chainer: KdChainer,
        extender: BandedAligner,
    }

    impl Setup {
        fn new() -> Self {
            Setup {
                matrix: SubMatrix::hoxd55(),
                gap_calc: GapCalc::medium(),
                cheap_gap: GapCalc::cheap(),
                seeder: KmerSeeder::default(),
                chainer: KdChainer,
                extender: BandedAligner,
            }
        }

        fn aligner(&self, params: AlignParams) -> Aligner<'_> {
            Aligner {
                params,
                matrix: &self.matrix,
                gap_calc: &self.gap_calc,
                cheap_gap: &self.cheap_gap,
                seeder: &self.seeder,
                chainer: &self.chainer,
                extender: &self.extender,
            }
        }
    }

    fn mutate(seq: &mut [u8], positions: &[usize]) {
        for &p in positions {
            seq[p] = match seq[p] {
                b'A' => b'G',
                b'G' => b'A',
                b'C' => b'T',
                _ => b'C',
            };
        }
    }

    #[test]
    fn test_shrink_blocks() {
        let mut blocks = vec![
            Block::new(0, 1000, 100, 1100),
            Block::new(2000, 2101, 2000, 2101),
            Block::new(5000, 5001, 5000, 5001),
        ];
        shrink_blocks(&mut blocks, 200);
        assert_eq!(blocks[0], Block::new(100, 900, 200, 1000));
        // 101 bases shrink by 100: 50 off the start, 50 off the end
        assert_eq!(blocks[1], Block::new(2050, 2051, 2050, 2051));
        assert_eq!(blocks[2], Block::new(5000, 5001, 5000, 5001));
    }

    #[test]
    fn test_remove_simple_overlaps() {
        let mut blocks = vec![
            Block::new(100, 200, 100, 200),
            Block::new(0, 150, 0, 150),
            Block::new(200, 250, 200, 250),
            Block::new(50, 100, 60, 110),
        ];
        remove_simple_overlaps(&mut blocks);
        assert_eq!(
            blocks,
            vec![Block::new(0, 250, 0, 250), Block::new(50, 100, 60, 110)]
        );
    }

    #[test]
    fn test_align_recovers_gapped_alignment() {
        let target = random_seq(3000, 41);
        let mut query = target[500..1500].to_vec();
        query.extend_from_slice(&target[1505..2500]);
        mutate(&mut query, &[150, 420, 700, 1200, 1650]);

        let setup = Setup::new();
        let aligner = setup.aligner(AlignParams::default());
        let mut stats = AlignStats::default();
        let chains = aligner.align("q", &query, "t", &target, &mut stats).unwrap();

        assert!(stats.seeds > 0);
        assert!(!chains.is_empty());
        let best = &chains[0];
        assert_eq!(best.header.q_strand, '+');
        assert_eq!(best.header.q_size, 1995);
        assert!(best.header.q_start <= 5);
        assert!(best.header.q_end >= 1990);
        assert!(best.header.t_start <= 505);
        assert!(best.header.t_end >= 2490);
        assert!(best.header.score >= 4000.0);
        for pair in best.blocks.windows(2) {
            assert!(pair[0].q_end <= pair[1].q_start);
            assert!(pair[0].t_end <= pair[1].t_start);
        }
        // The 5-base deletion is the only target-side gap of note
        let t_gap: u64 = best
            .blocks
            .windows(2)
            .map(|p| p[1].t_start - p[0].t_end)
            .sum();
        let q_gap: u64 = best
            .blocks
            .windows(2)
            .map(|p| p[1].q_start - p[0].q_end)
            .sum();
        assert_eq!(t_gap - q_gap, 5);

        for chain in &chains {
            assert!(chain.header.score >= 4000.0);
        }
    }

    #[test]
    fn test_align_minus_strand() {
        let target = random_seq(2000, 42);
        let query = crate::libs::seq::rev_comp(&target[200..1800]);

        let setup = Setup::new();
        let aligner = setup.aligner(AlignParams::default());
        let mut stats = AlignStats::default();
        let chains = aligner.align("q", &query, "t", &target, &mut stats).unwrap();

        let best = &chains[0];
        assert_eq!(best.header.q_strand, '-');
        assert_eq!(best.header.t_start, 200);
        assert_eq!(best.header.t_end, 1800);
        assert_eq!(best.blocks.len(), 1);

        // Same pair, one strand only
        let plus_only = setup.aligner(AlignParams {
            both_strands: false,
            ..Default::default()
        });
        let chains = plus_only.align("q", &query, "t", &target, &mut stats).unwrap();
        assert!(chains.iter().all(|c| c.header.q_strand == '+'));
    }

    #[test]
    fn test_expand_recovers_weak_block() {
        let target = random_seq(6000, 43);
        let mut query = random_seq(6000, 44);
        // Two strong anchors with a short, diverged stretch between them,
        // separated by unrelated sequence on both sides
        query[1000..2000].copy_from_slice(&target[1000..2000]);
        query[2600..2660].copy_from_slice(&target[2650..2710]);
        query[3300..4300].copy_from_slice(&target[3400..4400]);
        mutate(&mut query, &[2610, 2620, 2630, 2640, 2650]);

        let setup = Setup::new();
        let params = AlignParams {
            both_strands: false,
            ..Default::default()
        };
        let mut stats = AlignStats::default();
        let chains = setup
            .aligner(params)
            .align("q", &query, "t", &target, &mut stats)
            .unwrap();

        assert!(stats.regions_expanded > 0);
        let best = &chains[0];
        assert!(best.header.q_start <= 1000);
        assert!(best.header.q_end >= 4290);

        let without = setup
            .aligner(AlignParams {
                expand_window: 0,
                ..params
            })
            .align("q", &query, "t", &target, &mut AlignStats::default())
            .unwrap();
        assert!(best.header.score >= without[0].header.score);
    }

    #[test]
    fn test_align_dynamic_limits() {
        let query = random_seq(1500, 45);
        let target = query.repeat(3);

        let setup = Setup::new();
        let params = AlignParams {
            both_strands: false,
            ..Default::default()
        };
        let chains = setup
            .aligner(params)
            .align("q", &query, "t", &target, &mut AlignStats::default())
            .unwrap();
        assert!(chains.len() >= 3);

        // The first copy claims every query base
        let mut stats = AlignStats::default();
        let chains = setup
            .aligner(AlignParams {
                dyna_limit_q: Some(1),
                ..params
            })
            .align("q", &query, "t", &target, &mut stats)
            .unwrap();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].header.q_start, 0);
        assert_eq!(chains[0].header.q_end, 1500);
    }

    #[test]
    fn test_align_rna_splice_sites() {
        let mut target = random_seq(3000, 46);
        // Intron at 1000..1500; the gap could sit anywhere from 997 to 1000
        target[996] = b'A';
        target[997..1002].copy_from_slice(b"CAGGT");
        target[1496..1501].copy_from_slice(b"CCAGT");
        let mut query = target[..1000].to_vec();
        query.extend_from_slice(&target[1500..2500]);

        let setup = Setup::new();
        let chains = setup
            .aligner(AlignParams {
                both_strands: false,
                rna: true,
                ..Default::default()
            })
            .align("q", &query, "t", &target, &mut AlignStats::default())
            .unwrap();

        let best = &chains[0];
        let intron = best
            .blocks
            .windows(2)
            .find(|p| p[1].q_start == p[0].q_end && p[1].t_start - p[0].t_end == 500)
            .unwrap();
        assert_eq!(intron[0].t_end, 1000);
        assert_eq!(intron[1].t_start, 1500);
    }

    #[test]
    fn test_clump_gaps_and_ends() {
        let setup = Setup::new();
        let aligner = setup.aligner(AlignParams {
            expand_window: 500,
            min_expand: 100.0,
            ..Default::default()
        });
        let header = ChainHeader {
            score: 1000.0,
            ..Default::default()
        };
        let chains = vec![
            Chain::new(
                header.clone(),
                vec![Block::new(100, 200, 1000, 1100), Block::new(1200, 1300, 1150, 1250)],
            ),
            Chain::new(
                ChainHeader {
                    score: 10.0,
                    ..header
                },
                vec![Block::new(3000, 3100, 3000, 3100)],
            ),
        ];
        let regions = aligner.clump_gaps_and_ends(&chains, 2000, 2000);
        assert_eq!(
            regions,
            vec![
                // Before the first block
                Region { q_start: 0, q_end: 100, t_start: 500, t_end: 1000 },
                // Between: 1000 x 50, split into two corners
                Region { q_start: 200, q_end: 700, t_start: 1100, t_end: 1150 },
                Region { q_start: 700, q_end: 1200, t_start: 1100, t_end: 1150 },
                // After the last block, clipped
                Region { q_start: 1300, q_end: 1800, t_start: 1250, t_end: 1750 },
            ]
        );
    }
}
