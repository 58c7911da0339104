use crate::libs::chain::{sort_chains, Chain, GapCalc, ScoreContext, SubMatrix};
use crate::libs::clean::breaks::{find_breaks, Break};
use crate::libs::clean::net::Net;
use crate::libs::clean::CleanParams;
use crate::libs::error::{ChainError, Result};
use crate::libs::seq::SeqStore;
use log::{debug, info};
use std::collections::{BTreeSet, HashMap};
use std::io::Write;

/// One removed suspect, or one that would be removed in report-only mode.
#[derive(Debug, Clone, PartialEq)]
pub struct SuspectReport {
    pub chrom: String,
    pub suspect_start: u64,
    pub suspect_end: u64,
    pub breaking_id: u64,
    pub broken_id: u64,
    /// Id of the chain made from the suspect; 0 when nothing was removed.
    pub new_chain_id: u64,
    pub local_score: f64,
    pub left_score: f64,
    pub right_score: f64,
    pub fill_score: f64,
    pub ratio_l: f64,
    pub ratio_r: f64,
    pub ratio_fold: f64,
    pub pair: bool,
    /// Aligned target bases of the suspect.
    pub suspect_bases: u64,
    pub l_gap_size: u64,
    pub r_gap_size: u64,
    /// Local scores of the broken chain's left and right flanks.
    pub left_local: f64,
    pub right_local: f64,
}

impl SuspectReport {
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{:.1}\t{:.1}\t{:.1}\t{:.1}\t{:.2}\t{:.2}\t{:.2}\t{}\t{}\t{}\t{}\t{:.1}\t{:.1}",
            self.chrom,
            self.suspect_start,
            self.suspect_end,
            self.breaking_id,
            self.broken_id,
            self.new_chain_id,
            self.local_score,
            self.left_score,
            self.right_score,
            self.fill_score,
            self.ratio_l,
            self.ratio_r,
            self.ratio_fold,
            self.pair as u8,
            self.suspect_bases,
            self.l_gap_size,
            self.r_gap_size,
            self.left_local,
            self.right_local
        )
    }
}

/// Cleaned chains, best first, and what was cut out of them.
#[derive(Debug, Default)]
pub struct CleanOutcome {
    pub chains: Vec<Chain>,
    pub suspects: Vec<SuspectReport>,
}

/// Chains by id, plus the bookkeeping of one cleaning run.
struct Work {
    chains: Vec<Chain>,
    index: HashMap<u64, usize>,
    max_id: u64,
    rescore: BTreeSet<u64>,
    new_chains: Vec<Chain>,
    reports: Vec<SuspectReport>,
}

pub struct ChainCleaner<'a> {
    pub params: CleanParams,
    pub seqs: &'a SeqStore,
    pub matrix: &'a SubMatrix,
    pub gap_calc: &'a GapCalc,
}

/// Widens the breaks next to a removed suspect so they span it.
///
/// Only neighbours of the same two chains whose fill is the one shared with
/// `removed` are touched. Returns whether any was.
fn widen_neighbours(
    list: &mut [Break],
    before: Option<usize>,
    after: Option<usize>,
    removed: &Break,
) -> bool {
    let same_chains = |b: &Break| b.chain_id == removed.chain_id && b.parent_id == removed.parent_id;
    let mut updated = false;

    if let Some(up) = before.and_then(|i| list.get_mut(i)) {
        if same_chains(up)
            && up.r_fill_start == removed.l_fill_start
            && up.r_fill_end == removed.l_fill_end
        {
            up.r_fill_end = removed.r_fill_end;
            up.r_gap_end = removed.r_gap_end;
            updated = true;
        }
    }
    if let Some(down) = after.and_then(|i| list.get_mut(i)) {
        if same_chains(down)
            && down.l_fill_start == removed.r_fill_start
            && down.l_fill_end == removed.r_fill_end
        {
            down.l_fill_start = removed.l_fill_start;
            down.l_gap_start = removed.l_gap_start;
            updated = true;
        }
    }
    updated
}

impl<'a> ChainCleaner<'a> {
    fn context(&self, chain: &Chain) -> Result<ScoreContext<'a>> {
        let h = &chain.header;
        Ok(ScoreContext::new(
            self.seqs.query(&h.q_name, h.q_strand)?,
            self.seqs.target(&h.t_name)?,
            self.matrix,
            self.gap_calc,
        ))
    }

    /// Removes every suspect that passes the thresholds.
    ///
    /// `nets` is the target-side net of `chains`. Breaking chains are handled
    /// in ascending id order; new chains get ids above the largest input id.
    pub fn clean(&self, chains: Vec<Chain>, nets: &[Net]) -> Result<CleanOutcome> {
        let index: HashMap<u64, usize> = chains
            .iter()
            .enumerate()
            .map(|(i, c)| (c.header.id, i))
            .collect();
        let mut work = Work {
            max_id: chains.iter().map(|c| c.header.id).max().unwrap_or(0),
            chains,
            index,
            rescore: BTreeSet::new(),
            new_chains: Vec::new(),
            reports: Vec::new(),
        };

        let breaks = find_breaks(nets);
        info!(
            "{} breaking chains, {} breaks",
            breaks.len(),
            breaks.values().map(|l| l.len()).sum::<usize>()
        );

        for (breaking_id, list) in &breaks {
            let ids = std::iter::once(*breaking_id).chain(list.iter().map(|b| b.chain_id));
            for id in ids {
                if !work.index.contains_key(&id) {
                    return Err(ChainError::UnknownChain { id });
                }
            }
        }

        for list in breaks.into_values() {
            self.process_breaks(&mut work, list)?;
        }

        for id in &work.rescore {
            let i = work.index[id];
            let ctx = self.context(&work.chains[i])?;
            let chain = &mut work.chains[i];
            chain.header.score = ctx.calc_score(&chain.blocks);
        }

        info!(
            "{} suspects removed from {} chains",
            work.new_chains.len(),
            work.rescore.len()
        );
        let mut chains = work.chains;
        chains.append(&mut work.new_chains);
        sort_chains(&mut chains);

        Ok(CleanOutcome {
            chains,
            suspects: work.reports,
        })
    }

    /// Single breaks until nothing widens any more, then pairs; repeated
    /// while pairs keep widening their neighbours.
    fn process_breaks(&self, work: &mut Work, mut list: Vec<Break>) -> Result<()> {
        loop {
            loop {
                let mut updated = false;
                let mut i = 0;
                while i < list.len() {
                    let current = list[i].clone();
                    if self.test_and_remove(work, &current, false)? {
                        updated |= widen_neighbours(&mut list, i.checked_sub(1), Some(i + 1), &current);
                        list.remove(i);
                    } else {
                        i += 1;
                    }
                }
                if !updated || list.is_empty() {
                    break;
                }
            }

            let mut updated = false;
            if self.params.do_pairs && !self.params.report_only {
                let mut i = 0;
                while i + 1 < list.len() {
                    if list[i].pairs_with(&list[i + 1], self.params.max_pair_distance) {
                        if let Some(joined) = Break::pair(&list[i], &list[i + 1]) {
                            if self.test_and_remove(work, &joined, true)? {
                                updated |= widen_neighbours(
                                    &mut list,
                                    i.checked_sub(1),
                                    Some(i + 2),
                                    &joined,
                                );
                                list.drain(i..i + 2);
                                continue;
                            }
                        }
                    }
                    i += 1;
                }
            }
            if !updated || list.is_empty() {
                break;
            }
        }
        Ok(())
    }

    /// Scores the suspect of `b` against the broken chain around it and cuts
    /// it out of the breaking chain if every threshold holds.
    fn test_and_remove(&self, work: &mut Work, b: &Break, is_pair: bool) -> Result<bool> {
        let breaking_idx = work.index[&b.parent_id];
        let broken_idx = work.index[&b.chain_id];
        let breaking = &work.chains[breaking_idx];
        let broken = &work.chains[broken_idx];

        let Some(mut suspect) = breaking.subset_on_t(b.suspect_start, b.suspect_end) else {
            debug!(
                "Suspect {}:{}-{} of chain {} is already gone",
                b.chrom, b.suspect_start, b.suspect_end, b.parent_id
            );
            return Ok(false);
        };

        let breaking_ctx = self.context(breaking)?;
        let broken_ctx = self.context(broken)?;
        // Global and local score of the broken chain over a target range
        let sub_scores = |start, end| {
            broken.subset_on_t(start, end).map_or((0.0, 0.0), |c| {
                (
                    broken_ctx.calc_score(&c.blocks),
                    broken_ctx.calc_score_local(&c.blocks),
                )
            })
        };

        let local = breaking_ctx.calc_score_local(&suspect.blocks);
        let (fill, _) = sub_scores(b.l_fill_start, b.r_fill_end);
        let (left, left_local) = sub_scores(b.l_fill_start, b.suspect_end);
        let (right, right_local) = sub_scores(b.suspect_start, b.r_fill_end);
        let ratio_fold = fill / local;
        let ratio_l = left / local;
        let ratio_r = right / local;
        let bases = suspect.aligned_bases();
        let broken_score = broken.header.score;

        let p = &self.params;
        let lr_threshold = if is_pair {
            p.lr_fold_threshold_pairs
        } else {
            p.lr_fold_threshold
        };
        let passes = ratio_l >= lr_threshold
            && ratio_r >= lr_threshold
            && ratio_fold >= p.fold_threshold
            && local <= p.max_suspect_score
            && bases <= p.max_suspect_bases
            && broken_score >= p.min_broken_chain_score
            && b.l_gap_size() >= p.min_lr_gap_size
            && b.r_gap_size() >= p.min_lr_gap_size;

        debug!(
            "{} {}:{}-{} breaking {} broken {}: local {} left {} right {} fill {} ratios {:.2}/{:.2}/{:.2} -> {}",
            if is_pair { "Pair" } else { "Break" },
            b.chrom,
            b.suspect_start,
            b.suspect_end,
            b.parent_id,
            b.chain_id,
            local,
            left,
            right,
            fill,
            ratio_l,
            ratio_r,
            ratio_fold,
            if passes { "remove" } else { "keep" }
        );
        if !passes {
            return Ok(false);
        }

        let mut report = SuspectReport {
            chrom: b.chrom.clone(),
            suspect_start: b.suspect_start,
            suspect_end: b.suspect_end,
            breaking_id: b.parent_id,
            broken_id: b.chain_id,
            new_chain_id: 0,
            local_score: local,
            left_score: left,
            right_score: right,
            fill_score: fill,
            ratio_l,
            ratio_r,
            ratio_fold,
            pair: is_pair,
            suspect_bases: bases,
            l_gap_size: b.l_gap_size(),
            r_gap_size: b.r_gap_size(),
            left_local,
            right_local,
        };
        if p.report_only {
            work.reports.push(report);
            return Ok(false);
        }

        if work.chains[breaking_idx].remove_blocks_on_t(b.suspect_start, b.suspect_end)? == 0 {
            debug!(
                "Suspect {}:{}-{} of chain {} shares its block with a flank, kept",
                b.chrom, b.suspect_start, b.suspect_end, b.parent_id
            );
            return Ok(false);
        }
        suspect.header.score = breaking_ctx.calc_score(&suspect.blocks);
        work.max_id += 1;
        suspect.header.id = work.max_id;
        report.new_chain_id = work.max_id;

        work.new_chains.push(suspect);
        work.rescore.insert(b.parent_id);
        work.reports.push(report);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::chain::connect::tests::random_seq;
    use crate::libs::chain::{Block, ChainHeader};
    use crate::libs::clean::net::read_nets;
    use approx::assert_relative_eq;

    struct Fixture {
        seqs: SeqStore,
        matrix: SubMatrix,
        gap_calc: GapCalc,
    }

    impl Fixture {
        fn new() -> Self {
            let seq = random_seq(1000, 51);
            Fixture {
                seqs: SeqStore::new(
                    vec![("chr1".to_string(), seq.clone())],
                    vec![("chrQ".to_string(), seq)],
                ),
                matrix: SubMatrix::uniform(10, -10),
                gap_calc: GapCalc::medium(),
            }
        }

        fn cleaner(&self, params: CleanParams) -> ChainCleaner<'_> {
            ChainCleaner {
                params,
                seqs: &self.seqs,
                matrix: &self.matrix,
                gap_calc: &self.gap_calc,
            }
        }

        /// A chain on the main diagonal, scored from scratch.
        fn chain(&self, id: u64, spans: &[(u64, u64)]) -> Chain {
            let mut blocks: Vec<Block> = spans.iter().map(|&(s, e)| Block::new(s, e, s, e)).collect();
            let header = ChainHeader {
                t_name: "chr1".to_string(),
                t_size: 1000,
                t_strand: '+',
                q_name: "chrQ".to_string(),
                q_size: 1000,
                q_strand: '+',
                id,
                ..Default::default()
            };
            let seq = self.seqs.target("chr1").unwrap();
            let ctx = ScoreContext::new(seq, seq, &self.matrix, &self.gap_calc);
            ctx.score_blocks(&mut blocks);
            let mut chain = Chain::new(header, blocks);
            chain.header.score = ctx.calc_score(&chain.blocks);
            chain
        }

        fn calc_score(&self, chain: &Chain) -> f64 {
            let seq = self.seqs.target("chr1").unwrap();
            ScoreContext::new(seq, seq, &self.matrix, &self.gap_calc).calc_score(&chain.blocks)
        }
    }

    fn lenient() -> CleanParams {
        CleanParams {
            min_broken_chain_score: 0.0,
            ..Default::default()
        }
    }

    fn net(left_fill_end: u64) -> Vec<Net> {
        let text = format!(
            "\
net chr1 1000
 fill 0 700 chrQ + 0 700 id 1 score 2000 ali 205
  gap 100 200 chrQ + 100 200
   fill 150 {} chrQ + 150 {} id 2 score 500 ali 50
  gap 305 295 chrQ + 305 295
   fill 400 60 chrQ + 400 60 id 2 score 600 ali 60
",
            left_fill_end - 150,
            left_fill_end - 150
        );
        read_nets(text.as_bytes()).unwrap()
    }

    fn by_id(chains: &[Chain], id: u64) -> &Chain {
        chains.iter().find(|c| c.header.id == id).unwrap()
    }

    #[test]
    fn test_suspect_removed() {
        let fx = Fixture::new();
        let breaking = fx.chain(1, &[(0, 100), (300, 305), (600, 700)]);
        let broken = fx.chain(2, &[(150, 200), (400, 460)]);

        let outcome = fx
            .cleaner(lenient())
            .clean(vec![breaking, broken.clone()], &net(200))
            .unwrap();

        assert_eq!(outcome.chains.len(), 3);
        assert_eq!(outcome.suspects.len(), 1);
        let report = &outcome.suspects[0];
        assert_relative_eq!(report.local_score, 50.0);
        assert_relative_eq!(report.left_score, 500.0);
        assert_relative_eq!(report.right_score, 600.0);
        assert_relative_eq!(report.ratio_l, 10.0);
        assert_relative_eq!(report.ratio_r, 12.0);
        assert_eq!(report.new_chain_id, 3);
        assert!(!report.pair);

        let suspect = by_id(&outcome.chains, 3);
        assert_eq!(suspect.blocks, vec![Block::new(300, 305, 300, 305)]);
        assert_eq!((suspect.header.t_start, suspect.header.t_end), (300, 305));
        assert_relative_eq!(suspect.header.score, 50.0);

        assert_eq!(report.suspect_bases, 5);
        assert_eq!((report.l_gap_size, report.r_gap_size), (200, 295));
        assert_relative_eq!(report.left_local, 500.0);
        assert_relative_eq!(report.right_local, 600.0);

        // The two gaps around the suspect became one
        let rescored = by_id(&outcome.chains, 1);
        let spans: Vec<_> = rescored
            .blocks
            .iter()
            .map(|b| (b.q_start, b.q_end, b.t_start, b.t_end))
            .collect();
        assert_eq!(spans, vec![(0, 100, 0, 100), (600, 700, 600, 700)]);
        assert_relative_eq!(rescored.header.score, fx.calc_score(rescored));

        // The broken chain passes through untouched
        let kept = by_id(&outcome.chains, 2);
        assert_eq!(kept.blocks, broken.blocks);
        assert_eq!(kept.header.score, broken.header.score);
    }

    #[test]
    fn test_suspect_kept_when_flank_is_weak() {
        let fx = Fixture::new();
        let breaking = fx.chain(1, &[(0, 100), (300, 305), (600, 700)]);
        let broken = fx.chain(2, &[(150, 156), (400, 460)]);

        let outcome = fx
            .cleaner(lenient())
            .clean(vec![breaking.clone(), broken.clone()], &net(156))
            .unwrap();

        assert!(outcome.suspects.is_empty());
        assert_eq!(outcome.chains.len(), 2);
        let kept = by_id(&outcome.chains, 1);
        assert_eq!(kept.blocks, breaking.blocks);
        assert_eq!(kept.header.score, breaking.header.score);
    }

    #[test]
    fn test_threshold_boundary() {
        let fx = Fixture::new();
        let chains = vec![
            fx.chain(1, &[(0, 100), (300, 305), (600, 700)]),
            fx.chain(2, &[(150, 200), (400, 460)]),
        ];

        // 500 / 50 is exactly 10
        let at = CleanParams {
            lr_fold_threshold: 10.0,
            ..lenient()
        };
        let outcome = fx.cleaner(at).clean(chains.clone(), &net(200)).unwrap();
        assert_eq!(outcome.suspects.len(), 1);

        let above = CleanParams {
            lr_fold_threshold: 10.0 + 1e-9,
            ..lenient()
        };
        let outcome = fx.cleaner(above).clean(chains.clone(), &net(200)).unwrap();
        assert!(outcome.suspects.is_empty());

        // Every other threshold can veto on its own
        let vetoes = [
            CleanParams { fold_threshold: 1e6, ..lenient() },
            CleanParams { max_suspect_score: 49.0, ..lenient() },
            CleanParams { max_suspect_bases: 4, ..lenient() },
            CleanParams { min_broken_chain_score: 1e9, ..lenient() },
            CleanParams { min_lr_gap_size: 296, ..lenient() },
        ];
        for params in vetoes {
            let outcome = fx.cleaner(params).clean(chains.clone(), &net(200)).unwrap();
            assert!(outcome.suspects.is_empty(), "{:?}", params);
        }
    }

    #[test]
    fn test_report_only() {
        let fx = Fixture::new();
        let chains = vec![
            fx.chain(1, &[(0, 100), (300, 305), (600, 700)]),
            fx.chain(2, &[(150, 200), (400, 460)]),
        ];
        let params = CleanParams {
            report_only: true,
            ..lenient()
        };
        let outcome = fx.cleaner(params).clean(chains.clone(), &net(200)).unwrap();

        assert_eq!(outcome.suspects.len(), 1);
        assert_eq!(outcome.suspects[0].new_chain_id, 0);
        assert_eq!(outcome.chains.len(), 2);
        assert_eq!(by_id(&outcome.chains, 1).blocks, chains[0].blocks);
    }

    #[test]
    fn test_unknown_chain_in_net() {
        let fx = Fixture::new();

        let breaking_only = vec![fx.chain(1, &[(0, 100), (300, 305), (600, 700)])];
        let err = fx.cleaner(lenient()).clean(breaking_only, &net(200)).unwrap_err();
        assert!(matches!(err, ChainError::UnknownChain { id: 2 }));

        let broken_only = vec![fx.chain(2, &[(150, 200), (400, 460)])];
        let err = fx.cleaner(lenient()).clean(broken_only, &net(200)).unwrap_err();
        assert!(matches!(err, ChainError::UnknownChain { id: 1 }));
    }

    #[test]
    fn test_suspect_reaching_first_block() {
        let fx = Fixture::new();
        // The net claims a block left of the suspect that the chain lacks
        let chains = vec![
            fx.chain(1, &[(300, 305), (600, 700)]),
            fx.chain(2, &[(150, 200), (400, 460)]),
        ];
        let err = fx.cleaner(lenient()).clean(chains, &net(200)).unwrap_err();
        assert!(matches!(
            err,
            ChainError::RemovesTerminalBlock {
                chain_id: 1,
                which: "first",
                ..
            }
        ));
    }

    #[test]
    fn test_suspect_sharing_flank_block() {
        let fx = Fixture::new();
        // The block holding the suspect starts inside the left gap
        let breaking = fx.chain(1, &[(0, 100), (295, 310), (600, 700)]);
        let chains = vec![breaking.clone(), fx.chain(2, &[(150, 200), (400, 460)])];

        let outcome = fx.cleaner(lenient()).clean(chains, &net(200)).unwrap();
        assert!(outcome.suspects.is_empty());
        assert_eq!(outcome.chains.len(), 2);
        let kept = by_id(&outcome.chains, 1);
        assert_eq!(kept.blocks, breaking.blocks);
        assert_eq!(kept.header.score, breaking.header.score);
    }

    const THREE_PIECES: &str = "\
net chr1 1000
 fill 0 900 chrQ + 0 900 id 1 score 2000 ali 210
  gap 100 200 chrQ + 100 200
   fill 120 170 chrQ + 120 170 id 2 score 1700 ali 170
  gap 305 195 chrQ + 305 195
   fill 320 170 chrQ + 320 170 id 2 score 1700 ali 170
  gap 505 295 chrQ + 505 295
   fill 520 270 chrQ + 520 270 id 2 score 2700 ali 270
";

    fn three_pieces(fx: &Fixture) -> Vec<Chain> {
        vec![
            fx.chain(1, &[(0, 100), (300, 305), (500, 505), (800, 900)]),
            fx.chain(2, &[(120, 290), (320, 490), (520, 790)]),
        ]
    }

    #[test]
    fn test_neighbour_widened_after_removal() {
        let fx = Fixture::new();
        let nets = read_nets(THREE_PIECES.as_bytes()).unwrap();
        let outcome = fx.cleaner(lenient()).clean(three_pieces(&fx), &nets).unwrap();

        assert_eq!(outcome.suspects.len(), 2);
        // The second break saw the first piece and the middle one as its left flank
        let second = &outcome.suspects[1];
        assert_eq!(second.suspect_start, 500);
        assert!(second.left_score > 1700.0);
        assert_eq!(second.new_chain_id, 4);

        let breaking = by_id(&outcome.chains, 1);
        assert_eq!(
            breaking.blocks.iter().map(|b| b.t_start).collect::<Vec<_>>(),
            vec![0, 800]
        );
    }

    #[test]
    fn test_pairs() {
        let fx = Fixture::new();
        let nets = read_nets(THREE_PIECES.as_bytes()).unwrap();
        // Each break alone falls short of this
        let strict = CleanParams {
            lr_fold_threshold: 100.0,
            lr_fold_threshold_pairs: 5.0,
            ..lenient()
        };

        let outcome = fx.cleaner(strict).clean(three_pieces(&fx), &nets).unwrap();
        assert!(outcome.suspects.is_empty());

        let with_pairs = CleanParams {
            do_pairs: true,
            ..strict
        };
        let outcome = fx.cleaner(with_pairs).clean(three_pieces(&fx), &nets).unwrap();
        assert_eq!(outcome.suspects.len(), 1);
        let report = &outcome.suspects[0];
        assert!(report.pair);
        assert_eq!((report.suspect_start, report.suspect_end), (300, 505));

        let suspect = by_id(&outcome.chains, 3);
        assert_eq!(suspect.blocks.len(), 2);
        assert_eq!(by_id(&outcome.chains, 1).blocks.len(), 2);
    }

    #[test]
    fn test_widen_neighbours() {
        let mk = |l: (u64, u64), r: (u64, u64)| Break {
            chrom: "chr1".to_string(),
            depth: 3,
            chain_id: 2,
            parent_id: 1,
            l_fill_start: l.0,
            l_fill_end: l.1,
            r_fill_start: r.0,
            r_fill_end: r.1,
            l_gap_start: l.0 - 10,
            l_gap_end: l.1 + 10,
            r_gap_start: r.0 - 10,
            r_gap_end: r.1 + 10,
            suspect_start: l.1 + 10,
            suspect_end: r.0 - 10,
        };
        let mut list = vec![
            mk((100, 150), (300, 350)),
            mk((300, 350), (500, 550)),
            mk((500, 550), (700, 750)),
        ];
        let removed = list[1].clone();
        assert!(widen_neighbours(&mut list, Some(0), Some(2), &removed));
        assert_eq!((list[0].r_fill_start, list[0].r_fill_end), (300, 550));
        assert_eq!(list[0].r_gap_end, 560);
        assert_eq!((list[2].l_fill_start, list[2].l_fill_end), (300, 550));
        assert_eq!(list[2].l_gap_start, 290);

        // A neighbour of another broken chain is left alone
        let mut other = vec![Break {
            chain_id: 9,
            ..mk((100, 150), (300, 350))
        }];
        assert!(!widen_neighbours(&mut other, Some(0), None, &removed));
    }
}
