use crate::libs::clean::net::{Fill, Net};
use log::debug;
use rust_lapper::{Interval, Lapper};
use std::collections::{BTreeMap, HashMap};

/// A nested fill together with the gap it sits in.
#[derive(Debug, Clone, PartialEq)]
pub struct FillGapInfo {
    pub chrom: String,
    pub chain_id: u64,
    pub depth: usize,
    pub fill_start: u64,
    pub fill_end: u64,
    pub gap_start: u64,
    pub gap_end: u64,
    /// Chain of the fill enclosing the gap.
    pub parent_id: u64,
    pub gap_depth: usize,
}

/// Two consecutive pieces of a broken chain around a fragment of the
/// breaking chain.
///
/// The suspect is the stretch between the two enclosing gaps:
/// `suspect_start = l_gap_end`, `suspect_end = r_gap_start`.
#[derive(Debug, Clone, PartialEq)]
pub struct Break {
    pub chrom: String,
    pub depth: usize,
    /// The broken chain.
    pub chain_id: u64,
    /// The breaking chain.
    pub parent_id: u64,
    pub l_fill_start: u64,
    pub l_fill_end: u64,
    pub r_fill_start: u64,
    pub r_fill_end: u64,
    pub l_gap_start: u64,
    pub l_gap_end: u64,
    pub r_gap_start: u64,
    pub r_gap_end: u64,
    pub suspect_start: u64,
    pub suspect_end: u64,
}

impl Break {
    /// Break between two fill/gap records; `None` unless the coordinates nest
    /// as left fill < suspect < right fill.
    pub fn new(left: &FillGapInfo, right: &FillGapInfo) -> Option<Break> {
        Break {
            chrom: left.chrom.clone(),
            depth: left.depth,
            chain_id: left.chain_id,
            parent_id: left.parent_id,
            l_fill_start: left.fill_start,
            l_fill_end: left.fill_end,
            r_fill_start: right.fill_start,
            r_fill_end: right.fill_end,
            l_gap_start: left.gap_start,
            l_gap_end: left.gap_end,
            r_gap_start: right.gap_start,
            r_gap_end: right.gap_end,
            suspect_start: left.gap_end,
            suspect_end: right.gap_start,
        }
        .checked()
    }

    /// Upstream left side joined with downstream right side.
    pub fn pair(up: &Break, down: &Break) -> Option<Break> {
        Break {
            r_fill_start: down.r_fill_start,
            r_fill_end: down.r_fill_end,
            r_gap_start: down.r_gap_start,
            r_gap_end: down.r_gap_end,
            suspect_end: down.r_gap_start,
            ..up.clone()
        }
        .checked()
    }

    fn checked(self) -> Option<Break> {
        let ok = self.suspect_start < self.suspect_end
            && self.l_fill_start < self.suspect_start
            && self.l_fill_end <= self.suspect_start
            && self.r_fill_start >= self.suspect_end
            && self.r_fill_end > self.suspect_end;
        if ok {
            Some(self)
        } else {
            debug!(
                "Break of chain {} by {} at {}:{}-{} fails the nesting checks",
                self.chain_id, self.parent_id, self.chrom, self.suspect_start, self.suspect_end
            );
            None
        }
    }

    pub fn l_gap_size(&self) -> u64 {
        self.l_gap_end - self.l_gap_start
    }

    pub fn r_gap_size(&self) -> u64 {
        self.r_gap_end - self.r_gap_start
    }

    /// Whether `down`, the next break in the list, shares the gap between them
    /// and lies close enough to be judged together with `self`.
    pub fn pairs_with(&self, down: &Break, max_distance: u64) -> bool {
        self.parent_id == down.parent_id
            && self.chain_id == down.chain_id
            && self.depth == down.depth
            && self.chrom == down.chrom
            && down.suspect_start.saturating_sub(self.suspect_end) <= max_distance
            && self.r_gap_start == down.l_gap_start
            && self.r_gap_end == down.l_gap_end
    }
}

/// Walks the nets depth first and records every fill below the top level,
/// grouped by chain id in net order.
pub fn collect_fill_gaps(nets: &[Net]) -> BTreeMap<u64, Vec<FillGapInfo>> {
    struct Enclosing {
        start: u64,
        end: u64,
        parent_id: u64,
        depth: usize,
    }

    fn walk(
        fills: &[Fill],
        depth: usize,
        chrom: &str,
        enclosing: Option<&Enclosing>,
        out: &mut BTreeMap<u64, Vec<FillGapInfo>>,
    ) {
        for fill in fills {
            if let Some(gap) = enclosing {
                out.entry(fill.chain_id).or_default().push(FillGapInfo {
                    chrom: chrom.to_string(),
                    chain_id: fill.chain_id,
                    depth,
                    fill_start: fill.t_start,
                    fill_end: fill.t_end,
                    gap_start: gap.start,
                    gap_end: gap.end,
                    parent_id: gap.parent_id,
                    gap_depth: gap.depth,
                });
            }
            for gap in &fill.gaps {
                let inner = Enclosing {
                    start: gap.t_start,
                    end: gap.t_end,
                    parent_id: fill.chain_id,
                    depth: depth + 1,
                };
                walk(&gap.fills, depth + 2, chrom, Some(&inner), out);
            }
        }
    }

    let mut out = BTreeMap::new();
    for net in nets {
        walk(&net.fills, 1, &net.name, None, &mut out);
    }
    out
}

/// Target ranges actually aligned in the nets, tagged with their chain id.
///
/// A fill contributes its span minus the gaps holding nested fills; gaps
/// without children stay part of the range.
pub struct AlignedRanges {
    trees: HashMap<String, Lapper<u64, u64>>,
}

impl AlignedRanges {
    pub fn from_nets(nets: &[Net]) -> Self {
        fn add(fills: &[Fill], out: &mut Vec<Interval<u64, u64>>) {
            let mut push = |start: u64, stop: u64, val: u64| {
                if start < stop {
                    out.push(Interval { start, stop, val });
                }
            };
            for fill in fills {
                let mut start = fill.t_start;
                for gap in fill.gaps.iter().filter(|g| !g.fills.is_empty()) {
                    push(start, gap.t_start, fill.chain_id);
                    start = gap.t_end;
                }
                push(start, fill.t_end, fill.chain_id);
            }
            for fill in fills {
                for gap in &fill.gaps {
                    add(&gap.fills, out);
                }
            }
        }

        let mut by_chrom: HashMap<String, Vec<Interval<u64, u64>>> = HashMap::new();
        for net in nets {
            add(&net.fills, by_chrom.entry(net.name.clone()).or_default());
        }
        AlignedRanges {
            trees: by_chrom
                .into_iter()
                .map(|(chrom, intervals)| (chrom, Lapper::new(intervals)))
                .collect(),
        }
    }

    /// Whether `[start, end)` touches a range of a chain scoring higher than
    /// `chain_id` (a lower id) other than the breaking chain `parent_id`.
    pub fn higher_chain_between(
        &self,
        chrom: &str,
        start: u64,
        end: u64,
        chain_id: u64,
        parent_id: u64,
    ) -> bool {
        self.trees.get(chrom).is_some_and(|tree| {
            tree.find(start, end)
                .any(|iv| iv.val < chain_id && iv.val != parent_id)
        })
    }
}

/// Valid breaks grouped by breaking chain id, each list in net order.
pub fn find_breaks(nets: &[Net]) -> BTreeMap<u64, Vec<Break>> {
    let ranges = AlignedRanges::from_nets(nets);
    let mut breaks: BTreeMap<u64, Vec<Break>> = BTreeMap::new();

    for (chain_id, infos) in collect_fill_gaps(nets) {
        if infos.len() < 2 {
            continue;
        }
        for pair in infos.windows(2) {
            let (left, right) = (&pair[0], &pair[1]);
            if left.chrom != right.chrom {
                continue;
            }
            if left.depth != right.depth {
                debug!("Chain {}: pieces at different depths", chain_id);
                continue;
            }
            if left.parent_id != right.parent_id {
                debug!("Chain {}: pieces under different chains", chain_id);
                continue;
            }
            if ranges.higher_chain_between(
                &left.chrom,
                left.fill_end,
                right.fill_start,
                chain_id,
                left.parent_id,
            ) {
                debug!(
                    "Chain {}: {}:{}-{} also covered by a higher-scoring chain",
                    chain_id, left.chrom, left.fill_end, right.fill_start
                );
                continue;
            }
            if left.gap_start == right.gap_start && left.gap_end == right.gap_end {
                debug!(
                    "Chain {}: both pieces in the same gap {}-{}",
                    chain_id, left.gap_start, left.gap_end
                );
                continue;
            }

            if let Some(b) = Break::new(left, right) {
                breaks.entry(b.parent_id).or_default().push(b);
            }
        }
    }

    for list in breaks.values_mut() {
        list.sort_by(|a, b| (&a.chrom, a.suspect_start).cmp(&(&b.chrom, b.suspect_start)));
    }
    breaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::clean::net::read_nets;

    const NET: &str = "\
net chr1 1000
 fill 0 700 chrQ + 0 700 id 1 score 2000 ali 205
  gap 100 200 chrQ + 100 200
   fill 150 50 chrQ + 150 50 id 2 score 500 ali 50
  gap 305 295 chrQ + 305 295
   fill 400 60 chrQ + 400 60 id 2 score 600 ali 60
";

    #[test]
    fn test_collect_fill_gaps() {
        let nets = read_nets(NET.as_bytes()).unwrap();
        let infos = collect_fill_gaps(&nets);
        assert_eq!(infos.len(), 1);
        let pieces = &infos[&2];
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].depth, 3);
        assert_eq!(pieces[0].gap_depth, 2);
        assert_eq!(pieces[0].parent_id, 1);
        assert_eq!((pieces[0].gap_start, pieces[0].gap_end), (100, 300));
        assert_eq!((pieces[1].fill_start, pieces[1].fill_end), (400, 460));
    }

    #[test]
    fn test_find_breaks() {
        let nets = read_nets(NET.as_bytes()).unwrap();
        let breaks = find_breaks(&nets);
        assert_eq!(breaks.len(), 1);
        let list = &breaks[&1];
        assert_eq!(list.len(), 1);
        let b = &list[0];
        assert_eq!(b.chain_id, 2);
        assert_eq!((b.suspect_start, b.suspect_end), (300, 305));
        assert_eq!((b.l_fill_start, b.r_fill_end), (150, 460));
        assert_eq!(b.l_gap_size(), 200);
        assert_eq!(b.r_gap_size(), 295);
    }

    #[test]
    fn test_same_gap_is_not_a_break() {
        let net = "\
net chr1 1000
 fill 0 700 chrQ + 0 700 id 1 score 2000 ali 205
  gap 100 500 chrQ + 100 500
   fill 150 50 chrQ + 150 50 id 5 score 500 ali 50
   fill 400 60 chrQ + 400 60 id 5 score 600 ali 60
";
        let nets = read_nets(net.as_bytes()).unwrap();
        assert!(find_breaks(&nets).is_empty());
    }

    #[test]
    fn test_higher_chain_in_between() {
        // Chain 3 sits between the pieces of chain 4 in another fill of chain 2,
        // which outranks chain 4 without being the breaking chain 1
        let net = "\
net chr1 2000
 fill 0 700 chrQ + 0 700 id 1 score 2000 ali 205
  gap 100 200 chrQ + 100 200
   fill 150 50 chrQ + 150 50 id 4 score 500 ali 50
  gap 305 295 chrQ + 305 295
   fill 400 60 chrQ + 400 60 id 4 score 600 ali 60
 fill 1000 100 chrQ + 1000 100 id 2 score 100 ali 100
";
        let nets = read_nets(net.as_bytes()).unwrap();
        let ranges = AlignedRanges::from_nets(&nets);
        // The gaps holding chain 4 are carved out of chain 1's range
        assert!(!ranges.higher_chain_between("chr1", 120, 140, 4, 0));
        assert!(ranges.higher_chain_between("chr1", 20, 40, 4, 0));
        assert!(!ranges.higher_chain_between("chr1", 20, 40, 4, 1));
        assert!(ranges.higher_chain_between("chr1", 1050, 1060, 4, 1));
        assert!(!ranges.higher_chain_between("chr2", 0, 10, 4, 1));
        // Between the pieces only chain 1, the breaking chain, is aligned
        assert_eq!(find_breaks(&nets)[&1].len(), 1);
    }

    #[test]
    fn test_break_pairing() {
        let info = |fill_start, fill_end, gap_start, gap_end| FillGapInfo {
            chrom: "chr1".to_string(),
            chain_id: 2,
            depth: 3,
            fill_start,
            fill_end,
            gap_start,
            gap_end,
            parent_id: 1,
            gap_depth: 2,
        };
        let a = info(100, 150, 50, 200);
        let b = info(300, 350, 250, 400);
        let c = info(500, 550, 450, 600);

        let up = Break::new(&a, &b).unwrap();
        let down = Break::new(&b, &c).unwrap();
        assert!(up.pairs_with(&down, 10000));
        assert!(!up.pairs_with(&down, 100));

        let joined = Break::pair(&up, &down).unwrap();
        assert_eq!((joined.suspect_start, joined.suspect_end), (200, 450));
        assert_eq!((joined.l_fill_start, joined.r_fill_end), (100, 550));

        // Right piece starting inside the suspect
        let bad = info(220, 240, 230, 400);
        assert!(Break::new(&a, &bad).is_none());
    }
}
