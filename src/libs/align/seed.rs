use crate::libs::align::AlignParams;
use crate::libs::chain::{Block, SubMatrix};
use fxhash::FxHashMap;

/// Produces the gapless blocks chaining starts from.
///
/// Every hit goes through `limiter` before it is extended, and every kept
/// block is recorded there.
pub trait Seeder: Sync {
    fn seed(
        &self,
        query: &[u8],
        target: &[u8],
        matrix: &SubMatrix,
        params: &AlignParams,
        limiter: &mut HitLimiter<'_>,
    ) -> Vec<Block>;
}

/// How often each position has been covered by a kept seed block.
///
/// A track is only allocated when its limit is set.
#[derive(Debug, Clone, Default)]
pub struct HitCounts {
    target: Vec<u32>,
    query: Vec<u32>,
}

impl HitCounts {
    pub fn new(q_len: usize, t_len: usize, params: &AlignParams) -> Self {
        let track = |limit: Option<u32>, len| if limit.is_some() { vec![0; len] } else { Vec::new() };
        HitCounts {
            target: track(params.dyna_limit_t, t_len),
            query: track(params.dyna_limit_q, q_len),
        }
    }

    /// Starts the query track over, e.g. for the other strand.
    pub fn reset_query(&mut self) {
        self.query.fill(0);
    }

    pub fn target(&self, pos: usize) -> u32 {
        self.target.get(pos).copied().unwrap_or(0)
    }

    pub fn query(&self, pos: usize) -> u32 {
        self.query.get(pos).copied().unwrap_or(0)
    }
}

/// The dynamic hit limits applied to one window of the sequences.
///
/// Window coordinates are shifted by the offsets before they touch `counts`.
pub struct HitLimiter<'h> {
    counts: &'h mut HitCounts,
    limit_t: Option<u32>,
    limit_q: Option<u32>,
    q_offset: usize,
    t_offset: usize,
}

impl<'h> HitLimiter<'h> {
    pub fn new(counts: &'h mut HitCounts, params: &AlignParams, q_offset: usize, t_offset: usize) -> Self {
        HitLimiter {
            counts,
            limit_t: params.dyna_limit_t,
            limit_q: params.dyna_limit_q,
            q_offset,
            t_offset,
        }
    }

    /// Whether a hit at window position (`i`, `j`) may still be extended.
    pub fn admits(&self, i: usize, j: usize) -> bool {
        let t_ok = self
            .limit_t
            .map_or(true, |limit| self.counts.target(j + self.t_offset) < limit);
        let q_ok = self
            .limit_q
            .map_or(true, |limit| self.counts.query(i + self.q_offset) < limit);
        t_ok && q_ok
    }

    /// Counts every position `block` covers; `block` is in window coordinates.
    pub fn record(&mut self, block: &Block) {
        let bump = |track: &mut Vec<u32>, start: u64, end: u64, offset: usize| {
            let end = (end as usize + offset).min(track.len());
            let start = (start as usize + offset).min(end);
            for c in &mut track[start..end] {
                *c += 1;
            }
        };
        if self.limit_t.is_some() {
            bump(&mut self.counts.target, block.t_start, block.t_end, self.t_offset);
        }
        if self.limit_q.is_some() {
            bump(&mut self.counts.query, block.q_start, block.q_end, self.q_offset);
        }
    }
}

/// Exact k-mer hits of length `weight`, each extended without gaps until
/// the score drops `max_drop` below its best.
///
/// Hits already covered by an extension on the same diagonal are skipped,
/// as are k-mers containing anything but ACGT and positions over their
/// dynamic hit limit.
#[derive(Debug, Clone, Copy)]
pub struct KmerSeeder {
    /// Target k-mers occurring more often than this are ignored.
    pub max_occurrences: usize,
}

impl Default for KmerSeeder {
    fn default() -> Self {
        KmerSeeder {
            max_occurrences: 1024,
        }
    }
}

fn is_acgt(kmer: &[u8]) -> bool {
    kmer.iter().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T'))
}

impl Seeder for KmerSeeder {
    fn seed(
        &self,
        query: &[u8],
        target: &[u8],
        matrix: &SubMatrix,
        params: &AlignParams,
        limiter: &mut HitLimiter<'_>,
    ) -> Vec<Block> {
        let k = params.weight;
        if k == 0 || query.len() < k || target.len() < k {
            return Vec::new();
        }

        let q_upper = query.to_ascii_uppercase();
        let t_upper = target.to_ascii_uppercase();

        let mut index: FxHashMap<&[u8], Vec<usize>> = FxHashMap::default();
        for (j, kmer) in t_upper.windows(k).enumerate() {
            if is_acgt(kmer) {
                index.entry(kmer).or_default().push(j);
            }
        }

        // Per diagonal, the query end of the last extension
        let mut covered: FxHashMap<i64, usize> = FxHashMap::default();
        let mut blocks = Vec::new();

        for (i, kmer) in q_upper.windows(k).enumerate() {
            let hits = match index.get(kmer) {
                Some(hits) if hits.len() <= self.max_occurrences => hits,
                _ => continue,
            };
            for &j in hits {
                let diagonal = j as i64 - i as i64;
                if covered.get(&diagonal).is_some_and(|&end| i < end) || !limiter.admits(i, j) {
                    continue;
                }

                let (block, score) = extend_gapless(query, target, i, j, k, matrix, params.max_drop);
                covered.insert(diagonal, block.q_end as usize);
                if score >= params.min_gapless {
                    limiter.record(&block);
                    blocks.push(Block { score, ..block });
                }
            }
        }

        blocks
    }
}

/// X-drop extension of the hit at (`i`, `j`) of length `k`, both directions.
fn extend_gapless(
    query: &[u8],
    target: &[u8],
    i: usize,
    j: usize,
    k: usize,
    matrix: &SubMatrix,
    max_drop: f64,
) -> (Block, f64) {
    let seed_score = matrix.score_ungapped(&query[i..i + k], &target[j..j + k]) as f64;

    let mut run = 0.0;
    let mut best_right = 0.0;
    let mut right = 0;
    for (n, (&a, &b)) in query[i + k..].iter().zip(&target[j + k..]).enumerate() {
        run += matrix.score(a, b) as f64;
        if run > best_right {
            best_right = run;
            right = n + 1;
        } else if best_right - run > max_drop {
            break;
        }
    }

    let mut run = 0.0;
    let mut best_left = 0.0;
    let mut left = 0;
    for (n, (&a, &b)) in query[..i].iter().rev().zip(target[..j].iter().rev()).enumerate() {
        run += matrix.score(a, b) as f64;
        if run > best_left {
            best_left = run;
            left = n + 1;
        } else if best_left - run > max_drop {
            break;
        }
    }

    let block = Block::new(
        (i - left) as u64,
        (i + k + right) as u64,
        (j - left) as u64,
        (j + k + right) as u64,
    );
    (block, seed_score + best_left + best_right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::chain::connect::tests::random_seq;

    fn seed(query: &[u8], target: &[u8], matrix: &SubMatrix, params: &AlignParams) -> Vec<Block> {
        let mut counts = HitCounts::default();
        let mut limiter = HitLimiter::new(&mut counts, params, 0, 0);
        KmerSeeder::default().seed(query, target, matrix, params, &mut limiter)
    }

    #[test]
    fn test_seed_shared_segment() {
        let shared = random_seq(300, 21);
        let mut query = random_seq(100, 22);
        query.extend_from_slice(&shared);
        let mut target = random_seq(400, 23);
        target.extend_from_slice(&shared);

        let matrix = SubMatrix::hoxd55();
        let params = AlignParams::default();
        let blocks = seed(&query, &target, &matrix, &params);

        let best = blocks
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .unwrap();
        assert!(best.q_start <= 100);
        assert_eq!(best.q_end, 400);
        assert_eq!(best.diagonal(), 300);
        // Every later hit on that diagonal lies inside the first extension
        assert_eq!(blocks.iter().filter(|b| b.diagonal() == 300).count(), 1);
    }

    #[test]
    fn test_seed_min_gapless() {
        let shared = random_seq(20, 24);
        let matrix = SubMatrix::hoxd55();
        let params = AlignParams::default();
        // 20 matching bases score well below 2200
        assert!(seed(&shared, &shared, &matrix, &params).is_empty());

        let lenient = AlignParams {
            min_gapless: 0.0,
            ..params
        };
        assert!(!seed(&shared, &shared, &matrix, &lenient).is_empty());
    }

    #[test]
    fn test_seed_ignores_case_and_n() {
        let upper = random_seq(200, 25);
        let lower = upper.to_ascii_lowercase();
        let matrix = SubMatrix::hoxd55();
        let params = AlignParams::default();
        let blocks = seed(&lower, &upper, &matrix, &params);
        assert!(blocks.iter().any(|b| b.q_start == 0 && b.q_end == 200));

        let ns = vec![b'N'; 200];
        assert!(seed(&ns, &ns, &matrix, &params).is_empty());
    }

    #[test]
    fn test_seed_dynamic_limits() {
        let unit = random_seq(200, 26);
        let target = unit.repeat(5);
        let matrix = SubMatrix::hoxd55();
        let params = AlignParams::default();

        // One block per copy of the repeat
        assert_eq!(seed(&unit, &target, &matrix, &params).len(), 5);

        // Once a query base is covered, it seeds nothing else
        let limited = AlignParams {
            dyna_limit_q: Some(1),
            ..params
        };
        let mut counts = HitCounts::new(unit.len(), target.len(), &limited);
        let mut limiter = HitLimiter::new(&mut counts, &limited, 0, 0);
        let blocks = KmerSeeder::default().seed(&unit, &target, &matrix, &limited, &mut limiter);
        assert_eq!(blocks.len(), 1);
        assert_eq!(counts.query(0), 1);
        assert_eq!(counts.query(199), 1);

        // Counts carry over to the next window
        let mut limiter = HitLimiter::new(&mut counts, &limited, 0, 0);
        assert!(KmerSeeder::default()
            .seed(&unit, &target, &matrix, &limited, &mut limiter)
            .is_empty());

        // Target limits see window offsets
        let by_target = AlignParams {
            dyna_limit_t: Some(1),
            ..params
        };
        let mut counts = HitCounts::new(unit.len(), target.len(), &by_target);
        let mut limiter = HitLimiter::new(&mut counts, &by_target, 0, 400);
        let blocks =
            KmerSeeder::default().seed(&unit, &target[400..600], &matrix, &by_target, &mut limiter);
        assert_eq!(blocks.len(), 1);
        assert_eq!(counts.target(399), 0);
        assert_eq!(counts.target(400), 1);
        assert_eq!(counts.target(599), 1);
        let limiter = HitLimiter::new(&mut counts, &by_target, 0, 0);
        assert!(!limiter.admits(0, 450));
        assert!(limiter.admits(0, 0));
    }
}
