use crate::libs::chain::{Chain, ScoreContext};
use log::warn;

/// Equal double-sided gaps shorter than this may be closed outright.
const MAX_EQUAL_GAP: u64 = 200;
/// Double-sided gaps with one side shorter than this may shrink to one-sided.
const MAX_SHORT_SIDE: u64 = 30;

/// Best split of `match_size` gapless bases between the two ends of a gap.
///
/// Returns the bases kept after the left block and the total substitution score.
fn best_gap_pos(
    ctx: &ScoreContext,
    q_start: u64,
    dq: u64,
    t_start: u64,
    dt: u64,
    match_size: u64,
) -> (u64, f64) {
    let mut best = (0, f64::MIN);
    for pos in 0..=match_size {
        let right = match_size - pos;
        let score = ctx.score_ungapped(q_start, t_start, pos)
            + ctx.score_ungapped(q_start + dq - right, t_start + dt - right, right);
        if score > best.1 {
            best = (pos, score);
        }
    }
    best
}

/// Closes or narrows small double-sided gaps where that raises the score.
///
/// Equal gaps on both sides are filled in gaplessly when the filled bases
/// score at least the gap cost they replace. Gaps with a short side are
/// turned into a one-sided gap at the best position. The chain score is kept
/// in step and checked against a full rescore at the end.
pub fn reduce_gaps(ctx: &ScoreContext, chain: &mut Chain) {
    let blocks = &mut chain.blocks;
    let mut score = chain.header.score;

    let mut i = 0;
    while i + 1 < blocks.len() {
        let dq = blocks[i + 1].q_start - blocks[i].q_end;
        let dt = blocks[i + 1].t_start - blocks[i].t_end;
        if dq == 0 || dt == 0 {
            i += 1;
            continue;
        }
        let gap_cost = ctx.gap_cost(dq as i64, dt as i64);

        if dq == dt && dq < MAX_EQUAL_GAP {
            let fill = ctx.score_ungapped(blocks[i].q_end, blocks[i].t_end, dq);
            if fill >= -gap_cost {
                let next = blocks.remove(i + 1);
                let b = &mut blocks[i];
                b.q_end = next.q_end;
                b.t_end = next.t_end;
                b.score += fill + next.score;
                score += fill + gap_cost;
                // The merged block may now reach the next gap
                continue;
            }
        } else if dq < MAX_SHORT_SIDE || dt < MAX_SHORT_SIDE {
            let match_size = dq.min(dt);
            let (pos, match_score) =
                best_gap_pos(ctx, blocks[i].q_end, dq, blocks[i].t_end, dt, match_size);
            let gain = match_score - ctx.gap_cost((dq - match_size) as i64, (dt - match_size) as i64)
                + gap_cost;
            if gain >= 0.0 {
                let right = match_size - pos;
                let left_score = ctx.score_ungapped(blocks[i].q_end, blocks[i].t_end, pos);
                let b = &mut blocks[i];
                b.q_end += pos;
                b.t_end += pos;
                b.score += left_score;

                let next = &mut blocks[i + 1];
                next.q_start -= right;
                next.t_start -= right;
                next.score += ctx.score_ungapped(next.q_start, next.t_start, right);
                score += gain;
            }
        }
        i += 1;
    }

    let scratch = ctx.calc_score(&chain.blocks);
    if (scratch - score).abs() > 1e-6 {
        warn!(
            "Chain {}: incremental score {} differs from rescore {}",
            chain.header.id, score, scratch
        );
    }
    chain.header.score = scratch;
    chain.calc_bounds();
}

/// How many ends of the target-side gap `start..end` look like a splice
/// site, GT..AG or CT..AC on the other strand.
fn splice_sites(target: &[u8], start: usize, end: usize) -> u8 {
    if end < start + 4 || end > target.len() {
        return 0;
    }
    let is = |at: usize, motif: &[u8]| target[at..at + 2].eq_ignore_ascii_case(motif);
    let forward = is(start, b"GT") as u8 + is(end - 2, b"AG") as u8;
    let reverse = is(start, b"CT") as u8 + is(end - 2, b"AC") as u8;
    forward.max(reverse)
}

/// Moves each target-only gap, within the span where that leaves the
/// alignment unchanged, to where its ends best match splice sites.
///
/// Ties keep the gap closest to where it was. Scores are unaffected.
pub fn slide_introns(ctx: &ScoreContext, chain: &mut Chain) {
    let target = ctx.target;
    let blocks = &mut chain.blocks;
    for i in 1..blocks.len() {
        let (left, right) = (&blocks[i - 1], &blocks[i]);
        if right.q_start != left.q_end || right.t_start <= left.t_end {
            continue;
        }
        let (a, b) = (left.t_end as usize, right.t_start as usize);
        if right.t_end as usize > target.len() {
            continue;
        }

        let same = |x: usize, y: usize| target[x].eq_ignore_ascii_case(&target[y]);
        let mut back = 0;
        while back + 1 < left.t_size() as usize && same(a - back - 1, b - back - 1) {
            back += 1;
        }
        let mut ahead = 0;
        while ahead + 1 < right.t_size() as usize && same(a + ahead, b + ahead) {
            ahead += 1;
        }

        let mut best = (splice_sites(target, a, b), 0i64);
        for shift in -(back as i64)..=ahead as i64 {
            let sites = splice_sites(target, (a as i64 + shift) as usize, (b as i64 + shift) as usize);
            if sites > best.0 || (sites == best.0 && shift.abs() < best.1.abs()) {
                best = (sites, shift);
            }
        }
        let shift = best.1;
        if shift == 0 {
            continue;
        }

        let move_by = |x: u64| (x as i64 + shift) as u64;
        let left = &mut blocks[i - 1];
        left.q_end = move_by(left.q_end);
        left.t_end = move_by(left.t_end);
        left.score = ctx.score_block(left);
        let right = &mut blocks[i];
        right.q_start = move_by(right.q_start);
        right.t_start = move_by(right.t_start);
        right.score = ctx.score_block(right);
    }
}
