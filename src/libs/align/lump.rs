/// A rectangle of query x target space, half-open on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub q_start: u64,
    pub q_end: u64,
    pub t_start: u64,
    pub t_end: u64,
}

impl Region {
    pub fn q_size(&self) -> u64 {
        self.q_end - self.q_start
    }

    pub fn t_size(&self) -> u64 {
        self.t_end - self.t_start
    }

    pub fn area(&self) -> u64 {
        self.q_size() * self.t_size()
    }

    fn union(&self, other: &Region) -> Region {
        Region {
            q_start: self.q_start.min(other.q_start),
            q_end: self.q_end.max(other.q_end),
            t_start: self.t_start.min(other.t_start),
            t_end: self.t_end.max(other.t_end),
        }
    }
}

/// The bounding box of a group of overlapping regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clump {
    pub region: Region,
    pub count: usize,
}

/// Clips a candidate to the sequences and keeps it if both sides reach
/// `min_size`.
///
/// Candidates wider than `window` on either side are searched only near
/// their two corners, one window each.
pub fn add_clipped(
    regions: &mut Vec<Region>,
    region: Region,
    q_size: u64,
    t_size: u64,
    min_size: u64,
    window: u64,
) {
    let r = Region {
        q_start: region.q_start,
        q_end: region.q_end.min(q_size),
        t_start: region.t_start,
        t_end: region.t_end.min(t_size),
    };
    if r.q_end <= r.q_start || r.t_end <= r.t_start {
        return;
    }
    if r.q_size() < min_size || r.t_size() < min_size {
        return;
    }

    if r.q_size() > window || r.t_size() > window {
        regions.push(Region {
            q_end: r.q_end.min(r.q_start + window),
            t_end: r.t_end.min(r.t_start + window),
            ..r
        });
        regions.push(Region {
            q_start: r.q_start.max(r.q_end.saturating_sub(window)),
            t_start: r.t_start.max(r.t_end.saturating_sub(window)),
            ..r
        });
    } else {
        regions.push(r);
    }
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Query,
    Target,
}

impl Axis {
    fn span(self, r: &Region) -> (u64, u64) {
        match self {
            Axis::Query => (r.q_start, r.q_end),
            Axis::Target => (r.t_start, r.t_end),
        }
    }

    fn other(self) -> Axis {
        match self {
            Axis::Query => Axis::Target,
            Axis::Target => Axis::Query,
        }
    }
}

/// Sorts on `axis` and cuts wherever a region starts at or after the
/// furthest end seen so far.
fn split_on(mut regions: Vec<Region>, axis: Axis) -> Vec<Vec<Region>> {
    regions.sort_by_key(|r| axis.span(r));
    let mut runs: Vec<Vec<Region>> = Vec::new();
    let mut run_end = 0;
    for r in regions {
        let (start, end) = axis.span(&r);
        match runs.last_mut() {
            Some(run) if start < run_end => {
                run.push(r);
                run_end = run_end.max(end);
            }
            _ => {
                runs.push(vec![r]);
                run_end = end;
            }
        }
    }
    runs
}

/// Groups regions that overlap, directly or through others.
///
/// Groups are split on query spans, then target spans, alternating until
/// neither axis splits a group any further.
/// Clumps come ordered by query then target start.
pub fn lump_regions(regions: &[Region]) -> Vec<Clump> {
    let mut clumps = Vec::new();
    // A group, the axis to split it on next, and whether the other axis left it whole
    let mut pending = vec![(regions.to_vec(), Axis::Query, false)];
    while let Some((group, axis, whole)) = pending.pop() {
        let mut runs = split_on(group, axis);
        if runs.len() == 1 {
            let run = runs.swap_remove(0);
            if whole {
                clumps.push(Clump {
                    region: run[1..].iter().fold(run[0], |acc, r| acc.union(r)),
                    count: run.len(),
                });
            } else {
                pending.push((run, axis.other(), true));
            }
        } else {
            pending.extend(runs.into_iter().map(|run| (run, axis.other(), false)));
        }
    }

    clumps.sort_by_key(|c| (c.region.q_start, c.region.t_start));
    clumps
}
