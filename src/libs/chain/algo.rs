use crate::libs::error::Result;

/// What the predecessor search needs to know about a block.
///
/// Coordinates are 0-based and half-open.
pub trait ChainItem {
    fn q_start(&self) -> u64;
    fn q_end(&self) -> u64;
    fn t_start(&self) -> u64;
    fn t_end(&self) -> u64;
    fn score(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Query,
    Target,
}

impl Axis {
    fn start<T: ChainItem>(self, item: &T) -> u64 {
        match self {
            Axis::Query => item.q_start(),
            Axis::Target => item.t_start(),
        }
    }

    fn other(self) -> Axis {
        match self {
            Axis::Query => Axis::Target,
            Axis::Target => Axis::Query,
        }
    }
}

enum Kind {
    Leaf(usize),
    Split {
        axis: Axis,
        cut: u64,
        lo: Box<Node>,
        hi: Box<Node>,
    },
}

/// A subtree with the furthest ends and the best recorded chain score below it.
struct Node {
    max_q: u64,
    max_t: u64,
    best: f64,
    kind: Kind,
}

impl Node {
    fn leaf<T: ChainItem>(idx: usize, items: &[T]) -> Node {
        Node {
            max_q: items[idx].q_end(),
            max_t: items[idx].t_end(),
            best: f64::MIN,
            kind: Kind::Leaf(idx),
        }
    }

    fn split<T: ChainItem>(indices: &mut [usize], items: &[T], axis: Axis) -> Node {
        if let [idx] = *indices {
            return Node::leaf(idx, items);
        }

        indices.sort_by_key(|&i| axis.start(&items[i]));
        let mid = indices.len() / 2;
        let cut = axis.start(&items[indices[mid]]);
        let (left, right) = indices.split_at_mut(mid);
        let lo = Node::split(left, items, axis.other());
        let hi = Node::split(right, items, axis.other());

        Node {
            max_q: lo.max_q.max(hi.max_q),
            max_t: lo.max_t.max(hi.max_t),
            best: f64::MIN,
            kind: Kind::Split {
                axis,
                cut,
                lo: Box::new(lo),
                hi: Box::new(hi),
            },
        }
    }

    /// Raises `best` along the path to leaf `idx`; false if the leaf is not below.
    fn record<T: ChainItem>(&mut self, idx: usize, score: f64, items: &[T]) -> bool {
        let found = match &mut self.kind {
            Kind::Leaf(leaf) => *leaf == idx,
            Kind::Split { axis, cut, lo, hi } => {
                let coord = axis.start(&items[idx]);
                match coord.cmp(cut) {
                    std::cmp::Ordering::Less => lo.record(idx, score, items),
                    std::cmp::Ordering::Greater => hi.record(idx, score, items),
                    // Ties on the cut can land on either side
                    std::cmp::Ordering::Equal => {
                        hi.record(idx, score, items) || lo.record(idx, score, items)
                    }
                }
            }
        };
        if found {
            self.best = self.best.max(score);
        }
        found
    }
}

/// One predecessor lookup: the block being extended and how to price a link.
///
/// `link` gives the total score of chaining a candidate in front of `target`,
/// or `None` when the two cannot be chained. `bound` is a lower bound on the
/// gap cost between blocks `dq`/`dt` apart.
pub struct Search<'s, T, F, L> {
    pub items: &'s [T],
    pub target: usize,
    pub link: &'s F,
    pub bound: &'s L,
}

impl<T, F, L> Search<'_, T, F, L>
where
    T: ChainItem,
    F: Fn(usize, usize) -> Result<Option<f64>>,
    L: Fn(u64, u64) -> f64,
{
    fn visit(&self, node: &Node, best: &mut (f64, Option<usize>)) -> Result<()> {
        let target = &self.items[self.target];
        let ceiling = node.best + target.score();
        if ceiling <= best.0 {
            return Ok(());
        }
        let dq = target.q_start().saturating_sub(node.max_q);
        let dt = target.t_start().saturating_sub(node.max_t);
        if ceiling - (self.bound)(dq, dt) <= best.0 {
            return Ok(());
        }

        match &node.kind {
            Kind::Leaf(cand) => {
                if let Some(score) = (self.link)(*cand, self.target)? {
                    if score > best.0 {
                        *best = (score, Some(*cand));
                    }
                }
            }
            Kind::Split { axis, cut, lo, hi } => {
                // `hi` holds starts at or after the cut, none of them before `target`
                if axis.start(target) > *cut {
                    self.visit(hi, best)?;
                }
                self.visit(lo, best)?;
            }
        }
        Ok(())
    }
}

/// Alternating query/target KD-tree over block starts.
///
/// Only leaves given a score through [`KdTree::record`] take part in searches.
pub struct KdTree {
    root: Option<Node>,
}

impl KdTree {
    /// Builds the tree over `indices`, which get reordered on the way.
    pub fn build<T: ChainItem>(indices: &mut [usize], items: &[T]) -> Self {
        let root = (!indices.is_empty()).then(|| Node::split(indices, items, Axis::Query));
        KdTree { root }
    }

    /// Makes leaf `idx` searchable with the best chain score ending in it.
    pub fn record<T: ChainItem>(&mut self, idx: usize, score: f64, items: &[T]) {
        if let Some(root) = &mut self.root {
            root.record(idx, score, items);
        }
    }

    /// The best total over all recorded predecessors of `search.target`, and
    /// which one gave it. Starts from `floor`, the target scored on its own.
    pub fn best_predecessor<T, F, L>(
        &self,
        search: &Search<'_, T, F, L>,
        floor: f64,
    ) -> Result<(f64, Option<usize>)>
    where
        T: ChainItem,
        F: Fn(usize, usize) -> Result<Option<f64>>,
        L: Fn(u64, u64) -> f64,
    {
        let mut best = (floor, None);
        if let Some(root) = &self.root {
            search.visit(root, &mut best)?;
        }
        Ok(best)
    }
}
