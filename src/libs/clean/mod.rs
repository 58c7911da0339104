//! Removal of chain-breaking fragments.
//!
//! A high-scoring chain sometimes carries a short, weak local alignment
//! that lands inside a lower-scoring chain and splits it in the net.
//! The cleaner finds such breaks from the net, compares the fragment with
//! the pieces of the broken chain around it, and cuts it out into a chain
//! of its own when the broken chain is clearly the better explanation.
//!
//! * [`net`] - The fill/gap tree of a net file.
//! * [`breaks`] - Nested pieces of broken chains and the breaks between them.
//! * [`cleaner`] - Evaluation and removal of suspects.

pub mod breaks;
pub mod cleaner;
pub mod net;

pub use breaks::{collect_fill_gaps, find_breaks, AlignedRanges, Break, FillGapInfo};
pub use cleaner::{ChainCleaner, CleanOutcome, SuspectReport};
pub use net::{read_nets, Fill, Gap, Net};

/// Thresholds of the cleaner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanParams {
    /// Minimum ratio of each flanking piece's score to the suspect's local score.
    pub lr_fold_threshold: f64,
    /// Minimum ratio of the joined pieces' score to the suspect's local score.
    pub fold_threshold: f64,
    pub max_suspect_bases: u64,
    pub max_suspect_score: f64,
    pub min_broken_chain_score: f64,
    /// Minimum size of both gaps around the suspect.
    pub min_lr_gap_size: u64,
    /// Also try adjacent breaks together.
    pub do_pairs: bool,
    pub lr_fold_threshold_pairs: f64,
    pub max_pair_distance: u64,
    /// Report what would be removed without changing any chain.
    pub report_only: bool,
}

impl Default for CleanParams {
    fn default() -> Self {
        CleanParams {
            lr_fold_threshold: 2.5,
            fold_threshold: 0.0,
            max_suspect_bases: u64::MAX,
            max_suspect_score: 100000.0,
            min_broken_chain_score: 50000.0,
            min_lr_gap_size: 0,
            do_pairs: false,
            lr_fold_threshold_pairs: 10.0,
            max_pair_distance: 10000,
            report_only: false,
        }
    }
}
