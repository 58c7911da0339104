//! Seed, chain, extend and refill pairwise alignments.
//!
//! * [`seed`] - Gapless k-mer hits, the raw blocks everything starts from.
//! * [`band`] - Banded extension of the regions around and between chained blocks.
//! * [`lump`] - Candidate regions for the sensitive second pass, clustered by overlap.
//! * [`fill`] - The pipeline: coarse chaining, band extension, re-chaining, gap recovery.
//! * [`reduce`] - Final touch-ups: small double-sided gaps, splice sites for RNA queries.

pub mod band;
pub mod fill;
pub mod lump;
pub mod reduce;
pub mod seed;

pub use band::{BandExtender, BandedAligner, Direction};
pub use fill::{remove_simple_overlaps, shrink_blocks, threshold_chains, Aligner};
pub use lump::{add_clipped, lump_regions, Clump, Region};
pub use reduce::{reduce_gaps, slide_introns};
pub use seed::{HitCounts, HitLimiter, KmerSeeder, Seeder};

/// Tunables of the gap-filling aligner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignParams {
    /// Seed k-mer size.
    pub weight: usize,
    /// Minimum score of a gapless seed extension.
    pub min_gapless: f64,
    /// Gapless extension stops once the score falls this far below its best.
    pub max_drop: f64,
    /// Minimum score of a coarse chain.
    pub min_chain: f64,
    /// Minimum score of a final chain.
    pub min_score: f64,
    /// Longest stretch handed to banded extension, per side.
    pub max_extend: u64,
    /// Band half-width of the extension.
    pub max_band_gap: usize,
    /// Bases trimmed off each coarse block before extension, split between its ends.
    pub shrink: u64,
    /// Extend only the best coarse chain.
    pub best_chain_only: bool,
    /// Extend at most this many coarse chains.
    pub max_chains_to_explore: usize,
    /// Largest region searched again at higher sensitivity; 0 disables the pass.
    pub expand_window: u64,
    /// Only chains scoring at least this have their gaps searched again.
    pub min_expand: f64,
    /// Also align the reverse complement of the query.
    pub both_strands: bool,
    /// Close small double-sided gaps after chaining.
    pub reduce_gaps: bool,
    /// The query is RNA: move target-only gaps onto splice sites where possible.
    pub rna: bool,
    /// Stop seeding from a target base once this many seed blocks cover it.
    pub dyna_limit_t: Option<u32>,
    /// The same for query bases, counted per strand.
    pub dyna_limit_q: Option<u32>,
}

impl Default for AlignParams {
    fn default() -> Self {
        AlignParams {
            weight: 11,
            min_gapless: 2200.0,
            max_drop: 1500.0,
            min_chain: 0.0,
            min_score: 4000.0,
            max_extend: 5000,
            max_band_gap: 50,
            shrink: 200,
            best_chain_only: false,
            max_chains_to_explore: 1000,
            expand_window: 10000,
            min_expand: 1000.0,
            both_strands: true,
            reduce_gaps: true,
            rna: false,
            dyna_limit_t: None,
            dyna_limit_q: None,
        }
    }
}

impl AlignParams {
    /// Parameters for searching a small region again: shorter seeds, lower
    /// thresholds, tighter extension, and no further refinement.
    pub fn focused(&self) -> Self {
        AlignParams {
            weight: if self.weight >= 9 {
                self.weight - 3
            } else {
                self.weight.saturating_sub(2).max(1)
            },
            min_score: self.min_score - 500.0,
            min_gapless: self.min_gapless - 500.0,
            min_chain: self.min_chain - 500.0,
            max_extend: self.max_extend / 6,
            max_band_gap: self.max_band_gap / 6,
            best_chain_only: true,
            expand_window: 0,
            ..*self
        }
    }
}

/// Counters of one alignment run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlignStats {
    pub seeds: usize,
    pub chains_explored: usize,
    pub blocks_extended: usize,
    pub regions_expanded: usize,
    pub expanded_area: u64,
}

impl std::ops::AddAssign for AlignStats {
    fn add_assign(&mut self, other: Self) {
        self.seeds += other.seeds;
        self.chains_explored += other.chains_explored;
        self.blocks_extended += other.blocks_extended;
        self.regions_expanded += other.regions_expanded;
        self.expanded_area += other.expanded_area;
    }
}
