//! Chaining functionality for connecting alignment blocks.
//!
//! This module implements the chaining algorithm used to connect local alignments (blocks)
//! into larger chains, similar to the UCSC `axtChain` tool.
//!
//! # Core Components
//!
//! * [`gap_calc`] - Gap cost calculation (table lookup, interpolation, extrapolation).
//! * [`sub_matrix`] - DNA substitution matrices (e.g., HoxD55).
//! * [`connect`] - Connection costs, overlap trimming at crossover points, chain scoring.
//! * [`algo`] - Data structures for efficient predecessor search (KD-tree).
//! * [`chainer`] - The pluggable chaining strategy and its KD-tree default.
//! * [`record`] - Data structures for reading/writing Chain format.
//!
//! # Algorithm Overview
//!
//! 1. **Input**: A set of scored alignment blocks.
//! 2. **Indexing**: Blocks are indexed in a KD-tree by their start coordinates (query, target).
//! 3. **Dynamic Programming**:
//!    - For each block, find "predecessor" blocks that are strictly before it in both query and target.
//!    - Calculate score: `Score = BlockScore + Max(PredecessorScore - ConnectCost)`.
//!    - Gap costs bound the connection cost from below and prune the search.
//! 4. **Overlap Handling**: Overlaps between adjacent blocks are trimmed to maximize the total score.
//! 5. **Output**: Chains, best first, each rescored from scratch.

pub mod algo;
pub mod chainer;
pub mod connect;
pub mod gap_calc;
pub mod record;
pub mod sub_matrix;

pub use algo::{ChainItem, KdTree, Search};
pub use chainer::{ChainCosts, Chainer, KdChainer};
pub use connect::{merge_abutting, Crossover, ScoreContext, FULL_OVERLAP_PENALTY};
pub use gap_calc::GapCalc;
pub use record::{read_chains, sort_chains, Block, Chain, ChainData, ChainHeader, ChainReader};
pub use sub_matrix::SubMatrix;
