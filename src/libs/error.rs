use thiserror::Error;

/// Errors raised by the chaining, gap-filling and cleaning stages.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A gap cost table is missing rows, has inconsistent rows, or holds bad numbers.
    #[error("Invalid gap cost table: {message}")]
    InvalidGapTable { message: String },

    #[error("Invalid substitution matrix: {message}")]
    InvalidMatrix { message: String },

    /// The connection cost was asked for blocks that are not in coordinate order.
    #[error(
        "Blocks out of order: q {a_q_start}/{b_q_start}, t {a_t_start}/{b_t_start} (left/right)"
    )]
    BlocksOutOfOrder {
        a_q_start: u64,
        a_t_start: u64,
        b_q_start: u64,
        b_t_start: u64,
    },

    /// Excising `start..end` would drop the first or last block of a chain.
    #[error("Removing {start}-{end} from chain {chain_id} would delete its {which} block")]
    RemovesTerminalBlock {
        chain_id: u64,
        start: u64,
        end: u64,
        which: &'static str,
    },

    #[error("Malformed net at line {line}: {message}")]
    MalformedNet { line: usize, message: String },

    #[error("Malformed chain at line {line}: {message}")]
    MalformedChain { line: usize, message: String },

    /// The net names a chain id that is not among the loaded chains.
    #[error("Chain {id} is referenced by the net but was never loaded")]
    UnknownChain { id: u64 },

    #[error("Sequence not loaded: {name}")]
    MissingSequence { name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChainError>;
