pub mod align;
pub mod chain;
pub mod clean;
pub mod error;
pub mod io;
pub mod seq;

pub use error::{ChainError, Result};
