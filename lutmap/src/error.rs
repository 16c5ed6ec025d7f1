//! Errors reported by the crate.

/// Everything that can go wrong outside of internal invariant violations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading the input failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The AIGER input is malformed.
    #[error("AIGER error: {0}")]
    Aiger(String),
    /// The input uses a construct the mapper does not handle.
    #[error("unsupported input: {0}")]
    Unsupported(&'static str),
    /// A gate has more inputs than a LUT, and gates are never decomposed.
    #[error("node {node} has {fanins} distinct fanins, more than the cut size of {cut_size}")]
    GateTooWide {
        /// Dense index of the gate.
        node: usize,
        /// Distinct non-constant fanins of the gate.
        fanins: usize,
        /// The configured cut size.
        cut_size: u32,
    },
    /// The mapping parameters are out of range.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}

/// Result type of the crate.
pub type Result<T> = std::result::Result<T, Error>;
