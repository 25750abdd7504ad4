//! Error taxonomy for the placement engine.
//!
//! Mirrors the four categories in the design: input errors are always
//! fatal, allocation/capacity failures are recovered locally by the chip
//! coordinator and only surfaced once every alternative is exhausted, and
//! internal errors indicate a logic bug rather than a bad input.

use thiserror::Error;

/// Errors produced while parsing descriptor or graph files.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot open file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("premature end of input in {file} at line {line}")]
    PrematureEof { file: String, line: usize },

    #[error("malformed descriptor header in {file}")]
    BadHeader { file: String },

    #[error("malformed size fields for connected component {index} in {file}")]
    BadSize { file: String, index: usize },

    #[error("state {index} in {file} has an empty name")]
    EmptyName { file: String, index: usize },

    #[error("state {index} in {file} has an incomplete pattern")]
    IncompletePattern { file: String, index: usize },

    #[error("edge {edge} for state {index} in {file} is out of bounds (nstate={nstate})")]
    EdgeOutOfBounds {
        file: String,
        index: usize,
        edge: i64,
        nstate: usize,
    },

    #[error("{file} declares {declared} edges but {found} were found")]
    EdgeCountMismatch {
        file: String,
        declared: usize,
        found: usize,
    },
}

/// Top-level error type for the engine and its CLI front end.
#[derive(Debug, Error)]
pub enum ApMapError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("{automaton} cannot be mapped")]
    AllocationExhausted { automaton: String },

    #[error("chip capacity exhausted before mapping {automaton}")]
    ChipsFull { automaton: String },

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ApMapError>;
