//! Error taxonomy for the tail engine.
//!
//! Every error here is scoped to a single (file, direction) request. None of
//! them poison the engine: the offending chunk or response is dropped and the
//! direction's slot is released or re-issued.

use crate::chunk::Direction;
use thiserror::Error;

/// A chunk could not be spliced into the buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// The chunk neither abuts nor overlaps the buffer edge it was fetched for.
    #[error("chunk for {direction} edge starts at {got}, buffer edge is {edge}")]
    Discontinuity {
        direction: Direction,
        edge: u64,
        got: u64,
    },

    /// Records inside the chunk are not strictly increasing by position.
    #[error("chunk records out of order at position {position}")]
    Unordered { position: u64 },
}

/// Why a response was dropped instead of merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StaleResponse {
    #[error("response belongs to a file that is no longer open")]
    SupersededFile,

    #[error("response does not match the request in flight")]
    UnknownRequest,

    #[error("{0} boundary already reached")]
    ForeclosedBoundary(Direction),

    #[error("no file is open")]
    Closed,
}

/// The fetch itself failed. Retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("malformed message: {0}")]
    Decode(String),

    #[error("unknown log file `{0}`")]
    UnknownFile(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("transport disconnected")]
    Disconnected,
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Decode(err.to_string())
    }
}

/// Umbrella error returned by [`crate::engine::LogEngine`] response handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("stale response dropped: {0}")]
    Stale(#[from] StaleResponse),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
