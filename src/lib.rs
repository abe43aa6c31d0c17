//! Bidirectional tail buffer for remote log files.
//!
//! A [`LogEngine`](engine::LogEngine) holds a contiguous window of one file's
//! records, fetches more at either edge on demand, applies live pushes at the
//! bottom, and versions each edge so a renderer can redraw only what moved.

pub mod chunk;
pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod merge;
pub mod notify;
pub mod record;
pub mod signal;
pub mod source;
pub mod store;
pub mod watcher;

#[cfg(test)]
mod test_utils;

pub use chunk::{Chunk, Direction};
pub use engine::LogEngine;
pub use error::{EngineError, MergeError, StaleResponse, TransportError};
pub use record::{Level, LogFile, Record};
