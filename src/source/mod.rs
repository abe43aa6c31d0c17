//! The remote side of the engine: something that can serve record ranges
//! of named log files.

pub mod dir_source;
pub mod line_index;

use crate::chunk::Direction;
use crate::error::TransportError;
use crate::fetch::FetchRequest;
use crate::record::{LogFile, Record};
use serde::{Deserialize, Serialize};
use std::ops::Range;

pub use dir_source::DirSource;

/// Inbound message from a log source.
///
/// `source: None` is a transient/keepalive reply carrying no data for the
/// requesting direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsMessage {
    pub source: Option<LogFile>,
    #[serde(default)]
    pub chunk: Vec<Record>,
    /// The source has no data beyond this chunk in the requested direction.
    #[serde(default)]
    pub boundary: bool,
}

impl LogsMessage {
    pub fn new(source: LogFile, chunk: Vec<Record>) -> Self {
        Self {
            source: Some(source),
            chunk,
            boundary: false,
        }
    }

    pub fn keepalive() -> Self {
        Self::default()
    }

    pub fn with_boundary(mut self, boundary: bool) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn is_keepalive(&self) -> bool {
        self.source.is_none()
    }
}

/// A log source the engine can fetch from.
pub trait LogSource: Send + Sync {
    /// Files available for tailing, oldest name first.
    fn files(&self) -> Result<Vec<LogFile>, TransportError>;

    /// Answer one bounded fetch.
    fn fetch(&self, request: &FetchRequest) -> Result<LogsMessage, TransportError>;

    /// Up to `limit` records appended after `position` (or from the start
    /// when `None`). Used for live pushes.
    fn read_after(
        &self,
        file: &LogFile,
        position: Option<u64>,
        limit: usize,
    ) -> Result<LogsMessage, TransportError>;
}

/// Positions a fetch covers in a file of `total` records, and whether that
/// range touches the file edge in the requested direction.
pub fn select_range(
    total: u64,
    direction: Direction,
    anchor: Option<u64>,
    limit: usize,
) -> (Range<u64>, bool) {
    let limit = limit as u64;
    match direction {
        Direction::Older => {
            let end = anchor.unwrap_or(total).min(total);
            let start = end.saturating_sub(limit);
            (start..end, start == 0)
        }
        Direction::Newer => {
            let start = anchor.map_or(0, |a| a.saturating_add(1)).min(total);
            let end = start.saturating_add(limit).min(total);
            (start..end, end == total)
        }
    }
}
