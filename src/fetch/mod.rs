pub mod cancel;
pub mod coordinator;
pub mod transport;

use crate::chunk::Direction;
use crate::error::TransportError;
use crate::record::LogFile;
use crate::source::LogsMessage;

pub use cancel::CancelToken;
pub use coordinator::FetchCoordinator;
pub use transport::{ThreadedTransport, Transport};

/// Identifier of one issued request, unique per coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

/// A bounded read of one file toward one edge.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub id: RequestId,
    /// File generation the request was issued under; bumps on every switch.
    pub epoch: u64,
    pub file: LogFile,
    pub direction: Direction,
    /// Position of the buffer's edge record to resume from. `None` reads from
    /// the file's far edge: the last `limit` records for `Older`, the first
    /// `limit` for `Newer`.
    pub anchor: Option<u64>,
    pub limit: usize,
    pub cancel: CancelToken,
}

impl FetchRequest {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A request paired with what the source answered.
#[derive(Debug)]
pub struct FetchResponse {
    pub request: FetchRequest,
    pub result: Result<LogsMessage, TransportError>,
}

/// Per-direction fetch state exposed to the rendering layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DirectionStatus {
    #[default]
    Idle,
    Pending,
    /// Last fetch failed; a new `request_more` retries.
    Error(TransportError),
}

impl DirectionStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, DirectionStatus::Pending)
    }
}
