//! The per-viewer tail engine.
//!
//! Owns the buffer for the open file and is its only mutator. The rendering
//! layer asks for more data per direction, reads snapshots, and diffs the
//! edge versions to decide what to redraw.

use crate::chunk::{Chunk, Direction};
use crate::config::EngineConfig;
use crate::error::{EngineError, MergeError, StaleResponse};
use crate::fetch::{DirectionStatus, FetchCoordinator, FetchResponse, Transport};
use crate::merge::{MergeEngine, MergeInput, MergeOutcome};
use crate::notify::{ChangeNotifier, EdgeVersions, ViewState};
use crate::record::LogFile;
use crate::source::LogsMessage;
use crate::store::{Buffer, Snapshot};
use std::sync::mpsc::Receiver;
use std::time::Duration;
use tracing::{debug, trace, warn};

pub struct LogEngine<T> {
    transport: T,
    coordinator: FetchCoordinator,
    merger: MergeEngine,
    notifier: ChangeNotifier,
    buffer: Option<Buffer>,
    fetch_limit: usize,
    /// Versions of the last closed or replaced buffer
    retired: EdgeVersions,
}

impl<T: Transport> LogEngine<T> {
    pub fn new(transport: T, config: &EngineConfig) -> Self {
        Self {
            transport,
            coordinator: FetchCoordinator::new(),
            merger: MergeEngine::new(config.max_records),
            notifier: ChangeNotifier::new(),
            buffer: None,
            fetch_limit: config.fetch_limit.max(1),
            retired: EdgeVersions::default(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn file(&self) -> Option<&LogFile> {
        self.buffer.as_ref().map(|b| b.file())
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.buffer.as_ref().map(|b| b.snapshot())
    }

    /// Position of the record held at `direction`'s edge.
    pub fn edge_position(&self, direction: Direction) -> Option<u64> {
        self.buffer
            .as_ref()
            .and_then(|b| b.store().edge_position(direction))
    }

    pub fn view_state(&self) -> ViewState {
        match &self.buffer {
            Some(buffer) => buffer.store().view_state(),
            None => ViewState {
                versions: self.retired,
                ..ViewState::default()
            },
        }
    }

    pub fn status(&self, direction: Direction) -> &DirectionStatus {
        self.coordinator.status(direction)
    }

    /// Push channel of view-state changes for the rendering layer.
    pub fn subscribe(&mut self) -> Receiver<ViewState> {
        self.notifier.subscribe()
    }

    /// Open a file, replacing whatever was open.
    pub fn open(&mut self, file: LogFile) -> bool {
        self.on_file_switch(file)
    }

    /// Drop the current buffer and cancel its requests, then start tailing
    /// `file` from its live end. Returns whether the initial fetch was issued.
    pub fn on_file_switch(&mut self, file: LogFile) -> bool {
        self.coordinator.cancel_all();
        let previous = self.retire();
        debug!(file = %file.name, "switching log file");
        self.buffer = Some(Buffer::replacing(file, previous));
        self.publish();
        self.request_more(Direction::Older)
    }

    /// Stop tailing. Late responses for the closed file are dropped.
    pub fn close(&mut self) {
        self.coordinator.cancel_all();
        self.retire();
        self.publish();
    }

    /// Ask for more records toward `direction`.
    ///
    /// No-op when a request for that direction is in flight, when the edge
    /// already reached the file boundary, or when no file is open. Once the
    /// buffer is full with the live edge held, older records are not fetched
    /// either. While the buffer is empty the request is always the initial
    /// tail read, and only one may be outstanding.
    pub fn request_more(&mut self, direction: Direction) -> bool {
        let Some(buffer) = &self.buffer else {
            return false;
        };
        let store = buffer.store();

        let (direction, anchor) = if store.is_empty() {
            if self.coordinator.any_in_flight() {
                return false;
            }
            (Direction::Older, None)
        } else {
            if direction == Direction::Older
                && store.reached(Direction::Newer)
                && self.merger.is_full(store)
            {
                trace!(records = store.len(), "scrollback at memory bound");
                return false;
            }
            (direction, store.edge_position(direction))
        };

        let request = self.coordinator.issue(
            buffer.file(),
            direction,
            anchor,
            self.fetch_limit,
            store.reached(direction),
        );
        match request {
            Some(request) => {
                trace!(
                    id = request.id.0,
                    file = %request.file.name,
                    %direction,
                    anchor = ?request.anchor,
                    limit = request.limit,
                    "issuing fetch"
                );
                self.transport.send(request);
                true
            }
            None => false,
        }
    }

    /// Handle one response from the transport.
    pub fn on_response(&mut self, response: FetchResponse) -> Result<MergeOutcome, EngineError> {
        let FetchResponse { request, result } = response;
        let direction = request.direction;

        let Some(buffer) = self.buffer.as_mut() else {
            debug!(id = request.id.0, "dropping response: no file open");
            return Err(StaleResponse::Closed.into());
        };
        if !request.file.same_file(buffer.file()) {
            debug!(id = request.id.0, file = %request.file.name, "dropping response for superseded file");
            return Err(StaleResponse::SupersededFile.into());
        }

        let message = match result {
            Ok(message) => message,
            Err(err) => {
                if let Err(stale) = self.coordinator.fail(&request, err.clone()) {
                    debug!(id = request.id.0, %stale, "dropping failed stale response");
                    return Err(stale.into());
                }
                warn!(file = %request.file.name, %direction, error = %err, "fetch failed");
                return Err(err.into());
            }
        };

        if let Err(stale) = self
            .coordinator
            .accept(&request, buffer.store().reached(direction))
        {
            debug!(id = request.id.0, %stale, "dropping stale response");
            return Err(stale.into());
        }

        let Some(source) = message.source else {
            trace!(id = request.id.0, %direction, "keepalive response");
            return Ok(MergeOutcome::default());
        };
        if !source.same_file(buffer.file()) {
            debug!(file = %source.name, "dropping response tagged with another file");
            return Err(StaleResponse::SupersededFile.into());
        }

        let input = MergeInput {
            direction,
            limit: request.limit,
            boundary: message.boundary,
            unanchored: request.anchor.is_none(),
        };
        let merged = Chunk::new(source.name.clone(), message.chunk)
            .and_then(|chunk| self.merger.merge(&mut buffer.store, chunk, &input));

        match merged {
            Ok(mut outcome) => {
                buffer.file.cursor = source.cursor;
                let coordinator = &self.coordinator;
                self.merger.enforce_limit(
                    &mut buffer.store,
                    direction,
                    |edge| coordinator.is_in_flight(edge),
                    &mut outcome,
                );
                self.publish();
                Ok(outcome)
            }
            Err(err) => {
                warn!(file = %source.name, %direction, error = %err, "discarding chunk");
                if matches!(err, MergeError::Discontinuity { .. }) {
                    self.request_more(direction);
                }
                Err(err.into())
            }
        }
    }

    /// Handle records the source pushed outside any request (live tail).
    ///
    /// Applied only while the bottom edge sits at the live end of the file;
    /// otherwise the push is ignored and the next newer fetch covers it.
    pub fn on_push(&mut self, message: LogsMessage) -> Result<MergeOutcome, EngineError> {
        let Some(buffer) = self.buffer.as_mut() else {
            return Err(StaleResponse::Closed.into());
        };
        if let Some(source) = &message.source {
            if !source.same_file(buffer.file()) {
                debug!(file = %source.name, "dropping push for another file");
                return Err(StaleResponse::SupersededFile.into());
            }
        }
        if !buffer.store().reached(Direction::Newer) {
            debug!(records = message.chunk.len(), "live push ignored: not at live edge");
            return Ok(MergeOutcome::default());
        }

        let name = buffer.file().name.clone();
        let merged = Chunk::new(name, message.chunk)
            .and_then(|chunk| self.merger.merge_live(&mut buffer.store, chunk));

        match merged {
            Ok(mut outcome) => {
                if let Some(source) = message.source {
                    buffer.file.cursor = source.cursor;
                }
                let coordinator = &self.coordinator;
                self.merger.enforce_limit(
                    &mut buffer.store,
                    Direction::Newer,
                    |edge| coordinator.is_in_flight(edge),
                    &mut outcome,
                );
                self.publish();
                Ok(outcome)
            }
            Err(err) => {
                warn!(error = %err, "discarding live push");
                Err(err.into())
            }
        }
    }

    /// Drain every response that has already arrived.
    pub fn poll(&mut self) -> MergeOutcome {
        let mut total = MergeOutcome::default();
        while let Some(response) = self.transport.try_recv() {
            if let Ok(outcome) = self.on_response(response) {
                total.combine(&outcome);
            }
        }
        total
    }

    /// Wait up to `timeout` for a response, then drain the rest.
    pub fn wait(&mut self, timeout: Duration) -> MergeOutcome {
        let mut total = MergeOutcome::default();
        if let Some(response) = self.transport.recv_timeout(timeout) {
            if let Ok(outcome) = self.on_response(response) {
                total.combine(&outcome);
            }
        }
        total.combine(&self.poll());
        total
    }

    pub fn has_pending(&self) -> bool {
        self.coordinator.any_in_flight()
    }

    fn retire(&mut self) -> EdgeVersions {
        if let Some(buffer) = self.buffer.take() {
            self.retired = buffer.store().versions();
        }
        self.retired
    }

    fn publish(&mut self) {
        let state = self.view_state();
        self.notifier.publish(state);
    }
}
