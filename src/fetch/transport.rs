use super::{FetchRequest, FetchResponse};
use crate::source::LogSource;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Carries fetch requests to a log source and brings responses back.
///
/// `send` must not block on the source: the two directions are fetched
/// independently and a slow older-edge read must not hold up the live edge.
pub trait Transport {
    fn send(&mut self, request: FetchRequest);

    /// Next response, if one has arrived.
    fn try_recv(&mut self) -> Option<FetchResponse>;

    /// Wait up to `timeout` for the next response.
    fn recv_timeout(&mut self, _timeout: Duration) -> Option<FetchResponse> {
        self.try_recv()
    }
}

/// Runs each request against a [`LogSource`] on its own worker thread.
///
/// Workers whose request was cancelled before they started skip the read and
/// send nothing; the coordinator has already forgotten that request.
pub struct ThreadedTransport<S> {
    source: Arc<S>,
    tx: Sender<FetchResponse>,
    rx: Receiver<FetchResponse>,
}

impl<S: LogSource + 'static> ThreadedTransport<S> {
    pub fn new(source: Arc<S>) -> Self {
        let (tx, rx) = channel();
        Self { source, tx, rx }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }
}

impl<S: LogSource + 'static> Transport for ThreadedTransport<S> {
    fn send(&mut self, request: FetchRequest) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();

        thread::spawn(move || {
            if request.is_cancelled() {
                return;
            }
            let result = source.fetch(&request);
            if request.is_cancelled() {
                tracing::trace!(id = request.id.0, "dropping result of cancelled fetch");
                return;
            }
            let _ = tx.send(FetchResponse { request, result });
        });
    }

    fn try_recv(&mut self) -> Option<FetchResponse> {
        self.rx.try_recv().ok()
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Option<FetchResponse> {
        match self.rx.recv_timeout(timeout) {
            Ok(response) => Some(response),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Direction;
    use crate::fetch::{CancelToken, RequestId};
    use crate::record::LogFile;
    use crate::test_utils::MemorySource;

    fn request(direction: Direction, anchor: Option<u64>, limit: usize) -> FetchRequest {
        FetchRequest {
            id: RequestId(1),
            epoch: 0,
            file: LogFile::new("app.log"),
            direction,
            anchor,
            limit,
            cancel: CancelToken::new(),
        }
    }

    #[test]
    fn test_threaded_transport_round_trip() {
        let source = Arc::new(MemorySource::with_file("app.log", 10));
        let mut transport = ThreadedTransport::new(source);

        transport.send(request(Direction::Older, None, 3));
        let response = transport
            .recv_timeout(Duration::from_secs(5))
            .expect("response");

        let message = response.result.unwrap();
        let positions: Vec<u64> = message.chunk.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![7, 8, 9]);
        assert_eq!(response.request.id, RequestId(1));
    }

    #[test]
    fn test_cancelled_request_sends_nothing() {
        let source = Arc::new(MemorySource::with_file("app.log", 10));
        let mut transport = ThreadedTransport::new(source);

        let req = request(Direction::Newer, Some(2), 3);
        req.cancel.cancel();
        transport.send(req);

        assert!(transport.recv_timeout(Duration::from_millis(100)).is_none());
    }
}
