use crate::error::TransportError;
use crate::fetch::{FetchRequest, FetchResponse, Transport};
use crate::record::{Level, LogFile, Record};
use crate::source::{select_range, LogSource, LogsMessage};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// In-memory log source: each file is a count of `line N` records.
pub struct MemorySource {
    files: Mutex<HashMap<String, u64>>,
}

impl MemorySource {
    pub fn with_file(name: &str, records: u64) -> Self {
        let mut files = HashMap::new();
        files.insert(name.to_string(), records);
        Self {
            files: Mutex::new(files),
        }
    }

    /// Simulate appends to `name`.
    pub fn grow(&self, name: &str, extra: u64) {
        let mut files = self.files.lock().unwrap();
        *files.entry(name.to_string()).or_insert(0) += extra;
    }

    fn total(&self, name: &str) -> Result<u64, TransportError> {
        self.files
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .ok_or_else(|| TransportError::UnknownFile(name.to_string()))
    }

    fn message(name: &str, range: std::ops::Range<u64>, total: u64, boundary: bool) -> LogsMessage {
        let chunk = range
            .map(|p| Record::new(p, Level::Info, format!("line {}", p)))
            .collect();
        LogsMessage::new(LogFile::new(name).with_cursor(total.to_string()), chunk)
            .with_boundary(boundary)
    }
}

impl LogSource for MemorySource {
    fn files(&self) -> Result<Vec<LogFile>, TransportError> {
        let mut names: Vec<_> = self.files.lock().unwrap().keys().cloned().collect();
        names.sort();
        Ok(names.into_iter().map(LogFile::new).collect())
    }

    fn fetch(&self, request: &FetchRequest) -> Result<LogsMessage, TransportError> {
        let total = self.total(&request.file.name)?;
        let (range, boundary) =
            select_range(total, request.direction, request.anchor, request.limit);
        Ok(Self::message(&request.file.name, range, total, boundary))
    }

    fn read_after(
        &self,
        file: &LogFile,
        position: Option<u64>,
        limit: usize,
    ) -> Result<LogsMessage, TransportError> {
        let total = self.total(&file.name)?;
        let (range, boundary) =
            select_range(total, crate::chunk::Direction::Newer, position, limit);
        Ok(Self::message(&file.name, range, total, boundary))
    }
}

/// Transport that records requests and replays queued responses.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Vec<FetchRequest>,
    pub responses: VecDeque<FetchResponse>,
}

impl RecordingTransport {
    pub fn sent(&self) -> &[FetchRequest] {
        &self.sent
    }

    /// Remove and return the most recently sent request.
    pub fn take_last(&mut self) -> Option<FetchRequest> {
        self.sent.pop()
    }

    pub fn clear(&mut self) {
        self.sent.clear();
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, request: FetchRequest) {
        self.sent.push(request);
    }

    fn try_recv(&mut self) -> Option<FetchResponse> {
        self.responses.pop_front()
    }
}
