use crate::chunk::Direction;
use crate::engine::LogEngine;
use crate::error::EngineError;
use crate::fetch::Transport;
use crate::merge::MergeOutcome;
use crate::record::LogFile;
use crate::source::LogSource;
use anyhow::Result;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::Path;
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;

/// File change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    Modified,
    Error(String),
}

/// Watches one log file for appended data
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<FileEvent>,
}

impl FileWatcher {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (tx, rx) = channel();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    if matches!(
                        event.kind,
                        notify::EventKind::Modify(_) | notify::EventKind::Create(_)
                    ) {
                        let _ = tx.send(FileEvent::Modified);
                    }
                }
                Err(e) => {
                    let _ = tx.send(FileEvent::Error(e.to_string()));
                }
            }
        })?;

        watcher.watch(path.as_ref(), RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    /// Non-blocking check for a pending event
    pub fn try_recv(&self) -> Option<FileEvent> {
        self.receiver.try_recv().ok()
    }

    /// Drain pending events. Returns true if any was a modification.
    pub fn drain_modified(&self) -> bool {
        let mut modified = false;
        while let Some(event) = self.try_recv() {
            match event {
                FileEvent::Modified => modified = true,
                FileEvent::Error(err) => tracing::warn!(error = %err, "file watcher error"),
            }
        }
        modified
    }
}

/// Turns file modifications into live pushes for an engine.
pub struct LiveTail<S> {
    watcher: FileWatcher,
    source: Arc<S>,
    file: LogFile,
    batch: usize,
}

impl<S: LogSource> LiveTail<S> {
    /// Watch `path`, which the source serves as `file`. Pushes are read in
    /// batches of at most `batch` records.
    pub fn new(path: &Path, source: Arc<S>, file: LogFile, batch: usize) -> Result<Self> {
        Ok(Self {
            watcher: FileWatcher::new(path)?,
            source,
            file,
            batch: batch.max(1),
        })
    }

    pub fn file(&self) -> &LogFile {
        &self.file
    }

    /// If the file changed, push everything appended after the engine's
    /// newest record.
    pub fn poll<T: Transport>(
        &self,
        engine: &mut LogEngine<T>,
    ) -> Result<MergeOutcome, EngineError> {
        if !self.watcher.drain_modified() {
            return Ok(MergeOutcome::default());
        }
        self.catch_up(engine)
    }

    /// Push records appended after the engine's newest record, regardless of
    /// watcher events.
    pub fn catch_up<T: Transport>(
        &self,
        engine: &mut LogEngine<T>,
    ) -> Result<MergeOutcome, EngineError> {
        let mut total = MergeOutcome::default();
        loop {
            let state = engine.view_state();
            if !state.reached_bottom {
                return Ok(total);
            }
            let last = engine.edge_position(Direction::Newer);

            let message = self.source.read_after(&self.file, last, self.batch)?;
            let received = message.chunk.len();
            let outcome = engine.on_push(message)?;
            total.combine(&outcome);

            if received < self.batch || outcome.is_noop() {
                return Ok(total);
            }
        }
    }
}
