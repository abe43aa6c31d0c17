//! Edge-scoped change signalling for the rendering layer.
//!
//! Consumers keep the last `EdgeVersions` they rendered and redraw only the
//! edge whose counter moved.

use crate::chunk::Direction;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Per-edge change counters. Both only ever increase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EdgeVersions {
    pub top: u64,
    pub bottom: u64,
}

impl EdgeVersions {
    pub fn bump(&mut self, direction: Direction) {
        match direction {
            Direction::Older => self.top += 1,
            Direction::Newer => self.bottom += 1,
        }
    }

    pub fn bump_both(&mut self) {
        self.top += 1;
        self.bottom += 1;
    }

    pub fn get(&self, direction: Direction) -> u64 {
        match direction {
            Direction::Older => self.top,
            Direction::Newer => self.bottom,
        }
    }
}

/// What the rendering layer reads after every update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewState {
    pub versions: EdgeVersions,
    pub reached_top: bool,
    pub reached_bottom: bool,
}

/// Region of the view that needs redrawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    None,
    Top,
    Bottom,
    Both,
}

impl Invalidation {
    pub fn from_flags(top: bool, bottom: bool) -> Self {
        match (top, bottom) {
            (false, false) => Invalidation::None,
            (true, false) => Invalidation::Top,
            (false, true) => Invalidation::Bottom,
            (true, true) => Invalidation::Both,
        }
    }

    pub fn top(self) -> bool {
        matches!(self, Invalidation::Top | Invalidation::Both)
    }

    pub fn bottom(self) -> bool {
        matches!(self, Invalidation::Bottom | Invalidation::Both)
    }
}

/// Consumer-side memory of the last rendered versions.
#[derive(Debug, Clone, Default)]
pub struct Observer {
    last_seen: Option<EdgeVersions>,
}

impl Observer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare against the last observed versions and remember the new ones.
    ///
    /// The first observation always invalidates both edges.
    pub fn observe(&mut self, state: &ViewState) -> Invalidation {
        let current = state.versions;
        let invalidation = match self.last_seen {
            None => Invalidation::Both,
            Some(seen) => {
                Invalidation::from_flags(current.top != seen.top, current.bottom != seen.bottom)
            }
        };
        self.last_seen = Some(current);
        invalidation
    }

    pub fn last_seen(&self) -> Option<EdgeVersions> {
        self.last_seen
    }
}

/// Push side: fans `ViewState` updates out to subscribed consumers.
#[derive(Debug, Default)]
pub struct ChangeNotifier {
    subscribers: Vec<Sender<ViewState>>,
    last_published: Option<ViewState>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a consumer. It receives the current state on the next publish.
    pub fn subscribe(&mut self) -> Receiver<ViewState> {
        let (tx, rx) = channel();
        if let Some(state) = self.last_published {
            let _ = tx.send(state);
        }
        self.subscribers.push(tx);
        rx
    }

    /// Send `state` to every live subscriber if it differs from the last
    /// published state. Disconnected subscribers are pruned.
    pub fn publish(&mut self, state: ViewState) {
        if self.last_published == Some(state) {
            return;
        }
        self.last_published = Some(state);
        self.subscribers.retain(|tx| tx.send(state).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
