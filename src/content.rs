//! Content variants a viewer container can host.
//!
//! The container forwards scroll and update hooks to whichever content is
//! active. Only the log panel reacts; any other panel takes the no-op arm.

use crate::chunk::Direction;
use crate::engine::LogEngine;
use crate::fetch::Transport;
use crate::merge::MergeOutcome;
use crate::notify::{Invalidation, Observer};

/// Viewport position captured before a buffer mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollAnchor {
    pub top_index: usize,
}

/// Scroll state of the log view, in buffer indices.
#[derive(Debug, Clone)]
pub struct LogPanel {
    top_index: usize,
    rows: usize,
    edge_band: usize,
    observer: Observer,
}

impl LogPanel {
    pub fn new(rows: usize, edge_band: usize) -> Self {
        Self {
            top_index: 0,
            rows,
            edge_band,
            observer: Observer::new(),
        }
    }

    pub fn top_index(&self) -> usize {
        self.top_index
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Edges within `edge_band` records of the visible window.
    pub fn edges_near(&self, buffered: usize) -> Vec<Direction> {
        let mut edges = Vec::new();
        if self.top_index <= self.edge_band {
            edges.push(Direction::Older);
        }
        if self.top_index + self.rows + self.edge_band >= buffered {
            edges.push(Direction::Newer);
        }
        edges
    }

    /// Shift the top index by what the merge added or evicted above it.
    fn reanchor(&mut self, anchor: ScrollAnchor, outcome: &MergeOutcome, buffered: usize) {
        let shifted = anchor.top_index as isize + outcome.index_shift();
        let max_top = buffered.saturating_sub(1);
        self.top_index = (shifted.max(0) as usize).min(max_top);
    }
}

#[derive(Debug, Clone)]
pub enum Content {
    Logs(LogPanel),
    /// A panel that does not scroll log data.
    Placeholder,
}

impl Content {
    /// The user scrolled so that `top_index` is the first visible record.
    /// Returns how many fetches were issued.
    pub fn on_scroll<T: Transport>(&mut self, top_index: usize, engine: &mut LogEngine<T>) -> usize {
        match self {
            Content::Logs(panel) => {
                panel.top_index = top_index;
                let buffered = engine.snapshot().map_or(0, |s| s.len());
                panel
                    .edges_near(buffered)
                    .into_iter()
                    .filter(|&edge| engine.request_more(edge))
                    .count()
            }
            Content::Placeholder => 0,
        }
    }

    pub fn before_update(&self) -> Option<ScrollAnchor> {
        match self {
            Content::Logs(panel) => Some(ScrollAnchor {
                top_index: panel.top_index,
            }),
            Content::Placeholder => None,
        }
    }

    /// Re-anchor after a merge and report which region needs redrawing.
    pub fn after_update<T: Transport>(
        &mut self,
        anchor: Option<ScrollAnchor>,
        outcome: &MergeOutcome,
        engine: &LogEngine<T>,
    ) -> Invalidation {
        match (self, anchor) {
            (Content::Logs(panel), Some(anchor)) => {
                let buffered = engine.snapshot().map_or(0, |s| s.len());
                panel.reanchor(anchor, outcome, buffered);
                panel.observer.observe(&engine.view_state())
            }
            _ => Invalidation::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::fetch::FetchResponse;
    use crate::record::{Level, LogFile, Record};
    use crate::source::LogsMessage;
    use crate::test_utils::RecordingTransport;

    fn engine_with(positions: std::ops::Range<u64>) -> LogEngine<RecordingTransport> {
        let config = EngineConfig {
            fetch_limit: 10,
            max_records: None,
            ..EngineConfig::default()
        };
        let mut engine = LogEngine::new(RecordingTransport::default(), &config);
        engine.open(LogFile::new("app.log"));
        let request = engine.transport_mut().take_last().unwrap();
        let records = positions.map(|p| Record::new(p, Level::Info, "x")).collect();
        engine
            .on_response(FetchResponse {
                result: Ok(LogsMessage::new(request.file.clone(), records)),
                request,
            })
            .unwrap();
        engine
    }

    #[test]
    fn test_placeholder_ignores_hooks() {
        let mut engine = engine_with(90..100);
        let mut content = Content::Placeholder;
        assert_eq!(content.on_scroll(0, &mut engine), 0);
        assert_eq!(content.before_update(), None);
        assert_eq!(
            content.after_update(None, &MergeOutcome::default(), &engine),
            Invalidation::None
        );
    }

    #[test]
    fn test_scroll_near_top_requests_older() {
        let mut engine = engine_with(90..100);
        engine.transport_mut().clear();
        let mut content = Content::Logs(LogPanel::new(3, 2));

        assert_eq!(content.on_scroll(1, &mut engine), 1);
        let sent = engine.transport().sent();
        assert_eq!(sent[0].direction, Direction::Older);
        assert_eq!(sent[0].anchor, Some(90));
    }

    #[test]
    fn test_scroll_in_middle_requests_nothing() {
        let panel = LogPanel {
            top_index: 40,
            ..LogPanel::new(10, 5)
        };
        assert!(panel.edges_near(100).is_empty());
        assert_eq!(panel.edges_near(55), vec![Direction::Newer]);
    }

    #[test]
    fn test_prepend_keeps_viewport_anchored() {
        let mut engine = engine_with(90..100);
        let mut content = Content::Logs(LogPanel::new(3, 2));
        content.on_scroll(0, &mut engine);
        let request = engine.transport_mut().take_last().unwrap();

        let anchor = content.before_update();
        let records = (80..90).map(|p| Record::new(p, Level::Info, "x")).collect();
        let outcome = engine
            .on_response(FetchResponse {
                result: Ok(LogsMessage::new(request.file.clone(), records)),
                request,
            })
            .unwrap();
        let invalidation = content.after_update(anchor, &outcome, &engine);

        let Content::Logs(panel) = &content else {
            panic!("expected log panel");
        };
        assert_eq!(panel.top_index(), 10);
        assert_eq!(invalidation, Invalidation::Both);
    }

    #[test]
    fn test_reanchor_clamps_after_eviction() {
        let mut panel = LogPanel::new(5, 1);
        let outcome = MergeOutcome {
            evicted_top: 8,
            ..MergeOutcome::default()
        };
        panel.reanchor(ScrollAnchor { top_index: 3 }, &outcome, 20);
        assert_eq!(panel.top_index(), 0);
    }
}
