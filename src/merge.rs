//! Splices fetched chunks into a [`ChunkStore`].
//!
//! Overlap is resolved by record position, never by content. Each merge bumps
//! the version of the edge it changed exactly once, and reports how many
//! records moved at each edge so callers can keep a viewport anchored.

use crate::chunk::{Chunk, Direction};
use crate::error::MergeError;
use crate::notify::Invalidation;
use crate::store::ChunkStore;

/// What the originating request said about a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeInput {
    /// Edge the chunk was fetched for.
    pub direction: Direction,
    /// Maximum records the request asked for.
    pub limit: usize,
    /// Explicit end-of-data signal from the source.
    pub boundary: bool,
    /// The request had no anchor: it read from the file's far edge
    /// (`Older` from the live end, `Newer` from the start).
    pub unanchored: bool,
}

impl MergeInput {
    pub fn new(direction: Direction, limit: usize) -> Self {
        Self {
            direction,
            limit,
            boundary: false,
            unanchored: false,
        }
    }
}

/// Record counts moved by one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub prepended: usize,
    pub appended: usize,
    pub evicted_top: usize,
    pub evicted_bottom: usize,
}

impl MergeOutcome {
    pub fn top_changed(&self) -> bool {
        self.prepended > 0 || self.evicted_top > 0
    }

    pub fn bottom_changed(&self) -> bool {
        self.appended > 0 || self.evicted_bottom > 0
    }

    pub fn is_noop(&self) -> bool {
        !self.top_changed() && !self.bottom_changed()
    }

    pub fn invalidation(&self) -> Invalidation {
        Invalidation::from_flags(self.top_changed(), self.bottom_changed())
    }

    /// Net change in the index of a record that was already held.
    pub fn index_shift(&self) -> isize {
        self.prepended as isize - self.evicted_top as isize
    }

    /// Accumulate another merge's counts into this one.
    pub fn combine(&mut self, other: &MergeOutcome) {
        self.prepended += other.prepended;
        self.appended += other.appended;
        self.evicted_top += other.evicted_top;
        self.evicted_bottom += other.evicted_bottom;
    }

    fn added(&mut self, direction: Direction, count: usize) {
        match direction {
            Direction::Older => self.prepended += count,
            Direction::Newer => self.appended += count,
        }
    }

    fn evicted(&mut self, direction: Direction, count: usize) {
        match direction {
            Direction::Older => self.evicted_top += count,
            Direction::Newer => self.evicted_bottom += count,
        }
    }
}

/// Merge policy for one engine instance.
#[derive(Debug, Clone, Copy)]
pub struct MergeEngine {
    max_records: Option<usize>,
}

impl MergeEngine {
    pub fn new(max_records: Option<usize>) -> Self {
        Self { max_records }
    }

    pub fn max_records(&self) -> Option<usize> {
        self.max_records
    }

    /// The store holds as many records as the memory bound allows.
    pub fn is_full(&self, store: &ChunkStore) -> bool {
        self.max_records.is_some_and(|max| store.len() >= max)
    }

    /// Merge a fetched chunk at the edge named by `input`.
    ///
    /// On error the store is left untouched.
    pub fn merge(
        &self,
        store: &mut ChunkStore,
        chunk: Chunk,
        input: &MergeInput,
    ) -> Result<MergeOutcome, MergeError> {
        let direction = input.direction;
        let received = chunk.len();
        let was_empty = store.is_empty();
        let mut outcome = MergeOutcome::default();

        if was_empty {
            if received > 0 {
                store.append(chunk, direction)?;
                outcome.added(direction, received);
                store.versions_mut().bump_both();
            }
        } else {
            let added = Self::splice(store, chunk, direction)?;
            if added > 0 {
                outcome.added(direction, added);
                store.versions_mut().bump(direction);
            }
        }

        // Transient empty replies without a boundary signal change nothing.
        if input.boundary || received > 0 {
            if input.boundary || received < input.limit {
                store.set_reached(direction, true);
            }
            if input.unanchored && was_empty {
                store.set_reached(direction.opposite(), true);
            }
        }

        Ok(outcome)
    }

    /// Append records pushed by the source outside any request.
    ///
    /// Only applies while the live edge is held (`reached_bottom`). A push
    /// that leaves a gap is rejected with the store untouched; the pusher
    /// resumes from the newest held position.
    pub fn merge_live(
        &self,
        store: &mut ChunkStore,
        chunk: Chunk,
    ) -> Result<MergeOutcome, MergeError> {
        let mut outcome = MergeOutcome::default();
        if !store.reached(Direction::Newer) || chunk.is_empty() {
            return Ok(outcome);
        }

        let added = if store.is_empty() {
            let count = chunk.len();
            store.append(chunk, Direction::Newer)?;
            count
        } else {
            Self::splice(store, chunk, Direction::Newer)?
        };

        if added > 0 {
            outcome.added(Direction::Newer, added);
            store.versions_mut().bump(Direction::Newer);
        }
        Ok(outcome)
    }

    /// Evict until the store fits the memory bound.
    ///
    /// Records go from the edge opposite `grown`, except that a held live
    /// edge is never evicted: the oldest records go instead. Boundary flags
    /// are not touched. Skipped while the edge to evict has a request in
    /// flight, so eviction never races a pending merge at that edge.
    pub fn enforce_limit(
        &self,
        store: &mut ChunkStore,
        grown: Direction,
        in_flight: impl Fn(Direction) -> bool,
        outcome: &mut MergeOutcome,
    ) {
        let Some(max) = self.max_records else { return };
        if store.len() <= max {
            return;
        }

        let edge = if store.reached(Direction::Newer) {
            Direction::Older
        } else {
            grown.opposite()
        };
        if in_flight(edge) {
            return;
        }
        let removed = store.evict(edge, store.len() - max);
        if removed > 0 {
            outcome.evicted(edge, removed);
            store.versions_mut().bump(edge);
        }
    }

    /// Trim overlap against a non-empty store and append the remainder.
    /// Returns the number of records added.
    fn splice(
        store: &mut ChunkStore,
        chunk: Chunk,
        direction: Direction,
    ) -> Result<usize, MergeError> {
        let (Some(first), Some(last)) = (chunk.first_position(), chunk.last_position()) else {
            return Ok(0);
        };
        let Some(edge) = store.edge_position(direction) else {
            return Ok(0);
        };

        let trimmed = match direction {
            Direction::Newer => {
                if first > edge.saturating_add(1) {
                    return Err(MergeError::Discontinuity {
                        direction,
                        edge,
                        got: first,
                    });
                }
                chunk.retain_after(edge)
            }
            Direction::Older => {
                if last.saturating_add(1) < edge {
                    return Err(MergeError::Discontinuity {
                        direction,
                        edge,
                        got: last,
                    });
                }
                chunk.retain_before(edge)
            }
        };

        let added = trimmed.len();
        store.append(trimmed, direction)?;
        Ok(added)
    }
}
