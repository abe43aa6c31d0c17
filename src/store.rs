//! Ordered, gap-free chunk storage for one open file.
//!
//! Chunks are held oldest-to-newest behind `Arc`, so a [`Snapshot`] shares
//! every already-merged chunk with the store instead of copying records.

use crate::chunk::{Chunk, Direction};
use crate::error::MergeError;
use crate::notify::{EdgeVersions, ViewState};
use crate::record::{LogFile, Record};
use std::collections::VecDeque;
use std::sync::Arc;

/// Adjacent edge chunks are joined while their combined length stays at or
/// under this many records, so a stream of live pushes does not become one
/// chunk per record.
pub const COALESCE_LIMIT: usize = 64;

/// Chunks plus boundary flags and edge versions for one file.
#[derive(Debug)]
pub struct ChunkStore {
    /// Oldest chunk at the front. Never holds empty chunks.
    chunks: VecDeque<Arc<Chunk>>,
    /// Shared view handed to snapshots, rebuilt after each mutation
    view: Arc<[Arc<Chunk>]>,
    /// Total records across all chunks
    len: usize,
    reached_top: bool,
    reached_bottom: bool,
    versions: EdgeVersions,
}

impl Default for ChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkStore {
    pub fn new() -> Self {
        Self {
            chunks: VecDeque::new(),
            view: Arc::from(Vec::new()),
            len: 0,
            reached_top: false,
            reached_bottom: false,
            versions: EdgeVersions::default(),
        }
    }

    /// Start a store whose versions continue from a previous one, so that
    /// observers of the old store see both edges change.
    pub(crate) fn continuing(previous: EdgeVersions) -> Self {
        let mut store = Self::new();
        store.versions = previous;
        store.versions.bump_both();
        store
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn first_position(&self) -> Option<u64> {
        self.chunks.front().and_then(|c| c.first_position())
    }

    pub fn last_position(&self) -> Option<u64> {
        self.chunks.back().and_then(|c| c.last_position())
    }

    /// Position of the record at the given edge.
    pub fn edge_position(&self, direction: Direction) -> Option<u64> {
        match direction {
            Direction::Older => self.first_position(),
            Direction::Newer => self.last_position(),
        }
    }

    pub fn reached(&self, direction: Direction) -> bool {
        match direction {
            Direction::Older => self.reached_top,
            Direction::Newer => self.reached_bottom,
        }
    }

    pub(crate) fn set_reached(&mut self, direction: Direction, reached: bool) {
        match direction {
            Direction::Older => self.reached_top = reached,
            Direction::Newer => self.reached_bottom = reached,
        }
    }

    pub fn versions(&self) -> EdgeVersions {
        self.versions
    }

    pub(crate) fn versions_mut(&mut self) -> &mut EdgeVersions {
        &mut self.versions
    }

    pub fn view_state(&self) -> ViewState {
        ViewState {
            versions: self.versions,
            reached_top: self.reached_top,
            reached_bottom: self.reached_bottom,
        }
    }

    /// Insert a chunk at the older or newer end.
    ///
    /// The chunk must abut the edge exactly; overlap is the merge engine's
    /// job to trim before calling this. Empty chunks are ignored. Small
    /// chunks are joined into the edge chunk (see [`COALESCE_LIMIT`]).
    pub fn append(&mut self, chunk: Chunk, direction: Direction) -> Result<(), MergeError> {
        let (Some(first), Some(last)) = (chunk.first_position(), chunk.last_position()) else {
            return Ok(());
        };

        if let Some(edge) = self.edge_position(direction) {
            let abuts = match direction {
                Direction::Newer => edge.checked_add(1) == Some(first),
                Direction::Older => last.checked_add(1) == Some(edge),
            };
            if !abuts {
                return Err(MergeError::Discontinuity {
                    direction,
                    edge,
                    got: match direction {
                        Direction::Newer => first,
                        Direction::Older => last,
                    },
                });
            }
        }

        self.len += chunk.len();
        let edge_chunk = match direction {
            Direction::Newer => self.chunks.back_mut(),
            Direction::Older => self.chunks.front_mut(),
        };
        match edge_chunk {
            Some(edge) if edge.len() + chunk.len() <= COALESCE_LIMIT => {
                let joined = match direction {
                    Direction::Newer => edge.joined(&chunk),
                    Direction::Older => chunk.joined(&**edge),
                };
                *edge = Arc::new(joined);
            }
            Some(_) | None => match direction {
                Direction::Newer => self.chunks.push_back(Arc::new(chunk)),
                Direction::Older => self.chunks.push_front(Arc::new(chunk)),
            },
        }
        self.rebuild_view();
        Ok(())
    }

    /// Drop up to `amount` records from the given edge.
    ///
    /// Returns the number of records removed. Boundary flags are left alone:
    /// records evicted past a reached edge are gone for the life of the
    /// buffer.
    pub fn evict(&mut self, direction: Direction, amount: usize) -> usize {
        let mut remaining = amount.min(self.len);
        let removed = remaining;

        while remaining > 0 {
            let edge_chunk = match direction {
                Direction::Older => self.chunks.front(),
                Direction::Newer => self.chunks.back(),
            };
            let Some(chunk) = edge_chunk else { break };

            if chunk.len() <= remaining {
                remaining -= chunk.len();
                match direction {
                    Direction::Older => self.chunks.pop_front(),
                    Direction::Newer => self.chunks.pop_back(),
                };
            } else {
                let trimmed = match direction {
                    Direction::Older => chunk.drop_front(remaining),
                    Direction::Newer => chunk.drop_back(remaining),
                };
                match direction {
                    Direction::Older => self.chunks[0] = Arc::new(trimmed),
                    Direction::Newer => {
                        let last = self.chunks.len() - 1;
                        self.chunks[last] = Arc::new(trimmed);
                    }
                }
                remaining = 0;
            }
        }

        if removed > 0 {
            self.len -= removed;
            self.rebuild_view();
        }
        removed
    }

    /// Immutable view of everything currently held.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            chunks: Arc::clone(&self.view),
            len: self.len,
            state: self.view_state(),
        }
    }

    fn rebuild_view(&mut self) {
        self.view = self.chunks.iter().cloned().collect();
    }
}

/// The buffer for one open file: its identity plus its chunk store.
#[derive(Debug)]
pub struct Buffer {
    pub(crate) file: LogFile,
    pub(crate) store: ChunkStore,
}

impl Buffer {
    pub fn new(file: LogFile) -> Self {
        Self {
            file,
            store: ChunkStore::new(),
        }
    }

    /// A fresh buffer replacing `previous`: versions carry over and both bump.
    pub(crate) fn replacing(file: LogFile, previous: EdgeVersions) -> Self {
        Self {
            file,
            store: ChunkStore::continuing(previous),
        }
    }

    pub fn file(&self) -> &LogFile {
        &self.file
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }
}

/// Read-only view of a buffer at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    chunks: Arc<[Arc<Chunk>]>,
    len: usize,
    state: ViewState,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn chunks(&self) -> &[Arc<Chunk>] {
        &self.chunks
    }

    /// All records, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.chunks.iter().flat_map(|c| c.records().iter())
    }

    pub fn positions(&self) -> Vec<u64> {
        self.records().map(|r| r.position).collect()
    }

    /// Record at a buffer index (0 is the oldest held record).
    pub fn get(&self, index: usize) -> Option<&Record> {
        let mut offset = index;
        for chunk in self.chunks.iter() {
            if offset < chunk.len() {
                return chunk.records().get(offset);
            }
            offset -= chunk.len();
        }
        None
    }

    /// The last `count` records, oldest first. Only the chunks that hold
    /// them are visited.
    pub fn tail(&self, count: usize) -> impl Iterator<Item = &Record> {
        let mut remaining = count.min(self.len);
        let mut first = self.chunks.len();
        while remaining > 0 && first > 0 {
            let len = self.chunks[first - 1].len();
            if len > remaining {
                break;
            }
            remaining -= len;
            first -= 1;
        }
        // A partially needed chunk sits just before `first`.
        let (start, skip) = if remaining > 0 {
            (first - 1, self.chunks[first - 1].len() - remaining)
        } else {
            (first, 0)
        };
        self.chunks[start..]
            .iter()
            .flat_map(|c| c.records().iter())
            .skip(skip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Level;

    fn chunk(positions: std::ops::RangeInclusive<u64>) -> Chunk {
        let records = positions
            .map(|p| Record::new(p, Level::Info, format!("line {}", p)))
            .collect();
        Chunk::new("a.log", records).unwrap()
    }

    #[test]
    fn test_append_to_empty_store() {
        let mut store = ChunkStore::new();
        store.append(chunk(10..=12), Direction::Newer).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.first_position(), Some(10));
        assert_eq!(store.last_position(), Some(12));
    }

    #[test]
    fn test_append_both_edges() {
        let mut store = ChunkStore::new();
        store.append(chunk(10..=12), Direction::Newer).unwrap();
        store.append(chunk(13..=14), Direction::Newer).unwrap();
        store.append(chunk(7..=9), Direction::Older).unwrap();
        assert_eq!(store.snapshot().positions(), (7..=14).collect::<Vec<_>>());
        // Small chunks are joined at the edge.
        assert_eq!(store.chunk_count(), 1);
    }

    #[test]
    fn test_append_gap_is_discontinuity() {
        let mut store = ChunkStore::new();
        store.append(chunk(10..=12), Direction::Newer).unwrap();

        let err = store.append(chunk(15..=16), Direction::Newer).unwrap_err();
        assert_eq!(
            err,
            MergeError::Discontinuity {
                direction: Direction::Newer,
                edge: 12,
                got: 15
            }
        );

        let err = store.append(chunk(3..=5), Direction::Older).unwrap_err();
        assert_eq!(
            err,
            MergeError::Discontinuity {
                direction: Direction::Older,
                edge: 10,
                got: 5
            }
        );
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_append_empty_chunk_is_ignored() {
        let mut store = ChunkStore::new();
        store
            .append(Chunk::new("a.log", Vec::new()).unwrap(), Direction::Newer)
            .unwrap();
        assert!(store.is_empty());
        assert_eq!(store.chunk_count(), 0);
    }

    #[test]
    fn test_snapshot_is_stable_after_mutation() {
        let mut store = ChunkStore::new();
        store.append(chunk(0..=99), Direction::Newer).unwrap();
        let before = store.snapshot();

        store.append(chunk(100..=199), Direction::Newer).unwrap();
        let after = store.snapshot();

        assert_eq!(before.len(), 100);
        assert_eq!(after.len(), 200);
        assert!(Arc::ptr_eq(&before.chunks()[0], &after.chunks()[0]));
    }

    #[test]
    fn test_snapshot_get_across_chunks() {
        let mut store = ChunkStore::new();
        store.append(chunk(0..=59), Direction::Newer).unwrap();
        store.append(chunk(60..=129), Direction::Newer).unwrap();
        store.append(chunk(130..=199), Direction::Newer).unwrap();
        let snap = store.snapshot();
        assert_eq!(snap.chunks().len(), 3);
        assert_eq!(snap.get(0).map(|r| r.position), Some(0));
        assert_eq!(snap.get(61).map(|r| r.position), Some(61));
        assert!(snap.get(200).is_none());

        let tail = |n| snap.tail(n).map(|r| r.position).collect::<Vec<_>>();
        assert_eq!(tail(2), vec![198, 199]);
        assert_eq!(tail(70), (130..200).collect::<Vec<_>>());
        assert_eq!(tail(75), (125..200).collect::<Vec<_>>());
        assert_eq!(tail(500), (0..200).collect::<Vec<_>>());
        assert!(tail(0).is_empty());
    }

    #[test]
    fn test_evict_whole_and_partial_chunks() {
        let mut store = ChunkStore::new();
        store.append(chunk(0..=2), Direction::Newer).unwrap();
        store.append(chunk(3..=5), Direction::Newer).unwrap();
        store.set_reached(Direction::Older, true);

        assert_eq!(store.evict(Direction::Older, 4), 4);
        assert_eq!(store.snapshot().positions(), vec![4, 5]);
        assert!(store.reached(Direction::Older));

        assert_eq!(store.evict(Direction::Newer, 1), 1);
        assert_eq!(store.snapshot().positions(), vec![4]);
    }

    #[test]
    fn test_single_record_pushes_coalesce() {
        let mut store = ChunkStore::new();
        for position in 0..200 {
            store.append(chunk(position..=position), Direction::Newer).unwrap();
        }
        assert_eq!(store.len(), 200);
        assert_eq!(store.chunk_count(), 200usize.div_ceil(COALESCE_LIMIT));
        assert_eq!(store.snapshot().positions(), (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn test_large_chunks_stay_separate() {
        let mut store = ChunkStore::new();
        store.append(chunk(100..=199), Direction::Newer).unwrap();
        store.append(chunk(0..=99), Direction::Older).unwrap();
        store.append(chunk(200..=200), Direction::Newer).unwrap();
        assert_eq!(store.chunk_count(), 3);
    }

    #[test]
    fn test_evict_more_than_held() {
        let mut store = ChunkStore::new();
        store.append(chunk(0..=2), Direction::Newer).unwrap();
        assert_eq!(store.evict(Direction::Newer, 10), 3);
        assert!(store.is_empty());
        assert_eq!(store.chunk_count(), 0);
    }

    #[test]
    fn test_evict_nothing_keeps_flag() {
        let mut store = ChunkStore::new();
        store.set_reached(Direction::Newer, true);
        assert_eq!(store.evict(Direction::Newer, 5), 0);
        assert!(store.reached(Direction::Newer));
    }

    #[test]
    fn test_continuing_store_bumps_both_versions() {
        let previous = EdgeVersions { top: 3, bottom: 7 };
        let store = ChunkStore::continuing(previous);
        assert_eq!(store.versions(), EdgeVersions { top: 4, bottom: 8 });
        assert!(store.is_empty());
    }
}
