use crate::error::MergeError;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which edge of the buffer a fetch or merge targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Toward the start of the file (the top edge).
    Older,
    /// Toward the live end of the file (the bottom edge).
    Newer,
}

impl Direction {
    pub const BOTH: [Direction; 2] = [Direction::Older, Direction::Newer];

    pub fn opposite(self) -> Self {
        match self {
            Direction::Older => Direction::Newer,
            Direction::Newer => Direction::Older,
        }
    }

    /// Slot index for per-direction tables.
    pub(crate) fn index(self) -> usize {
        match self {
            Direction::Older => 0,
            Direction::Newer => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Older => f.write_str("older"),
            Direction::Newer => f.write_str("newer"),
        }
    }
}

/// A block of consecutive records from one file.
///
/// Records are strictly increasing by position. Chunks are immutable once
/// built; the store shares them behind `Arc` between snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    file: String,
    records: Vec<Record>,
}

impl Chunk {
    /// Build a chunk, rejecting records that are not strictly increasing.
    pub fn new(file: impl Into<String>, records: Vec<Record>) -> Result<Self, MergeError> {
        if let Some(pair) = records
            .windows(2)
            .find(|pair| pair[1].position <= pair[0].position)
        {
            return Err(MergeError::Unordered {
                position: pair[1].position,
            });
        }
        Ok(Self {
            file: file.into(),
            records,
        })
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_position(&self) -> Option<u64> {
        self.records.first().map(|r| r.position)
    }

    pub fn last_position(&self) -> Option<u64> {
        self.records.last().map(|r| r.position)
    }

    /// Keep only records strictly before `position`.
    pub(crate) fn retain_before(self, position: u64) -> Self {
        let cut = self.records.partition_point(|r| r.position < position);
        let mut records = self.records;
        records.truncate(cut);
        Self {
            file: self.file,
            records,
        }
    }

    /// Keep only records strictly after `position`.
    pub(crate) fn retain_after(self, position: u64) -> Self {
        let cut = self.records.partition_point(|r| r.position <= position);
        let mut records = self.records;
        records.drain(..cut);
        Self {
            file: self.file,
            records,
        }
    }

    /// Split off the last `count` records, keeping the front.
    pub(crate) fn drop_back(&self, count: usize) -> Self {
        let keep = self.records.len().saturating_sub(count);
        Self {
            file: self.file.clone(),
            records: self.records[..keep].to_vec(),
        }
    }

    /// Split off the first `count` records, keeping the back.
    pub(crate) fn drop_front(&self, count: usize) -> Self {
        let start = count.min(self.records.len());
        Self {
            file: self.file.clone(),
            records: self.records[start..].to_vec(),
        }
    }

    /// `self` followed by `next`. The caller has checked that `next` starts
    /// after `self` ends.
    pub(crate) fn joined(&self, next: &Chunk) -> Self {
        let mut records = Vec::with_capacity(self.len() + next.len());
        records.extend_from_slice(&self.records);
        records.extend_from_slice(&next.records);
        Self {
            file: self.file.clone(),
            records,
        }
    }
}
