use memchr::memchr_iter;
use std::ops::Range;

/// Lines between checkpoints when none is given.
pub const DEFAULT_INTERVAL: u64 = 1024;

/// Sparse index of complete lines in a growing file.
///
/// Only every `interval`-th line start is stored, so memory is
/// O(lines / interval). Other line starts are found by scanning forward from
/// the nearest checkpoint. Only newline-terminated lines are indexed, so a
/// line still being written is never served half-finished. The index extends
/// incrementally as the file grows and rebuilds when the file shrinks
/// (truncation or rotation).
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// checkpoints[k] = byte offset where line `k * interval` starts
    checkpoints: Vec<u64>,
    interval: u64,
    /// Complete lines seen so far
    lines: u64,
    /// End of the last complete line
    indexed_bytes: u64,
}

impl Default for LineIndex {
    fn default() -> Self {
        Self::with_interval(DEFAULT_INTERVAL)
    }
}

impl LineIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(interval: u64) -> Self {
        Self {
            checkpoints: vec![0],
            interval: interval.max(1),
            lines: 0,
            indexed_bytes: 0,
        }
    }

    /// Number of complete lines indexed.
    pub fn len(&self) -> u64 {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines == 0
    }

    /// Byte length covered by complete lines.
    pub fn indexed_bytes(&self) -> u64 {
        self.indexed_bytes
    }

    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    /// Scan bytes appended since the last refresh. `data` is the whole file.
    /// Returns the new line count.
    pub fn refresh(&mut self, data: &[u8]) -> u64 {
        if (data.len() as u64) < self.indexed_bytes {
            *self = Self::with_interval(self.interval);
        }

        let from = self.indexed_bytes;
        for newline in memchr_iter(b'\n', &data[from as usize..]) {
            self.lines += 1;
            self.indexed_bytes = from + newline as u64 + 1;
            if self.lines % self.interval == 0 {
                self.checkpoints.push(self.indexed_bytes);
            }
        }
        self.lines
    }

    /// Byte span of a range of lines in `data`, newline terminators
    /// included. `data` must be the buffer last passed to `refresh`, or a
    /// longer one.
    pub fn byte_span(&self, data: &[u8], lines: &Range<u64>) -> Option<Range<u64>> {
        if lines.start > lines.end || lines.end > self.lines {
            return None;
        }
        let start = self.locate(data, lines.start)?;
        let end = Self::skip_lines(data, start, lines.end - lines.start, self.indexed_bytes)?;
        Some(start..end)
    }

    /// Byte offset where `line` starts.
    fn locate(&self, data: &[u8], line: u64) -> Option<u64> {
        if line == self.lines {
            return Some(self.indexed_bytes);
        }
        let slot = (line / self.interval) as usize;
        let checkpoint = *self.checkpoints.get(slot)?;
        Self::skip_lines(data, checkpoint, line % self.interval, self.indexed_bytes)
    }

    /// Offset just past the `count`-th newline at or after `from`.
    fn skip_lines(data: &[u8], from: u64, count: u64, limit: u64) -> Option<u64> {
        if count == 0 {
            return Some(from);
        }
        let window = data.get(from as usize..limit as usize)?;
        memchr_iter(b'\n', window)
            .nth(count as usize - 1)
            .map(|pos| from + pos as u64 + 1)
    }
}
