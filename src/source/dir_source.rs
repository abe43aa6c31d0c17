//! Log source backed by a directory of rotated log files.
//!
//! Every line of a file is one record and its position is the line index.
//! File names sort chronologically (e.g. `2024-05-01T10-00-00.log`), so the
//! last name is the live file.

use super::line_index::LineIndex;
use super::{select_range, LogSource, LogsMessage};
use crate::error::TransportError;
use crate::fetch::FetchRequest;
use crate::record::{LogFile, Record};
use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::{self, File};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct DirSource {
    dir: PathBuf,
    indexes: Mutex<HashMap<String, LineIndex>>,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, TransportError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(TransportError::Io(format!(
                "not a directory: {}",
                dir.display()
            )));
        }
        Ok(Self {
            dir,
            indexes: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of a named file, refusing names that escape the directory.
    pub fn path_of(&self, name: &str) -> Result<PathBuf, TransportError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        if !valid {
            return Err(TransportError::UnknownFile(name.to_string()));
        }
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(TransportError::UnknownFile(name.to_string()));
        }
        Ok(path)
    }

    /// Newest file by name, if any.
    pub fn latest(&self) -> Result<Option<LogFile>, TransportError> {
        Ok(self.files()?.pop())
    }

    /// Refresh the line index for `name` and read the records in `lines`,
    /// clamped by `pick` against the current line count.
    fn read_records<F>(&self, name: &str, pick: F) -> Result<LogsMessage, TransportError>
    where
        F: FnOnce(u64) -> (Range<u64>, bool),
    {
        let path = self.path_of(name)?;
        let file = File::open(&path)?;
        // Mapping a zero-length file fails on some platforms.
        let mmap = if file.metadata()?.len() == 0 {
            None
        } else {
            Some(unsafe { Mmap::map(&file)? })
        };
        let data: &[u8] = mmap.as_deref().unwrap_or(&[]);

        let (lines, boundary, span, indexed) = {
            let mut indexes = self
                .indexes
                .lock()
                .map_err(|_| TransportError::Io("line index lock poisoned".to_string()))?;
            let index = indexes.entry(name.to_string()).or_default();
            let total = index.refresh(data);
            let (lines, boundary) = pick(total);
            let span = index
                .byte_span(data, &lines)
                .ok_or_else(|| TransportError::Io(format!("line range {:?} not indexed", lines)))?;
            (lines, boundary, span, index.indexed_bytes())
        };

        let bytes = &data[span.start as usize..span.end as usize];
        let text = String::from_utf8_lossy(bytes);
        let records = text
            .split_terminator('\n')
            .zip(lines)
            .map(|(line, position)| Record::parse_line(position, line.trim_end_matches('\r')))
            .collect();

        let source = LogFile::new(name).with_cursor(indexed.to_string());
        Ok(LogsMessage::new(source, records).with_boundary(boundary))
    }
}

impl LogSource for DirSource {
    fn files(&self) -> Result<Vec<LogFile>, TransportError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            files.push(LogFile::new(name).with_cursor(metadata.len().to_string()));
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    fn fetch(&self, request: &FetchRequest) -> Result<LogsMessage, TransportError> {
        if request.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        self.read_records(&request.file.name, |total| {
            select_range(total, request.direction, request.anchor, request.limit)
        })
    }

    fn read_after(
        &self,
        file: &LogFile,
        position: Option<u64>,
        limit: usize,
    ) -> Result<LogsMessage, TransportError> {
        self.read_records(&file.name, |total| {
            select_range(total, crate::chunk::Direction::Newer, position, limit)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Direction;
    use crate::fetch::{CancelToken, RequestId};
    use crate::record::Level;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_log(dir: &TempDir, name: &str, lines: usize) {
        let mut file = File::create(dir.path().join(name)).unwrap();
        for i in 0..lines {
            writeln!(file, r#"{{"t":"t{i}","lvl":"info","msg":"line {i}"}}"#).unwrap();
        }
    }

    fn request(name: &str, direction: Direction, anchor: Option<u64>, limit: usize) -> FetchRequest {
        FetchRequest {
            id: RequestId(1),
            epoch: 0,
            file: LogFile::new(name),
            direction,
            anchor,
            limit,
            cancel: CancelToken::new(),
        }
    }

    fn positions(message: &LogsMessage) -> Vec<u64> {
        message.chunk.iter().map(|r| r.position).collect()
    }

    #[test]
    fn test_files_sorted_by_name() {
        let dir = TempDir::new().unwrap();
        write_log(&dir, "b.log", 1);
        write_log(&dir, "a.log", 1);
        fs::create_dir(dir.path().join("nested")).unwrap();

        let source = DirSource::new(dir.path()).unwrap();
        let names: Vec<String> = source.files().unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["a.log", "b.log"]);
        assert_eq!(source.latest().unwrap().unwrap().name, "b.log");
    }

    #[test]
    fn test_fetch_tail_then_older() {
        let dir = TempDir::new().unwrap();
        write_log(&dir, "app.log", 25);
        let source = DirSource::new(dir.path()).unwrap();

        let tail = source.fetch(&request("app.log", Direction::Older, None, 10)).unwrap();
        assert_eq!(positions(&tail), (15..25).collect::<Vec<_>>());
        assert!(!tail.boundary);
        assert_eq!(tail.chunk[0].message, "line 15");
        assert_eq!(tail.chunk[0].level, Level::Info);

        let older = source
            .fetch(&request("app.log", Direction::Older, Some(15), 10))
            .unwrap();
        assert_eq!(positions(&older), (5..15).collect::<Vec<_>>());

        let first = source
            .fetch(&request("app.log", Direction::Older, Some(5), 10))
            .unwrap();
        assert_eq!(positions(&first), (0..5).collect::<Vec<_>>());
        assert!(first.boundary);
    }

    #[test]
    fn test_fetch_newer_reaches_end() {
        let dir = TempDir::new().unwrap();
        write_log(&dir, "app.log", 12);
        let source = DirSource::new(dir.path()).unwrap();

        let newer = source
            .fetch(&request("app.log", Direction::Newer, Some(8), 10))
            .unwrap();
        assert_eq!(positions(&newer), vec![9, 10, 11]);
        assert!(newer.boundary);
    }

    #[test]
    fn test_cursor_is_indexed_length() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "a\nbb\npartial").unwrap();
        let source = DirSource::new(dir.path()).unwrap();

        let message = source.fetch(&request("app.log", Direction::Older, None, 10)).unwrap();
        assert_eq!(positions(&message), vec![0, 1]);
        assert_eq!(message.source.unwrap().cursor, "5");
    }

    #[test]
    fn test_read_after_sees_appended_lines() {
        let dir = TempDir::new().unwrap();
        write_log(&dir, "app.log", 3);
        let source = DirSource::new(dir.path()).unwrap();
        let file = LogFile::new("app.log");

        assert!(source.read_after(&file, Some(2), 100).unwrap().chunk.is_empty());

        let mut handle = fs::OpenOptions::new()
            .append(true)
            .open(dir.path().join("app.log"))
            .unwrap();
        writeln!(handle, "lvl=warn msg=appended").unwrap();

        let pushed = source.read_after(&file, Some(2), 100).unwrap();
        assert_eq!(positions(&pushed), vec![3]);
        assert_eq!(pushed.chunk[0].level, Level::Warn);
    }

    #[test]
    fn test_rejects_escaping_names() {
        let dir = TempDir::new().unwrap();
        let source = DirSource::new(dir.path()).unwrap();
        assert_eq!(
            source
                .fetch(&request("../etc/passwd", Direction::Older, None, 1))
                .unwrap_err(),
            TransportError::UnknownFile("../etc/passwd".to_string())
        );
        assert!(source.fetch(&request("missing.log", Direction::Older, None, 1)).is_err());
    }

    #[test]
    fn test_cancelled_request_is_not_served() {
        let dir = TempDir::new().unwrap();
        write_log(&dir, "app.log", 3);
        let source = DirSource::new(dir.path()).unwrap();
        let req = request("app.log", Direction::Older, None, 10);
        req.cancel.cancel();
        assert_eq!(source.fetch(&req).unwrap_err(), TransportError::Cancelled);
    }

    #[test]
    fn test_new_rejects_missing_dir() {
        assert!(DirSource::new("/definitely/not/a/dir").is_err());
    }
}
