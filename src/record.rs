//! Structured log records and the files they come from.
//!
//! A record is identified by its owning file and its intra-file position,
//! never by content: the same line can legitimately repeat.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Logfmt `key=value` pairs, values optionally double-quoted with `\` escapes.
static LOGFMT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][A-Za-z0-9_.\-]*)=("(?:[^"\\]|\\.)*"|\S*)"#)
        .expect("logfmt regex must compile")
});

/// CSI and simple two-byte ANSI escapes, as emitted by colored terminal loggers.
static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b[^\[\]()0-9]").expect("ANSI regex must compile")
});

/// Severity of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Crit,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    #[default]
    Unknown,
}

impl Level {
    /// Parse the usual level spellings, case-insensitively.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "crit" | "critical" | "fatal" => Level::Crit,
            "eror" | "error" | "err" => Level::Error,
            "warn" | "warning" => Level::Warn,
            "info" => Level::Info,
            "dbug" | "debug" => Level::Debug,
            "trce" | "trace" => Level::Trace,
            other => other
                .parse::<u64>()
                .map(Level::from_verbosity)
                .unwrap_or(Level::Unknown),
        }
    }

    /// Numeric verbosity: 0 is critical, 5 is trace.
    pub fn from_verbosity(v: u64) -> Self {
        match v {
            0 => Level::Crit,
            1 => Level::Error,
            2 => Level::Warn,
            3 => Level::Info,
            4 => Level::Debug,
            5 => Level::Trace,
            _ => Level::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Crit => "crit",
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "trace",
            Level::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawLevel {
            Name(String),
            Verbosity(u64),
        }

        Ok(match RawLevel::deserialize(deserializer)? {
            RawLevel::Name(name) => Level::parse(&name),
            RawLevel::Verbosity(v) => Level::from_verbosity(v),
        })
    }
}

/// A log file being tailed. Both fields are opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogFile {
    /// Source-defined identifier of the file.
    pub name: String,
    /// Source-defined "last read point" for the file.
    #[serde(default)]
    pub cursor: String,
}

impl LogFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cursor: String::new(),
        }
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = cursor.into();
        self
    }

    /// Two handles refer to the same file regardless of cursor.
    pub fn same_file(&self, other: &LogFile) -> bool {
        self.name == other.name
    }
}

/// Stable identity of a record: owning file plus intra-file position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId<'a> {
    pub file: &'a str,
    pub position: u64,
}

/// One log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "pos")]
    pub position: u64,
    #[serde(rename = "t", default)]
    pub timestamp: String,
    #[serde(rename = "lvl", default)]
    pub level: Level,
    #[serde(rename = "msg", default)]
    pub message: String,
    /// Alternating key and value fragments, in source order.
    #[serde(rename = "ctx", default)]
    pub context: Vec<String>,
}

impl Record {
    pub fn new(position: u64, level: Level, message: impl Into<String>) -> Self {
        Self {
            position,
            timestamp: String::new(),
            level,
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn id<'a>(&self, file: &'a str) -> RecordId<'a> {
        RecordId {
            file,
            position: self.position,
        }
    }

    /// Key/value pairs from the context fragments. A trailing key without a
    /// value is paired with an empty string.
    pub fn context_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.context
            .chunks(2)
            .map(|pair| (pair[0].as_str(), pair.get(1).map_or("", |v| v.as_str())))
    }

    /// Build a record from one raw source line.
    ///
    /// JSON objects and logfmt lines yield structured fields. Anything else
    /// becomes an `Unknown`-level record carrying the line, stripped of ANSI
    /// escapes, as its message.
    pub fn parse_line(position: u64, line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.starts_with('{') {
            if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(trimmed) {
                return Self::from_json(position, map);
            }
        }
        if let Some(record) = Self::from_logfmt(position, trimmed) {
            return record;
        }
        Record::new(position, Level::Unknown, ANSI_RE.replace_all(line, ""))
    }

    fn from_json(position: u64, map: serde_json::Map<String, serde_json::Value>) -> Self {
        let mut record = Record::new(position, Level::Unknown, "");
        for (key, value) in map {
            let text = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            match key.as_str() {
                "t" | "time" | "ts" | "timestamp" => record.timestamp = text,
                "lvl" | "level" | "severity" => record.level = Level::parse(&text),
                "msg" | "message" => record.message = text,
                _ => {
                    record.context.push(key);
                    record.context.push(text);
                }
            }
        }
        record
    }

    fn from_logfmt(position: u64, line: &str) -> Option<Self> {
        let mut record = Record::new(position, Level::Unknown, "");
        let mut structured = false;
        for caps in LOGFMT_RE.captures_iter(line) {
            let key = &caps[1];
            let raw = &caps[2];
            let value = match raw.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
                Some(quoted) => quoted.replace("\\\"", "\"").replace("\\\\", "\\"),
                None => raw.to_string(),
            };
            match key {
                "t" | "time" | "ts" => record.timestamp = value,
                "lvl" | "level" => {
                    record.level = Level::parse(&value);
                    structured = true;
                }
                "msg" | "message" => {
                    record.message = value;
                    structured = true;
                }
                _ => {
                    record.context.push(key.to_string());
                    record.context.push(value);
                }
            }
        }
        structured.then_some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_spellings() {
        assert_eq!(Level::parse("EROR"), Level::Error);
        assert_eq!(Level::parse("warning"), Level::Warn);
        assert_eq!(Level::parse("dbug"), Level::Debug);
        assert_eq!(Level::parse("3"), Level::Info);
        assert_eq!(Level::parse("loud"), Level::Unknown);
    }

    #[test]
    fn test_level_deserializes_from_name_or_number() {
        let levels: Vec<Level> = serde_json::from_str(r#"["info", 1, "trce"]"#).unwrap();
        assert_eq!(levels, vec![Level::Info, Level::Error, Level::Trace]);
    }

    #[test]
    fn test_record_wire_names() {
        let json = r#"{"pos":7,"t":"2020-01-01T00:00:00Z","lvl":"warn","msg":"low peers","ctx":["count","2"]}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.position, 7);
        assert_eq!(record.level, Level::Warn);
        assert_eq!(record.message, "low peers");
        assert_eq!(record.context_pairs().collect::<Vec<_>>(), vec![("count", "2")]);
    }

    #[test]
    fn test_parse_json_line() {
        let record = Record::parse_line(
            3,
            r#"{"t":"12:00","lvl":"info","msg":"Imported block","number":42}"#,
        );
        assert_eq!(record.position, 3);
        assert_eq!(record.timestamp, "12:00");
        assert_eq!(record.level, Level::Info);
        assert_eq!(record.message, "Imported block");
        assert_eq!(record.context, vec!["number", "42"]);
    }

    #[test]
    fn test_parse_logfmt_line() {
        let record = Record::parse_line(
            0,
            r#"t=12:00 lvl=eror msg="peer dropped \"bad\"" peer=abc"#,
        );
        assert_eq!(record.level, Level::Error);
        assert_eq!(record.message, r#"peer dropped "bad""#);
        assert_eq!(record.context, vec!["peer", "abc"]);
    }

    #[test]
    fn test_parse_plain_line_strips_ansi() {
        let record = Record::parse_line(9, "\x1b[32mINFO\x1b[0m started");
        assert_eq!(record.level, Level::Unknown);
        assert_eq!(record.message, "INFO started");
        assert_eq!(record.position, 9);
    }

    #[test]
    fn test_logfmt_without_level_or_message_is_plain() {
        let record = Record::parse_line(0, "a=1 b=2");
        assert_eq!(record.level, Level::Unknown);
        assert_eq!(record.message, "a=1 b=2");
        assert!(record.context.is_empty());
    }

    #[test]
    fn test_same_file_ignores_cursor() {
        let a = LogFile::new("a.log").with_cursor("10");
        let b = LogFile::new("a.log").with_cursor("99");
        assert!(a.same_file(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_record_identity_is_position_not_content() {
        let a = Record::new(1, Level::Info, "same");
        let b = Record::new(2, Level::Info, "same");
        assert_ne!(a.id("f.log"), b.id("f.log"));
    }
}
