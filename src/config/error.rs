//! Config error types for chunktail.
//!
//! Provides cargo-style error messages with file locations and typo suggestions.

use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::config::types::KNOWN_FIELDS;

static UNKNOWN_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"unknown field `([^`]+)`").expect("unknown-field regex must compile"));

static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"line (\d+),? column (\d+)").expect("location regex must compile")
});

/// Error loading or parsing a config file.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading the config file.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// YAML parse error.
    Parse {
        path: PathBuf,
        message: String,
        line: Option<usize>,
        column: Option<usize>,
        suggestion: Option<String>,
    },

    /// Semantic error after parsing.
    Validation { path: PathBuf, message: String },
}

/// Closest known field name to `unknown`, if any is close enough.
pub fn suggest_field(unknown: &str) -> Option<String> {
    KNOWN_FIELDS
        .iter()
        .map(|known| (known, strsim::jaro_winkler(unknown, known)))
        .filter(|(_, score)| *score >= 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(known, _)| known.to_string())
}

impl ConfigError {
    /// Build a parse error from a deserializer message, pulling out the
    /// location and suggesting a fix for unknown fields.
    pub fn parse(path: PathBuf, message: impl Into<String>) -> Self {
        let message = message.into();
        let (line, column) = LOCATION_RE
            .captures(&message)
            .map(|caps| (caps[1].parse().ok(), caps[2].parse().ok()))
            .unwrap_or((None, None));
        let suggestion = UNKNOWN_FIELD_RE
            .captures(&message)
            .and_then(|caps| suggest_field(&caps[1]));
        ConfigError::Parse {
            path,
            message,
            line,
            column,
            suggestion,
        }
    }

    fn path(&self) -> &Path {
        match self {
            ConfigError::Io { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Validation { path, .. } => path,
        }
    }

    /// `path[:line[:column]]` of the offending spot.
    fn location(&self) -> String {
        let path = self.path().display();
        match self {
            ConfigError::Parse {
                line: Some(line),
                column: Some(column),
                ..
            } => format!("{path}:{line}:{column}"),
            ConfigError::Parse {
                line: Some(line), ..
            } => format!("{path}:{line}"),
            _ => path.to_string(),
        }
    }

    /// Render the error the way cargo reports manifest problems.
    pub fn format_cargo_style(&self) -> String {
        let (headline, note) = match self {
            ConfigError::Io { source, .. } => {
                ("cannot read config file".to_string(), Some(source.to_string()))
            }
            ConfigError::Parse {
                message,
                suggestion,
                ..
            } => (
                message.clone(),
                suggestion
                    .as_ref()
                    .map(|field| format!("help: did you mean `{field}`?")),
            ),
            ConfigError::Validation { message, .. } => (message.clone(), None),
        };

        let mut out = format!("error: {headline}\n  --> {}\n  |\n", self.location());
        if let Some(note) = note {
            out.push_str(&format!("  = {note}\n"));
        }
        out
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_cargo_style())
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
