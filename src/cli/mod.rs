//! Command-line surface of the chunktail binary.

pub mod print;

use chunktail::config::EngineConfig;
use clap::Parser;
use std::path::PathBuf;

/// Records printed before following when `--lines` is not given.
pub const DEFAULT_LINES: usize = 20;

#[derive(Parser, Debug)]
#[command(name = "chunktail")]
#[command(about = "Tail log files from a directory, paging older records on demand", long_about = None)]
pub struct Cli {
    /// Directory holding the log files (default: config `dir`, then the current directory)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// File to open (default: the last file by name)
    #[arg(short, long, value_name = "NAME")]
    pub file: Option<String>,

    /// Config file to use instead of discovered ones
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Records per fetch request
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Number of trailing records to print
    #[arg(short = 'n', long, value_name = "N", default_value_t = DEFAULT_LINES)]
    pub lines: usize,

    /// Keep printing records as they are appended
    #[arg(short = 'F', long)]
    pub follow: bool,

    /// List the files in the directory and exit
    #[arg(long)]
    pub list: bool,

    /// Enable debug diagnostics on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Apply flag overrides on top of the loaded config.
    pub fn apply(&self, mut config: EngineConfig) -> EngineConfig {
        if let Some(dir) = &self.dir {
            config.dir = Some(dir.clone());
        }
        if let Some(limit) = self.limit {
            config.fetch_limit = limit.max(1);
        }
        if let Some(max) = config.max_records {
            // The printed window must fit without evicting the live edge.
            config.max_records = Some(max.max(config.fetch_limit).max(self.lines));
        }
        config
    }

    pub fn dir(&self, config: &EngineConfig) -> PathBuf {
        config.dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
