mod cli;

use anyhow::{bail, Context, Result};
use chunktail::config::{self, ConfigError, EngineConfig};
use chunktail::fetch::{DirectionStatus, ThreadedTransport};
use chunktail::logging;
use chunktail::merge::MergeOutcome;
use chunktail::notify::Observer;
use chunktail::signal::Shutdown;
use chunktail::source::{DirSource, LogSource};
use chunktail::watcher::LiveTail;
use chunktail::{Direction, LogEngine, LogFile};
use clap::Parser;
use cli::print::format_record;
use cli::Cli;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const FETCH_WAIT: Duration = Duration::from_secs(5);
const FOLLOW_POLL_MS: u64 = 100;

type Engine = LogEngine<ThreadedTransport<DirSource>>;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose)?;

    let config = match load_config(&cli) {
        Ok(config) => cli.apply(config),
        Err(err) => {
            eprint!("{}", err.format_cargo_style());
            std::process::exit(1);
        }
    };

    let dir = cli.dir(&config);
    let source = Arc::new(
        DirSource::new(&dir).with_context(|| format!("Failed to open log directory {}", dir.display()))?,
    );

    if cli.list {
        for file in source.files()? {
            println!("{}", file.name);
        }
        return Ok(());
    }

    let file = match &cli.file {
        Some(name) => LogFile::new(name.as_str()),
        None => source
            .latest()?
            .with_context(|| format!("No log files in {}", dir.display()))?,
    };

    let mut engine = LogEngine::new(ThreadedTransport::new(Arc::clone(&source)), &config);
    engine.open(file.clone());
    fill_older(&mut engine, cli.lines)?;

    if let Some(snapshot) = engine.snapshot() {
        for record in snapshot.tail(cli.lines) {
            println!("{}", format_record(record));
        }
    }

    if cli.follow {
        follow(&mut engine, &source, file, &config)?;
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<EngineConfig, ConfigError> {
    match &cli.config {
        Some(path) => config::load_single_file(path),
        None => config::load(&config::discover()),
    }
}

/// Fetch older chunks until `lines` records are buffered or the file start
/// is reached.
fn fill_older(engine: &mut Engine, lines: usize) -> Result<()> {
    loop {
        engine.wait(FETCH_WAIT);
        if let DirectionStatus::Error(err) = engine.status(Direction::Older) {
            bail!("Failed to read log file: {}", err);
        }

        let state = engine.view_state();
        let buffered = engine.snapshot().map_or(0, |s| s.len());
        if buffered >= lines || state.reached_top {
            return Ok(());
        }
        if !engine.request_more(Direction::Older) && !engine.has_pending() {
            return Ok(());
        }
    }
}

/// Print appended records until a shutdown signal arrives.
fn follow(
    engine: &mut Engine,
    source: &Arc<DirSource>,
    file: LogFile,
    config: &EngineConfig,
) -> Result<()> {
    let shutdown = Shutdown::install().context("Failed to install signal handlers")?;
    let path = source.path_of(&file.name)?;
    let live = LiveTail::new(&path, Arc::clone(source), file, config.fetch_limit)
        .with_context(|| format!("Failed to watch {}", path.display()))?;

    let mut observer = Observer::new();
    observer.observe(&engine.view_state());

    // Lines appended between the initial read and the watch.
    let mut pending = match live.catch_up(engine) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::warn!(error = %err, "initial catch-up failed");
            MergeOutcome::default()
        }
    };

    while !shutdown.requested() {
        match live.poll(engine) {
            Ok(outcome) => pending.combine(&outcome),
            Err(err) => tracing::debug!(error = %err, "live push rejected"),
        }
        pending.combine(&engine.poll());

        if observer.observe(&engine.view_state()).bottom() && pending.appended > 0 {
            if let Some(snapshot) = engine.snapshot() {
                for record in snapshot.tail(pending.appended) {
                    println!("{}", format_record(record));
                }
            }
        }
        pending = MergeOutcome::default();
        thread::sleep(Duration::from_millis(FOLLOW_POLL_MS));
    }
    Ok(())
}
