//! Diagnostics setup for the binary.
//!
//! The library only emits `tracing` events. This installs the subscriber that
//! prints them, on stderr so stdout carries nothing but log records.

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is unset.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "chunktail=debug,warn"
    } else {
        "warn"
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(verbose)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_level(true);

    tracing::subscriber::set_global_default(Registry::default().with(env_filter).with(fmt_layer))?;
    Ok(())
}
