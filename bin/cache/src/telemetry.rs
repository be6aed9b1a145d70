//! Logging setup.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// Installs a global fmt subscriber.
///
/// `verbosity` counts `-v` flags: none logs warnings and errors, `-v` adds info, `-vv` debug and
/// `-vvv` or more trace. Directives in `RUST_LOG` take precedence over the verbosity level.
pub fn init_tracing_subscriber(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("Failed to install tracing subscriber: {err}"))
}
