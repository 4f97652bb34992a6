//! Logging initialization using the `tracing` ecosystem.
//!
//! Console output is always human-readable. When a log directory is given,
//! a daily-rotating file is written as well, either as text or as one JSON
//! object per event. `RUST_LOG` overrides the configured level.
//!
//! Digests are logged on the [`DIGEST_TARGET`] target, so they can be split
//! off with a filter such as `RUST_LOG=warn,pulse::digest=info`.

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Tracing target every digest is written to.
pub const DIGEST_TARGET: &str = "pulse::digest";

/// Where and how to log.
#[derive(Debug, Clone)]
pub struct LogOptions<'a> {
    /// Default level if `RUST_LOG` is not set (e.g. `"info"`).
    pub level: &'a str,
    /// Directory for daily-rotating log files; console only when `None`.
    pub dir: Option<&'a str>,
    /// Log file prefix (e.g. `"lobby"`).
    pub file_prefix: &'a str,
    /// Write the file as JSON lines instead of text.
    pub json: bool,
}

/// Install the global tracing subscriber. Call once, at process start.
pub fn init_logging(opts: &LogOptions<'_>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(opts.level));

    let console_layer = fmt::layer().with_target(true).with_thread_ids(true).with_ansi(true);

    let file_layer = opts.dir.map(|dir| {
        let appender = tracing_appender::rolling::daily(dir, opts.file_prefix);
        let base = fmt::layer().with_writer(appender).with_ansi(false).with_target(true).with_thread_ids(true);
        if opts.json { base.json().boxed() } else { base.boxed() }
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(env_filter)
        .with(console_layer)
        .init();
}
