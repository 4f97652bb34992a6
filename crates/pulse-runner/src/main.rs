//! # pulse-runner
//!
//! Standalone entry point for the pulse sampler.
//!
//! Loads a JSON configuration file, wires the sampler to in-memory session,
//! connection and delay registries plus the probes of this process, and
//! writes one digest per interval until Ctrl+C (or the configured tick limit).
//! Servers embedding the sampler do the same wiring with their own registries.
//!
//! # Usage
//!
//! ```bash
//! pulse-runner config.json --log-level info
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use pulse_core::registry::{ConnectionTable, DelayRecorder, SessionTable};
use pulse_core::TracingSink;
use pulse_core::logging::LogOptions;
use pulse_sampler::buffer::BroadcastBacklog;
use pulse_sampler::host::ProcessHost;
use pulse_sampler::{Sampler, Sources};
use tracing::{error, info};

/// Periodic runtime-observability sampler.
#[derive(Parser)]
#[command(name = "pulse-runner", about = "Periodic runtime-observability sampler")]
struct Cli {
    /// Configuration file path (JSON).
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output. Overrides the config file.
    #[arg(long)]
    log_dir: Option<String>,

    /// Seconds between digests. Overrides the config file.
    #[arg(long)]
    interval_sec: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration (needed for the log file prefix)
    let config = pulse_core::config::load_config(&cli.config)?;
    let log_dir = cli.log_dir.clone().or_else(|| config.log_path());

    // 2. Initialize logging
    let module_name = config.module_name();
    pulse_core::logging::init_logging(&LogOptions {
        level: &cli.log_level,
        dir: log_dir.as_deref(),
        file_prefix: &module_name,
        json: config.log_json(),
    });

    let mut sampler_cfg = config.sampler();
    if let Some(secs) = cli.interval_sec {
        anyhow::ensure!(secs > 0, "--interval-sec must be greater than zero");
        sampler_cfg.interval_sec = Some(secs);
    }
    let interval: Duration = sampler_cfg.effective_interval();
    let capacity = config.outbound().effective_capacity();

    info!(
        "pulse-runner starting — config={}, interval={interval:?}, outbound_capacity={capacity}",
        cli.config.display(),
    );

    // 3. Wire sources
    let (outbound, _outbound_rx) = BroadcastBacklog::<String>::channel(capacity);
    let host = ProcessHost::new();
    info!("counter sources: {:?}", host.counter_names());

    let sources = Sources::new(
        Arc::new(DelayRecorder::new()),
        Arc::new(SessionTable::new()),
        Arc::new(ConnectionTable::new()),
        Arc::new(outbound),
        Arc::new(host),
    );

    // 4. Start the sampler
    let handle = Sampler::new(sources, Arc::new(TracingSink)).with_config(&sampler_cfg).start(interval);

    if let Some(max) = sampler_cfg.max_ticks {
        info!("running until {max} tick(s) or Ctrl+C");
    } else {
        info!("running — press Ctrl+C to stop");
    }

    // 5. Wait for shutdown signal or the tick limit
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(e) => error!("cannot listen for Ctrl+C, stopping: {e}"),
        }
    };

    match handle.stop_on(shutdown).await {
        Ok(n) => info!("sampler stopped after {n} tick(s) — goodbye"),
        Err(e) => error!("sampler did not stop cleanly: {e}"),
    }
    Ok(())
}
