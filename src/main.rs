//! # LaCrosse Gateway
//!
//! Replays a recorded 868 MHz radio capture through the gateway core and
//! forwards the decoded sensor lines to the host.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load and validate the TOML configuration
//!    - Set up logging (stderr, optionally a daily-rotated file)
//!    - Open the capture replay radio and the host link
//!
//! 2. **Main Loop**
//!    - Poll the gateway every few milliseconds and send its lines
//!    - Log the counters once a minute
//!    - Handle Ctrl+C for graceful shutdown
//!
//! # Examples
//!
//! ```bash
//! cargo run --release -- config/default.toml
//! ```

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use lacrosse_gateway::clock::SystemClock;
use lacrosse_gateway::config::{Config, LoggingConfig};
use lacrosse_gateway::gateway::Gateway;
use lacrosse_gateway::host;
use lacrosse_gateway::radio::replay::ReplayRadio;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Gateway poll period
const POLL_PERIOD_MS: u64 = 5;

/// Period of the counter summary in the log
const STATS_PERIOD_S: u64 = 60;

/// Install the tracing subscriber
///
/// The returned guard flushes the log file and must live until exit.
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level: tracing::Level = config
        .level
        .parse()
        .map_err(|_| anyhow!("invalid log level '{}'", config.level))?;
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let (file_layer, guard) = if config.file.is_empty() {
        (None, None)
    } else {
        let path = Path::new(&config.file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| anyhow!("invalid log file '{}'", config.file))?;

        let appender = tracing_appender::rolling::daily(dir, name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (
            Some(fmt::layer().with_writer(writer).with_ansi(false)),
            Some(guard),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path))?;

    let _log_guard = init_logging(&config.logging)?;
    info!("LaCrosse Gateway v{} starting...", env!("CARGO_PKG_VERSION"));

    let radio = ReplayRadio::open(&config.radio.capture_file, SystemClock::new())?;
    let mut link = host::open(&config.output)?;
    info!("Host link: {}", link.name());

    let mut gateway = Gateway::new(radio, SystemClock::new(), &config);

    let mut poll_interval = interval(Duration::from_millis(POLL_PERIOD_MS));
    poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stats_interval = interval(Duration::from_secs(STATS_PERIOD_S));
    stats_interval.tick().await;

    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = poll_interval.tick() => {
                if let Err(e) = gateway.forward(link.as_mut()).await {
                    warn!("Failed to forward lines: {}", e);
                }

                if gateway.radio().remaining() == 0 && !config.transmitter.enabled {
                    info!("Capture replay finished");
                    break;
                }
            }

            _ = stats_interval.tick() => {
                gateway.log_stats();
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    gateway.log_stats();
    Ok(())
}
