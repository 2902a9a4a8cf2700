//! # FrSky Telem
//!
//! Runs the telemetry encoder against a FrSky receiver on a serial port.
//!
//! ```text
//! frsky-telem [config.toml]
//! ```
//!
//! Without a configuration file the defaults are used (passthrough on
//! `/dev/ttyS1`). The vehicle source is a static snapshot, so the link
//! carries the startup status text and idle telemetry; useful for checking
//! receiver wiring and display scripts.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use frsky_telem::config::{Config, LoggingConfig};
use frsky_telem::driver::Encoder;
use frsky_telem::serial::{LinkBuffer, TelemetrySerial};
use frsky_telem::telemetry::status_text::Severity;
use frsky_telem::telemetry::vehicle::StaticVehicle;

/// Outbound bytes the encoder may queue ahead of the UART
const LINK_BUFFER_CAPACITY: usize = 256;

/// Time between link statistics log lines
const STATS_INTERVAL_MS: u64 = 10_000;

/// Largest burst the transmit budget may save up, in bytes
const MAX_TX_BURST: u64 = 32;

/// Paces outbound bytes to what the UART can carry
///
/// Credit is kept in thousandths of a byte so that slow links (9600 baud at
/// a 1 kHz tick is 0.96 bytes per tick) do not round down to nothing.
#[derive(Debug)]
struct TxBudget {
    credit_per_tick: u64,
    credit: u64,
}

impl TxBudget {
    fn new(baud_rate: u32, tick_rate_hz: u32) -> Self {
        // 8N1: ten bits on the wire per byte
        let bytes_per_sec = u64::from(baud_rate) / 10;
        Self {
            credit_per_tick: bytes_per_sec * 1000 / u64::from(tick_rate_hz.max(1)),
            credit: 0,
        }
    }

    /// Add one tick's worth of credit and return the whole bytes available
    fn refill(&mut self) -> usize {
        self.credit = (self.credit + self.credit_per_tick).min(MAX_TX_BURST * 1000);
        (self.credit / 1000) as usize
    }

    fn spend(&mut self, bytes: usize) {
        self.credit = self.credit.saturating_sub(bytes as u64 * 1000);
    }
}

/// Install the stderr subscriber and, if configured, a file layer
///
/// The returned guard flushes the file writer when dropped.
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let registry = tracing_subscriber::registry().with(filter).with(fmt::layer());

    match &config.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("logging.file has no file name: {}", path.display()))?;

            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Ok(Some(guard))
        }
        None => {
            registry.init();
            Ok(None)
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config(std::env::args().nth(1).map(PathBuf::from))?;
    let _log_guard = init_logging(&config.logging)?;

    info!("FrSky Telem v{} starting...", env!("CARGO_PKG_VERSION"));

    let protocol = config.telemetry.protocol;
    let baud_rate = config.baud_rate();
    let tick_rate_hz = config.telemetry.tick_rate_hz;

    let mut serial = TelemetrySerial::open(&config.serial.port, baud_rate)?;
    let mut encoder = Encoder::new(
        LinkBuffer::new(LINK_BUFFER_CAPACITY),
        protocol,
        StaticVehicle::default(),
        &config,
    )?;
    encoder.enqueue_status(
        &format!("frsky-telem v{}", env!("CARGO_PKG_VERSION")),
        Severity::Info,
    );

    let mut ticker = interval(Duration::from_micros(1_000_000 / u64::from(tick_rate_hz)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut budget = TxBudget::new(baud_rate, tick_rate_hz);
    let mut rx_buf = [0u8; 64];

    let start = Instant::now();
    let mut last_stats_ms = 0;

    info!(
        "Sending {} telemetry on {} at {} baud, {}Hz tick",
        protocol,
        serial.device_path(),
        baud_rate,
        tick_rate_hz
    );
    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now_ms = start.elapsed().as_millis() as u64;
                encoder.tick(now_ms);

                let allowance = budget.refill();
                let out = encoder.transport_mut().take_outbound_up_to(allowance);
                if !out.is_empty() {
                    budget.spend(out.len());
                    if let Err(e) = serial.send(&out).await {
                        debug!("Failed to send telemetry: {}", e);
                    }
                }

                if now_ms - last_stats_ms >= STATS_INTERVAL_MS {
                    info!(
                        "Link: {} frames, {} bytes sent, {} bytes received",
                        encoder.frames_sent(),
                        serial.bytes_sent(),
                        serial.bytes_received()
                    );
                    last_stats_ms = now_ms;
                }
            }

            // Polls from the receiver (S.Port only)
            result = serial.receive(&mut rx_buf) => {
                match result {
                    Ok(count) => encoder.transport_mut().push_inbound(&rx_buf[..count]),
                    Err(e) => warn!("Serial read failed: {}", e),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!(
                    "Total: {} frames, {} bytes sent",
                    encoder.frames_sent(),
                    serial.bytes_sent()
                );
                break;
            }
        }
    }

    Ok(())
}
