//! Sensor exporter on Linux.
//!
//! Runs the same exporter loop as the firmware against simulated Wi-Fi and
//! sensors, serving metrics on a local port.
//!
//! Environment:
//! - `EXPORTER_PORT` - listen port (default 8080)
//! - `EXPORTER_TZ` - IANA timezone for the `X-DateTime` header (default Europe/Madrid)
//! - `RUST_LOG` - log filter

mod sim;

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use chrono_tz::Tz;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sensor_exporter_core::{ExporterConfig, StdDelay};
use sensor_exporter_server::{Exporter, TcpTransport};

use crate::sim::{SimulatedSensors, SimulatedWifi, SystemClock};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_ZONE: &str = "Europe/Madrid";

/// Chance that the simulated shock input reads high on a given poll.
const SHOCK_PROBABILITY: f64 = 0.001;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,sensor_exporter_server=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Sensor exporter starting...");

    let port = match std::env::var("EXPORTER_PORT") {
        Ok(port) => port.parse().context("EXPORTER_PORT must be a port number")?,
        Err(_) => DEFAULT_PORT,
    };
    let zone: Tz = std::env::var("EXPORTER_TZ")
        .unwrap_or_else(|_| DEFAULT_ZONE.to_string())
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid EXPORTER_TZ: {}", e))?;

    let config = ExporterConfig {
        http_port: port,
        ..ExporterConfig::with_credentials("SimulatedNet", "")
    };
    tracing::debug!("Configuration: {}", serde_json::to_string(&config)?);

    let listener = TcpTransport::new(
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.http_port)),
        config.read_timeout,
    );

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    let mut handle = tokio::task::spawn_blocking(move || {
        let mut exporter = Exporter::new(
            config,
            SimulatedWifi::new(),
            StdDelay,
            SystemClock::new(zone),
            SimulatedSensors::new(SHOCK_PROBABILITY),
            listener,
        );
        exporter.run_until(&stop_flag)
    });

    tracing::info!("Try: curl -i http://localhost:{}/", port);

    // Wait for shutdown signal
    let finished = tokio::select! {
        _ = tokio::signal::ctrl_c() => None,
        result = &mut handle => Some(result),
    };
    let result = match finished {
        None => {
            tracing::info!("Received Ctrl+C, shutting down...");
            stop.store(true, Ordering::Relaxed);
            handle.await
        }
        Some(result) => {
            tracing::warn!("Exporter stopped");
            result
        }
    };
    result??;

    Ok(())
}
