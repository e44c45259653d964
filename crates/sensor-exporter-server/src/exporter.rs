//! Sensor exporter loop.
//!
//! One iteration (`tick`) does, in order:
//! 1. Check the Wi-Fi link and block until it is restored if it dropped
//! 2. Poll the shock input and latch a low-to-high transition
//! 3. Poll the listener for a waiting client and serve it to completion
//!
//! Serving reads the client's bytes until two consecutive line terminators
//! arrive, then reads the clock, samples every configured sensor once, writes
//! the metrics response and closes the connection. Only one client is handled
//! at a time, and a configured read timeout caps the whole request, so a
//! client trickling bytes is dropped once it runs out.

use std::convert::Infallible;
use std::io::{self, ErrorKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

use sensor_exporter_core::{
    ClimateReading, Connection, Delay, ExporterConfig, Listener, SensorError, SensorSnapshot,
    Sensors, ShockLatch, TimeSource, WifiLink,
};
use sensor_exporter_protocol::{MetricsResponse, RequestDetector};

use crate::connectivity::{ConnectivityError, ConnectivityManager, LinkHealth};

/// Size of the buffer each transport read fills.
const READ_CHUNK: usize = 256;

/// Errors that stop the exporter loop.
#[derive(Debug, Error)]
pub enum ExporterError {
    #[error(transparent)]
    Connectivity(#[from] ConnectivityError),

    #[error("Failed to start listener: {0}")]
    Listener(#[source] io::Error),
}

/// What a single loop iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No client was waiting.
    Idle,
    /// A client received the metrics response.
    Served,
    /// A client went away, stalled or failed before a response was sent.
    Dropped,
}

/// State carried across loop iterations.
#[derive(Debug, Default)]
pub struct ExporterState {
    shock: Arc<ShockLatch>,
    last_shock_level: bool,
    requests_served: u64,
    dropped_connections: u64,
}

impl ExporterState {
    /// Latch shared with anything that detects shock events.
    pub fn shock_latch(&self) -> Arc<ShockLatch> {
        self.shock.clone()
    }

    pub fn requests_served(&self) -> u64 {
        self.requests_served
    }

    pub fn dropped_connections(&self) -> u64 {
        self.dropped_connections
    }
}

/// The exporter and every collaborator it drives.
pub struct Exporter<W, D, T, S, L> {
    config: ExporterConfig,
    connectivity: ConnectivityManager<W, D>,
    delay: D,
    clock: T,
    sensors: S,
    listener: L,
    detector: RequestDetector,
    state: ExporterState,
}

impl<W, D, T, S, L> Exporter<W, D, T, S, L>
where
    W: WifiLink,
    D: Delay + Clone,
    T: TimeSource,
    S: Sensors,
    L: Listener,
{
    pub fn new(
        config: ExporterConfig,
        link: W,
        delay: D,
        clock: T,
        sensors: S,
        listener: L,
    ) -> Self {
        let connectivity = ConnectivityManager::new(link, delay.clone(), config.reconnect);
        Self {
            config,
            connectivity,
            delay,
            clock,
            sensors,
            listener,
            detector: RequestDetector::new(),
            state: ExporterState::default(),
        }
    }

    /// Bring the device online: associate, sync the clock, start listening.
    pub fn start(&mut self) -> Result<(), ExporterError> {
        self.connectivity.connect(self.config.wifi.clone())?;
        self.connectivity.sync_time(&mut self.clock, &self.config.time);

        self.listener.begin().map_err(ExporterError::Listener)?;
        info!("Exporter listening on port {}", self.config.http_port);

        if let Err(e) = self.sensors.begin() {
            warn!("Sensor initialization failed: {}", e);
        }
        Ok(())
    }

    /// Start, then loop forever.
    ///
    /// Only returns if a bounded retry policy gives up on the link.
    pub fn run(&mut self) -> Result<Infallible, ExporterError> {
        self.start()?;
        loop {
            self.tick()?;
        }
    }

    /// Start, then loop until `stop` is set.
    pub fn run_until(&mut self, stop: &AtomicBool) -> Result<(), ExporterError> {
        self.start()?;
        while !stop.load(Ordering::Relaxed) {
            self.tick()?;
        }
        info!(
            served = self.state.requests_served,
            dropped = self.state.dropped_connections,
            recoveries = self.connectivity.recoveries(),
            "Exporter stopped"
        );
        Ok(())
    }

    /// One loop iteration.
    pub fn tick(&mut self) -> Result<TickOutcome, ExporterError> {
        // No client is accepted while the link is down.
        if self.connectivity.ensure_connected()? == LinkHealth::Restored {
            info!(
                recoveries = self.connectivity.recoveries(),
                "Wi-Fi link restored"
            );
        }

        self.poll_shock();

        match self.listener.accept() {
            Ok(Some(connection)) => Ok(self.serve(connection)),
            Ok(None) => {
                self.delay.delay(self.config.idle_poll);
                Ok(TickOutcome::Idle)
            }
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                self.delay.delay(self.config.idle_poll);
                Ok(TickOutcome::Idle)
            }
        }
    }

    /// Latch a low-to-high transition of the shock input.
    fn poll_shock(&mut self) {
        if !self.config.metrics.shock {
            return;
        }
        match self.sensors.shock_active() {
            Ok(level) => {
                if level && !self.state.last_shock_level {
                    debug!("Shock detected");
                    self.state.shock.set();
                }
                self.state.last_shock_level = level;
            }
            Err(e) => debug!("Shock input unreadable: {}", e),
        }
    }

    /// Read one request from the client and answer it.
    fn serve<C: Connection>(&mut self, mut connection: C) -> TickOutcome {
        self.detector.reset();
        let mut buf = [0u8; READ_CHUNK];
        let deadline = self
            .config
            .read_timeout
            .filter(|t| !t.is_zero())
            .map(|t| Instant::now() + t);

        loop {
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    warn!("Client too slow to complete its request, dropping connection");
                    let _ = connection.close();
                    return self.dropped();
                }
                if let Err(e) = connection.set_read_timeout(Some(remaining)) {
                    warn!("Failed to set read timeout: {}", e);
                    return self.dropped();
                }
            }

            match connection.read(&mut buf) {
                Ok(0) => {
                    debug!("Client disconnected before completing its request");
                    return self.dropped();
                }
                Ok(n) => {
                    if self.detector.feed(&buf[..n]).is_some() {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    warn!("Client stalled mid-request, dropping connection");
                    let _ = connection.close();
                    return self.dropped();
                }
                Err(e) => {
                    warn!("Failed to read request: {}", e);
                    return self.dropped();
                }
            }
        }

        let time = self.clock.local_time();
        let snapshot = self.sample();
        let wifi = self.connectivity.link().info();
        let response = MetricsResponse::new(&time, &wifi, &snapshot).to_string();

        let sent = connection
            .write_all(response.as_bytes())
            .and_then(|()| connection.close());
        if let Err(e) = sent {
            warn!("Failed to send response: {}", e);
            // The event was never delivered, keep it for the next scrape.
            if snapshot.shock == Some(true) {
                self.state.shock.set();
            }
            return self.dropped();
        }

        self.state.requests_served += 1;
        debug!(requests = self.state.requests_served, "Served metrics");
        TickOutcome::Served
    }

    fn dropped(&mut self) -> TickOutcome {
        self.state.dropped_connections += 1;
        TickOutcome::Dropped
    }

    /// Sample every configured sensor exactly once.
    fn sample(&mut self) -> SensorSnapshot {
        let climate = self.sensors.climate().unwrap_or_else(|e| {
            warn!("Climate sensor read failed: {}", e);
            ClimateReading::UNAVAILABLE
        });
        let mut snapshot = SensorSnapshot::climate(climate);

        let metrics = self.config.metrics;
        if metrics.shock {
            snapshot.shock = Some(self.state.shock.take());
        }
        if metrics.infrared {
            let reading = self.sensors.infrared_level();
            snapshot.infrared_level = Some(level_or_nan("infrared", reading));
        }
        if metrics.sound {
            let reading = self.sensors.sound_level();
            snapshot.sound_level = Some(level_or_nan("sound", reading));
        }
        snapshot
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    pub fn state(&self) -> &ExporterState {
        &self.state
    }

    pub fn connectivity(&self) -> &ConnectivityManager<W, D> {
        &self.connectivity
    }

    pub fn connectivity_mut(&mut self) -> &mut ConnectivityManager<W, D> {
        &mut self.connectivity
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }
}

fn level_or_nan(sensor: &str, reading: Result<f32, SensorError>) -> f32 {
    reading.unwrap_or_else(|e| {
        warn!("{} sensor read failed: {}", sensor, e);
        f32::NAN
    })
}
