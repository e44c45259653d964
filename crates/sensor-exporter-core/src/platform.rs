//! Platform abstraction.
//!
//! The exporter only talks to the outside world through these traits:
//! - `WifiLink`: wireless association and link diagnostics
//! - `TimeSource`: timezone/NTP configuration and local wall-clock time
//! - `Sensors`: climate, shock, flame and sound sampling
//! - `Listener` / `Connection`: TCP accept polling and byte streams
//! - `Delay`: blocking waits between retries
//!
//! Implementations live in the platform crates (ESP-IDF on the device,
//! simulated collaborators on Linux, in-memory fakes in tests).
//!
//! All methods are synchronous to match the single-threaded firmware loop.

use std::io::{self, Read, Write};
use std::net::Ipv4Addr;
use std::time::Duration;

use thiserror::Error;

use crate::config::WifiCredentials;
use crate::model::{ClimateReading, LocalTime, WifiInfo};

/// Errors reported by a Wi-Fi link implementation.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The credentials cannot be handed to the radio (too long, invalid).
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The radio driver rejected an operation.
    #[error("Wi-Fi driver error: {0}")]
    Driver(String),
}

/// Errors reported by a time source.
#[derive(Debug, Error)]
pub enum TimeError {
    #[error("Invalid timezone rule: {0}")]
    InvalidTimezone(String),

    #[error("Time sync unavailable: {0}")]
    Unavailable(String),
}

/// Errors reported by sensor sampling.
#[derive(Debug, Error)]
pub enum SensorError {
    /// The sensor is not fitted on this board.
    #[error("Sensor not fitted")]
    NotFitted,

    /// The sensor did not answer in time.
    #[error("Sensor timed out during {0}")]
    Timeout(&'static str),

    /// A frame was received but failed validation.
    #[error("Checksum mismatch (expected {expected:#04x}, got {actual:#04x})")]
    Checksum { expected: u8, actual: u8 },

    /// Any other driver failure.
    #[error("Sensor hardware error: {0}")]
    Hardware(String),
}

/// Wireless network interface.
pub trait WifiLink {
    /// Put the interface in station mode and drop any previous association.
    fn reset(&mut self) -> Result<(), LinkError> {
        Ok(())
    }

    /// Start associating with the given network.
    ///
    /// This only initiates the association; completion is observed through
    /// `is_connected`.
    fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), LinkError>;

    /// Whether the interface is associated and has an address.
    fn is_connected(&mut self) -> bool;

    /// Address assigned to the interface, if any.
    fn local_ip(&self) -> Option<Ipv4Addr>;

    /// Diagnostics of the current association.
    fn info(&self) -> WifiInfo;
}

/// Wall-clock time source.
pub trait TimeSource {
    /// Apply the POSIX timezone rule and start synchronizing against the NTP host.
    fn configure(&mut self, timezone_rule: &str, ntp_host: &str) -> Result<(), TimeError>;

    /// Current local time.
    ///
    /// Returns whatever the clock holds, which is the epoch if sync never
    /// succeeded.
    fn local_time(&self) -> LocalTime;
}

/// Sensor bank of the device.
pub trait Sensors {
    /// Prepare the sensors once at startup.
    fn begin(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    /// Sample the combined temperature/humidity sensor.
    fn climate(&mut self) -> Result<ClimateReading, SensorError>;

    /// Current level of the digital shock input.
    fn shock_active(&mut self) -> Result<bool, SensorError> {
        Err(SensorError::NotFitted)
    }

    /// Flame/infrared level as a fraction of full scale.
    fn infrared_level(&mut self) -> Result<f32, SensorError> {
        Err(SensorError::NotFitted)
    }

    /// Sound level as a fraction of full scale.
    fn sound_level(&mut self) -> Result<f32, SensorError> {
        Err(SensorError::NotFitted)
    }
}

/// A single accepted client connection.
pub trait Connection: Read + Write {
    /// Close the connection after the response has been written.
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }

    /// Bound the next read. `None` waits forever.
    ///
    /// Connections that never block may keep the default no-op.
    fn set_read_timeout(&mut self, _timeout: Option<Duration>) -> io::Result<()> {
        Ok(())
    }
}

/// TCP listener polled once per loop iteration.
pub trait Listener {
    type Connection: Connection;

    /// Start listening. Calling it again on a started listener is a no-op.
    fn begin(&mut self) -> io::Result<()>;

    /// Poll for a waiting client without blocking.
    fn accept(&mut self) -> io::Result<Option<Self::Connection>>;
}

/// Blocking delay provider.
pub trait Delay {
    fn delay(&mut self, duration: Duration);
}

/// Delay backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
