//! # sensor-exporter-server
//!
//! The exporter loop and its connectivity manager.
//!
//! The loop is generic over the platform traits in `sensor-exporter-core`, so
//! the same code runs on the ESP32 firmware and the Linux simulator.
//!
//! Enable features based on target platform:
//! - `std-net` (default) - TCP transport over `std::net`

pub mod connectivity;
pub mod exporter;
#[cfg(feature = "std-net")]
pub mod transport;

#[cfg(test)]
mod fakes;

pub use connectivity::{ConnectivityError, ConnectivityManager, LinkHealth, LinkState};
pub use exporter::{Exporter, ExporterError, ExporterState, TickOutcome};
#[cfg(feature = "std-net")]
pub use transport::{TcpConnection, TcpTransport};

pub use sensor_exporter_core::{ExporterConfig, SensorSnapshot};
