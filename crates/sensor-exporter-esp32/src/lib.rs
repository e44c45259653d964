//! ESP32 platform for the sensor exporter.
//!
//! This crate implements the platform traits of `sensor-exporter-core` on top
//! of ESP-IDF:
//! - `wifi::EspWifiLink` - station-mode Wi-Fi link
//! - `time::SntpClock` - SNTP sync with a POSIX timezone rule
//! - `sensors::BoardSensors` - DHT, shock, flame and sound sensors
//! - `delay::FreeRtosDelay` - scheduler-friendly delay
//!
//! The TCP transport comes from `sensor-exporter-server`, which runs on the
//! ESP-IDF std target unchanged.
//!
//! # Example
//!
//! ```ignore
//! use sensor_exporter_esp32::wifi::EspWifiLink;
//! use sensor_exporter_esp32::time::SntpClock;
//!
//! let link = EspWifiLink::new(peripherals.modem, sysloop, Some(nvs))?;
//! let clock = SntpClock::new();
//! ```

pub mod config;
pub mod delay;
pub mod sensors;
pub mod time;
pub mod wifi;
