//! Sensor exporter data model.
//!
//! Everything here is transient: a snapshot lives for one request, link and
//! clock information is re-read every time a response is assembled.

use chrono::NaiveDateTime;
use std::fmt;

/// Temperature and humidity as reported by the combined climate sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub humidity: f32,
}

impl ClimateReading {
    /// Reading reported when the sensor could not be sampled.
    pub const UNAVAILABLE: ClimateReading = ClimateReading {
        temperature: f32::NAN,
        humidity: f32::NAN,
    };
}

/// Request-scoped record of every sampled sensor.
///
/// Optional fields are `None` when the metric is not exported by the current
/// configuration, so the response only carries the configured sensors.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSnapshot {
    pub temperature: f32,
    pub humidity: f32,
    /// Shock event consumed from the latch.
    pub shock: Option<bool>,
    /// Flame/infrared level as a fraction of full scale.
    pub infrared_level: Option<f32>,
    /// Sound level as a fraction of full scale.
    pub sound_level: Option<f32>,
}

impl SensorSnapshot {
    /// Snapshot holding only the climate reading.
    pub fn climate(reading: ClimateReading) -> Self {
        Self {
            temperature: reading.temperature,
            humidity: reading.humidity,
            shock: None,
            infrared_level: None,
            sound_level: None,
        }
    }
}

/// A 48-bit access point identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bssid(pub [u8; 6]);

impl fmt::Display for Bssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a, b, c, d, e, g
        )
    }
}

/// Diagnostics of the associated access point.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WifiInfo {
    pub ssid: String,
    pub bssid: Bssid,
    /// Received signal strength in dBm.
    pub rssi: i8,
}

/// Broken-down local wall-clock time.
///
/// The zone abbreviation comes from the platform's time source because only
/// it knows which timezone rule is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTime {
    pub datetime: NaiveDateTime,
    /// Zone abbreviation, e.g. "CET" or "CEST".
    pub zone: String,
}

impl LocalTime {
    /// The zero time reported by a clock that was never synchronized.
    pub fn unsynchronized() -> Self {
        Self {
            datetime: NaiveDateTime::default(),
            zone: "UTC".to_string(),
        }
    }
}
