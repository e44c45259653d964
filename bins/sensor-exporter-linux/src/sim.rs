//! Simulated collaborators for running the exporter on a host.

use std::net::Ipv4Addr;

use chrono::Utc;
use chrono_tz::Tz;
use rand::rngs::ThreadRng;
use rand::Rng;
use tracing::{debug, info};

use sensor_exporter_core::{
    Bssid, ClimateReading, LinkError, LocalTime, SensorError, Sensors, TimeError, TimeSource,
    WifiCredentials, WifiInfo, WifiLink,
};

/// Polls answered "down" after `begin` before the link comes up.
const ASSOCIATION_POLLS: u32 = 2;

/// Wi-Fi link that associates after a couple of polls.
pub struct SimulatedWifi {
    ssid: Option<String>,
    pending_polls: u32,
    connected: bool,
}

impl SimulatedWifi {
    pub fn new() -> Self {
        Self {
            ssid: None,
            pending_polls: 0,
            connected: false,
        }
    }
}

impl WifiLink for SimulatedWifi {
    fn reset(&mut self) -> Result<(), LinkError> {
        self.ssid = None;
        self.connected = false;
        Ok(())
    }

    fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), LinkError> {
        if credentials.ssid.is_empty() {
            return Err(LinkError::InvalidCredentials(
                "WiFi SSID cannot be empty".into(),
            ));
        }
        self.ssid = Some(credentials.ssid.clone());
        self.pending_polls = ASSOCIATION_POLLS;
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        if !self.connected && self.ssid.is_some() {
            if self.pending_polls == 0 {
                self.connected = true;
            } else {
                self.pending_polls -= 1;
            }
        }
        self.connected
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        self.connected.then_some(Ipv4Addr::LOCALHOST)
    }

    fn info(&self) -> WifiInfo {
        WifiInfo {
            ssid: self.ssid.clone().unwrap_or_default(),
            bssid: Bssid([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]),
            rssi: -50,
        }
    }
}

/// Host wall clock rendered in an IANA timezone.
///
/// The host is assumed to be NTP-disciplined already, so `configure` only
/// records the request.
pub struct SystemClock {
    zone: Tz,
}

impl SystemClock {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }
}

impl TimeSource for SystemClock {
    fn configure(&mut self, timezone_rule: &str, ntp_host: &str) -> Result<(), TimeError> {
        if timezone_rule.is_empty() {
            return Err(TimeError::InvalidTimezone(timezone_rule.to_string()));
        }
        info!(
            "Using host clock in {} (device rule '{}', NTP host {})",
            self.zone, timezone_rule, ntp_host
        );
        Ok(())
    }

    fn local_time(&self) -> LocalTime {
        let now = Utc::now().with_timezone(&self.zone);
        LocalTime {
            datetime: now.naive_local(),
            zone: now.format("%Z").to_string(),
        }
    }
}

/// Sensor bank producing plausible random readings.
pub struct SimulatedSensors {
    rng: ThreadRng,
    climate: ClimateReading,
    shock_probability: f64,
}

impl SimulatedSensors {
    pub fn new(shock_probability: f64) -> Self {
        Self {
            rng: rand::thread_rng(),
            climate: ClimateReading {
                temperature: 21.0,
                humidity: 45.0,
            },
            shock_probability,
        }
    }

    fn analog_level(&mut self) -> f32 {
        f32::from(self.rng.gen_range(0u16..=4095)) / 4095.0
    }
}

impl Sensors for SimulatedSensors {
    fn climate(&mut self) -> Result<ClimateReading, SensorError> {
        self.climate.temperature =
            (self.climate.temperature + self.rng.gen_range(-0.3f32..=0.3)).clamp(-10.0, 50.0);
        self.climate.humidity =
            (self.climate.humidity + self.rng.gen_range(-1.0f32..=1.0)).clamp(5.0, 95.0);
        debug!(
            "Simulated climate: {:.2}C {:.2}%",
            self.climate.temperature, self.climate.humidity
        );
        Ok(self.climate)
    }

    fn shock_active(&mut self) -> Result<bool, SensorError> {
        Ok(self.rng.gen_bool(self.shock_probability))
    }

    fn infrared_level(&mut self) -> Result<f32, SensorError> {
        Ok(self.analog_level())
    }

    fn sound_level(&mut self) -> Result<f32, SensorError> {
        Ok(self.analog_level())
    }
}
