//! Compiled-in exporter configuration.
//!
//! The firmware has no runtime configuration surface: every value here is
//! baked into the image. The types are serializable so the host simulator can
//! print the effective configuration; the Wi-Fi passphrase is never serialized.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dht::DhtModel;

/// POSIX timezone rule for Central European Time with EU daylight saving.
pub const DEFAULT_TIMEZONE_RULE: &str = "CET-1CEST-2,M3.5.0/02:00:00,M10.5.0/03:00:00";

/// NTP pool used for the one-shot sync at boot.
pub const DEFAULT_NTP_HOST: &str = "es.pool.ntp.org";

/// Port the exporter listens on.
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Complete exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    pub wifi: WifiCredentials,
    pub time: TimeConfig,
    pub http_port: u16,
    pub metrics: MetricSelection,
    /// Humidity sensor fitted to the board. The GPIO wiring is fixed in the
    /// firmware binary.
    pub dht_model: DhtModel,
    /// Policy for both the initial association and link recovery.
    pub reconnect: RetryPolicy,
    /// Time a client gets to deliver its whole request. `None` waits forever.
    pub read_timeout: Option<Duration>,
    /// Sleep between loop iterations when no client is waiting.
    pub idle_poll: Duration,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            wifi: WifiCredentials::default(),
            time: TimeConfig::default(),
            http_port: DEFAULT_HTTP_PORT,
            metrics: MetricSelection::default(),
            dht_model: DhtModel::Dht11,
            reconnect: RetryPolicy::default(),
            read_timeout: Some(Duration::from_secs(10)),
            idle_poll: Duration::from_millis(10),
        }
    }
}

impl ExporterConfig {
    /// Config with the given credentials and defaults for everything else.
    pub fn with_credentials(ssid: &str, password: &str) -> Self {
        Self {
            wifi: WifiCredentials::new(ssid, password),
            ..Default::default()
        }
    }
}

/// Wi-Fi network credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiCredentials {
    /// Network SSID.
    pub ssid: String,

    /// Network passphrase (empty for open networks, never serialized).
    #[serde(skip_serializing, default)]
    pub password: String,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Self {
        Self {
            ssid: ssid.to_string(),
            password: password.to_string(),
        }
    }

    /// Whether the network is open (no passphrase).
    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

/// Time synchronization settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeConfig {
    /// POSIX TZ rule, e.g. `CET-1CEST-2,M3.5.0/02:00:00,M10.5.0/03:00:00`.
    pub timezone_rule: String,
    pub ntp_host: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            timezone_rule: DEFAULT_TIMEZONE_RULE.to_string(),
            ntp_host: DEFAULT_NTP_HOST.to_string(),
        }
    }
}

/// Which optional metrics are exported.
///
/// Temperature and humidity are always exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSelection {
    pub shock: bool,
    pub infrared: bool,
    pub sound: bool,
}

impl MetricSelection {
    /// Temperature and humidity only.
    pub const CLIMATE_ONLY: MetricSelection = MetricSelection {
        shock: false,
        infrared: false,
        sound: false,
    };

    /// Every supported metric.
    pub const ALL: MetricSelection = MetricSelection {
        shock: true,
        infrared: true,
        sound: true,
    };
}

impl Default for MetricSelection {
    fn default() -> Self {
        Self::ALL
    }
}

/// Fixed-interval retry policy.
///
/// There is no backoff. With `max_attempts` unset the policy retries forever,
/// which is how the device behaves in the field; tests bound it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay between two status polls.
    pub interval: Duration,
    /// Give up after this many retries; the first poll is not counted.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Retry forever at the given interval.
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    /// Retry at most `max_attempts` times at the given interval.
    pub fn bounded(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: Some(max_attempts),
        }
    }

    /// Whether another retry is allowed after `attempts` retries.
    pub fn allows(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_firmware_constants() {
        let config = ExporterConfig::default();

        assert_eq!(config.http_port, 80);
        assert_eq!(config.time.ntp_host, "es.pool.ntp.org");
        assert_eq!(
            config.time.timezone_rule,
            "CET-1CEST-2,M3.5.0/02:00:00,M10.5.0/03:00:00"
        );
        assert_eq!(config.dht_model, DhtModel::Dht11);
        assert_eq!(config.read_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.reconnect.interval, Duration::from_secs(1));
        assert_eq!(config.reconnect.max_attempts, None);
    }

    #[test]
    fn test_password_is_not_serialized() {
        let config = ExporterConfig::with_credentials("HomeNet", "hunter22");
        let json = serde_json::to_string(&config).unwrap();

        assert!(json.contains("\"ssid\":\"HomeNet\""));
        assert!(!json.contains("hunter22"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn test_only_sensor_model_is_board_configurable() {
        let json = serde_json::to_value(ExporterConfig::default()).unwrap();

        assert!(json.get("dht_model").is_some());
        assert!(json.get("pins").is_none());
    }

    #[test]
    fn test_retry_policy_bounds() {
        let unbounded = RetryPolicy::unbounded(Duration::from_millis(5));
        assert!(unbounded.allows(u32::MAX - 1));

        let bounded = RetryPolicy::bounded(Duration::from_millis(5), 3);
        assert!(bounded.allows(0));
        assert!(bounded.allows(2));
        assert!(!bounded.allows(3));
    }

    #[test]
    fn test_open_network() {
        assert!(WifiCredentials::new("Cafe", "").is_open());
        assert!(!WifiCredentials::new("HomeNet", "secret").is_open());
    }
}
