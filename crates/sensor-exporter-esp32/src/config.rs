//! Build-time firmware configuration.
//!
//! Credentials are injected through the `EXPORTER_WIFI_SSID` and
//! `EXPORTER_WIFI_PASSWORD` environment variables when the image is built, so
//! they never live in the source tree.

use sensor_exporter_core::ExporterConfig;

const WIFI_SSID: Option<&str> = option_env!("EXPORTER_WIFI_SSID");
const WIFI_PASS: Option<&str> = option_env!("EXPORTER_WIFI_PASSWORD");

/// Configuration baked into this firmware image.
pub fn firmware_config() -> ExporterConfig {
    ExporterConfig::with_credentials(
        WIFI_SSID.unwrap_or_default(),
        WIFI_PASS.unwrap_or_default(),
    )
}
