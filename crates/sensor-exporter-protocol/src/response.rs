//! Metrics HTTP response.
//!
//! Every completed request gets the same `200 OK` response: fixed headers,
//! two diagnostic headers built from the clock and the Wi-Fi link, a blank
//! line and the exposition body. The connection is closed afterwards.

use std::fmt;

use sensor_exporter_core::{LocalTime, SensorSnapshot, WifiInfo};

use crate::exposition::render_snapshot;

pub const STATUS_LINE: &str = "HTTP/1.1 200 OK";
pub const CONTENT_TYPE: &str = "text/plain; charset=UTF-8; version=0.0.4";

const CRLF: &str = "\r\n";

/// Format of the `X-DateTime` header, the zone abbreviation is appended.
const DATETIME_FORMAT: &str = "%A %d %B %Y %H:%M:%S";

/// Render a local time as `<weekday> <day> <month> <year> <HH:MM:SS> <zone>`.
pub fn format_datetime(time: &LocalTime) -> String {
    format!("{} {}", time.datetime.format(DATETIME_FORMAT), time.zone)
}

/// Render link diagnostics as `<ssid> (<bssid>) at <rssi>dBm`.
pub fn format_wifi(info: &WifiInfo) -> String {
    format!("{} ({}) at {}dBm", info.ssid, info.bssid, info.rssi)
}

/// A complete metrics response.
#[derive(Debug, Clone, Copy)]
pub struct MetricsResponse<'a> {
    pub time: &'a LocalTime,
    pub wifi: &'a WifiInfo,
    pub snapshot: &'a SensorSnapshot,
}

impl<'a> MetricsResponse<'a> {
    pub fn new(time: &'a LocalTime, wifi: &'a WifiInfo, snapshot: &'a SensorSnapshot) -> Self {
        Self {
            time,
            wifi,
            snapshot,
        }
    }

    /// Header lines in wire order, without line terminators.
    pub fn headers(&self) -> [(&'static str, String); 5] {
        [
            ("Content-Type", CONTENT_TYPE.to_string()),
            ("Access-Control-Allow-Origin", "*".to_string()),
            ("X-DateTime", format_datetime(self.time)),
            ("X-WiFi", format_wifi(self.wifi)),
            ("Connection", "close".to_string()),
        ]
    }
}

impl fmt::Display for MetricsResponse<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(STATUS_LINE)?;
        f.write_str(CRLF)?;
        for (name, value) in self.headers() {
            write!(f, "{}: {}{}", name, value, CRLF)?;
        }
        f.write_str(CRLF)?;
        render_snapshot(self.snapshot, f)
    }
}
