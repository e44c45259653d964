//! Plaintext metric exposition.
//!
//! Metrics are written as `name value` lines in a fixed order. There are no
//! `HELP`/`TYPE` lines and no labels; scrapers only see the bare samples.

use std::fmt;

use sensor_exporter_core::SensorSnapshot;

pub const TEMPERATURE: &str = "temperature";
pub const HUMIDITY: &str = "humidity";
pub const SHOCK: &str = "shock";
pub const INFRARED_LEVEL: &str = "infrared_level";
pub const SOUND_LEVEL: &str = "sound_level";

/// Value of a single metric sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    /// Continuous reading, rendered with two decimals.
    Gauge(f32),
    /// Event flag, rendered as `0` or `1`.
    Flag(bool),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MetricValue::Gauge(value) if value.is_nan() => f.write_str("NaN"),
            MetricValue::Gauge(value) if value.is_infinite() => {
                f.write_str(if value > 0.0 { "+Inf" } else { "-Inf" })
            }
            MetricValue::Gauge(value) => write!(f, "{:.2}", value),
            MetricValue::Flag(set) => f.write_str(if set { "1" } else { "0" }),
        }
    }
}

/// A named metric sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metric {
    pub name: &'static str,
    pub value: MetricValue,
}

impl Metric {
    pub fn gauge(name: &'static str, value: f32) -> Self {
        Self {
            name,
            value: MetricValue::Gauge(value),
        }
    }

    pub fn flag(name: &'static str, set: bool) -> Self {
        Self {
            name,
            value: MetricValue::Flag(set),
        }
    }

    /// Render as a single exposition line, including the trailing line feed.
    pub fn render(&self, writer: &mut impl fmt::Write) -> fmt::Result {
        writeln!(writer, "{} {}", self.name, self.value)
    }
}

/// Metrics of a snapshot in exposition order.
///
/// Temperature and humidity always come first; optional metrics follow in a
/// fixed order and are skipped when absent from the snapshot.
pub fn snapshot_metrics(snapshot: &SensorSnapshot) -> Vec<Metric> {
    let mut metrics = vec![
        Metric::gauge(TEMPERATURE, snapshot.temperature),
        Metric::gauge(HUMIDITY, snapshot.humidity),
    ];

    if let Some(shock) = snapshot.shock {
        metrics.push(Metric::flag(SHOCK, shock));
    }
    if let Some(level) = snapshot.infrared_level {
        metrics.push(Metric::gauge(INFRARED_LEVEL, level));
    }
    if let Some(level) = snapshot.sound_level {
        metrics.push(Metric::gauge(SOUND_LEVEL, level));
    }

    metrics
}

/// Render every metric of a snapshot.
pub fn render_snapshot(snapshot: &SensorSnapshot, writer: &mut impl fmt::Write) -> fmt::Result {
    for metric in snapshot_metrics(snapshot) {
        metric.render(writer)?;
    }
    Ok(())
}
