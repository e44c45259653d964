//! # sensor-exporter-protocol
//!
//! Wire format of the sensor exporter.
//!
//! This crate defines how a request boundary is recognized and how the metrics
//! response is rendered. It performs no I/O.

pub mod exposition;
pub mod request;
pub mod response;

pub use exposition::{render_snapshot, snapshot_metrics, Metric, MetricValue};
pub use request::RequestDetector;
pub use response::{format_datetime, format_wifi, MetricsResponse};
