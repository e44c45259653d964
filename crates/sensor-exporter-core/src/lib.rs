//! # sensor-exporter-core
//!
//! Core data model and platform abstractions for the sensor exporter.
//!
//! This crate provides:
//! - Data model types (SensorSnapshot, ClimateReading, WifiInfo, LocalTime)
//! - Platform traits for the external collaborators (Wi-Fi link, time source,
//!   sensors, TCP listener, delay)
//! - The shock latch shared between the pin poller and the response path
//! - DHT11/DHT22 frame decoding
//! - Compiled-in configuration types
//!
//! This crate is intentionally runtime-agnostic and performs no I/O,
//! making it usable on both Linux (host simulator) and ESP32 (esp-idf) targets.

pub mod config;
pub mod dht;
pub mod latch;
pub mod model;
pub mod platform;

pub use config::{ExporterConfig, MetricSelection, RetryPolicy, TimeConfig, WifiCredentials};
pub use dht::DhtModel;
pub use latch::ShockLatch;
pub use model::*;
pub use platform::{
    Connection, Delay, LinkError, Listener, SensorError, Sensors, StdDelay, TimeError, TimeSource,
    WifiLink,
};
