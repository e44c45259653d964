//! Sensor exporter firmware for ESP32
//!
//! This binary requires the ESP32 Rust toolchain.
//! It will not compile with the standard Rust toolchain.
//!
//! Wi-Fi credentials are taken from the build environment:
//!
//! ```text
//! EXPORTER_WIFI_SSID=HomeNet EXPORTER_WIFI_PASSWORD=secret cargo build --release
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::rc::Rc;

use anyhow::{Context, Result};
use esp_idf_hal::adc::attenuation::DB_11;
use esp_idf_hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::gpio::{IOPin, PinDriver};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::info;

use sensor_exporter_esp32::config::firmware_config;
use sensor_exporter_esp32::delay::FreeRtosDelay;
use sensor_exporter_esp32::sensors::{BoardSensors, DhtDriver};
use sensor_exporter_esp32::time::SntpClock;
use sensor_exporter_esp32::wifi::EspWifiLink;
use sensor_exporter_server::{Exporter, TcpTransport};

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let config = firmware_config();
    info!("Sensor exporter starting...");
    info!(
        "Board: {:?} on GPIO26, shock on GPIO27, flame on GPIO34, sound on GPIO35",
        config.dht_model
    );

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let link = EspWifiLink::new(peripherals.modem, sysloop, Some(nvs))
        .context("failed to initialize Wi-Fi driver")?;

    let pins = peripherals.pins;
    let dht = DhtDriver::new(
        PinDriver::input_output_od(pins.gpio26.downgrade())?,
        config.dht_model,
    )?;
    let shock = PinDriver::input(pins.gpio27.downgrade())?;

    let adc = Rc::new(AdcDriver::new(peripherals.adc1).context("failed to initialize ADC1")?);
    let channel_config = AdcChannelConfig {
        attenuation: DB_11,
        ..Default::default()
    };
    let flame = AdcChannelDriver::new(adc.clone(), pins.gpio34, &channel_config)?;
    let sound = AdcChannelDriver::new(adc, pins.gpio35, &channel_config)?;

    let sensors = BoardSensors::new(dht, shock, flame, sound);

    let listener = TcpTransport::new(
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.http_port)),
        config.read_timeout,
    );

    let mut exporter = Exporter::new(
        config,
        link,
        FreeRtosDelay,
        SntpClock::new(),
        sensors,
        listener,
    );
    match exporter.run()? {}
}
