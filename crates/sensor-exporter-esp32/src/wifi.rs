//! Station-mode Wi-Fi link for ESP32.
//!
//! Association is started without blocking; the exporter observes completion
//! by polling `is_connected`, which requires both the association and the
//! network interface (DHCP lease) to be up.

use std::net::Ipv4Addr;

use anyhow::Result;
use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::{modem::Modem, peripheral},
    nvs::EspDefaultNvsPartition,
    sys,
    wifi::EspWifi,
};
use log::{debug, info, warn};

use sensor_exporter_core::{Bssid, LinkError, WifiCredentials, WifiInfo, WifiLink};

/// ESP-IDF Wi-Fi driver in station mode.
pub struct EspWifiLink {
    wifi: Box<EspWifi<'static>>,
}

impl EspWifiLink {
    pub fn new(
        modem: impl peripheral::Peripheral<P = Modem> + 'static,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> Result<Self> {
        let wifi = EspWifi::new(modem, sysloop, nvs)?;
        Ok(Self {
            wifi: Box::new(wifi),
        })
    }

    fn client_configuration(credentials: &WifiCredentials) -> Result<Configuration, LinkError> {
        let auth_method = if credentials.is_open() {
            info!("WiFi password is empty, using open network");
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        Ok(Configuration::Client(ClientConfiguration {
            ssid: credentials.ssid.as_str().try_into().map_err(|_| {
                LinkError::InvalidCredentials("SSID too long (max 32 chars)".into())
            })?,
            password: credentials
                .password
                .as_str()
                .try_into()
                .map_err(|_| {
                    LinkError::InvalidCredentials("Password too long (max 64 chars)".into())
                })?,
            auth_method,
            ..Default::default()
        }))
    }
}

fn driver_error(e: sys::EspError) -> LinkError {
    LinkError::Driver(e.to_string())
}

impl WifiLink for EspWifiLink {
    fn reset(&mut self) -> Result<(), LinkError> {
        if self.wifi.is_started().map_err(driver_error)? {
            // Not associated yet is fine here.
            if let Err(e) = self.wifi.disconnect() {
                debug!("Disconnect during reset: {}", e);
            }
            self.wifi.stop().map_err(driver_error)?;
        }
        self.wifi
            .set_configuration(&Configuration::Client(ClientConfiguration::default()))
            .map_err(driver_error)?;
        self.wifi.start().map_err(driver_error)
    }

    fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), LinkError> {
        if credentials.ssid.is_empty() {
            return Err(LinkError::InvalidCredentials(
                "WiFi SSID cannot be empty".into(),
            ));
        }

        let configuration = Self::client_configuration(credentials)?;
        self.wifi
            .set_configuration(&configuration)
            .map_err(driver_error)?;
        if !self.wifi.is_started().map_err(driver_error)? {
            self.wifi.start().map_err(driver_error)?;
        }

        info!("Connecting to '{}'...", credentials.ssid);
        self.wifi.connect().map_err(driver_error)
    }

    fn is_connected(&mut self) -> bool {
        let associated = self.wifi.is_connected().unwrap_or(false);
        let netif_up = self.wifi.sta_netif().is_up().unwrap_or(false);
        associated && netif_up
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        match self.wifi.sta_netif().get_ip_info() {
            Ok(ip_info) if !ip_info.ip.is_unspecified() => Some(ip_info.ip),
            Ok(_) => None,
            Err(e) => {
                warn!("Failed to read IP info: {}", e);
                None
            }
        }
    }

    fn info(&self) -> WifiInfo {
        let mut record = sys::wifi_ap_record_t::default();
        if let Err(e) = sys::esp!(unsafe { sys::esp_wifi_sta_get_ap_info(&mut record) }) {
            debug!("No access point info: {}", e);
            return WifiInfo::default();
        }

        let ssid_len = record
            .ssid
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(record.ssid.len());
        WifiInfo {
            ssid: String::from_utf8_lossy(&record.ssid[..ssid_len]).into_owned(),
            bssid: Bssid(record.bssid),
            rssi: record.rssi,
        }
    }
}
