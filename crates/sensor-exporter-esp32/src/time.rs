//! Wall-clock time from SNTP and the newlib timezone database.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_svc::sntp::{EspSntp, SntpConf, SyncStatus};
use esp_idf_svc::sys;
use log::{debug, info};

use sensor_exporter_core::{LocalTime, TimeError, TimeSource};

/// How long `configure` waits for the first sync.
const SYNC_TIMEOUT: Duration = Duration::from_secs(5);

/// SNTP-synchronized clock.
///
/// The SNTP service keeps running in the background once configured, so the
/// client has to be kept alive for the lifetime of the clock.
#[derive(Default)]
pub struct SntpClock {
    sntp: Option<EspSntp<'static>>,
}

impl SntpClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimeSource for SntpClock {
    fn configure(&mut self, timezone_rule: &str, ntp_host: &str) -> Result<(), TimeError> {
        if timezone_rule.is_empty() || timezone_rule.contains('\0') {
            return Err(TimeError::InvalidTimezone(timezone_rule.to_string()));
        }
        std::env::set_var("TZ", timezone_rule);
        unsafe { sys::tzset() };

        let mut conf = SntpConf::default();
        conf.servers[0] = ntp_host;
        let sntp = EspSntp::new(&conf).map_err(|e| TimeError::Unavailable(e.to_string()))?;

        let started = Instant::now();
        while sntp.get_sync_status() != SyncStatus::Completed {
            if started.elapsed() >= SYNC_TIMEOUT {
                self.sntp = Some(sntp);
                return Err(TimeError::Unavailable(format!(
                    "no answer from {} within {:?}",
                    ntp_host, SYNC_TIMEOUT
                )));
            }
            FreeRtos::delay_ms(100);
        }

        info!("Clock synchronized against {}", ntp_host);
        self.sntp = Some(sntp);
        Ok(())
    }

    fn local_time(&self) -> LocalTime {
        let mut tm = sys::tm::default();
        let mut zone = [0u8; 16];
        let zone_len = unsafe {
            let now = sys::time(core::ptr::null_mut());
            sys::localtime_r(&now, &mut tm);
            sys::strftime(
                zone.as_mut_ptr() as *mut _,
                zone.len() as _,
                c"%Z".as_ptr(),
                &tm,
            )
        };

        let datetime = NaiveDate::from_ymd_opt(
            tm.tm_year + 1900,
            (tm.tm_mon + 1) as u32,
            tm.tm_mday as u32,
        )
        .and_then(|d| d.and_hms_opt(tm.tm_hour as u32, tm.tm_min as u32, tm.tm_sec as u32));
        match datetime {
            Some(datetime) => LocalTime {
                datetime,
                zone: String::from_utf8_lossy(&zone[..zone_len as usize]).into_owned(),
            },
            None => {
                debug!("Clock holds an invalid time");
                LocalTime::unsynchronized()
            }
        }
    }
}
