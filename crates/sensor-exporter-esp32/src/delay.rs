//! FreeRTOS-backed delay.

use std::time::Duration;

use esp_idf_hal::delay::FreeRtos;

use sensor_exporter_core::Delay;

/// Yields to the scheduler for the requested duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeRtosDelay;

impl Delay for FreeRtosDelay {
    fn delay(&mut self, duration: Duration) {
        let ms = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        FreeRtos::delay_ms(ms);
    }
}
