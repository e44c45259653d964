//! Sensor board drivers.
//!
//! - DHT11/DHT22 on a single open-drain GPIO, bit-banged
//! - Shock switch on a digital input
//! - Flame and sound modules on ADC1 channels, reported as raw / 4095

use std::borrow::Borrow;
use std::time::{Duration, Instant};

use anyhow::Result;
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::adc::ADCPin;
use esp_idf_hal::delay::Ets;
use esp_idf_hal::gpio::{AnyIOPin, Input, InputOutput, PinDriver, Pull};
use esp_idf_svc::sys;
use log::{debug, info};

use sensor_exporter_core::dht::{bit_from_pulse, FRAME_LEN};
use sensor_exporter_core::{ClimateReading, DhtModel, SensorError, Sensors};

/// Full scale of the 12-bit ADC.
const ADC_FULL_SCALE: f32 = 4095.0;

fn gpio_error(e: sys::EspError) -> SensorError {
    SensorError::Hardware(e.to_string())
}

/// Bit-banged DHT driver.
pub struct DhtDriver<'d> {
    pin: PinDriver<'d, AnyIOPin, InputOutput>,
    model: DhtModel,
    last: Option<(Instant, ClimateReading)>,
}

impl<'d> DhtDriver<'d> {
    pub fn new(mut pin: PinDriver<'d, AnyIOPin, InputOutput>, model: DhtModel) -> Result<Self> {
        pin.set_pull(Pull::Up)?;
        pin.set_high()?;
        Ok(Self {
            pin,
            model,
            last: None,
        })
    }

    /// Read the sensor, or return the previous reading if the sensor was
    /// sampled less than its minimum interval ago.
    pub fn read(&mut self) -> Result<ClimateReading, SensorError> {
        if let Some((at, reading)) = self.last {
            if self.model.is_fresh(at.elapsed()) {
                return Ok(reading);
            }
        }

        let frame = self.read_frame()?;
        let reading = self.model.decode(&frame)?;
        self.last = Some((Instant::now(), reading));
        Ok(reading)
    }

    fn read_frame(&mut self) -> Result<[u8; FRAME_LEN], SensorError> {
        // Start signal: DHT11 needs at least 18ms low, DHT22 at least 1ms.
        self.pin.set_low().map_err(gpio_error)?;
        Ets::delay_ms(match self.model {
            DhtModel::Dht11 => 20,
            DhtModel::Dht22 => 2,
        });
        self.pin.set_high().map_err(gpio_error)?;
        Ets::delay_us(30);

        self.wait_for_level(false, 200, "response low")?;
        self.wait_for_level(true, 200, "response high")?;
        self.wait_for_level(false, 200, "data preamble")?;

        let mut frame = [0u8; FRAME_LEN];
        for byte in frame.iter_mut() {
            let mut value = 0u8;
            for _ in 0..8 {
                self.wait_for_level(true, 80, "bit high")?;
                let start = Instant::now();
                self.wait_for_level(false, 120, "bit low")?;
                value = value << 1 | u8::from(bit_from_pulse(start.elapsed()));
            }
            *byte = value;
        }
        Ok(frame)
    }

    fn wait_for_level(
        &mut self,
        high: bool,
        timeout_us: u64,
        stage: &'static str,
    ) -> Result<(), SensorError> {
        let deadline = Instant::now() + Duration::from_micros(timeout_us);
        while Instant::now() <= deadline {
            if self.pin.is_high() == high {
                return Ok(());
            }
        }
        Err(SensorError::Timeout(stage))
    }
}

/// Every sensor fitted on the board.
///
/// The flame and sound channels share one ADC unit, hence the `M` handle.
pub struct BoardSensors<'d, F, N, M>
where
    F: ADCPin,
    N: ADCPin<Adc = F::Adc>,
    M: Borrow<AdcDriver<'d, F::Adc>>,
{
    dht: DhtDriver<'d>,
    shock: PinDriver<'d, AnyIOPin, Input>,
    flame: AdcChannelDriver<'d, F, M>,
    sound: AdcChannelDriver<'d, N, M>,
}

impl<'d, F, N, M> BoardSensors<'d, F, N, M>
where
    F: ADCPin,
    N: ADCPin<Adc = F::Adc>,
    M: Borrow<AdcDriver<'d, F::Adc>>,
{
    pub fn new(
        dht: DhtDriver<'d>,
        shock: PinDriver<'d, AnyIOPin, Input>,
        flame: AdcChannelDriver<'d, F, M>,
        sound: AdcChannelDriver<'d, N, M>,
    ) -> Self {
        Self {
            dht,
            shock,
            flame,
            sound,
        }
    }
}

fn level(raw: u16) -> f32 {
    f32::from(raw) / ADC_FULL_SCALE
}

impl<'d, F, N, M> Sensors for BoardSensors<'d, F, N, M>
where
    F: ADCPin,
    N: ADCPin<Adc = F::Adc>,
    M: Borrow<AdcDriver<'d, F::Adc>>,
{
    fn begin(&mut self) -> Result<(), SensorError> {
        self.shock.set_pull(Pull::Down).map_err(gpio_error)?;
        info!("Sensors ready");
        Ok(())
    }

    fn climate(&mut self) -> Result<ClimateReading, SensorError> {
        let reading = self.dht.read()?;
        debug!("DHT: {:.1}C {:.1}%", reading.temperature, reading.humidity);
        Ok(reading)
    }

    fn shock_active(&mut self) -> Result<bool, SensorError> {
        Ok(self.shock.is_high())
    }

    fn infrared_level(&mut self) -> Result<f32, SensorError> {
        self.flame.read_raw().map(level).map_err(gpio_error)
    }

    fn sound_level(&mut self) -> Result<f32, SensorError> {
        self.sound.read_raw().map(level).map_err(gpio_error)
    }
}
