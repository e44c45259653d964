//! DHT11/DHT22 frame decoding.
//!
//! Both sensors answer a start pulse with a 40-bit frame: four data bytes and
//! a checksum equal to the low byte of their sum. The bit-level protocol is
//! timing critical and lives in the platform crate; decoding is shared here.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::ClimateReading;
use crate::platform::SensorError;

/// Length of a DHT frame in bytes.
pub const FRAME_LEN: usize = 5;

/// High pulses longer than this encode a 1 bit (a 0 is about 26us, a 1 about 70us).
pub const ONE_BIT_THRESHOLD: Duration = Duration::from_micros(50);

/// Bit value encoded by a high pulse of the given length.
pub fn bit_from_pulse(high: Duration) -> bool {
    high > ONE_BIT_THRESHOLD
}

/// Supported DHT models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DhtModel {
    /// Integral and decimal bytes for humidity and temperature.
    Dht11,
    /// 16-bit tenths for humidity and temperature, sign bit on temperature.
    Dht22,
}

impl DhtModel {
    /// Minimum interval between two reads the sensor tolerates.
    pub fn min_interval(self) -> Duration {
        match self {
            DhtModel::Dht11 => Duration::from_secs(1),
            DhtModel::Dht22 => Duration::from_secs(2),
        }
    }

    /// Whether a reading taken `age` ago is still within the minimum interval.
    pub fn is_fresh(self, age: Duration) -> bool {
        age < self.min_interval()
    }

    /// Decode a raw frame into a climate reading.
    pub fn decode(self, frame: &[u8; FRAME_LEN]) -> Result<ClimateReading, SensorError> {
        verify_checksum(frame)?;

        let reading = match self {
            DhtModel::Dht11 => {
                let humidity = frame[0] as f32 + frame[1] as f32 / 10.0;
                // Bit 7 of the decimal byte marks sub-zero temperatures on newer parts.
                let magnitude = frame[2] as f32 + (frame[3] & 0x7F) as f32 / 10.0;
                let temperature = if frame[3] & 0x80 != 0 {
                    -magnitude
                } else {
                    magnitude
                };
                ClimateReading {
                    temperature,
                    humidity,
                }
            }
            DhtModel::Dht22 => {
                let raw_humidity = u16::from(frame[0]) << 8 | u16::from(frame[1]);
                let raw_temp = u16::from(frame[2]) << 8 | u16::from(frame[3]);

                let humidity = raw_humidity as f32 / 10.0;
                let mut temperature = (raw_temp & 0x7FFF) as f32 / 10.0;
                if raw_temp & 0x8000 != 0 {
                    temperature = -temperature;
                }
                ClimateReading {
                    temperature,
                    humidity,
                }
            }
        };

        Ok(reading)
    }
}

fn verify_checksum(frame: &[u8; FRAME_LEN]) -> Result<(), SensorError> {
    let expected = frame[..4]
        .iter()
        .fold(0u8, |sum, byte| sum.wrapping_add(*byte));
    if expected != frame[4] {
        return Err(SensorError::Checksum {
            expected,
            actual: frame[4],
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_checksum(data: [u8; 4]) -> [u8; FRAME_LEN] {
        let sum = data.iter().fold(0u8, |s, b| s.wrapping_add(*b));
        [data[0], data[1], data[2], data[3], sum]
    }

    #[test]
    fn test_decode_dht11() {
        let reading = DhtModel::Dht11
            .decode(&with_checksum([45, 0, 23, 4]))
            .unwrap();
        assert_eq!(reading.humidity, 45.0);
        assert!((reading.temperature - 23.4).abs() < 1e-4);
    }

    #[test]
    fn test_decode_dht11_negative() {
        let reading = DhtModel::Dht11
            .decode(&with_checksum([60, 0, 2, 0x85]))
            .unwrap();
        assert!((reading.temperature + 2.5).abs() < 1e-4);
    }

    #[test]
    fn test_decode_dht22() {
        // 65.2 %RH, 35.1 C
        let reading = DhtModel::Dht22
            .decode(&with_checksum([0x02, 0x8C, 0x01, 0x5F]))
            .unwrap();
        assert!((reading.humidity - 65.2).abs() < 1e-4);
        assert!((reading.temperature - 35.1).abs() < 1e-4);
    }

    #[test]
    fn test_decode_dht22_negative() {
        // -10.1 C
        let reading = DhtModel::Dht22
            .decode(&with_checksum([0x01, 0xF4, 0x80, 0x65]))
            .unwrap();
        assert!((reading.temperature + 10.1).abs() < 1e-4);
        assert_eq!(reading.humidity, 50.0);
    }

    #[test]
    fn test_checksum_wraps() {
        let frame = with_checksum([0xFF, 0xFF, 0x10, 0x01]);
        assert_eq!(frame[4], 0x0F);
        assert!(DhtModel::Dht11.decode(&frame).is_ok());
    }

    #[test]
    fn test_pulse_length_decides_bit() {
        assert!(!bit_from_pulse(Duration::from_micros(26)));
        assert!(!bit_from_pulse(ONE_BIT_THRESHOLD));
        assert!(bit_from_pulse(Duration::from_micros(70)));
    }

    #[test]
    fn test_cached_reading_freshness() {
        assert!(DhtModel::Dht11.is_fresh(Duration::from_millis(999)));
        assert!(!DhtModel::Dht11.is_fresh(Duration::from_secs(1)));
        assert!(DhtModel::Dht22.is_fresh(Duration::from_millis(1500)));
    }

    #[test]
    fn test_checksum_mismatch() {
        let err = DhtModel::Dht11.decode(&[45, 0, 23, 4, 0]).unwrap_err();
        match err {
            SensorError::Checksum { expected, actual } => {
                assert_eq!(expected, 72);
                assert_eq!(actual, 0);
            }
            other => panic!("Expected checksum error, got {other:?}"),
        }
    }
}
