//! MAX6675 K-type thermocouple converter on SPI.
//!
//! The chip shifts out one 16-bit big-endian frame per chip-select cycle:
//!
//! ```text
//!  15  14 ........ 3   2    1   0
//!  0  | 12-bit temp  | OC | ID | x
//! ```
//!
//! Temperature is in 0.25 °C steps.  Bit 2 is set when the probe is open.
//! A conversion takes up to 220 ms, so samples closer than
//! [`MIN_INTERVAL_MS`] return stale data.

use embedded_hal::spi::SpiDevice;

use crate::config::TempUnit;
use crate::error::SensorFault;

use super::{Reading, SensorSource, Unit};

pub const MIN_INTERVAL_MS: u32 = 250;

const OPEN_CIRCUIT_BIT: u16 = 1 << 2;

pub struct Max6675<SPI> {
    spi: SPI,
    unit: TempUnit,
}

impl<SPI: SpiDevice> Max6675<SPI> {
    pub fn new(spi: SPI, unit: TempUnit) -> Self {
        Self { spi, unit }
    }

    fn read_frame(&mut self) -> Result<u16, SensorFault> {
        let mut buf = [0u8; 2];
        self.spi.read(&mut buf).map_err(|_| SensorFault::ReadFailed)?;
        Ok(u16::from_be_bytes(buf))
    }
}

/// Decode a raw frame into degrees Celsius.
pub fn decode_frame(frame: u16) -> Result<f32, SensorFault> {
    if frame & OPEN_CIRCUIT_BIT != 0 {
        return Err(SensorFault::OpenCircuit);
    }
    Ok(f32::from(frame >> 3) * 0.25)
}

pub fn celsius_to_fahrenheit(c: f32) -> f32 {
    c * 9.0 / 5.0 + 32.0
}

impl<SPI: SpiDevice> SensorSource for Max6675<SPI> {
    fn sample(&mut self, now_ms: u64) -> Result<Reading, SensorFault> {
        let celsius = decode_frame(self.read_frame()?)?;
        let (value, unit) = match self.unit {
            TempUnit::Celsius => (celsius, Unit::Celsius),
            TempUnit::Fahrenheit => (celsius_to_fahrenheit(celsius), Unit::Fahrenheit),
        };
        Ok(Reading { value, unit, timestamp_ms: now_ms })
    }

    fn min_interval_ms(&self) -> u32 {
        MIN_INTERVAL_MS
    }
}
