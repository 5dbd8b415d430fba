//! Analog voltage sender on a single ADC channel.
//!
//! `V = raw * v_ref / full_scale`, linear, no calibration curve.  Raw
//! values at or above `full_scale` cannot come from a `full_scale`-count
//! converter and are reported as out of range.

use crate::app::ports::AnalogInput;
use crate::error::SensorFault;

use super::{Reading, SensorSource, Unit};

pub struct AnalogVoltageSensor<A> {
    input: A,
    v_ref: f32,
    full_scale: u16,
}

impl<A: AnalogInput> AnalogVoltageSensor<A> {
    pub fn new(input: A, v_ref: f32, full_scale: u16) -> Self {
        Self { input, v_ref, full_scale }
    }

    pub fn input_mut(&mut self) -> &mut A {
        &mut self.input
    }
}

/// Convert ADC counts to volts.
pub fn raw_to_volts(raw: u16, v_ref: f32, full_scale: u16) -> Result<f32, SensorFault> {
    if full_scale == 0 || raw >= full_scale {
        return Err(SensorFault::OutOfRange);
    }
    Ok(f32::from(raw) * v_ref / f32::from(full_scale))
}

impl<A: AnalogInput> SensorSource for AnalogVoltageSensor<A> {
    fn sample(&mut self, now_ms: u64) -> Result<Reading, SensorFault> {
        let raw = self.input.read_raw()?;
        let value = raw_to_volts(raw, self.v_ref, self.full_scale)?;
        Ok(Reading { value, unit: Unit::Volts, timestamp_ms: now_ms })
    }
}
