//! Hardware adapter bridging GPIO and ADC1 to the domain port traits.
//!
//! This is the only module besides `main` that touches real pins.  On
//! non-espidf targets the underlying `hw_init` calls hit the in-memory
//! simulation registers.

use log::warn;

use crate::app::ports::{AnalogInput, PinWriter};
use crate::drivers::actuator_bank::Level;
use crate::drivers::hw_init;
use crate::error::SensorFault;
use crate::pins::PinId;

/// Digital outputs driven through the ESP-IDF GPIO driver.
#[derive(Debug, Default)]
pub struct GpioOutputs;

impl GpioOutputs {
    pub fn new() -> Self {
        Self
    }
}

// ── PinWriter implementation ──────────────────────────────────

impl PinWriter for GpioOutputs {
    fn configure_output(&mut self, pin: PinId) {
        if let Err(e) = hw_init::configure_output(pin) {
            warn!("GPIO{pin}: {e}");
        }
    }

    fn write(&mut self, pin: PinId, level: Level) {
        hw_init::gpio_write(pin, level.is_high());
    }
}

// ── AnalogInput implementation ────────────────────────────────

/// One ADC1 channel read in oneshot mode.
#[derive(Debug, Clone, Copy)]
pub struct OneshotAdc {
    channel: u32,
}

impl OneshotAdc {
    /// Configure `channel` and wrap it.
    pub fn new(channel: u32) -> Result<Self, hw_init::HwInitError> {
        hw_init::init_adc1_channel(channel)?;
        Ok(Self { channel })
    }
}

impl AnalogInput for OneshotAdc {
    fn read_raw(&mut self) -> Result<u16, SensorFault> {
        hw_init::adc1_read(self.channel).map_err(|rc| {
            warn!("ADC1 CH{}: read failed (rc={rc})", self.channel);
            SensorFault::ReadFailed
        })
    }
}
