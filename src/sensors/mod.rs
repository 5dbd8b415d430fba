//! Sensor subsystem: the [`SensorSource`] seam and its two drivers.
//!
//! Each configured sensor becomes one [`SensorChannel`] owned by the node
//! loop, which pairs the driver with its sampling schedule and publisher.

pub mod analog;
pub mod thermocouple;

use crate::config::SensorBinding;
use crate::error::SensorFault;
use crate::scheduler::SampleSchedule;
use crate::telemetry::Publisher;

/// Physical unit of a [`Reading`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Volts,
    Celsius,
    Fahrenheit,
}

impl Unit {
    /// Decimal places carried on the wire.  Temperatures are whole degrees.
    pub const fn decimals(self) -> usize {
        match self {
            Self::Volts => 3,
            Self::Celsius | Self::Fahrenheit => 0,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Volts => "V",
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub value: f32,
    pub unit: Unit,
    pub timestamp_ms: u64,
}

impl Reading {
    /// Reject NaN and infinities before they reach the wire.
    pub fn checked(self) -> Result<Self, SensorFault> {
        if self.value.is_finite() {
            Ok(self)
        } else {
            Err(SensorFault::NotANumber)
        }
    }
}

/// A pull-sampled measurement source.
pub trait SensorSource {
    fn sample(&mut self, now_ms: u64) -> Result<Reading, SensorFault>;

    /// Shortest spacing the hardware tolerates between samples.
    fn min_interval_ms(&self) -> u32 {
        0
    }
}

/// One configured sensor as the node loop drives it.
pub struct SensorChannel {
    id: String,
    source: Box<dyn SensorSource>,
    schedule: SampleSchedule,
    publisher: Publisher,
}

impl SensorChannel {
    pub fn new(binding: &SensorBinding, source: Box<dyn SensorSource>) -> Self {
        let schedule = SampleSchedule::new(binding.interval_ms, source.min_interval_ms());
        Self {
            id: binding.id.clone(),
            source,
            schedule,
            publisher: Publisher::new(&binding.topic),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub fn schedule(&self) -> &SampleSchedule {
        &self.schedule
    }

    /// Sample if due.  `None` when not yet time.
    pub fn poll(&mut self, now_ms: u64) -> Option<Result<Reading, SensorFault>> {
        if !self.schedule.is_due(now_ms) {
            return None;
        }
        self.schedule.mark(now_ms);
        Some(self.source.sample(now_ms).and_then(Reading::checked))
    }
}
