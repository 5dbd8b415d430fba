//! Outbound readings.
//!
//! Readings go out as bare ASCII decimals with no unit and no padding:
//! volts with three decimals (`1.650`), temperatures as whole degrees
//! truncated toward zero (`212`).  Sensor faults never reach the numeric
//! topic; they go to `<topic>/fault` as the fault name.

use core::fmt::Write;

use crate::app::ports::MqttTransport;
use crate::error::SensorFault;
use crate::net::session::{BrokerSession, PublishOutcome};
use crate::sensors::Reading;

/// Room for any finite `f32` at three decimals.
pub const MAX_READING_LEN: usize = 48;

pub type ReadingPayload = heapless::String<MAX_READING_LEN>;

pub fn format_reading(reading: &Reading) -> ReadingPayload {
    let mut s = ReadingPayload::new();
    let written = match reading.unit.decimals() {
        0 => write!(s, "{}", reading.value as i64),
        places => write!(s, "{:.*}", places, reading.value),
    };
    // MAX_READING_LEN holds any finite f32 at the widest unit precision.
    debug_assert!(written.is_ok(), "reading overflowed MAX_READING_LEN");
    s
}

/// Publishes one sensor's readings to its topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publisher {
    topic: String,
    fault_topic: String,
}

impl Publisher {
    pub fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_owned(),
            fault_topic: format!("{topic}/fault"),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn fault_topic(&self) -> &str {
        &self.fault_topic
    }

    /// Format and publish.  Returns the payload for logging.
    pub fn publish<T: MqttTransport>(
        &self,
        session: &mut BrokerSession<T>,
        reading: &Reading,
    ) -> (ReadingPayload, PublishOutcome) {
        let payload = format_reading(reading);
        let outcome = session.publish(&self.topic, payload.as_bytes());
        (payload, outcome)
    }

    pub fn publish_fault<T: MqttTransport>(
        &self,
        session: &mut BrokerSession<T>,
        fault: SensorFault,
    ) -> PublishOutcome {
        session.publish(&self.fault_topic, fault.as_payload().as_bytes())
    }
}
