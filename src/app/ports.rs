//! Port traits: the hexagonal boundary between node logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ NodeLoop (domain)
//! ```
//!
//! Driven adapters (WiFi, MQTT client, GPIO, ADC, clock, event sinks)
//! implement these traits.  The [`NodeLoop`](super::node::NodeLoop) consumes
//! them via generics, so the node logic never touches ESP-IDF directly and
//! runs unchanged against the mocks in `tests/integration`.
//!
//! Sleeping goes through [`embedded_hal::delay::DelayNs`] and the
//! thermocouple bus through [`embedded_hal::spi::SpiDevice`]; those need no
//! port of their own.

use crate::config::{BrokerConfig, WifiCredentials};
use crate::drivers::actuator_bank::Level;
use crate::error::{BrokerError, LinkError, SensorFault};
use crate::net::TransportEvent;
use crate::pins::PinId;

// ───────────────────────────────────────────────────────────────
// Network link (driven adapter: domain → WiFi driver)
// ───────────────────────────────────────────────────────────────

/// Station-mode wireless association.
pub trait LinkPort {
    /// Configure credentials and start associating.  Does not wait.
    fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), LinkError>;

    /// `true` once associated and holding an address.
    fn is_associated(&mut self) -> bool;

    /// Request a new association with the stored credentials.  Does not wait.
    fn reassociate(&mut self) -> Result<(), LinkError>;
}

// ───────────────────────────────────────────────────────────────
// Broker transport (driven adapter: domain ↔ MQTT client)
// ───────────────────────────────────────────────────────────────

/// The broker connection primitive.
///
/// Implementations buffer inbound traffic; [`next_event`](Self::next_event)
/// hands it over one event at a time and never blocks.
pub trait MqttTransport {
    /// Perform (or await) the CONNECT handshake.
    fn connect(&mut self, client_id: &str, broker: &BrokerConfig) -> Result<(), BrokerError>;

    fn is_connected(&self) -> bool;

    fn subscribe(&mut self, pattern: &str) -> Result<(), BrokerError>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), BrokerError>;

    /// Next buffered inbound event, if any.
    fn next_event(&mut self) -> Option<TransportEvent>;
}

// ───────────────────────────────────────────────────────────────
// Outputs and inputs (driven adapter: domain ↔ GPIO / ADC)
// ───────────────────────────────────────────────────────────────

/// Write-side port for digital outputs.
pub trait PinWriter {
    /// Put `pin` into output mode.  Called once per pin at boot.
    fn configure_output(&mut self, _pin: PinId) {}

    fn write(&mut self, pin: PinId, level: Level);
}

/// One quantized analog input channel.
pub trait AnalogInput {
    /// Raw conversion result in ADC counts.
    fn read_raw(&mut self) -> Result<u16, SensorFault>;
}

// ───────────────────────────────────────────────────────────────
// Time
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond tick since boot.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The node emits structured [`NodeEvent`](super::events::NodeEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::NodeEvent<'_>);
}

// ───────────────────────────────────────────────────────────────
// Startup hook (caller-visible control over blocking retries)
// ───────────────────────────────────────────────────────────────

/// Which blocking startup stage is retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupStage {
    Link,
    Broker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Continue,
    Abort,
}

/// Invoked before every startup retry sleep.
///
/// The firmware feeds the task watchdog here; tests use it to cut retry
/// loops short deterministically.
pub trait StartupHook {
    fn on_retry(&mut self, stage: StartupStage, attempt: u32) -> RetryDecision;
}

/// Hook that never aborts; the retry policy alone bounds the loop.
pub struct KeepTrying;

impl StartupHook for KeepTrying {
    fn on_retry(&mut self, _stage: StartupStage, _attempt: u32) -> RetryDecision {
        RetryDecision::Continue
    }
}

