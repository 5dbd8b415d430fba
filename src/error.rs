//! Unified error types for the VTMS node firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! top-level loop's error handling uniform.  All variants are `Copy` so they
//! can be carried in events and node state without allocation.
//!
//! None of these are surfaced on the bus: link and broker faults are retried,
//! dropped messages are logged, sensor faults are reported on the optional
//! `<topic>/fault` topic.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The wireless association failed.
    Link(LinkError),
    /// The broker handshake or transport failed.
    Broker(BrokerError),
    /// A sensor produced no usable reading.
    Sensor(SensorFault),
    /// Configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Broker(e) => write!(f, "broker: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Network link
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// SSID or passphrase rejected by the driver.
    InvalidCredentials,
    /// The WiFi driver returned an error code.
    Driver(i32),
    /// Association never came up within the retry budget.
    AttemptsExhausted { attempts: u32 },
    /// The startup hook aborted the retry loop.
    Cancelled,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid WiFi credentials"),
            Self::Driver(rc) => write!(f, "WiFi driver error (rc={rc})"),
            Self::AttemptsExhausted { attempts } => {
                write!(f, "association not up after {attempts} attempts")
            }
            Self::Cancelled => write!(f, "association cancelled"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Broker session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerError {
    /// Operation requires a live broker connection.
    NotConnected,
    /// Handshake refused or timed out (transport-specific code).
    Handshake(i32),
    /// SUBSCRIBE could not be sent.
    Subscribe(i32),
    /// PUBLISH could not be sent.
    Publish(i32),
    /// Handshake never succeeded within the retry budget.
    AttemptsExhausted { attempts: u32 },
    /// The startup hook aborted the retry loop.
    Cancelled,
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::Handshake(rc) => write!(f, "handshake failed (state={rc})"),
            Self::Subscribe(rc) => write!(f, "subscribe failed (rc={rc})"),
            Self::Publish(rc) => write!(f, "publish failed (rc={rc})"),
            Self::AttemptsExhausted { attempts } => {
                write!(f, "broker not connected after {attempts} attempts")
            }
            Self::Cancelled => write!(f, "connect cancelled"),
        }
    }
}

impl From<BrokerError> for Error {
    fn from(e: BrokerError) -> Self {
        Self::Broker(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor faults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorFault {
    /// Bus or ADC read failed.
    ReadFailed,
    /// Thermocouple probe is disconnected.
    OpenCircuit,
    /// Raw value is outside the converter's range.
    OutOfRange,
    /// Conversion produced NaN or infinity.
    NotANumber,
}

impl SensorFault {
    /// Payload published on `<topic>/fault`.
    pub const fn as_payload(self) -> &'static str {
        match self {
            Self::ReadFailed => "read_failed",
            Self::OpenCircuit => "open_circuit",
            Self::OutOfRange => "out_of_range",
            Self::NotANumber => "nan",
        }
    }
}

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed => write!(f, "read failed"),
            Self::OpenCircuit => write!(f, "thermocouple open"),
            Self::OutOfRange => write!(f, "reading out of range"),
            Self::NotANumber => write!(f, "reading is not a number"),
        }
    }
}

impl From<SensorFault> for Error {
    fn from(e: SensorFault) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// SSID must be 1-32 printable ASCII bytes.
    InvalidSsid,
    /// Passphrase must be empty (open network) or 8-64 bytes.
    InvalidPassphrase,
    /// Broker host empty or port zero.
    InvalidBroker,
    /// A topic or topic filter is malformed.
    InvalidPattern,
    /// Two actuators share one pin.
    DuplicatePin(i32),
    /// Two actuators listen on one topic.
    DuplicateTopic,
    /// An actuator or router-only route that no broker subscription covers.
    UnsubscribedTopic,
    /// Sampling interval must be non-zero.
    InvalidInterval,
    /// `VTMS_NODE_VARIANT` names no known preset.
    UnknownVariant,
    /// JSON config could not be parsed.
    Parse,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassphrase => {
                write!(f, "passphrase invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::InvalidBroker => write!(f, "broker host empty or port zero"),
            Self::InvalidPattern => write!(f, "malformed topic or topic filter"),
            Self::DuplicatePin(pin) => write!(f, "GPIO {pin} bound to more than one actuator"),
            Self::DuplicateTopic => write!(f, "topic bound to more than one actuator"),
            Self::UnsubscribedTopic => {
                write!(f, "actuator or route topic not covered by any subscription")
            }
            Self::InvalidInterval => write!(f, "sampling interval must be non-zero"),
            Self::UnknownVariant => write!(f, "unknown node variant"),
            Self::Parse => write!(f, "config JSON could not be parsed"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Dropped inbound messages
// ---------------------------------------------------------------------------

/// Why an inbound message produced no side effect.  Logged only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Payload is not one of the expected literals.
    MalformedPayload,
    /// No handler registered for the topic.
    UnroutableTopic,
    /// Topic or payload exceeded the inbox buffers.
    Oversized,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedPayload => write!(f, "malformed payload"),
            Self::UnroutableTopic => write!(f, "no handler for topic"),
            Self::Oversized => write!(f, "message too large"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
