//! Outbound node events.
//!
//! The [`NodeLoop`](super::node::NodeLoop) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Events borrow from the
//! loop's state and live only for the duration of `emit`.

use crate::drivers::actuator_bank::Level;
use crate::error::{DropReason, Error, SensorFault};
use crate::net::session::{ConnectionState, PublishOutcome};
use crate::pins::PinId;

/// Structured events emitted by the node loop.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent<'a> {
    /// Startup finished; the node is running.
    Started { client_id: &'a str },

    /// Startup gave up.  The node does nothing further.
    StartupFailed(Error),

    /// Link or broker state moved.
    ConnectionChanged { from: ConnectionState, to: ConnectionState },

    /// An actuator command was applied.  `changed` is false for repeats.
    ActuatorSet { topic: &'a str, pin: PinId, level: Level, changed: bool },

    /// Inbound message routed to a log-only handler.
    MessageLogged { topic: &'a str, payload: &'a str },

    /// Inbound message produced no side effect.
    MessageDropped { topic: &'a str, reason: DropReason },

    /// Debug verbosity toggled over the bus.
    VerbosityChanged { verbose: bool },

    ReadingPublished { sensor: &'a str, payload: &'a str, outcome: PublishOutcome },

    SensorFaulted { sensor: &'a str, fault: SensorFault },
}
