//! Application core: node logic with all I/O behind ports.
//!
//! [`node::NodeLoop`] ties link, broker session, router, actuators and
//! sensors together.  Interaction with hardware and the network happens
//! through the **port traits** in [`ports`], keeping this layer testable
//! without real peripherals.

pub mod events;
pub mod node;
pub mod ports;
