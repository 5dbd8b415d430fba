//! VTMS node firmware library.
//!
//! An ESP32 node on the team's MQTT bus: drives flag and pit outputs from
//! inbound commands and publishes temperature readings.  All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module; host builds get simulation stubs.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod net;
pub mod pins;
pub mod routing;
pub mod scheduler;
pub mod sensors;
pub mod telemetry;
