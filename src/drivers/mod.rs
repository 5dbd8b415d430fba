//! Actuator bank, hardware initialisation, and the task watchdog.

pub mod actuator_bank;
pub mod hw_init;
pub mod watchdog;
