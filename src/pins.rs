//! GPIO / peripheral pin assignments for the VTMS node boards.
//!
//! Single source of truth for the presets in [`crate::config`].  Each node
//! variant is a different board, so the groups below may reuse pins.

/// Raw ESP-IDF GPIO number.
pub type PinId = i32;

// ---------------------------------------------------------------------------
// Flag-light controller (four relay/LED outputs, active HIGH)
// ---------------------------------------------------------------------------

pub const BLACK_FLAG_GPIO: PinId = 14;
pub const RED_FLAG_GPIO: PinId = 27;
pub const PIT_SOON_GPIO: PinId = 26;
/// Strapping pin on ESP32; the relay board pulls it low at boot.
pub const BOX_BOX_GPIO: PinId = 12;

// ---------------------------------------------------------------------------
// Analog sensor node
// ---------------------------------------------------------------------------

/// Sender voltage input, `A0` on the DevKit silkscreen (GPIO 36).
pub const SENSOR_ADC_GPIO: PinId = 36;
/// ADC1 channel for GPIO 36.
pub const SENSOR_ADC1_CHANNEL: u32 = 0;

// ---------------------------------------------------------------------------
// Thermocouple node (MAX6675 on HSPI)
// ---------------------------------------------------------------------------

pub const THERMO_DO_GPIO: PinId = 12;
pub const THERMO_CS_GPIO: PinId = 15;
pub const THERMO_CLK_GPIO: PinId = 14;
/// MAX6675 has no data input; HSPI still needs a MOSI pin.
pub const THERMO_UNUSED_MOSI_GPIO: PinId = 13;
/// MAX6675 SCK ceiling is 4.3 MHz.
pub const THERMO_SPI_BAUD_HZ: u32 = 1_000_000;
