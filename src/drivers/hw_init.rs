//! One-shot hardware peripheral initialization and raw pin access.
//!
//! Configures ADC1 channels and GPIO outputs using raw ESP-IDF sys calls.
//! Called from `main()` and from the pin adapter before the loop starts.
//!
//! On host targets the same functions operate on in-memory registers so
//! adapters and tests can observe writes and inject ADC values.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

use crate::pins::PinId;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc)    => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: Must be called only from the single-threaded init path or the
/// main-loop ADC read path.  `init_adc1_channel()` runs before the loop.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

/// Configure one ADC1 channel for 12-bit reads over the full 0-3.3 V range.
/// The unit is created on first use.
#[cfg(target_os = "espidf")]
pub fn init_adc1_channel(channel: u32) -> Result<(), HwInitError> {
    // SAFETY: ADC1_HANDLE is only written here, from the init path.
    unsafe {
        if adc1_handle().is_null() {
            let init_cfg = adc_oneshot_unit_init_cfg_t {
                unit_id: adc_unit_t_ADC_UNIT_1,
                ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
                ..Default::default()
            };
            let ret = adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE);
            if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }
        }

        let chan_cfg = adc_oneshot_chan_cfg_t {
            atten: adc_atten_t_ADC_ATTEN_DB_12,
            bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        let ret = adc_oneshot_config_channel(adc1_handle(), channel, &chan_cfg);
        if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }
    }

    info!("hw_init: ADC1 CH{} configured", channel);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_adc1_channel(channel: u32) -> Result<(), HwInitError> {
    info!("hw_init(sim): ADC1 CH{} ready", channel);
    Ok(())
}

/// Raw 12-bit conversion.  `Err` carries the driver return code.
#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Result<u16, i32> {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract, single-threaded main-loop access only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return Err(ret);
    }
    Ok(raw.max(0) as u16)
}

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(channel: u32) -> Result<u16, i32> {
    sim::adc1(channel)
}

// ── GPIO Outputs ──────────────────────────────────────────────

/// Put `pin` into push-pull output mode, driven low.
#[cfg(target_os = "espidf")]
pub fn configure_output(pin: PinId) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: gpio_config validates the pin number; main-task context only.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    unsafe { gpio_set_level(pin, 0) };
    info!("hw_init: GPIO{} configured as output", pin);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn configure_output(pin: PinId) -> Result<(), HwInitError> {
    if !(0..64).contains(&pin) {
        return Err(HwInitError::GpioConfigFailed(-1));
    }
    sim::set_gpio(pin, false);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: PinId, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // pin was validated during configure_output(). Main-loop only.
    unsafe { gpio_set_level(pin, if high { 1 } else { 0 }); }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: PinId, high: bool) {
    sim::set_gpio(pin, high);
}

// ── Host simulation registers ─────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub mod sim {
    //! In-memory GPIO and ADC1 state for host builds.

    use core::sync::atomic::{AtomicU16, AtomicU64, Ordering};

    use crate::pins::PinId;

    const ADC1_CHANNELS: usize = 8;

    static GPIO_LEVELS: AtomicU64 = AtomicU64::new(0);
    static ADC1: [AtomicU16; ADC1_CHANNELS] = [const { AtomicU16::new(0) }; ADC1_CHANNELS];

    pub(super) fn set_gpio(pin: PinId, high: bool) {
        let Ok(bit) = u32::try_from(pin) else { return };
        let Some(mask) = 1u64.checked_shl(bit) else { return };
        if high {
            GPIO_LEVELS.fetch_or(mask, Ordering::Relaxed);
        } else {
            GPIO_LEVELS.fetch_and(!mask, Ordering::Relaxed);
        }
    }

    /// Last level written to `pin`.
    pub fn gpio_level(pin: PinId) -> bool {
        u32::try_from(pin)
            .ok()
            .and_then(|bit| 1u64.checked_shl(bit))
            .is_some_and(|mask| GPIO_LEVELS.load(Ordering::Relaxed) & mask != 0)
    }

    /// Value the next `adc1_read(channel)` returns.
    pub fn set_adc1(channel: u32, raw: u16) {
        if let Some(slot) = ADC1.get(channel as usize) {
            slot.store(raw, Ordering::Relaxed);
        }
    }

    pub(super) fn adc1(channel: u32) -> Result<u16, i32> {
        ADC1.get(channel as usize)
            .map(|slot| slot.load(Ordering::Relaxed))
            .ok_or(-1)
    }
}
