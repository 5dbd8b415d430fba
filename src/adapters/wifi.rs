//! WiFi station-mode adapter.
//!
//! Implements [`LinkPort`], the hexagonal boundary for network
//! association.  The adapter never waits: [`NetworkLink`] owns the retry
//! and backoff policy.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! [`NetworkLink`]: crate::net::link::NetworkLink

use log::{info, warn};

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};

use crate::app::ports::LinkPort;
use crate::config::WifiCredentials;
use crate::error::LinkError;

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimRadio,
}

/// Simulated radio: associates after a number of status polls.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
struct SimRadio {
    started: bool,
    up: bool,
    polls_left: u32,
    needs_reassociate: bool,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: EspWifi<'static>) -> Self {
        Self {
            wifi,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            sim: SimRadio::default(),
        }
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_begin(&mut self) -> Result<(), LinkError> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: self.ssid.as_str().try_into().map_err(|_| LinkError::InvalidCredentials)?,
            password: self.password.as_str().try_into().map_err(|_| LinkError::InvalidCredentials)?,
            auth_method,
            ..Default::default()
        });
        self.wifi.set_configuration(&config).map_err(driver_error)?;
        if !self.wifi.is_started().map_err(driver_error)? {
            self.wifi.start().map_err(driver_error)?;
        }
        self.wifi.connect().map_err(driver_error)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_begin(&mut self) -> Result<(), LinkError> {
        self.sim.started = true;
        info!("WiFi(sim): started, {} polls to associate", self.sim.polls_left);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_associated(&mut self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
            && self.wifi.sta_netif().is_up().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_associated(&mut self) -> bool {
        let sim = &mut self.sim;
        if !sim.started || sim.needs_reassociate {
            return false;
        }
        if !sim.up {
            if sim.polls_left == 0 {
                sim.up = true;
            } else {
                sim.polls_left -= 1;
            }
        }
        sim.up
    }

    #[cfg(target_os = "espidf")]
    fn platform_reassociate(&mut self) -> Result<(), LinkError> {
        // Already associating: the driver reports ESP_ERR_WIFI_CONN, not a fault.
        match self.wifi.connect() {
            Ok(()) => Ok(()),
            Err(e) if e.code() == esp_idf_svc::sys::ESP_ERR_WIFI_CONN as i32 => Ok(()),
            Err(e) => Err(driver_error(e)),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_reassociate(&mut self) -> Result<(), LinkError> {
        self.sim.needs_reassociate = false;
        Ok(())
    }

    // ── Simulation controls ───────────────────────────────────

    /// Association completes after `polls` further status checks.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_associate_after(&mut self, polls: u32) {
        self.sim.polls_left = polls;
    }

    /// Drop the association.  It returns `polls` checks after the next
    /// reassociate request.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_link(&mut self, polls: u32) {
        self.sim.up = false;
        self.sim.polls_left = polls;
        self.sim.needs_reassociate = true;
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
fn driver_error(e: esp_idf_svc::sys::EspError) -> LinkError {
    LinkError::Driver(e.code())
}

// ───────────────────────────────────────────────────────────────
// LinkPort
// ───────────────────────────────────────────────────────────────

impl LinkPort for WifiAdapter {
    fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), LinkError> {
        self.ssid.clear();
        self.ssid
            .push_str(&credentials.ssid)
            .map_err(|_| LinkError::InvalidCredentials)?;
        self.password.clear();
        self.password
            .push_str(&credentials.passphrase)
            .map_err(|_| LinkError::InvalidCredentials)?;

        info!("WiFi: connecting to '{}'", self.ssid);
        self.platform_begin().inspect_err(|e| warn!("WiFi: start failed ({e})"))
    }

    fn is_associated(&mut self) -> bool {
        self.platform_is_associated()
    }

    fn reassociate(&mut self) -> Result<(), LinkError> {
        if self.ssid.is_empty() {
            return Err(LinkError::InvalidCredentials);
        }
        info!("WiFi: reconnecting to '{}'", self.ssid);
        self.platform_reassociate()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
