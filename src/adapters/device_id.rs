//! Factory MAC address of this board.
//!
//! The eFuse MAC is burned at the factory and stable across reboots; the
//! broker client identity is derived from it (see [`crate::net::identity`]).

use crate::net::identity::{self, ClientId, MacAddress};

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Client identity for this board.
pub fn board_client_id(prefix: &str) -> ClientId {
    identity::client_id(prefix, &read_mac())
}
