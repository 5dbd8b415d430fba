//! Broker client identity.
//!
//! `<prefix><MAC>` with the MAC in the colon-separated uppercase form the
//! Arduino core prints (`esp32-client-24:6F:28:AA:BB:CC`).  The factory MAC
//! makes the identity unique per board with no central allocation.

use core::fmt::Write;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Longest accepted `client_id_prefix`.
pub const MAX_PREFIX_LEN: usize = 40;

/// `MAX_PREFIX_LEN` + 17 MAC characters, rounded up.
pub type ClientId = heapless::String<64>;

/// `AA:BB:CC:DD:EE:FF`.
pub fn format_mac(mac: &MacAddress) -> heapless::String<17> {
    let mut s = heapless::String::new();
    let _ = write!(
        s,
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    );
    s
}

/// Client identity for `mac`.  A prefix longer than [`MAX_PREFIX_LEN`] is
/// cut at the limit.
pub fn client_id(prefix: &str, mac: &MacAddress) -> ClientId {
    let mut id = ClientId::new();
    let cut = prefix
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= MAX_PREFIX_LEN)
        .last()
        .unwrap_or(0);
    let _ = id.push_str(&prefix[..cut]);
    let _ = id.push_str(&format_mac(mac));
    id
}
