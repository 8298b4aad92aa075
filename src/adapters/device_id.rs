//! Device identity derived from the ESP32 factory MAC address.
//!
//! The default hostname is `doorbell` followed by the last 3 bytes of the
//! 6-byte MAC in uppercase hex (e.g. `doorbellAABBCC`).  It is stable across
//! reboots (factory-burned eFuse MAC) and serves as the Wi-Fi hostname and,
//! unless `mqtt_topic.txt` says otherwise, as the bus topic.

use core::fmt::Write;

use crate::config::DEFAULT_HOSTNAME;

/// Fixed-size hostname: "doorbell" + 6 hex chars.
pub type HostnameString = heapless::String<24>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: the buffer is exactly the 6 bytes the call writes.
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

/// Derive the default hostname from the last 3 MAC bytes.
pub fn default_hostname(mac: &MacAddress) -> HostnameString {
    let mut name = HostnameString::new();
    let _ = write!(
        name,
        "{}{:02X}{:02X}{:02X}",
        DEFAULT_HOSTNAME, mac[3], mac[4], mac[5]
    );
    name
}
