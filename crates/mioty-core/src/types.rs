//! Value types shared across the mioty AT client.

use std::fmt;

/// MAC state byte reported in the `-MSTA:` field of attach/detach replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacState(pub u8);

impl MacState {
    /// Raw state value as reported by the modem.
    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for MacState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MSTA {}", self.0)
    }
}

/// Outcome of a bidirectional send.
///
/// The downlink payload itself is written into the caller's buffer;
/// `downlink_len` says how many bytes of it are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidiReceipt {
    /// Number of downlink bytes written into the caller's buffer; zero when
    /// the reply carried no downlink field.
    pub downlink_len: usize,
    /// Packet counter after the transmission, if the modem reported one.
    pub packet_counter: Option<u32>,
}

/// Length of the factory defaults record carried by `AT-DEF`.
pub const FACTORY_DEFAULTS_LEN: usize = 64;

/// Marker word the modem expects at the start of the defaults record.
pub const FACTORY_DEFAULTS_MAGIC: u32 = 0xBF07_A938;

/// Factory defaults written once to a fresh modem with `AT-DEF`.
///
/// The modem only accepts this record while no defaults are stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryDefaults {
    pub eui64: [u8; 8],
    pub ipv6_subnet_mask: [u8; 8],
    pub network_key: [u8; 16],
    pub short_address: [u8; 2],
    pub app_crypto_key: [u8; 16],
    /// Uplink profile (0-3, EU0 to US0).
    pub uplink_profile: u8,
    /// Uplink mode (0-2).
    pub uplink_mode: u8,
    /// Uplink sync burst enable (0/1).
    pub uplink_sync_burst: u8,
    /// Application crypto mode (0/1).
    pub app_crypto_mode: u8,
    /// Whether the node starts attached on first boot (0/1).
    pub attached_on_first_boot: u8,
}

impl FactoryDefaults {
    /// Serialise into the 64-byte little-endian record layout.
    ///
    /// ```text
    ///  0..4   magic 0xBF07A938 (LE)     24..40  network key
    ///  4      uplink profile            40..42  short address
    ///  5      uplink mode               42      app crypto mode
    ///  6      uplink sync burst         43      attached on first boot
    ///  8..16  EUI64                     48..64  app crypto key
    /// 16..24  IPv6 subnet mask
    /// ```
    ///
    /// Bytes 7 and 44..48 are reserved and zero.
    pub fn to_bytes(&self) -> [u8; FACTORY_DEFAULTS_LEN] {
        let mut rec = [0u8; FACTORY_DEFAULTS_LEN];
        rec[0..4].copy_from_slice(&FACTORY_DEFAULTS_MAGIC.to_le_bytes());
        rec[4] = self.uplink_profile;
        rec[5] = self.uplink_mode;
        rec[6] = self.uplink_sync_burst;
        rec[8..16].copy_from_slice(&self.eui64);
        rec[16..24].copy_from_slice(&self.ipv6_subnet_mask);
        rec[24..40].copy_from_slice(&self.network_key);
        rec[40..42].copy_from_slice(&self.short_address);
        rec[42] = self.app_crypto_mode;
        rec[43] = self.attached_on_first_boot;
        rec[48..64].copy_from_slice(&self.app_crypto_key);
        rec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FactoryDefaults {
        FactoryDefaults {
            eui64: [0x70, 0xB3, 0xD5, 0x67, 0x70, 0x00, 0x00, 0x01],
            ipv6_subnet_mask: [0xFE, 0x80, 0, 0, 0, 0, 0, 0],
            network_key: [0x11; 16],
            short_address: [0xAB, 0xCD],
            app_crypto_key: [0x22; 16],
            uplink_profile: 1,
            uplink_mode: 2,
            uplink_sync_burst: 1,
            app_crypto_mode: 1,
            attached_on_first_boot: 0,
        }
    }

    #[test]
    fn defaults_record_layout() {
        let rec = sample().to_bytes();
        assert_eq!(&rec[0..4], &[0x38, 0xA9, 0x07, 0xBF]);
        assert_eq!(rec[4..8], [1, 2, 1, 0]);
        assert_eq!(rec[8..16], [0x70, 0xB3, 0xD5, 0x67, 0x70, 0x00, 0x00, 0x01]);
        assert_eq!(rec[16..18], [0xFE, 0x80]);
        assert!(rec[24..40].iter().all(|&b| b == 0x11));
        assert_eq!(rec[40..42], [0xAB, 0xCD]);
        assert_eq!(rec[42..48], [1, 0, 0, 0, 0, 0]);
        assert!(rec[48..64].iter().all(|&b| b == 0x22));
    }

    #[test]
    fn mac_state_display() {
        assert_eq!(MacState(3).to_string(), "MSTA 3");
        assert_eq!(MacState(3).value(), 3);
    }
}
