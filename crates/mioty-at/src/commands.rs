//! AT command descriptors and frame builders.
//!
//! Each modem feature is addressed by a short mnemonic (`AT-MEUI`, `AT+IPR`,
//! ...). This module defines one [`Command`] constant per mnemonic and one
//! `cmd_*` builder per operation, producing the exact bytes to write to the
//! transport.
//!
//! All builders are pure: they return a [`Frame`] without performing I/O.
//! Builders for binary payloads return [`Result`] because payloads longer
//! than [`MAX_PAYLOAD_LEN`](crate::protocol::MAX_PAYLOAD_LEN) cannot be
//! framed.

use mioty_core::{FactoryDefaults, Result};

use crate::protocol::{
    Frame, encode_action, encode_query, encode_set_bytes, encode_set_int,
};

/// Longest mnemonic the protocol defines.
pub const MAX_MNEMONIC_LEN: usize = 7;

/// Namespace prefix every mnemonic starts with; responses omit it.
const NAMESPACE_LEN: usize = 2;

/// Immutable identifier of one protocol operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command {
    mnemonic: &'static str,
}

impl Command {
    /// Define a command. Evaluated at compile time for the constants below.
    pub const fn new(mnemonic: &'static str) -> Self {
        assert!(mnemonic.len() > NAMESPACE_LEN && mnemonic.len() <= MAX_MNEMONIC_LEN);
        Command { mnemonic }
    }

    /// Full mnemonic as written on the wire (e.g. `AT-MEUI`).
    pub fn mnemonic(&self) -> &'static str {
        self.mnemonic
    }

    /// Length of the mnemonic in bytes.
    pub fn mnemonic_len(&self) -> usize {
        self.mnemonic.len()
    }

    /// Tag echoed by the modem in front of this command's data field.
    ///
    /// The `AT` namespace prefix is not repeated in responses, so
    /// `AT-MEUI` answers with `-MEUI:` and `AT+IPR` with `+IPR:`.
    pub fn tag(&self) -> &'static str {
        &self.mnemonic[NAMESPACE_LEN..]
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic)
    }
}

// ---------------------------------------------------------------
// Command descriptors
// ---------------------------------------------------------------

/// Soft reset; persistent fields keep their values.
pub const RESET: Command = Command::new("AT-RST");
/// Reset to factory defaults.
pub const FACTORY_RESET: Command = Command::new("ATZ");
/// Write factory defaults (only while none are stored).
pub const SET_DEFAULTS: Command = Command::new("AT-DEF");
pub const NETWORK_KEY: Command = Command::new("AT-MNWK");
pub const IPV6_SUBNET_MASK: Command = Command::new("AT-MIP6");
pub const EUI64: Command = Command::new("AT-MEUI");
pub const SHORT_ADDRESS: Command = Command::new("AT-MSAD");
pub const PACKET_COUNTER: Command = Command::new("AT-MPCT");
pub const BAUD_RATE: Command = Command::new("AT+IPR");
pub const TRANSMIT_POWER: Command = Command::new("AT-UTPL");
pub const UPLINK_MODE: Command = Command::new("AT-UM");
pub const UPLINK_SYNC_BURST: Command = Command::new("AT-US");
pub const UPLINK_PROFILE: Command = Command::new("AT-UP");
pub const APP_CRYPTO_MODE: Command = Command::new("AT-ACM");
pub const APP_CRYPTO_KEY: Command = Command::new("AT-ACK");
/// Unidirectional uplink without MAC (transparent).
pub const SEND_UNI_TRANSPARENT: Command = Command::new("AT-TU");
/// Unidirectional uplink; payload starts with the MPF field.
pub const SEND_UNI_MPF: Command = Command::new("AT-UMPF");
/// Unidirectional uplink.
pub const SEND_UNI: Command = Command::new("AT-U");
/// Bidirectional uplink without MAC (transparent).
pub const SEND_BIDI_TRANSPARENT: Command = Command::new("AT-TB");
/// Bidirectional uplink; payload starts with the MPF field.
pub const SEND_BIDI_MPF: Command = Command::new("AT-BMPF");
/// Bidirectional uplink.
pub const SEND_BIDI: Command = Command::new("AT-B");
/// Over-the-air MAC detach.
pub const MAC_DETACH: Command = Command::new("AT-MDOA");
/// Over-the-air MAC attach.
pub const MAC_ATTACH: Command = Command::new("AT-MAOA");
/// Local MAC attach.
pub const MAC_ATTACH_LOCAL: Command = Command::new("AT-MALO");
/// Local MAC detach.
pub const MAC_DETACH_LOCAL: Command = Command::new("AT-MDLO");

/// Length of the nonce carried by an over-the-air attach.
pub const ATTACH_NONCE_LEN: usize = 4;

// ---------------------------------------------------------------
// Frame builders
// ---------------------------------------------------------------

/// `AT-RST\r`
pub fn cmd_reset() -> Frame {
    encode_action(RESET)
}

/// `ATZ\r`
pub fn cmd_factory_reset() -> Frame {
    encode_action(FACTORY_RESET)
}

/// `AT-DEF=64\t<128 hex chars>\x1A\r`
pub fn cmd_set_defaults(defaults: &FactoryDefaults) -> Result<Frame> {
    encode_set_bytes(SET_DEFAULTS, &defaults.to_bytes())
}

/// `AT-MNWK=16\t<key>\x1A\r`
pub fn cmd_set_network_key(key: &[u8; 16]) -> Result<Frame> {
    encode_set_bytes(NETWORK_KEY, key)
}

/// `AT-MIP6?\r`
pub fn cmd_read_ipv6_subnet_mask() -> Frame {
    encode_query(IPV6_SUBNET_MASK)
}

/// `AT-MIP6=8\t<mask>\x1A\r`
pub fn cmd_set_ipv6_subnet_mask(mask: &[u8; 8]) -> Result<Frame> {
    encode_set_bytes(IPV6_SUBNET_MASK, mask)
}

/// `AT-MEUI?\r`
pub fn cmd_read_eui() -> Frame {
    encode_query(EUI64)
}

/// `AT-MEUI=8\t<eui>\x1A\r`
pub fn cmd_set_eui(eui: &[u8; 8]) -> Result<Frame> {
    encode_set_bytes(EUI64, eui)
}

/// `AT-MSAD?\r`
pub fn cmd_read_short_address() -> Frame {
    encode_query(SHORT_ADDRESS)
}

/// `AT-MSAD=2\t<addr>\x1A\r`
pub fn cmd_set_short_address(addr: &[u8; 2]) -> Result<Frame> {
    encode_set_bytes(SHORT_ADDRESS, addr)
}

/// `AT-MPCT?\r`
pub fn cmd_read_packet_counter() -> Frame {
    encode_query(PACKET_COUNTER)
}

/// Query form of any integer-valued setting (`<mnemonic>?\r`).
pub fn cmd_read_int(command: Command) -> Frame {
    encode_query(command)
}

/// Set form of any integer-valued setting (`<mnemonic>=<n>\r`).
pub fn cmd_set_int(command: Command, value: u32) -> Frame {
    encode_set_int(command, value)
}

/// `AT-ACK=16\t<key>\x1A\r`
pub fn cmd_set_app_crypto_key(key: &[u8; 16]) -> Result<Frame> {
    encode_set_bytes(APP_CRYPTO_KEY, key)
}

/// Uplink/downlink message frame for one of the six send commands.
pub fn cmd_send(command: Command, msg: &[u8]) -> Result<Frame> {
    encode_set_bytes(command, msg)
}

/// `AT-MAOA=4\t<nonce>\x1A\r`
pub fn cmd_mac_attach(nonce: &[u8; ATTACH_NONCE_LEN]) -> Result<Frame> {
    encode_set_bytes(MAC_ATTACH, nonce)
}

/// `AT-MDOA=<n>\t<data>\x1A\r`
pub fn cmd_mac_detach(data: &[u8]) -> Result<Frame> {
    encode_set_bytes(MAC_DETACH, data)
}

/// `AT-MALO\r`
pub fn cmd_mac_attach_local() -> Frame {
    encode_action(MAC_ATTACH_LOCAL)
}

/// `AT-MDLO\r`
pub fn cmd_mac_detach_local() -> Frame {
    encode_action(MAC_DETACH_LOCAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_drop_namespace() {
        assert_eq!(EUI64.tag(), "-MEUI");
        assert_eq!(BAUD_RATE.tag(), "+IPR");
        assert_eq!(SEND_BIDI.tag(), "-B");
        assert_eq!(FACTORY_RESET.tag(), "Z");
    }

    #[test]
    fn mnemonic_lengths() {
        assert_eq!(NETWORK_KEY.mnemonic_len(), 7);
        assert_eq!(SEND_UNI.mnemonic_len(), 4);
        assert_eq!(FACTORY_RESET.mnemonic_len(), 3);
        assert_eq!(UPLINK_MODE.to_string(), "AT-UM");
    }

    #[test]
    fn reset_frames() {
        assert_eq!(&cmd_reset()[..], b"AT-RST\r");
        assert_eq!(&cmd_factory_reset()[..], b"ATZ\r");
    }

    #[test]
    fn local_mac_frames() {
        assert_eq!(&cmd_mac_attach_local()[..], b"AT-MALO\r");
        assert_eq!(&cmd_mac_detach_local()[..], b"AT-MDLO\r");
    }

    #[test]
    fn query_frames() {
        assert_eq!(&cmd_read_eui()[..], b"AT-MEUI?\r");
        assert_eq!(&cmd_read_ipv6_subnet_mask()[..], b"AT-MIP6?\r");
        assert_eq!(&cmd_read_short_address()[..], b"AT-MSAD?\r");
        assert_eq!(&cmd_read_packet_counter()[..], b"AT-MPCT?\r");
        assert_eq!(&cmd_read_int(BAUD_RATE)[..], b"AT+IPR?\r");
    }

    #[test]
    fn set_int_frames() {
        assert_eq!(&cmd_set_int(TRANSMIT_POWER, 14)[..], b"AT-UTPL=14\r");
        assert_eq!(&cmd_set_int(BAUD_RATE, 115_200)[..], b"AT+IPR=115200\r");
        assert_eq!(&cmd_set_int(UPLINK_MODE, 0)[..], b"AT-UM=0\r");
    }

    #[test]
    fn set_eui_frame() {
        let frame = cmd_set_eui(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]).unwrap();
        assert_eq!(&frame[..], b"AT-MEUI=8\t0102030405060708\x1A\r");
    }

    #[test]
    fn set_network_key_frame_uses_two_digit_length() {
        let frame = cmd_set_network_key(&[0xAB; 16]).unwrap();
        let mut expected = b"AT-MNWK=16\t".to_vec();
        expected.extend(std::iter::repeat_n(*b"AB", 16).flatten());
        expected.extend_from_slice(b"\x1A\r");
        assert_eq!(&frame[..], &expected[..]);
    }

    #[test]
    fn mac_attach_frame() {
        let frame = cmd_mac_attach(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        assert_eq!(&frame[..], b"AT-MAOA=4\tDEADBEEF\x1A\r");
    }

    #[test]
    fn mac_detach_with_empty_data() {
        let frame = cmd_mac_detach(&[]).unwrap();
        assert_eq!(&frame[..], b"AT-MDOA=0\t\x1A\r");
    }

    #[test]
    fn send_frame() {
        let frame = cmd_send(SEND_UNI, b"hi").unwrap();
        assert_eq!(&frame[..], b"AT-U=2\t6869\x1A\r");
    }

    #[test]
    fn set_defaults_frame() {
        let defaults = FactoryDefaults {
            eui64: [0; 8],
            ipv6_subnet_mask: [0; 8],
            network_key: [0; 16],
            short_address: [0; 2],
            app_crypto_key: [0; 16],
            uplink_profile: 0,
            uplink_mode: 0,
            uplink_sync_burst: 0,
            app_crypto_mode: 0,
            attached_on_first_boot: 0,
        };
        let frame = cmd_set_defaults(&defaults).unwrap();
        assert!(frame.starts_with(b"AT-DEF=64\t38A907BF"));
        assert!(frame.ends_with(b"\x1A\r"));
        assert_eq!(frame.len(), "AT-DEF=64\t".len() + 128 + 2);
    }
}
