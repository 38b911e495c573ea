//! Return codes reported by the mioty AT client.
//!
//! Every command round trip ends in exactly one [`ReturnCode`]. The numbering
//! follows the modem's AT protocol v2 so that values can be compared against
//! modem documentation and logs:
//!
//! - `0` is success.
//! - `1`-`15` are MAC-layer faults, taken verbatim from the `-MNFO:` /
//!   `-MERR:` field of a response ending in the `1` status line.
//! - `16`-`22` are AT-interpreter faults: the `AT!ERR:` value plus 16.
//! - `9` and `23` and above never appear on the wire; they are raised locally.

use std::fmt;

/// Offset added to the modem's `AT!ERR:` value to form an AT-tier code.
pub const AT_ERROR_OFFSET: u32 = 16;

/// Which layer produced a [`ReturnCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// The command succeeded.
    Ok,
    /// Raised by the client itself (transport failure, malformed reply).
    Local,
    /// Reported by the radio MAC layer.
    Mac,
    /// Reported by the modem's AT command interpreter.
    At,
}

/// Closed enumeration of command outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReturnCode {
    Ok = 0,
    MacError = 1,
    MacFramingError = 2,
    ArgumentSizeMismatch = 3,
    ArgumentOutOfRange = 4,
    BufferSizeInsufficient = 5,
    MacNodeNotAttached = 6,
    MacNetworkKeyNotSet = 7,
    MacAlreadyAttached = 8,
    /// Generic client-side error; not part of the wire protocol.
    Err = 9,
    MacDownlinkNotAvailable = 10,
    UplinkPackingError = 11,
    MacNoDownlinkReceived = 12,
    MacOptionNotAllowed = 13,
    MacDownlinkError = 14,
    MacDefaultsNotSet = 15,
    /// AT error status line without an `AT!ERR:` field.
    AtError = 16,
    AtGenericError = 17,
    AtCommandUnknown = 18,
    AtParamOutOfBounds = 19,
    AtDataSizeMismatch = 20,
    AtUnexpectedChar = 21,
    AtArgInvalid = 22,
    /// The transport reported a hard read failure.
    ReadFailed = 23,
    /// The reply did not fit in the response buffer.
    ResponseOverflow = 24,
    /// The reply carried a status line but its payload could not be parsed.
    MalformedResponse = 25,
    /// No status line arrived within the configured number of idle polls.
    NoResponse = 26,
}

impl ReturnCode {
    /// Map a MAC-tier wire value (`-MNFO:` / `-MERR:`) to a return code.
    ///
    /// `0` is reserved on the wire and, like any value above 15, collapses
    /// to the generic [`ReturnCode::MacError`].
    pub fn from_mac(value: u32) -> Self {
        match value {
            1 => ReturnCode::MacError,
            2 => ReturnCode::MacFramingError,
            3 => ReturnCode::ArgumentSizeMismatch,
            4 => ReturnCode::ArgumentOutOfRange,
            5 => ReturnCode::BufferSizeInsufficient,
            6 => ReturnCode::MacNodeNotAttached,
            7 => ReturnCode::MacNetworkKeyNotSet,
            8 => ReturnCode::MacAlreadyAttached,
            9 => ReturnCode::Err,
            10 => ReturnCode::MacDownlinkNotAvailable,
            11 => ReturnCode::UplinkPackingError,
            12 => ReturnCode::MacNoDownlinkReceived,
            13 => ReturnCode::MacOptionNotAllowed,
            14 => ReturnCode::MacDownlinkError,
            15 => ReturnCode::MacDefaultsNotSet,
            _ => ReturnCode::MacError,
        }
    }

    /// Map an AT-tier wire value (`AT!ERR:`) to a return code (value + 16).
    ///
    /// Values the client does not know about become [`ReturnCode::AtError`].
    pub fn from_at(value: u32) -> Self {
        match value.wrapping_add(AT_ERROR_OFFSET) {
            17 => ReturnCode::AtGenericError,
            18 => ReturnCode::AtCommandUnknown,
            19 => ReturnCode::AtParamOutOfBounds,
            20 => ReturnCode::AtDataSizeMismatch,
            21 => ReturnCode::AtUnexpectedChar,
            22 => ReturnCode::AtArgInvalid,
            _ => ReturnCode::AtError,
        }
    }

    /// Numeric value of this code.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// The layer this code belongs to.
    pub fn tier(self) -> Tier {
        match self as u8 {
            0 => Tier::Ok,
            9 | 23.. => Tier::Local,
            1..=15 => Tier::Mac,
            _ => Tier::At,
        }
    }

    /// Whether this is [`ReturnCode::Ok`].
    pub fn is_ok(self) -> bool {
        self == ReturnCode::Ok
    }

    fn description(self) -> &'static str {
        match self {
            ReturnCode::Ok => "ok",
            ReturnCode::MacError => "MAC error",
            ReturnCode::MacFramingError => "MAC framing error",
            ReturnCode::ArgumentSizeMismatch => "argument size mismatch",
            ReturnCode::ArgumentOutOfRange => "argument out of range",
            ReturnCode::BufferSizeInsufficient => "buffer size insufficient",
            ReturnCode::MacNodeNotAttached => "node not attached",
            ReturnCode::MacNetworkKeyNotSet => "network key not set",
            ReturnCode::MacAlreadyAttached => "node already attached",
            ReturnCode::Err => "error",
            ReturnCode::MacDownlinkNotAvailable => "downlink not available",
            ReturnCode::UplinkPackingError => "uplink packing error",
            ReturnCode::MacNoDownlinkReceived => "no downlink received",
            ReturnCode::MacOptionNotAllowed => "option not allowed",
            ReturnCode::MacDownlinkError => "downlink error",
            ReturnCode::MacDefaultsNotSet => "factory defaults not set",
            ReturnCode::AtError => "AT error",
            ReturnCode::AtGenericError => "AT generic error",
            ReturnCode::AtCommandUnknown => "AT command unknown",
            ReturnCode::AtParamOutOfBounds => "AT parameter out of bounds",
            ReturnCode::AtDataSizeMismatch => "AT data size mismatch",
            ReturnCode::AtUnexpectedChar => "AT unexpected character",
            ReturnCode::AtArgInvalid => "AT argument invalid",
            ReturnCode::ReadFailed => "read failed",
            ReturnCode::ResponseOverflow => "response overflow",
            ReturnCode::MalformedResponse => "malformed response",
            ReturnCode::NoResponse => "no response",
        }
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_u8())
    }
}

impl From<ReturnCode> for u8 {
    fn from(code: ReturnCode) -> Self {
        code.as_u8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_values_map_directly() {
        for value in 1..=15u32 {
            assert_eq!(ReturnCode::from_mac(value).as_u8() as u32, value);
        }
        assert_eq!(ReturnCode::from_mac(6), ReturnCode::MacNodeNotAttached);
    }

    #[test]
    fn mac_reserved_and_unknown_values_are_generic() {
        assert_eq!(ReturnCode::from_mac(0), ReturnCode::MacError);
        assert_eq!(ReturnCode::from_mac(16), ReturnCode::MacError);
        assert_eq!(ReturnCode::from_mac(255), ReturnCode::MacError);
    }

    #[test]
    fn at_values_are_offset_by_sixteen() {
        assert_eq!(ReturnCode::from_at(3), ReturnCode::AtParamOutOfBounds);
        assert_eq!(ReturnCode::from_at(3).as_u8(), 19);
        for value in 1..=6u32 {
            assert_eq!(ReturnCode::from_at(value).as_u8() as u32, value + 16);
        }
    }

    #[test]
    fn at_unknown_values_are_generic() {
        assert_eq!(ReturnCode::from_at(0), ReturnCode::AtError);
        assert_eq!(ReturnCode::from_at(7), ReturnCode::AtError);
        assert_eq!(ReturnCode::from_at(u32::MAX), ReturnCode::AtError);
    }

    #[test]
    fn tiers() {
        assert_eq!(ReturnCode::Ok.tier(), Tier::Ok);
        assert_eq!(ReturnCode::MacError.tier(), Tier::Mac);
        assert_eq!(ReturnCode::MacDefaultsNotSet.tier(), Tier::Mac);
        assert_eq!(ReturnCode::Err.tier(), Tier::Local);
        assert_eq!(ReturnCode::AtError.tier(), Tier::At);
        assert_eq!(ReturnCode::AtArgInvalid.tier(), Tier::At);
        assert_eq!(ReturnCode::ReadFailed.tier(), Tier::Local);
        assert_eq!(ReturnCode::NoResponse.tier(), Tier::Local);
    }

    #[test]
    fn display_includes_number() {
        assert_eq!(
            ReturnCode::MacNodeNotAttached.to_string(),
            "node not attached (6)"
        );
        assert_eq!(ReturnCode::ReadFailed.to_string(), "read failed (23)");
    }
}
