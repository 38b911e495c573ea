//! mioty AT text-protocol encoder and response decoder.
//!
//! Commands are ASCII lines terminated with a carriage return. Binary
//! operands travel as uppercase hex, framed by a decimal length field and a
//! TAB in front and a SUB (0x1A) behind.
//!
//! # Command formats
//!
//! ```text
//! <mnemonic>\r                          action
//! <mnemonic>?\r                         query
//! <mnemonic>=<decimal>\r                set integer
//! <mnemonic>=<len>\t<HEX>\x1A\r         set bytes (len is 1-2 digits)
//! ```
//!
//! # Response format
//!
//! A response may carry a data field (`<tag>:<value>`, where the tag is the
//! mnemonic without its `AT` prefix) and always ends with a status line:
//!
//! - `\r\n0\r\n` (or a buffer starting with `0\r\n`): success
//! - `\r\n1\r\n`: MAC error, code in `-MNFO:` or `-MERR:`
//! - `\r\n2\r\n`: AT error, code in `AT!ERR:`
//!
//! Uplink and MAC commands may add `-MPCT:<n>` (packet counter) and
//! `-MSTA:<n>` (MAC state) to a successful reply.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::warn;

use mioty_core::ReturnCode;
use mioty_core::codec;
use mioty_core::error::{Error, Result};

use crate::commands::Command;

/// Command line terminator.
pub const CR: u8 = b'\r';

/// Separator between the length field and the hex payload.
pub const TAB: u8 = 0x09;

/// End-of-payload marker.
pub const SUB: u8 = 0x1A;

/// Query operator.
pub const QUERY: u8 = b'?';

/// Set operator.
pub const SET: u8 = b'=';

/// Largest binary payload the two-digit length field can describe.
pub const MAX_PAYLOAD_LEN: usize = 99;

/// Capacity of the response buffer in bytes.
pub const RESPONSE_CAPACITY: usize = 512;

/// An encoded command ready for [`Transport::send`](mioty_core::Transport::send).
pub type Frame = Bytes;

const STATUS_OK: &[u8] = b"\r\n0\r\n";
const STATUS_OK_AT_START: &[u8] = b"0\r\n";
const STATUS_MAC_ERROR: &[u8] = b"\r\n1\r\n";
const STATUS_AT_ERROR: &[u8] = b"\r\n2\r\n";

const MAC_INFO_TAG: &[u8] = b"-MNFO";
const MAC_ERROR_TAG: &[u8] = b"-MERR";
const AT_ERROR_TAG: &[u8] = b"AT!ERR";
const PACKET_COUNTER_TAG: &[u8] = b"-MPCT";
const MAC_STATE_TAG: &[u8] = b"-MSTA";

// ---------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------

/// Encode `<mnemonic>\r`.
///
/// # Example
///
/// ```
/// use mioty_at::commands::RESET;
/// use mioty_at::protocol::encode_action;
///
/// assert_eq!(&encode_action(RESET)[..], b"AT-RST\r");
/// ```
pub fn encode_action(command: Command) -> Frame {
    let mut buf = BytesMut::with_capacity(command.mnemonic_len() + 1);
    buf.put_slice(command.mnemonic().as_bytes());
    buf.put_u8(CR);
    buf.freeze()
}

/// Encode `<mnemonic>?\r`.
pub fn encode_query(command: Command) -> Frame {
    let mut buf = BytesMut::with_capacity(command.mnemonic_len() + 2);
    buf.put_slice(command.mnemonic().as_bytes());
    buf.put_u8(QUERY);
    buf.put_u8(CR);
    buf.freeze()
}

/// Encode `<mnemonic>=<decimal>\r`.
///
/// # Example
///
/// ```
/// use mioty_at::commands::TRANSMIT_POWER;
/// use mioty_at::protocol::encode_set_int;
///
/// assert_eq!(&encode_set_int(TRANSMIT_POWER, 14)[..], b"AT-UTPL=14\r");
/// ```
pub fn encode_set_int(command: Command, value: u32) -> Frame {
    let mut digits = [0u8; codec::U32_DEC_BUF_LEN];
    let len = codec::u32_to_dec(value, &mut digits);

    let mut buf = BytesMut::with_capacity(command.mnemonic_len() + 1 + len + 1);
    buf.put_slice(command.mnemonic().as_bytes());
    buf.put_u8(SET);
    buf.put_slice(&digits[..len]);
    buf.put_u8(CR);
    buf.freeze()
}

/// Encode `<mnemonic>=<len>\t<HEX>\x1A\r`.
///
/// Fails with [`Error::PayloadTooLong`] when `payload` exceeds
/// [`MAX_PAYLOAD_LEN`]; nothing is sent in that case.
pub fn encode_set_bytes(command: Command, payload: &[u8]) -> Result<Frame> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(Error::PayloadTooLong {
            len: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    let mut digits = [0u8; codec::U32_DEC_BUF_LEN];
    let len_digits = codec::u32_to_dec(payload.len() as u32, &mut digits);

    let mut hex = [0u8; 2 * MAX_PAYLOAD_LEN];
    let hex_len = codec::bytes_to_hex(payload, &mut hex);

    let capacity = command.mnemonic_len() + 1 + len_digits + 1 + hex_len + 2;
    let mut buf = BytesMut::with_capacity(capacity);
    buf.put_slice(command.mnemonic().as_bytes());
    buf.put_u8(SET);
    buf.put_slice(&digits[..len_digits]);
    buf.put_u8(TAB);
    buf.put_slice(&hex[..hex_len]);
    buf.put_u8(SUB);
    buf.put_u8(CR);
    Ok(buf.freeze())
}

// ---------------------------------------------------------------
// Response buffer
// ---------------------------------------------------------------

/// Fixed-capacity accumulator for one response.
///
/// Alphabetic bytes are uppercased on the way in so that tag matching is
/// case-insensitive.
#[derive(Clone)]
pub struct ResponseBuffer {
    data: [u8; RESPONSE_CAPACITY],
    len: usize,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        ResponseBuffer {
            data: [0; RESPONSE_CAPACITY],
            len: 0,
        }
    }

    /// Build a buffer from a complete response, as the collector would.
    pub fn from_response(response: &[u8]) -> Result<Self> {
        let mut buf = Self::new();
        buf.push_chunk(response)?;
        Ok(buf)
    }

    /// Append `chunk`, uppercasing it.
    ///
    /// Fails with [`Error::ResponseOverflow`] without appending anything if
    /// the chunk does not fit.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let end = self.len + chunk.len();
        if end > RESPONSE_CAPACITY {
            return Err(Error::ResponseOverflow {
                capacity: RESPONSE_CAPACITY,
            });
        }
        for (slot, &b) in self.data[self.len..end].iter_mut().zip(chunk) {
            *slot = b.to_ascii_uppercase();
        }
        self.len = end;
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Status line, once one has arrived.
    pub fn status(&self) -> Option<Status> {
        detect_status(self.as_bytes())
    }

    /// See [`is_complete`].
    pub fn is_complete(&self) -> bool {
        is_complete(self.as_bytes())
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResponseBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseBuffer")
            .field("len", &self.len)
            .field("data", &String::from_utf8_lossy(self.as_bytes()))
            .finish()
    }
}

// ---------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------

/// Outcome carried by the status line of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    MacError,
    AtError,
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

/// Everything after the first `<tag>:` in `buf`.
fn tagged_field<'a>(buf: &'a [u8], tag: &[u8]) -> Option<&'a [u8]> {
    let mut from = 0;
    while let Some(pos) = find(&buf[from..], tag) {
        let colon = from + pos + tag.len();
        if buf.get(colon) == Some(&b':') {
            return Some(&buf[colon + 1..]);
        }
        from += pos + 1;
    }
    None
}

/// Leading decimal number of `field`, after optional spaces.
///
/// Stops at the first non-digit; no digits reads as zero.
fn parse_decimal(field: &[u8]) -> u32 {
    let start = field.iter().position(|&b| b != b' ').unwrap_or(field.len());
    let digits = &field[start..];
    let end = digits
        .iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    codec::dec_to_u32(&digits[..end])
}

fn tagged_decimal(buf: &[u8], tag: &[u8]) -> Option<u32> {
    tagged_field(buf, tag).map(parse_decimal)
}

/// Status line contained in `buf`, if any.
///
/// Patterns are tested in the order success, MAC error, AT error.
pub fn detect_status(buf: &[u8]) -> Option<Status> {
    status_line(buf).map(|(status, _)| status)
}

/// Status and the byte range of its line.
fn status_line(buf: &[u8]) -> Option<(Status, std::ops::Range<usize>)> {
    if let Some(pos) = find(buf, STATUS_OK) {
        Some((Status::Ok, pos..pos + STATUS_OK.len()))
    } else if buf.starts_with(STATUS_OK_AT_START) {
        Some((Status::Ok, 0..STATUS_OK_AT_START.len()))
    } else if let Some(pos) = find(buf, STATUS_MAC_ERROR) {
        Some((Status::MacError, pos..pos + STATUS_MAC_ERROR.len()))
    } else {
        find(buf, STATUS_AT_ERROR).map(|pos| (Status::AtError, pos..pos + STATUS_AT_ERROR.len()))
    }
}

/// Whether a response that carries a status line also holds the field that
/// goes with it.
///
/// Labelled fields may arrive after the status line. Text following the
/// status is complete once it ends in CR or LF. With nothing after the
/// status, an error reply is complete once its code label was seen and a
/// success reply once a labelled field preceded the status; otherwise more
/// may still be on the way.
pub fn is_complete(buf: &[u8]) -> bool {
    let Some((status, line)) = status_line(buf) else {
        return false;
    };

    let trailer = &buf[line.end..];
    if let Some(&last) = trailer.last() {
        return last == CR || last == b'\n';
    }

    let head = &buf[..line.start];
    match status {
        Status::Ok => head.contains(&b':'),
        Status::MacError => {
            tagged_field(head, MAC_INFO_TAG).is_some() || tagged_field(head, MAC_ERROR_TAG).is_some()
        }
        Status::AtError => tagged_field(head, AT_ERROR_TAG).is_some(),
    }
}

/// Turn an error status into the [`ReturnCode`] the modem reported.
///
/// A MAC error without a `-MNFO:`/`-MERR:` field yields
/// [`ReturnCode::Err`]; an AT error without `AT!ERR:` yields
/// [`ReturnCode::AtError`].
pub fn classify(buf: &[u8], status: Status) -> Result<()> {
    match status {
        Status::Ok => Ok(()),
        Status::MacError => {
            let code = tagged_decimal(buf, MAC_INFO_TAG)
                .or_else(|| tagged_decimal(buf, MAC_ERROR_TAG))
                .map_or(ReturnCode::Err, ReturnCode::from_mac);
            Err(Error::Modem(code))
        }
        Status::AtError => {
            let code =
                tagged_decimal(buf, AT_ERROR_TAG).map_or(ReturnCode::AtError, ReturnCode::from_at);
            Err(Error::Modem(code))
        }
    }
}

/// Integer value of the `<tag>:` field belonging to `command`.
///
/// # Example
///
/// ```
/// use mioty_at::commands::TRANSMIT_POWER;
/// use mioty_at::protocol::extract_int;
///
/// assert_eq!(extract_int(b"-UTPL: 14\r\n0\r\n", TRANSMIT_POWER).unwrap(), 14);
/// ```
pub fn extract_int(buf: &[u8], command: Command) -> Result<u32> {
    tagged_decimal(buf, command.tag().as_bytes()).ok_or_else(|| {
        warn!(command = command.mnemonic(), "Response lacks integer field");
        Error::MalformedResponse(format!("missing {}: field", command.tag()))
    })
}

/// Decode the hex payload of the `<tag>:` field belonging to `command`
/// into `dest`, returning the number of bytes written.
pub fn extract_bytes(buf: &[u8], command: Command, dest: &mut [u8]) -> Result<usize> {
    extract_optional_bytes(buf, command, dest)?.ok_or_else(|| {
        warn!(command = command.mnemonic(), "Response lacks payload field");
        Error::MalformedResponse(format!("missing {}: field", command.tag()))
    })
}

/// Like [`extract_bytes`], but a missing field yields `Ok(None)`.
///
/// The payload ends at the first CR after the tag, with a trailing SUB
/// dropped.
pub fn extract_optional_bytes(
    buf: &[u8],
    command: Command,
    dest: &mut [u8],
) -> Result<Option<usize>> {
    let Some(field) = tagged_field(buf, command.tag().as_bytes()) else {
        return Ok(None);
    };

    let line = field
        .iter()
        .position(|&b| b == CR)
        .map_or(field, |cr| &field[..cr]);
    let span = line.strip_suffix(&[SUB]).unwrap_or(line);

    let hex = match span.iter().position(|&b| b == TAB) {
        Some(tab) => {
            let declared = parse_decimal(&span[..tab]) as usize;
            let hex = &span[tab + 1..];
            if declared * 2 != hex.len() {
                warn!(
                    command = command.mnemonic(),
                    declared,
                    hex_len = hex.len(),
                    "Payload length field disagrees with payload"
                );
            }
            hex
        }
        None => span,
    };

    if hex.len() % 2 != 0 || !hex.iter().all(u8::is_ascii_hexdigit) {
        warn!(command = command.mnemonic(), hex_len = hex.len(), "Payload is not valid hex");
        return Err(Error::MalformedResponse(format!(
            "{} payload is not an even-length hex string",
            command.tag()
        )));
    }

    let needed = hex.len() / 2;
    if needed > dest.len() {
        return Err(Error::BufferTooSmall {
            needed,
            capacity: dest.len(),
        });
    }
    codec::hex_to_bytes(hex, dest);
    Ok(Some(needed))
}

/// Packet counter (`-MPCT:`) reported with an uplink, if present.
pub fn extract_packet_counter(buf: &[u8]) -> Option<u32> {
    tagged_decimal(buf, PACKET_COUNTER_TAG)
}

/// MAC state (`-MSTA:`) reported with an attach or detach, if present and
/// within `u8` range.
pub fn extract_mac_state(buf: &[u8]) -> Option<u8> {
    tagged_decimal(buf, MAC_STATE_TAG).and_then(|v| u8::try_from(v).ok())
}
