//! Decimal and hexadecimal text conversions used by the AT protocol.
//!
//! The AT protocol carries every number as ASCII: integers as decimal text,
//! binary payloads as pairs of hex digits. These helpers convert between the
//! two representations over caller-provided slices and never allocate.
//!
//! # Preconditions
//!
//! Character-level conversions do not validate their input. Passing a byte
//! outside the documented character class yields an unspecified value (debug
//! builds assert). Callers are expected to have located the field with the
//! protocol parser first, which only hands over digit runs.

const DIGITS: &[u8; 10] = b"0123456789";
const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Longest decimal rendering of a `u32`, plus a zero terminator.
pub const U32_DEC_BUF_LEN: usize = 11;

/// Value of a decimal ASCII digit (`0`-`9`).
pub fn dec_char_to_u8(c: u8) -> u8 {
    debug_assert!(c.is_ascii_digit(), "not a decimal digit: {c:#04x}");
    c.wrapping_sub(b'0')
}

/// Value of a hexadecimal ASCII digit, case-insensitive.
pub fn hex_char_to_u8(c: u8) -> u8 {
    debug_assert!(c.is_ascii_hexdigit(), "not a hex digit: {c:#04x}");
    match c {
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => c.wrapping_sub(b'0'),
    }
}

/// Uppercase hex digit for the low four bits of `nibble`.
pub fn nibble_to_hex(nibble: u8) -> u8 {
    HEX_DIGITS[(nibble & 0x0F) as usize]
}

/// Number of decimal digits needed to print `value`.
pub fn dec_len(value: u32) -> usize {
    let mut n = 1;
    let mut rest = value / 10;
    while rest > 0 {
        n += 1;
        rest /= 10;
    }
    n
}

/// Write `value` as left-aligned, zero-terminated decimal text.
///
/// Returns the index of the terminator, which is also the digit count.
///
/// # Panics
///
/// Panics if `dest` is shorter than the digit count plus one;
/// [`U32_DEC_BUF_LEN`] bytes always suffice.
///
/// # Example
///
/// ```
/// use mioty_core::codec::{u32_to_dec, U32_DEC_BUF_LEN};
///
/// let mut buf = [0xFFu8; U32_DEC_BUF_LEN];
/// let end = u32_to_dec(9600, &mut buf);
/// assert_eq!(&buf[..end], b"9600");
/// assert_eq!(buf[end], 0);
/// ```
pub fn u32_to_dec(value: u32, dest: &mut [u8]) -> usize {
    let len = dec_len(value);
    dest[len] = 0;
    let mut rest = value;
    for slot in dest[..len].iter_mut().rev() {
        *slot = DIGITS[(rest % 10) as usize];
        rest /= 10;
    }
    len
}

/// Write `value` right-aligned into exactly `dest.len()` characters.
///
/// Unused leading positions are filled with `fill`. Returns `false` when the
/// value needs more digits than the width; the low-order digits are still
/// written, so the buffer holds the truncated number.
///
/// # Example
///
/// ```
/// use mioty_core::codec::u32_to_dec_fixed;
///
/// let mut buf = [0u8; 5];
/// assert!(u32_to_dec_fixed(&mut buf, 42, b'0'));
/// assert_eq!(&buf, b"00042");
///
/// let mut small = [0u8; 2];
/// assert!(!u32_to_dec_fixed(&mut small, 1234, b' '));
/// assert_eq!(&small, b"34");
/// ```
pub fn u32_to_dec_fixed(dest: &mut [u8], value: u32, fill: u8) -> bool {
    let needed = dec_len(value);
    let mut rest = value;
    for (i, slot) in dest.iter_mut().rev().enumerate() {
        *slot = if i < needed {
            DIGITS[(rest % 10) as usize]
        } else {
            fill
        };
        rest /= 10;
    }
    needed <= dest.len()
}

/// Accumulate a run of decimal digits into an integer.
///
/// Overflow wraps silently; the protocol never sends numbers wider than
/// 32 bits.
pub fn dec_to_u32(digits: &[u8]) -> u32 {
    digits.iter().fold(0u32, |acc, &c| {
        acc.wrapping_mul(10).wrapping_add(dec_char_to_u8(c) as u32)
    })
}

/// Accumulate a run of hex digits into an integer, most significant first.
pub fn hex_to_u32(digits: &[u8]) -> u32 {
    digits
        .iter()
        .fold(0u32, |acc, &c| (acc << 4) | hex_char_to_u8(c) as u32)
}

/// Two uppercase hex characters for one byte.
pub fn byte_to_hex(b: u8) -> [u8; 2] {
    [nibble_to_hex(b >> 4), nibble_to_hex(b)]
}

/// Two uppercase hex characters for one byte, followed by a zero terminator.
pub fn byte_to_hex_zt(b: u8) -> [u8; 3] {
    let [hi, lo] = byte_to_hex(b);
    [hi, lo, 0]
}

/// Hex-encode `src` into `dest`.
///
/// Returns the number of characters written (`2 * src.len()`), or `0` if
/// `dest` is too small, in which case `dest` is left untouched.
///
/// # Example
///
/// ```
/// use mioty_core::codec::bytes_to_hex;
///
/// let mut out = [0u8; 4];
/// assert_eq!(bytes_to_hex(&[0xAB, 0x01], &mut out), 4);
/// assert_eq!(&out, b"AB01");
/// assert_eq!(bytes_to_hex(&[1, 2, 3], &mut out), 0);
/// ```
pub fn bytes_to_hex(src: &[u8], dest: &mut [u8]) -> usize {
    let len = src.len() * 2;
    if dest.len() < len {
        return 0;
    }
    for (pair, &b) in dest.chunks_exact_mut(2).zip(src) {
        pair.copy_from_slice(&byte_to_hex(b));
    }
    len
}

/// Decode pairs of hex characters from `hex` into `dest`.
///
/// Returns `false` without writing if `hex` has odd length or if `dest`
/// cannot hold `hex.len() / 2` bytes. Bytes past that count are untouched.
pub fn hex_to_bytes(hex: &[u8], dest: &mut [u8]) -> bool {
    if hex.len() % 2 != 0 || dest.len() < hex.len() / 2 {
        return false;
    }
    for (slot, pair) in dest.iter_mut().zip(hex.chunks_exact(2)) {
        *slot = (hex_char_to_u8(pair[0]) << 4) | hex_char_to_u8(pair[1]);
    }
    true
}
