//! Conversions between byte buffers, hex text and big unsigned integers.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::error::{HandshakeError, Result};

/// Parse unsigned hexadecimal text. Absent or empty text is zero.
pub fn from_hex(text: Option<&str>) -> Result<BigUint> {
    match text {
        None | Some("") => Ok(BigUint::zero()),
        Some(t) => BigUint::parse_bytes(t.as_bytes(), 16)
            .ok_or_else(|| HandshakeError::InvalidNumber(format!("not hexadecimal: {t:?}"))),
    }
}

/// Accumulate `value * 10 + code point` over the characters of `text`.
///
/// The raw code point is added, not the digit value, so `"1"` yields 49.
/// Kept for compatibility with existing diagnostics output.
pub fn from_decimal_digit_string(text: Option<&str>) -> BigUint {
    let mut value = BigUint::zero();
    for c in text.unwrap_or_default().chars() {
        value *= 10u32;
        value += u32::from(c);
    }
    value
}

/// Big-endian magnitude of `buffer[offset..offset + length]`.
///
/// `length` of `None` runs to the end of the buffer.
pub fn from_bytes(buffer: &[u8], offset: usize, length: Option<usize>) -> Result<BigUint> {
    if buffer.is_empty() {
        return Ok(BigUint::zero());
    }
    let end = match length {
        Some(len) => offset.checked_add(len),
        None => Some(buffer.len()),
    };
    let range = end
        .filter(|&end| offset <= end && end <= buffer.len())
        .map(|end| &buffer[offset..end])
        .ok_or_else(|| HandshakeError::malformed("number range exceeds buffer"))?;

    from_hex(Some(&to_hex(range)))
}

/// Upper-case hex without separators.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        assert_eq!(from_hex(None).unwrap(), BigUint::zero());
        assert_eq!(from_hex(Some("")).unwrap(), BigUint::zero());
        assert_eq!(from_hex(Some("FF")).unwrap(), BigUint::from(255u32));
        assert_eq!(from_hex(Some("0100")).unwrap(), BigUint::from(256u32));
        assert!(from_hex(Some("xyz")).is_err());
    }

    #[test]
    fn test_from_hex_is_unsigned() {
        // High bit set must not turn negative.
        let v = from_hex(Some("80")).unwrap();
        assert_eq!(v, BigUint::from(128u32));
    }

    #[test]
    fn test_from_decimal_digit_string_uses_code_points() {
        assert_eq!(from_decimal_digit_string(None), BigUint::zero());
        assert_eq!(from_decimal_digit_string(Some("")), BigUint::zero());
        // '1' = 49
        assert_eq!(from_decimal_digit_string(Some("1")), BigUint::from(49u32));
        // '1' '2' = 49 * 10 + 50
        assert_eq!(from_decimal_digit_string(Some("12")), BigUint::from(540u32));
    }

    #[test]
    fn test_from_bytes() {
        let buf = [0x00, 0x01, 0x02, 0xFF];
        assert_eq!(from_bytes(&buf, 0, None).unwrap(), BigUint::from(0x0102FFu32));
        assert_eq!(from_bytes(&buf, 1, Some(2)).unwrap(), BigUint::from(0x0102u32));
        assert_eq!(from_bytes(&[], 0, None).unwrap(), BigUint::zero());
        assert!(from_bytes(&buf, 3, Some(2)).is_err());
        assert!(from_bytes(&buf, 1, Some(usize::MAX)).is_err());
    }

    #[test]
    fn test_from_bytes_matches_big_endian() {
        let buf = [0xDE, 0xAD, 0xBE, 0xEF, 0x01];
        assert_eq!(from_bytes(&buf, 0, None).unwrap(), BigUint::from_bytes_be(&buf));
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&[0x0A, 0xBC]), "0ABC");
        assert_eq!(to_hex(&[]), "");
    }
}
