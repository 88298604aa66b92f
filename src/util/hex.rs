//! # Hex Encoding/Decoding Utilities
//!
//! Hex helpers used for message capture replay, CLI input and log output.
//! Sensor captures come from many tools (rtl_433 dumps, serial consoles,
//! hand-typed test vectors) so parsing is tolerant of separators.
//!
//! ## Usage
//!
//! ```rust
//! use bresser_rs::util::hex::{decode_hex, format_hex_compact};
//!
//! let msg = decode_hex("D4 EA EC 7F").unwrap();
//! assert_eq!(msg, [0xD4, 0xEA, 0xEC, 0x7F]);
//! assert_eq!(format_hex_compact(&msg), "d4 ea ec 7f");
//! ```

use thiserror::Error;

/// Errors that can occur during hex operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Encode bytes to lowercase hex string
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Decode hex string to bytes
///
/// Accepts both uppercase and lowercase hex characters.
/// Whitespace is stripped, any other separator is an error.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();
    decode_cleaned(&cleaned)
}

/// Parse hex that may contain separators such as `-`, `:` or `,`
///
/// An optional `0x` prefix on each group is dropped before filtering.
pub fn parse_hex_lenient(input: &str) -> Result<Vec<u8>, HexError> {
    let without_prefix = input.replace("0x", "").replace("0X", "");
    let hex_chars: String = without_prefix
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .collect();
    decode_cleaned(&hex_chars)
}

fn decode_cleaned(cleaned: &str) -> Result<Vec<u8>, HexError> {
    if cleaned.is_empty() {
        return Err(HexError::EmptyString);
    }
    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }
    hex::decode(cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Format bytes for compact display in logs ("d4 ea ec")
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Helper for building test messages from hex strings.
///
/// Panics on invalid hex (intended for test code only).
pub fn hex_to_bytes(hex: &str) -> Vec<u8> {
    decode_hex(hex).expect("Invalid hex in test data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_lowercase() {
        let data = vec![0xD4, 0xEA, 0x0F];
        assert_eq!(encode_hex(&data), "d4ea0f");
    }

    #[test]
    fn test_decode_with_whitespace() {
        assert_eq!(decode_hex("d4 ea\tec\n7f").unwrap(), vec![0xD4, 0xEA, 0xEC, 0x7F]);
    }

    #[test]
    fn test_parse_lenient_separators() {
        assert_eq!(parse_hex_lenient("D4-EA:EC,7F").unwrap(), vec![0xD4, 0xEA, 0xEC, 0x7F]);
        assert_eq!(parse_hex_lenient("0xD4 0xEA").unwrap(), vec![0xD4, 0xEA]);
    }

    #[test]
    fn test_format_compact() {
        assert_eq!(format_hex_compact(&[0x63, 0x1D, 0x05]), "63 1d 05");
        assert_eq!(format_hex_compact(&[]), "");
    }

    #[test]
    fn test_errors() {
        assert_eq!(decode_hex(""), Err(HexError::EmptyString));
        assert_eq!(decode_hex("d4e"), Err(HexError::OddLength(3)));
        assert!(matches!(decode_hex("GG"), Err(HexError::DecodeError(_))));
        assert_eq!(parse_hex_lenient("zz"), Err(HexError::EmptyString));
    }
}
