//! # Utility Modules
//!
//! Common helpers used throughout the bresser-rs crate: hex encoding and
//! decoding, receive path logging, and derived weather values.

pub mod hex;
pub mod logging;
pub mod weather;

// Re-export commonly used types and functions
pub use hex::{decode_hex, encode_hex, format_hex_compact, hex_to_bytes, parse_hex_lenient};
pub use logging::{log_integrity_result, log_message_hex, span_decode, LogThrottle};
pub use weather::{
    dew_point, heat_index, humidex, perceived_temperature, wind_chill, winddir_to_compass,
    windspeed_ms_to_bft,
};
