//! # Error Handling
//!
//! This module defines the decode status codes returned by the message
//! decoders and the `WeatherError` enum for the remaining fallible
//! operations of the bresser-rs crate.

use thiserror::Error;

/// Outcome of decoding one message buffer.
///
/// Integrity failures are local to one format and make the receiver try the
/// next enabled decoder. `Skip` and `Full` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DecodeStatus {
    /// No enabled decoder claimed the buffer.
    #[default]
    Invalid,
    /// Decoded and stored in a slot.
    Ok,
    /// 5-in-1 complement check failed.
    ParityError,
    /// Additive checksum, bit count or CRC mismatch.
    ChecksumError,
    /// LFSR digest mismatch.
    DigestError,
    /// Well formed but filtered by the include/exclude lists.
    Skip,
    /// Well formed, not filtered, but no slot available.
    Full,
}

impl DecodeStatus {
    /// True for the integrity failures that fall through to the next decoder.
    pub fn is_integrity_failure(self) -> bool {
        matches!(
            self,
            DecodeStatus::ParityError | DecodeStatus::ChecksumError | DecodeStatus::DigestError
        )
    }

    /// True when dispatch must stop at this result.
    pub fn stops_dispatch(self) -> bool {
        matches!(self, DecodeStatus::Ok | DecodeStatus::Skip | DecodeStatus::Full)
    }
}

impl std::fmt::Display for DecodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DecodeStatus::Invalid => "INVALID",
            DecodeStatus::Ok => "OK",
            DecodeStatus::ParityError => "PARITY_ERROR",
            DecodeStatus::ChecksumError => "CHECKSUM_ERROR",
            DecodeStatus::DigestError => "DIGEST_ERROR",
            DecodeStatus::Skip => "SKIP",
            DecodeStatus::Full => "FULL",
        };
        f.write_str(s)
    }
}

/// Errors raised by the persistence backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Errors reported by a radio front-end.
#[derive(Debug, Error)]
pub enum RadioError {
    /// Hardware access failed
    #[error("HAL error: {0}")]
    Hal(String),

    /// The buffer handed to the radio cannot hold a message
    #[error("Receive buffer too small: {0} bytes")]
    BufferTooSmall(usize),

    /// Device specific failure
    #[error("Device error: {0}")]
    Device(String),
}

/// Represents the different error types that can occur in the crate.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Indicates an invalid hexadecimal string was provided.
    #[error("Invalid hexadecimal string: {0}")]
    InvalidHexString(String),

    /// Indicates a message buffer of unexpected size.
    #[error("Invalid message length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Indicates a receive buffer without the expected preamble byte.
    #[error("Unexpected preamble byte 0x{0:02X}")]
    InvalidPreamble(u8),

    /// Indicates the radio collaborator failed to deliver data.
    #[error("Radio error: {0}")]
    Radio(#[from] RadioError),

    /// Indicates an invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Indicates a slot index outside the slot pool.
    #[error("Slot index {index} out of range (pool size {size})")]
    SlotOutOfRange { index: usize, size: usize },

    /// Wraps persistence failures.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<crate::util::hex::HexError> for WeatherError {
    fn from(e: crate::util::hex::HexError) -> Self {
        WeatherError::InvalidHexString(e.to_string())
    }
}
