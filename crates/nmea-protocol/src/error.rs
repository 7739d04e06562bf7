//! Error types for NMEA sentence and frame parsing

use thiserror::Error;

/// Errors that can occur while parsing or validating protocol data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Invalid sentence or frame structure
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Checksum field is not two hex digits
    #[error("invalid checksum field: {0}")]
    InvalidChecksum(String),

    /// Checksum mismatch
    #[error("checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// Declared payload length does not match the data field
    #[error("length mismatch: header says {declared} bytes, data has {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// Payload is not exactly one 8-byte frame
    #[error("unsupported payload length: {0} (expected 8)")]
    UnsupportedLength(usize),

    /// Invalid hex digit in the data field
    #[error("invalid hex data: {0}")]
    InvalidHex(String),
}
