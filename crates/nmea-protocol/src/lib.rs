//! NMEA Protocol Library
//!
//! This crate provides the wire-level pieces of the marine telemetry
//! simulator:
//!
//! - **NMEA 0183**: XOR checksums for `$TALKER,...*HH` sentences
//! - **NMEA 2000**: typed PGN records packed into fixed 8-byte little-endian
//!   payloads, plus a reference table of the supported PGNs
//! - **`$PNMEA2K` framing**: the text wrapper used to carry PGN payloads over
//!   TCP and WebSocket
//!
//! Everything here is pure and stateless.
//!
//! # Example
//!
//! ```rust
//! use nmea_protocol::{append_checksum, format_pgn_frame, EncodePgn, WaterDepth};
//!
//! assert_eq!(append_checksum("$GPGGA,,,,,,,,,,,,,,,"), "$GPGGA,,,,,,,,,,,,,,,*7A");
//!
//! let msg = WaterDepth { depth: 10.5, offset: -1.5, max_range: 100.0 }.to_message();
//! let line = format_pgn_frame(&msg);
//! assert!(line.starts_with("$PNMEA2K,128267,8,"));
//! ```

pub mod checksum;
pub mod error;
pub mod frame;
pub mod pgn;

pub use checksum::{append_checksum, checksum, verify_checksum};
pub use error::ParseError;
pub use frame::{format_pgn_frame, parse_pgn_frame};
pub use pgn::{
    definition, EncodePgn, HeadingReference, Message, PgnDefinition, Position, SpeedData,
    SpeedReference, VesselHeading, WaterDepth, WindData, WindReference,
};
