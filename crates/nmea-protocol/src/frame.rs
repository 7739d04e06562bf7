//! `$PNMEA2K` text framing for NMEA 2000 messages over TCP and WebSocket
//!
//! # Format
//! `$PNMEA2K,<PGN>,<len>,<DATA>*<HH>\r\n`
//!
//! - `PGN` and `len` are decimal
//! - `DATA` is the payload as uppercase hex
//! - `HH` is the XOR of the header text between `$` and the data field,
//!   further XORed with every raw payload byte. The rendered hex digits are
//!   not part of the checksum.

use std::fmt::Write as _;

use tracing::trace;

use crate::checksum::parse_hex_byte;
use crate::error::ParseError;
use crate::pgn::{Message, FRAME_LEN};

/// Sentence identifier of the wrapper
pub const FRAME_TALKER: &str = "PNMEA2K";

fn frame_checksum(header: &str, data: &[u8]) -> u8 {
    let text = header.bytes().fold(0u8, |acc, b| acc ^ b);
    data.iter().fold(text, |acc, &b| acc ^ b)
}

/// Format a message as a CRLF-terminated `$PNMEA2K` line
pub fn format_pgn_frame(msg: &Message) -> String {
    let header = format!("{},{},{},", FRAME_TALKER, msg.pgn, msg.data.len());
    let checksum = frame_checksum(&header, &msg.data);

    let mut line = String::with_capacity(header.len() + msg.data.len() * 2 + 6);
    line.push('$');
    line.push_str(&header);
    for b in &msg.data {
        let _ = write!(line, "{:02X}", b);
    }
    let _ = write!(line, "*{:02X}\r\n", checksum);
    line
}

/// Parse a `$PNMEA2K` line back into a message, validating length and checksum
pub fn parse_pgn_frame(line: &str) -> Result<Message, ParseError> {
    let line = line.trim_end_matches(['\r', '\n']);

    let body = line
        .strip_prefix('$')
        .ok_or_else(|| ParseError::InvalidFrame("frame must start with '$'".into()))?;
    let (body, checksum_field) = body
        .rsplit_once('*')
        .ok_or_else(|| ParseError::InvalidFrame("missing '*' checksum delimiter".into()))?;

    let mut fields = body.splitn(4, ',');
    let talker = fields.next().unwrap_or_default();
    if talker != FRAME_TALKER {
        return Err(ParseError::InvalidFrame(format!("unexpected talker {}", talker)));
    }

    let pgn_field = fields
        .next()
        .ok_or_else(|| ParseError::InvalidFrame("missing PGN field".into()))?;
    let len_field = fields
        .next()
        .ok_or_else(|| ParseError::InvalidFrame("missing length field".into()))?;
    let hex = fields
        .next()
        .ok_or_else(|| ParseError::InvalidFrame("missing data field".into()))?;

    let pgn = pgn_field
        .parse::<u32>()
        .map_err(|_| ParseError::InvalidFrame(format!("invalid PGN {}", pgn_field)))?;
    let declared = len_field
        .parse::<usize>()
        .map_err(|_| ParseError::InvalidFrame(format!("invalid length {}", len_field)))?;

    let bytes = decode_hex(hex)?;
    if bytes.len() != declared {
        return Err(ParseError::LengthMismatch {
            declared,
            actual: bytes.len(),
        });
    }
    let data: [u8; FRAME_LEN] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| ParseError::UnsupportedLength(bytes.len()))?;

    let actual = parse_hex_byte(checksum_field)
        .ok_or_else(|| ParseError::InvalidChecksum(checksum_field.into()))?;
    let header = format!("{},{},{},", FRAME_TALKER, pgn_field, len_field);
    let expected = frame_checksum(&header, &data);
    if expected != actual {
        trace!(pgn, expected, actual, "PNMEA2K checksum mismatch");
        return Err(ParseError::ChecksumMismatch { expected, actual });
    }

    Ok(Message::new(pgn, data))
}

fn decode_hex(hex: &str) -> Result<Vec<u8>, ParseError> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return Err(ParseError::InvalidHex(hex.into()));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| parse_hex_byte(&hex[i..i + 2]).ok_or_else(|| ParseError::InvalidHex(hex.into())))
        .collect()
}
