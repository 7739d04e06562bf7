//! NMEA 0183 sentence checksums
//!
//! The checksum is the XOR of every character between the leading `$` and the
//! `*` delimiter (both exclusive), written as two uppercase hex digits.
//!
//! ```text
//! $GPGLL,5321.6802,N,00630.3372,W,092750.000,A*26
//!  ^---------------- XOR ---------------------^
//! ```

use crate::error::ParseError;

/// Compute the XOR checksum of a sentence.
///
/// Scanning starts after the first `$` and stops at the first `*` or the end
/// of the string, so the result is the same whether or not a checksum has
/// already been appended. A string with no `$` checksums to zero.
pub fn checksum(sentence: &str) -> u8 {
    let bytes = sentence.as_bytes();
    let Some(start) = bytes.iter().position(|&b| b == b'$') else {
        return 0;
    };

    bytes[start + 1..]
        .iter()
        .take_while(|&&b| b != b'*')
        .fold(0u8, |acc, &b| acc ^ b)
}

/// Append `*HH` to a sentence body.
pub fn append_checksum(sentence: &str) -> String {
    format!("{}*{:02X}", sentence, checksum(sentence))
}

/// Verify the `*HH` suffix of a sentence.
///
/// A trailing `\r\n` is tolerated.
pub fn verify_checksum(sentence: &str) -> Result<(), ParseError> {
    let sentence = sentence.trim_end_matches(['\r', '\n']);

    if !sentence.starts_with('$') {
        return Err(ParseError::InvalidFrame("sentence must start with '$'".into()));
    }

    let star = sentence
        .rfind('*')
        .ok_or_else(|| ParseError::InvalidFrame("missing '*' checksum delimiter".into()))?;

    let field = &sentence[star + 1..];
    let actual = parse_hex_byte(field).ok_or_else(|| ParseError::InvalidChecksum(field.into()))?;
    let expected = checksum(&sentence[..star]);

    if expected != actual {
        return Err(ParseError::ChecksumMismatch { expected, actual });
    }
    Ok(())
}

/// Parse exactly two hex digits
pub(crate) fn parse_hex_byte(field: &str) -> Option<u8> {
    if field.len() != 2 {
        return None;
    }
    u8::from_str_radix(field, 16).ok()
}
