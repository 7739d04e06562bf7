//! NMEA 2000 Parameter Group Numbers
//!
//! Each supported PGN has a typed record holding physical quantities in SI
//! units and an encoder that packs it into a single 8-byte little-endian
//! payload using the fixed-point resolutions below.
//!
//! | Quantity                       | Resolution  | Wire type |
//! |--------------------------------|-------------|-----------|
//! | Heading                        | 0.0001 rad  | u16       |
//! | Deviation / variation          | 0.0001 rad  | i16       |
//! | Water depth                    | 0.01 m      | u32       |
//! | Transducer offset              | 0.01 m      | i16       |
//! | Maximum range                  | 0.01 m      | u16       |
//! | Wind speed                     | 0.01 m/s    | u16       |
//! | Wind angle                     | 0.0001 rad  | u16       |
//! | Latitude / longitude           | 1e-7 deg    | i32       |
//! | Speed through water / ground   | 0.01 m/s    | u16       |
//!
//! Scaled values are truncated toward zero. Bytes marked reserved are 0xFF.

/// Every supported PGN carries exactly one 8-byte frame
pub const FRAME_LEN: usize = 8;

/// Filler for reserved bytes
const RESERVED: u8 = 0xFF;

/// PGN 127250 Vessel Heading
pub const PGN_VESSEL_HEADING: u32 = 127_250;
/// PGN 128259 Speed
pub const PGN_SPEED: u32 = 128_259;
/// PGN 128267 Water Depth
pub const PGN_WATER_DEPTH: u32 = 128_267;
/// PGN 129025 Position, Rapid Update
pub const PGN_POSITION_RAPID: u32 = 129_025;
/// PGN 129026 COG & SOG, Rapid Update
pub const PGN_COG_SOG_RAPID: u32 = 129_026;
/// PGN 130306 Wind Data
pub const PGN_WIND_DATA: u32 = 130_306;

/// Reference metadata for a PGN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PgnDefinition {
    /// Parameter group number
    pub pgn: u32,
    /// Short name
    pub name: &'static str,
    /// What the message carries
    pub description: &'static str,
    /// Payload length in bytes
    pub length: u8,
}

/// Commonly used marine PGNs
pub static DEFINITIONS: [PgnDefinition; 6] = [
    PgnDefinition {
        pgn: PGN_VESSEL_HEADING,
        name: "Vessel Heading",
        description: "Heading sensor value with a flag for True or Magnetic",
        length: 8,
    },
    PgnDefinition {
        pgn: PGN_SPEED,
        name: "Speed",
        description: "Speed through water",
        length: 8,
    },
    PgnDefinition {
        pgn: PGN_WATER_DEPTH,
        name: "Water Depth",
        description: "Water depth information",
        length: 8,
    },
    PgnDefinition {
        pgn: PGN_POSITION_RAPID,
        name: "Position Rapid Update",
        description: "Provides lat/lon rapid update",
        length: 8,
    },
    PgnDefinition {
        pgn: PGN_COG_SOG_RAPID,
        name: "COG & SOG Rapid Update",
        description: "Course Over Ground and Speed Over Ground",
        length: 8,
    },
    PgnDefinition {
        pgn: PGN_WIND_DATA,
        name: "Wind Data",
        description: "Wind speed, direction, and reference",
        length: 8,
    },
];

/// Look up the definition of a PGN
pub fn definition(pgn: u32) -> Option<&'static PgnDefinition> {
    DEFINITIONS.iter().find(|def| def.pgn == pgn)
}

/// A single NMEA 2000 message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Message {
    /// Parameter group number
    pub pgn: u32,
    /// Encoded payload
    pub data: [u8; FRAME_LEN],
}

impl Message {
    /// Create a message from a PGN and raw payload
    pub fn new(pgn: u32, data: [u8; FRAME_LEN]) -> Self {
        Self { pgn, data }
    }

    /// Human-readable name of this message's PGN, if known
    pub fn name(&self) -> Option<&'static str> {
        definition(self.pgn).map(|def| def.name)
    }
}

/// Records that can be packed into a PGN payload
pub trait EncodePgn {
    /// PGN this record is sent as
    const PGN: u32;

    /// Pack the record into its 8-byte wire representation
    fn encode(&self) -> [u8; FRAME_LEN];

    /// Pack the record into a [`Message`]
    fn to_message(&self) -> Message {
        Message::new(Self::PGN, self.encode())
    }
}

/// Heading reference for PGN 127250
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HeadingReference {
    #[default]
    True = 0,
    Magnetic = 1,
}

/// PGN 127250 Vessel Heading
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VesselHeading {
    /// Heading in radians
    pub heading: f64,
    /// Magnetic deviation in radians
    pub deviation: f64,
    /// Magnetic variation in radians
    pub variation: f64,
    pub reference: HeadingReference,
    /// Trailing byte, sent verbatim
    pub reserved: u8,
}

impl EncodePgn for VesselHeading {
    const PGN: u32 = PGN_VESSEL_HEADING;

    fn encode(&self) -> [u8; FRAME_LEN] {
        let mut data = [0u8; FRAME_LEN];
        data[0..2].copy_from_slice(&((self.heading * 10_000.0) as u16).to_le_bytes());
        data[2..4].copy_from_slice(&((self.deviation * 10_000.0) as i16).to_le_bytes());
        data[4..6].copy_from_slice(&((self.variation * 10_000.0) as i16).to_le_bytes());
        data[6] = self.reference as u8;
        data[7] = self.reserved;
        data
    }
}

/// PGN 128267 Water Depth
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WaterDepth {
    /// Depth below transducer in meters
    pub depth: f64,
    /// Transducer offset in meters (negative: below waterline)
    pub offset: f64,
    /// Maximum measurable range in meters
    pub max_range: f64,
}

impl EncodePgn for WaterDepth {
    const PGN: u32 = PGN_WATER_DEPTH;

    fn encode(&self) -> [u8; FRAME_LEN] {
        let mut data = [0u8; FRAME_LEN];
        data[0..4].copy_from_slice(&((self.depth * 100.0) as u32).to_le_bytes());
        data[4..6].copy_from_slice(&((self.offset * 100.0) as i16).to_le_bytes());
        data[6..8].copy_from_slice(&((self.max_range * 100.0) as u16).to_le_bytes());
        data
    }
}

/// Wind reference for PGN 130306
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WindReference {
    #[default]
    True = 0,
    Apparent = 1,
}

/// PGN 130306 Wind Data
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindData {
    /// Wind speed in m/s
    pub speed: f64,
    /// Wind angle in radians
    pub angle: f64,
    pub reference: WindReference,
}

impl EncodePgn for WindData {
    const PGN: u32 = PGN_WIND_DATA;

    fn encode(&self) -> [u8; FRAME_LEN] {
        let mut data = [RESERVED; FRAME_LEN];
        data[0..2].copy_from_slice(&((self.speed * 100.0) as u16).to_le_bytes());
        data[2..4].copy_from_slice(&((self.angle * 10_000.0) as u16).to_le_bytes());
        data[4] = self.reference as u8;
        data
    }
}

/// PGN 129025 Position, Rapid Update
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    /// Latitude in decimal degrees (south negative)
    pub latitude: f64,
    /// Longitude in decimal degrees (west negative)
    pub longitude: f64,
}

impl EncodePgn for Position {
    const PGN: u32 = PGN_POSITION_RAPID;

    fn encode(&self) -> [u8; FRAME_LEN] {
        let mut data = [0u8; FRAME_LEN];
        data[0..4].copy_from_slice(&((self.latitude * 1e7) as i32).to_le_bytes());
        data[4..8].copy_from_slice(&((self.longitude * 1e7) as i32).to_le_bytes());
        data
    }
}

/// Speed sensor type for PGN 128259
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpeedReference {
    #[default]
    PaddleWheel = 0,
    PitotTube = 1,
    Doppler = 2,
    Correlation = 3,
}

/// PGN 128259 Speed
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpeedData {
    /// Speed through water in m/s
    pub speed_water: f64,
    /// Speed over ground in m/s
    pub speed_ground: f64,
    pub reference: SpeedReference,
}

impl EncodePgn for SpeedData {
    const PGN: u32 = PGN_SPEED;

    fn encode(&self) -> [u8; FRAME_LEN] {
        let mut data = [RESERVED; FRAME_LEN];
        data[0..2].copy_from_slice(&((self.speed_water * 100.0) as u16).to_le_bytes());
        data[2..4].copy_from_slice(&((self.speed_ground * 100.0) as u16).to_le_bytes());
        data[4] = self.reference as u8;
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn u16_at(data: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([data[at], data[at + 1]])
    }

    fn i16_at(data: &[u8], at: usize) -> i16 {
        i16::from_le_bytes([data[at], data[at + 1]])
    }

    fn i32_at(data: &[u8], at: usize) -> i32 {
        i32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
    }

    #[test]
    fn test_water_depth_layout() {
        let data = WaterDepth {
            depth: 10.5,
            offset: -1.5,
            max_range: 100.0,
        }
        .encode();

        assert_eq!(u32::from_le_bytes([data[0], data[1], data[2], data[3]]), 1050);
        assert_eq!(i16_at(&data, 4), -150);
        assert_eq!(u16_at(&data, 6), 10_000);
    }

    #[test]
    fn test_shallow_depth_no_offset() {
        let data = WaterDepth {
            depth: 2.0,
            offset: 0.0,
            max_range: 50.0,
        }
        .encode();
        assert_eq!(data, [200, 0, 0, 0, 0, 0, 0x88, 0x13]);
    }

    #[test]
    fn test_true_heading() {
        let data = VesselHeading {
            heading: 0.5,
            ..Default::default()
        }
        .encode();
        assert_eq!(data, [0x88, 0x13, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_magnetic_heading_with_deviation_and_variation() {
        let data = VesselHeading {
            heading: PI / 2.0,
            deviation: 0.1,
            variation: -0.05,
            reference: HeadingReference::Magnetic,
            reserved: 0,
        }
        .encode();

        assert_eq!(u16_at(&data, 0), 15_707);
        assert_eq!(i16_at(&data, 2), 1000);
        assert_eq!(i16_at(&data, 4), -500);
        assert_eq!(data[6], 1);
        assert_eq!(data[7], 0);
    }

    #[test]
    fn test_apparent_wind_reserved_bytes() {
        let data = WindData {
            speed: 5.5,
            angle: 2.0,
            reference: WindReference::Apparent,
        }
        .encode();

        assert_eq!(u16_at(&data, 0), 550);
        assert_eq!(u16_at(&data, 2), 20_000);
        assert_eq!(data[4], 1);
        assert_eq!(&data[5..], &[0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_true_wind_half_turn() {
        let data = WindData {
            speed: 10.0,
            angle: PI,
            reference: WindReference::True,
        }
        .encode();
        assert_eq!(u16_at(&data, 0), 1000);
        assert_eq!(u16_at(&data, 2), 31_415);
        assert_eq!(data[4], 0);
    }

    #[test]
    fn test_position_signed_degrees() {
        let north_east = Position {
            latitude: 48.1964,
            longitude: 16.3637,
        }
        .encode();
        assert_eq!(i32_at(&north_east, 0), (48.1964 * 1e7) as i32);
        assert_eq!(i32_at(&north_east, 4), (16.3637 * 1e7) as i32);

        let south_west = Position {
            latitude: -33.8688,
            longitude: -151.2093,
        }
        .encode();
        assert!(i32_at(&south_west, 0) < 0);
        assert_eq!(i32_at(&south_west, 4), (-151.2093 * 1e7) as i32);
    }

    #[test]
    fn test_speed_doppler() {
        let data = SpeedData {
            speed_water: 5.0,
            speed_ground: 5.2,
            reference: SpeedReference::Doppler,
        }
        .encode();
        assert_eq!(u16_at(&data, 0), 500);
        assert_eq!(u16_at(&data, 2), (5.2f64 * 100.0) as u16);
        assert_eq!(data[4], 2);
        assert_eq!(&data[5..], &[0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_to_message_uses_record_pgn() {
        let msg = Position::default().to_message();
        assert_eq!(msg.pgn, PGN_POSITION_RAPID);
        assert_eq!(msg.name(), Some("Position Rapid Update"));
    }

    #[test]
    fn test_definitions_are_single_frame() {
        for def in &DEFINITIONS {
            assert_eq!(def.length as usize, FRAME_LEN, "{}", def.name);
        }
        assert_eq!(definition(PGN_COG_SOG_RAPID).map(|d| d.name), Some("COG & SOG Rapid Update"));
        assert!(definition(60928).is_none());
    }
}
