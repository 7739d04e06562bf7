//! Environment sentences: DBT, MTW, MWV, VHW, DPT

use nmea_protocol::append_checksum;

use crate::sentences::random_float;

const FEET_PER_METER: f64 = 3.28084;
const FATHOMS_PER_METER: f64 = 0.546807;

/// DBT - Depth Below Transducer
pub fn dbt() -> String {
    let meters = 5.0 + random_float(0.0, 95.0);

    append_checksum(&format!(
        "$IIDBT,{:.1},f,{:.1},M,{:.1},F",
        meters * FEET_PER_METER,
        meters,
        meters * FATHOMS_PER_METER
    ))
}

/// MTW - Mean Temperature of Water
pub fn mtw() -> String {
    let celsius = 10.0 + random_float(0.0, 20.0);
    append_checksum(&format!("$IIMTW,{:.1},C", celsius))
}

/// MWV - Wind Speed and Angle (relative, knots)
pub fn mwv() -> String {
    let angle = random_float(0.0, 360.0);
    let speed = random_float(0.0, 60.0);
    append_checksum(&format!("$IIMWV,{:.1},R,{:.1},N,A", angle, speed))
}

/// VHW - Water Speed and Heading
pub fn vhw() -> String {
    let heading_true = random_float(0.0, 360.0);
    let speed_knots = random_float(0.0, 20.0);

    append_checksum(&format!(
        "$IIVHW,{:.1},T,{:.1},M,{:.1},N,{:.1},K",
        heading_true,
        heading_true - 2.0,
        speed_knots,
        speed_knots * 1.852
    ))
}

/// DPT - Depth of Water
pub fn dpt() -> String {
    let meters = 5.0 + random_float(0.0, 95.0);
    append_checksum(&format!("$IIDPT,{:.1},{:.1},{:.1}", meters, -1.5, 200.0))
}
