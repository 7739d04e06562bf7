//! Position sentences: GGA, GLL

use chrono::Utc;
use nmea_protocol::append_checksum;

use crate::sentences::{format_utc_time, random_float, random_int, LATITUDE, LONGITUDE};

/// GGA - Global Positioning System Fix Data
pub fn gga() -> String {
    let utc_time = format_utc_time(Utc::now());
    let quality = random_int(0, 2);
    let satellites = random_int(4, 12);
    let hdop = 0.5 + random_float(0.0, 4.5);
    let altitude = 100.0 + random_float(0.0, 200.0);
    let geoid_separation = -5.0 + random_float(0.0, 10.0);

    append_checksum(&format!(
        "$GPGGA,{},{:.4},N,{:.4},E,{},{:02},{:.1},{:.1},M,{:.1},M,,",
        utc_time, LATITUDE, LONGITUDE, quality, satellites, hdop, altitude, geoid_separation
    ))
}

/// GLL - Geographic Position, Latitude/Longitude
pub fn gll() -> String {
    let utc_time = format_utc_time(Utc::now());

    append_checksum(&format!(
        "$GPGLL,{:.4},N,{:.4},E,{},A",
        LATITUDE, LONGITUDE, utc_time
    ))
}
