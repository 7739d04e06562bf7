//! Navigation sentences: RMC, HDT, VTG, XTE

use chrono::Utc;
use nmea_protocol::append_checksum;

use crate::sentences::{format_utc_date, format_utc_time, random_float, LATITUDE, LONGITUDE};

/// Knots to km/h
const KMH_PER_KNOT: f64 = 1.852;

/// RMC - Recommended Minimum Navigation Information
pub fn rmc() -> String {
    let now = Utc::now();
    let speed_knots = random_float(0.0, 20.0);
    let track_true = random_float(0.0, 360.0);
    let mag_var = 5.0 + random_float(0.0, 2.0);

    append_checksum(&format!(
        "$GPRMC,{},A,{:.4},N,{:.4},E,{:.1},{:.1},{},{:.1},E",
        format_utc_time(now),
        LATITUDE,
        LONGITUDE,
        speed_knots,
        track_true,
        format_utc_date(now),
        mag_var
    ))
}

/// HDT - Heading, True
pub fn hdt() -> String {
    let heading = random_float(0.0, 360.0);
    append_checksum(&format!("$HEHDT,{:.1},T", heading))
}

/// VTG - Track Made Good and Ground Speed
pub fn vtg() -> String {
    let track_true = random_float(0.0, 360.0);
    let track_mag = track_true - 2.0;
    let speed_knots = random_float(0.0, 20.0);
    let speed_kmh = speed_knots * KMH_PER_KNOT;

    append_checksum(&format!(
        "$GPVTG,{:.1},T,{:.1},M,{:.1},N,{:.1},K",
        track_true, track_mag, speed_knots, speed_kmh
    ))
}

/// XTE - Cross-Track Error, Measured
pub fn xte() -> String {
    let distance = random_float(0.0, 0.5);
    let direction = if random_float(0.0, 1.0) < 0.5 { "L" } else { "R" };

    append_checksum(&format!("$GPXTE,A,A,{:.3},{},N", distance, direction))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(sentence: &str) -> Vec<String> {
        sentence
            .split('*')
            .next()
            .unwrap()
            .split(',')
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_rmc_layout() {
        let f = fields(&rmc());
        assert_eq!(f.len(), 12);
        assert_eq!(f[0], "$GPRMC");
        assert_eq!(f[2], "A");
        assert_eq!(f[9].len(), 6);
        assert_eq!(f[11], "E");
    }

    #[test]
    fn test_hdt_range() {
        let f = fields(&hdt());
        let heading: f64 = f[1].parse().unwrap();
        assert!((0.0..=360.0).contains(&heading));
        assert_eq!(f[2], "T");
    }

    #[test]
    fn test_vtg_speed_units_agree() {
        let f = fields(&vtg());
        let knots: f64 = f[5].parse().unwrap();
        let kmh: f64 = f[7].parse().unwrap();
        assert!((kmh - knots * KMH_PER_KNOT).abs() < 0.2);
    }

    #[test]
    fn test_xte_direction() {
        for _ in 0..50 {
            let f = fields(&xte());
            assert!(f[4] == "L" || f[4] == "R");
            assert_eq!(f[3].split('.').nth(1).map(str::len), Some(3));
        }
    }
}
