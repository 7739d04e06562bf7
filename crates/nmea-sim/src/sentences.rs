//! Sentence selection and shared generator helpers

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{environment, navigation, position};

/// Fixed simulated latitude, `ddmm.mmmm`
pub(crate) const LATITUDE: f64 = 4811.7646;
/// Fixed simulated longitude, `dddmm.mmmm`
pub(crate) const LONGITUDE: f64 = 1621.4916;

/// Which NMEA 0183 sentence groups to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceOptions {
    /// GGA, GLL
    pub enable_position: bool,
    /// RMC, HDT, VTG, XTE
    pub enable_navigation: bool,
    /// DBT, MTW, MWV, VHW, DPT
    pub enable_environment: bool,
}

impl SentenceOptions {
    /// All groups enabled
    pub fn all() -> Self {
        Self {
            enable_position: true,
            enable_navigation: true,
            enable_environment: true,
        }
    }

    /// No groups enabled
    pub fn none() -> Self {
        Self {
            enable_position: false,
            enable_navigation: false,
            enable_environment: false,
        }
    }

    /// Only the position group enabled
    pub fn position_only() -> Self {
        Self {
            enable_position: true,
            ..Self::none()
        }
    }
}

impl Default for SentenceOptions {
    fn default() -> Self {
        Self::all()
    }
}

/// Generate one batch of checksummed sentences (without line terminators).
///
/// Groups are emitted in a fixed order: position, navigation, environment.
pub fn generate_sentences(options: &SentenceOptions) -> Vec<String> {
    let mut sentences = Vec::with_capacity(11);

    if options.enable_position {
        sentences.push(position::gga());
        sentences.push(position::gll());
    }

    if options.enable_navigation {
        sentences.push(navigation::rmc());
        sentences.push(navigation::hdt());
        sentences.push(navigation::vtg());
        sentences.push(navigation::xte());
    }

    if options.enable_environment {
        sentences.push(environment::dbt());
        sentences.push(environment::mtw());
        sentences.push(environment::mwv());
        sentences.push(environment::vhw());
        sentences.push(environment::dpt());
    }

    sentences
}

/// `hhmmss.ss` UTC time field
pub(crate) fn format_utc_time(t: DateTime<Utc>) -> String {
    // leap seconds report up to 1999 ms
    let centis = t.timestamp_subsec_millis().min(999) / 10;
    format!("{}.{:02}", t.format("%H%M%S"), centis)
}

/// `ddmmyy` UTC date field
pub(crate) fn format_utc_date(t: DateTime<Utc>) -> String {
    t.format("%d%m%y").to_string()
}

/// Uniform sample in `[min, max)`
pub(crate) fn random_float(min: f64, max: f64) -> f64 {
    min + rand::rng().random::<f64>() * (max - min)
}

/// Uniform sample in `[min, max]`
pub(crate) fn random_int(min: u32, max: u32) -> u32 {
    rand::rng().random_range(min..=max)
}
