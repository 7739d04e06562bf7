//! Server configuration

use std::time::Duration;

use nmea_sim::SentenceOptions;
use serde::{Deserialize, Serialize};

use crate::error::NetError;
use crate::pacing::Pacer;

/// Wire protocol a server carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Text sentences, `$TALKER,...*HH`
    #[default]
    Nmea0183,
    /// PGN messages wrapped in `$PNMEA2K` frames
    Nmea2000,
}

impl Protocol {
    /// Returns the configuration name of the protocol
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Nmea0183 => "nmea0183",
            Protocol::Nmea2000 => "nmea2000",
        }
    }
}

/// Emulated serial link speed in bits per second
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BaudRate(u32);

impl BaudRate {
    /// Rates a real NMEA 0183 talker can be configured for
    pub const SUPPORTED: [u32; 4] = [4800, 9600, 19200, 38400];

    /// Standard NMEA 0183 rate
    pub const DEFAULT: BaudRate = BaudRate(4800);

    /// Accept only a supported rate
    pub fn new(bits_per_second: u32) -> Option<Self> {
        Self::SUPPORTED
            .contains(&bits_per_second)
            .then_some(BaudRate(bits_per_second))
    }

    /// Accept a supported rate, falling back to 4800.
    ///
    /// The flag is `true` when the fallback was applied.
    pub fn sanitize(bits_per_second: u32) -> (Self, bool) {
        match Self::new(bits_per_second) {
            Some(rate) => (rate, false),
            None => (Self::DEFAULT, true),
        }
    }

    pub fn bits_per_second(self) -> u32 {
        self.0
    }

    /// Throughput of an 8N1 link: one start bit, eight data bits, one stop bit
    pub fn bytes_per_second(self) -> u32 {
        self.0 / 10
    }

    /// Byte budget for one update interval, `baud * seconds / 8`
    pub fn bytes_per_interval(self, interval: Duration) -> usize {
        (f64::from(self.0) * interval.as_secs_f64() / 8.0) as usize
    }
}

impl Default for BaudRate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = NetError;

    fn try_from(bits_per_second: u32) -> Result<Self, Self::Error> {
        Self::new(bits_per_second).ok_or(NetError::UnsupportedBaudRate(bits_per_second))
    }
}

impl From<BaudRate> for u32 {
    fn from(rate: BaudRate) -> Self {
        rate.0
    }
}

/// How text output is throttled to the emulated baud rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PacingPolicy {
    /// Per client and tick, write whole sentences until the interval's byte
    /// budget is spent; the rest of the tick's sentences are dropped
    #[default]
    Budget,
    /// Write one byte at a time, gated per client at the link's byte rate
    PerByte,
}

/// Configuration of a single server instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host or IP to bind
    pub host: String,
    /// Port to bind (0 picks an ephemeral port)
    pub port: u16,
    /// Interval between generated batches
    pub update_interval: Duration,
    /// Which sentence groups to generate
    pub sentences: SentenceOptions,
    /// Emulated serial link speed for the TCP text path
    pub baud_rate: BaudRate,
    /// Protocol family of this server
    pub protocol: Protocol,
    /// Throttling policy for the TCP text path
    pub pacing: PacingPolicy,
    /// A client write that takes longer than this counts as failed
    pub write_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10110,
            update_interval: Duration::from_secs(1),
            sentences: SentenceOptions::all(),
            baud_rate: BaudRate::DEFAULT,
            protocol: Protocol::Nmea0183,
            pacing: PacingPolicy::Budget,
            write_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Loopback configuration on an ephemeral port
    pub fn local() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Self::default()
        }
    }

    /// Copy with a different port
    pub fn with_port(&self, port: u16) -> Self {
        Self {
            port,
            ..self.clone()
        }
    }

    /// Copy with a different protocol
    pub fn with_protocol(&self, protocol: Protocol) -> Self {
        Self {
            protocol,
            ..self.clone()
        }
    }

    /// `host:port`, bracketing IPv6 literals
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Pacer for the TCP text path
    pub fn text_pacer(&self) -> Pacer {
        match self.pacing {
            PacingPolicy::Budget => Pacer::Budget {
                bytes_per_tick: self.baud_rate.bytes_per_interval(self.update_interval),
            },
            PacingPolicy::PerByte => Pacer::per_byte(self.baud_rate.bytes_per_second()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baud_rate_fallback() {
        assert_eq!(BaudRate::sanitize(9600), (BaudRate(9600), false));
        assert_eq!(BaudRate::sanitize(115_200), (BaudRate(4800), true));
        assert_eq!(BaudRate::sanitize(0), (BaudRate(4800), true));
        assert!(BaudRate::new(38400).is_some());
    }

    #[test]
    fn test_baud_rate_serde_enforces_supported_set() {
        let rate: BaudRate = serde_json::from_str("19200").unwrap();
        assert_eq!(rate.bits_per_second(), 19200);
        assert_eq!(serde_json::to_string(&rate).unwrap(), "19200");

        let err = serde_json::from_str::<BaudRate>("115200").unwrap_err();
        assert!(err.to_string().contains("unsupported baud rate 115200"));

        let mut config = serde_json::to_value(ServerConfig::default()).unwrap();
        config["baud_rate"] = 1200.into();
        assert!(serde_json::from_value::<ServerConfig>(config).is_err());
    }

    #[test]
    fn test_budget_and_rate() {
        let rate = BaudRate::DEFAULT;
        assert_eq!(rate.bytes_per_interval(Duration::from_secs(1)), 600);
        assert_eq!(rate.bytes_per_interval(Duration::from_millis(500)), 300);
        assert_eq!(rate.bytes_per_second(), 480);
        assert_eq!(BaudRate(38400).bytes_per_interval(Duration::from_secs(2)), 9600);
    }

    #[test]
    fn test_with_port_keeps_other_fields() {
        let base = ServerConfig {
            baud_rate: BaudRate(19200),
            ..ServerConfig::default()
        };
        let ws = base.with_port(8080);
        assert_eq!(ws.port, 8080);
        assert_eq!(ws.baud_rate, base.baud_rate);
        assert_eq!(base.port, 10110);
    }

    #[test]
    fn test_bind_addr() {
        assert_eq!(ServerConfig::default().bind_addr(), "0.0.0.0:10110");
        let v6 = ServerConfig {
            host: "::1".into(),
            port: 8080,
            ..ServerConfig::default()
        };
        assert_eq!(v6.bind_addr(), "[::1]:8080");
    }

    #[test]
    fn test_text_pacer_follows_policy() {
        let config = ServerConfig::default();
        assert_eq!(config.text_pacer(), Pacer::Budget { bytes_per_tick: 600 });

        let per_byte = ServerConfig {
            pacing: PacingPolicy::PerByte,
            ..ServerConfig::default()
        };
        assert_eq!(
            per_byte.text_pacer(),
            Pacer::PerByte {
                byte_period: Duration::from_nanos(1_000_000_000 / 480)
            }
        );
    }

    #[test]
    fn test_protocol_names() {
        assert_eq!(Protocol::Nmea0183.name(), "nmea0183");
        assert_eq!(Protocol::Nmea2000.name(), "nmea2000");
    }
}
