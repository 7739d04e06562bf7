//! Command line interface and the server plan derived from it

use std::time::Duration;

use clap::{Parser, ValueEnum};
use nmea_net::{BaudRate, PacingPolicy, Protocol, ServerConfig};
use nmea_sim::SentenceOptions;
use serde::Serialize;

/// Which protocol families to serve
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolSelection {
    Both,
    #[value(name = "nmea0183")]
    Nmea0183,
    #[value(name = "nmea2000")]
    Nmea2000,
}

impl ProtocolSelection {
    fn includes(self, protocol: Protocol) -> bool {
        match self {
            ProtocolSelection::Both => true,
            ProtocolSelection::Nmea0183 => protocol == Protocol::Nmea0183,
            ProtocolSelection::Nmea2000 => protocol == Protocol::Nmea2000,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingArg {
    /// Whole sentences until the interval's byte budget is spent
    Budget,
    /// One byte at a time at the link's byte rate
    PerByte,
}

impl From<PacingArg> for PacingPolicy {
    fn from(arg: PacingArg) -> Self {
        match arg {
            PacingArg::Budget => PacingPolicy::Budget,
            PacingArg::PerByte => PacingPolicy::PerByte,
        }
    }
}

/// Simulated marine instruments streaming NMEA 0183 and NMEA 2000 data
#[derive(Parser, Debug, Clone)]
#[command(name = "nmeasim", version, about)]
pub struct Cli {
    /// Protocol families to serve
    #[arg(long, env = "NMEASIM_PROTOCOL", value_enum, default_value_t = ProtocolSelection::Both)]
    pub protocol: ProtocolSelection,

    /// Host to bind every server to
    #[arg(long, env = "NMEASIM_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// TCP port for NMEA 0183
    #[arg(long, env = "NMEASIM_NMEA0183_TCP_PORT", default_value_t = 10110)]
    pub nmea0183_tcp_port: u16,

    /// WebSocket port for NMEA 0183
    #[arg(long, env = "NMEASIM_NMEA0183_WS_PORT", default_value_t = 8080)]
    pub nmea0183_ws_port: u16,

    /// TCP port for NMEA 2000
    #[arg(long, env = "NMEASIM_NMEA2000_TCP_PORT", default_value_t = 10200)]
    pub nmea2000_tcp_port: u16,

    /// WebSocket port for NMEA 2000
    #[arg(long, env = "NMEASIM_NMEA2000_WS_PORT", default_value_t = 8081)]
    pub nmea2000_ws_port: u16,

    /// Data update interval in milliseconds
    #[arg(long, env = "NMEASIM_INTERVAL_MS", default_value_t = 1000)]
    pub interval: u64,

    /// Baud rate emulated on the NMEA 0183 TCP output (4800, 9600, 19200, 38400)
    #[arg(long, env = "NMEASIM_BAUD", default_value_t = 4800)]
    pub baud: u32,

    /// How NMEA 0183 TCP output is throttled to the baud rate
    #[arg(long, env = "NMEASIM_PACING", value_enum, default_value_t = PacingArg::Budget)]
    pub pacing: PacingArg,

    /// Disable GGA and GLL
    #[arg(long)]
    pub no_position: bool,

    /// Disable RMC, HDT, VTG and XTE
    #[arg(long)]
    pub no_navigation: bool,

    /// Disable DBT, MTW, MWV, VHW and DPT
    #[arg(long)]
    pub no_environment: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "NMEASIM_LOG_JSON")]
    pub log_json: bool,

    /// Print the effective server configuration as JSON and exit
    #[arg(long)]
    pub print_config: bool,
}

/// Configuration of every server that will run; `None` means disabled
#[derive(Debug, Clone, Serialize)]
pub struct ServerPlan {
    pub nmea0183_tcp: Option<ServerConfig>,
    pub nmea0183_ws: Option<ServerConfig>,
    pub nmea2000_tcp: Option<ServerConfig>,
    pub nmea2000_ws: Option<ServerConfig>,
    pub update_interval: Duration,
}

impl Cli {
    /// Shared configuration; the flag reports a baud rate fallback
    pub fn base_config(&self) -> (ServerConfig, bool) {
        let (baud_rate, fell_back) = BaudRate::sanitize(self.baud);
        let config = ServerConfig {
            host: self.host.clone(),
            update_interval: Duration::from_millis(self.interval.max(1)),
            sentences: SentenceOptions {
                enable_position: !self.no_position,
                enable_navigation: !self.no_navigation,
                enable_environment: !self.no_environment,
            },
            baud_rate,
            pacing: self.pacing.into(),
            ..ServerConfig::default()
        };
        (config, fell_back)
    }

    pub fn plan(&self, base: &ServerConfig) -> ServerPlan {
        let nmea0183 = self.protocol.includes(Protocol::Nmea0183);
        let nmea2000 = self.protocol.includes(Protocol::Nmea2000);
        let family = |enabled: bool, protocol: Protocol, port: u16| {
            enabled.then(|| base.with_protocol(protocol).with_port(port))
        };

        ServerPlan {
            nmea0183_tcp: family(nmea0183, Protocol::Nmea0183, self.nmea0183_tcp_port),
            nmea0183_ws: family(nmea0183, Protocol::Nmea0183, self.nmea0183_ws_port),
            nmea2000_tcp: family(nmea2000, Protocol::Nmea2000, self.nmea2000_tcp_port),
            nmea2000_ws: family(nmea2000, Protocol::Nmea2000, self.nmea2000_ws_port),
            update_interval: base.update_interval,
        }
    }
}
