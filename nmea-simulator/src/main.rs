//! nmeasim - NMEA 0183 / NMEA 2000 marine telemetry simulator
//!
//! Starts the servers selected on the command line and runs until Ctrl-C.

mod cli;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use nmea_net::{
    Server, ServerConfig, StaticAssets, Tcp2000Server, TcpServer, WebSocket2000Server,
    WebSocketServer, NMEA0183_WS_PATH, NMEA2000_WS_PATH,
};
use nmea_sim::{PgnSink, Simulator};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use cli::{Cli, ServerPlan};

/// Monitoring page served at `/` by the WebSocket servers
const INDEX_HTML: &str = include_str!("../web/index.html");

const DEFAULT_LOG_FILTER: &str = "nmeasim=info,nmea_protocol=info,nmea_sim=info,nmea_net=info";

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Everything started so far, stopped in reverse dependency order
#[derive(Default)]
struct Running {
    servers: Vec<Arc<dyn Server>>,
    simulator: Option<Simulator>,
}

impl Running {
    async fn start_server(
        &mut self,
        server: Arc<dyn Server>,
        cancel: &CancellationToken,
    ) -> anyhow::Result<SocketAddr> {
        let addr = server
            .start(cancel.clone())
            .await
            .with_context(|| format!("failed to start {} server", server.name()))?;
        self.servers.push(server);
        Ok(addr)
    }

    async fn start(
        &mut self,
        plan: ServerPlan,
        assets: &StaticAssets,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        if let Some(config) = plan.nmea0183_tcp {
            let addr = self
                .start_server(Arc::new(TcpServer::new(config)), cancel)
                .await?;
            info!("NMEA 0183 TCP on {}", addr);
        }
        if let Some(config) = plan.nmea0183_ws {
            let server = Arc::new(WebSocketServer::new(config, assets.clone()));
            let addr = self.start_server(server, cancel).await?;
            info!("NMEA 0183 WebSocket on ws://{}{}", addr, NMEA0183_WS_PATH);
        }

        let (tcp_config, ws_config) = match (plan.nmea2000_tcp, plan.nmea2000_ws) {
            (Some(tcp), Some(ws)) => (tcp, ws),
            _ => return Ok(()),
        };
        self.start_nmea2000(tcp_config, ws_config, plan.update_interval, assets, cancel)
            .await
    }

    /// The simulator owns the NMEA 2000 servers' start and stop
    async fn start_nmea2000(
        &mut self,
        tcp_config: ServerConfig,
        ws_config: ServerConfig,
        update_interval: std::time::Duration,
        assets: &StaticAssets,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let tcp = Arc::new(Tcp2000Server::new(tcp_config));
        let ws = Arc::new(WebSocket2000Server::new(ws_config, assets.clone()));
        let sinks: Vec<Arc<dyn PgnSink>> = vec![tcp.clone(), ws.clone()];
        let simulator = Simulator::new(sinks, update_interval);

        simulator
            .start(cancel.clone())
            .await
            .context("failed to start NMEA 2000 simulator")?;

        if let Some(addr) = tcp.local_addr() {
            info!("NMEA 2000 TCP on {}", addr);
        }
        if let Some(addr) = ws.local_addr() {
            info!("NMEA 2000 WebSocket on ws://{}{}", addr, NMEA2000_WS_PATH);
        }
        self.servers.push(tcp);
        self.servers.push(ws);
        self.simulator = Some(simulator);
        Ok(())
    }

    async fn stop(self) {
        if let Some(simulator) = self.simulator {
            if let Err(e) = simulator.stop().await {
                warn!("NMEA 2000 simulator did not stop cleanly: {}", e);
            }
        }
        for server in self.servers.iter().rev() {
            if let Err(e) = server.stop().await {
                warn!("Failed to stop {} server: {}", server.name(), e);
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let (base, fell_back) = cli.base_config();
    if fell_back {
        warn!(
            "Unsupported baud rate {}, using {}",
            cli.baud,
            base.baud_rate.bits_per_second()
        );
    }
    let plan = cli.plan(&base);

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    info!("NMEA simulator v{} starting", env!("CARGO_PKG_VERSION"));

    let cancel = CancellationToken::new();
    let assets = StaticAssets::new().with_index(INDEX_HTML);
    let mut running = Running::default();

    if let Err(e) = running.start(plan, &assets, &cancel).await {
        error!("{:#}", e);
        cancel.cancel();
        running.stop().await;
        return Err(e);
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    info!("Shutting down simulators");
    cancel.cancel();
    running.stop().await;
    info!("Shutdown complete");
    Ok(())
}
