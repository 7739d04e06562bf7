//! NMEA 2000 over WebSocket

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use nmea_protocol::{format_pgn_frame, Message};
use nmea_sim::{PgnSink, SinkError};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::assets::StaticAssets;
use crate::config::{Protocol, ServerConfig};
use crate::error::NetError;
use crate::pacing::Pacer;
use crate::server::{Server, ServerCore, ServerState};
use crate::websocket::{serve_websocket, WsSink};

/// Upgrade path of the NMEA 2000 server
pub const NMEA2000_WS_PATH: &str = "/nmea2000";

/// `$PNMEA2K` frames over WebSocket at `/nmea2000`, one frame per text message
pub struct WebSocket2000Server {
    core: Arc<ServerCore<WsSink>>,
    assets: StaticAssets,
}

impl WebSocket2000Server {
    pub fn new(config: ServerConfig, assets: StaticAssets) -> Self {
        Self {
            core: ServerCore::new("websocket2000", config.with_protocol(Protocol::Nmea2000)),
            assets,
        }
    }

    pub fn name(&self) -> &'static str {
        self.core.name()
    }

    pub async fn start(&self, cancel: CancellationToken) -> Result<SocketAddr, NetError> {
        serve_websocket(&self.core, NMEA2000_WS_PATH, &self.assets, cancel).await
    }

    pub async fn stop(&self) -> Result<(), NetError> {
        self.core.shutdown().await;
        Ok(())
    }

    /// Send one frame to every client. Dropped silently once stopped.
    pub async fn send_pgn(&self, msg: &Message) -> Result<(), NetError> {
        let frame = format_pgn_frame(msg);
        let report = self
            .core
            .registry()
            .broadcast(&[frame], &Pacer::Unpaced)
            .await;
        trace!(server = self.name(), pgn = msg.pgn, clients = report.clients, "Sent PGN");
        Ok(())
    }

    pub async fn client_count(&self) -> usize {
        self.core.registry().len().await
    }
}

#[async_trait]
impl Server for WebSocket2000Server {
    fn name(&self) -> &'static str {
        self.core.name()
    }

    fn protocol(&self) -> Protocol {
        Protocol::Nmea2000
    }

    async fn start(&self, cancel: CancellationToken) -> Result<SocketAddr, NetError> {
        WebSocket2000Server::start(self, cancel).await
    }

    async fn stop(&self) -> Result<(), NetError> {
        WebSocket2000Server::stop(self).await
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.core.local_addr()
    }

    fn state(&self) -> ServerState {
        self.core.state()
    }

    async fn client_count(&self) -> usize {
        WebSocket2000Server::client_count(self).await
    }
}

#[async_trait]
impl PgnSink for WebSocket2000Server {
    fn name(&self) -> &str {
        self.core.name()
    }

    async fn start(&self, cancel: CancellationToken) -> Result<(), SinkError> {
        WebSocket2000Server::start(self, cancel)
            .await
            .map(drop)
            .map_err(Into::into)
    }

    async fn stop(&self) -> Result<(), SinkError> {
        WebSocket2000Server::stop(self).await.map_err(Into::into)
    }

    async fn send_pgn(&self, msg: &Message) -> Result<(), SinkError> {
        WebSocket2000Server::send_pgn(self, msg)
            .await
            .map_err(Into::into)
    }
}
