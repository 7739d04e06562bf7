//! NMEA 2000 over TCP
//!
//! Clients receive one `$PNMEA2K` frame per message, written as soon as the
//! simulator hands the message over. No baud pacing applies.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use nmea_protocol::{format_pgn_frame, Message};
use nmea_sim::{PgnSink, SinkError};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::config::{Protocol, ServerConfig};
use crate::error::NetError;
use crate::pacing::Pacer;
use crate::server::{Server, ServerCore, ServerState};
use crate::tcp::{accept_loop, TcpSink};

/// `$PNMEA2K` frame stream over TCP
pub struct Tcp2000Server {
    core: Arc<ServerCore<TcpSink>>,
}

impl Tcp2000Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            core: ServerCore::new("tcp2000", config.with_protocol(Protocol::Nmea2000)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.core.name()
    }

    pub async fn start(&self, cancel: CancellationToken) -> Result<SocketAddr, NetError> {
        let listener = self.core.bind().await?;
        let addr = listener.local_addr()?;

        self.core
            .spawn(accept_loop(listener, Arc::clone(&self.core), cancel.clone()));
        self.core.watch_cancellation(cancel);
        self.core.mark_serving(addr);
        Ok(addr)
    }

    pub async fn stop(&self) -> Result<(), NetError> {
        self.core.shutdown().await;
        Ok(())
    }

    /// Write one frame to every client. Dropped silently once stopped.
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
impl Server for Tcp2000Server {
    fn name(&self) -> &'static str {
        self.core.name()
    }

    fn protocol(&self) -> Protocol {
        Protocol::Nmea2000
    }

    async fn start(&self, cancel: CancellationToken) -> Result<SocketAddr, NetError> {
        Tcp2000Server::start(self, cancel).await
    }

    async fn stop(&self) -> Result<(), NetError> {
        Tcp2000Server::stop(self).await
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.core.local_addr()
    }

    fn state(&self) -> ServerState {
        self.core.state()
    }

    async fn client_count(&self) -> usize {
        Tcp2000Server::client_count(self).await
    }
}

#[async_trait]
impl PgnSink for Tcp2000Server {
    fn name(&self) -> &str {
        self.core.name()
    }

    async fn start(&self, cancel: CancellationToken) -> Result<(), SinkError> {
        Tcp2000Server::start(self, cancel)
            .await
            .map(drop)
            .map_err(Into::into)
    }

    async fn stop(&self) -> Result<(), SinkError> {
        Tcp2000Server::stop(self).await.map_err(Into::into)
    }

    async fn send_pgn(&self, msg: &Message) -> Result<(), SinkError> {
        Tcp2000Server::send_pgn(self, msg).await.map_err(Into::into)
    }
}
