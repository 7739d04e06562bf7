//! Plain TCP transport
//!
//! [`TcpServer`] streams NMEA 0183 sentences, CRLF terminated, paced to the
//! configured baud rate. The accept loop and per-connection reader are shared
//! with the NMEA 2000 TCP server.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{Protocol, ServerConfig};
use crate::error::NetError;
use crate::registry::ClientSink;
use crate::server::{run_sentence_broadcast, Server, ServerCore, ServerState};

/// Pause after a failed accept so a persistent error does not spin
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Write half of an accepted TCP connection
pub struct TcpSink {
    writer: OwnedWriteHalf,
}

#[async_trait]
impl ClientSink for TcpSink {
    async fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        self.writer.write_all(payload).await
    }

    async fn close(&mut self) {
        let _ = self.writer.shutdown().await;
    }
}

/// Accept connections until shutdown, registering each one
pub(crate) async fn accept_loop(
    listener: TcpListener,
    core: Arc<ServerCore<TcpSink>>,
    cancel: CancellationToken,
) {
    loop {
        match core.until_shutdown(&cancel, listener.accept()).await {
            None => break,
            Some(Ok((stream, remote))) => on_connect(&core, &cancel, stream, remote).await,
            Some(Err(e)) => {
                warn!(server = core.name(), "Accept failed: {}", e);
                if core
                    .until_shutdown(&cancel, tokio::time::sleep(ACCEPT_BACKOFF))
                    .await
                    .is_none()
                {
                    break;
                }
            }
        }
    }
    // Dropping the listener closes the socket
    debug!(server = core.name(), "Accept loop stopped");
}

async fn on_connect(
    core: &Arc<ServerCore<TcpSink>>,
    cancel: &CancellationToken,
    stream: TcpStream,
    remote: SocketAddr,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(server = core.name(), remote = %remote, "Failed to set TCP_NODELAY: {}", e);
    }
    let (reader, writer) = stream.into_split();

    let Some(registration) = core.registry().register(remote, TcpSink { writer }).await else {
        return;
    };

    let core_task = Arc::clone(core);
    let cancel = cancel.clone();
    core.spawn(async move {
        tokio::select! {
            _ = registration.cancel.cancelled() => {}
            _ = cancel.cancelled() => {}
            _ = wait_for_disconnect(reader) => {
                debug!(server = core_task.name(), remote = %remote, "Peer closed connection");
            }
        }
        core_task.registry().remove(registration.id).await;
    });
}

/// Read and discard inbound bytes until EOF or a read error
async fn wait_for_disconnect(mut reader: OwnedReadHalf) {
    let mut buf = [0u8; 512];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

/// NMEA 0183 sentence stream over TCP
pub struct TcpServer {
    core: Arc<ServerCore<TcpSink>>,
}

impl TcpServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            core: ServerCore::new("tcp", config),
        }
    }

    pub async fn start(&self, cancel: CancellationToken) -> Result<SocketAddr, NetError> {
        let listener = self.core.bind().await?;
        let addr = listener.local_addr()?;

        let pacer = self.core.config().text_pacer();
        self.core
            .spawn(accept_loop(listener, Arc::clone(&self.core), cancel.clone()));
        self.core.spawn(run_sentence_broadcast(
            Arc::clone(&self.core),
            cancel.clone(),
            pacer,
            "\r\n",
        ));
        self.core.watch_cancellation(cancel);
        self.core.mark_serving(addr);
        Ok(addr)
    }

    pub async fn stop(&self) -> Result<(), NetError> {
        self.core.shutdown().await;
        Ok(())
    }

    pub async fn client_count(&self) -> usize {
        self.core.registry().len().await
    }

    pub fn config(&self) -> &ServerConfig {
        self.core.config()
    }
}

#[async_trait]
impl Server for TcpServer {
    fn name(&self) -> &'static str {
        self.core.name()
    }

    fn protocol(&self) -> Protocol {
        Protocol::Nmea0183
    }

    async fn start(&self, cancel: CancellationToken) -> Result<SocketAddr, NetError> {
        TcpServer::start(self, cancel).await
    }

    async fn stop(&self) -> Result<(), NetError> {
        TcpServer::stop(self).await
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.core.local_addr()
    }

    fn state(&self) -> ServerState {
        self.core.state()
    }

    async fn client_count(&self) -> usize {
        TcpServer::client_count(self).await
    }
}
