//! WebSocket transport
//!
//! An axum app per server: the upgrade endpoint, the static monitoring page
//! as fallback, and request logging around both. Upgrades are accepted from
//! any origin; this is a simulator meant for local networks.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{close_code, Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::middleware;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::assets::StaticAssets;
use crate::config::{Protocol, ServerConfig};
use crate::error::NetError;
use crate::http::log_requests;
use crate::pacing::Pacer;
use crate::registry::ClientSink;
use crate::server::{run_sentence_broadcast, Server, ServerCore, ServerState};

/// Upgrade path of the NMEA 0183 server
pub const NMEA0183_WS_PATH: &str = "/ws";

/// Sending half of an upgraded WebSocket; payloads go out as text frames
pub struct WsSink {
    sender: SplitSink<WebSocket, WsMessage>,
}

#[async_trait]
impl ClientSink for WsSink {
    async fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        let text = String::from_utf8_lossy(payload).into_owned();
        self.sender
            .send(WsMessage::Text(text))
            .await
            .map_err(io::Error::other)
    }

    async fn close(&mut self) {
        let _ = self.sender.close().await;
    }
}

#[derive(Clone)]
struct WsState {
    core: Arc<ServerCore<WsSink>>,
    cancel: CancellationToken,
}

/// Bind, mount `path` and serve until shutdown
pub(crate) async fn serve_websocket(
    core: &Arc<ServerCore<WsSink>>,
    path: &'static str,
    assets: &StaticAssets,
    cancel: CancellationToken,
) -> Result<SocketAddr, NetError> {
    let listener = core.bind().await?;
    let addr = listener.local_addr()?;

    let state = WsState {
        core: Arc::clone(core),
        cancel: cancel.clone(),
    };
    let app = Router::new()
        .route(path, get(upgrade))
        .with_state(state)
        .merge(assets.router())
        .layer(middleware::from_fn(log_requests));

    let signal = core.shutdown_signal().clone();
    let stop = cancel.clone();
    let name = core.name();
    core.spawn(async move {
        let graceful = async move {
            tokio::select! {
                _ = signal.wait() => {}
                _ = stop.cancelled() => {}
            }
        };
        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(graceful)
        .await
        {
            error!(server = name, "HTTP server failed: {}", e);
        }
        debug!(server = name, "HTTP server stopped");
    });

    core.watch_cancellation(cancel);
    core.mark_serving(addr);
    Ok(addr)
}

async fn upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<WsState>,
) -> Response {
    let name = state.core.name();
    ws.on_failed_upgrade(move |e| {
        warn!(server = name, remote = %remote, "WebSocket upgrade failed: {}", e);
    })
    .on_upgrade(move |socket| {
        let core = Arc::clone(&state.core);
        core.track(handle_socket(socket, remote, state))
    })
}

async fn handle_socket(socket: WebSocket, remote: SocketAddr, state: WsState) {
    let (sender, mut receiver) = socket.split();
    let registry = state.core.registry();
    let Some(registration) = registry.register(remote, WsSink { sender }).await else {
        return;
    };

    tokio::select! {
        _ = registration.cancel.cancelled() => {}
        _ = state.cancel.cancelled() => {}
        _ = read_until_close(&mut receiver, state.core.name(), remote) => {}
    }
    registry.remove(registration.id).await;
}

/// Discard inbound frames until the peer closes or the stream errors
async fn read_until_close(
    receiver: &mut SplitStream<WebSocket>,
    server: &'static str,
    remote: SocketAddr,
) {
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(WsMessage::Close(Some(close))) => {
                if close.code != close_code::NORMAL && close.code != close_code::AWAY {
                    warn!(
                        server,
                        remote = %remote,
                        code = close.code,
                        "Unexpected close: {}",
                        close.reason
                    );
                }
                return;
            }
            Ok(WsMessage::Close(None)) => return,
            Ok(_) => {}
            Err(e) => {
                debug!(server, remote = %remote, "WebSocket read failed: {}", e);
                return;
            }
        }
    }
}

/// NMEA 0183 sentences over WebSocket at `/ws`, one sentence per text frame
pub struct WebSocketServer {
    core: Arc<ServerCore<WsSink>>,
    assets: StaticAssets,
}

impl WebSocketServer {
    pub fn new(config: ServerConfig, assets: StaticAssets) -> Self {
        Self {
            core: ServerCore::new("websocket", config.with_protocol(Protocol::Nmea0183)),
            assets,
        }
    }

    pub async fn start(&self, cancel: CancellationToken) -> Result<SocketAddr, NetError> {
        let addr = serve_websocket(&self.core, NMEA0183_WS_PATH, &self.assets, cancel.clone()).await?;
        self.core.spawn(run_sentence_broadcast(
            Arc::clone(&self.core),
            cancel,
            Pacer::Unpaced,
            "",
        ));
        Ok(addr)
    }

    pub async fn stop(&self) -> Result<(), NetError> {
        self.core.shutdown().await;
        Ok(())
    }

    pub async fn client_count(&self) -> usize {
        self.core.registry().len().await
    }
}

#[async_trait]
impl Server for WebSocketServer {
    fn name(&self) -> &'static str {
        self.core.name()
    }

    fn protocol(&self) -> Protocol {
        Protocol::Nmea0183
    }

    async fn start(&self, cancel: CancellationToken) -> Result<SocketAddr, NetError> {
        WebSocketServer::start(self, cancel).await
    }

    async fn stop(&self) -> Result<(), NetError> {
        WebSocketServer::stop(self).await
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.core.local_addr()
    }

    fn state(&self) -> ServerState {
        self.core.state()
    }

    async fn client_count(&self) -> usize {
        WebSocketServer::client_count(self).await
    }
}
