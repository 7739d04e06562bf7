//! Server lifecycle shared by every transport
//!
//! A concrete server owns an `Arc<ServerCore<S>>` holding its configuration,
//! client registry, shutdown signal and background tasks. The core drives the
//! state machine `Created -> Listening -> Serving -> ShuttingDown -> Stopped`
//! and performs the one teardown path used by both [`Server::stop`] and
//! parent-token cancellation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use nmea_sim::generate_sentences;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, warn};

use crate::config::{Protocol, ServerConfig};
use crate::error::NetError;
use crate::pacing::Pacer;
use crate::registry::{ClientRegistry, ClientSink};
use crate::shutdown::ShutdownSignal;

/// How long `stop` waits for background tasks before giving up on them
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Lifecycle state of a server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Created,
    Listening,
    Serving,
    ShuttingDown,
    Stopped,
}

impl ServerState {
    fn to_u8(self) -> u8 {
        match self {
            ServerState::Created => 0,
            ServerState::Listening => 1,
            ServerState::Serving => 2,
            ServerState::ShuttingDown => 3,
            ServerState::Stopped => 4,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => ServerState::Created,
            1 => ServerState::Listening,
            2 => ServerState::Serving,
            3 => ServerState::ShuttingDown,
            _ => ServerState::Stopped,
        }
    }
}

/// Capabilities every transport server provides
#[async_trait]
pub trait Server: Send + Sync {
    /// Short name used in logs, e.g. `"tcp"` or `"websocket2000"`
    fn name(&self) -> &'static str;

    fn protocol(&self) -> Protocol;

    /// Bind and begin serving until `cancel` fires or [`stop`](Self::stop)
    /// is called. Bind failures are returned; nothing is spawned then.
    async fn start(&self, cancel: CancellationToken) -> Result<SocketAddr, NetError>;

    /// Close the listener and every client. Safe to call repeatedly.
    async fn stop(&self) -> Result<(), NetError>;

    /// Bound address once serving
    fn local_addr(&self) -> Option<SocketAddr>;

    fn state(&self) -> ServerState;

    async fn client_count(&self) -> usize;
}

/// State shared between a server handle and its background tasks
pub struct ServerCore<S> {
    name: &'static str,
    config: ServerConfig,
    registry: ClientRegistry<S>,
    shutdown: ShutdownSignal,
    state: AtomicU8,
    tasks: TaskTracker,
    teardown: Mutex<()>,
    local_addr: OnceLock<SocketAddr>,
}

impl<S: ClientSink> ServerCore<S> {
    pub fn new(name: &'static str, config: ServerConfig) -> Arc<Self> {
        let registry = ClientRegistry::new(name, config.write_timeout);
        Arc::new(Self {
            name,
            config,
            registry,
            shutdown: ShutdownSignal::new(),
            state: AtomicU8::new(ServerState::Created.to_u8()),
            tasks: TaskTracker::new(),
            teardown: Mutex::new(()),
            local_addr: OnceLock::new(),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ClientRegistry<S> {
        &self.registry
    }

    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    pub fn state(&self) -> ServerState {
        ServerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: ServerState) {
        self.state.store(state.to_u8(), Ordering::SeqCst);
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// `Created -> Listening` and bind the configured address
    pub(crate) async fn bind(&self) -> Result<TcpListener, NetError> {
        if let Err(current) = self.state.compare_exchange(
            ServerState::Created.to_u8(),
            ServerState::Listening.to_u8(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            return Err(NetError::AlreadyStarted(ServerState::from_u8(current)));
        }

        let addr = self.config.bind_addr();
        match TcpListener::bind(&addr).await {
            Ok(listener) => Ok(listener),
            Err(source) => {
                error!(server = self.name, "Failed to bind {}: {}", addr, source);
                self.shutdown.trigger();
                self.set_state(ServerState::Stopped);
                Err(NetError::Bind { addr, source })
            }
        }
    }

    /// `Listening -> Serving` and record the bound address
    pub(crate) fn mark_serving(&self, addr: SocketAddr) {
        let _ = self.local_addr.set(addr);
        // A concurrent stop may already have moved past Listening
        let _ = self.state.compare_exchange(
            ServerState::Listening.to_u8(),
            ServerState::Serving.to_u8(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        info!(server = self.name, protocol = self.config.protocol.name(), "Listening on {}", addr);
    }

    /// Spawn a task that `stop` waits for
    pub(crate) fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    /// Make `stop` wait for a future spawned elsewhere
    pub(crate) fn track<F: Future>(&self, fut: F) -> impl Future<Output = F::Output> {
        self.tasks.track_future(fut)
    }

    /// Tear down when the parent token fires
    pub(crate) fn watch_cancellation(self: &Arc<Self>, cancel: CancellationToken) {
        let core = Arc::clone(self);
        // Not tracked: it runs the teardown that waits on tracked tasks
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(server = core.name, "Parent cancelled");
                    core.shutdown().await;
                }
                _ = core.shutdown.wait() => {}
            }
        });
    }

    /// Run `fut` unless the server is told to stop first
    pub(crate) async fn until_shutdown<F: Future>(
        &self,
        cancel: &CancellationToken,
        fut: F,
    ) -> Option<F::Output> {
        tokio::select! {
            _ = cancel.cancelled() => None,
            _ = self.shutdown.wait() => None,
            out = fut => Some(out),
        }
    }

    /// Fire the shutdown signal, close every client and wait for the
    /// background tasks. Only the first caller does the work.
    pub async fn shutdown(&self) {
        let _guard = self.teardown.lock().await;
        if self.state() == ServerState::Stopped {
            return;
        }

        self.shutdown.trigger();
        self.set_state(ServerState::ShuttingDown);
        info!(server = self.name, "Shutting down");

        let closed = self.registry.shutdown().await;
        self.tasks.close();
        if timeout(SHUTDOWN_GRACE, self.tasks.wait()).await.is_err() {
            warn!(
                server = self.name,
                pending = self.tasks.len(),
                "Tasks still running after {:?}",
                SHUTDOWN_GRACE
            );
        }

        self.set_state(ServerState::Stopped);
        info!(server = self.name, clients = closed, "Stopped");
    }
}

/// Generate a sentence batch every update interval and broadcast it
pub(crate) async fn run_sentence_broadcast<S: ClientSink>(
    core: Arc<ServerCore<S>>,
    cancel: CancellationToken,
    pacer: Pacer,
    line_ending: &'static str,
) {
    let period = core.config.update_interval.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        if core.until_shutdown(&cancel, ticker.tick()).await.is_none() {
            break;
        }

        let batch: Vec<String> = generate_sentences(&core.config.sentences)
            .into_iter()
            .map(|sentence| sentence + line_ending)
            .collect();
        match core
            .until_shutdown(&cancel, core.registry.broadcast(&batch, &pacer))
            .await
        {
            Some(report) => trace!(
                server = core.name,
                clients = report.clients,
                bytes = report.bytes,
                "Broadcast tick"
            ),
            None => break,
        }
    }

    debug!(server = core.name, "Broadcast loop stopped");
}
