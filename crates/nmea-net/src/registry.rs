//! Client registry and broadcast
//!
//! Each server owns one [`ClientRegistry`]. Structure changes (register,
//! remove, shutdown) take the write lock; a broadcast takes the read lock only
//! long enough to snapshot the members, then writes to every client
//! concurrently. Each client's sink sits behind its own mutex, so writes to one
//! client are serialized while clients never wait on each other.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::pacing::{Delivery, Pacer};

/// Write half of a client connection
#[async_trait]
pub trait ClientSink: Send + 'static {
    /// Write one payload completely
    async fn send(&mut self, payload: &[u8]) -> io::Result<()>;

    /// Close the connection. Errors are not interesting at this point.
    async fn close(&mut self);
}

/// Registry-assigned client identifier, unique per registry
pub type ClientId = u64;

struct Client<S> {
    id: ClientId,
    remote: SocketAddr,
    sink: Mutex<S>,
    cancel: CancellationToken,
}

/// Handle returned to the connection's reader task
#[derive(Debug, Clone)]
pub struct Registration {
    pub id: ClientId,
    /// Cancelled when the client is removed or the registry shuts down
    pub cancel: CancellationToken,
}

/// Summary of one broadcast call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Members at the time of the snapshot
    pub clients: usize,
    /// Bytes written across all clients
    pub bytes: usize,
    /// Payloads skipped by pacing, summed over clients
    pub dropped_payloads: usize,
    /// Clients removed because a write failed
    pub removed: usize,
}

struct Members<S> {
    clients: HashMap<ClientId, Arc<Client<S>>>,
    closed: bool,
}

/// Set of connected clients for one server
pub struct ClientRegistry<S> {
    label: String,
    write_timeout: Duration,
    members: RwLock<Members<S>>,
    next_id: AtomicU64,
    root: CancellationToken,
}

impl<S: ClientSink> ClientRegistry<S> {
    pub fn new(label: impl Into<String>, write_timeout: Duration) -> Self {
        Self {
            label: label.into(),
            write_timeout,
            members: RwLock::new(Members {
                clients: HashMap::new(),
                closed: false,
            }),
            next_id: AtomicU64::new(1),
            root: CancellationToken::new(),
        }
    }

    /// Name used in log lines
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Add a client.
    ///
    /// Returns `None` once the registry has shut down; the sink is closed
    /// before returning in that case.
    pub async fn register(&self, remote: SocketAddr, mut sink: S) -> Option<Registration> {
        let mut members = self.members.write().await;
        if members.closed {
            drop(members);
            debug!(server = %self.label, remote = %remote, "Rejecting client after shutdown");
            let _ = timeout(self.write_timeout, sink.close()).await;
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = self.root.child_token();
        members.clients.insert(
            id,
            Arc::new(Client {
                id,
                remote,
                sink: Mutex::new(sink),
                cancel: cancel.clone(),
            }),
        );
        let count = members.clients.len();
        drop(members);

        info!(server = %self.label, remote = %remote, clients = count, "Client connected");
        Some(Registration { id, cancel })
    }

    /// Remove and close a client.
    ///
    /// Returns `true` only for the call that actually removed it, so a client
    /// is closed exactly once no matter how many paths notice its failure.
    pub async fn remove(&self, id: ClientId) -> bool {
        let removed = {
            let mut members = self.members.write().await;
            members.clients.remove(&id)
        };
        let Some(client) = removed else {
            return false;
        };

        client.cancel.cancel();
        self.close_client(&client).await;
        info!(server = %self.label, remote = %client.remote, "Client disconnected");
        true
    }

    /// Deliver `payloads` in order to every member under `pacer`.
    ///
    /// A client whose write fails is removed and closed before this returns;
    /// its siblings are unaffected. Nothing is written once the registry has
    /// shut down.
    pub async fn broadcast<P>(&self, payloads: &[P], pacer: &Pacer) -> BroadcastReport
    where
        P: AsRef<[u8]> + Sync,
    {
        let snapshot: Vec<Arc<Client<S>>> = {
            let members = self.members.read().await;
            if members.closed {
                return BroadcastReport::default();
            }
            members.clients.values().cloned().collect()
        };
        if snapshot.is_empty() {
            return BroadcastReport::default();
        }

        let outcomes = join_all(
            snapshot
                .iter()
                .map(|client| self.deliver_to(client, payloads, pacer)),
        )
        .await;

        let mut report = BroadcastReport {
            clients: snapshot.len(),
            ..BroadcastReport::default()
        };
        let mut failed = Vec::new();
        for (client, outcome) in snapshot.iter().zip(outcomes) {
            match outcome {
                Ok(delivery) => {
                    report.bytes += delivery.bytes;
                    report.dropped_payloads += delivery.dropped;
                }
                Err(e) => {
                    warn!(server = %self.label, remote = %client.remote, "Write failed, dropping client: {}", e);
                    failed.push(client.id);
                }
            }
        }

        for id in failed {
            if self.remove(id).await {
                report.removed += 1;
            }
        }

        if report.dropped_payloads > 0 {
            debug!(
                server = %self.label,
                dropped = report.dropped_payloads,
                "Baud budget exhausted for some clients this tick"
            );
        }
        report
    }

    async fn deliver_to<P>(
        &self,
        client: &Client<S>,
        payloads: &[P],
        pacer: &Pacer,
    ) -> io::Result<Delivery>
    where
        P: AsRef<[u8]> + Sync,
    {
        if client.cancel.is_cancelled() {
            return Ok(Delivery::default());
        }
        let mut sink = client.sink.lock().await;
        tokio::select! {
            _ = client.cancel.cancelled() => Ok(Delivery::default()),
            result = pacer.deliver(&mut *sink, payloads, self.write_timeout) => result,
        }
    }

    /// Close every client and refuse new ones. Returns how many were closed.
    ///
    /// Safe to call more than once; later calls find nothing to close.
    pub async fn shutdown(&self) -> usize {
        let drained: Vec<Arc<Client<S>>> = {
            let mut members = self.members.write().await;
            members.closed = true;
            members.clients.drain().map(|(_, client)| client).collect()
        };

        // Aborts in-flight deliveries so their sink locks are released
        self.root.cancel();
        join_all(drained.iter().map(|client| self.close_client(client))).await;

        if !drained.is_empty() {
            info!(server = %self.label, clients = drained.len(), "Closed all clients");
        }
        drained.len()
    }

    async fn close_client(&self, client: &Client<S>) {
        let mut sink = client.sink.lock().await;
        if timeout(self.write_timeout, sink.close()).await.is_err() {
            debug!(server = %self.label, remote = %client.remote, "Close timed out");
        }
    }

    pub async fn len(&self) -> usize {
        self.members.read().await.clients.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_closed(&self) -> bool {
        self.members.read().await.closed
    }
}
