//! Error types for the network servers

use thiserror::Error;

use crate::server::ServerState;

/// Errors that can occur while starting or stopping a server.
///
/// Per-client failures never surface here; they are logged and the client is
/// dropped from its registry.
#[derive(Debug, Error)]
pub enum NetError {
    /// Listener could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Start called on a server that is not freshly created
    #[error("server already started (state {0:?})")]
    AlreadyStarted(ServerState),

    /// Baud rate outside the supported set
    #[error("unsupported baud rate {0}")]
    UnsupportedBaudRate(u32),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
