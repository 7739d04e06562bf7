//! Error types for the simulation layer

use thiserror::Error;

/// Error type returned by [`PgnSink`](crate::PgnSink) implementations
pub type SinkError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while running the NMEA 2000 simulator
#[derive(Debug, Error)]
pub enum SimError {
    /// A sink failed to start; sinks started before it have been stopped again
    #[error("failed to start sink {sink}: {source}")]
    SinkStart {
        /// Name of the failing sink
        sink: String,
        #[source]
        source: SinkError,
    },

    /// A sink failed to stop cleanly
    #[error("failed to stop sink {sink}: {source}")]
    SinkStop {
        /// Name of the failing sink
        sink: String,
        #[source]
        source: SinkError,
    },

    /// Start called on a simulator that is already running
    #[error("simulator already running")]
    AlreadyRunning,
}
