//! Capability trait for NMEA 2000 transports

use async_trait::async_trait;
use nmea_protocol::Message;
use tokio_util::sync::CancellationToken;

use crate::error::SinkError;

/// A transport the simulator can start, stop and push messages into.
///
/// Implemented by the NMEA 2000 TCP and WebSocket servers, and by test doubles.
#[async_trait]
pub trait PgnSink: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Start serving. `cancel` is the parent cancellation token; the sink must
    /// wind down on its own once it fires.
    async fn start(&self, cancel: CancellationToken) -> Result<(), SinkError>;

    /// Stop serving. Must be safe to call more than once.
    async fn stop(&self) -> Result<(), SinkError>;

    /// Deliver one message to every connected consumer
    async fn send_pgn(&self, msg: &Message) -> Result<(), SinkError>;
}
