//! NMEA Network Servers
//!
//! Streams simulated NMEA data to any number of clients over four transports:
//!
//! - **[`TcpServer`]**: NMEA 0183 sentences, CRLF terminated, paced to an
//!   emulated serial baud rate
//! - **[`WebSocketServer`]**: the same sentences as WebSocket text frames
//! - **[`Tcp2000Server`]** / **[`WebSocket2000Server`]**: NMEA 2000 messages
//!   as `$PNMEA2K` frames, pushed by the simulator through [`nmea_sim::PgnSink`]
//!
//! Every server owns its own [`ClientRegistry`]; siblings never share one.
//! Stopping a server, or cancelling the token it was started with, closes the
//! listener and every client before `stop` returns.
//!
//! # Example
//!
//! ```rust,no_run
//! use nmea_net::{ServerConfig, TcpServer};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), nmea_net::NetError> {
//! let server = TcpServer::new(ServerConfig::default());
//! let cancel = CancellationToken::new();
//! let addr = server.start(cancel.clone()).await?;
//! println!("streaming on {addr}");
//! cancel.cancel();
//! server.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod config;
pub mod error;
mod http;
pub mod pacing;
pub mod registry;
pub mod server;
pub mod shutdown;
pub mod tcp;
pub mod tcp2000;
pub mod websocket;
pub mod websocket2000;

pub use assets::StaticAssets;
pub use config::{BaudRate, PacingPolicy, Protocol, ServerConfig};
pub use error::NetError;
pub use pacing::{Delivery, Pacer};
pub use registry::{BroadcastReport, ClientId, ClientRegistry, ClientSink, Registration};
pub use server::{Server, ServerCore, ServerState};
pub use shutdown::ShutdownSignal;
pub use tcp::TcpServer;
pub use tcp2000::Tcp2000Server;
pub use websocket::{WebSocketServer, NMEA0183_WS_PATH};
pub use websocket2000::{WebSocket2000Server, NMEA2000_WS_PATH};
