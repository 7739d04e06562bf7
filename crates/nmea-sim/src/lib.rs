//! NMEA Simulation Library
//!
//! This crate produces the synthetic data the simulator streams:
//!
//! - **Sentence generators**: NMEA 0183 position (GGA, GLL), navigation
//!   (RMC, HDT, VTG, XTE) and environment (DBT, MTW, MWV, VHW, DPT) sentences
//!   with randomized in-range values, selected through [`SentenceOptions`]
//! - **Message batches**: NMEA 2000 PGN messages from a [`MessageSource`]
//! - **Simulator**: a periodic loop pushing each batch into every [`PgnSink`]
//!
//! # Example
//!
//! ```rust
//! use nmea_sim::{generate_sentences, SentenceOptions};
//!
//! let sentences = generate_sentences(&SentenceOptions::position_only());
//! assert!(sentences[0].starts_with("$GPGGA"));
//! assert!(sentences[1].starts_with("$GPGLL"));
//! ```

pub mod environment;
pub mod error;
pub mod messages;
pub mod navigation;
pub mod position;
pub mod sentences;
pub mod simulator;
pub mod sink;

pub use error::{SimError, SinkError};
pub use messages::{CannedMessages, MessageSource};
pub use sentences::{generate_sentences, SentenceOptions};
pub use simulator::{Simulator, DEFAULT_UPDATE_PERIOD};
pub use sink::PgnSink;
