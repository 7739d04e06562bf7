//! Baud-rate pacing for outbound client writes
//!
//! The text path emulates a serial link. [`Pacer::Budget`] caps the bytes a
//! client may receive per update tick, [`Pacer::PerByte`] spreads the bytes
//! out at the link's byte rate. The PGN and WebSocket paths use
//! [`Pacer::Unpaced`].

use std::io;
use std::time::Duration;

use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::registry::ClientSink;

/// Write schedule applied to a single client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacer {
    /// Every payload is written immediately
    Unpaced,
    /// Payloads are written in order while they fit in the tick's budget;
    /// the first payload that would overrun it and everything after it are
    /// dropped for this tick
    Budget { bytes_per_tick: usize },
    /// One byte per gate tick; each delivery owns its gate
    PerByte { byte_period: Duration },
}

/// Outcome of delivering one batch to one client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Bytes written
    pub bytes: usize,
    /// Payloads written in full
    pub written: usize,
    /// Payloads skipped because the budget was spent
    pub dropped: usize,
}

impl Delivery {
    fn record(&mut self, len: usize) {
        self.bytes += len;
        self.written += 1;
    }
}

impl Pacer {
    /// Per-byte pacer for a link moving `bytes_per_second`
    pub fn per_byte(bytes_per_second: u32) -> Self {
        let rate = u64::from(bytes_per_second.max(1));
        let byte_period = Duration::from_nanos(1_000_000_000 / rate).max(Duration::from_nanos(1));
        Pacer::PerByte { byte_period }
    }

    /// Write `payloads` to `sink` in order under this schedule.
    ///
    /// Any write error, or a write exceeding `write_timeout`, aborts the
    /// delivery and is returned.
    pub async fn deliver<S, P>(
        &self,
        sink: &mut S,
        payloads: &[P],
        write_timeout: Duration,
    ) -> io::Result<Delivery>
    where
        S: ClientSink + ?Sized,
        P: AsRef<[u8]> + Sync,
    {
        let mut delivery = Delivery::default();

        match *self {
            Pacer::Unpaced => {
                for payload in payloads {
                    let payload = payload.as_ref();
                    write_with_timeout(sink, payload, write_timeout).await?;
                    delivery.record(payload.len());
                }
            }
            Pacer::Budget { bytes_per_tick } => {
                for (index, payload) in payloads.iter().enumerate() {
                    let payload = payload.as_ref();
                    if delivery.bytes + payload.len() > bytes_per_tick {
                        delivery.dropped = payloads.len() - index;
                        break;
                    }
                    write_with_timeout(sink, payload, write_timeout).await?;
                    delivery.record(payload.len());
                }
            }
            Pacer::PerByte { byte_period } => {
                let mut gate = interval(byte_period);
                gate.set_missed_tick_behavior(MissedTickBehavior::Delay);
                for payload in payloads {
                    let payload = payload.as_ref();
                    for byte in payload.chunks(1) {
                        gate.tick().await;
                        write_with_timeout(sink, byte, write_timeout).await?;
                    }
                    delivery.record(payload.len());
                }
            }
        }

        Ok(delivery)
    }
}

async fn write_with_timeout<S>(sink: &mut S, bytes: &[u8], limit: Duration) -> io::Result<()>
where
    S: ClientSink + ?Sized,
{
    match timeout(limit, sink.send(bytes)).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("write did not complete within {limit:?}"),
        )),
    }
}
