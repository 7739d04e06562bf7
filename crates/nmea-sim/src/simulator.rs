//! NMEA 2000 simulator
//!
//! Periodically builds a batch of PGN messages and pushes every message to
//! every registered [`PgnSink`]. The simulator owns the lifecycle of its
//! sinks: starting it starts them, stopping it stops them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::SimError;
use crate::messages::{CannedMessages, MessageSource};
use crate::sink::PgnSink;

/// Default interval between batches
pub const DEFAULT_UPDATE_PERIOD: Duration = Duration::from_secs(1);

/// Handle to the running simulation loop
struct Running {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

/// Shortest accepted update period; tokio intervals reject zero
const MIN_UPDATE_PERIOD: Duration = Duration::from_millis(1);

/// Pushes a fixed batch of NMEA 2000 messages to its sinks on every tick
pub struct Simulator {
    sinks: Vec<Arc<dyn PgnSink>>,
    source: Arc<dyn MessageSource>,
    update_period: Duration,
    running: Mutex<Option<Running>>,
}

impl Simulator {
    /// Create a simulator sending the canned batch to `sinks`.
    ///
    /// Periods shorter than one millisecond are raised to one millisecond.
    pub fn new(sinks: Vec<Arc<dyn PgnSink>>, update_period: Duration) -> Self {
        Self {
            sinks,
            source: Arc::new(CannedMessages),
            update_period: update_period.max(MIN_UPDATE_PERIOD),
            running: Mutex::new(None),
        }
    }

    /// Replace the message source
    pub fn with_source(mut self, source: Arc<dyn MessageSource>) -> Self {
        self.source = source;
        self
    }

    /// Interval between batches
    pub fn update_period(&self) -> Duration {
        self.update_period
    }

    /// Whether the simulation loop is currently running
    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    /// Start every sink, then the simulation loop.
    ///
    /// If a sink fails to start, the sinks started before it are stopped again
    /// and the error is returned; the loop is not spawned.
    pub async fn start(&self, cancel: CancellationToken) -> Result<(), SimError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(SimError::AlreadyRunning);
        }

        let mut started: Vec<&Arc<dyn PgnSink>> = Vec::with_capacity(self.sinks.len());
        for sink in &self.sinks {
            if let Err(source) = sink.start(cancel.clone()).await {
                error!("Failed to start sink {}: {}", sink.name(), source);
                for prior in started.iter().rev() {
                    if let Err(e) = prior.stop().await {
                        warn!("Failed to stop sink {} during rollback: {}", prior.name(), e);
                    }
                }
                return Err(SimError::SinkStart {
                    sink: sink.name().to_string(),
                    source,
                });
            }
            debug!("Sink {} started", sink.name());
            started.push(sink);
        }

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run_simulation_loop(
            self.sinks.clone(),
            Arc::clone(&self.source),
            self.update_period,
            cancel,
            shutdown.clone(),
        ));
        *running = Some(Running { shutdown, task });

        info!(
            "NMEA 2000 simulator started with {} sink(s), period {:?}",
            self.sinks.len(),
            self.update_period
        );
        Ok(())
    }

    /// Stop the simulation loop, then every sink.
    ///
    /// All sinks are stopped even if some fail; the first failure is returned.
    pub async fn stop(&self) -> Result<(), SimError> {
        if let Some(running) = self.running.lock().await.take() {
            running.shutdown.cancel();
            if let Err(e) = running.task.await {
                warn!("Simulation loop ended abnormally: {}", e);
            }
        }

        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(source) = sink.stop().await {
                warn!("Failed to stop sink {}: {}", sink.name(), source);
                if first_error.is_none() {
                    first_error = Some(SimError::SinkStop {
                        sink: sink.name().to_string(),
                        source,
                    });
                }
            }
        }

        info!("NMEA 2000 simulator stopped");
        first_error.map_or(Ok(()), Err)
    }
}

async fn run_simulation_loop(
    sinks: Vec<Arc<dyn PgnSink>>,
    source: Arc<dyn MessageSource>,
    period: Duration,
    cancel: CancellationToken,
    shutdown: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Simulation loop cancelled");
                break;
            }
            _ = shutdown.cancelled() => {
                debug!("Simulation loop shut down");
                break;
            }
            _ = ticker.tick() => {
                publish_batch(&sinks, source.as_ref()).await;
            }
        }
    }
}

async fn publish_batch(sinks: &[Arc<dyn PgnSink>], source: &dyn MessageSource) {
    for msg in source.next_batch() {
        for sink in sinks {
            if let Err(e) = sink.send_pgn(&msg).await {
                warn!(pgn = msg.pgn, "Sink {} rejected message: {}", sink.name(), e);
            }
        }
    }
}
