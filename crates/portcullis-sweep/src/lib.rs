//! Periodic session expiry for Portcullis.
//!
//! The sweeper wakes on a fixed cadence (default every 5 s), locks the
//! shared [`SessionStore`](portcullis_session::SessionStore) and removes
//! every session idle for longer than the store's TTL. The cadence and
//! the TTL are independent: with the defaults a session is gone somewhere
//! between 30 and 35 seconds after its last use.
//!
//! # Integration
//!
//! [`SweepScheduler`] is the timing half and can sit inside any
//! `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = &mut shutdown => break,
//!         tick = scheduler.wait_for_sweep() => {
//!             let evicted = store.lock().await.sweep(tick.at, ttl).len();
//!             scheduler.record_sweep(evicted);
//!         }
//!     }
//! }
//! ```
//!
//! [`Sweeper::spawn`] runs exactly that loop in its own task.

use std::time::Duration;

use portcullis_session::SharedStore;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the sweeper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Time between sweeps. Default: 5 seconds.
    pub interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

impl SweepConfig {
    /// Shortest accepted interval.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

    /// Create a config with a specific interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`SweepScheduler::new`]. An interval below
    /// [`Self::MIN_INTERVAL`] (including zero, which `tokio::time::interval`
    /// rejects) is raised to the minimum.
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                min_ms = Self::MIN_INTERVAL.as_millis() as u64,
                "sweep interval below minimum, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Sweep info and metrics
// ---------------------------------------------------------------------------

/// Returned by [`SweepScheduler::wait_for_sweep`] when a sweep is due.
#[derive(Debug, Clone)]
pub struct SweepTick {
    /// Monotonically increasing sweep number (starts at 1).
    pub sweep: u64,
    /// When the scheduler woke. Use this as `now` for the sweep.
    pub at: Instant,
}

/// Running totals for the sweeper.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepMetrics {
    /// Sweeps performed.
    pub total_sweeps: u64,
    /// Sessions removed across all sweeps.
    pub total_evicted: u64,
    /// Sessions removed by the most recent sweep.
    pub last_evicted: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-cadence sweep timer.
///
/// Missed ticks are skipped rather than replayed: if the runtime stalls
/// for several intervals, the next sweep happens once and the cadence
/// resumes from then.
pub struct SweepScheduler {
    interval: Interval,
    period: Duration,
    sweep_count: u64,
    metrics: SweepMetrics,
}

impl SweepScheduler {
    /// Create a scheduler. The first sweep is due one interval from now.
    pub fn new(config: SweepConfig) -> Self {
        let config = config.validated();
        let mut interval =
            time::interval_at(Instant::now() + config.interval, config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!(
            interval_ms = config.interval.as_millis() as u64,
            "sweep scheduler created"
        );

        Self {
            interval,
            period: config.interval,
            sweep_count: 0,
            metrics: SweepMetrics::default(),
        }
    }

    /// Wait until the next sweep is due.
    pub async fn wait_for_sweep(&mut self) -> SweepTick {
        self.interval.tick().await;
        self.sweep_count += 1;
        trace!(sweep = self.sweep_count, "sweep due");
        SweepTick {
            sweep: self.sweep_count,
            at: Instant::now(),
        }
    }

    /// Record how many sessions the last sweep removed.
    pub fn record_sweep(&mut self, evicted: usize) {
        let evicted = evicted as u64;
        self.metrics.total_sweeps += 1;
        self.metrics.total_evicted += evicted;
        self.metrics.last_evicted = evicted;
        if evicted > 0 {
            debug!(
                sweep = self.sweep_count,
                evicted,
                total_evicted = self.metrics.total_evicted,
                "sweep evicted idle sessions"
            );
        }
    }

    /// Number of sweeps that have come due.
    pub fn sweep_count(&self) -> u64 {
        self.sweep_count
    }

    /// Time between sweeps.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Snapshot of current metrics.
    pub fn metrics(&self) -> &SweepMetrics {
        &self.metrics
    }
}

// ---------------------------------------------------------------------------
// Background task
// ---------------------------------------------------------------------------

/// Spawns the sweep loop over a shared store.
pub struct Sweeper;

impl Sweeper {
    /// Start sweeping `store` on `config`'s cadence in a new task.
    ///
    /// The TTL is read from the store's own config on every sweep.
    /// Dropping the returned handle stops the task the next time it is
    /// polled, without waiting for another sweep.
    pub fn spawn(store: SharedStore, config: SweepConfig) -> SweeperHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let scheduler = SweepScheduler::new(config);
        let task = tokio::spawn(run(store, scheduler, shutdown_rx));
        SweeperHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

async fn run(
    store: SharedStore,
    mut scheduler: SweepScheduler,
    mut shutdown: oneshot::Receiver<()>,
) -> SweepMetrics {
    debug!(period_ms = scheduler.period().as_millis() as u64, "sweeper started");

    loop {
        tokio::select! {
            biased;
            // Fires on an explicit shutdown and when the handle is dropped.
            _ = &mut shutdown => break,
            tick = scheduler.wait_for_sweep() => {
                let evicted = {
                    let mut store = store.lock().await;
                    let ttl = store.config().ttl;
                    store.sweep(tick.at, ttl).len()
                };
                scheduler.record_sweep(evicted);
            }
        }
    }

    debug!(sweeps = scheduler.sweep_count(), "sweeper stopped");
    scheduler.metrics().clone()
}

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<SweepMetrics>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to finish.
    ///
    /// Returns the final metrics, or defaults if the task panicked.
    pub async fn shutdown(self) -> SweepMetrics {
        let _ = self.shutdown.send(());
        match self.task.await {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!(error = %e, "sweeper task did not finish cleanly");
                SweepMetrics::default()
            }
        }
    }

    /// Whether the task has already stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
