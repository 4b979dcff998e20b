// Live-stream simulator: one cancelable tokio task that random-walks the last sample once per tick.
// The task never holds the session alive; it upgrades a weak handle per tick and exits when the
// session is gone or its epoch is no longer current.

use std::sync::Weak;

use chrono::Duration as ChronoDuration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{Mutex, broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};

use crate::models::{Sample, SessionEvent, round2};
use crate::session::SessionState;

/// Max absolute random step per tick, in percentage points.
pub const USER_STEP: f64 = 5.0;
pub const SYS_STEP: f64 = 2.5;
pub const MEM_STEP: f64 = 1.0;

/// Derives the next sample: +1s, bounded random walk on each percentage, clamped to [0, 100].
pub fn next_sample<R: Rng + ?Sized>(last: &Sample, rng: &mut R) -> Sample {
    Sample {
        timestamp: last.timestamp + ChronoDuration::seconds(1),
        pid: last.pid,
        cpu_user_percent: walk(last.cpu_user_percent, USER_STEP, rng),
        cpu_sys_percent: walk(last.cpu_sys_percent, SYS_STEP, rng),
        memory_percent: last.memory_percent.map(|m| walk(m, MEM_STEP, rng)),
        command: last.command.clone(),
    }
}

fn walk<R: Rng + ?Sized>(value: f64, step: f64, rng: &mut R) -> f64 {
    round2((value + rng.gen_range(-step..=step)).clamp(0.0, 100.0))
}

/// Idle/active state machine owning at most one tick task.
#[derive(Debug, Default)]
pub struct StreamSimulator {
    task: Option<StreamTask>,
    next_epoch: u64,
}

#[derive(Debug)]
struct StreamTask {
    epoch: u64,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl StreamSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    /// True while the task started with `epoch` is the live one.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.task.as_ref().is_some_and(|t| t.epoch == epoch)
    }

    /// idle → active. `spawn` receives the new epoch and shutdown receiver.
    /// Returns false (and spawns nothing) if already active.
    pub fn start<F>(&mut self, spawn: F) -> bool
    where
        F: FnOnce(u64, oneshot::Receiver<()>) -> JoinHandle<()>,
    {
        if self.task.is_some() {
            return false;
        }
        self.next_epoch += 1;
        let epoch = self.next_epoch;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = spawn(epoch, shutdown_rx);
        self.task = Some(StreamTask {
            epoch,
            shutdown_tx,
            handle,
        });
        true
    }

    /// active → idle. Returns false if already idle.
    pub fn stop(&mut self) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };
        let _ = task.shutdown_tx.send(());
        task.handle.abort();
        true
    }
}

impl Drop for StreamSimulator {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.handle.abort();
        }
    }
}

/// Session handle, event channel, epoch and shutdown for one tick task.
pub struct StreamDeps {
    pub state: Weak<Mutex<SessionState>>,
    pub events: broadcast::Sender<SessionEvent>,
    pub epoch: u64,
    pub shutdown_rx: oneshot::Receiver<()>,
}

pub struct StreamTaskConfig {
    pub tick_interval: Duration,
    pub window_capacity: usize,
}

pub fn spawn(deps: StreamDeps, config: StreamTaskConfig) -> JoinHandle<()> {
    let StreamDeps {
        state,
        events,
        epoch,
        mut shutdown_rx,
    } = deps;
    let StreamTaskConfig {
        tick_interval,
        window_capacity,
    } = config;

    tokio::spawn(async move {
        let mut rng = StdRng::from_entropy();
        // First tick one full interval after start, not immediately.
        let mut tick = interval_at(Instant::now() + tick_interval, tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let Some(state) = state.upgrade() else {
                        tracing::debug!(epoch, "Session dropped; stream task exiting");
                        break;
                    };
                    let mut guard = state.lock().await;
                    if !guard.simulator.is_current(epoch) {
                        tracing::debug!(epoch, "Stale stream tick discarded");
                        break;
                    }
                    let Some(last) = guard.store.last() else {
                        continue;
                    };
                    let sample = next_sample(last, &mut rng);
                    guard.store.append_windowed(sample.clone(), window_capacity);
                    let len = guard.store.len();
                    // Published under the lock so it cannot trail a StreamStopped event.
                    let _ = events.send(SessionEvent::Sample { sample });
                    drop(guard);

                    tracing::debug!(epoch, window_len = len, "Stream tick");
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!(epoch, "Stream task shutting down");
                    break;
                }
            }
        }
    })
}
