// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Aggregation Scheduler
//!
//! Coalesces bursts of write notifications into batch passes run on one
//! worker thread.
//!
//! - STAND_BY -> SCHEDULED on `schedule()`. The pass is due immediately,
//!   unless the previous pass ended within the debounce window, in which
//!   case it is delayed.
//! - SCHEDULED -> SCHEDULED on `schedule()`: the delay is re-armed, but the
//!   pass never becomes due later than the first request plus the cap.
//! - SCHEDULED -> RUNNING when due.
//! - RUNNING -> INTERRUPTED on `schedule()` within the cap: the running pass
//!   is cancelled and re-armed, keeping the first request time. Later
//!   requests only mark the pass for a rerun after it completes.
//! - RUNNING/INTERRUPTED -> SCHEDULED or STAND_BY on completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info};

use super::aggregator::{ContactAggregator, PassSummary};
use crate::config::SchedulerConfig;
use crate::error::AggregationResult;
use crate::storage::Storage;

/// Cooperative cancellation flag shared with a running pass.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A batch pass the scheduler can run.
pub trait AggregationPass: Send + 'static {
    fn run(&mut self, cancel: &CancellationToken) -> AggregationResult<PassSummary>;
}

impl<F> AggregationPass for F
where
    F: FnMut(&CancellationToken) -> AggregationResult<PassSummary> + Send + 'static,
{
    fn run(&mut self, cancel: &CancellationToken) -> AggregationResult<PassSummary> {
        self(cancel)
    }
}

/// Runs [`ContactAggregator::run_pass`] against a shared store.
pub struct StorePass {
    aggregator: ContactAggregator,
    store: Arc<Mutex<Storage>>,
}

impl StorePass {
    pub fn new(aggregator: ContactAggregator, store: Arc<Mutex<Storage>>) -> Self {
        StorePass { aggregator, store }
    }
}

impl AggregationPass for StorePass {
    fn run(&mut self, cancel: &CancellationToken) -> AggregationResult<PassSummary> {
        self.aggregator.run_pass(&self.store, cancel)
    }
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerStatus {
    StandBy,
    Scheduled,
    Running,
    Interrupted,
}

struct State {
    status: SchedulerStatus,
    /// First request of the batch being served.
    requested_at: Option<Instant>,
    due_at: Option<Instant>,
    last_pass_ended: Instant,
    /// A request arrived after the cap while running.
    rerun: bool,
    cancel: CancellationToken,
    passes_completed: u64,
    shutdown: bool,
}

struct Shared {
    config: SchedulerConfig,
    state: Mutex<State>,
    changed: Condvar,
}

impl Shared {
    /// Due time of a delayed pass, bounded by the batch's cap.
    fn delayed(&self, now: Instant, requested_at: Instant) -> Instant {
        (now + self.config.delay).min(requested_at + self.config.max_delay)
    }
}

/// Debounced single-worker trigger for aggregation passes.
pub struct AggregationScheduler {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl AggregationScheduler {
    /// Starts the worker thread.
    pub fn start<P: AggregationPass>(config: SchedulerConfig, pass: P) -> AggregationResult<Self> {
        let shared = Arc::new(Shared {
            config,
            state: Mutex::new(State {
                status: SchedulerStatus::StandBy,
                requested_at: None,
                due_at: None,
                last_pass_ended: Instant::now(),
                rerun: false,
                cancel: CancellationToken::new(),
                passes_completed: 0,
                shutdown: false,
            }),
            changed: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("contact-aggregation".to_string())
            .spawn(move || worker_loop(&worker_shared, pass))?;

        Ok(AggregationScheduler {
            shared,
            worker: Some(worker),
        })
    }

    /// Requests a pass. Cheap; callable from any thread.
    pub fn schedule(&self) {
        let now = Instant::now();
        let mut state = self.shared.state.lock();
        let config = &self.shared.config;

        match state.status {
            SchedulerStatus::StandBy => {
                state.status = SchedulerStatus::Scheduled;
                state.requested_at = Some(now);
                state.due_at = Some(if now.duration_since(state.last_pass_ended) < config.debounce_window {
                    now + config.delay
                } else {
                    now
                });
            }
            SchedulerStatus::Scheduled => {
                let requested_at = state.requested_at.unwrap_or(now);
                if now.duration_since(requested_at) < config.max_delay {
                    state.due_at = Some(self.shared.delayed(now, requested_at));
                }
            }
            SchedulerStatus::Running => {
                let requested_at = state.requested_at.unwrap_or(now);
                if now.duration_since(requested_at) < config.max_delay {
                    state.status = SchedulerStatus::Interrupted;
                    state.cancel.cancel();
                    debug!("Aggregation pass interrupted by new request");
                } else {
                    state.rerun = true;
                }
            }
            SchedulerStatus::Interrupted => {}
        }

        self.shared.changed.notify_all();
    }

    pub fn status(&self) -> SchedulerStatus {
        self.shared.state.lock().status
    }

    /// Number of passes run so far, including interrupted ones.
    pub fn passes_completed(&self) -> u64 {
        self.shared.state.lock().passes_completed
    }

    /// Blocks until the scheduler is idle or `timeout` elapses. Returns
    /// whether it is idle.
    pub fn wait_for_standby(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.status != SchedulerStatus::StandBy {
            if self.shared.changed.wait_until(&mut state, deadline).timed_out() {
                return state.status == SchedulerStatus::StandBy;
            }
        }
        true
    }

    /// Stops the worker after the current pass. Pending requests are dropped.
    pub fn shutdown(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            state.cancel.cancel();
        }
        self.shared.changed.notify_all();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Aggregation worker panicked");
            }
        }
    }
}

impl Drop for AggregationScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop<P: AggregationPass>(shared: &Shared, mut pass: P) {
    loop {
        let cancel = {
            let mut state = shared.state.lock();
            loop {
                if state.shutdown {
                    return;
                }
                match (state.status, state.due_at) {
                    (SchedulerStatus::Scheduled, Some(due)) if Instant::now() >= due => break,
                    (SchedulerStatus::Scheduled, Some(due)) => {
                        shared.changed.wait_until(&mut state, due);
                    }
                    _ => shared.changed.wait(&mut state),
                }
            }
            state.status = SchedulerStatus::Running;
            state.due_at = None;
            state.rerun = false;
            state.cancel = CancellationToken::new();
            state.cancel.clone()
        };

        match pass.run(&cancel) {
            Ok(summary) => debug!("Aggregation pass returned {:?}", summary),
            Err(e) => error!("Aggregation pass failed: {}", e),
        }

        let now = Instant::now();
        let mut state = shared.state.lock();
        state.last_pass_ended = now;
        state.passes_completed += 1;

        match state.status {
            SchedulerStatus::Interrupted => {
                let requested_at = state.requested_at.unwrap_or(now);
                state.status = SchedulerStatus::Scheduled;
                state.due_at = Some(shared.delayed(now, requested_at));
            }
            SchedulerStatus::Running if state.rerun => {
                state.status = SchedulerStatus::Scheduled;
                state.requested_at = Some(now);
                state.due_at = Some(now + shared.config.delay);
            }
            _ => {
                state.status = SchedulerStatus::StandBy;
                state.requested_at = None;
                state.due_at = None;
                info!("Aggregation scheduler idle after {} passes", state.passes_completed);
            }
        }
        drop(state);
        shared.changed.notify_all();
    }
}
