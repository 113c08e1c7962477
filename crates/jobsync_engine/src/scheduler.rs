use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use jobsync_core::SyncError;
use jobsync_logging::{set_poll_generation, sync_debug, sync_trace, sync_warn};
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::registry::JobRegistry;
use crate::workers::WorkerActivityView;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Something the scheduler refreshes on every pass.
#[async_trait]
pub trait PollTarget: Send + Sync {
    fn name(&self) -> &'static str;
    /// Runs one refresh; failures are already recorded by the target.
    async fn poll(&self) -> Option<SyncError>;
}

#[async_trait]
impl PollTarget for JobRegistry {
    fn name(&self) -> &'static str {
        "active jobs"
    }

    async fn poll(&self) -> Option<SyncError> {
        self.refresh().await.error
    }
}

#[async_trait]
impl PollTarget for WorkerActivityView {
    fn name(&self) -> &'static str {
        "workers"
    }

    async fn poll(&self) -> Option<SyncError> {
        self.refresh().await.error
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A refresh pass ran on the caller's task.
    Completed,
    /// A pass was already running; the call returned once a follow-up pass,
    /// started after the call, had finished.
    Coalesced,
}

struct Inner {
    targets: Vec<Arc<dyn PollTarget>>,
    in_flight: AtomicBool,
    rerun: AtomicBool,
    generation: AtomicU64,
    /// Generation of the last finished pass. Also nudged when a flight is released.
    finished: watch::Sender<u64>,
}

impl Inner {
    async fn pass(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        for target in &self.targets {
            // The pass may resume on another worker thread.
            set_poll_generation(generation);
            sync_trace!("Refreshing {}", target.name());
            if let Some(err) = target.poll().await {
                set_poll_generation(generation);
                sync_warn!("{} refresh failed: {}", target.name(), err);
            }
        }
        set_poll_generation(0);
        generation
    }
}

/// Owns the single in-flight slot; releasing happens on drop so a cancelled
/// pass never leaves the scheduler wedged.
struct Flight {
    inner: Arc<Inner>,
}

impl Flight {
    fn try_claim(inner: &Arc<Inner>) -> Option<Self> {
        inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                inner: inner.clone(),
            })
    }

    async fn drive(mut self) {
        loop {
            loop {
                self.inner.rerun.store(false, Ordering::Release);
                let generation = self.inner.pass().await;
                self.inner.finished.send_replace(generation);
                if !self.inner.rerun.load(Ordering::Acquire) {
                    break;
                }
            }

            let inner = self.inner.clone();
            drop(self);
            // A follow-up requested between the last check and the release.
            if !inner.rerun.load(Ordering::Acquire) {
                return;
            }
            match Flight::try_claim(&inner) {
                Some(flight) => self = flight,
                None => return,
            }
        }
    }
}

impl Drop for Flight {
    fn drop(&mut self) {
        self.inner.in_flight.store(false, Ordering::Release);
        self.inner.finished.send_modify(|_| {});
    }
}

struct Timer {
    cancel: CancellationToken,
    interval: Duration,
}

/// Periodic, single-flight driver for the registry and worker refreshes.
///
/// `start` must be called from inside a tokio runtime.
pub struct PollingScheduler {
    inner: Arc<Inner>,
    timer: Mutex<Option<Timer>>,
}

impl PollingScheduler {
    pub fn new(targets: Vec<Arc<dyn PollTarget>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                targets,
                in_flight: AtomicBool::new(false),
                rerun: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                finished: watch::Sender::new(0),
            }),
            timer: Mutex::new(None),
        }
    }

    /// Starts ticking every `interval`, replacing any previous timer. The
    /// first tick fires one interval from now.
    pub fn start(&self, interval: Duration) {
        let interval = interval.max(MIN_INTERVAL);
        let mut timer = self.lock_timer();
        if let Some(previous) = timer.take() {
            previous.cancel.cancel();
        }

        let cancel = CancellationToken::new();
        tokio::spawn(tick_loop(self.inner.clone(), interval, cancel.clone()));
        sync_debug!("Polling every {:?}", interval);
        *timer = Some(Timer { cancel, interval });
    }

    /// Cancels the timer. A pass already running is left to finish.
    pub fn stop(&self) {
        if let Some(timer) = self.lock_timer().take() {
            timer.cancel.cancel();
            sync_debug!("Polling stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_timer().is_some()
    }

    pub fn interval(&self) -> Option<Duration> {
        self.lock_timer().as_ref().map(|timer| timer.interval)
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Number of refresh passes started so far.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Relaxed)
    }

    /// Refreshes now without touching the timer.
    ///
    /// Returns only after a pass that started after this call has finished,
    /// so every request it observes was issued after the caller's own work.
    /// Calls made while a pass runs share one follow-up pass.
    pub async fn poll_once(&self) -> PollOutcome {
        if let Some(flight) = Flight::try_claim(&self.inner) {
            flight.drive().await;
            return PollOutcome::Completed;
        }

        // Read before raising the flag: any pass numbered above `seen` begins
        // after this point.
        let seen = self.inner.generation.load(Ordering::Acquire);
        let mut finished = self.inner.finished.subscribe();
        self.inner.rerun.store(true, Ordering::Release);
        sync_debug!("Refresh in flight, waiting for follow-up after pass {}", seen);

        loop {
            if *finished.borrow_and_update() > seen {
                return PollOutcome::Coalesced;
            }
            // The running flight may have released before seeing the flag.
            if let Some(flight) = Flight::try_claim(&self.inner) {
                flight.drive().await;
                continue;
            }
            if finished.changed().await.is_err() {
                return PollOutcome::Coalesced;
            }
        }
    }

    fn lock_timer(&self) -> MutexGuard<'_, Option<Timer>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn tick_loop(inner: Arc<Inner>, period: Duration, cancel: CancellationToken) {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticks.tick() => {}
        }

        match Flight::try_claim(&inner) {
            // Spawned so that stopping the timer never aborts a running pass.
            Some(flight) => {
                tokio::spawn(flight.drive());
            }
            None => sync_debug!("Tick skipped, refresh still in flight"),
        }
    }
}
