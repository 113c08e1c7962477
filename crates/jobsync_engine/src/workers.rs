use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use jobsync_core::{correlate, CorrelatedActivity, RegistrySnapshot, SyncError, WorkerSnapshot};
use jobsync_logging::{sync_debug, sync_warn};

use crate::gateway::{ApiRequest, AuthGateway};
use crate::sink::{SnapshotSink, SyncEvent};
use crate::wire::{decode_workers, expect_success};

pub const WORKER_ACTIVITY_PATH: &str = "/scraping/workers/activity";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRefresh {
    pub snapshot: WorkerSnapshot,
    pub changed: bool,
    pub error: Option<SyncError>,
}

#[derive(Debug, Default)]
struct WorkerCache {
    snapshot: WorkerSnapshot,
    last_error: Option<SyncError>,
}

/// Read-only view of what the crawler workers report they are doing.
pub struct WorkerActivityView {
    gateway: Arc<dyn AuthGateway>,
    cache: Mutex<WorkerCache>,
    sink: Arc<dyn SnapshotSink>,
}

impl WorkerActivityView {
    pub fn new(gateway: Arc<dyn AuthGateway>, sink: Arc<dyn SnapshotSink>) -> Self {
        Self {
            gateway,
            cache: Mutex::new(WorkerCache::default()),
            sink,
        }
    }

    pub async fn refresh(&self) -> WorkerRefresh {
        let fetched = match self
            .gateway
            .call(&ApiRequest::get(WORKER_ACTIVITY_PATH))
            .await
            .and_then(expect_success)
        {
            Ok(body) => decode_workers(&body),
            Err(err) => Err(err),
        };

        let outcome = {
            let mut cache = self.lock();
            match fetched {
                Ok(snapshot) => {
                    let changed = cache.snapshot != snapshot || cache.last_error.is_some();
                    cache.snapshot = snapshot;
                    cache.last_error = None;
                    WorkerRefresh {
                        snapshot: cache.snapshot.clone(),
                        changed,
                        error: None,
                    }
                }
                Err(err) => {
                    sync_warn!("Worker activity refresh failed: {}", err);
                    cache.last_error = Some(err.clone());
                    WorkerRefresh {
                        snapshot: cache.snapshot.clone(),
                        changed: false,
                        error: Some(err),
                    }
                }
            }
        };

        if outcome.changed || outcome.error.is_some() {
            sync_debug!(
                "Workers: {} active of {}",
                outcome.snapshot.active_workers,
                outcome.snapshot.total_workers
            );
            self.sink.emit(SyncEvent::Workers {
                snapshot: outcome.snapshot.clone(),
                error: outcome.error.clone(),
            });
        }
        outcome
    }

    pub fn snapshot(&self) -> WorkerSnapshot {
        self.lock().snapshot.clone()
    }

    /// Current activities joined against the given job snapshot.
    pub fn correlated(&self, jobs: &RegistrySnapshot) -> Vec<CorrelatedActivity> {
        let cache = self.lock();
        correlate(&cache.snapshot.activities, &jobs.jobs_by_id())
    }

    fn lock(&self) -> MutexGuard<'_, WorkerCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
