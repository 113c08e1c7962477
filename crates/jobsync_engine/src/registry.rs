use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use jobsync_core::{
    ControlAction, HistoryFilter, Job, JobId, JobStatus, RegistrySnapshot, RegistryState,
    SyncError,
};
use jobsync_logging::{sync_debug, sync_info, sync_warn};

use crate::gateway::{ApiRequest, AuthGateway};
use crate::sink::{SnapshotSink, SyncEvent};
use crate::wire::{decode_job, decode_jobs, expect_success};

pub const ACTIVE_JOBS_PATH: &str = "/scraping/jobs/active";
pub const JOB_HISTORY_PATH: &str = "/scraping/jobs/history";

pub fn job_details_path(job_id: JobId) -> String {
    format!("/scraping/jobs/{job_id}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRefresh {
    pub active: Vec<Job>,
    pub changed: bool,
    /// Set when the refresh failed; `active` is then the previous snapshot.
    pub error: Option<SyncError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRefresh {
    pub jobs: Vec<Job>,
    pub error: Option<SyncError>,
}

/// Cache of the server's job state, refreshed by full-snapshot replace.
pub struct JobRegistry {
    gateway: Arc<dyn AuthGateway>,
    state: Mutex<RegistryState>,
    sink: Arc<dyn SnapshotSink>,
}

impl JobRegistry {
    pub fn new(gateway: Arc<dyn AuthGateway>, sink: Arc<dyn SnapshotSink>) -> Self {
        Self {
            gateway,
            state: Mutex::new(RegistryState::new()),
            sink,
        }
    }

    /// Reloads the active set. Never clears the cache on failure.
    ///
    /// Markers set while the request is outstanding survive its response.
    pub async fn refresh(&self) -> ActiveRefresh {
        let ticket = self.lock().begin_refresh();
        let fetched = self.fetch_active().await;

        let (outcome, publish) = {
            let mut state = self.lock();
            match fetched {
                Ok(jobs) => {
                    let recovered = state.last_error().is_some();
                    let changed = state.apply_response(ticket, jobs);
                    let outcome = ActiveRefresh {
                        active: state.active().to_vec(),
                        changed,
                        error: None,
                    };
                    let publish = (changed || recovered).then(|| state.snapshot());
                    (outcome, publish)
                }
                Err(err) => {
                    sync_warn!("Active job refresh failed: {}", err);
                    state.record_failure(err.clone());
                    let outcome = ActiveRefresh {
                        active: state.active().to_vec(),
                        changed: false,
                        error: Some(err),
                    };
                    (outcome, Some(state.snapshot()))
                }
            }
        };

        match publish {
            Some(snapshot) => {
                sync_debug!(
                    "Active jobs generation {}: {} entries",
                    snapshot.generation,
                    snapshot.entries.len()
                );
                self.sink.emit(SyncEvent::ActiveJobs(snapshot));
            }
            None => sync_debug!("Active jobs unchanged"),
        }
        outcome
    }

    /// Loads one bounded page of terminal jobs.
    pub async fn refresh_history(&self, filter: &HistoryFilter) -> HistoryRefresh {
        let mut request =
            ApiRequest::get(JOB_HISTORY_PATH).with_query("limit", filter.limit.to_string());
        if let Some(name) = &filter.name {
            request = request.with_query("name", name.clone());
        }
        if let Some(status) = &filter.status {
            request = request.with_query("status", status.as_str());
        }

        let fetched = match self.gateway.call(&request).await.and_then(expect_success) {
            // The server may ignore the filters, so they are applied here as well.
            Ok(body) => Ok(filter.apply(decode_jobs(&body, &["jobs", "history"]))),
            Err(err) => Err(err),
        };

        let outcome = {
            let mut state = self.lock();
            match fetched {
                Ok(jobs) => {
                    state.apply_history(jobs.clone());
                    HistoryRefresh { jobs, error: None }
                }
                Err(err) => {
                    sync_warn!("Job history refresh failed: {}", err);
                    HistoryRefresh {
                        jobs: state.history().to_vec(),
                        error: Some(err),
                    }
                }
            }
        };

        self.sink.emit(SyncEvent::History {
            jobs: outcome.jobs.clone(),
            error: outcome.error.clone(),
        });
        outcome
    }

    /// Fetches one job's full record from the server. The cache is left alone;
    /// the active set only changes through a full refresh.
    pub async fn details(&self, job_id: JobId) -> Result<Job, SyncError> {
        let request = ApiRequest::get(job_details_path(job_id));
        let result = self
            .gateway
            .call(&request)
            .await
            .and_then(expect_success)
            .and_then(|body| decode_job(&body));

        if let Err(err) = &result {
            sync_warn!("Details for job {} failed: {}", job_id, err);
        }
        self.sink.emit(SyncEvent::JobDetails {
            job_id,
            result: result.clone(),
        });
        result
    }

    /// Cached structure name, used to name manually created jobs.
    pub fn structure_name(&self, structure_id: u64) -> Option<String> {
        self.lock().structure_name(structure_id).map(ToOwned::to_owned)
    }

    /// Cached lookup; never touches the network.
    pub fn get(&self, job_id: JobId) -> Option<Job> {
        self.lock().get(job_id).cloned()
    }

    pub fn cached_status(&self, job_id: JobId) -> Option<JobStatus> {
        self.lock().cached_status(job_id).cloned()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        self.lock().snapshot()
    }

    pub fn history(&self) -> Vec<Job> {
        self.lock().history().to_vec()
    }

    pub(crate) fn mark_pending(&self, job_id: JobId, action: ControlAction) {
        let snapshot = {
            let mut state = self.lock();
            state.mark_pending(job_id, action);
            state.snapshot()
        };
        self.sink.emit(SyncEvent::ActiveJobs(snapshot));
    }

    pub(crate) fn insert_provisional(&self, job: Job) {
        sync_info!("Job {} accepted, waiting for the server to list it", job.id);
        let snapshot = {
            let mut state = self.lock();
            state.insert_provisional(job);
            state.snapshot()
        };
        self.sink.emit(SyncEvent::ActiveJobs(snapshot));
    }

    async fn fetch_active(&self) -> Result<Vec<Job>, SyncError> {
        let response = self.gateway.call(&ApiRequest::get(ACTIVE_JOBS_PATH)).await?;
        let body = expect_success(response)?;
        Ok(decode_jobs(&body, &["active_jobs"]))
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
