use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use jobsync_core::{check_transition, Command, ControlAction, Job, JobId, SyncError};
use jobsync_logging::{sync_info, sync_warn};
use serde_json::json;

use crate::gateway::{ApiRequest, AuthGateway};
use crate::registry::JobRegistry;
use crate::scheduler::PollingScheduler;
use crate::sink::{SnapshotSink, SyncEvent};
use crate::wire::{decode_job_id, expect_success};

pub const CREATE_JOB_PATH: &str = "/scraping/jobs";
pub const LEADS_TARGET_MAX: i64 = 1000;

fn control_path(job_id: JobId) -> String {
    format!("/scraping/jobs/{job_id}/control")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CommandKey {
    Job(JobId),
    Structure(u64),
}

type InFlight = Arc<Mutex<HashSet<CommandKey>>>;

/// Holds a key in the in-flight set until dropped.
struct Lease {
    key: CommandKey,
    in_flight: InFlight,
}

impl Lease {
    fn acquire(in_flight: &InFlight, key: CommandKey) -> Option<Self> {
        lock_keys(in_flight).insert(key).then(|| Self {
            key,
            in_flight: in_flight.clone(),
        })
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        lock_keys(&self.in_flight).remove(&self.key);
    }
}

fn lock_keys(in_flight: &InFlight) -> MutexGuard<'_, HashSet<CommandKey>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sends job commands, one at a time per job, and reconciles afterwards.
pub struct CommandDispatcher {
    gateway: Arc<dyn AuthGateway>,
    registry: Arc<JobRegistry>,
    scheduler: Arc<PollingScheduler>,
    sink: Arc<dyn SnapshotSink>,
    in_flight: InFlight,
}

impl CommandDispatcher {
    pub fn new(
        gateway: Arc<dyn AuthGateway>,
        registry: Arc<JobRegistry>,
        scheduler: Arc<PollingScheduler>,
        sink: Arc<dyn SnapshotSink>,
    ) -> Self {
        Self {
            gateway,
            registry,
            scheduler,
            sink,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Sends a control action for one job.
    ///
    /// Rejected locally with `CommandInFlight` while another command for the
    /// same job is outstanding, and with `InvalidTransition` when the cached
    /// status does not allow the action. Once a request has been sent, a
    /// refresh runs before the job is unlocked, whatever the outcome.
    pub async fn execute(&self, job_id: JobId, action: ControlAction) -> Result<(), SyncError> {
        let _lease = Lease::acquire(&self.in_flight, CommandKey::Job(job_id))
            .ok_or_else(|| SyncError::command_in_flight(job_id))?;

        if let Some(status) = self.registry.cached_status(job_id) {
            check_transition(job_id, action, &status)?;
        }

        sync_info!("Sending {} for job {}", action, job_id);
        let request = ApiRequest::post(control_path(job_id), json!({ "action": action.as_str() }));
        let result = self
            .gateway
            .call(&request)
            .await
            .and_then(expect_success)
            .map(|_| ());

        match &result {
            Ok(()) => {
                sync_info!("Job {}: {} accepted", job_id, action);
                self.registry.mark_pending(job_id, action);
            }
            Err(err) => sync_warn!("Job {}: {} failed: {}", job_id, action, err),
        }

        self.scheduler.poll_once().await;
        result
    }

    /// Creates a job for a structure and returns the server-assigned id.
    pub async fn create(
        &self,
        structure_id: u64,
        leads_target: i64,
        notes: &str,
    ) -> Result<JobId, SyncError> {
        if !(1..=LEADS_TARGET_MAX).contains(&leads_target) {
            return Err(SyncError::validation(format!(
                "leads target must be between 1 and {LEADS_TARGET_MAX}, got {leads_target}"
            )));
        }
        let leads_allocated = u32::try_from(leads_target)
            .map_err(|_| SyncError::validation("leads target out of range"))?;

        let _lease = Lease::acquire(&self.in_flight, CommandKey::Structure(structure_id))
            .ok_or_else(|| SyncError::create_in_flight(structure_id))?;

        let structure_label = self
            .registry
            .structure_name(structure_id)
            .unwrap_or_else(|| format!("Structure #{structure_id}"));
        let name = format!("Manual scrape: {structure_label}");
        let search_query = format!("manual_{}_{}", structure_id, Utc::now().timestamp_millis());
        let body = json!({
            "name": name,
            "structure_id": structure_id,
            "search_query": search_query,
            "leads_allocated": leads_allocated,
            "notes": notes,
        });

        sync_info!(
            "Creating job for structure {} ({} leads)",
            structure_id,
            leads_allocated
        );
        let result = self
            .gateway
            .call(&ApiRequest::post(CREATE_JOB_PATH, body))
            .await
            .and_then(expect_success)
            .and_then(|body| decode_job_id(&body));

        match &result {
            Ok(job_id) => {
                sync_info!("Structure {}: job {} created", structure_id, job_id);
                self.registry.insert_provisional(Job::provisional(
                    *job_id,
                    name,
                    structure_id,
                    leads_allocated,
                    search_query,
                ));
            }
            Err(err) => sync_warn!("Structure {}: create failed: {}", structure_id, err),
        }

        self.scheduler.poll_once().await;
        result
    }

    /// Runs a command and publishes how it settled.
    pub async fn submit(&self, command: Command) -> Result<JobId, SyncError> {
        let result = match &command {
            Command::Control { job_id, action } => {
                self.execute(*job_id, *action).await.map(|()| *job_id)
            }
            Command::Create {
                structure_id,
                leads_target,
                notes,
            } => self.create(*structure_id, *leads_target, notes).await,
        };

        self.sink.emit(SyncEvent::CommandSettled {
            command,
            result: result.clone(),
        });
        result
    }
}
