use std::collections::BTreeMap;

use crate::progress::progress_of;
use crate::{ControlAction, Job, JobId, JobStatus, SyncError, TaskStatus};

/// Default number of history rows requested per page.
pub const HISTORY_PAGE_SIZE: usize = 50;

/// One row of the active set as handed to presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEntry {
    pub job: Job,
    pub progress: u8,
    /// Command accepted by the server but not yet confirmed by a refresh.
    pub pending: Option<ControlAction>,
    /// Created locally and not yet listed by the server.
    pub provisional: bool,
}

/// Immutable view of the registry at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistrySnapshot {
    /// Number of successful active-set refreshes applied so far.
    pub generation: u64,
    pub entries: Vec<JobEntry>,
    pub last_error: Option<SyncError>,
}

impl RegistrySnapshot {
    pub fn get(&self, job_id: JobId) -> Option<&JobEntry> {
        self.entries.iter().find(|entry| entry.job.id == job_id)
    }

    pub fn jobs_by_id(&self) -> BTreeMap<JobId, &Job> {
        self.entries
            .iter()
            .map(|entry| (entry.job.id, &entry.job))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryFilter {
    /// Case-insensitive substring of the job name.
    pub name: Option<String>,
    pub status: Option<JobStatus>,
    pub limit: usize,
}

impl Default for HistoryFilter {
    fn default() -> Self {
        Self {
            name: None,
            status: None,
            limit: HISTORY_PAGE_SIZE,
        }
    }
}

impl HistoryFilter {
    pub fn matches(&self, job: &Job) -> bool {
        if let Some(status) = &self.status {
            if &job.status != status {
                return false;
            }
        }
        match &self.name {
            Some(needle) if !needle.is_empty() => job
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        }
    }

    /// Filters and truncates one page of history.
    pub fn apply(&self, jobs: Vec<Job>) -> Vec<Job> {
        jobs.into_iter()
            .filter(|job| self.matches(job))
            .take(self.limit.max(1))
            .collect()
    }
}

/// Fields compared to decide whether a refresh changed anything worth rendering.
#[derive(Debug, PartialEq, Eq)]
struct Fingerprint<'a> {
    id: JobId,
    status: &'a JobStatus,
    task_status: &'a TaskStatus,
    current_step: &'a str,
    pages_explored: u64,
    leads_found: u64,
    unique_leads: u64,
}

impl<'a> From<&'a Job> for Fingerprint<'a> {
    fn from(job: &'a Job) -> Self {
        Self {
            id: job.id,
            status: &job.status,
            task_status: &job.task.status,
            current_step: &job.task.current_step,
            pages_explored: job.task.pages_explored,
            leads_found: job.task.leads_found,
            unique_leads: job.task.unique_leads,
        }
    }
}

/// Ticket identifying one active-set request, in the order requests were issued.
pub type RefreshTicket = u64;

/// Cached job state. Pure: the engine performs IO and feeds results in.
///
/// The active set is only ever replaced as a whole. Pending and provisional
/// markers live beside the confirmed jobs and never modify them. Each marker
/// remembers the last request issued before it was set; only a response to a
/// later request can discard it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistryState {
    active: Vec<Job>,
    history: Vec<Job>,
    provisional: BTreeMap<JobId, (Job, RefreshTicket)>,
    pending: BTreeMap<JobId, (ControlAction, RefreshTicket)>,
    last_error: Option<SyncError>,
    generation: u64,
    issued: RefreshTicket,
    applied: RefreshTicket,
}

impl RegistryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that an active-set request is about to be sent.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.issued += 1;
        self.issued
    }

    /// Applies a snapshot requested right now. See [`Self::apply_response`].
    pub fn apply_active(&mut self, jobs: Vec<Job>) -> bool {
        let ticket = self.begin_refresh();
        self.apply_response(ticket, jobs)
    }

    /// Replaces the active set with the server's answer to request `ticket`.
    ///
    /// Returns whether anything visible changed. Markers set after the request
    /// was issued survive; older ones are discarded. A response older than one
    /// already applied is ignored.
    pub fn apply_response(&mut self, ticket: RefreshTicket, jobs: Vec<Job>) -> bool {
        if ticket < self.applied {
            return false;
        }
        self.applied = ticket;

        let markers_before = self.pending.len() + self.provisional.len();
        self.pending.retain(|_, (_, stamp)| *stamp >= ticket);
        self.provisional.retain(|id, (_, stamp)| {
            *stamp >= ticket && !jobs.iter().any(|job| job.id == *id)
        });
        let markers_dropped = self.pending.len() + self.provisional.len() != markers_before;

        let changed = markers_dropped
            || self.active.len() != jobs.len()
            || self
                .active
                .iter()
                .zip(jobs.iter())
                .any(|(old, new)| Fingerprint::from(old) != Fingerprint::from(new));

        self.active = jobs;
        self.last_error = None;
        self.generation += 1;
        changed
    }

    /// Keeps the last good snapshot and records why the refresh failed.
    pub fn record_failure(&mut self, error: SyncError) {
        self.last_error = Some(error);
    }

    pub fn apply_history(&mut self, jobs: Vec<Job>) {
        self.history = jobs;
    }

    pub fn active(&self) -> &[Job] {
        &self.active
    }

    pub fn history(&self) -> &[Job] {
        &self.history
    }

    pub fn last_error(&self) -> Option<&SyncError> {
        self.last_error.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Active or provisional job by id.
    pub fn get(&self, job_id: JobId) -> Option<&Job> {
        self.active
            .iter()
            .find(|job| job.id == job_id)
            .or_else(|| self.provisional.get(&job_id).map(|(job, _)| job))
    }

    /// Best known status for the transition guard: active set, then history.
    pub fn cached_status(&self, job_id: JobId) -> Option<&JobStatus> {
        self.get(job_id)
            .or_else(|| self.history.iter().find(|job| job.id == job_id))
            .map(|job| &job.status)
    }

    pub fn insert_provisional(&mut self, job: Job) {
        if self.active.iter().any(|existing| existing.id == job.id) {
            return;
        }
        self.provisional.insert(job.id, (job, self.issued));
    }

    pub fn mark_pending(&mut self, job_id: JobId, action: ControlAction) {
        self.pending.insert(job_id, (action, self.issued));
    }

    pub fn pending(&self, job_id: JobId) -> Option<ControlAction> {
        self.pending.get(&job_id).map(|(action, _)| *action)
    }

    /// Name of a structure as reported on any cached job that targets it.
    pub fn structure_name(&self, structure_id: u64) -> Option<&str> {
        self.active
            .iter()
            .chain(self.history.iter())
            .filter(|job| job.structure_ref == Some(structure_id))
            .find_map(|job| job.structure_name.as_deref())
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let confirmed = self.active.iter().map(|job| JobEntry {
            job: job.clone(),
            progress: progress_of(&job.task),
            pending: self.pending(job.id),
            provisional: false,
        });
        let provisional = self.provisional.values().map(|(job, _)| JobEntry {
            job: job.clone(),
            progress: progress_of(&job.task),
            pending: self.pending(job.id),
            provisional: true,
        });

        RegistrySnapshot {
            generation: self.generation,
            entries: confirmed.chain(provisional).collect(),
            last_error: self.last_error.clone(),
        }
    }
}
