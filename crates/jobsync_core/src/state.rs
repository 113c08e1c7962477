use crate::correlate::correlate;
use crate::progress::progress_of;
use crate::view_model::{
    DashboardView, DetailsView, HistoryRowView, JobRowView, Notice, Severity, WorkerRowView,
};
use crate::{Cadence, Job, JobId, RegistrySnapshot, SyncError, WorkerSnapshot};

/// Front-end state: the latest snapshots received from the engine plus
/// whatever the user should be told next.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardState {
    registry: RegistrySnapshot,
    workers: WorkerSnapshot,
    workers_error: Option<SyncError>,
    history: Vec<Job>,
    history_error: Option<SyncError>,
    details: Option<Job>,
    cadence: Cadence,
    notice: Option<Notice>,
    dirty: bool,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn registry(&self) -> &RegistrySnapshot {
        &self.registry
    }

    pub fn view(&self) -> DashboardView {
        let jobs_by_id = self.registry.jobs_by_id();
        let workers = correlate(&self.workers.activities, &jobs_by_id)
            .into_iter()
            .map(|row| WorkerRowView {
                worker_name: row.activity.worker_name.clone(),
                status: row.activity.status.as_str().to_string(),
                job_label: match (row.job_id, row.job_name) {
                    (_, Some(name)) => Some(name),
                    (Some(id), None) => Some(format!("job #{id}")),
                    (None, None) => None,
                },
                current_url: row.activity.current_url.clone(),
                orphaned: row.orphaned,
            })
            .collect();

        DashboardView {
            cadence: self.cadence,
            jobs: self
                .registry
                .entries
                .iter()
                .map(|entry| JobRowView {
                    job_id: entry.job.id,
                    name: entry.job.name.clone(),
                    status: entry.job.status.clone(),
                    task_status: entry.job.task.status.clone(),
                    progress: entry.progress,
                    current_step: entry.job.task.current_step.clone(),
                    unique_leads: entry.job.task.unique_leads,
                    leads_allocated: entry.job.leads_allocated,
                    pending: entry.pending,
                    provisional: entry.provisional,
                })
                .collect(),
            workers,
            active_workers: self.workers.active_workers,
            total_workers: self.workers.total_workers,
            history: self
                .history
                .iter()
                .map(|job| HistoryRowView {
                    job_id: job.id,
                    name: job.name.clone(),
                    status: job.status.clone(),
                    leads_found: job.leads_found,
                    updated_at: job.updated_at,
                })
                .collect(),
            details: self.details.as_ref().map(details_view),
            notice: self.notice.clone(),
            refresh_error: self
                .registry
                .last_error
                .as_ref()
                .or(self.workers_error.as_ref())
                .or(self.history_error.as_ref())
                .map(ToString::to_string),
            dirty: self.dirty,
        }
    }

    /// Returns whether a render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_registry(&mut self, snapshot: RegistrySnapshot) {
        if self.registry != snapshot {
            self.registry = snapshot;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_workers(&mut self, snapshot: WorkerSnapshot, error: Option<SyncError>) {
        if self.workers != snapshot || self.workers_error != error {
            self.workers = snapshot;
            self.workers_error = error;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_history(&mut self, jobs: Vec<Job>, error: Option<SyncError>) {
        // A failed load keeps the previous page on screen.
        if error.is_none() {
            self.history = jobs;
        }
        self.history_error = error;
        self.mark_dirty();
    }

    pub(crate) fn set_details(&mut self, job: Job) {
        self.details = Some(job);
        self.mark_dirty();
    }

    /// Hides the details pane; with an id, only when it shows that job.
    pub(crate) fn clear_details(&mut self, job_id: Option<JobId>) {
        let shown = self.details.as_ref().map(|job| job.id);
        if shown.is_some() && (job_id.is_none() || job_id == shown) {
            self.details = None;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_cadence(&mut self, cadence: Cadence) -> bool {
        if self.cadence == cadence {
            return false;
        }
        self.cadence = cadence;
        self.mark_dirty();
        true
    }

    pub(crate) fn notify(&mut self, severity: Severity, text: impl Into<String>) {
        self.notice = Some(Notice {
            severity,
            text: text.into(),
        });
        self.mark_dirty();
    }
}

fn details_view(job: &Job) -> DetailsView {
    DetailsView {
        job_id: job.id,
        name: job.name.clone(),
        structure: match (&job.structure_name, job.structure_ref) {
            (Some(name), _) => Some(name.clone()),
            (None, Some(id)) => Some(format!("structure #{id}")),
            (None, None) => None,
        },
        status: job.status.clone(),
        task_status: job.task.status.clone(),
        progress: progress_of(&job.task),
        current_step: job.task.current_step.clone(),
        leads_allocated: job.leads_allocated,
        leads_found: job.leads_found,
        pages_explored: job.task.pages_explored,
        unique_leads: job.task.unique_leads,
        duration_seconds: job.task.duration_seconds,
        search_query: job.search_query.clone(),
        created_at: job.created_at,
        error_message: job.task.error_message.clone(),
    }
}
