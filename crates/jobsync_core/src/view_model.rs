use chrono::{DateTime, Utc};

use crate::{Cadence, ControlAction, JobId, JobStatus, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardView {
    pub cadence: Cadence,
    pub jobs: Vec<JobRowView>,
    pub workers: Vec<WorkerRowView>,
    pub active_workers: u32,
    pub total_workers: u32,
    pub history: Vec<HistoryRowView>,
    pub details: Option<DetailsView>,
    pub notice: Option<Notice>,
    pub refresh_error: Option<String>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub job_id: JobId,
    pub name: String,
    pub status: JobStatus,
    pub task_status: TaskStatus,
    pub progress: u8,
    pub current_step: String,
    pub unique_leads: u64,
    pub leads_allocated: u32,
    pub pending: Option<ControlAction>,
    pub provisional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRowView {
    pub worker_name: String,
    pub status: String,
    pub job_label: Option<String>,
    pub current_url: Option<String>,
    pub orphaned: bool,
}

/// Everything the details pane shows about one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailsView {
    pub job_id: JobId,
    pub name: String,
    pub structure: Option<String>,
    pub status: JobStatus,
    pub task_status: TaskStatus,
    pub progress: u8,
    pub current_step: String,
    pub leads_allocated: u32,
    pub leads_found: u64,
    pub pages_explored: u64,
    pub unique_leads: u64,
    pub duration_seconds: u64,
    pub search_query: String,
    pub created_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRowView {
    pub job_id: JobId,
    pub name: String,
    pub status: JobStatus,
    pub leads_found: u64,
    pub updated_at: Option<DateTime<Utc>>,
}
