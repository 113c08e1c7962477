use std::fmt;

use chrono::{DateTime, Utc};

pub type JobId = u64;
pub type TaskId = u64;

/// Step label shown for a job whose task the server has not reported yet.
pub const WAITING_STEP: &str = "Waiting to start...";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    Initializing,
    Running,
    Paused,
    Completed,
    Failed,
    Stopped,
    /// Status string the client does not recognize, kept verbatim.
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Initializing => "initializing",
            JobStatus::Running => "running",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Stopped => "stopped",
            JobStatus::Other(raw) => raw,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Stopped
        )
    }
}

impl From<&str> for JobStatus {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => JobStatus::Pending,
            "initializing" => JobStatus::Initializing,
            "running" => JobStatus::Running,
            "paused" => JobStatus::Paused,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            "stopped" => JobStatus::Stopped,
            _ => JobStatus::Other(raw.to_string()),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Initializing,
    Crawling,
    Extracting,
    Processing,
    Completed,
    Failed,
    /// Synthesized when the server lists a job without a task.
    Unknown,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Initializing => "initializing",
            TaskStatus::Crawling => "crawling",
            TaskStatus::Extracting => "extracting",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Unknown => "unknown",
            TaskStatus::Other(raw) => raw,
        }
    }
}

impl From<&str> for TaskStatus {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "initializing" => TaskStatus::Initializing,
            "crawling" => TaskStatus::Crawling,
            "extracting" => TaskStatus::Extracting,
            "processing" => TaskStatus::Processing,
            "completed" => TaskStatus::Completed,
            "failed" => TaskStatus::Failed,
            "unknown" => TaskStatus::Unknown,
            _ => TaskStatus::Other(raw.to_string()),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerStatus {
    Running,
    Idle,
    Error,
    Other(String),
}

impl WorkerStatus {
    pub fn as_str(&self) -> &str {
        match self {
            WorkerStatus::Running => "running",
            WorkerStatus::Idle => "idle",
            WorkerStatus::Error => "error",
            WorkerStatus::Other(raw) => raw,
        }
    }
}

impl From<&str> for WorkerStatus {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "running" => WorkerStatus::Running,
            "idle" => WorkerStatus::Idle,
            "error" => WorkerStatus::Error,
            _ => WorkerStatus::Other(raw.to_string()),
        }
    }
}

/// Control intents a user can send to an existing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ControlAction {
    Pause,
    Resume,
    Stop,
    Restart,
}

impl ControlAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlAction::Pause => "pause",
            ControlAction::Resume => "resume",
            ControlAction::Stop => "stop",
            ControlAction::Restart => "restart",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pause" => Some(ControlAction::Pause),
            "resume" => Some(ControlAction::Resume),
            "stop" => Some(ControlAction::Stop),
            "restart" => Some(ControlAction::Restart),
            _ => None,
        }
    }
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current execution record of a job. Replaced as a whole on every refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub job_id: JobId,
    pub task_id: Option<TaskId>,
    pub status: TaskStatus,
    pub current_step: String,
    pub pages_explored: u64,
    pub leads_found: u64,
    pub unique_leads: u64,
    pub duration_seconds: u64,
    pub start_time: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl Task {
    /// Stand-in task for a job the server reported without one.
    pub fn placeholder(job_id: JobId) -> Self {
        Self {
            job_id,
            task_id: None,
            status: TaskStatus::Unknown,
            current_step: WAITING_STEP.to_string(),
            pages_explored: 0,
            leads_found: 0,
            unique_leads: 0,
            duration_seconds: 0,
            start_time: None,
            last_activity: None,
            error_message: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub structure_ref: Option<u64>,
    pub structure_name: Option<String>,
    pub status: JobStatus,
    pub leads_allocated: u32,
    pub leads_found: u64,
    pub search_query: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub task: Task,
}

impl Job {
    /// Local record for a job the server accepted but has not listed yet.
    pub fn provisional(
        id: JobId,
        name: impl Into<String>,
        structure_ref: u64,
        leads_allocated: u32,
        search_query: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            structure_ref: Some(structure_ref),
            structure_name: None,
            status: JobStatus::Initializing,
            leads_allocated,
            leads_found: 0,
            search_query: search_query.into(),
            created_at: None,
            updated_at: None,
            task: Task::placeholder(id),
        }
    }
}

/// Lookup reference from a worker activity to the task it is executing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRef {
    pub task_id: TaskId,
    pub job_id: Option<JobId>,
    pub job_name: Option<String>,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerActivity {
    pub worker_name: String,
    pub hostname: String,
    pub activity_type: String,
    pub status: WorkerStatus,
    pub current_task: Option<TaskRef>,
    pub current_url: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Worker pool state as reported by one activity poll.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkerSnapshot {
    pub active_workers: u32,
    pub total_workers: u32,
    pub activities: Vec<WorkerActivity>,
}
