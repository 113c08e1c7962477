use crate::{Command, Job, JobId, RegistrySnapshot, SyncError, WorkerSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User entered a line of input.
    InputSubmitted(String),
    /// Registry published a new active-set snapshot.
    ActiveJobsRefreshed(RegistrySnapshot),
    /// Worker activity poll finished; the snapshot is the last good one.
    WorkersRefreshed {
        snapshot: WorkerSnapshot,
        error: Option<SyncError>,
    },
    HistoryLoaded {
        jobs: Vec<Job>,
        error: Option<SyncError>,
    },
    DetailsLoaded {
        job_id: JobId,
        result: Result<Job, SyncError>,
    },
    /// A dispatched command settled. On success carries the target or created job id.
    CommandSettled {
        command: Command,
        result: Result<JobId, SyncError>,
    },
    /// Render tick to coalesce output.
    Tick,
    NoOp,
}
