use std::sync::mpsc;

use jobsync_core::{Command, Job, JobId, RegistrySnapshot, SyncError, WorkerSnapshot};

/// Everything the engine publishes to presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    ActiveJobs(RegistrySnapshot),
    Workers {
        snapshot: WorkerSnapshot,
        error: Option<SyncError>,
    },
    History {
        jobs: Vec<Job>,
        error: Option<SyncError>,
    },
    JobDetails {
        job_id: JobId,
        result: Result<Job, SyncError>,
    },
    CommandSettled {
        command: Command,
        result: Result<JobId, SyncError>,
    },
}

pub trait SnapshotSink: Send + Sync {
    fn emit(&self, event: SyncEvent);
}

pub struct ChannelSnapshotSink {
    tx: mpsc::Sender<SyncEvent>,
}

impl ChannelSnapshotSink {
    pub fn new(tx: mpsc::Sender<SyncEvent>) -> Self {
        Self { tx }
    }
}

impl SnapshotSink for ChannelSnapshotSink {
    fn emit(&self, event: SyncEvent) {
        let _ = self.tx.send(event);
    }
}

/// Discards events; for components used without a presentation layer.
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn emit(&self, _event: SyncEvent) {}
}
