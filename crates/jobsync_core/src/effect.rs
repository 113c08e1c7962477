use crate::{ControlAction, HistoryFilter, JobId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Dispatch(Command),
    LoadHistory(HistoryFilter),
    /// Fetch one job's full record for the details pane.
    LoadDetails(JobId),
    RefreshNow,
    SetCadence(Cadence),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Control {
        job_id: JobId,
        action: ControlAction,
    },
    Create {
        structure_id: u64,
        /// Unvalidated; the dispatcher enforces the accepted range.
        leads_target: i64,
        notes: String,
    },
}

/// Polling cadence: short while jobs are watched, long for a summary view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cadence {
    #[default]
    Watch,
    Summary,
}
