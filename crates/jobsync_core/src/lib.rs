//! jobsync core: job model, reconciliation state and the dashboard state machine.
//!
//! Nothing in this crate performs IO; the engine feeds server snapshots in and
//! executes the effects that come out.
mod correlate;
mod effect;
mod error;
mod guard;
mod model;
mod msg;
mod progress;
mod registry;
mod state;
mod update;
mod view_model;

pub use correlate::{correlate, CorrelatedActivity};
pub use effect::{Cadence, Command, Effect};
pub use error::{ErrorKind, SyncError};
pub use guard::check_transition;
pub use model::{
    ControlAction, Job, JobId, JobStatus, Task, TaskId, TaskRef, TaskStatus, WorkerActivity,
    WorkerSnapshot, WorkerStatus, WAITING_STEP,
};
pub use msg::Msg;
pub use progress::{progress_for_status, progress_of, PROGRESS_FLOOR};
pub use registry::{HistoryFilter, JobEntry, RegistrySnapshot, RegistryState, HISTORY_PAGE_SIZE};
pub use state::DashboardState;
pub use update::update;
pub use view_model::{
    DashboardView, DetailsView, HistoryRowView, JobRowView, Notice, Severity, WorkerRowView,
};
