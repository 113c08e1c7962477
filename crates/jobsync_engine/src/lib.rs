//! jobsync engine: the IO side of job synchronization.
//!
//! Every request goes through an [`AuthGateway`]; the registry, worker view,
//! scheduler and dispatcher publish what they learn through a [`SnapshotSink`].
mod dispatcher;
mod engine;
mod gateway;
mod registry;
mod scheduler;
mod settings;
mod sink;
mod wire;
mod workers;

pub use dispatcher::{CommandDispatcher, CREATE_JOB_PATH, LEADS_TARGET_MAX};
pub use engine::{EngineError, EngineHandle};
pub use gateway::{
    ApiRequest, ApiResponse, AuthGateway, CredentialStore, MemoryCredentials, Method,
    ReqwestGateway,
};
pub use registry::{
    job_details_path, ActiveRefresh, HistoryRefresh, JobRegistry, ACTIVE_JOBS_PATH,
    JOB_HISTORY_PATH,
};
pub use scheduler::{PollOutcome, PollTarget, PollingScheduler};
pub use settings::ClientSettings;
pub use sink::{ChannelSnapshotSink, NullSink, SnapshotSink, SyncEvent};
pub use workers::{WorkerActivityView, WorkerRefresh, WORKER_ACTIVITY_PATH};
