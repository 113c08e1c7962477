use jobsync_core::{Effect, Msg};
use jobsync_engine::{EngineHandle, SyncEvent};
use jobsync_logging::sync_info;

/// Carries effects to the engine and engine events back as messages.
pub(crate) struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    /// Runs effects; returns `false` once a quit was requested.
    pub fn run(&self, effects: Vec<Effect>) -> bool {
        let mut keep_running = true;
        for effect in effects {
            match effect {
                Effect::Dispatch(command) => {
                    sync_info!("Dispatching {:?}", command);
                    self.engine.submit(command);
                }
                Effect::LoadHistory(filter) => self.engine.load_history(filter),
                Effect::LoadDetails(job_id) => self.engine.load_details(job_id),
                Effect::RefreshNow => self.engine.refresh_now(),
                Effect::SetCadence(cadence) => self.engine.set_cadence(cadence),
                Effect::Quit => {
                    self.engine.shutdown();
                    keep_running = false;
                }
            }
        }
        keep_running
    }

    /// Drains every event the engine has published so far.
    pub fn pending_messages(&self) -> Vec<Msg> {
        std::iter::from_fn(|| self.engine.try_recv())
            .map(event_to_msg)
            .collect()
    }
}

fn event_to_msg(event: SyncEvent) -> Msg {
    match event {
        SyncEvent::ActiveJobs(snapshot) => Msg::ActiveJobsRefreshed(snapshot),
        SyncEvent::Workers { snapshot, error } => Msg::WorkersRefreshed { snapshot, error },
        SyncEvent::History { jobs, error } => Msg::HistoryLoaded { jobs, error },
        SyncEvent::JobDetails { job_id, result } => Msg::DetailsLoaded { job_id, result },
        SyncEvent::CommandSettled { command, result } => Msg::CommandSettled { command, result },
    }
}
