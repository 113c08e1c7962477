use std::sync::{mpsc, Arc};
use std::thread;

use jobsync_core::{Cadence, Command, HistoryFilter, JobId};
use jobsync_logging::{sync_debug, sync_info};
use thiserror::Error;
use tokio::sync::mpsc as async_mpsc;

use crate::dispatcher::CommandDispatcher;
use crate::gateway::{AuthGateway, CredentialStore, ReqwestGateway};
use crate::registry::JobRegistry;
use crate::scheduler::{PollTarget, PollingScheduler};
use crate::sink::{ChannelSnapshotSink, SnapshotSink, SyncEvent};
use crate::workers::WorkerActivityView;
use crate::ClientSettings;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to build the async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("failed to build the http client: {0}")]
    Client(#[from] jobsync_core::SyncError),
}

enum EngineCommand {
    Submit(Command),
    LoadHistory(HistoryFilter),
    LoadDetails(JobId),
    RefreshNow,
    SetCadence(Cadence),
    Shutdown,
}

/// Runs the sync components on a dedicated thread.
///
/// Requests go in through the handle's methods; every snapshot the
/// components publish comes back through `try_recv`.
pub struct EngineHandle {
    cmd_tx: async_mpsc::UnboundedSender<EngineCommand>,
    event_rx: mpsc::Receiver<SyncEvent>,
}

impl EngineHandle {
    pub fn new(
        settings: ClientSettings,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, EngineError> {
        let gateway = Arc::new(ReqwestGateway::new(&settings, credentials)?);
        Self::with_gateway(settings, gateway)
    }

    pub fn with_gateway(
        settings: ClientSettings,
        gateway: Arc<dyn AuthGateway>,
    ) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = async_mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        thread::spawn(move || {
            let sink: Arc<dyn SnapshotSink> = Arc::new(ChannelSnapshotSink::new(event_tx));
            runtime.block_on(run(settings, gateway, sink, cmd_rx));
        });

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn submit(&self, command: Command) {
        self.send(EngineCommand::Submit(command));
    }

    pub fn load_history(&self, filter: HistoryFilter) {
        self.send(EngineCommand::LoadHistory(filter));
    }

    pub fn load_details(&self, job_id: JobId) {
        self.send(EngineCommand::LoadDetails(job_id));
    }

    pub fn refresh_now(&self) {
        self.send(EngineCommand::RefreshNow);
    }

    pub fn set_cadence(&self, cadence: Cadence) {
        self.send(EngineCommand::SetCadence(cadence));
    }

    pub fn shutdown(&self) {
        self.send(EngineCommand::Shutdown);
    }

    pub fn try_recv(&self) -> Option<SyncEvent> {
        self.event_rx.try_recv().ok()
    }

    fn send(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send(command);
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run(
    settings: ClientSettings,
    gateway: Arc<dyn AuthGateway>,
    sink: Arc<dyn SnapshotSink>,
    mut cmd_rx: async_mpsc::UnboundedReceiver<EngineCommand>,
) {
    let registry = Arc::new(JobRegistry::new(gateway.clone(), sink.clone()));
    let workers = Arc::new(WorkerActivityView::new(gateway.clone(), sink.clone()));
    let targets: Vec<Arc<dyn PollTarget>> = vec![registry.clone(), workers];
    let scheduler = Arc::new(PollingScheduler::new(targets));
    let dispatcher = Arc::new(CommandDispatcher::new(
        gateway,
        registry.clone(),
        scheduler.clone(),
        sink,
    ));

    scheduler.start(settings.interval_for(Cadence::default()));
    spawn_refresh(&scheduler);

    while let Some(command) = cmd_rx.recv().await {
        match command {
            EngineCommand::Submit(command) => {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    let _ = dispatcher.submit(command).await;
                });
            }
            EngineCommand::LoadHistory(mut filter) => {
                filter.limit = filter.limit.min(settings.history_page_size);
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry.refresh_history(&filter).await;
                });
            }
            EngineCommand::LoadDetails(job_id) => {
                let registry = registry.clone();
                tokio::spawn(async move {
                    let _ = registry.details(job_id).await;
                });
            }
            EngineCommand::RefreshNow => spawn_refresh(&scheduler),
            EngineCommand::SetCadence(cadence) => {
                let interval = settings.interval_for(cadence);
                if scheduler.interval() != Some(interval) {
                    sync_info!("Switching to {:?} cadence", cadence);
                    scheduler.start(interval);
                }
            }
            EngineCommand::Shutdown => break,
        }
    }

    scheduler.stop();
    sync_debug!("Engine stopped");
}

fn spawn_refresh(scheduler: &Arc<PollingScheduler>) {
    let scheduler = scheduler.clone();
    tokio::spawn(async move {
        scheduler.poll_once().await;
    });
}
