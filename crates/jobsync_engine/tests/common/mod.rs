#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use jobsync_core::SyncError;
use jobsync_engine::{
    ApiRequest, ApiResponse, AuthGateway, CommandDispatcher, JobRegistry, Method,
    PollTarget, PollingScheduler, SnapshotSink, SyncEvent, WorkerActivityView,
};
use serde_json::{json, Value};
use tokio::sync::Semaphore;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(jobsync_logging::initialize_for_tests);
}

type Reply = Result<ApiResponse, SyncError>;

fn route_key(method: Method, path: &str) -> String {
    format!("{method:?} {path}")
}

/// In-process gateway answering from per-route scripts.
///
/// Each route replays its queued replies in order; the last one repeats.
/// Routes can be gated so a call blocks until the test releases it.
#[derive(Default)]
pub struct ScriptedGateway {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, method: Method, path: &str, replies: Vec<Reply>) {
        self.routes
            .lock()
            .unwrap()
            .insert(route_key(method, path), replies.into());
    }

    pub fn respond(&self, method: Method, path: &str, body: Value) {
        self.script(method, path, vec![Ok(ok(body))]);
    }

    /// Blocks calls to the route until permits are added to the returned semaphore.
    pub fn gate(&self, method: Method, path: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates
            .lock()
            .unwrap()
            .insert(route_key(method, path), gate.clone());
        gate
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn calls_to(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }

    pub async fn wait_for_calls(&self, method: Method, path: &str, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.calls_to(method, path) < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("expected call never arrived");
    }
}

#[async_trait]
impl AuthGateway for ScriptedGateway {
    async fn call(&self, request: &ApiRequest) -> Result<ApiResponse, SyncError> {
        self.requests.lock().unwrap().push(request.clone());
        let key = route_key(request.method, &request.path);

        let gate = self.gates.lock().unwrap().get(&key).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&key) {
            Some(replies) if replies.len() > 1 => replies.pop_front().unwrap(),
            Some(replies) => replies
                .front()
                .cloned()
                .unwrap_or_else(|| Err(SyncError::network(format!("no reply for {key}")))),
            None => Err(SyncError::network(format!("no route for {key}"))),
        }
    }
}

pub fn ok(body: Value) -> ApiResponse {
    ApiResponse { status: 200, body }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<SyncEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl SnapshotSink for RecordingSink {
    fn emit(&self, event: SyncEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn active_payload(jobs: Value) -> Value {
    json!({ "active_jobs": jobs })
}

pub fn idle_workers() -> Value {
    json!({ "success": true, "active_workers": 0, "total_workers": 2, "activities": [] })
}

pub fn running_job(id: u64, task_status: &str) -> Value {
    json!({
        "id": id,
        "name": format!("job {id}"),
        "status": "running",
        "leads_allocated": 25,
        "structure": {"id": 7, "name": "Dentists"},
        "task": {"id": id * 100, "status": task_status, "current_step": "Crawling listings"}
    })
}

/// Registry, worker view, scheduler and dispatcher wired to one scripted gateway.
pub struct Harness {
    pub gateway: Arc<ScriptedGateway>,
    pub sink: Arc<RecordingSink>,
    pub registry: Arc<JobRegistry>,
    pub workers: Arc<WorkerActivityView>,
    pub scheduler: Arc<PollingScheduler>,
    pub dispatcher: Arc<CommandDispatcher>,
}

impl Harness {
    pub fn new() -> Self {
        init_logging();
        let gateway = ScriptedGateway::new();
        gateway.respond(Method::Get, jobsync_engine::WORKER_ACTIVITY_PATH, idle_workers());

        let sink = Arc::new(RecordingSink::default());
        let registry = Arc::new(JobRegistry::new(gateway.clone(), sink.clone()));
        let workers = Arc::new(WorkerActivityView::new(gateway.clone(), sink.clone()));
        let targets: Vec<Arc<dyn PollTarget>> = vec![registry.clone(), workers.clone()];
        let scheduler = Arc::new(PollingScheduler::new(targets));
        let dispatcher = Arc::new(CommandDispatcher::new(
            gateway.clone(),
            registry.clone(),
            scheduler.clone(),
            sink.clone(),
        ));

        Self {
            gateway,
            sink,
            registry,
            workers,
            scheduler,
            dispatcher,
        }
    }
}
