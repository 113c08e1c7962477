use jobsync_core::{
    ControlAction, ErrorKind, HistoryFilter, Job, JobStatus, RegistryState, SyncError, Task,
    TaskStatus,
};
use pretty_assertions::assert_eq;

fn job(id: u64, status: JobStatus, task_status: TaskStatus) -> Job {
    let mut task = Task::placeholder(id);
    task.status = task_status;
    Job {
        id,
        name: format!("Manual scrape: Structure #{id}"),
        structure_ref: Some(id),
        structure_name: None,
        status,
        leads_allocated: 10,
        leads_found: 0,
        search_query: String::new(),
        created_at: None,
        updated_at: None,
        task,
    }
}

#[test]
fn identical_snapshot_reports_unchanged() {
    let mut state = RegistryState::new();
    let jobs = vec![job(1, JobStatus::Running, TaskStatus::Crawling)];

    assert!(state.apply_active(jobs.clone()));
    assert!(!state.apply_active(jobs));
    assert_eq!(state.generation(), 2);
}

#[test]
fn empty_to_empty_is_unchanged() {
    let mut state = RegistryState::new();
    assert!(!state.apply_active(Vec::new()));
}

#[test]
fn counter_change_is_detected() {
    let mut state = RegistryState::new();
    let first = job(1, JobStatus::Running, TaskStatus::Crawling);
    let mut second = first.clone();
    second.task.pages_explored = 12;

    state.apply_active(vec![first]);
    assert!(state.apply_active(vec![second]));
}

#[test]
fn failure_keeps_last_good_snapshot() {
    let mut state = RegistryState::new();
    state.apply_active(vec![job(1, JobStatus::Running, TaskStatus::Extracting)]);

    state.record_failure(SyncError::network("connection refused"));

    let snapshot = state.snapshot();
    assert_eq!(snapshot.entries.len(), 1);
    assert_eq!(snapshot.entries[0].progress, 60);
    assert_eq!(
        snapshot.last_error.as_ref().map(|err| &err.kind),
        Some(&ErrorKind::Network)
    );

    state.apply_active(vec![job(1, JobStatus::Running, TaskStatus::Processing)]);
    assert!(state.last_error().is_none());
}

#[test]
fn terminal_job_stays_until_server_drops_it() {
    let mut state = RegistryState::new();
    state.apply_active(vec![job(4, JobStatus::Completed, TaskStatus::Completed)]);
    assert_eq!(state.get(4).map(|job| &job.status), Some(&JobStatus::Completed));

    state.apply_active(Vec::new());
    assert!(state.get(4).is_none());
}

#[test]
fn pending_marker_does_not_touch_confirmed_status() {
    let mut state = RegistryState::new();
    state.apply_active(vec![job(1, JobStatus::Running, TaskStatus::Crawling)]);

    state.mark_pending(1, ControlAction::Pause);
    let snapshot = state.snapshot();
    assert_eq!(snapshot.entries[0].pending, Some(ControlAction::Pause));
    assert_eq!(snapshot.entries[0].job.status, JobStatus::Running);

    // Confirmed refresh discards the marker even if the server disagrees.
    let changed = state.apply_active(vec![job(1, JobStatus::Running, TaskStatus::Crawling)]);
    assert!(changed);
    assert_eq!(state.pending(1), None);
}

#[test]
fn response_requested_before_command_keeps_its_marker() {
    let mut state = RegistryState::new();
    state.apply_active(vec![job(1, JobStatus::Running, TaskStatus::Crawling)]);

    let stale = state.begin_refresh();
    state.mark_pending(1, ControlAction::Pause);
    let fresh = state.begin_refresh();

    let changed = state.apply_response(stale, vec![job(1, JobStatus::Running, TaskStatus::Crawling)]);
    assert!(!changed);
    assert_eq!(state.pending(1), Some(ControlAction::Pause));

    assert!(state.apply_response(fresh, vec![job(1, JobStatus::Paused, TaskStatus::Crawling)]));
    assert_eq!(state.pending(1), None);
    assert_eq!(state.cached_status(1), Some(&JobStatus::Paused));
}

#[test]
fn response_older_than_applied_one_is_ignored() {
    let mut state = RegistryState::new();
    let older = state.begin_refresh();
    let newer = state.begin_refresh();

    state.apply_response(newer, vec![job(1, JobStatus::Paused, TaskStatus::Crawling)]);
    let generation = state.generation();

    assert!(!state.apply_response(older, vec![job(1, JobStatus::Running, TaskStatus::Crawling)]));
    assert_eq!(state.cached_status(1), Some(&JobStatus::Paused));
    assert_eq!(state.generation(), generation);
}

#[test]
fn provisional_job_survives_response_requested_before_create() {
    let mut state = RegistryState::new();
    let stale = state.begin_refresh();
    state.insert_provisional(Job::provisional(9, "Manual scrape: Dentists", 7, 25, "q"));

    state.apply_response(stale, Vec::new());
    assert!(state.snapshot().entries[0].provisional);

    state.apply_active(Vec::new());
    assert!(state.snapshot().entries.is_empty());
}

#[test]
fn structure_name_comes_from_cached_jobs() {
    let mut state = RegistryState::new();
    let mut historic = job(3, JobStatus::Completed, TaskStatus::Completed);
    historic.structure_ref = Some(7);
    historic.structure_name = Some("Dentists".to_string());
    state.apply_history(vec![historic]);
    state.apply_active(vec![job(7, JobStatus::Running, TaskStatus::Crawling)]);

    assert_eq!(state.structure_name(7), Some("Dentists"));
    assert_eq!(state.structure_name(8), None);
}

#[test]
fn provisional_job_is_replaced_by_server_record() {
    let mut state = RegistryState::new();
    state.insert_provisional(Job::provisional(9, "Manual scrape: Structure #7", 7, 25, "q"));

    let snapshot = state.snapshot();
    assert_eq!(snapshot.entries.len(), 1);
    assert!(snapshot.entries[0].provisional);
    assert_eq!(state.cached_status(9), Some(&JobStatus::Initializing));

    let mut confirmed = job(9, JobStatus::Running, TaskStatus::Initializing);
    confirmed.leads_allocated = 25;
    state.apply_active(vec![confirmed]);

    let snapshot = state.snapshot();
    assert_eq!(snapshot.entries.len(), 1);
    assert!(!snapshot.entries[0].provisional);
    assert_eq!(snapshot.entries[0].job.status, JobStatus::Running);
}

#[test]
fn cached_status_falls_back_to_history() {
    let mut state = RegistryState::new();
    state.apply_history(vec![job(2, JobStatus::Completed, TaskStatus::Completed)]);

    assert!(state.get(2).is_none());
    assert_eq!(state.cached_status(2), Some(&JobStatus::Completed));
    assert_eq!(state.cached_status(3), None);
}

#[test]
fn history_filter_matches_name_and_status() {
    let mut acme = job(1, JobStatus::Completed, TaskStatus::Completed);
    acme.name = "ACME dentists".to_string();
    let mut other = job(2, JobStatus::Failed, TaskStatus::Failed);
    other.name = "acme plumbers".to_string();
    let unrelated = job(3, JobStatus::Completed, TaskStatus::Completed);

    let filter = HistoryFilter {
        name: Some("acme".to_string()),
        status: Some(JobStatus::Completed),
        ..HistoryFilter::default()
    };
    let kept = filter.apply(vec![acme, other, unrelated]);
    assert_eq!(kept.iter().map(|job| job.id).collect::<Vec<_>>(), vec![1]);
}

#[test]
fn history_filter_bounds_the_page() {
    let jobs = (1..=5)
        .map(|id| job(id, JobStatus::Completed, TaskStatus::Completed))
        .collect();
    let filter = HistoryFilter {
        limit: 2,
        ..HistoryFilter::default()
    };
    assert_eq!(filter.apply(jobs).len(), 2);
}
