use std::collections::BTreeMap;

use jobsync_core::{
    correlate, Job, JobStatus, Task, TaskRef, TaskStatus, WorkerActivity, WorkerStatus,
};

fn job_with_task(id: u64, task_id: u64) -> Job {
    let mut task = Task::placeholder(id);
    task.task_id = Some(task_id);
    task.status = TaskStatus::Crawling;
    Job {
        id,
        name: format!("job {id}"),
        structure_ref: None,
        structure_name: None,
        status: JobStatus::Running,
        leads_allocated: 10,
        leads_found: 0,
        search_query: String::new(),
        created_at: None,
        updated_at: None,
        task,
    }
}

fn activity(worker: &str, task: Option<TaskRef>) -> WorkerActivity {
    WorkerActivity {
        worker_name: worker.to_string(),
        hostname: "host-a".to_string(),
        activity_type: "scraping".to_string(),
        status: if task.is_some() {
            WorkerStatus::Running
        } else {
            WorkerStatus::Idle
        },
        current_task: task,
        current_url: None,
        timestamp: None,
    }
}

fn task_ref(task_id: u64, job_id: Option<u64>) -> TaskRef {
    TaskRef {
        task_id,
        job_id,
        job_name: Some("from worker".to_string()),
        status: TaskStatus::Crawling,
    }
}

#[test]
fn resolves_by_job_id_then_task_id() {
    let jobs = [job_with_task(1, 101), job_with_task(2, 202)];
    let by_id: BTreeMap<_, _> = jobs.iter().map(|job| (job.id, job)).collect();
    let activities = vec![
        activity("w1", Some(task_ref(999, Some(1)))),
        activity("w2", Some(task_ref(202, None))),
    ];

    let rows = correlate(&activities, &by_id);
    assert_eq!(rows[0].job_id, Some(1));
    assert_eq!(rows[0].job_name.as_deref(), Some("job 1"));
    assert!(!rows[0].orphaned);
    assert_eq!(rows[1].job_id, Some(2));
    assert!(!rows[1].orphaned);
}

#[test]
fn unresolved_reference_is_kept_and_flagged() {
    let by_id = BTreeMap::new();
    let activities = vec![activity("w1", Some(task_ref(55, Some(3))))];

    let rows = correlate(&activities, &by_id);
    assert_eq!(rows.len(), 1);
    assert!(rows[0].orphaned);
    assert_eq!(rows[0].job_id, Some(3));
    assert_eq!(rows[0].job_name.as_deref(), Some("from worker"));
}

#[test]
fn idle_worker_is_not_orphaned() {
    let by_id = BTreeMap::new();
    let rows = correlate(&[activity("w1", None)], &by_id);
    assert!(!rows[0].orphaned);
    assert_eq!(rows[0].job_id, None);
}
