//! Server payloads and their conversion into core types.
//!
//! Every field except a job's id is optional on the wire. Records are decoded
//! one at a time so a single malformed entry never hides the rest of a list.

use chrono::{DateTime, NaiveDateTime, Utc};
use jobsync_core::{
    ErrorKind, Job, JobId, JobStatus, SyncError, Task, TaskRef, TaskStatus, WorkerActivity,
    WorkerSnapshot, WorkerStatus,
};
use jobsync_logging::sync_warn;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::gateway::ApiResponse;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StructureRecord {
    #[serde(deserialize_with = "lenient_id")]
    id: Option<u64>,
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TaskRecord {
    #[serde(deserialize_with = "lenient_id")]
    id: Option<u64>,
    status: Option<String>,
    current_step: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    pages_explored: Option<u64>,
    #[serde(deserialize_with = "lenient_count")]
    leads_found: Option<u64>,
    #[serde(deserialize_with = "lenient_count")]
    unique_leads: Option<u64>,
    duration: Option<f64>,
    start_time: Option<String>,
    last_activity: Option<String>,
    error_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JobRecord {
    id: Option<u64>,
    name: Option<String>,
    search_query: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    leads_allocated: Option<u64>,
    #[serde(deserialize_with = "lenient_count")]
    leads_found: Option<u64>,
    status: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    structure: Option<StructureRecord>,
    #[serde(deserialize_with = "lenient_id")]
    structure_id: Option<u64>,
    task: Option<TaskRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TaskRefRecord {
    #[serde(deserialize_with = "lenient_id")]
    id: Option<u64>,
    #[serde(deserialize_with = "lenient_id")]
    job_id: Option<u64>,
    job_name: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ActivityRecord {
    worker_name: Option<String>,
    hostname: Option<String>,
    activity_type: Option<String>,
    status: Option<String>,
    current_url: Option<String>,
    timestamp: Option<String>,
    task: Option<TaskRefRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ActivityEnvelope {
    #[serde(deserialize_with = "lenient_count")]
    active_workers: Option<u64>,
    #[serde(deserialize_with = "lenient_count")]
    total_workers: Option<u64>,
    activities: Option<Vec<Value>>,
}

impl TaskRecord {
    fn into_task(self, job_id: JobId) -> Task {
        Task {
            job_id,
            task_id: self.id,
            status: self
                .status
                .as_deref()
                .map(TaskStatus::from)
                .unwrap_or(TaskStatus::Unknown),
            current_step: self.current_step.unwrap_or_default(),
            pages_explored: self.pages_explored.unwrap_or(0),
            leads_found: self.leads_found.unwrap_or(0),
            unique_leads: self.unique_leads.unwrap_or(0),
            duration_seconds: self
                .duration
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .map(|secs| secs.round() as u64)
                .unwrap_or(0),
            start_time: self.start_time.as_deref().and_then(parse_timestamp),
            last_activity: self.last_activity.as_deref().and_then(parse_timestamp),
            error_message: self.error_message.filter(|msg| !msg.is_empty()),
        }
    }
}

impl JobRecord {
    fn into_job(self) -> Option<Job> {
        let id = self.id?;
        let structure = self.structure.unwrap_or_default();
        let task = match self.task {
            Some(task) => task.into_task(id),
            None => Task::placeholder(id),
        };

        Some(Job {
            id,
            name: self.name.unwrap_or_default(),
            structure_ref: structure.id.or(self.structure_id),
            structure_name: structure.name,
            status: self
                .status
                .as_deref()
                .map(JobStatus::from)
                .unwrap_or_else(|| JobStatus::Other("unknown".to_string())),
            leads_allocated: self.leads_allocated.map(saturate_u32).unwrap_or(0),
            leads_found: self.leads_found.unwrap_or(0),
            search_query: self.search_query.unwrap_or_default(),
            created_at: self.created_at.as_deref().and_then(parse_timestamp),
            updated_at: self.updated_at.as_deref().and_then(parse_timestamp),
            task,
        })
    }
}

impl ActivityRecord {
    fn into_activity(self) -> WorkerActivity {
        WorkerActivity {
            worker_name: self.worker_name.unwrap_or_default(),
            hostname: self.hostname.unwrap_or_default(),
            activity_type: self.activity_type.unwrap_or_default(),
            status: self
                .status
                .as_deref()
                .map(WorkerStatus::from)
                .unwrap_or(WorkerStatus::Idle),
            current_task: self.task.and_then(|task| {
                Some(TaskRef {
                    task_id: task.id?,
                    job_id: task.job_id,
                    job_name: task.job_name,
                    status: task
                        .status
                        .as_deref()
                        .map(TaskStatus::from)
                        .unwrap_or(TaskStatus::Unknown),
                })
            }),
            current_url: self.current_url.filter(|url| !url.is_empty()),
            timestamp: self.timestamp.as_deref().and_then(parse_timestamp),
        }
    }
}

/// Counter that tolerates floats, negatives and numeric strings. Anything
/// unreadable is treated as absent rather than failing the whole record.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|value| value.is_finite())
                .map(|value| value.max(0.0).round() as u64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    })
}

/// Secondary identifiers: a non-integer is absent.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    })
}

fn saturate_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// RFC 3339, falling back to a naive timestamp read as UTC. Anything else is absent.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Checks the status code and the `success` flag, returning the body on success.
pub(crate) fn expect_success(response: ApiResponse) -> Result<Value, SyncError> {
    let server_message = response
        .body
        .get("error")
        .or_else(|| response.body.get("message"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned);

    if !response.is_success() {
        return Err(match server_message {
            Some(message) => SyncError::server_rejected(message),
            None => SyncError::new(
                ErrorKind::HttpStatus(response.status),
                format!("request failed with status {}", response.status),
            ),
        });
    }

    if !response.body.is_object() {
        return Err(SyncError::new(ErrorKind::Decode, "expected a JSON object"));
    }

    if response.body.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(SyncError::server_rejected(
            server_message.unwrap_or_else(|| "request failed".to_string()),
        ));
    }

    Ok(response.body)
}

/// Decodes the first job list found under `keys`. A missing list is empty.
pub(crate) fn decode_jobs(body: &Value, keys: &[&str]) -> Vec<Job> {
    let Some(entries) = keys
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_array))
    else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let record = match JobRecord::deserialize(entry) {
                Ok(record) => record,
                Err(err) => {
                    sync_warn!("Skipping malformed job record: {}", err);
                    return None;
                }
            };
            let job = record.into_job();
            if job.is_none() {
                sync_warn!("Skipping job record without id");
            }
            job
        })
        .collect()
}

/// Decodes the single job under `job`, as returned by the details endpoint.
pub(crate) fn decode_job(body: &Value) -> Result<Job, SyncError> {
    let entry = body
        .get("job")
        .filter(|entry| entry.is_object())
        .ok_or_else(|| SyncError::new(ErrorKind::Decode, "response is missing job"))?;
    JobRecord::deserialize(entry)
        .map_err(|err| SyncError::new(ErrorKind::Decode, err.to_string()))?
        .into_job()
        .ok_or_else(|| SyncError::new(ErrorKind::Decode, "job record has no id"))
}

pub(crate) fn decode_workers(body: &Value) -> Result<WorkerSnapshot, SyncError> {
    let envelope = ActivityEnvelope::deserialize(body)
        .map_err(|err| SyncError::new(ErrorKind::Decode, err.to_string()))?;

    let activities: Vec<WorkerActivity> = envelope
        .activities
        .unwrap_or_default()
        .iter()
        .filter_map(|entry| match ActivityRecord::deserialize(entry) {
            Ok(record) => Some(record.into_activity()),
            Err(err) => {
                sync_warn!("Skipping malformed worker activity: {}", err);
                None
            }
        })
        .collect();

    Ok(WorkerSnapshot {
        active_workers: envelope
            .active_workers
            .map(saturate_u32)
            .unwrap_or_else(|| saturate_u32(activities.len() as u64)),
        total_workers: envelope.total_workers.map(saturate_u32).unwrap_or(0),
        activities,
    })
}

pub(crate) fn decode_job_id(body: &Value) -> Result<JobId, SyncError> {
    body.get("job_id")
        .and_then(Value::as_u64)
        .ok_or_else(|| SyncError::new(ErrorKind::Decode, "response is missing job_id"))
}
