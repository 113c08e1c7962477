use std::collections::BTreeMap;

use crate::{Job, JobId, WorkerActivity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelatedActivity {
    pub activity: WorkerActivity,
    pub job_id: Option<JobId>,
    pub job_name: Option<String>,
    /// The activity references a task whose job is no longer in the snapshot.
    pub orphaned: bool,
}

/// Resolves each activity's task reference against a job snapshot.
///
/// References resolve by job id when the payload carries one, otherwise by the
/// task id of each job's current task. Unresolved references are kept and
/// flagged so worker history stays visible after a job leaves the active set.
pub fn correlate(
    activities: &[WorkerActivity],
    jobs_by_id: &BTreeMap<JobId, &Job>,
) -> Vec<CorrelatedActivity> {
    activities
        .iter()
        .map(|activity| {
            let Some(task_ref) = &activity.current_task else {
                return CorrelatedActivity {
                    activity: activity.clone(),
                    job_id: None,
                    job_name: None,
                    orphaned: false,
                };
            };

            let resolved = match task_ref.job_id {
                Some(job_id) => jobs_by_id.get(&job_id).copied(),
                None => jobs_by_id
                    .values()
                    .copied()
                    .find(|job| job.task.task_id == Some(task_ref.task_id)),
            };

            match resolved {
                Some(job) => CorrelatedActivity {
                    activity: activity.clone(),
                    job_id: Some(job.id),
                    job_name: Some(job.name.clone()),
                    orphaned: false,
                },
                None => CorrelatedActivity {
                    activity: activity.clone(),
                    job_id: task_ref.job_id,
                    job_name: task_ref.job_name.clone(),
                    orphaned: true,
                },
            }
        })
        .collect()
}
