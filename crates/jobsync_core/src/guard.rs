use crate::{ControlAction, ErrorKind, JobId, JobStatus, SyncError};

/// Fast-fail check of a control action against the cached job status.
///
/// Not a security boundary: the cache may be stale, and the server has the
/// final word. A rejection here never reaches the network.
pub fn check_transition(
    job_id: JobId,
    action: ControlAction,
    status: &JobStatus,
) -> Result<(), SyncError> {
    let allowed = match action {
        ControlAction::Pause => matches!(status, JobStatus::Running),
        ControlAction::Resume => matches!(status, JobStatus::Paused),
        ControlAction::Stop | ControlAction::Restart => {
            matches!(status, JobStatus::Running | JobStatus::Paused)
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(SyncError::new(
            ErrorKind::InvalidTransition {
                action,
                status: status.clone(),
            },
            format!("job {job_id}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_only_from_running() {
        assert!(check_transition(1, ControlAction::Pause, &JobStatus::Running).is_ok());
        assert!(check_transition(1, ControlAction::Pause, &JobStatus::Paused).is_err());
        assert!(check_transition(1, ControlAction::Pause, &JobStatus::Initializing).is_err());
    }

    #[test]
    fn resume_only_from_paused() {
        assert!(check_transition(1, ControlAction::Resume, &JobStatus::Paused).is_ok());
        let err = check_transition(2, ControlAction::Resume, &JobStatus::Completed).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::InvalidTransition {
                action: ControlAction::Resume,
                status: JobStatus::Completed,
            }
        );
        assert!(err.is_local());
    }

    #[test]
    fn stop_and_restart_from_running_or_paused() {
        for action in [ControlAction::Stop, ControlAction::Restart] {
            assert!(check_transition(1, action, &JobStatus::Running).is_ok());
            assert!(check_transition(1, action, &JobStatus::Paused).is_ok());
            assert!(check_transition(1, action, &JobStatus::Failed).is_err());
            assert!(check_transition(1, action, &JobStatus::Other("x".into())).is_err());
        }
    }
}
