use crate::{Task, TaskStatus};

/// Progress reported for statuses without a fixed position.
pub const PROGRESS_FLOOR: u8 = 10;

/// Coarse completion percentage for a task.
///
/// The server exposes no fractional progress, so each task status maps to a
/// fixed ordinal. A status regression reported by the server moves the value
/// backwards; that is passed through unchanged.
pub fn progress_of(task: &Task) -> u8 {
    progress_for_status(&task.status)
}

pub fn progress_for_status(status: &TaskStatus) -> u8 {
    match status {
        TaskStatus::Initializing => 10,
        TaskStatus::Crawling => 30,
        TaskStatus::Extracting => 60,
        TaskStatus::Processing => 80,
        TaskStatus::Completed => 100,
        TaskStatus::Failed | TaskStatus::Unknown | TaskStatus::Other(_) => PROGRESS_FLOOR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn improving_statuses_never_decrease_progress() {
        let ladder = [
            TaskStatus::Initializing,
            TaskStatus::Crawling,
            TaskStatus::Extracting,
            TaskStatus::Processing,
            TaskStatus::Completed,
        ];
        let values: Vec<u8> = ladder.iter().map(progress_for_status).collect();
        assert_eq!(values, vec![10, 30, 60, 80, 100]);
        assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn unrecognized_status_maps_to_floor() {
        assert_eq!(progress_for_status(&TaskStatus::Unknown), PROGRESS_FLOOR);
        assert_eq!(
            progress_for_status(&TaskStatus::Other("queued".into())),
            PROGRESS_FLOOR
        );
    }

    #[test]
    fn regression_is_reported_as_is() {
        let mut task = Task::placeholder(1);
        task.status = TaskStatus::Extracting;
        assert_eq!(progress_of(&task), 60);
        task.status = TaskStatus::Crawling;
        assert_eq!(progress_of(&task), 30);
    }
}
