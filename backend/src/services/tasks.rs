//! Caregiver task outcomes.

use chrono::{DateTime, Utc};
use tracing::info;

use super::error::{ServiceError, ServiceResult};
use crate::db::FullRepository;
use crate::models::{Caller, Task, TaskId, TaskStatusUpdate};

/// Record whether a task was done.
///
/// Only the owner of the task's schedule may do this. `completed_at` is set
/// to `now` for `completed` and cleared for `not_completed`.
pub async fn update_task_status(
    repository: &dyn FullRepository,
    caller: &Caller,
    task_id: TaskId,
    update: &TaskStatusUpdate,
    now: DateTime<Utc>,
) -> ServiceResult<Task> {
    let task = repository.get_task(task_id).await?;
    let schedule = repository.get_schedule(task.schedule_id).await?;
    if !caller.owns(schedule.user_id) {
        return Err(ServiceError::forbidden(format!(
            "task {} does not belong to user {}",
            task_id, caller.user_id
        )));
    }
    update.validate().map_err(ServiceError::invalid)?;

    let updated = repository
        .update_task_status(
            task_id,
            update.status,
            update.normalized_reason(),
            update.completed_at(now),
        )
        .await?;
    info!(task_id = %task_id, status = %updated.status, "task status updated");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{LocalRepository, ScheduleRepository};
    use crate::models::{NewSchedule, NewTask, TaskStatus, UserId};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 15, 0, 0).unwrap()
    }

    async fn seeded() -> (LocalRepository, TaskId) {
        let repo = LocalRepository::new();
        let schedule = repo
            .create_schedule(
                &NewSchedule {
                    user_id: UserId::new(3),
                    client_name: "Grace".into(),
                    location: "4 Oak Ave".into(),
                    shift_time: now(),
                    tasks: vec![NewTask::new("Give medication")],
                },
                now(),
            )
            .await
            .unwrap();
        let task_id = schedule.tasks[0].id;
        (repo, task_id)
    }

    #[tokio::test]
    async fn test_complete_then_reopen() {
        let (repo, id) = seeded().await;
        let caller = Caller::caregiver(3);

        let done = TaskStatusUpdate {
            status: TaskStatus::Completed,
            reason: None,
        };
        let task = update_task_status(&repo, &caller, id, &done, now()).await.unwrap();
        assert_eq!(task.completed_at, Some(now()));

        let undone = TaskStatusUpdate {
            status: TaskStatus::NotCompleted,
            reason: Some("client refused".into()),
        };
        let task = update_task_status(&repo, &caller, id, &undone, now()).await.unwrap();
        assert_eq!(task.completed_at, None);
        assert_eq!(task.reason.as_deref(), Some("client refused"));
    }

    #[tokio::test]
    async fn test_reason_required() {
        let (repo, id) = seeded().await;
        let update = TaskStatusUpdate {
            status: TaskStatus::NotCompleted,
            reason: None,
        };
        let err = update_task_status(&repo, &Caller::caregiver(3), id, &update, now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
        assert_eq!(repo.write_count(), 1);
    }

    #[tokio::test]
    async fn test_foreign_and_missing_tasks() {
        let (repo, id) = seeded().await;
        let update = TaskStatusUpdate {
            status: TaskStatus::Completed,
            reason: None,
        };

        let err = update_task_status(&repo, &Caller::caregiver(9), id, &update, now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = update_task_status(&repo, &Caller::caregiver(3), TaskId::new(77), &update, now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
