//! Errors the storage layer reports for visit data, and how the service
//! layer classifies them.

use chrono::{TimeZone, Utc};

use visit_tracker::db::{
    ErrorContext, LocalRepository, RepositoryError, ScheduleRepository, TaskRepository,
};
use visit_tracker::models::{NewSchedule, NewTask, ScheduleId, TaskId, TaskStatus, UserId};
use visit_tracker::services::ServiceError;

fn new_schedule(tasks: &[&str]) -> NewSchedule {
    NewSchedule {
        user_id: UserId::new(3),
        client_name: "Ada".to_string(),
        location: "12 Elm St".to_string(),
        shift_time: Utc.with_ymd_and_hms(2024, 6, 1, 14, 0, 0).unwrap(),
        tasks: tasks.iter().map(|t| NewTask::new(*t)).collect(),
    }
}

fn created_at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
}

#[tokio::test]
async fn test_missing_schedule_names_the_record() {
    let repo = LocalRepository::new();
    let err = repo.get_schedule(ScheduleId::new(404)).await.unwrap_err();

    assert!(err.is_not_found());
    assert!(!err.is_retryable());
    assert!(err.to_string().starts_with("schedule 404 not found"));
    assert_eq!(err.context().entity.as_deref(), Some("schedule"));
    assert_eq!(err.context().entity_id.as_deref(), Some("404"));

    let service: ServiceError = err.into();
    assert!(matches!(service, ServiceError::NotFound(ref m) if m == "schedule 404 not found"));
}

#[tokio::test]
async fn test_missing_task_on_status_update() {
    let repo = LocalRepository::new();
    let err = repo
        .update_task_status(TaskId::new(9), TaskStatus::Completed, None, Some(created_at()))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.context().entity.as_deref(), Some("task"));
}

#[tokio::test]
async fn test_invalid_task_batch_is_validation_error() {
    let repo = LocalRepository::new();
    let schedule = repo.create_schedule(&new_schedule(&[]), created_at()).await.unwrap();

    let err = repo
        .assign_tasks(schedule.id, &[NewTask::new("Meds"), NewTask::new("")], created_at())
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::Validation { .. }));
    assert_eq!(err.context().operation.as_deref(), Some("assign_tasks"));
    assert!(matches!(ServiceError::from(err), ServiceError::InvalidArgument(_)));
    assert_eq!(repo.task_count(), 0);
}

#[tokio::test]
async fn test_unreachable_store_is_retryable_internal_error() {
    let repo = LocalRepository::new();
    repo.set_healthy(false);

    let err = repo
        .create_schedule(&new_schedule(&["Meds"]), created_at())
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Connection { .. }));
    assert!(err.is_retryable());

    let service = ServiceError::from(err);
    assert_eq!(service.code(), "INTERNAL");
    assert_eq!(repo.schedule_count(), 0);
}

#[test]
fn test_operation_is_recorded_without_losing_entity() {
    let err = RepositoryError::missing("schedule", 5).with_operation("mark_missed");
    let text = err.to_string();
    assert!(text.contains("op=mark_missed"));
    assert!(text.contains("schedule=5"));
}

#[test]
fn test_replacing_context_keeps_connection_retryable() {
    let err = RepositoryError::connection("pool timed out")
        .with_context(ErrorContext::new("checkout").with_details("attempt=3"));
    assert!(err.is_retryable());
    assert_eq!(err.context().details.as_deref(), Some("attempt=3"));

    let err = RepositoryError::query("syntax error").with_context(ErrorContext::new("list"));
    assert!(!err.is_retryable());
}
