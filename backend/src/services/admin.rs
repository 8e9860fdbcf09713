//! Admin-only schedule management.

use chrono::{DateTime, Utc};
use tracing::info;

use super::error::{ServiceError, ServiceResult};
use crate::db::FullRepository;
use crate::models::{Caller, NewSchedule, NewTask, Schedule, ScheduleId, Task};

fn require_admin(caller: &Caller, action: &str) -> ServiceResult<()> {
    if !caller.is_admin() {
        return Err(ServiceError::forbidden(format!(
            "only admins may {} (user {} has role {:?})",
            action, caller.user_id, caller.role
        )));
    }
    Ok(())
}

/// Create a schedule in status `scheduled`, with optional initial tasks in
/// the same atomic write.
pub async fn create_schedule(
    repository: &dyn FullRepository,
    caller: &Caller,
    input: &NewSchedule,
    now: DateTime<Utc>,
) -> ServiceResult<Schedule> {
    require_admin(caller, "create schedules")?;
    input.validate().map_err(ServiceError::invalid)?;

    let schedule = repository.create_schedule(input, now).await?;
    info!(
        schedule_id = %schedule.id,
        user_id = %schedule.user_id,
        tasks = schedule.tasks.len(),
        "schedule created"
    );
    Ok(schedule)
}

/// Attach a batch of tasks; either all are created or none.
pub async fn assign_tasks(
    repository: &dyn FullRepository,
    caller: &Caller,
    schedule_id: ScheduleId,
    tasks: &[NewTask],
    now: DateTime<Utc>,
) -> ServiceResult<Vec<Task>> {
    require_admin(caller, "assign tasks")?;
    if tasks.is_empty() {
        return Err(ServiceError::invalid("at least one task is required"));
    }
    for task in tasks {
        task.validate().map_err(ServiceError::invalid)?;
    }

    let created = repository.assign_tasks(schedule_id, tasks, now).await?;
    info!(schedule_id = %schedule_id, count = created.len(), "tasks assigned");
    Ok(created)
}

/// Hard delete; tasks go with the schedule.
pub async fn delete_schedule(
    repository: &dyn FullRepository,
    caller: &Caller,
    schedule_id: ScheduleId,
) -> ServiceResult<()> {
    require_admin(caller, "delete schedules")?;
    repository.delete_schedule(schedule_id).await?;
    info!(schedule_id = %schedule_id, "schedule deleted");
    Ok(())
}
