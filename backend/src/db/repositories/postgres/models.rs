use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::{schedules, tasks};
use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult};
use crate::models::{
    NewTask, Schedule, ScheduleId, ScheduleStatus, Task, TaskId, TaskStatus, UserId,
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schedules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ScheduleRow {
    pub id: i64,
    pub user_id: i64,
    pub client_name: String,
    pub location: String,
    pub shift_time: DateTime<Utc>,
    pub status: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub start_lat: Option<f64>,
    pub start_lon: Option<f64>,
    pub end_lat: Option<f64>,
    pub end_lon: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schedules)]
pub struct NewScheduleRow<'a> {
    pub user_id: i64,
    pub client_name: &'a str,
    pub location: &'a str,
    pub shift_time: DateTime<Utc>,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    pub id: i64,
    pub schedule_id: i64,
    pub description: String,
    pub status: String,
    pub reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow<'a> {
    pub schedule_id: i64,
    pub description: &'a str,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewTaskRow<'a> {
    pub fn new(schedule_id: ScheduleId, task: &'a NewTask, created_at: DateTime<Utc>) -> Self {
        Self {
            schedule_id: schedule_id.value(),
            description: &task.description,
            status: TaskStatus::default().as_str(),
            created_at,
        }
    }
}

fn unknown_status(entity: &str, id: i64, value: &str) -> RepositoryError {
    RepositoryError::internal(format!("unknown status {:?} in database", value))
        .with_context(ErrorContext::new("decode_row").with_entity(entity, id))
}

impl TaskRow {
    pub fn into_task(self) -> RepositoryResult<Task> {
        let status = TaskStatus::parse(&self.status)
            .ok_or_else(|| unknown_status(TaskId::ENTITY, self.id, &self.status))?;
        Ok(Task {
            id: TaskId::new(self.id),
            schedule_id: ScheduleId::new(self.schedule_id),
            description: self.description,
            status,
            reason: self.reason,
            completed_at: self.completed_at,
            created_at: self.created_at,
        })
    }
}

impl ScheduleRow {
    pub fn into_schedule(self, tasks: Vec<TaskRow>) -> RepositoryResult<Schedule> {
        let status = ScheduleStatus::parse(&self.status)
            .ok_or_else(|| unknown_status(ScheduleId::ENTITY, self.id, &self.status))?;
        let tasks = tasks
            .into_iter()
            .map(TaskRow::into_task)
            .collect::<RepositoryResult<Vec<_>>>()?;

        Ok(Schedule {
            id: ScheduleId::new(self.id),
            user_id: UserId::new(self.user_id),
            client_name: self.client_name,
            location: self.location,
            shift_time: self.shift_time,
            status,
            start_time: self.start_time,
            end_time: self.end_time,
            start_lat: self.start_lat,
            start_lon: self.start_lon,
            end_lat: self.end_lat,
            end_lon: self.end_lon,
            created_at: self.created_at,
            tasks,
        })
    }
}
