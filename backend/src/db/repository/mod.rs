//! Repository traits for abstracting schedule and task storage.
//!
//! The lifecycle services only talk to these traits, so the in-memory and the
//! Postgres backends are interchangeable behind an `Arc<dyn FullRepository>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    NewSchedule, NewTask, Schedule, ScheduleId, ScheduleStatus, Task, TaskId, TaskStatus, UserId,
    VisitUpdate,
};

pub mod error;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

/// Selection criteria for [`ScheduleRepository::list_schedules`].
///
/// `shift_from` is inclusive and `shift_until` exclusive, matching the
/// half-open local-day windows computed by the time module. An empty
/// `statuses` list means "any status".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleFilter {
    pub user_id: Option<UserId>,
    pub shift_from: Option<DateTime<Utc>>,
    pub shift_until: Option<DateTime<Utc>>,
    pub statuses: Vec<ScheduleStatus>,
}

impl ScheduleFilter {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn shift_from(mut self, from: DateTime<Utc>) -> Self {
        self.shift_from = Some(from);
        self
    }

    pub fn shift_until(mut self, until: DateTime<Utc>) -> Self {
        self.shift_until = Some(until);
        self
    }

    pub fn with_statuses(mut self, statuses: &[ScheduleStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    /// In-process evaluation, used by backends that cannot push filters down.
    pub fn matches(&self, schedule: &Schedule) -> bool {
        self.user_id.map_or(true, |u| schedule.user_id == u)
            && self.shift_from.map_or(true, |f| schedule.shift_time >= f)
            && self.shift_until.map_or(true, |u| schedule.shift_time < u)
            && (self.statuses.is_empty() || self.statuses.contains(&schedule.status))
    }
}

/// Schedule storage.
///
/// Every schedule returned carries its tasks. Listings are ordered by
/// `shift_time` ascending, then by id.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    // ==================== Health & Connection ====================

    /// Check if the backing store is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    // ==================== Schedule Operations ====================

    /// Insert a schedule with status `scheduled` together with its initial
    /// tasks, all or nothing.
    async fn create_schedule(
        &self,
        schedule: &NewSchedule,
        created_at: DateTime<Utc>,
    ) -> RepositoryResult<Schedule>;

    /// Fetch a schedule with its tasks.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the schedule doesn't exist
    async fn get_schedule(&self, schedule_id: ScheduleId) -> RepositoryResult<Schedule>;

    async fn list_schedules(&self, filter: &ScheduleFilter) -> RepositoryResult<Vec<Schedule>>;

    /// Write the columns owned by a clock-in, clock-out or cancel.
    ///
    /// Last write wins; no prior-status check is made.
    async fn apply_visit_update(
        &self,
        schedule_id: ScheduleId,
        update: VisitUpdate,
    ) -> RepositoryResult<Schedule>;

    /// Conditionally move a schedule to `missed`.
    ///
    /// Only a schedule currently `scheduled` or `in_progress` is updated.
    /// Returns whether a row changed, so repeated calls are no-ops.
    async fn mark_missed(&self, schedule_id: ScheduleId) -> RepositoryResult<bool>;

    /// Hard-delete a schedule and, by cascade, its tasks.
    async fn delete_schedule(&self, schedule_id: ScheduleId) -> RepositoryResult<()>;
}

/// Task storage.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Attach a batch of tasks to a schedule in a single all-or-nothing step.
    async fn assign_tasks(
        &self,
        schedule_id: ScheduleId,
        tasks: &[NewTask],
        created_at: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Task>>;

    async fn get_task(&self, task_id: TaskId) -> RepositoryResult<Task>;

    async fn update_task_status(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        reason: Option<String>,
        completed_at: Option<DateTime<Utc>>,
    ) -> RepositoryResult<Task>;
}

/// Everything the services need from storage.
pub trait FullRepository: ScheduleRepository + TaskRepository {}

impl<T> FullRepository for T where T: ScheduleRepository + TaskRepository {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn schedule(user: i64, hour: u32, status: ScheduleStatus) -> Schedule {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap();
        Schedule {
            id: ScheduleId::new(1),
            user_id: UserId::new(user),
            client_name: "Ada".into(),
            location: "Elm St".into(),
            shift_time: at,
            status,
            start_time: None,
            end_time: None,
            start_lat: None,
            start_lon: None,
            end_lat: None,
            end_lon: None,
            created_at: at,
            tasks: vec![],
        }
    }

    #[test]
    fn test_filter_window_is_half_open() {
        let from = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let filter = ScheduleFilter::for_user(UserId::new(3))
            .shift_from(from)
            .shift_until(until);

        assert!(filter.matches(&schedule(3, 10, ScheduleStatus::Scheduled)));
        assert!(filter.matches(&schedule(3, 11, ScheduleStatus::Scheduled)));
        assert!(!filter.matches(&schedule(3, 12, ScheduleStatus::Scheduled)));
        assert!(!filter.matches(&schedule(4, 11, ScheduleStatus::Scheduled)));
    }

    #[test]
    fn test_filter_statuses() {
        let filter = ScheduleFilter::default()
            .with_statuses(&[ScheduleStatus::Completed, ScheduleStatus::Missed]);
        assert!(filter.matches(&schedule(3, 9, ScheduleStatus::Missed)));
        assert!(!filter.matches(&schedule(3, 9, ScheduleStatus::InProgress)));
        assert!(ScheduleFilter::default().matches(&schedule(3, 9, ScheduleStatus::Cancelled)));
    }
}
