//! In-memory local repository implementation.
//!
//! Stores schedules and tasks in hash maps behind a single lock, which makes
//! every multi-row operation atomic for free. Suitable for unit tests and
//! local development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::db::repository::*;
use crate::models::{
    NewSchedule, NewTask, Schedule, ScheduleId, ScheduleStatus, Task, TaskId, TaskStatus,
    VisitUpdate,
};

/// In-memory local repository.
///
/// # Example
/// ```
/// use visit_tracker::db::repositories::LocalRepository;
///
/// let repo = LocalRepository::new();
/// assert_eq!(repo.schedule_count(), 0);
/// ```
#[derive(Clone, Default)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
    writes: Arc<AtomicU64>,
}

struct LocalData {
    schedules: HashMap<ScheduleId, Schedule>,
    tasks: HashMap<TaskId, Task>,

    // ID counters
    next_schedule_id: i64,
    next_task_id: i64,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            schedules: HashMap::new(),
            tasks: HashMap::new(),
            next_schedule_id: 1,
            next_task_id: 1,
            is_healthy: true,
        }
    }
}

impl LocalData {
    fn allocate_task(
        &mut self,
        schedule_id: ScheduleId,
        task: &NewTask,
        created_at: DateTime<Utc>,
    ) -> Task {
        let id = TaskId::new(self.next_task_id);
        self.next_task_id += 1;
        Task {
            id,
            schedule_id,
            description: task.description.clone(),
            status: TaskStatus::default(),
            reason: None,
            completed_at: None,
            created_at,
        }
    }

    /// Schedule with its tasks attached, ordered by task id.
    fn hydrate(&self, schedule: &Schedule) -> Schedule {
        let mut tasks: Vec<Task> = self
            .tasks
            .values()
            .filter(|t| t.schedule_id == schedule.id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.id);

        let mut schedule = schedule.clone();
        schedule.tasks = tasks;
        schedule
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Number of successful mutating operations since creation.
    ///
    /// Tests use it to assert that an operation performed no writes.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Get the number of schedules stored.
    pub fn schedule_count(&self) -> usize {
        self.data.read().schedules.len()
    }

    /// Get the number of tasks stored.
    pub fn task_count(&self) -> usize {
        self.data.read().tasks.len()
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    /// Helper to check health and return error if unhealthy.
    fn check_health(&self) -> RepositoryResult<()> {
        if !self.data.read().is_healthy {
            return Err(RepositoryError::connection("Database is not healthy"));
        }
        Ok(())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ScheduleRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn create_schedule(
        &self,
        schedule: &NewSchedule,
        created_at: DateTime<Utc>,
    ) -> RepositoryResult<Schedule> {
        self.check_health()?;
        schedule.validate().map_err(RepositoryError::validation)?;

        let mut data = self.data.write();
        let id = ScheduleId::new(data.next_schedule_id);
        data.next_schedule_id += 1;

        let stored = Schedule {
            id,
            user_id: schedule.user_id,
            client_name: schedule.client_name.clone(),
            location: schedule.location.clone(),
            shift_time: schedule.shift_time,
            status: ScheduleStatus::Scheduled,
            start_time: None,
            end_time: None,
            start_lat: None,
            start_lon: None,
            end_lat: None,
            end_lon: None,
            created_at,
            tasks: Vec::new(),
        };
        for task in &schedule.tasks {
            let task = data.allocate_task(id, task, created_at);
            data.tasks.insert(task.id, task);
        }
        data.schedules.insert(id, stored.clone());
        let created = data.hydrate(&stored);
        drop(data);

        self.record_write();
        Ok(created)
    }

    async fn get_schedule(&self, schedule_id: ScheduleId) -> RepositoryResult<Schedule> {
        self.check_health()?;
        let data = self.data.read();
        data.schedules
            .get(&schedule_id)
            .map(|s| data.hydrate(s))
            .ok_or_else(|| RepositoryError::missing(ScheduleId::ENTITY, schedule_id))
    }

    async fn list_schedules(&self, filter: &ScheduleFilter) -> RepositoryResult<Vec<Schedule>> {
        self.check_health()?;
        let data = self.data.read();
        let mut schedules: Vec<Schedule> = data
            .schedules
            .values()
            .filter(|s| filter.matches(s))
            .map(|s| data.hydrate(s))
            .collect();

        schedules.sort_by_key(|s| (s.shift_time, s.id));
        Ok(schedules)
    }

    async fn apply_visit_update(
        &self,
        schedule_id: ScheduleId,
        update: VisitUpdate,
    ) -> RepositoryResult<Schedule> {
        self.check_health()?;
        let mut data = self.data.write();
        let schedule = data
            .schedules
            .get_mut(&schedule_id)
            .ok_or_else(|| RepositoryError::missing(ScheduleId::ENTITY, schedule_id))?;
        update.apply(schedule);
        let updated = schedule.clone();
        let updated = data.hydrate(&updated);
        drop(data);

        self.record_write();
        Ok(updated)
    }

    async fn mark_missed(&self, schedule_id: ScheduleId) -> RepositoryResult<bool> {
        self.check_health()?;
        let mut data = self.data.write();
        let schedule = data
            .schedules
            .get_mut(&schedule_id)
            .ok_or_else(|| RepositoryError::missing(ScheduleId::ENTITY, schedule_id))?;
        if !schedule.status.can_become_missed() {
            return Ok(false);
        }
        schedule.status = ScheduleStatus::Missed;
        drop(data);

        self.record_write();
        Ok(true)
    }

    async fn delete_schedule(&self, schedule_id: ScheduleId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        if data.schedules.remove(&schedule_id).is_none() {
            return Err(RepositoryError::missing(ScheduleId::ENTITY, schedule_id));
        }
        data.tasks.retain(|_, t| t.schedule_id != schedule_id);
        drop(data);

        self.record_write();
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for LocalRepository {
    async fn assign_tasks(
        &self,
        schedule_id: ScheduleId,
        tasks: &[NewTask],
        created_at: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Task>> {
        self.check_health()?;
        // Validate the whole batch before touching state.
        for task in tasks {
            task.validate().map_err(|e| {
                RepositoryError::validation(e).with_context(
                    ErrorContext::new("assign_tasks").with_entity(ScheduleId::ENTITY, schedule_id),
                )
            })?;
        }

        let mut data = self.data.write();
        if !data.schedules.contains_key(&schedule_id) {
            return Err(RepositoryError::missing(ScheduleId::ENTITY, schedule_id));
        }
        let created: Vec<Task> = tasks
            .iter()
            .map(|t| {
                let task = data.allocate_task(schedule_id, t, created_at);
                data.tasks.insert(task.id, task.clone());
                task
            })
            .collect();
        drop(data);

        self.record_write();
        Ok(created)
    }

    async fn get_task(&self, task_id: TaskId) -> RepositoryResult<Task> {
        self.check_health()?;
        self.data
            .read()
            .tasks
            .get(&task_id)
            .cloned()
            .ok_or_else(|| RepositoryError::missing(TaskId::ENTITY, task_id))
    }

    async fn update_task_status(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        reason: Option<String>,
        completed_at: Option<DateTime<Utc>>,
    ) -> RepositoryResult<Task> {
        self.check_health()?;
        let mut data = self.data.write();
        let task = data
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| RepositoryError::missing(TaskId::ENTITY, task_id))?;
        task.status = status;
        task.reason = reason;
        task.completed_at = completed_at;
        let updated = task.clone();
        drop(data);

        self.record_write();
        Ok(updated)
    }
}
