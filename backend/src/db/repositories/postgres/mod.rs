//! Postgres repository implementation using Diesel.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tokio::task;

use crate::db::repository::{
    ErrorContext, RepositoryError, RepositoryResult, ScheduleFilter, ScheduleRepository,
    TaskRepository,
};
use crate::models::{
    NewSchedule, NewTask, Schedule, ScheduleId, ScheduleStatus, Task, TaskId, TaskStatus,
    VisitUpdate,
};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Create configuration from environment variables (see module docs).
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let defaults = Self::default();
        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", defaults.max_pool_size),
            min_pool_size: env_or("PG_POOL_MIN", defaults.min_pool_size),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", defaults.connection_timeout_sec),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", defaults.idle_timeout_sec),
            max_retries: env_or("PG_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", defaults.retry_delay_ms),
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection(e.to_string()).with_context(
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get()?;
            conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
                RepositoryError::internal(format!("migration failed: {}", e))
                    .with_context(ErrorContext::new("run_migrations"))
            })?;
        }
        tracing::info!(max_pool_size = config.max_pool_size, "postgres repository ready");

        Ok(Self { pool, config })
    }

    /// Run `f` on a pooled connection in the blocking pool, retrying
    /// retryable failures with exponential backoff.
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;

        let result = task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2;
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::from(e).with_context(
                            ErrorContext::new("checkout")
                                .with_details(format!("attempt={}", attempt + 1)),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        return Err(err);
                    }
                };

                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        tracing::debug!(operation, attempt, error = %e, "retrying");
                        last_error = Some(e);
                    }
                    Err(e) => return Err(e),
                }
            }

            Err(last_error
                .unwrap_or_else(|| RepositoryError::internal("retries exhausted without an error")))
        })
        .await
        .map_err(|e| RepositoryError::internal(format!("blocking task failed: {}", e)))?;

        result.map_err(|e| e.with_operation(operation))
    }
}

// =========================================================================
// Row loading helpers
// =========================================================================

fn load_schedule(conn: &mut PgConnection, id: ScheduleId) -> RepositoryResult<Schedule> {
    let row = schedules::table
        .find(id.value())
        .select(ScheduleRow::as_select())
        .first::<ScheduleRow>(conn)
        .optional()?
        .ok_or_else(|| RepositoryError::missing(ScheduleId::ENTITY, id))?;

    let task_rows = tasks::table
        .filter(tasks::schedule_id.eq(row.id))
        .order(tasks::id.asc())
        .select(TaskRow::as_select())
        .load::<TaskRow>(conn)?;

    row.into_schedule(task_rows)
}

/// Attach tasks to a page of schedule rows with one extra query.
fn hydrate(conn: &mut PgConnection, rows: Vec<ScheduleRow>) -> RepositoryResult<Vec<Schedule>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut by_schedule: HashMap<i64, Vec<TaskRow>> = HashMap::new();
    if !ids.is_empty() {
        let task_rows = tasks::table
            .filter(tasks::schedule_id.eq_any(ids))
            .order(tasks::id.asc())
            .select(TaskRow::as_select())
            .load::<TaskRow>(conn)?;
        for t in task_rows {
            by_schedule.entry(t.schedule_id).or_default().push(t);
        }
    }

    rows.into_iter()
        .map(|r| {
            let tasks = by_schedule.remove(&r.id).unwrap_or_default();
            r.into_schedule(tasks)
        })
        .collect()
}

fn schedule_exists(conn: &mut PgConnection, id: ScheduleId) -> RepositoryResult<bool> {
    let found = schedules::table
        .find(id.value())
        .select(schedules::id)
        .first::<i64>(conn)
        .optional()?;
    Ok(found.is_some())
}

#[async_trait]
impl ScheduleRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn("health_check", |conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(RepositoryError::from)
        })
        .await
    }

    async fn create_schedule(
        &self,
        schedule: &NewSchedule,
        created_at: DateTime<Utc>,
    ) -> RepositoryResult<Schedule> {
        schedule.validate().map_err(RepositoryError::validation)?;
        let schedule = schedule.clone();

        self.with_conn("create_schedule", move |conn| {
            conn.transaction(|tx| {
                let row = NewScheduleRow {
                    user_id: schedule.user_id.value(),
                    client_name: &schedule.client_name,
                    location: &schedule.location,
                    shift_time: schedule.shift_time,
                    status: ScheduleStatus::Scheduled.as_str(),
                    created_at,
                };
                let inserted: ScheduleRow = diesel::insert_into(schedules::table)
                    .values(&row)
                    .returning(ScheduleRow::as_returning())
                    .get_result(tx)?;

                let id = ScheduleId::new(inserted.id);
                let task_rows: Vec<NewTaskRow> = schedule
                    .tasks
                    .iter()
                    .map(|t| NewTaskRow::new(id, t, created_at))
                    .collect();
                let tasks = if task_rows.is_empty() {
                    Vec::new()
                } else {
                    diesel::insert_into(tasks::table)
                        .values(&task_rows)
                        .returning(TaskRow::as_returning())
                        .get_results(tx)?
                };

                inserted.into_schedule(tasks)
            })
        })
        .await
    }

    async fn get_schedule(&self, schedule_id: ScheduleId) -> RepositoryResult<Schedule> {
        self.with_conn("get_schedule", move |conn| load_schedule(conn, schedule_id))
            .await
    }

    async fn list_schedules(&self, filter: &ScheduleFilter) -> RepositoryResult<Vec<Schedule>> {
        let filter = filter.clone();
        self.with_conn("list_schedules", move |conn| {
            let mut query = schedules::table
                .select(ScheduleRow::as_select())
                .into_boxed();

            if let Some(user_id) = filter.user_id {
                query = query.filter(schedules::user_id.eq(user_id.value()));
            }
            if let Some(from) = filter.shift_from {
                query = query.filter(schedules::shift_time.ge(from));
            }
            if let Some(until) = filter.shift_until {
                query = query.filter(schedules::shift_time.lt(until));
            }
            if !filter.statuses.is_empty() {
                let statuses: Vec<&str> = filter.statuses.iter().map(|s| s.as_str()).collect();
                query = query.filter(schedules::status.eq_any(statuses));
            }

            let rows = query
                .order((schedules::shift_time.asc(), schedules::id.asc()))
                .load::<ScheduleRow>(conn)?;

            hydrate(conn, rows)
        })
        .await
    }

    async fn apply_visit_update(
        &self,
        schedule_id: ScheduleId,
        update: VisitUpdate,
    ) -> RepositoryResult<Schedule> {
        self.with_conn("apply_visit_update", move |conn| {
            let target = schedules::table.find(schedule_id.value());
            let status = update.resulting_status().as_str();

            let changed = match update {
                VisitUpdate::ClockIn { at, coordinates } => diesel::update(target)
                    .set((
                        schedules::status.eq(status),
                        schedules::start_time.eq(Some(at)),
                        schedules::start_lat.eq(Some(coordinates.latitude)),
                        schedules::start_lon.eq(Some(coordinates.longitude)),
                    ))
                    .execute(conn)?,
                VisitUpdate::ClockOut { at, coordinates } => diesel::update(target)
                    .set((
                        schedules::status.eq(status),
                        schedules::end_time.eq(Some(at)),
                        schedules::end_lat.eq(Some(coordinates.latitude)),
                        schedules::end_lon.eq(Some(coordinates.longitude)),
                    ))
                    .execute(conn)?,
                VisitUpdate::CancelClockIn => diesel::update(target)
                    .set((
                        schedules::status.eq(status),
                        schedules::start_time.eq(None::<DateTime<Utc>>),
                        schedules::start_lat.eq(None::<f64>),
                        schedules::start_lon.eq(None::<f64>),
                    ))
                    .execute(conn)?,
            };

            if changed == 0 {
                return Err(RepositoryError::missing(ScheduleId::ENTITY, schedule_id));
            }
            load_schedule(conn, schedule_id)
        })
        .await
    }

    async fn mark_missed(&self, schedule_id: ScheduleId) -> RepositoryResult<bool> {
        self.with_conn("mark_missed", move |conn| {
            let from = vec![
                ScheduleStatus::Scheduled.as_str(),
                ScheduleStatus::InProgress.as_str(),
            ];
            let changed = diesel::update(
                schedules::table
                    .find(schedule_id.value())
                    .filter(schedules::status.eq_any(from)),
            )
            .set(schedules::status.eq(ScheduleStatus::Missed.as_str()))
            .execute(conn)?;

            if changed == 0 && !schedule_exists(conn, schedule_id)? {
                return Err(RepositoryError::missing(ScheduleId::ENTITY, schedule_id));
            }
            Ok(changed > 0)
        })
        .await
    }

    async fn delete_schedule(&self, schedule_id: ScheduleId) -> RepositoryResult<()> {
        self.with_conn("delete_schedule", move |conn| {
            let deleted =
                diesel::delete(schedules::table.find(schedule_id.value())).execute(conn)?;
            if deleted == 0 {
                return Err(RepositoryError::missing(ScheduleId::ENTITY, schedule_id));
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl TaskRepository for PostgresRepository {
    async fn assign_tasks(
        &self,
        schedule_id: ScheduleId,
        new_tasks: &[NewTask],
        created_at: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Task>> {
        for t in new_tasks {
            t.validate().map_err(RepositoryError::validation)?;
        }
        let new_tasks = new_tasks.to_vec();

        self.with_conn("assign_tasks", move |conn| {
            conn.transaction(|tx| {
                if !schedule_exists(tx, schedule_id)? {
                    return Err(RepositoryError::missing(ScheduleId::ENTITY, schedule_id));
                }
                let rows: Vec<NewTaskRow> = new_tasks
                    .iter()
                    .map(|t| NewTaskRow::new(schedule_id, t, created_at))
                    .collect();
                let inserted: Vec<TaskRow> = diesel::insert_into(tasks::table)
                    .values(&rows)
                    .returning(TaskRow::as_returning())
                    .get_results(tx)?;

                inserted.into_iter().map(TaskRow::into_task).collect()
            })
        })
        .await
    }

    async fn get_task(&self, task_id: TaskId) -> RepositoryResult<Task> {
        self.with_conn("get_task", move |conn| {
            tasks::table
                .find(task_id.value())
                .select(TaskRow::as_select())
                .first::<TaskRow>(conn)
                .optional()?
                .ok_or_else(|| RepositoryError::missing(TaskId::ENTITY, task_id))?
                .into_task()
        })
        .await
    }

    async fn update_task_status(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        reason: Option<String>,
        completed_at: Option<DateTime<Utc>>,
    ) -> RepositoryResult<Task> {
        self.with_conn("update_task_status", move |conn| {
            diesel::update(tasks::table.find(task_id.value()))
                .set((
                    tasks::status.eq(status.as_str()),
                    tasks::reason.eq(reason),
                    tasks::completed_at.eq(completed_at),
                ))
                .returning(TaskRow::as_returning())
                .get_result::<TaskRow>(conn)
                .optional()?
                .ok_or_else(|| RepositoryError::missing(TaskId::ENTITY, task_id))?
                .into_task()
        })
        .await
    }
}
