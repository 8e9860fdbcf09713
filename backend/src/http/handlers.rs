//! HTTP request handlers.
//!
//! Handlers stay thin: extract the caller and zone, call one service
//! operation, wrap the result. All validation and authorization lives in
//! the service layer.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use super::dto::*;
use super::error::AppError;
use super::extract::{ApiJson, ApiPath};
use super::identity::RequestTimeZone;
use super::state::AppState;
use crate::models::{Caller, NewSchedule, ScheduleId, ScheduleView, TaskId, TaskStatusUpdate};
use crate::services::{admin, tasks};

/// Result type for handlers
pub type HandlerResult<T> = Result<Json<T>, AppError>;

type Created<T> = Result<(StatusCode, Json<T>), AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Health check endpoint to verify the service is running and storage is reachable.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match state.repository.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Admin
// =============================================================================

/// POST /v1/admin/schedules
pub async fn create_schedule(
    State(state): State<AppState>,
    caller: Caller,
    RequestTimeZone(tz): RequestTimeZone,
    ApiJson(request): ApiJson<NewSchedule>,
) -> Created<ScheduleResponse> {
    let schedule = admin::create_schedule(
        state.repository.as_ref(),
        &caller,
        &request,
        state.clock.now(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ScheduleResponse {
            message: format!("schedule {} created", schedule.id),
            schedule: schedule.to_view(tz),
        }),
    ))
}

/// DELETE /v1/admin/schedules/{schedule_id}
pub async fn delete_schedule(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(schedule_id): ApiPath<i64>,
) -> HandlerResult<MessageResponse> {
    let schedule_id = ScheduleId::new(schedule_id);
    admin::delete_schedule(state.repository.as_ref(), &caller, schedule_id).await?;
    Ok(Json(MessageResponse {
        message: format!("schedule {} deleted", schedule_id),
    }))
}

/// POST /v1/admin/schedules/{schedule_id}/tasks
pub async fn assign_tasks(
    State(state): State<AppState>,
    caller: Caller,
    RequestTimeZone(tz): RequestTimeZone,
    ApiPath(schedule_id): ApiPath<i64>,
    ApiJson(request): ApiJson<AssignTasksRequest>,
) -> Created<TasksResponse> {
    let schedule_id = ScheduleId::new(schedule_id);
    let created = admin::assign_tasks(
        state.repository.as_ref(),
        &caller,
        schedule_id,
        &request.tasks,
        state.clock.now(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(TasksResponse {
            message: format!("{} tasks assigned to schedule {}", created.len(), schedule_id),
            tasks: created.iter().map(|t| t.to_view(tz)).collect(),
        }),
    ))
}

// =============================================================================
// Schedule queries
// =============================================================================

/// GET /v1/schedules
pub async fn list_schedules(
    State(state): State<AppState>,
    caller: Caller,
    RequestTimeZone(tz): RequestTimeZone,
) -> HandlerResult<ScheduleListResponse> {
    let views = state.lifecycle.all_schedules(&caller, tz).await?;
    Ok(Json(views.into()))
}

/// GET /v1/schedules/today
pub async fn today_schedules(
    State(state): State<AppState>,
    caller: Caller,
    RequestTimeZone(tz): RequestTimeZone,
) -> HandlerResult<ScheduleListResponse> {
    let views = state.lifecycle.today_schedules(&caller, tz).await?;
    Ok(Json(views.into()))
}

/// GET /v1/schedules/upcoming
pub async fn upcoming_schedules(
    State(state): State<AppState>,
    caller: Caller,
    RequestTimeZone(tz): RequestTimeZone,
) -> HandlerResult<ScheduleListResponse> {
    let views = state.lifecycle.upcoming_schedules(&caller, tz).await?;
    Ok(Json(views.into()))
}

/// GET /v1/schedules/missed
///
/// Persists `missed` for overdue visits before answering.
pub async fn missed_schedules(
    State(state): State<AppState>,
    caller: Caller,
    RequestTimeZone(tz): RequestTimeZone,
) -> HandlerResult<ScheduleListResponse> {
    let views = state.lifecycle.missed_schedules(&caller, tz).await?;
    Ok(Json(views.into()))
}

/// GET /v1/schedules/completed/today
pub async fn completed_today(
    State(state): State<AppState>,
    caller: Caller,
    RequestTimeZone(tz): RequestTimeZone,
) -> HandlerResult<ScheduleListResponse> {
    let views = state.lifecycle.completed_today(&caller, tz).await?;
    Ok(Json(views.into()))
}

/// GET /v1/schedules/{schedule_id}
pub async fn get_schedule(
    State(state): State<AppState>,
    caller: Caller,
    RequestTimeZone(tz): RequestTimeZone,
    ApiPath(schedule_id): ApiPath<i64>,
) -> HandlerResult<ScheduleView> {
    let view = state
        .lifecycle
        .schedule_detail(&caller, ScheduleId::new(schedule_id), tz)
        .await?;
    Ok(Json(view))
}

// =============================================================================
// Visit transitions
// =============================================================================

/// POST /v1/schedules/{schedule_id}/start
pub async fn start_visit(
    State(state): State<AppState>,
    caller: Caller,
    RequestTimeZone(tz): RequestTimeZone,
    ApiPath(schedule_id): ApiPath<i64>,
    ApiJson(position): ApiJson<CoordinatesRequest>,
) -> HandlerResult<ScheduleResponse> {
    let schedule = state
        .lifecycle
        .clock_in(&caller, ScheduleId::new(schedule_id), position.into())
        .await?;
    Ok(Json(ScheduleResponse {
        message: "visit started".to_string(),
        schedule: schedule.to_view(tz),
    }))
}

/// POST /v1/schedules/{schedule_id}/end
pub async fn end_visit(
    State(state): State<AppState>,
    caller: Caller,
    RequestTimeZone(tz): RequestTimeZone,
    ApiPath(schedule_id): ApiPath<i64>,
    ApiJson(position): ApiJson<CoordinatesRequest>,
) -> HandlerResult<ScheduleResponse> {
    let schedule = state
        .lifecycle
        .clock_out(&caller, ScheduleId::new(schedule_id), position.into())
        .await?;
    Ok(Json(ScheduleResponse {
        message: "visit ended".to_string(),
        schedule: schedule.to_view(tz),
    }))
}

/// POST /v1/schedules/{schedule_id}/cancel-start
pub async fn cancel_start(
    State(state): State<AppState>,
    caller: Caller,
    RequestTimeZone(tz): RequestTimeZone,
    ApiPath(schedule_id): ApiPath<i64>,
) -> HandlerResult<ScheduleResponse> {
    let schedule = state
        .lifecycle
        .cancel_clock_in(&caller, ScheduleId::new(schedule_id))
        .await?;
    Ok(Json(ScheduleResponse {
        message: "clock-in cancelled".to_string(),
        schedule: schedule.to_view(tz),
    }))
}

// =============================================================================
// Tasks
// =============================================================================

/// PUT /v1/tasks/{task_id}/status
pub async fn update_task_status(
    State(state): State<AppState>,
    caller: Caller,
    RequestTimeZone(tz): RequestTimeZone,
    ApiPath(task_id): ApiPath<i64>,
    ApiJson(request): ApiJson<TaskStatusUpdate>,
) -> HandlerResult<TaskResponse> {
    let task = tasks::update_task_status(
        state.repository.as_ref(),
        &caller,
        TaskId::new(task_id),
        &request,
        state.clock.now(),
    )
    .await?;
    Ok(Json(TaskResponse {
        message: format!("task {} marked {}", task.id, task.status),
        task: task.to_view(tz),
    }))
}
