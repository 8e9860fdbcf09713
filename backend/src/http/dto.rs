//! Data Transfer Objects for the HTTP API.
//!
//! Request bodies that map one-to-one onto a domain input (`NewSchedule`,
//! `TaskStatusUpdate`) are deserialized straight into the model type.

use serde::{Deserialize, Serialize};

use crate::models::{Coordinates, NewTask, ScheduleView, TaskView};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,
    /// Version of the API
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Schedule list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleListResponse {
    /// Schedules, times rendered in the caller's zone
    pub schedules: Vec<ScheduleView>,
    /// Total count
    pub total: usize,
}

impl From<Vec<ScheduleView>> for ScheduleListResponse {
    fn from(schedules: Vec<ScheduleView>) -> Self {
        let total = schedules.len();
        Self { schedules, total }
    }
}

/// Position reported at clock-in or clock-out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CoordinatesRequest {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<CoordinatesRequest> for Coordinates {
    fn from(req: CoordinatesRequest) -> Self {
        Coordinates::new(req.latitude, req.longitude)
    }
}

/// A schedule wrapped with a short outcome message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub message: String,
    pub schedule: ScheduleView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignTasksRequest {
    pub tasks: Vec<NewTask>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksResponse {
    pub message: String,
    pub tasks: Vec<TaskView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub message: String,
    pub task: TaskView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
