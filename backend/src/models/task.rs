//! Units of work attached to a schedule.

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::schedule::require_text;
use super::time::to_display;
use super::{ScheduleId, TaskId};

pub const DESCRIPTION_MAX_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Completed,
    #[default]
    NotCompleted,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::NotCompleted => "not_completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "not_completed" => Some(Self::NotCompleted),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub schedule_id: ScheduleId,
    pub description: String,
    pub status: TaskStatus,
    pub reason: Option<String>,
    /// Set iff `status == Completed`.
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn to_view(&self, tz: Tz) -> TaskView {
        TaskView {
            id: self.id,
            schedule_id: self.schedule_id,
            description: self.description.clone(),
            status: self.status,
            reason: self.reason.clone(),
            completed_at: self.completed_at.map(|t| to_display(t, tz)),
            created_at: to_display(self.created_at, tz),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: TaskId,
    pub schedule_id: ScheduleId,
    pub description: String,
    pub status: TaskStatus,
    pub reason: Option<String>,
    pub completed_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub description: String,
}

impl NewTask {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        require_text("description", &self.description, DESCRIPTION_MAX_LEN)
    }
}

/// Caregiver-reported outcome for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatusUpdate {
    pub status: TaskStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

impl TaskStatusUpdate {
    /// A task left undone must say why.
    pub fn validate(&self) -> Result<(), String> {
        if self.status == TaskStatus::NotCompleted
            && self.reason.as_deref().map_or(true, |r| r.trim().is_empty())
        {
            return Err("reason is required when status is not_completed".to_string());
        }
        Ok(())
    }

    /// Completion timestamp to persist alongside this update.
    pub fn completed_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.status {
            TaskStatus::Completed => Some(now),
            TaskStatus::NotCompleted => None,
        }
    }

    /// Reason to persist; blank strings are stored as absent.
    pub fn normalized_reason(&self) -> Option<String> {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
    }
}
