//! Schedule entity, its lifecycle status and the caller-facing projection.

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::task::{NewTask, Task, TaskView};
use super::time::to_display;
use super::{ScheduleId, UserId};

pub const CLIENT_NAME_MAX_LEN: usize = 100;
pub const LOCATION_MAX_LEN: usize = 200;

/// Lifecycle state of a planned visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Missed,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Missed => "missed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "missed" => Some(Self::Missed),
            _ => None,
        }
    }

    /// States the missed reconciliation is allowed to move away from.
    pub fn can_become_missed(&self) -> bool {
        matches!(self, Self::Scheduled | Self::InProgress)
    }
}

impl std::fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// GPS fix reported at clock-in or clock-out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Latitude must lie in [-90, 90] and longitude in [-180, 180].
    pub fn validate(&self) -> Result<(), String> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!(
                "latitude {} is outside [-90, 90]",
                self.latitude
            ));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!(
                "longitude {} is outside [-180, 180]",
                self.longitude
            ));
        }
        Ok(())
    }
}

/// One planned caregiver visit as stored (all instants UTC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub user_id: UserId,
    pub client_name: String,
    pub location: String,
    pub shift_time: DateTime<Utc>,
    pub status: ScheduleStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub start_lat: Option<f64>,
    pub start_lon: Option<f64>,
    pub end_lat: Option<f64>,
    pub end_lon: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Schedule {
    /// Build the read projection in the caller's zone. Storage is untouched.
    pub fn to_view(&self, tz: Tz) -> ScheduleView {
        ScheduleView {
            id: self.id,
            user_id: self.user_id,
            client_name: self.client_name.clone(),
            location: self.location.clone(),
            shift_time: to_display(self.shift_time, tz),
            status: self.status,
            start_time: self.start_time.map(|t| to_display(t, tz)),
            end_time: self.end_time.map(|t| to_display(t, tz)),
            start_lat: self.start_lat,
            start_lon: self.start_lon,
            end_lat: self.end_lat,
            end_lon: self.end_lon,
            created_at: to_display(self.created_at, tz),
            tasks: self.tasks.iter().map(|t| t.to_view(tz)).collect(),
        }
    }
}

/// Schedule as returned to a caller, with every instant in their zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleView {
    pub id: ScheduleId,
    pub user_id: UserId,
    pub client_name: String,
    pub location: String,
    pub shift_time: DateTime<FixedOffset>,
    pub status: ScheduleStatus,
    pub start_time: Option<DateTime<FixedOffset>>,
    pub end_time: Option<DateTime<FixedOffset>>,
    pub start_lat: Option<f64>,
    pub start_lon: Option<f64>,
    pub end_lat: Option<f64>,
    pub end_lon: Option<f64>,
    pub created_at: DateTime<FixedOffset>,
    pub tasks: Vec<TaskView>,
}

/// Input for creating a schedule (admin action).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSchedule {
    pub user_id: UserId,
    pub client_name: String,
    pub location: String,
    pub shift_time: DateTime<Utc>,
    /// Tasks created together with the schedule in one atomic step.
    #[serde(default)]
    pub tasks: Vec<NewTask>,
}

impl NewSchedule {
    pub fn validate(&self) -> Result<(), String> {
        require_text("client_name", &self.client_name, CLIENT_NAME_MAX_LEN)?;
        require_text("location", &self.location, LOCATION_MAX_LEN)?;
        for task in &self.tasks {
            task.validate()?;
        }
        Ok(())
    }
}

pub(crate) fn require_text(field: &str, value: &str, max_len: usize) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field));
    }
    if value.chars().count() > max_len {
        return Err(format!("{} must be at most {} characters", field, max_len));
    }
    Ok(())
}

/// Column changes made by the visit operations.
///
/// Each variant fixes the resulting status together with the timestamp and
/// coordinate columns it owns, so the status/timestamp pairing stays in one place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisitUpdate {
    ClockIn {
        at: DateTime<Utc>,
        coordinates: Coordinates,
    },
    ClockOut {
        at: DateTime<Utc>,
        coordinates: Coordinates,
    },
    /// Unconditional reset to `scheduled`; `end_*` columns are left as they are.
    CancelClockIn,
}

impl VisitUpdate {
    pub fn resulting_status(&self) -> ScheduleStatus {
        match self {
            Self::ClockIn { .. } => ScheduleStatus::InProgress,
            Self::ClockOut { .. } => ScheduleStatus::Completed,
            Self::CancelClockIn => ScheduleStatus::Scheduled,
        }
    }

    pub fn apply(&self, schedule: &mut Schedule) {
        match *self {
            Self::ClockIn { at, coordinates } => {
                schedule.start_time = Some(at);
                schedule.start_lat = Some(coordinates.latitude);
                schedule.start_lon = Some(coordinates.longitude);
            }
            Self::ClockOut { at, coordinates } => {
                schedule.end_time = Some(at);
                schedule.end_lat = Some(coordinates.latitude);
                schedule.end_lon = Some(coordinates.longitude);
            }
            Self::CancelClockIn => {
                schedule.start_time = None;
                schedule.start_lat = None;
                schedule.start_lon = None;
            }
        }
        schedule.status = self.resulting_status();
    }
}
