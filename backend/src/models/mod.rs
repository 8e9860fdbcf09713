//! Domain model for caregiver visits.
//!
//! Everything stored here is UTC. Conversion into a caller's timezone happens
//! only when a read projection is built (see [`time`] and [`ScheduleView`]).

pub mod identity;
pub mod macros;
pub mod schedule;
pub mod task;
pub mod time;

crate::define_id_type!(i64, UserId, "user");
crate::define_id_type!(i64, ScheduleId, "schedule");
crate::define_id_type!(i64, TaskId, "task");

pub use identity::{Caller, Role};
pub use schedule::{
    Coordinates, NewSchedule, Schedule, ScheduleStatus, ScheduleView, VisitUpdate,
};
pub use task::{NewTask, Task, TaskStatus, TaskStatusUpdate, TaskView};
pub use time::{local_day_bounds, resolve_timezone, to_display, LocalDay};
