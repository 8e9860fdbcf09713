//! Service layer: the visit lifecycle rules on top of the repository traits.
//!
//! Services never read global state. Everything they need (repository,
//! clock, settings) is passed in at construction time or per call.

pub mod admin;
pub mod clock;
pub mod error;
pub mod lifecycle;
pub mod tasks;


pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ServiceError, ServiceResult};
pub use lifecycle::{LifecycleSettings, Reconciliation, ScheduleLifecycle};
