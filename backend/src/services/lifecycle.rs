//! Schedule lifecycle engine.
//!
//! Owns the visit state machine (clock-in, clock-out, cancel) and the
//! caller-relative queries. Every query works on the caller's local day,
//! computed from their timezone, and returns display-converted projections.
//!
//! The missed query is not a pure read: it first runs [`ScheduleLifecycle::reconcile_missed`],
//! which persists `scheduled|in_progress -> missed` for overdue visits. The
//! transition is a conditional update, so running it repeatedly or
//! concurrently is harmless.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::error::{ServiceError, ServiceResult};
use crate::db::{FullRepository, ScheduleFilter};
use crate::models::{
    local_day_bounds, Caller, Coordinates, LocalDay, Schedule, ScheduleId, ScheduleStatus,
    ScheduleView, VisitUpdate,
};

pub const DEFAULT_GRACE_PERIOD_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// How long past `shift_time` a visit may go unfinished before it is missed.
    pub grace_period: Duration,
}

impl LifecycleSettings {
    pub fn with_grace_minutes(minutes: i64) -> Self {
        Self {
            grace_period: Duration::minutes(minutes),
        }
    }
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self::with_grace_minutes(DEFAULT_GRACE_PERIOD_MINUTES)
    }
}

/// Outcome of one missed-schedule reconciliation.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// The caller's local day the reconciliation covered.
    pub day: LocalDay,
    /// Visits with `shift_time` before this instant were eligible.
    pub cutoff: DateTime<Utc>,
    /// Every overdue visit of the day, including ones already `missed`.
    pub candidates: Vec<Schedule>,
    /// Records moved to `missed` by this run.
    pub transitioned: usize,
    /// Records whose update failed; they are returned with their old status.
    pub failed: usize,
}

#[derive(Clone)]
pub struct ScheduleLifecycle {
    repository: Arc<dyn FullRepository>,
    clock: Arc<dyn Clock>,
    settings: LifecycleSettings,
}

fn project(schedules: &[Schedule], tz: Tz) -> Vec<ScheduleView> {
    schedules.iter().map(|s| s.to_view(tz)).collect()
}

impl ScheduleLifecycle {
    pub fn new(
        repository: Arc<dyn FullRepository>,
        clock: Arc<dyn Clock>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            repository,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> LifecycleSettings {
        self.settings
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Load a schedule and check the caller owns it.
    ///
    /// Existence is checked before ownership, so a foreign id reports
    /// `Forbidden` and an unknown id `NotFound`.
    pub async fn owned_schedule(
        &self,
        caller: &Caller,
        schedule_id: ScheduleId,
    ) -> ServiceResult<Schedule> {
        let schedule = self.repository.get_schedule(schedule_id).await?;
        if !caller.owns(schedule.user_id) {
            return Err(ServiceError::forbidden(format!(
                "schedule {} does not belong to user {}",
                schedule_id, caller.user_id
            )));
        }
        Ok(schedule)
    }

    // =========================================================================
    // Visit transitions
    // =========================================================================

    /// Start a visit: `-> in_progress`, records `start_time` and position.
    ///
    /// A visit with no tasks assigned cannot be started.
    pub async fn clock_in(
        &self,
        caller: &Caller,
        schedule_id: ScheduleId,
        coordinates: Coordinates,
    ) -> ServiceResult<Schedule> {
        let schedule = self.owned_schedule(caller, schedule_id).await?;
        coordinates.validate().map_err(ServiceError::invalid)?;
        if schedule.tasks.is_empty() {
            return Err(ServiceError::invalid(format!(
                "schedule {} has no tasks assigned; a visit cannot start without tasks",
                schedule_id
            )));
        }

        let at = self.clock.now();
        let updated = self
            .repository
            .apply_visit_update(schedule_id, VisitUpdate::ClockIn { at, coordinates })
            .await?;
        info!(schedule_id = %schedule_id, user_id = %caller.user_id, from = %schedule.status, "visit started");
        Ok(updated)
    }

    /// End a visit: `-> completed`, records `end_time` and position.
    pub async fn clock_out(
        &self,
        caller: &Caller,
        schedule_id: ScheduleId,
        coordinates: Coordinates,
    ) -> ServiceResult<Schedule> {
        let schedule = self.owned_schedule(caller, schedule_id).await?;
        coordinates.validate().map_err(ServiceError::invalid)?;

        let at = self.clock.now();
        let updated = self
            .repository
            .apply_visit_update(schedule_id, VisitUpdate::ClockOut { at, coordinates })
            .await?;
        info!(schedule_id = %schedule_id, user_id = %caller.user_id, from = %schedule.status, "visit ended");
        Ok(updated)
    }

    /// Undo a clock-in: `-> scheduled`, clears the start fields.
    ///
    /// The reset is unconditional. Cancelling a completed visit reopens it
    /// and leaves its `end_*` fields populated.
    pub async fn cancel_clock_in(
        &self,
        caller: &Caller,
        schedule_id: ScheduleId,
    ) -> ServiceResult<Schedule> {
        let schedule = self.owned_schedule(caller, schedule_id).await?;
        if schedule.status != ScheduleStatus::InProgress {
            warn!(
                schedule_id = %schedule_id,
                status = %schedule.status,
                "cancelling clock-in of a visit that is not in progress"
            );
        }

        let updated = self
            .repository
            .apply_visit_update(schedule_id, VisitUpdate::CancelClockIn)
            .await?;
        info!(schedule_id = %schedule_id, user_id = %caller.user_id, "clock-in cancelled");
        Ok(updated)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn schedule_detail(
        &self,
        caller: &Caller,
        schedule_id: ScheduleId,
        tz: Tz,
    ) -> ServiceResult<ScheduleView> {
        let schedule = self.owned_schedule(caller, schedule_id).await?;
        Ok(schedule.to_view(tz))
    }

    pub async fn all_schedules(&self, caller: &Caller, tz: Tz) -> ServiceResult<Vec<ScheduleView>> {
        let schedules = self
            .repository
            .list_schedules(&ScheduleFilter::for_user(caller.user_id))
            .await?;
        debug!(user_id = %caller.user_id, count = schedules.len(), "all schedules");
        Ok(project(&schedules, tz))
    }

    /// Schedules whose `shift_time` falls within the caller's local day.
    pub async fn today_schedules(
        &self,
        caller: &Caller,
        tz: Tz,
    ) -> ServiceResult<Vec<ScheduleView>> {
        let day = local_day_bounds(self.clock.now(), tz);
        let filter = ScheduleFilter::for_user(caller.user_id)
            .shift_from(day.start_utc)
            .shift_until(day.end_utc);
        let schedules = self.repository.list_schedules(&filter).await?;
        debug!(user_id = %caller.user_id, date = %day.date, tz = %tz, count = schedules.len(), "today's schedules");
        Ok(project(&schedules, tz))
    }

    /// Still-`scheduled` visits from now on. The boundary is the absolute
    /// current instant, not a local-day boundary.
    pub async fn upcoming_schedules(
        &self,
        caller: &Caller,
        tz: Tz,
    ) -> ServiceResult<Vec<ScheduleView>> {
        let filter = ScheduleFilter::for_user(caller.user_id)
            .shift_from(self.clock.now())
            .with_statuses(&[ScheduleStatus::Scheduled]);
        let schedules = self.repository.list_schedules(&filter).await?;
        debug!(user_id = %caller.user_id, count = schedules.len(), "upcoming schedules");
        Ok(project(&schedules, tz))
    }

    pub async fn completed_today(
        &self,
        caller: &Caller,
        tz: Tz,
    ) -> ServiceResult<Vec<ScheduleView>> {
        let day = local_day_bounds(self.clock.now(), tz);
        let filter = ScheduleFilter::for_user(caller.user_id)
            .shift_from(day.start_utc)
            .shift_until(day.end_utc)
            .with_statuses(&[ScheduleStatus::Completed]);
        let schedules = self.repository.list_schedules(&filter).await?;
        debug!(user_id = %caller.user_id, date = %day.date, count = schedules.len(), "completed today");
        Ok(project(&schedules, tz))
    }

    /// Move the caller's overdue visits of today to `missed`.
    ///
    /// A visit is overdue when its `shift_time` lies in the caller's local
    /// day, before `now - grace_period`, and it is still `scheduled` or
    /// `in_progress`. Already-missed visits are part of the candidate set
    /// but are not written again. A failed update is logged and counted;
    /// it never fails the reconciliation.
    pub async fn reconcile_missed(&self, caller: &Caller, tz: Tz) -> ServiceResult<Reconciliation> {
        let now = self.clock.now();
        let day = local_day_bounds(now, tz);
        let cutoff = now - self.settings.grace_period;
        let until = day.end_utc.min(cutoff);

        let filter = ScheduleFilter::for_user(caller.user_id)
            .shift_from(day.start_utc)
            .shift_until(until)
            .with_statuses(&[
                ScheduleStatus::Scheduled,
                ScheduleStatus::InProgress,
                ScheduleStatus::Missed,
            ]);
        let found = self.repository.list_schedules(&filter).await?;

        let mut candidates = Vec::with_capacity(found.len());
        let mut transitioned = 0;
        let mut failed = 0;

        for mut schedule in found {
            if schedule.status == ScheduleStatus::Missed {
                candidates.push(schedule);
                continue;
            }

            match self.repository.mark_missed(schedule.id).await {
                Ok(true) => {
                    info!(schedule_id = %schedule.id, from = %schedule.status, "visit marked missed");
                    schedule.status = ScheduleStatus::Missed;
                    transitioned += 1;
                    candidates.push(schedule);
                }
                Ok(false) => {
                    // Changed underneath us (clock-out or a concurrent reconcile).
                    match self.repository.get_schedule(schedule.id).await {
                        Ok(current) if current.status == ScheduleStatus::Missed => {
                            candidates.push(current)
                        }
                        Ok(current) => {
                            debug!(schedule_id = %current.id, status = %current.status, "no longer overdue");
                        }
                        Err(e) => {
                            warn!(schedule_id = %schedule.id, error = %e, "failed to reload schedule");
                            failed += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!(schedule_id = %schedule.id, error = %e, "failed to mark visit missed");
                    failed += 1;
                    candidates.push(schedule);
                }
            }
        }

        debug!(
            user_id = %caller.user_id,
            date = %day.date,
            candidates = candidates.len(),
            transitioned,
            failed,
            "missed reconciliation"
        );

        Ok(Reconciliation {
            day,
            cutoff,
            candidates,
            transitioned,
            failed,
        })
    }

    /// Reconcile, then return the overdue visits in the caller's zone.
    pub async fn missed_schedules(
        &self,
        caller: &Caller,
        tz: Tz,
    ) -> ServiceResult<Vec<ScheduleView>> {
        let reconciliation = self.reconcile_missed(caller, tz).await?;
        Ok(project(&reconciliation.candidates, tz))
    }
}
