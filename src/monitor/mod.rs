mod json_file;
mod memory;

pub use json_file::JsonFileScheduleMonitor;
pub use memory::InMemoryScheduleMonitor;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::TimerError;
use crate::schedule::Schedule;
use crate::status::{never, ScheduleStatus};

/// Durable storage for per-timer `ScheduleStatus`. Implementors only
/// provide `get_status`/`update_status`; the past-due calculation is
/// shared logic (see `check_past_due` below), not a trait method, so
/// every monitor gets the same deterministic behavior for free.
#[async_trait]
pub trait ScheduleMonitor: Send + Sync {
    async fn get_status(&self, timer_name: &str) -> Result<Option<ScheduleStatus>, TimerError>;
    async fn update_status(&self, timer_name: &str, status: ScheduleStatus) -> Result<(), TimerError>;
}

/// Shared past-due algorithm, implemented once as a free function over an
/// abstract storage capability rather than duplicated per concrete
/// monitor.
///
/// Returns how far past due the timer is (`Duration::ZERO` if not past
/// due) and persists a refreshed status as a side effect, exactly as
/// described in the schedule monitor's past-due algorithm.
pub async fn check_past_due(
    monitor: &dyn ScheduleMonitor,
    timer_name: &str,
    now_utc: DateTime<Utc>,
    tz: Tz,
    schedule: &Schedule,
    last_status: Option<ScheduleStatus>,
) -> Result<std::time::Duration, TimerError> {
    let status = match last_status {
        None => {
            // Brand-new timer: seed status so it is never declared past
            // due on its first observation.
            let next_utc = schedule.next(now_utc, tz);
            let fresh = ScheduleStatus::new(never(), next_utc, now_utc);
            monitor.update_status(timer_name, fresh).await?;
            return Ok(std::time::Duration::ZERO);
        }
        Some(status) => status,
    };

    let (mut expected_next, mut last_updated_source) = if status.last != never() {
        (schedule.next(status.last, tz), status.last)
    } else if status.last_updated != never() {
        (schedule.next(status.last_updated, tz), status.last_updated)
    } else {
        (schedule.next(now_utc, tz), now_utc)
    };

    let schedule_changed = status.next != expected_next;
    if schedule_changed {
        if now_utc > expected_next {
            // The schedule definition changed in a way that would make the
            // new expectation look retroactively past due; recompute from
            // `now` instead so a schedule change never registers as a
            // missed occurrence.
            expected_next = schedule.next(now_utc, tz);
            last_updated_source = now_utc;
        }
        let refreshed = ScheduleStatus::new(never(), expected_next, last_updated_source);
        monitor.update_status(timer_name, refreshed).await?;
    }

    let recorded_next = if schedule_changed { expected_next } else { status.next };
    let past_due = now_utc.signed_duration_since(recorded_next);
    if past_due <= chrono::Duration::zero() {
        Ok(std::time::Duration::ZERO)
    } else {
        Ok(past_due.to_std().unwrap_or(std::time::Duration::ZERO))
    }
}
