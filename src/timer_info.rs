use chrono_tz::Tz;

use crate::schedule::Schedule;
use crate::status::ScheduleStatus;

/// Snapshot handed to a `TimerExecutor` on each fire: the schedule and
/// time zone the timer is running under, its persisted status (`None`
/// when monitoring is disabled), and whether this fire is a past-due
/// catch-up invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerInfo {
    pub schedule: Schedule,
    pub tz: Tz,
    pub status: Option<ScheduleStatus>,
    pub is_past_due: bool,
}

impl TimerInfo {
    pub fn new(schedule: Schedule, tz: Tz, status: Option<ScheduleStatus>, is_past_due: bool) -> Self {
        Self {
            schedule,
            tz,
            status,
            is_past_due,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::never;
    use chrono::{TimeZone, Utc};

    #[test]
    fn carries_past_due_flag() {
        let status = ScheduleStatus::new(never(), Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(), never());
        let schedule = Schedule::cron("0 0 * * * *").unwrap();
        let info = TimerInfo::new(schedule, chrono_tz::UTC, Some(status), true);
        assert!(info.is_past_due);
        assert_eq!(info.status, Some(status));
    }

    #[test]
    fn monitoring_disabled_has_no_status() {
        let schedule = Schedule::constant(chrono::Duration::minutes(5)).unwrap();
        let info = TimerInfo::new(schedule, chrono_tz::UTC, None, false);
        assert!(info.status.is_none());
        assert!(!info.is_past_due);
    }

    #[test]
    fn carries_schedule_and_tz() {
        let schedule = Schedule::cron("0 30 * * * *").unwrap();
        let tz: Tz = "America/Los_Angeles".parse().unwrap();
        let info = TimerInfo::new(schedule.clone(), tz, None, false);
        assert_eq!(info.schedule, schedule);
        assert_eq!(info.tz, tz);
    }
}
