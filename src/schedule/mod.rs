mod constant;
mod cron;
mod duration_str;

pub use constant::ConstantSchedule;
pub use cron::CronSchedule;
pub use duration_str::parse_duration_string;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::TimerError;

/// A recurring schedule: either a six-field cron expression evaluated in
/// a named civil time zone, or a constant interval.
///
/// Closed tagged variant dispatched through a single `next` capability,
/// per the design note preferring this over an open trait-object
/// hierarchy for a fixed, two-member strategy set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    Cron(CronSchedule),
    Constant(ConstantSchedule),
}

impl Schedule {
    /// Parse a schedule expression. A duration string
    /// (`[d.]hh:mm:ss[.fff]`) is tried first; if that fails to parse, the
    /// text is parsed as a six-field cron expression.
    pub fn parse(expr: &str) -> Result<Self, TimerError> {
        if let Ok(period) = parse_duration_string(expr) {
            return Ok(Schedule::Constant(ConstantSchedule::new(period)?));
        }
        Ok(Schedule::Cron(CronSchedule::parse(expr)?))
    }

    pub fn cron(expr: &str) -> Result<Self, TimerError> {
        Ok(Schedule::Cron(CronSchedule::parse(expr)?))
    }

    pub fn constant(period: chrono::Duration) -> Result<Self, TimerError> {
        Ok(Schedule::Constant(ConstantSchedule::new(period)?))
    }

    /// Next occurrence strictly after `now_utc`. `tz` is ignored for a
    /// constant schedule.
    pub fn next(&self, now_utc: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
        match self {
            Schedule::Cron(cron) => cron.next(now_utc, tz),
            Schedule::Constant(constant) => constant.next(now_utc),
        }
    }

    /// `count` successive applications of `next`, each fed the prior
    /// result. `count == 0` returns an empty vector; a negative count is
    /// not representable (the parameter is unsigned) and is instead
    /// rejected by `TimerListener` call sites that accept a signed count
    /// from configuration.
    pub fn next_n(&self, count: usize, now_utc: DateTime<Utc>, tz: Tz) -> Vec<DateTime<Utc>> {
        let mut results = Vec::with_capacity(count);
        let mut cursor = now_utc;
        for _ in 0..count {
            cursor = self.next(cursor, tz);
            results.push(cursor);
        }
        results
    }

    /// Whether this schedule is dense enough that per-timer durable
    /// monitoring should be skipped by default: more than one occurrence
    /// per minute for a cron schedule, or a constant period under one
    /// minute.
    pub fn fires_more_than_once_per_minute(&self) -> bool {
        match self {
            Schedule::Constant(constant) => constant.period() < chrono::Duration::minutes(1),
            Schedule::Cron(cron) => {
                // Probe: two successive occurrences from an arbitrary
                // anchor less than 60 seconds apart indicate sub-minute
                // density.
                let anchor = crate::status::never();
                let first = cron.next(anchor, chrono_tz::UTC);
                let second = cron.next(first, chrono_tz::UTC);
                (second - first) < chrono::Duration::seconds(60)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_prefers_duration_string() {
        let schedule = Schedule::parse("00:00:30").unwrap();
        assert!(matches!(schedule, Schedule::Constant(_)));
    }

    #[test]
    fn parse_falls_back_to_cron() {
        let schedule = Schedule::parse("0 */5 * * * *").unwrap();
        assert!(matches!(schedule, Schedule::Cron(_)));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Schedule::parse("definitely not valid").is_err());
    }

    #[test]
    fn next_n_matches_successive_next_calls() {
        let schedule = Schedule::constant(chrono::Duration::minutes(1)).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let via_next_n = schedule.next_n(3, now, chrono_tz::UTC);

        let mut cursor = now;
        let mut manual = Vec::new();
        for _ in 0..3 {
            cursor = schedule.next(cursor, chrono_tz::UTC);
            manual.push(cursor);
        }
        assert_eq!(via_next_n, manual);
    }

    #[test]
    fn next_n_zero_is_empty() {
        let schedule = Schedule::constant(chrono::Duration::minutes(1)).unwrap();
        let now = Utc::now();
        assert!(schedule.next_n(0, now, chrono_tz::UTC).is_empty());
    }

    #[test]
    fn dense_cron_schedule_is_flagged() {
        let schedule = Schedule::cron("*/5 * * * * *").unwrap();
        assert!(schedule.fires_more_than_once_per_minute());
    }

    #[test]
    fn sparse_cron_schedule_is_not_flagged() {
        let schedule = Schedule::cron("0 0 0 * * *").unwrap();
        assert!(!schedule.fires_more_than_once_per_minute());
    }

    #[test]
    fn sub_minute_constant_schedule_is_flagged() {
        let schedule = Schedule::constant(chrono::Duration::seconds(30)).unwrap();
        assert!(schedule.fires_more_than_once_per_minute());
    }

    #[test]
    fn minute_plus_constant_schedule_is_not_flagged() {
        let schedule = Schedule::constant(chrono::Duration::minutes(5)).unwrap();
        assert!(!schedule.fires_more_than_once_per_minute());
    }
}
