use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel instant used for `last` before any occurrence has fired, and
/// for `last_updated` when it has never been (re)computed.
///
/// Fixed at 1900-01-01T00:00:00Z, matching the convention this spec's
/// persisted-status record is drawn from.
pub fn never() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0).unwrap()
}

/// Durable per-timer record of the most recent occurrence, the expected
/// next occurrence, and when `next` was last (re)computed.
///
/// All three fields are UTC instants. Field names follow the
/// `last` / `next` / `last_updated` convention used throughout this
/// ecosystem's timer-trigger bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleStatus {
    pub last: DateTime<Utc>,
    pub next: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl ScheduleStatus {
    /// Build a status, asserting all three fields are UTC in spirit
    /// (the `DateTime<Utc>` type already guarantees this at the type
    /// level; this constructor exists so call sites read as an explicit
    /// assertion rather than a bare struct literal).
    pub fn new(last: DateTime<Utc>, next: DateTime<Utc>, last_updated: DateTime<Utc>) -> Self {
        Self {
            last,
            next,
            last_updated,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.last != never()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn never_is_fixed_sentinel() {
        assert_eq!(never(), Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn has_fired_false_before_first_occurrence() {
        let status = ScheduleStatus::new(
            never(),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(),
        );
        assert!(!status.has_fired());
    }

    #[test]
    fn has_fired_true_after_first_occurrence() {
        let status = ScheduleStatus::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        );
        assert!(status.has_fired());
    }

    #[test]
    fn serde_roundtrip() {
        let status = ScheduleStatus::new(
            never(),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        );
        let json = serde_json::to_string(&status).unwrap();
        let roundtripped: ScheduleStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(status, roundtripped);
    }
}
