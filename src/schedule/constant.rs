use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::error::TimerError;

/// A fixed, strictly-positive recurring period. Independent of time
/// zone: `next(now, _) == now + period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantSchedule {
    period: ChronoDuration,
}

impl ConstantSchedule {
    pub fn new(period: ChronoDuration) -> Result<Self, TimerError> {
        if period <= ChronoDuration::zero() {
            return Err(TimerError::Configuration(format!(
                "constant schedule period must be strictly positive, got {period}"
            )));
        }
        Ok(Self { period })
    }

    pub fn period(&self) -> ChronoDuration {
        self.period
    }

    pub fn next(&self, now_utc: DateTime<Utc>) -> DateTime<Utc> {
        now_utc + self.period
    }
}
