//! Six-field cron schedule evaluation, including DST-aware mapping from
//! local civil time back to UTC.
//!
//! The field parser and the forward-stepping next-occurrence algorithm
//! are hand-written rather than delegated to `croner`: the DST handling
//! this spec requires (candidate-by-candidate enumeration of
//! unlocalized civil times, each individually checked against the time
//! zone for invalidity/ambiguity) needs control over *naive* candidate
//! generation that `croner::Cron::find_next_occurrence` does not
//! expose, since it only accepts and returns already-localized
//! `DateTime<Tz>` values. `croner` is still used — see `Cron::from_str`
//! below — purely to validate expression syntax at construction time.

use std::str::FromStr;

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, NaiveDateTime, Offset, TimeZone, Timelike};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::TimerError;

/// A parsed six-field cron expression (`sec min hour dom month dow`)
/// plus its original textual form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    text: String,
    seconds: u64,
    minutes: u64,
    hours: u32,
    days_of_month: u32,
    months: u16,
    days_of_week: u8,
    dom_is_wildcard: bool,
    dow_is_wildcard: bool,
}

/// The local civil time falls in the repeated hour of a fall-back
/// transition and following occurrences are less than four hours away —
/// both UTC interpretations of the occurrence are real candidates.
const FREQUENT_CUTOFF: ChronoDuration = ChronoDuration::hours(4);

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self, TimerError> {
        // Validate syntax with croner first so malformed expressions get a
        // familiar class of error message before we attempt our own parse.
        croner::Cron::from_str(expr)
            .map_err(|e| TimerError::Configuration(format!("invalid cron expression '{expr}': {e}")))?;

        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(TimerError::Configuration(format!(
                "cron expression '{expr}' must have exactly six fields (sec min hour dom month dow), found {}",
                fields.len()
            )));
        }

        let seconds = parse_field(fields[0], 0, 59, expr)?;
        let minutes = parse_field(fields[1], 0, 59, expr)?;
        let hours = parse_field(fields[2], 0, 23, expr)? as u32;
        let days_of_month = parse_field(fields[3], 1, 31, expr)? as u32;
        let months = parse_field(fields[4], 1, 12, expr)? as u16;
        let days_of_week = parse_dow_field(fields[5], expr)?;

        let schedule = Self {
            text: expr.to_string(),
            seconds,
            minutes,
            hours,
            days_of_month,
            months,
            days_of_week,
            dom_is_wildcard: fields[3].trim() == "*",
            dow_is_wildcard: fields[5].trim() == "*",
        };

        if !schedule.dom_month_combination_is_feasible() {
            return Err(TimerError::Configuration(format!(
                "cron expression '{expr}' restricts day-of-month to a day that never occurs in any of its permitted months"
            )));
        }

        Ok(schedule)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    fn second_matches(&self, value: u32) -> bool {
        self.seconds & (1u64 << value) != 0
    }

    fn minute_matches(&self, value: u32) -> bool {
        self.minutes & (1u64 << value) != 0
    }

    fn hour_matches(&self, value: u32) -> bool {
        self.hours & (1u32 << value) != 0
    }

    fn month_matches(&self, value: u32) -> bool {
        self.months & (1u16 << value) != 0
    }

    fn dom_matches(&self, value: u32) -> bool {
        self.days_of_month & (1u32 << value) != 0
    }

    fn dow_matches(&self, value: u32) -> bool {
        self.days_of_week & (1u8 << value) != 0
    }

    /// Whether the day-of-month restriction can ever be satisfied within
    /// the months this schedule permits.
    ///
    /// Only matters when day-of-week is a wildcard: per `day_matches`'s
    /// OR semantics, a restricted day-of-week field always becomes true
    /// on some ordinary calendar day regardless of day-of-month, so an
    /// infeasible day-of-month never strands `next_naive_after` in that
    /// case. When day-of-month is itself a wildcard there is nothing to
    /// check. Otherwise, a day-of-month restricted to a day that never
    /// occurs in any permitted month (e.g. the 31st in April, or the
    /// 30th in February) would make `next_naive_after` search forever.
    fn dom_month_combination_is_feasible(&self) -> bool {
        if self.dom_is_wildcard || !self.dow_is_wildcard {
            return true;
        }
        for month in 1..=12u32 {
            if !self.month_matches(month) {
                continue;
            }
            if (1..=max_days_in_month(month)).any(|day| self.dom_matches(day)) {
                return true;
            }
        }
        false
    }

    fn day_matches(&self, date: NaiveDate) -> bool {
        let dom_ok = self.dom_matches(date.day());
        let dow_ok = self.dow_matches(date.weekday().num_days_from_sunday());
        match (self.dom_is_wildcard, self.dow_is_wildcard) {
            (true, true) => true,
            (true, false) => dow_ok,
            (false, true) => dom_ok,
            // Standard cron semantics: when both day-of-month and
            // day-of-week are restricted, a day qualifies if either
            // field matches.
            (false, false) => dom_ok || dow_ok,
        }
    }

    /// Smallest cron-matching `NaiveDateTime` strictly greater than `after`.
    fn next_naive_after(&self, after: NaiveDateTime) -> NaiveDateTime {
        let mut t = after + ChronoDuration::seconds(1);
        let search_horizon_year = after.year() + 6;

        loop {
            if t.year() > search_horizon_year {
                panic!(
                    "cron schedule '{}' produced no occurrence within {} years of {}",
                    self.text, 6, after
                );
            }

            if !self.month_matches(t.month()) {
                t = start_of_next_month(t);
                continue;
            }
            if !self.day_matches(t.date()) {
                t = start_of_next_day(t);
                continue;
            }
            if !self.hour_matches(t.hour()) {
                t = start_of_next_hour(t);
                continue;
            }
            if !self.minute_matches(t.minute()) {
                t = start_of_next_minute(t);
                continue;
            }
            if !self.second_matches(t.second()) {
                t += ChronoDuration::seconds(1);
                continue;
            }
            return t;
        }
    }

    /// Next occurrence strictly after `now_utc`, evaluated in local civil
    /// time for `tz` and mapped back to UTC with explicit handling of
    /// DST-skipped and DST-repeated hours.
    pub fn next(&self, now_utc: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
        let now_local = now_utc.with_timezone(&tz);
        let mut search_from = now_local.naive_local();

        // If `now` itself falls on an ambiguous local instant, step back by
        // the DST delta so the cron stepper starts from an unambiguous,
        // strictly earlier point — otherwise it can emit a candidate that
        // lexicographically precedes `now_utc`.
        if let chrono::LocalResult::Ambiguous(earliest, latest) = tz.from_local_datetime(&search_from) {
            let delta = (earliest.offset().fix().local_minus_utc()
                - latest.offset().fix().local_minus_utc())
            .abs();
            search_from -= ChronoDuration::seconds(delta as i64);
        }

        let mut candidate = self.next_naive_after(search_from);
        let mut best: Option<DateTime<Utc>> = None;

        loop {
            match tz.from_local_datetime(&candidate) {
                chrono::LocalResult::None => {
                    // Skipped (spring-forward) hour: one hour of forward
                    // shift resolves every standard DST skip.
                    let shifted = candidate + ChronoDuration::hours(1);
                    if let Some(instant) = resolve_single_or_earliest(tz, shifted) {
                        consider(&mut best, instant, now_utc);
                    }
                    if best.is_some() {
                        return best.unwrap();
                    }
                }
                chrono::LocalResult::Single(dt) => {
                    consider(&mut best, dt.with_timezone(&Utc), now_utc);
                    if best.is_some() {
                        return best.unwrap();
                    }
                }
                chrono::LocalResult::Ambiguous(earliest, latest) => {
                    let following = self.next_naive_after(candidate);
                    let frequent = (following - candidate) < FREQUENT_CUTOFF;

                    consider(&mut best, earliest.with_timezone(&Utc), now_utc);
                    if frequent {
                        consider(&mut best, latest.with_timezone(&Utc), now_utc);
                    }
                    // Ambiguous candidates never terminate the search on
                    // their own: the following candidate must be examined
                    // before a result can be returned.
                }
            }

            candidate = self.next_naive_after(candidate);
        }
    }
}

fn consider(best: &mut Option<DateTime<Utc>>, instant: DateTime<Utc>, now_utc: DateTime<Utc>) {
    if instant > now_utc {
        *best = Some(match *best {
            Some(current) => current.min(instant),
            None => instant,
        });
    }
}

/// Resolve a shifted-forward local instant after a spring-forward skip.
/// Almost always `Single`; falls back to the earliest interpretation in
/// the vanishingly rare case the shift lands on another transition.
fn resolve_single_or_earliest(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        chrono::LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        chrono::LocalResult::None => None,
    }
}

/// Maximum day-of-month a given calendar month can ever reach. February
/// is counted as 29 since leap years recur at least every four years,
/// well within `next_naive_after`'s six-year search horizon.
fn max_days_in_month(month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => 29,
        _ => 31,
    }
}

fn start_of_next_month(t: NaiveDateTime) -> NaiveDateTime {
    let (year, month) = if t.month() == 12 {
        (t.year() + 1, 1)
    } else {
        (t.year(), t.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn start_of_next_day(t: NaiveDateTime) -> NaiveDateTime {
    (t.date() + ChronoDuration::days(1)).and_hms_opt(0, 0, 0).unwrap()
}

fn start_of_next_hour(t: NaiveDateTime) -> NaiveDateTime {
    let advanced = t + ChronoDuration::hours(1);
    advanced.date().and_hms_opt(advanced.hour(), 0, 0).unwrap()
}

fn start_of_next_minute(t: NaiveDateTime) -> NaiveDateTime {
    let advanced = t + ChronoDuration::minutes(1);
    advanced
        .date()
        .and_hms_opt(advanced.hour(), advanced.minute(), 0)
        .unwrap()
}

/// Parse one cron field (lists of wildcards/ranges/steps/singles) into a
/// bitset, where bit `n` set means value `n` is permitted.
fn parse_field(field: &str, min: u32, max: u32, original_expr: &str) -> Result<u64, TimerError> {
    let mut mask: u64 = 0;
    for item in field.split(',') {
        let item = item.trim();
        if item.is_empty() {
            return Err(invalid_field(original_expr, field));
        }

        let (range_part, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| invalid_field(original_expr, field))?;
                if step == 0 {
                    return Err(invalid_field(original_expr, field));
                }
                (range, step)
            }
            None => (item, 1),
        };

        let (lo, hi) = if range_part == "*" {
            (min, max)
        } else if let Some((lo, hi)) = range_part.split_once('-') {
            let lo: u32 = lo.parse().map_err(|_| invalid_field(original_expr, field))?;
            let hi: u32 = hi.parse().map_err(|_| invalid_field(original_expr, field))?;
            (lo, hi)
        } else {
            let value: u32 = range_part
                .parse()
                .map_err(|_| invalid_field(original_expr, field))?;
            (value, value)
        };

        if lo < min || hi > max || lo > hi {
            return Err(invalid_field(original_expr, field));
        }

        let mut v = lo;
        while v <= hi {
            mask |= 1u64 << v;
            v += step;
        }
    }
    Ok(mask)
}

/// Day-of-week accepts `0..=7` where both `0` and `7` mean Sunday.
fn parse_dow_field(field: &str, original_expr: &str) -> Result<u8, TimerError> {
    let mask = parse_field(field, 0, 7, original_expr)?;
    let mut result = (mask & 0x7F) as u8; // bits 0..=6
    if mask & (1 << 7) != 0 {
        result |= 1; // bit 7 (Sunday alias) folds into bit 0
    }
    Ok(result)
}

fn invalid_field(expr: &str, field: &str) -> TimerError {
    TimerError::Configuration(format!("invalid cron field '{field}' in expression '{expr}'"))
}
