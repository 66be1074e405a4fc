//! Parser for the `[d.]hh:mm:ss[.fff]` duration-string grammar used for
//! constant-interval schedule expressions (e.g. `"00:00:30"`,
//! `"1.00:00:00"` for one day, `"00:00:00.500"` for half a second).

use chrono::Duration as ChronoDuration;

use crate::error::TimerError;

pub fn parse_duration_string(text: &str) -> Result<ChronoDuration, TimerError> {
    let text = text.trim();
    let malformed = || {
        TimerError::Configuration(format!(
            "invalid duration string '{text}', expected '[d.]hh:mm:ss[.fff]'"
        ))
    };

    let (days_part, rest) = match text.split_once('.') {
        // A leading "d." only counts as a day prefix if the remainder still
        // contains the required "hh:mm:ss" colons; otherwise the dot
        // belongs to a fractional-seconds suffix instead.
        Some((days, rest)) if rest.contains(':') => (Some(days), rest),
        _ => (None, text),
    };

    let (hms_part, fraction_part) = match rest.split_once('.') {
        Some((hms, frac)) => (hms, Some(frac)),
        None => (rest, None),
    };

    let mut hms_fields = hms_part.split(':');
    let hours: i64 = hms_fields.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
    let minutes: i64 = hms_fields.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
    let seconds: i64 = hms_fields.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
    if hms_fields.next().is_some() {
        return Err(malformed());
    }

    let days: i64 = match days_part {
        Some(d) => d.parse().map_err(|_| malformed())?,
        None => 0,
    };

    let millis: i64 = match fraction_part {
        Some(f) => {
            if f.is_empty() || f.len() > 3 || !f.chars().all(|c| c.is_ascii_digit()) {
                return Err(malformed());
            }
            let padded = format!("{:0<3}", f);
            padded.parse().map_err(|_| malformed())?
        }
        None => 0,
    };

    Ok(ChronoDuration::days(days)
        + ChronoDuration::hours(hours)
        + ChronoDuration::minutes(minutes)
        + ChronoDuration::seconds(seconds)
        + ChronoDuration::milliseconds(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_hms() {
        let d = parse_duration_string("00:00:30").unwrap();
        assert_eq!(d, ChronoDuration::seconds(30));
    }

    #[test]
    fn hms_with_days_prefix() {
        let d = parse_duration_string("1.00:00:00").unwrap();
        assert_eq!(d, ChronoDuration::days(1));
    }

    #[test]
    fn hms_with_milliseconds_suffix() {
        let d = parse_duration_string("00:00:00.500").unwrap();
        assert_eq!(d, ChronoDuration::milliseconds(500));
    }

    #[test]
    fn hms_with_days_and_milliseconds() {
        let d = parse_duration_string("2.03:04:05.250").unwrap();
        assert_eq!(
            d,
            ChronoDuration::days(2)
                + ChronoDuration::hours(3)
                + ChronoDuration::minutes(4)
                + ChronoDuration::seconds(5)
                + ChronoDuration::milliseconds(250)
        );
    }

    #[test]
    fn short_fraction_is_right_padded() {
        let d = parse_duration_string("00:00:00.5").unwrap();
        assert_eq!(d, ChronoDuration::milliseconds(500));
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(parse_duration_string("00:30").is_err());
    }

    #[test]
    fn rejects_non_numeric() {
        assert!(parse_duration_string("aa:bb:cc").is_err());
    }

    #[test]
    fn rejects_too_many_fraction_digits() {
        assert!(parse_duration_string("00:00:00.1234").is_err());
    }
}
