use thiserror::Error;

/// Crate-wide error type.
///
/// Each variant corresponds to one of the error kinds named in the
/// scheduler's error handling design: configuration errors and
/// precondition violations are fatal and surface to the caller;
/// monitor and executor errors are contained by the timer listener and
/// never stop a timer from running.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// Invalid cron/duration expression, unknown time zone, or a
    /// non-positive constant period. Raised at construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Failure to read or write schedule status. The listener logs and
    /// proceeds as if monitoring were disabled for that fire.
    #[error("monitor error: {0}")]
    MonitorTransient(String),

    /// The user function threw or returned failure.
    #[error("executor error: {0}")]
    Executor(String),

    /// A non-UTC instant was passed to an API requiring UTC, or a
    /// negative count was passed to `next_n`. Indicates a programming
    /// error and is fatal.
    #[error("precondition violation: {0}")]
    Precondition(String),
}

impl From<std::io::Error> for TimerError {
    fn from(err: std::io::Error) -> Self {
        TimerError::MonitorTransient(err.to_string())
    }
}

impl From<serde_json::Error> for TimerError {
    fn from(err: serde_json::Error) -> Self {
        TimerError::MonitorTransient(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_display() {
        let err = TimerError::Configuration("bad cron".to_string());
        assert_eq!(err.to_string(), "configuration error: bad cron");
    }

    #[test]
    fn monitor_transient_display() {
        let err = TimerError::MonitorTransient("disk full".to_string());
        assert_eq!(err.to_string(), "monitor error: disk full");
    }

    #[test]
    fn executor_display() {
        let err = TimerError::Executor("panic in job".to_string());
        assert_eq!(err.to_string(), "executor error: panic in job");
    }

    #[test]
    fn precondition_display() {
        let err = TimerError::Precondition("non-utc instant".to_string());
        assert_eq!(err.to_string(), "precondition violation: non-utc instant");
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: TimerError = io_err.into();
        match err {
            TimerError::MonitorTransient(msg) => assert!(msg.contains("missing")),
            other => panic!("expected MonitorTransient, got {other:?}"),
        }
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<String>("not json").unwrap_err();
        let err: TimerError = json_err.into();
        assert!(matches!(err, TimerError::MonitorTransient(_)));
    }
}
