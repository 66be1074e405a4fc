//! Durable timer-trigger scheduler core: a schedule evaluator with
//! DST-aware cron semantics, a persisted schedule monitor with a
//! past-due algorithm, and a per-timer listener state machine that
//! arms, fires, and cleanly stops.

pub mod cancellation;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod listener;
pub mod monitor;
pub mod schedule;
pub mod status;
pub mod timer_info;

pub use cancellation::CancellationToken;
pub use clock::{Clock, FakeClock, SystemClock};
pub use error::TimerError;
pub use listener::{ListenerState, TimerExecutor, TimerListener, TimerListenerOptions, MAX_TIMER_INTERVAL, SKEW_TOLERANCE};
pub use monitor::{check_past_due, InMemoryScheduleMonitor, JsonFileScheduleMonitor, ScheduleMonitor};
pub use schedule::{ConstantSchedule, CronSchedule, Schedule};
pub use status::{never, ScheduleStatus};
pub use timer_info::TimerInfo;
