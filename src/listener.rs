//! `TimerListener`: the per-timer state machine that arms a platform
//! timer, invokes a user-supplied executor on each occurrence, and keeps
//! a `ScheduleMonitor` in sync across restarts.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::cancellation::CancellationToken;
use crate::clock::Clock;
use crate::error::TimerError;
use crate::monitor::{check_past_due, ScheduleMonitor};
use crate::schedule::Schedule;
use crate::status::ScheduleStatus;
use crate::timer_info::TimerInfo;

/// Upper bound for a single arming of the platform timer: `i32::MAX`
/// milliseconds, ~24.8 days. Intervals longer than this are split across
/// successive re-arms that carry the remaining time forward without
/// invoking the executor until it is exhausted.
pub const MAX_TIMER_INTERVAL: StdDuration = StdDuration::from_millis(i32::MAX as u64);

/// Tolerance for a platform timer firing early due to clock skew.
pub const SKEW_TOLERANCE: ChronoDuration = ChronoDuration::milliseconds(5);

/// User-supplied callback invoked on each occurrence.
///
/// The listener ignores the returned `Result` for scheduling purposes —
/// every fire advances the schedule regardless of outcome — but logs an
/// `Err` so failures are observable.
#[async_trait]
pub trait TimerExecutor: Send + Sync {
    async fn invoke(&self, info: TimerInfo, cancellation: CancellationToken) -> Result<(), TimerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Created,
    Started,
    Stopped,
    Disposed,
}

/// Construction parameters for a `TimerListener`. Grouped into one struct
/// rather than a long positional constructor since most fields are
/// independent configuration rather than a pipeline of dependent values.
pub struct TimerListenerOptions {
    pub name: String,
    pub schedule: Schedule,
    pub tz: Tz,
    pub use_monitor: bool,
    pub run_on_startup: bool,
    pub monitor: Option<Arc<dyn ScheduleMonitor>>,
    pub executor: Arc<dyn TimerExecutor>,
    pub clock: Arc<dyn Clock>,
}

struct Inner {
    name: String,
    schedule: Schedule,
    tz: Tz,
    use_monitor: bool,
    run_on_startup: bool,
    monitor: Option<Arc<dyn ScheduleMonitor>>,
    executor: Arc<dyn TimerExecutor>,
    clock: Arc<dyn Clock>,
    cancellation: CancellationToken,
}

pub struct TimerListener {
    inner: Arc<Inner>,
    state: Mutex<ListenerState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TimerListener {
    pub fn new(options: TimerListenerOptions) -> Self {
        // A schedule dense enough to fire more than once a minute is not
        // worth persisting per-occurrence status for; auto-disable rather
        // than hammering the monitor.
        let use_monitor = options.use_monitor && !options.schedule.fires_more_than_once_per_minute();

        Self {
            inner: Arc::new(Inner {
                name: options.name,
                schedule: options.schedule,
                tz: options.tz,
                use_monitor,
                run_on_startup: options.run_on_startup,
                monitor: options.monitor,
                executor: options.executor,
                clock: options.clock,
                cancellation: CancellationToken::new(),
            }),
            state: Mutex::new(ListenerState::Created),
            task: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub async fn state(&self) -> ListenerState {
        *self.state.lock().await
    }

    /// Runs the start protocol: load status, log it, check past-due,
    /// optionally invoke for catch-up, then arm the timer.
    pub async fn start(&self) -> Result<(), TimerError> {
        {
            let mut state = self.state.lock().await;
            if *state != ListenerState::Created {
                return Err(TimerError::Precondition(format!(
                    "timer '{}' cannot be started from state {:?}",
                    self.inner.name, *state
                )));
            }
            *state = ListenerState::Started;
        }

        let now = self.inner.clock.now();

        let loaded_status = if self.inner.use_monitor {
            match &self.inner.monitor {
                Some(monitor) => match monitor.get_status(&self.inner.name).await {
                    Ok(status) => status,
                    Err(e) => {
                        tracing::warn!("failed to load status for timer '{}': {}", self.inner.name, e);
                        None
                    }
                },
                None => None,
            }
        } else {
            None
        };

        log_initial_status(&self.inner.name, &loaded_status);

        let past_due = if self.inner.use_monitor {
            match &self.inner.monitor {
                Some(monitor) => check_past_due(
                    monitor.as_ref(),
                    &self.inner.name,
                    now,
                    self.inner.tz,
                    &self.inner.schedule,
                    loaded_status,
                )
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!("past-due check failed for timer '{}': {}", self.inner.name, e);
                    StdDuration::ZERO
                }),
                None => StdDuration::ZERO,
            }
        } else {
            StdDuration::ZERO
        };

        // `check_past_due` may have persisted a fresh status (brand-new
        // timer, or a schedule change); reload so the catch-up invocation
        // below observes it.
        let mut current_status = if self.inner.use_monitor {
            match &self.inner.monitor {
                Some(monitor) => monitor
                    .get_status(&self.inner.name)
                    .await
                    .unwrap_or(loaded_status),
                None => loaded_status,
            }
        } else {
            loaded_status
        };

        if past_due > StdDuration::ZERO || self.inner.run_on_startup {
            let info = TimerInfo::new(
                self.inner.schedule.clone(),
                self.inner.tz,
                current_status,
                past_due > StdDuration::ZERO,
            );
            if let Err(e) = self
                .inner
                .executor
                .invoke(info, self.inner.cancellation.clone())
                .await
            {
                tracing::error!(
                    "timer '{}' executor failed during startup invocation: {}",
                    self.inner.name,
                    e
                );
            }

            let fired_at = self.inner.clock.now();
            let next_occurrence = self.inner.schedule.next(fired_at, self.inner.tz);
            let new_status = ScheduleStatus::new(fired_at, next_occurrence, fired_at);

            if self.inner.use_monitor {
                if let Some(monitor) = &self.inner.monitor {
                    if let Err(e) = monitor.update_status(&self.inner.name, new_status).await {
                        tracing::warn!("failed to persist status for timer '{}': {}", self.inner.name, e);
                    }
                }
            }
            current_status = Some(new_status);
        } else if !self.inner.use_monitor {
            log_next_occurrences(&self.inner.name, &self.inner.schedule, now, self.inner.tz);
        }

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move { run_loop(inner, current_status).await });
        *self.task.lock().await = Some(handle);

        Ok(())
    }

    /// Cancels the platform timer. A fire already in flight runs to
    /// completion but does not re-arm.
    ///
    /// Does not itself wait for the background loop to finish — the
    /// executor invocation that is in flight when `stop` is called may be
    /// the one calling `stop` (the "stop from inside the running fire"
    /// scenario), and joining its own task here would deadlock. Callers
    /// that need to wait for full shutdown should await `join` afterward
    /// from outside the listener's own task.
    pub async fn stop(&self) -> Result<(), TimerError> {
        {
            let mut state = self.state.lock().await;
            if *state != ListenerState::Started {
                return Err(TimerError::Precondition(format!(
                    "timer '{}' cannot be stopped from state {:?}",
                    self.inner.name, *state
                )));
            }
            *state = ListenerState::Stopped;
        }

        self.inner.cancellation.cancel();
        Ok(())
    }

    /// Waits for the background arm/fire loop to finish after `stop` has
    /// signalled cancellation. Must not be called from within the
    /// listener's own background task.
    pub async fn join(&self) {
        if let Some(handle) = self.task.lock().await.take() {
            let _ = handle.await;
        }
    }

    pub async fn dispose(&self) -> Result<(), TimerError> {
        let mut state = self.state.lock().await;
        if *state != ListenerState::Stopped {
            return Err(TimerError::Precondition(format!(
                "timer '{}' cannot be disposed from state {:?}",
                self.inner.name, *state
            )));
        }
        *state = ListenerState::Disposed;
        Ok(())
    }
}

/// Background arm/fire loop. Owns `status` locally (no cross-task
/// synchronization needed beyond the cancellation token) since only this
/// task ever advances it.
async fn run_loop(inner: Arc<Inner>, mut status: Option<ScheduleStatus>) {
    loop {
        if inner.cancellation.is_cancelled() {
            return;
        }

        let now = inner.clock.now();
        let next = match &status {
            Some(s) => s.next,
            None => inner.schedule.next(now, inner.tz),
        };

        let mut remaining = next.signed_duration_since(now);
        if remaining <= ChronoDuration::zero() {
            remaining = ChronoDuration::milliseconds(1);
        }

        // Split intervals longer than MAX_TIMER_INTERVAL across
        // successive re-arms, carrying the remaining time forward
        // without invoking the executor until it is exhausted.
        loop {
            let chunk_std = remaining.to_std().unwrap_or(StdDuration::from_millis(1));
            let chunk = if chunk_std > MAX_TIMER_INTERVAL {
                MAX_TIMER_INTERVAL
            } else {
                chunk_std
            };

            tokio::select! {
                _ = tokio::time::sleep(chunk) => {}
                _ = inner.cancellation.cancelled() => return,
            }

            remaining -= ChronoDuration::from_std(chunk).unwrap_or_else(|_| ChronoDuration::zero());
            if remaining <= ChronoDuration::zero() {
                break;
            }
        }

        // A cancellation observed between the last carry chunk and the
        // fire below must still prevent this fire from re-arming.
        if inner.cancellation.is_cancelled() {
            return;
        }

        let now = inner.clock.now();
        let last_occurrence = match &status {
            Some(s) if now < s.next && (s.next - now) <= SKEW_TOLERANCE => s.next,
            _ => now,
        };

        let info = TimerInfo::new(inner.schedule.clone(), inner.tz, status, false);
        if let Err(e) = inner.executor.invoke(info, inner.cancellation.clone()).await {
            tracing::error!("timer '{}' executor failed: {}", inner.name, e);
        }

        let next_occurrence = inner.schedule.next(last_occurrence, inner.tz);
        let new_status = ScheduleStatus::new(last_occurrence, next_occurrence, now);

        if inner.use_monitor {
            if let Some(monitor) = &inner.monitor {
                if let Err(e) = monitor.update_status(&inner.name, new_status).await {
                    tracing::warn!("failed to persist status for timer '{}': {}", inner.name, e);
                }
            }
        }

        status = Some(new_status);

        if inner.cancellation.is_cancelled() {
            return;
        }
    }
}

fn log_initial_status(name: &str, status: &Option<ScheduleStatus>) {
    match status {
        Some(s) => tracing::info!(
            "timer '{}' initial status: last={}, next={}, last_updated={}",
            name,
            s.last.to_rfc3339(),
            s.next.to_rfc3339(),
            s.last_updated.to_rfc3339()
        ),
        None => tracing::info!("timer '{}' initial status: last=, next=, last_updated=", name),
    }
}

fn log_next_occurrences(name: &str, schedule: &Schedule, now: DateTime<Utc>, tz: Tz) {
    let occurrences = schedule.next_n(5, now, tz);
    let formatted: Vec<String> = occurrences.iter().map(|t| t.to_rfc3339()).collect();
    tracing::info!(
        "timer '{}': The next 5 occurrences of the schedule will be: {}",
        name,
        formatted.join(", ")
    );
}
