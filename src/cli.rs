//! `ttsd` command-line surface: the "host process" that plays timer
//! attribute discovery, executor, and CLI glue around the scheduling
//! core, the way the teacher's own `cli` module glues its daemon
//! together.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};

use crate::cancellation::CancellationToken;
use crate::clock::{Clock, SystemClock};
use crate::config::{resolve_config_path, resolve_placeholders, resolve_status_path, HostConfig, TimerDefinition};
use crate::error::TimerError;
use crate::listener::{TimerExecutor, TimerListener, TimerListenerOptions};
use crate::monitor::{JsonFileScheduleMonitor, ScheduleMonitor};
use crate::schedule::Schedule;
use crate::timer_info::TimerInfo;

#[derive(Parser, Debug)]
#[command(name = "ttsd", version, about = "Durable timer-trigger scheduler host")]
pub struct Cli {
    /// Path to the TOML config file declaring `[[timer]]` entries. When
    /// omitted, resolved via `TTSD_CONFIG_DIR` and then the platform
    /// config directory, the same precedence the teacher's own daemon
    /// config loader uses.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Path to the JSON schedule-status file used by durable timers. When
    /// omitted, resolved via the platform data directory.
    #[arg(long = "status-file", global = true)]
    pub status_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    fn config_path(&self) -> PathBuf {
        resolve_config_path(self.config.as_deref())
    }

    fn status_path(&self) -> PathBuf {
        resolve_status_path(self.status_file.as_deref())
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start every configured timer and run until interrupted.
    Run,
    /// Parse every configured timer's schedule/timezone without running anything.
    Validate,
    /// Print the persisted status of every timer known to the status file.
    Status,
}

/// Runs a shell command via the system shell on each occurrence,
/// mirroring the teacher's command-execution path minus the PTY
/// streaming surface, which is out of scope here.
pub struct ShellCommandExecutor {
    name: String,
    command: String,
}

impl ShellCommandExecutor {
    pub fn new(name: String, command: String) -> Self {
        Self { name, command }
    }
}

#[async_trait]
impl TimerExecutor for ShellCommandExecutor {
    async fn invoke(&self, info: TimerInfo, _cancellation: CancellationToken) -> Result<(), TimerError> {
        tracing::info!(
            "timer '{}' firing (past_due={}), running: {}",
            self.name,
            info.is_past_due,
            self.command
        );

        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .output()
            .await
            .map_err(|e| TimerError::Executor(format!("failed to spawn command for timer '{}': {e}", self.name)))?;

        if !output.stdout.is_empty() {
            tracing::info!("timer '{}' stdout: {}", self.name, String::from_utf8_lossy(&output.stdout));
        }
        if !output.stderr.is_empty() {
            tracing::warn!("timer '{}' stderr: {}", self.name, String::from_utf8_lossy(&output.stderr));
        }

        if output.status.success() {
            Ok(())
        } else {
            Err(TimerError::Executor(format!(
                "timer '{}' command exited with status {}",
                self.name, output.status
            )))
        }
    }
}

/// Build the `Schedule` + `chrono_tz::Tz` pair for one timer definition,
/// applying `%name%`-style placeholder substitution first.
fn build_schedule(def: &TimerDefinition, placeholders: &std::collections::HashMap<String, String>) -> Result<(Schedule, Tz), TimerError> {
    let resolved = resolve_placeholders(&def.schedule, placeholders);
    let schedule = Schedule::parse(&resolved)?;
    let tz = Tz::from_str(&def.timezone)
        .map_err(|e| TimerError::Configuration(format!("invalid time zone '{}' for timer '{}': {e}", def.timezone, def.name)))?;
    Ok((schedule, tz))
}

pub async fn dispatch(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Run => run(cli).await,
        Commands::Validate => validate(cli).await,
        Commands::Status => status(cli).await,
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config_path = cli.config_path();
    let config = HostConfig::load(&config_path).await?;
    if config.timers.is_empty() {
        tracing::warn!("no [[timer]] entries found in {}", config_path.display());
        return Ok(());
    }

    let monitor: Arc<dyn ScheduleMonitor> = Arc::new(JsonFileScheduleMonitor::new(cli.status_path()).await?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let mut listeners = Vec::with_capacity(config.timers.len());
    for def in &config.timers {
        let (schedule, tz) = match build_schedule(def, &config.placeholders) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!("timer '{}' misconfigured, skipping: {e}", def.name);
                continue;
            }
        };

        let executor: Arc<dyn TimerExecutor> = Arc::new(ShellCommandExecutor::new(def.name.clone(), def.command.clone()));

        let listener = TimerListener::new(TimerListenerOptions {
            name: def.name.clone(),
            schedule,
            tz,
            use_monitor: def.use_monitor,
            run_on_startup: def.run_on_startup,
            monitor: Some(monitor.clone()),
            executor,
            clock: clock.clone(),
        });

        listener.start().await?;
        listeners.push(listener);
    }

    tracing::info!("{} timer(s) started, waiting for Ctrl-C", listeners.len());
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down");

    for listener in &listeners {
        if let Err(e) = listener.stop().await {
            tracing::warn!("error stopping timer '{}': {e}", listener.name());
        }
        listener.join().await;
    }

    Ok(())
}

async fn validate(cli: &Cli) -> anyhow::Result<()> {
    let config = HostConfig::load(&cli.config_path()).await?;
    let mut failed = false;

    for def in &config.timers {
        match build_schedule(def, &config.placeholders) {
            Ok(_) => println!("{}: OK", def.name),
            Err(e) => {
                println!("{}: ERROR ({e})", def.name);
                failed = true;
            }
        }
    }

    if failed {
        anyhow::bail!("one or more timer definitions are invalid");
    }
    Ok(())
}

async fn status(cli: &Cli) -> anyhow::Result<()> {
    let config = HostConfig::load(&cli.config_path()).await?;
    let monitor = JsonFileScheduleMonitor::new(cli.status_path()).await?;

    for def in &config.timers {
        match monitor.get_status(&def.name).await? {
            Some(s) => println!(
                "{}: last={} next={} last_updated={}",
                def.name,
                s.last.to_rfc3339(),
                s.next.to_rfc3339(),
                s.last_updated.to_rfc3339()
            ),
            None => println!("{}: no status recorded yet", def.name),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn timer_def(schedule: &str) -> TimerDefinition {
        TimerDefinition {
            name: "t".to_string(),
            schedule: schedule.to_string(),
            timezone: "UTC".to_string(),
            use_monitor: true,
            run_on_startup: false,
            command: "true".to_string(),
        }
    }

    #[test]
    fn build_schedule_resolves_placeholders_before_parsing() {
        let mut placeholders = HashMap::new();
        placeholders.insert("minute".to_string(), "30".to_string());
        let def = timer_def("0 %minute% * * * *");
        let (_, tz) = build_schedule(&def, &placeholders).unwrap();
        assert_eq!(tz, chrono_tz::UTC);
    }

    #[test]
    fn build_schedule_rejects_unknown_timezone() {
        let mut def = timer_def("0 0 * * * *");
        def.timezone = "Not/AZone".to_string();
        assert!(build_schedule(&def, &HashMap::new()).is_err());
    }

    #[test]
    fn build_schedule_rejects_invalid_schedule_expression() {
        let def = timer_def("garbage");
        assert!(build_schedule(&def, &HashMap::new()).is_err());
    }
}
