//! Host-side declarative timer definitions, loaded from a TOML file.
//!
//! This is the CLI's own configuration layer — the scheduling core never
//! reads a config file itself, it only consumes the `ScheduleExpression`
//! / `UseMonitor` / `RunOnStartup` triple this module parses.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TimerError;

/// Resolve the host config file path using the same precedence order the
/// teacher's own daemon config loader uses: an explicit CLI flag first,
/// then a `TTSD_CONFIG_DIR` environment variable, then the platform
/// config directory, finally a `./ttsd.toml` fallback.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(dir) = std::env::var("TTSD_CONFIG_DIR") {
        return PathBuf::from(dir).join("ttsd.toml");
    }
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("ttsd").join("ttsd.toml");
    }
    PathBuf::from("ttsd.toml")
}

/// Resolve the schedule-status file path: explicit flag, else the
/// platform data directory, else a `./ttsd-status.json` fallback.
pub fn resolve_status_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("ttsd").join("status.json");
    }
    PathBuf::from("ttsd-status.json")
}

/// One timer's declarative definition, mirroring the attribute-level
/// configuration the scheduling core consumes (`ScheduleExpression`,
/// `UseMonitor`, `RunOnStartup`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerDefinition {
    pub name: String,
    pub schedule: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_use_monitor")]
    pub use_monitor: bool,
    #[serde(default)]
    pub run_on_startup: bool,
    /// Shell command run by the CLI's executor on each occurrence.
    pub command: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_use_monitor() -> bool {
    true
}

/// Top-level config file shape: `[[timer]]` tables plus an optional
/// `%name%`-style placeholder map applied to every `schedule` string
/// before parsing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub placeholders: HashMap<String, String>,
    #[serde(rename = "timer", default)]
    pub timers: Vec<TimerDefinition>,
}

impl HostConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, TimerError> {
        toml::from_str(text).map_err(|e| TimerError::Configuration(format!("invalid config file: {e}")))
    }

    pub async fn load(path: &Path) -> Result<Self, TimerError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| TimerError::Configuration(format!("failed to read config file {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

/// Substitute every `%key%` occurrence in `text` with `placeholders[key]`.
/// Unknown placeholders are left untouched — the cron/duration parser
/// that runs afterward will reject anything that still looks wrong.
pub fn resolve_placeholders(text: &str, placeholders: &HashMap<String, String>) -> String {
    let mut resolved = text.to_string();
    for (key, value) in placeholders {
        let token = format!("%{key}%");
        resolved = resolved.replace(&token, value);
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_timer_table() {
        let toml = r#"
            [[timer]]
            name = "heartbeat"
            schedule = "0 */5 * * * *"
            command = "echo alive"
        "#;
        let config = HostConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.timers.len(), 1);
        let timer = &config.timers[0];
        assert_eq!(timer.name, "heartbeat");
        assert_eq!(timer.timezone, "UTC");
        assert!(timer.use_monitor);
        assert!(!timer.run_on_startup);
    }

    #[test]
    fn parses_full_timer_table() {
        let toml = r#"
            [[timer]]
            name = "nightly"
            schedule = "0 0 2 * * *"
            timezone = "America/Los_Angeles"
            use_monitor = false
            run_on_startup = true
            command = "run-backup.sh"
        "#;
        let config = HostConfig::from_toml_str(toml).unwrap();
        let timer = &config.timers[0];
        assert_eq!(timer.timezone, "America/Los_Angeles");
        assert!(!timer.use_monitor);
        assert!(timer.run_on_startup);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(HostConfig::from_toml_str("not = [valid toml").is_err());
    }

    #[test]
    fn placeholder_substitution_replaces_known_keys() {
        let mut placeholders = HashMap::new();
        placeholders.insert("name".to_string(), "nightly-backup".to_string());
        let resolved = resolve_placeholders("job-%name%-schedule", &placeholders);
        assert_eq!(resolved, "job-nightly-backup-schedule");
    }

    #[test]
    fn placeholder_substitution_leaves_unknown_tokens() {
        let placeholders = HashMap::new();
        let resolved = resolve_placeholders("job-%missing%-schedule", &placeholders);
        assert_eq!(resolved, "job-%missing%-schedule");
    }

    #[test]
    fn resolve_config_path_prefers_explicit_flag() {
        let explicit = PathBuf::from("/tmp/custom.toml");
        assert_eq!(resolve_config_path(Some(&explicit)), explicit);
    }

    #[test]
    fn resolve_config_path_prefers_env_var_over_platform_dir() {
        std::env::set_var("TTSD_CONFIG_DIR", "/tmp/ttsd-env-config");
        let resolved = resolve_config_path(None);
        std::env::remove_var("TTSD_CONFIG_DIR");
        assert_eq!(resolved, PathBuf::from("/tmp/ttsd-env-config/ttsd.toml"));
    }

    #[test]
    fn resolve_status_path_prefers_explicit_flag() {
        let explicit = PathBuf::from("/tmp/custom-status.json");
        assert_eq!(resolve_status_path(Some(&explicit)), explicit);
    }

    #[test]
    fn multiple_timers_parse_independently() {
        let toml = r#"
            [[timer]]
            name = "a"
            schedule = "0 0 * * * *"
            command = "echo a"

            [[timer]]
            name = "b"
            schedule = "00:00:30"
            command = "echo b"
        "#;
        let config = HostConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.timers.len(), 2);
        assert_eq!(config.timers[0].name, "a");
        assert_eq!(config.timers[1].name, "b");
    }
}
