use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::TimerError;
use crate::status::ScheduleStatus;

use super::ScheduleMonitor;

/// Durable `ScheduleMonitor` backed by a single JSON file of
/// `{timer_name: ScheduleStatus}`, with an in-memory read cache.
///
/// Writes go to a `.tmp` file which is then renamed over the real file,
/// so a reader never observes a half-written status map — the same
/// atomic-write-then-rename approach the teacher's job store uses for
/// its own persisted state.
pub struct JsonFileScheduleMonitor {
    file_path: PathBuf,
    cache: RwLock<HashMap<String, ScheduleStatus>>,
}

impl JsonFileScheduleMonitor {
    /// Load (or create) the status file at `file_path`. If the file
    /// exists but is not valid JSON, it is backed up to `<path>.bak`, a
    /// warning is logged, and the monitor starts with an empty map.
    pub async fn new(file_path: PathBuf) -> Result<Self, TimerError> {
        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let statuses = if file_path.exists() {
            let content = tokio::fs::read_to_string(&file_path).await?;
            match serde_json::from_str::<HashMap<String, ScheduleStatus>>(&content) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(
                        "schedule status file {} is corrupted ({}), backing up and starting empty",
                        file_path.display(),
                        e
                    );
                    let backup_path = file_path.with_extension("json.bak");
                    if let Err(backup_err) = tokio::fs::copy(&file_path, &backup_path).await {
                        tracing::error!(
                            "failed to back up corrupted schedule status file {}: {}",
                            file_path.display(),
                            backup_err
                        );
                    }
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            file_path,
            cache: RwLock::new(statuses),
        })
    }

    async fn persist(&self, statuses: &HashMap<String, ScheduleStatus>) -> Result<(), TimerError> {
        let tmp_path = self.file_path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(statuses)?;
        tokio::fs::write(&tmp_path, json.as_bytes()).await?;
        tokio::fs::rename(&tmp_path, &self.file_path).await?;
        Ok(())
    }
}

#[async_trait]
impl ScheduleMonitor for JsonFileScheduleMonitor {
    async fn get_status(&self, timer_name: &str) -> Result<Option<ScheduleStatus>, TimerError> {
        Ok(self.cache.read().await.get(timer_name).copied())
    }

    async fn update_status(&self, timer_name: &str, status: ScheduleStatus) -> Result<(), TimerError> {
        let mut cache = self.cache.write().await;
        cache.insert(timer_name.to_string(), status);
        self.persist(&cache).await
    }
}
