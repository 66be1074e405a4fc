use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::TimerError;
use crate::status::ScheduleStatus;

use super::ScheduleMonitor;

/// Non-durable `ScheduleMonitor` backed by an in-memory map. Used for
/// tests and for timers that opt out of persistence.
#[derive(Default)]
pub struct InMemoryScheduleMonitor {
    statuses: RwLock<HashMap<String, ScheduleStatus>>,
}

impl InMemoryScheduleMonitor {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleMonitor for InMemoryScheduleMonitor {
    async fn get_status(&self, timer_name: &str) -> Result<Option<ScheduleStatus>, TimerError> {
        Ok(self.statuses.read().await.get(timer_name).copied())
    }

    async fn update_status(&self, timer_name: &str, status: ScheduleStatus) -> Result<(), TimerError> {
        self.statuses.write().await.insert(timer_name.to_string(), status);
        Ok(())
    }
}
