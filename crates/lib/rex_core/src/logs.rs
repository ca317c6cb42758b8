//! Diagnostic event log records.
//!
//! Global rather than user scoped: any signed-in caller may post or read.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::error::{ChatError, ChatResult, require_field};
use crate::models::log::EventLog;
use crate::store::EventLogRepository;

#[derive(Clone)]
pub struct EventLogStore {
    repo: Arc<dyn EventLogRepository>,
}

impl EventLogStore {
    pub fn new(repo: Arc<dyn EventLogRepository>) -> Self {
        Self { repo }
    }

    pub async fn post(&self, description: &str) -> ChatResult<EventLog> {
        require_field(description, "eventDescription")?;
        let log = self.repo.post_log(description).await?;
        debug!(log_id = %log.id, "posted event log");
        Ok(log)
    }

    pub async fn get(&self, log_id: Uuid) -> ChatResult<EventLog> {
        self.repo
            .get_log(log_id)
            .await?
            .ok_or_else(|| ChatError::NotFound(format!("Log {log_id}")))
    }

    /// Replace the description; the timestamp moves to now.
    pub async fn update(&self, log_id: Uuid, description: &str) -> ChatResult<EventLog> {
        require_field(description, "eventDescription")?;
        self.repo
            .update_log(log_id, description)
            .await?
            .ok_or_else(|| ChatError::NotFound(format!("Log {log_id}")))
    }

    pub async fn delete(&self, log_id: Uuid) -> ChatResult<()> {
        if self.repo.delete_log(log_id).await? {
            Ok(())
        } else {
            Err(ChatError::NotFound(format!("Log {log_id}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRepository;

    fn store() -> EventLogStore {
        EventLogStore::new(Arc::new(MemoryRepository::new()))
    }

    #[tokio::test]
    async fn post_update_delete() {
        let logs = store();
        let posted = logs.post("server started").await.unwrap();
        assert_eq!(logs.get(posted.id).await.unwrap(), posted);

        let updated = logs.update(posted.id, "server restarted").await.unwrap();
        assert_eq!(updated.event_description, "server restarted");
        assert!(updated.timestamp >= posted.timestamp);

        logs.delete(posted.id).await.unwrap();
        assert!(matches!(
            logs.get(posted.id).await,
            Err(ChatError::NotFound(_))
        ));
        assert!(matches!(
            logs.delete(posted.id).await,
            Err(ChatError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn blank_description_is_rejected() {
        assert!(matches!(
            store().post("").await,
            Err(ChatError::Validation(_))
        ));
    }
}
