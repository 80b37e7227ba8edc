use async_trait::async_trait;

use super::errors::SyncError;
use crate::models::ChatRecord;

/// The durable `chats` table that cached records are reconciled into.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn insert(&self, record: &ChatRecord) -> Result<(), SyncError>;

    /// Most recent records first.
    async fn recent(&self, limit: usize) -> Result<Vec<ChatRecord>, SyncError>;
}
