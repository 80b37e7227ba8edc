use std::sync::Arc;
use std::time::Duration;

use super::cache::LocalCache;
use super::connectivity::ConnectivityProbe;
use super::store::ConversationStore;
use crate::providers::ModelClient;

/// Everything the chat session and the sync agent share, built once at
/// startup.
pub struct AppContext {
    /// `None` when no model client could be constructed.
    pub model: Option<Arc<dyn ModelClient>>,
    /// `None` when the store is not configured; records then stay cached.
    pub store: Option<Arc<dyn ConversationStore>>,
    pub probe: Arc<dyn ConnectivityProbe>,
    pub cache: Arc<LocalCache>,
    pub sync_interval: Duration,
}
