use std::sync::Arc;

use tokio::task::JoinHandle;

use super::context::AppContext;
use super::errors::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncReport {
    /// No store configured, nothing can be drained.
    Deferred,
    /// Number of cached records published (0 when the cache was empty).
    Drained(usize),
}

/// Background loop that moves cached records into the conversation store
/// whenever connectivity allows.
pub struct SyncAgent {
    ctx: Arc<AppContext>,
}

impl SyncAgent {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// One probe-then-drain cycle.
    pub async fn run_once(&self) -> Result<SyncReport, SyncError> {
        let Some(store) = self.ctx.store.as_deref() else {
            tracing::info!("No conversation store configured; sync deferred");
            return Ok(SyncReport::Deferred);
        };

        if !self.ctx.probe.is_reachable().await {
            tracing::info!("Internet not available; sync deferred");
            return Err(SyncError::ConnectivityUnavailable);
        }

        let drained = self.ctx.cache.drain_and_sync(store).await?;
        if drained > 0 {
            tracing::info!("Synced {} cached chats to {}", drained, store.name());
        }
        Ok(SyncReport::Drained(drained))
    }

    /// Runs forever; the task ends with the runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match self.run_once().await {
                    Ok(_) | Err(SyncError::ConnectivityUnavailable) => {}
                    Err(e) => tracing::error!("Error syncing cached chats: {}", e),
                }
                tokio::time::sleep(self.ctx.sync_interval).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::services::cache::LocalCache;
    use crate::services::persistence::{write_through, WriteOutcome};
    use crate::services::store::ConversationStore;
    use crate::services::testing::{record, MemoryStore, StaticProbe};
    use crate::services::SqliteStore;

    struct Harness {
        _dir: TempDir,
        ctx: Arc<AppContext>,
        probe: Arc<StaticProbe>,
    }

    fn harness(store: Option<Arc<dyn ConversationStore>>, online: bool, every: Duration) -> Harness {
        let dir = TempDir::new().unwrap();
        let probe = Arc::new(StaticProbe::new(online));
        let ctx = Arc::new(AppContext {
            model: None,
            store,
            probe: probe.clone(),
            cache: Arc::new(LocalCache::new(dir.path().join("chat_cache.json"))),
            sync_interval: every,
        });
        Harness {
            _dir: dir,
            ctx,
            probe,
        }
    }

    #[tokio::test]
    async fn test_offline_cycle_leaves_cache() {
        let store = Arc::new(MemoryStore::new());
        let h = harness(Some(store.clone()), false, Duration::from_secs(60));
        h.ctx.cache.append(&record(1)).await.unwrap();

        let agent = SyncAgent::new(h.ctx.clone());
        assert!(matches!(
            agent.run_once().await,
            Err(SyncError::ConnectivityUnavailable)
        ));
        assert_eq!(store.attempts(), 0);
        assert_eq!(h.ctx.cache.records().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_store_defers() {
        let h = harness(None, true, Duration::from_secs(60));
        h.ctx.cache.append(&record(1)).await.unwrap();

        let agent = SyncAgent::new(h.ctx.clone());
        assert_eq!(agent.run_once().await.unwrap(), SyncReport::Deferred);
        assert_eq!(h.ctx.cache.records().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reconnect_drains_everything() {
        let store = Arc::new(MemoryStore::new());
        let h = harness(Some(store.clone()), false, Duration::from_secs(60));

        for n in 0..5 {
            let outcome = write_through(&h.ctx, &record(n)).await;
            assert!(matches!(outcome, WriteOutcome::Cached { .. }));
        }
        assert_eq!(store.attempts(), 0);

        h.probe.set_online(true);
        let agent = SyncAgent::new(h.ctx.clone());
        assert_eq!(agent.run_once().await.unwrap(), SyncReport::Drained(5));

        assert!(!h.ctx.cache.path().exists());
        assert_eq!(store.rows().len(), 5);

        // Nothing left to do.
        assert_eq!(agent.run_once().await.unwrap(), SyncReport::Drained(0));
        assert_eq!(store.rows().len(), 5);
    }

    #[tokio::test]
    async fn test_spawned_agent_drains_into_sqlite() {
        let sqlite = Arc::new(SqliteStore::new_in_memory().unwrap());
        let h = harness(
            Some(sqlite.clone() as Arc<dyn ConversationStore>),
            false,
            Duration::from_millis(10),
        );

        let hello = crate::models::ChatRecord::completed_now("hello", "hi");
        write_through(&h.ctx, &hello).await;
        assert_eq!(h.ctx.cache.records().await.unwrap(), vec![hello.clone()]);

        let handle = SyncAgent::new(h.ctx.clone()).spawn();
        h.probe.set_online(true);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while h.ctx.cache.path().exists() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        assert!(!h.ctx.cache.path().exists());
        let rows = sqlite.recent(10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_message, "hello");
        assert_eq!(rows[0].bot_response, "hi");
    }
}
