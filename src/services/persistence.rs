use super::context::AppContext;
use super::errors::SyncError;
use crate::models::ChatRecord;

/// Where a record ended up after [`write_through`].
#[derive(Debug)]
pub enum WriteOutcome {
    Synced,
    /// Queued locally for the sync agent; `reason` is why the remote path was skipped.
    Cached { reason: SyncError },
    /// Neither the store nor the cache accepted the record.
    Dropped(SyncError),
}

/// Store `record` remotely when possible, otherwise queue it locally.
///
/// The probe and the insert are separate steps, so a probe that passes can
/// still be followed by a failed insert; that failure also falls back to the
/// cache.
pub async fn write_through(ctx: &AppContext, record: &ChatRecord) -> WriteOutcome {
    let reason = match ctx.store.as_deref() {
        None => SyncError::RemoteWriteFailed("no conversation store configured".to_string()),
        Some(store) => {
            if !ctx.probe.is_reachable().await {
                SyncError::ConnectivityUnavailable
            } else {
                match store.insert(record).await {
                    Ok(()) => return WriteOutcome::Synced,
                    Err(e) => {
                        tracing::error!("Failed to save chat to {}: {}", store.name(), e);
                        e
                    }
                }
            }
        }
    };

    match ctx.cache.append(record).await {
        Ok(()) => WriteOutcome::Cached { reason },
        Err(e) => {
            tracing::error!("Chat from {} was not persisted: {}", record.timestamp, e);
            WriteOutcome::Dropped(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::services::cache::LocalCache;
    use crate::services::store::ConversationStore;
    use crate::services::testing::{record, MemoryStore, StaticProbe};

    fn context(dir: &TempDir, store: Option<Arc<MemoryStore>>, online: bool) -> AppContext {
        AppContext {
            model: None,
            store: store.map(|s| s as Arc<dyn ConversationStore>),
            probe: Arc::new(StaticProbe::new(online)),
            cache: Arc::new(LocalCache::new(dir.path().join("chat_cache.json"))),
            sync_interval: Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn test_online_writes_go_to_store() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        let ctx = context(&dir, Some(store.clone()), true);

        let outcome = write_through(&ctx, &record(1)).await;

        assert!(matches!(outcome, WriteOutcome::Synced));
        assert_eq!(store.rows().len(), 1);
        assert!(!ctx.cache.path().exists());
    }

    #[tokio::test]
    async fn test_offline_writes_are_cached_in_order() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        let ctx = context(&dir, Some(store.clone()), false);

        for n in 0..4 {
            let outcome = write_through(&ctx, &record(n)).await;
            assert!(matches!(
                outcome,
                WriteOutcome::Cached {
                    reason: SyncError::ConnectivityUnavailable
                }
            ));
        }

        assert_eq!(store.attempts(), 0);
        let cached = ctx.cache.records().await.unwrap();
        let messages: Vec<_> = cached.iter().map(|r| r.user_message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["question 0", "question 1", "question 2", "question 3"]
        );
    }

    #[tokio::test]
    async fn test_failing_store_falls_back_to_cache() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::failing());
        let ctx = context(&dir, Some(store.clone()), true);

        for n in 0..3 {
            let outcome = write_through(&ctx, &record(n)).await;
            assert!(matches!(
                outcome,
                WriteOutcome::Cached {
                    reason: SyncError::RemoteWriteFailed(_)
                }
            ));
        }

        assert_eq!(store.attempts(), 3);
        assert!(store.rows().is_empty());
        assert_eq!(ctx.cache.records().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_store_caches() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, None, true);

        let outcome = write_through(&ctx, &record(1)).await;
        assert!(matches!(outcome, WriteOutcome::Cached { .. }));
        assert_eq!(ctx.cache.records().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unwritable_cache_reports_drop() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let mut ctx = context(&dir, None, false);
        ctx.cache = Arc::new(LocalCache::new(blocker.join("chat_cache.json")));

        let outcome = write_through(&ctx, &record(1)).await;
        assert!(matches!(outcome, WriteOutcome::Dropped(_)));
    }
}
