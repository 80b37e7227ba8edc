//! In-process fakes for the store, probe and model seams.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::connectivity::ConnectivityProbe;
use super::errors::SyncError;
use super::store::ConversationStore;
use crate::models::ChatRecord;
use crate::providers::{ModelClient, ProviderError};

/// Store that keeps rows in memory and can be told to reject inserts.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<ChatRecord>>,
    attempts: AtomicUsize,
    /// Insert attempts numbered from this one on (1-based) fail. `None` accepts all.
    fail_from_attempt: Mutex<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let store = Self::default();
        store.fail_from(1);
        store
    }

    pub fn fail_from(&self, attempt: usize) {
        *self.fail_from_attempt.lock().unwrap() = Some(attempt);
    }

    pub fn heal(&self) {
        *self.fail_from_attempt.lock().unwrap() = None;
    }

    pub fn rows(&self) -> Vec<ChatRecord> {
        self.rows.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, record: &ChatRecord) -> Result<(), SyncError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(from) = *self.fail_from_attempt.lock().unwrap() {
            if attempt >= from {
                return Err(SyncError::RemoteWriteFailed(format!(
                    "insert #{} rejected",
                    attempt
                )));
            }
        }
        self.rows.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChatRecord>, SyncError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().rev().take(limit).cloned().collect())
    }
}

pub struct StaticProbe {
    online: AtomicBool,
}

impl StaticProbe {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityProbe for StaticProbe {
    async fn is_reachable(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Model with a fixed reply, or a failure when `reply` is `None`.
pub struct ScriptedModel {
    pub reply: Option<String>,
}

#[async_trait]
impl ModelClient for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn infer(&self, _prompt: &str) -> Result<String, ProviderError> {
        self.reply
            .clone()
            .ok_or_else(|| ProviderError::NetworkError("connection refused".to_string()))
    }
}

pub fn record(n: usize) -> ChatRecord {
    ChatRecord::completed_now(format!("question {}", n), format!("answer {}", n))
}
