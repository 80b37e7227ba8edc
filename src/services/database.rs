use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use tokio::task;

use super::errors::SyncError;
use super::store::ConversationStore;
use crate::models::chat_record::parse_timestamp;
use crate::models::ChatRecord;

/// `chats` table in a SQLite file, for setups where the conversation store
/// lives on a mounted share instead of a hosted database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let store = SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL
            );",
        )?;

        let version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if version < 1 {
            conn.execute_batch(
                "CREATE TABLE chats (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_message TEXT NOT NULL,
                    bot_response TEXT NOT NULL,
                    timestamp TEXT NOT NULL
                );
                CREATE INDEX idx_chats_timestamp ON chats(timestamp DESC);

                INSERT INTO schema_version (version) VALUES (1);",
            )?;
        }

        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<(String, String, String)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn insert(&self, record: &ChatRecord) -> Result<(), SyncError> {
        let conn = self.conn.clone();
        let record = record.clone();
        task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| SyncError::RemoteWriteFailed("database lock poisoned".to_string()))?;
            conn.execute(
                "INSERT INTO chats (user_message, bot_response, timestamp) VALUES (?1, ?2, ?3)",
                params![
                    record.user_message,
                    record.bot_response,
                    record.timestamp.to_rfc3339()
                ],
            )
            .map_err(|e| SyncError::RemoteWriteFailed(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| SyncError::RemoteWriteFailed(e.to_string()))?
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChatRecord>, SyncError> {
        let conn = self.conn.clone();
        task::spawn_blocking(move || {
            let read_err = |e: &dyn std::fmt::Display| SyncError::RemoteReadFailed(e.to_string());
            let conn = conn
                .lock()
                .map_err(|_| SyncError::RemoteReadFailed("database lock poisoned".to_string()))?;
            let mut stmt = conn
                .prepare(
                    "SELECT user_message, bot_response, timestamp FROM chats
                     ORDER BY timestamp DESC, id DESC LIMIT ?1",
                )
                .map_err(|e| read_err(&e))?;
            let rows = stmt
                .query_map(params![limit as i64], Self::row_to_record)
                .map_err(|e| read_err(&e))?;

            let mut records = Vec::new();
            for row in rows {
                let (user_message, bot_response, ts) = row.map_err(|e| read_err(&e))?;
                let timestamp = parse_timestamp(&ts).map_err(|e| read_err(&e))?;
                records.push(ChatRecord {
                    user_message,
                    bot_response,
                    timestamp,
                });
            }
            Ok(records)
        })
        .await
        .map_err(|e| SyncError::RemoteReadFailed(e.to_string()))?
    }
}
