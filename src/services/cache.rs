use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;

use super::errors::SyncError;
use super::store::ConversationStore;
use crate::models::ChatRecord;

/// File-backed queue of records that could not be written to the remote
/// store. The whole file is the unit of every read and write, so all access
/// goes through `lock`.
#[derive(Debug)]
pub struct LocalCache {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LocalCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add `record` to the end of the queue.
    pub async fn append(&self, record: &ChatRecord) -> Result<(), SyncError> {
        let _guard = self.lock.lock().await;

        let mut records = self.load().await?;
        records.push(record.clone());
        self.save(&records).await?;

        tracing::info!(
            "Cached chat from {} ({} pending)",
            record.timestamp.to_rfc3339(),
            records.len()
        );
        Ok(())
    }

    /// Publish every queued record in order and remove the file once all of
    /// them went through. The first failed insert stops the drain and leaves
    /// the file exactly as it was, so records already published will be sent
    /// again on the next attempt.
    ///
    /// `lock` is held for the whole drain, so `append` and `records` wait
    /// until it finishes. Each insert is bounded by the store's request
    /// timeout, which makes the worst case the queue length times that
    /// timeout (`--store-timeout-secs`).
    pub async fn drain_and_sync(&self, store: &dyn ConversationStore) -> Result<usize, SyncError> {
        let _guard = self.lock.lock().await;

        let records = self.load().await?;
        if records.is_empty() {
            return Ok(0);
        }

        for (i, record) in records.iter().enumerate() {
            if let Err(e) = store.insert(record).await {
                tracing::error!(
                    "Sync to {} stopped at record {}/{}: {}",
                    store.name(),
                    i + 1,
                    records.len(),
                    e
                );
                return Err(e);
            }
            tracing::info!("Synced chat from {}", record.timestamp.to_rfc3339());
        }

        match fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(SyncError::LocalStorageWriteFailed(format!(
                    "published {} records but could not remove {}: {}",
                    records.len(),
                    self.path.display(),
                    e
                )))
            }
        }

        Ok(records.len())
    }

    /// Snapshot of the queued records in submission order.
    pub async fn records(&self) -> Result<Vec<ChatRecord>, SyncError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    // Callers must hold `lock`.
    async fn load(&self) -> Result<Vec<ChatRecord>, SyncError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                let err = SyncError::LocalStorageReadFailed(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                ));
                tracing::error!("{}", err);
                return Err(err);
            }
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str(&contents) {
            Ok(records) => Ok(records),
            Err(parse_err) => {
                self.quarantine(&parse_err).await?;
                Ok(Vec::new())
            }
        }
    }

    /// Moves an unparsable cache aside so the next write does not destroy
    /// whatever it still holds.
    async fn quarantine(&self, parse_err: &serde_json::Error) -> Result<(), SyncError> {
        let aside = with_suffix(
            &self.path,
            &format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%.3fZ")),
        );

        match fs::rename(&self.path, &aside).await {
            Ok(()) => {
                tracing::warn!(
                    "Cache file {} is corrupt ({}); moved to {}",
                    self.path.display(),
                    parse_err,
                    aside.display()
                );
                Ok(())
            }
            Err(e) => {
                let err = SyncError::LocalStorageReadFailed(format!(
                    "{} is corrupt ({}) and could not be moved aside: {}",
                    self.path.display(),
                    parse_err,
                    e
                ));
                tracing::error!("{}", err);
                Err(err)
            }
        }
    }

    // Callers must hold `lock`.
    async fn save(&self, records: &[ChatRecord]) -> Result<(), SyncError> {
        let write_err = |e: &dyn std::fmt::Display| {
            let err =
                SyncError::LocalStorageWriteFailed(format!("{}: {}", self.path.display(), e));
            tracing::error!("{}", err);
            err
        };

        let json = serde_json::to_string(records).map_err(|e| write_err(&e))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| write_err(&e))?;
            }
        }

        // temp file + rename
        let temp = with_suffix(&self.path, ".tmp");
        fs::write(&temp, json).await.map_err(|e| write_err(&e))?;
        fs::rename(&temp, &self.path)
            .await
            .map_err(|e| write_err(&e))?;

        Ok(())
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
