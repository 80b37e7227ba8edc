use thiserror::Error;

use crate::providers::ProviderError;

/// Failure kinds on the persistence and inference paths.
///
/// None of these abort the chat session. Model failures become a substitute
/// reply and local write failures become a user visible warning.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Remote store is unreachable")]
    ConnectivityUnavailable,

    #[error("Remote write failed: {0}")]
    RemoteWriteFailed(String),

    #[error("Remote read failed: {0}")]
    RemoteReadFailed(String),

    #[error("Failed to read local cache: {0}")]
    LocalStorageReadFailed(String),

    #[error("Failed to write local cache: {0}")]
    LocalStorageWriteFailed(String),

    #[error("Model inference failed: {0}")]
    ModelInferenceFailed(#[from] ProviderError),
}
