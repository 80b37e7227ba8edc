use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::errors::SyncError;
use super::store::ConversationStore;
use crate::models::ChatRecord;

const TABLE: &str = "chats";

/// `chats` table served by Supabase's PostgREST endpoint.
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: String,
}

impl SupabaseStore {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), TABLE)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    fn decode_rows(body: &str) -> Result<Vec<ChatRecord>, SyncError> {
        serde_json::from_str(body).map_err(|e| SyncError::RemoteReadFailed(e.to_string()))
    }

    fn describe_failure(status: StatusCode, body: &str) -> String {
        match serde_json::from_str::<PostgrestError>(body) {
            Ok(parsed) => format!("HTTP {}: {}", status.as_u16(), parsed.message),
            Err(_) => format!("HTTP {}", status.as_u16()),
        }
    }
}

#[async_trait]
impl ConversationStore for SupabaseStore {
    fn name(&self) -> &'static str {
        "supabase"
    }

    async fn insert(&self, record: &ChatRecord) -> Result<(), SyncError> {
        let response = self
            .authorized(self.client.post(self.table_url()))
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await
            .map_err(|e| SyncError::RemoteWriteFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::RemoteWriteFailed(Self::describe_failure(
                status, &body,
            )));
        }

        tracing::info!("Chat saved to {} ({})", TABLE, status);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChatRecord>, SyncError> {
        let limit = limit.to_string();
        let response = self
            .authorized(self.client.get(self.table_url()))
            .query(&[
                ("select", "user_message,bot_response,timestamp"),
                ("order", "timestamp.desc"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SyncError::RemoteReadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::RemoteReadFailed(Self::describe_failure(
                status, &body,
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SyncError::RemoteReadFailed(e.to_string()))?;
        Self::decode_rows(&body)
    }
}
