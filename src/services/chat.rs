use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use super::context::AppContext;
use super::errors::SyncError;
use super::persistence::{write_through, WriteOutcome};
use super::sync::{SyncAgent, SyncReport};
use crate::models::ChatRecord;

pub const INFERENCE_ERROR_REPLY: &str = "Error: Unable to get response from local model.";
pub const MODEL_UNAVAILABLE_REPLY: &str = "Local model not available.";

/// Updates produced by worker tasks. Only the UI loop consumes these.
#[derive(Debug)]
pub enum UiEvent {
    Typing(bool),
    BotReply(String),
    Persisted(WriteOutcome),
    SyncFinished(Result<SyncReport, SyncError>),
    Pending(Result<usize, SyncError>),
    History(Result<Vec<ChatRecord>, SyncError>),
}

/// Foreground chat: each send runs on its own task and reports back through
/// the UI channel.
#[derive(Clone)]
pub struct ChatSession {
    ctx: Arc<AppContext>,
    ui: UnboundedSender<UiEvent>,
}

impl ChatSession {
    pub fn new(ctx: Arc<AppContext>, ui: UnboundedSender<UiEvent>) -> Self {
        Self { ctx, ui }
    }

    /// Blank input is ignored.
    pub fn send(&self, text: &str) -> Option<JoinHandle<ChatRecord>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let session = self.clone();
        let text = text.to_string();
        Some(tokio::spawn(async move { session.exchange(&text).await }))
    }

    /// Ask the model, show the reply, then persist the exchange.
    pub async fn exchange(&self, user_text: &str) -> ChatRecord {
        self.emit(UiEvent::Typing(true));
        let reply = self.reply_to(user_text).await;
        self.emit(UiEvent::BotReply(reply.clone()));
        self.emit(UiEvent::Typing(false));

        let record = ChatRecord::completed_now(user_text, reply);
        let outcome = write_through(&self.ctx, &record).await;
        self.emit(UiEvent::Persisted(outcome));
        record
    }

    pub fn request_sync(&self) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            let result = SyncAgent::new(session.ctx.clone()).run_once().await;
            session.emit(UiEvent::SyncFinished(result));
        })
    }

    pub fn request_pending(&self) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            let result = session.ctx.cache.records().await.map(|r| r.len());
            session.emit(UiEvent::Pending(result));
        })
    }

    pub fn request_history(&self, limit: usize) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            let result = match session.ctx.store.as_deref() {
                Some(store) => store.recent(limit).await,
                None => Err(SyncError::RemoteReadFailed(
                    "no conversation store configured".to_string(),
                )),
            };
            session.emit(UiEvent::History(result));
        })
    }

    async fn reply_to(&self, user_text: &str) -> String {
        let Some(model) = self.ctx.model.as_deref() else {
            return MODEL_UNAVAILABLE_REPLY.to_string();
        };

        match model.infer(user_text).await {
            Ok(reply) => reply,
            Err(e) => {
                let err = SyncError::from(e);
                tracing::error!("Error during model inference ({}): {}", model.model_name(), err);
                INFERENCE_ERROR_REPLY.to_string()
            }
        }
    }

    fn emit(&self, event: UiEvent) {
        // The receiver only goes away while the process is shutting down.
        let _ = self.ui.send(event);
    }
}
