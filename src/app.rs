use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::config::{Config, StoreBackend};
use crate::providers::{LocalProvider, ModelClient};
use crate::services::chat::ChatSession;
use crate::services::markdown::Style;
use crate::services::{
    AppContext, ConversationStore, HttpProbe, LocalCache, SqliteStore, SupabaseStore, SyncAgent,
};
use crate::ui::terminal;

pub struct App {
    ctx: Arc<AppContext>,
    style: Style,
}

impl App {
    pub fn build(config: &Config, data_dir: &Path) -> Result<Self> {
        let model: Option<Arc<dyn ModelClient>> = match LocalProvider::new(config.model_settings()) {
            Ok(provider) => {
                tracing::info!("Using model {} at {}", config.model, config.model_url);
                Some(Arc::new(provider) as Arc<dyn ModelClient>)
            }
            Err(e) => {
                tracing::error!("Failed to initialize local model: {}", e);
                None
            }
        };

        let store = Self::build_store(config, data_dir)?;

        let probe = HttpProbe::new(config.probe_url.clone(), config.probe_timeout())
            .context("Failed to build connectivity probe")?;

        let cache = LocalCache::new(config.cache_path(data_dir));
        tracing::info!("Local cache at {}", cache.path().display());

        let ctx = AppContext {
            model,
            store,
            probe: Arc::new(probe),
            cache: Arc::new(cache),
            sync_interval: config.sync_interval(),
        };

        let style = if config.plain || !std::io::stdout().is_terminal() {
            Style::Plain
        } else {
            Style::Ansi
        };

        Ok(Self {
            ctx: Arc::new(ctx),
            style,
        })
    }

    fn build_store(config: &Config, data_dir: &Path) -> Result<Option<Arc<dyn ConversationStore>>> {
        match config.store {
            StoreBackend::Supabase => match (&config.supabase_url, &config.supabase_key) {
                (Some(url), Some(key)) => {
                    let store = SupabaseStore::new(url.clone(), key.clone(), config.store_timeout())
                        .context("Failed to build Supabase client")?;
                    Ok(Some(Arc::new(store) as Arc<dyn ConversationStore>))
                }
                _ => {
                    tracing::warn!(
                        "SUPABASE_URL or SUPABASE_KEY not set; chats will stay in the local cache"
                    );
                    Ok(None)
                }
            },
            StoreBackend::Sqlite => {
                let path = config.sqlite_path(data_dir);
                let store = SqliteStore::open(&path)?;
                tracing::info!("Conversation store at {}", path.display());
                Ok(Some(Arc::new(store) as Arc<dyn ConversationStore>))
            }
        }
    }

    pub async fn run(self) -> Result<()> {
        SyncAgent::new(self.ctx.clone()).spawn();

        let (tx, rx) = mpsc::unbounded_channel();
        let session = ChatSession::new(self.ctx.clone(), tx);

        terminal::run(session, rx, self.style).await
    }
}
