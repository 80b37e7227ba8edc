use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use url::Url;

use crate::providers::ModelSettings;

pub const APP_NAME: &str = "chatline";

const CACHE_FILE: &str = "chat_cache.json";
const LOG_FILE: &str = "chatbot.log";
const SQLITE_FILE: &str = "chats.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// Supabase `chats` table over PostgREST
    Supabase,
    /// `chats` table in a SQLite file
    Sqlite,
}

#[derive(Debug, Clone, Parser)]
#[command(name = APP_NAME, version, about = "Chat with a local model; exchanges sync to a remote store when online")]
pub struct Config {
    /// Directory for the local cache, log file and SQLite store
    #[arg(long, env = "CHATLINE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Model name as known to the local server
    #[arg(long, env = "CHATLINE_MODEL", default_value = "deepseek-r1:1.5b")]
    pub model: String,

    /// Base URL of the OpenAI compatible model server
    #[arg(long, env = "CHATLINE_MODEL_URL", default_value = "http://localhost:11434")]
    pub model_url: String,

    #[arg(long, env = "CHATLINE_MODEL_API_KEY", hide_env_values = true)]
    pub model_api_key: Option<String>,

    #[arg(long)]
    pub system_prompt: Option<String>,

    #[arg(long)]
    pub temperature: Option<f32>,

    #[arg(long, value_enum, env = "CHATLINE_STORE", default_value_t = StoreBackend::Supabase)]
    pub store: StoreBackend,

    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,

    /// SQLite store location (default: <data-dir>/chats.db)
    #[arg(long)]
    pub sqlite_path: Option<PathBuf>,

    /// URL fetched to decide whether the network is up
    #[arg(long, default_value = "https://www.google.com")]
    pub probe_url: String,

    #[arg(long, default_value_t = 5)]
    pub probe_timeout_secs: u64,

    /// Timeout for a single remote store request
    #[arg(long, default_value_t = 30)]
    pub store_timeout_secs: u64,

    #[arg(long, default_value_t = 60)]
    pub sync_interval_secs: u64,

    /// Local cache file (default: <data-dir>/chat_cache.json)
    #[arg(long)]
    pub cache_file: Option<PathBuf>,

    /// Log file (default: <data-dir>/chatbot.log)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Disable ANSI styling
    #[arg(long)]
    pub plain: bool,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.model_url)
            .with_context(|| format!("Invalid --model-url: {}", self.model_url))?;
        Url::parse(&self.probe_url)
            .with_context(|| format!("Invalid --probe-url: {}", self.probe_url))?;
        if let Some(url) = &self.supabase_url {
            Url::parse(url).with_context(|| format!("Invalid Supabase URL: {}", url))?;
        }
        if self.sync_interval_secs == 0 {
            bail!("--sync-interval-secs must be at least 1");
        }
        if self.probe_timeout_secs == 0 {
            bail!("--probe-timeout-secs must be at least 1");
        }
        Ok(())
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let base = dirs::data_dir().context("Failed to determine the platform data directory")?;
        Ok(base.join(APP_NAME))
    }

    pub fn cache_path(&self, data_dir: &Path) -> PathBuf {
        self.cache_file
            .clone()
            .unwrap_or_else(|| data_dir.join(CACHE_FILE))
    }

    pub fn log_path(&self, data_dir: &Path) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| data_dir.join(LOG_FILE))
    }

    pub fn sqlite_path(&self, data_dir: &Path) -> PathBuf {
        self.sqlite_path
            .clone()
            .unwrap_or_else(|| data_dir.join(SQLITE_FILE))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            base_url: self.model_url.clone(),
            model: self.model.clone(),
            api_key: self.model_api_key.clone(),
            system_prompt: self.system_prompt.clone(),
            temperature: self.temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec![APP_NAME];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--data-dir", "/tmp/chatline-test"]);
        assert_eq!(config.probe_timeout(), Duration::from_secs(5));
        assert_eq!(config.sync_interval(), Duration::from_secs(60));

        let dir = config.data_dir().unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/chatline-test"));
        assert_eq!(config.cache_path(&dir), dir.join("chat_cache.json"));
        assert_eq!(config.log_path(&dir), dir.join("chatbot.log"));
        assert_eq!(config.sqlite_path(&dir), dir.join("chats.db"));
    }

    #[test]
    fn test_overrides() {
        let config = parse(&[
            "--store",
            "sqlite",
            "--cache-file",
            "/var/tmp/queue.json",
            "--sync-interval-secs",
            "5",
            "--system-prompt",
            "Be brief.",
        ]);
        assert_eq!(config.store, StoreBackend::Sqlite);
        assert_eq!(
            config.cache_path(Path::new("/ignored")),
            PathBuf::from("/var/tmp/queue.json")
        );
        assert_eq!(config.sync_interval(), Duration::from_secs(5));
        assert_eq!(
            config.model_settings().system_prompt.as_deref(),
            Some("Be brief.")
        );
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let config = parse(&["--probe-url", "not a url"]);
        assert!(config.validate().is_err());

        let config = parse(&["--sync-interval-secs", "0"]);
        assert!(config.validate().is_err());
    }
}
