use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::storage::file::{Config, FileIoWithBackup};
use crate::utils::backoff::ReconnectPolicy;

/// Client configuration, loaded from `config.json` next to the binary (a
/// default file is written on first run). Immutable for the lifetime of the
/// process and passed into components by `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the REST backend.
    pub base_url: String,
    /// Websocket URL of the push channel.
    pub push_url: String,
    /// Per-request timeout for the REST client, in seconds.
    pub request_timeout_secs: u64,
    /// Directory for persisted state (session, layout preferences).
    pub storage_dir: PathBuf,
    pub reconnect: ReconnectPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".into(),
            push_url: "ws://127.0.0.1:8080/ws".into(),
            request_timeout_secs: 30,
            storage_dir: PathBuf::from(".mcdash"),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl FileIoWithBackup for AppConfig {}
impl Config for AppConfig {
    type ConfigType = AppConfig;
}

impl AppConfig {
    pub fn load() -> anyhow::Result<AppConfig> {
        Self::load_config_or_default("config.json", Self::default)
    }
}
