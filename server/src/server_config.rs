use config::{Config, ConfigError};
use lazy_static::lazy_static;
use serde::Deserialize;
use std::{env, path::Path, result::Result};

/// OAuth application credentials for the Gmail provider.
#[derive(Debug, Deserialize)]
pub struct GmailConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: String,
    pub scopes: Vec<String>,
}

impl GmailConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        builder.try_deserialize()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Max message ids pulled per cycle. Overflow is picked up next cycle.
    pub batch_cap: u32,
    /// Concurrent full-message fetches inside one cycle.
    pub fetch_concurrency: usize,
    /// Wall-clock budget for one poll cycle, in seconds.
    pub cycle_budget_secs: u64,
    /// Window polled when a mailbox has never synced before.
    pub first_sync_lookback_hours: i64,
    /// Prefix for every label this service creates, e.g. `Mailroom`.
    pub label_namespace: String,
    /// Tokens are refreshed this many seconds before their stated expiry.
    pub token_expiry_leeway_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Confidence at or above which eligible categories auto-execute.
    pub auto_execute_confidence: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    sync: SyncConfig,
    classifier: ClassifierConfig,
    server: HostConfig,
}

#[derive(Debug)]
pub struct ServerConfig {
    pub sync: SyncConfig,
    pub classifier: ClassifierConfig,
    pub server: HostConfig,
    pub gmail_config: GmailConfig,
}

lazy_static! {
    pub static ref cfg: ServerConfig = {
        let root = env::var("APP_DIR").unwrap_or_else(|_| {
            let dir =
                env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR or APP_DIR is required");
            let dir = Path::new(&dir).parent().unwrap().display().to_string();
            format!("{}/config", dir)
        });

        let path = format!("{root}/client_secret.toml");
        let mut gmail_config =
            GmailConfig::from_file(&path).expect("client_secret.toml is required");
        if let Ok(client_id) = env::var("GMAIL_CLIENT_ID") {
            gmail_config.client_id = client_id;
        }
        if let Ok(client_secret) = env::var("GMAIL_CLIENT_SECRET") {
            gmail_config.client_secret = client_secret;
        }

        let path = format!("{root}/config.toml");
        let cfg_file: ConfigFile = Config::builder()
            .add_source(config::File::with_name(&path))
            .add_source(config::Environment::with_prefix("MAILROOM").separator("__"))
            .build()
            .expect("config.toml is required")
            .try_deserialize()
            .expect("config.toml is invalid");

        let ConfigFile {
            sync,
            classifier,
            server,
        } = cfg_file;

        ServerConfig {
            sync,
            classifier,
            server,
            gmail_config,
        }
    };
}
