use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const ENV_PREFIX: &str = "LEDGER_SYNC_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    pub request_timeout: u64,
    pub expense_path: String,
    pub trip_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync_on_reconnect: bool,
    pub sync_on_startup: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: default_database_url(),
                max_connections: 5,
                connection_timeout: 30,
            },
            remote: RemoteConfig {
                base_url: "http://localhost:3000".to_string(),
                request_timeout: 30,
                expense_path: "/api/expenses".to_string(),
                trip_path: "/api/trips".to_string(),
            },
            sync: SyncConfig {
                auto_sync_on_reconnect: true,
                sync_on_startup: true,
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from defaults overridden by `LEDGER_SYNC_*` keys resolved through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("DATABASE_URL") {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                cfg.database.url = trimmed.to_string();
            }
        }
        if let Some(v) = var("DATABASE_MAX_CONNECTIONS")
            && let Some(value) = parse_u32(&v)
        {
            cfg.database.max_connections = value;
        }
        if let Some(v) = var("DATABASE_TIMEOUT_SECONDS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.database.connection_timeout = value;
        }

        if let Some(v) = var("REMOTE_BASE_URL") {
            let trimmed = v.trim().trim_end_matches('/');
            if !trimmed.is_empty() {
                cfg.remote.base_url = trimmed.to_string();
            }
        }
        if let Some(v) = var("REMOTE_TIMEOUT_SECONDS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.remote.request_timeout = value;
        }
        if let Some(v) = var("REMOTE_EXPENSE_PATH") {
            cfg.remote.expense_path = v.trim().to_string();
        }
        if let Some(v) = var("REMOTE_TRIP_PATH") {
            cfg.remote.trip_path = v.trim().to_string();
        }

        if let Some(v) = var("AUTO_SYNC_ON_RECONNECT") {
            cfg.sync.auto_sync_on_reconnect = parse_bool(&v, cfg.sync.auto_sync_on_reconnect);
        }
        if let Some(v) = var("SYNC_ON_STARTUP") {
            cfg.sync.sync_on_startup = parse_bool(&v, cfg.sync.sync_on_startup);
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.url.trim().is_empty() {
            return Err("Database url must not be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if !(self.remote.base_url.starts_with("http://")
            || self.remote.base_url.starts_with("https://"))
        {
            return Err("Remote base_url must start with http:// or https://".to_string());
        }
        if self.remote.request_timeout == 0 {
            return Err("Remote request_timeout must be greater than 0".to_string());
        }
        for (label, path) in [
            ("expense_path", &self.remote.expense_path),
            ("trip_path", &self.remote.trip_path),
        ] {
            if !path.starts_with('/') {
                return Err(format!("Remote {label} must start with '/'"));
            }
        }
        Ok(())
    }
}

fn default_database_url() -> String {
    let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("./data"));
    let path = base.join("ledger-sync").join("outbox.db");
    format!("sqlite://{}?mode=rwc", path.display())
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn parse_u32(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok()
}
