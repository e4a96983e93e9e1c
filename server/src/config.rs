//! Configuration management for the server.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection URL of the remote store
    pub remote_database_url: String,
    /// Where the local cache snapshot lives
    pub cache_path: PathBuf,
    /// Current user, for notification scoping
    pub user_id: String,
    /// Sync pass tuning
    pub sync: SyncConfig,
    /// How long a snooze lasts
    pub snooze: Duration,
    /// Size of the notification history list
    pub notification_history_limit: usize,
}

/// The part of the configuration the sync passes read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Period of the background delta timer
    pub interval: Duration,
    /// Rows per bootstrap batch
    pub bootstrap_batch_size: usize,
    /// Ids per repair re-fetch batch
    pub repair_batch_size: usize,
    /// Run a repair pass once per session on startup
    pub repair_on_startup: bool,
    /// Remove cached jobs that no longer exist remotely during repair
    pub prune_deleted: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            bootstrap_batch_size: 1000,
            repair_batch_size: 100,
            repair_on_startup: true,
            prune_deleted: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "4310".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let remote_database_url =
            env::var("REMOTE_DATABASE_URL").map_err(|_| ConfigError::Missing("REMOTE_DATABASE_URL"))?;

        let user_id = env::var("USER_ID").map_err(|_| ConfigError::Missing("USER_ID"))?;

        let cache_path = env::var("CACHE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("jobsync-cache.json"));

        let defaults = SyncConfig::default();
        let sync = SyncConfig {
            interval: Duration::from_secs(positive("SYNC_INTERVAL_SECS", 30)?),
            bootstrap_batch_size: positive("BOOTSTRAP_BATCH_SIZE", defaults.bootstrap_batch_size)?,
            repair_batch_size: positive("REPAIR_BATCH_SIZE", defaults.repair_batch_size)?,
            repair_on_startup: var_or("REPAIR_ON_STARTUP", defaults.repair_on_startup)?,
            prune_deleted: var_or("PRUNE_DELETED", defaults.prune_deleted)?,
        };

        Ok(Self {
            host,
            port,
            remote_database_url,
            cache_path,
            user_id,
            sync,
            snooze: Duration::from_secs(60 * positive::<u64>("SNOOZE_MINUTES", 15)?),
            notification_history_limit: positive("NOTIFICATION_HISTORY_LIMIT", 50)?,
        })
    }
}

/// Read an optional variable, falling back to `default` when unset.
fn var_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

/// Like [`var_or`], rejecting zero.
fn positive<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialEq + Default + ToString,
{
    let value = var_or(name, default)?;
    if value == T::default() {
        return Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        });
    }
    Ok(value)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}
