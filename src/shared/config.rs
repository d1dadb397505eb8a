use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RealtimeMode {
    /// One underlying subscription per channel name, multiplexed across
    /// registrations (embedded runtime).
    #[default]
    Managed,
    /// Each registration owns an independent subscription (hosted web).
    Direct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub realtime: RealtimeConfig,
    pub storage: StorageConfig,
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
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    /// Interval of the periodic maintenance pass (seconds).
    pub sync_interval: u64,
    /// Failed records are re-dispatched at most this many times before
    /// being left in place for operator action.
    pub max_retry: u32,
    pub remote_timeout_ms: u64,
    /// Synced records older than this are garbage collected (seconds).
    pub retention_window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    #[serde(default)]
    pub mode: RealtimeMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/innkeep.db".to_string(),
                max_connections: 5,
                connection_timeout: 30,
            },
            remote: RemoteConfig {
                base_url: "https://api.innkeep.app".to_string(),
                request_timeout_ms: 10_000,
            },
            sync: SyncConfig {
                auto_sync: true,
                sync_interval: 300, // 5 minutes
                max_retry: 3,
                remote_timeout_ms: 10_000,
                retention_window_secs: 7 * 24 * 3600, // 1 week
            },
            realtime: RealtimeConfig {
                mode: RealtimeMode::Managed,
            },
            storage: StorageConfig {
                data_dir: "./data".to_string(),
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("INNKEEP_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v;
            }
        }
        if let Ok(v) = std::env::var("INNKEEP_REMOTE_BASE_URL") {
            if !v.trim().is_empty() {
                cfg.remote.base_url = v;
            }
        }
        if let Ok(v) = std::env::var("INNKEEP_REMOTE_TIMEOUT_MS") {
            if let Some(value) = parse_u64(&v) {
                cfg.remote.request_timeout_ms = value.max(1);
                cfg.sync.remote_timeout_ms = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("INNKEEP_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Ok(v) = std::env::var("INNKEEP_SYNC_INTERVAL") {
            if let Some(value) = parse_u64(&v) {
                cfg.sync.sync_interval = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("INNKEEP_SYNC_MAX_RETRY") {
            if let Some(value) = parse_u32(&v) {
                cfg.sync.max_retry = value;
            }
        }
        if let Ok(v) = std::env::var("INNKEEP_RETENTION_WINDOW_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.sync.retention_window_secs = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("INNKEEP_REALTIME_MODE") {
            match v.trim().to_ascii_lowercase().as_str() {
                "managed" => cfg.realtime.mode = RealtimeMode::Managed,
                "direct" => cfg.realtime.mode = RealtimeMode::Direct,
                _ => {}
            }
        }
        if let Ok(v) = std::env::var("INNKEEP_DATA_DIR") {
            if !v.trim().is_empty() {
                cfg.storage.data_dir = v;
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.remote.base_url.trim().is_empty() {
            return Err("Remote base_url must not be empty".to_string());
        }
        if self.sync.remote_timeout_ms == 0 {
            return Err("Sync remote_timeout_ms must be greater than 0".to_string());
        }
        if self.sync.retention_window_secs == 0 {
            return Err("Sync retention_window_secs must be greater than 0".to_string());
        }
        Ok(())
    }
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
