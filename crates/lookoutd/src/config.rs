use std::path::PathBuf;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Base URL of the event-store service.
    pub store_url: String,
    /// API key sent as `apikey` header and bearer token.
    pub store_key: String,
    /// Table holding location events.
    pub store_table: String,
    /// Timeout in seconds for each store call.
    pub store_timeout_secs: u64,
    /// Seconds between classifier poll cycles.
    pub poll_interval_secs: u64,
    /// Same-location events within this many seconds collapse into one
    /// visit step.
    pub proximity_secs: i64,
    /// Anomalous identities' events are evicted once their newest event is
    /// older than this.
    pub anomalous_retention_secs: i64,
    /// Where the suspicious audit list is flushed on shutdown.
    pub audit_path: PathBuf,
}

impl Config {
    /// Load configuration from `LOOKOUT_*` environment variables with
    /// defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("lookout");

        Self {
            store_url: std::env::var("LOOKOUT_STORE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            store_key: std::env::var("LOOKOUT_STORE_KEY").unwrap_or_default(),
            store_table: std::env::var("LOOKOUT_STORE_TABLE")
                .unwrap_or_else(|_| "security_system".to_string()),
            store_timeout_secs: env_u64("LOOKOUT_STORE_TIMEOUT_SECS", 10),
            poll_interval_secs: env_u64("LOOKOUT_POLL_INTERVAL_SECS", 5),
            proximity_secs: env_i64("LOOKOUT_PROXIMITY_SECS", 15),
            anomalous_retention_secs: env_i64("LOOKOUT_ANOMALOUS_RETENTION_SECS", 600),
            audit_path: std::env::var("LOOKOUT_AUDIT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_dir.join("suspicious.json")),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
