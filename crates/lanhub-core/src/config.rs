//! Configuration system for LanHub.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $LANHUB_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/lanhub/config.toml
//!   3. ~/.config/lanhub/config.toml

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub server: ServerConfig,
    pub network: NetworkConfig,
    pub limits: LimitsConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Identifier returned by `/name`.
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub bind_address: IpAddr,
    /// TCP port for the command protocol. 0 = OS-assigned.
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Concurrent sessions admitted before "Server full".
    pub max_sessions: usize,
    /// Seconds without an inbound line before the watchdog disconnects.
    pub idle_timeout_secs: u64,
    /// Seconds between watchdog checks.
    pub idle_check_interval_secs: u64,
    /// Longest accepted inbound line. Upload payloads count against this.
    pub max_line_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the shared file store.
    pub files_dir: PathBuf,
    /// Append log of every received line.
    pub message_log: PathBuf,
    /// Rewritten on every operator STATS request.
    pub stats_report: PathBuf,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "LanHub Server".to_string(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_sessions: 4,
            idle_timeout_secs: 60,
            idle_check_interval_secs: 10,
            max_line_bytes: 16 * 1024 * 1024, // 16 MiB
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            files_dir: data_dir().join("files"),
            message_log: data_dir().join("messages_log.txt"),
            stats_report: data_dir().join("server_stats.txt"),
        }
    }
}

impl NetworkConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

impl LimitsConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn idle_check_interval(&self) -> Duration {
        // A zero period would make tokio's interval panic.
        Duration::from_secs(self.idle_check_interval_secs.max(1))
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("lanhub")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("lanhub")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl HubConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            HubConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("LANHUB_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&HubConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply LANHUB_* overrides. `lookup` is `std::env::var` outside of tests.
    /// Unparseable values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("LANHUB_SERVER__NAME") {
            self.server.name = v;
        }
        if let Some(Ok(addr)) = lookup("LANHUB_NETWORK__BIND_ADDRESS").map(|v| v.parse()) {
            self.network.bind_address = addr;
        }
        if let Some(Ok(p)) = lookup("LANHUB_NETWORK__PORT").map(|v| v.parse()) {
            self.network.port = p;
        }
        if let Some(Ok(n)) = lookup("LANHUB_LIMITS__MAX_SESSIONS").map(|v| v.parse()) {
            self.limits.max_sessions = n;
        }
        if let Some(Ok(n)) = lookup("LANHUB_LIMITS__IDLE_TIMEOUT_SECS").map(|v| v.parse()) {
            self.limits.idle_timeout_secs = n;
        }
        if let Some(Ok(n)) = lookup("LANHUB_LIMITS__IDLE_CHECK_INTERVAL_SECS").map(|v| v.parse()) {
            self.limits.idle_check_interval_secs = n;
        }
        if let Some(Ok(n)) = lookup("LANHUB_LIMITS__MAX_LINE_BYTES").map(|v| v.parse()) {
            self.limits.max_line_bytes = n;
        }
        if let Some(v) = lookup("LANHUB_STORAGE__FILES_DIR") {
            self.storage.files_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("LANHUB_STORAGE__MESSAGE_LOG") {
            self.storage.message_log = PathBuf::from(v);
        }
        if let Some(v) = lookup("LANHUB_STORAGE__STATS_REPORT") {
            self.storage.stats_report = PathBuf::from(v);
        }
    }

    /// Point every storage path inside `root`. Used by tests and ad-hoc runs.
    pub fn with_storage_root(mut self, root: &std::path::Path) -> Self {
        self.storage.files_dir = root.join("files");
        self.storage.message_log = root.join("messages_log.txt");
        self.storage.stats_report = root.join("server_stats.txt");
        self
    }
}
