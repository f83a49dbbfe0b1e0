//! Configuration data model and validation

use crate::models::server::ServerEndpoint;
use crate::session::SessionTimings;
use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Endpoint returning the client's network identity
    #[serde(default = "default_meta_url")]
    pub meta_url: String,

    /// Servers offered to the server selector
    #[serde(default = "default_servers")]
    pub servers: Vec<ServerEndpoint>,

    /// Pause between ping samples
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    /// Pause between synthetic progress events
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Upper bound for one reachability probe
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Pause between continuous-test iterations
    #[serde(default = "default_iteration_interval_secs")]
    pub iteration_interval_secs: u64,

    /// Default continuous-test window
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u64,

    /// Number of servers returned by a server listing
    #[serde(default = "default_server_list_limit")]
    pub server_list_limit: usize,

    /// Bytes fetched by one download measurement
    #[serde(default = "default_download_bytes")]
    pub download_bytes: u64,

    /// Bytes sent by one upload measurement
    #[serde(default = "default_upload_bytes")]
    pub upload_bytes: u64,

    /// HTTP request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta_url: default_meta_url(),
            servers: default_servers(),
            ping_interval_ms: default_ping_interval_ms(),
            progress_interval_ms: default_progress_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            iteration_interval_secs: default_iteration_interval_secs(),
            duration_minutes: default_duration_minutes(),
            server_list_limit: default_server_list_limit(),
            download_bytes: default_download_bytes(),
            upload_bytes: default_upload_bytes(),
            timeout_seconds: default_timeout_secs(),
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Pacing and probing intervals the session runners use
    pub fn timings(&self) -> SessionTimings {
        SessionTimings {
            ping_interval: Duration::from_millis(self.ping_interval_ms),
            progress_interval: Duration::from_millis(self.progress_interval_ms),
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            iteration_interval: Duration::from_secs(self.iteration_interval_secs),
        }
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        match url::Url::parse(&self.meta_url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(_) => return Err(AppError::config(format!("Meta URL must use HTTP or HTTPS: {}", self.meta_url))),
            Err(e) => return Err(AppError::config(format!("Invalid meta URL '{}': {}", self.meta_url, e))),
        }

        if self.servers.is_empty() {
            return Err(AppError::config("At least one server must be configured"));
        }

        let mut seen = HashSet::new();
        for server in &self.servers {
            if server.id.trim().is_empty() {
                return Err(AppError::config("Server id cannot be empty"));
            }
            if !seen.insert(server.id.as_str()) {
                return Err(AppError::config(format!("Duplicate server id: {}", server.id)));
            }
            match url::Url::parse(&server.url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                Ok(_) => return Err(AppError::config(format!("Server URL must use HTTP or HTTPS: {}", server.url))),
                Err(e) => return Err(AppError::config(format!("Invalid server URL '{}': {}", server.url, e))),
            }
            if !server.distance_km.is_finite() || server.distance_km < 0.0 {
                return Err(AppError::config(format!("Invalid distance for server {}: {}", server.id, server.distance_km)));
            }
        }

        if self.probe_timeout_ms == 0 || self.probe_timeout_ms > 30_000 {
            return Err(AppError::config("Probe timeout must be between 1 and 30000 milliseconds"));
        }

        if self.duration_minutes == 0 {
            return Err(AppError::config("Duration must be greater than 0 minutes"));
        }

        if self.duration_minutes > 1440 {
            return Err(AppError::config("Duration cannot exceed 1440 minutes"));
        }

        if self.server_list_limit == 0 {
            return Err(AppError::config("Server list limit must be greater than 0"));
        }

        if self.download_bytes == 0 || self.upload_bytes == 0 {
            return Err(AppError::config("Transfer sizes must be greater than 0"));
        }

        if self.timeout_seconds == 0 {
            return Err(AppError::config("Timeout must be greater than 0"));
        }

        if self.timeout_seconds > 300 {
            return Err(AppError::config("Timeout cannot exceed 300 seconds"));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        self.merge_from_lookup(|key| std::env::var(key).ok())
    }

    /// Merge settings from any key/value source using the environment variable names
    pub fn merge_from_lookup<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(meta_url) = lookup("SPEED_META_URL") {
            self.meta_url = meta_url.trim().to_string();
        }

        if let Some(path) = lookup("SPEED_SERVERS_FILE") {
            self.servers = load_servers_file(Path::new(path.trim()))?;
        }

        parse_var(&lookup, "PING_INTERVAL_MS", &mut self.ping_interval_ms)?;
        parse_var(&lookup, "PROGRESS_INTERVAL_MS", &mut self.progress_interval_ms)?;
        parse_var(&lookup, "PROBE_TIMEOUT_MS", &mut self.probe_timeout_ms)?;
        parse_var(&lookup, "ITERATION_INTERVAL_SECS", &mut self.iteration_interval_secs)?;
        parse_var(&lookup, "DURATION_MINUTES", &mut self.duration_minutes)?;
        parse_var(&lookup, "SERVER_LIST_LIMIT", &mut self.server_list_limit)?;
        parse_var(&lookup, "DOWNLOAD_BYTES", &mut self.download_bytes)?;
        parse_var(&lookup, "UPLOAD_BYTES", &mut self.upload_bytes)?;
        parse_var(&lookup, "TIMEOUT_SECONDS", &mut self.timeout_seconds)?;
        parse_var(&lookup, "ENABLE_COLOR", &mut self.enable_color)?;

        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, raw, e)))?;
    }
    Ok(())
}

/// Load a JSON array of server endpoints
pub fn load_servers_file(path: &Path) -> Result<Vec<ServerEndpoint>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::config(format!("Failed to read servers file {}: {}", path.display(), e)))?;
    let servers: Vec<ServerEndpoint> = serde_json::from_str(&content)
        .map_err(|e| AppError::config(format!("Invalid servers file {}: {}", path.display(), e)))?;
    Ok(servers)
}

// Default value functions for serde
fn default_meta_url() -> String {
    crate::defaults::DEFAULT_META_URL.to_string()
}

fn default_servers() -> Vec<ServerEndpoint> {
    vec![ServerEndpoint {
        id: crate::defaults::DEFAULT_SERVER_ID.to_string(),
        sponsor: "Cloudflare".to_string(),
        name: "Anycast".to_string(),
        country: "Global".to_string(),
        distance_km: 0.0,
        url: crate::defaults::DEFAULT_SERVER_URL.to_string(),
    }]
}

fn default_ping_interval_ms() -> u64 {
    crate::defaults::DEFAULT_PING_INTERVAL.as_millis() as u64
}

fn default_progress_interval_ms() -> u64 {
    crate::defaults::DEFAULT_PROGRESS_INTERVAL.as_millis() as u64
}

fn default_probe_timeout_ms() -> u64 {
    crate::defaults::DEFAULT_PROBE_TIMEOUT.as_millis() as u64
}

fn default_iteration_interval_secs() -> u64 {
    crate::defaults::DEFAULT_ITERATION_INTERVAL.as_secs()
}

fn default_duration_minutes() -> u64 {
    crate::defaults::DEFAULT_DURATION_MINUTES
}

fn default_server_list_limit() -> usize {
    crate::defaults::DEFAULT_SERVER_LIST_LIMIT
}

fn default_download_bytes() -> u64 {
    crate::defaults::DEFAULT_DOWNLOAD_BYTES
}

fn default_upload_bytes() -> u64 {
    crate::defaults::DEFAULT_UPLOAD_BYTES
}

fn default_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_TIMEOUT.as_secs()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
