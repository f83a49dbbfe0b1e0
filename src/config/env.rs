//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        if Path::new(".env").exists() {
            dotenv::from_filename(".env")
                .map_err(|e| AppError::config(format!("Failed to load .env file: {}", e)))?;

            if debug {
                eprintln!("Loaded configuration from .env file");
            }
        } else if debug {
            eprintln!("No .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# Network Speed Monitor Configuration
#
# Values here act as defaults and can be overridden by command-line arguments.

# Endpoint returning the client's IP, ISP and country as JSON
# SPEED_META_URL=https://speed.cloudflare.com/meta

# JSON file with the server list (array of {id, sponsor, name, country, distance_km, url})
# SPEED_SERVERS_FILE=servers.json

# Pause between ping samples and between progress events (milliseconds)
# PING_INTERVAL_MS=100
# PROGRESS_INTERVAL_MS=100

# Upper bound for one server reachability probe (milliseconds)
# PROBE_TIMEOUT_MS=2000

# Continuous test window (minutes) and pause between iterations (seconds)
# DURATION_MINUTES=10
# ITERATION_INTERVAL_SECS=10

# Number of servers shown by --list-servers
# SERVER_LIST_LIMIT=20

# Transfer sizes (bytes)
# DOWNLOAD_BYTES=10000000
# UPLOAD_BYTES=5000000

# Request timeout in seconds
# TIMEOUT_SECONDS=30

# Enable colored output (true/false)
# ENABLE_COLOR=true
"#
        .to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        std::fs::write(path, Self::create_example_env_content())
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))?;
        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "SPEED_META_URL" => {
                url::Url::parse(value)
                    .map_err(|e| AppError::config(format!("Invalid SPEED_META_URL '{}': {}", value, e)))?;
            }
            "SPEED_SERVERS_FILE" => {
                if value.trim().is_empty() {
                    return Err(AppError::config("SPEED_SERVERS_FILE cannot be empty"));
                }
            }
            "PING_INTERVAL_MS" | "PROGRESS_INTERVAL_MS" => {
                Self::check_range(key, value, 0, 10_000)?;
            }
            "PROBE_TIMEOUT_MS" => {
                Self::check_range(key, value, 1, 30_000)?;
            }
            "DURATION_MINUTES" => {
                Self::check_range(key, value, 1, 1440)?;
            }
            "ITERATION_INTERVAL_SECS" => {
                Self::check_range(key, value, 0, 3600)?;
            }
            "SERVER_LIST_LIMIT" | "DOWNLOAD_BYTES" | "UPLOAD_BYTES" => {
                Self::check_range(key, value, 1, u64::MAX)?;
            }
            "TIMEOUT_SECONDS" => {
                Self::check_range(key, value, 1, 300)?;
            }
            "ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {}
        }

        Ok(())
    }

    fn check_range(key: &str, value: &str, min: u64, max: u64) -> Result<()> {
        let parsed: u64 = value
            .parse()
            .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
        if parsed < min || parsed > max {
            return Err(AppError::config(format!(
                "{} must be between {} and {}, got: {}",
                key, min, max, parsed
            )));
        }
        Ok(())
    }

    /// Supported environment variables with descriptions and examples
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("SPEED_META_URL", "Client identity endpoint", "https://speed.cloudflare.com/meta"),
            ("SPEED_SERVERS_FILE", "JSON server list file", "servers.json"),
            ("PING_INTERVAL_MS", "Pause between ping samples (ms)", "100"),
            ("PROGRESS_INTERVAL_MS", "Pause between progress events (ms)", "100"),
            ("PROBE_TIMEOUT_MS", "Server probe timeout (ms)", "2000"),
            ("DURATION_MINUTES", "Continuous test window (1-1440)", "10"),
            ("ITERATION_INTERVAL_SECS", "Pause between continuous iterations", "10"),
            ("SERVER_LIST_LIMIT", "Servers shown by --list-servers", "20"),
            ("DOWNLOAD_BYTES", "Bytes per download measurement", "10000000"),
            ("UPLOAD_BYTES", "Bytes per upload measurement", "5000000"),
            ("TIMEOUT_SECONDS", "Request timeout in seconds (1-300)", "30"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<24} {}\n", var, description));
            help.push_str(&format!("  {:<24} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(name, _, _)| {
                let value = std::env::var(name).ok()?;
                Self::validate_env_var(name, &value)
                    .err()
                    .map(|e| format!("Warning: {}", e))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_example_content_lists_every_variable() {
        let content = EnvManager::create_example_env_content();
        for (name, _, _) in EnvManager::get_supported_env_vars() {
            assert!(content.contains(&format!("{}=", name)), "missing {}", name);
        }
    }

    #[test]
    fn test_save_example_file() {
        let temp_file = NamedTempFile::new().unwrap();
        EnvManager::save_example_env_file(temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("Network Speed Monitor Configuration"));
    }

    #[test]
    fn test_validate_env_var() {
        assert!(EnvManager::validate_env_var("SPEED_META_URL", "https://speed.example.com/meta").is_ok());
        assert!(EnvManager::validate_env_var("DURATION_MINUTES", "10").is_ok());
        assert!(EnvManager::validate_env_var("ITERATION_INTERVAL_SECS", "0").is_ok());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "false").is_ok());
        assert!(EnvManager::validate_env_var("UNRELATED", "whatever").is_ok());

        assert!(EnvManager::validate_env_var("SPEED_META_URL", "not-a-url").is_err());
        assert!(EnvManager::validate_env_var("DURATION_MINUTES", "0").is_err());
        assert!(EnvManager::validate_env_var("PROBE_TIMEOUT_MS", "30001").is_err());
        assert!(EnvManager::validate_env_var("TIMEOUT_SECONDS", "301").is_err());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "maybe").is_err());
    }

    #[test]
    fn test_display_env_help() {
        let help = EnvManager::display_env_help();
        assert!(help.contains("Supported Environment Variables:"));
        assert!(help.contains("ITERATION_INTERVAL_SECS"));
        assert!(help.contains("Configuration Priority"));
    }
}
