//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::Result,
    models::{config::load_servers_file, Config},
};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    ///
    /// Layers, lowest to highest: defaults, `.env`, environment, CLI.
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        EnvManager::load_env_file(self.cli.debug)?;
        config.merge_from_env()?;

        self.apply_cli_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    /// Build configuration without touching `.env` or the process environment
    pub fn parse_without_env(&self) -> Result<Config> {
        let mut config = Config::default();
        self.apply_cli_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_cli_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(path) = &self.cli.servers_file {
            config.servers = load_servers_file(path)?;
        }

        if let Some(timeout) = self.cli.timeout {
            config.timeout_seconds = timeout;
        }

        if let Some(duration) = self.cli.duration {
            config.duration_minutes = duration;
        }

        if let Some(interval) = self.cli.interval {
            config.iteration_interval_secs = interval;
        }

        if let Some(limit) = self.cli.limit {
            config.server_list_limit = limit;
        }

        if self.cli.no_color || self.cli.json {
            config.enable_color = false;
        } else if self.cli.color {
            config.enable_color = true;
        }

        // CLI-only flags
        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
            eprintln!(
                "Final config: servers={}, duration={}min, interval={}s, timeout={}s",
                config.servers.len(),
                config.duration_minutes,
                config.iteration_interval_secs,
                config.timeout_seconds
            );
        }

        Ok(())
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Meta URL: {}", config.meta_url));
    summary.push(format!(
        "Servers: {}",
        config
            .servers
            .iter()
            .map(|s| s.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    ));
    summary.push(format!("Duration: {} min", config.duration_minutes));
    summary.push(format!("Iteration interval: {}s", config.iteration_interval_secs));
    summary.push(format!("Probe timeout: {}ms", config.probe_timeout_ms));
    summary.push(format!("Timeout: {}s", config.timeout_seconds));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "nsm",
            "--continuous",
            "--duration",
            "3",
            "--interval",
            "0",
            "--timeout",
            "5",
            "--no-color",
            "--verbose",
        ]);
        let config = ConfigParser::new(cli).parse_without_env().unwrap();

        assert_eq!(config.duration_minutes, 3);
        assert_eq!(config.iteration_interval_secs, 0);
        assert_eq!(config.timeout_seconds, 5);
        assert!(!config.enable_color);
        assert!(config.verbose);
        assert!(!config.debug);
    }

    #[test]
    fn test_json_disables_color() {
        let cli = Cli::parse_from(["nsm", "--json"]);
        let config = ConfigParser::new(cli).parse_without_env().unwrap();
        assert!(!config.enable_color);
    }

    #[test]
    fn test_servers_file_override() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":"lan","sponsor":"Home","name":"Lab","country":"NL","distance_km":0.1,"url":"http://192.168.1.10:8080"}}]"#
        )
        .unwrap();

        let path = file.path().to_string_lossy().to_string();
        let cli = Cli::parse_from(["nsm", "--servers-file", path.as_str()]);
        let config = ConfigParser::new(cli).parse_without_env().unwrap();

        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.servers[0].id, "lan");
    }

    #[test]
    fn test_invalid_servers_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let path = file.path().to_string_lossy().to_string();
        let cli = Cli::parse_from(["nsm", "--servers-file", path.as_str()]);
        assert!(ConfigParser::new(cli).parse_without_env().is_err());
    }

    #[test]
    fn test_config_summary() {
        let summary = display_config_summary(&Config::default());
        assert!(summary.contains("Meta URL:"));
        assert!(summary.contains("Servers: cloudflare"));
        assert!(summary.contains("Duration: 10 min"));
    }
}
