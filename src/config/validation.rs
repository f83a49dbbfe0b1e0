//! Configuration validation utilities and rules

use crate::{
    error::Result,
    models::{Config, ServerEndpoint},
};

/// Configuration validator producing soft warnings on top of `Config::validate`
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration with comprehensive checks
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_servers(&config.servers));
        warnings.extend(Self::validate_timing_settings(config));
        warnings.extend(Self::validate_transfer_sizes(config));

        Ok(warnings)
    }

    fn validate_servers(servers: &[ServerEndpoint]) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if servers.len() == 1 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Only one server configured; server probing has no alternatives".to_string(),
            ));
        }

        for server in servers {
            let Ok(parsed) = url::Url::parse(&server.url) else {
                continue;
            };

            if parsed.scheme() == "http" {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("Server '{}' uses HTTP instead of HTTPS", server.id),
                ));
            }

            if let Some(url::Host::Ipv4(ip)) = parsed.host() {
                if ip.is_private() || ip.is_loopback() {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Info,
                        format!("Server '{}' is on a private/local network; results reflect the LAN only", server.id),
                    ));
                }
            }

            if !parsed.path().is_empty() && parsed.path() != "/" {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("Server '{}' base URL includes path '{}'", server.id, parsed.path()),
                ));
            }
        }

        warnings
    }

    fn validate_timing_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.probe_timeout_ms < 250 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Probe timeout of {}ms may discard reachable servers", config.probe_timeout_ms),
            ));
        }

        if config.iteration_interval_secs == 0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "Iteration interval of 0s runs continuous tests back to back".to_string(),
            ));
        }

        if config.duration_minutes > 120 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Long continuous window of {} minutes", config.duration_minutes),
            ));
        }

        if config.timeout_seconds < 5 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Timeout of {}s may be too short for throughput measurements", config.timeout_seconds),
            ));
        }

        warnings
    }

    fn validate_transfer_sizes(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.download_bytes < 1_000_000 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Download size of {} bytes may not saturate the link", config.download_bytes),
            ));
        }

        if config.upload_bytes < 500_000 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Upload size of {} bytes may not saturate the link", config.upload_bytes),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        use colored::Colorize;

        let tag = format!("[{}]", self.level.as_str());
        let tag = if use_color {
            match self.level {
                ValidationLevel::Info => tag.blue().to_string(),
                ValidationLevel::Warning => tag.yellow().to_string(),
                ValidationLevel::Error => tag.red().to_string(),
            }
        } else {
            tag
        };
        format!("{} {}", tag, self.message)
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
