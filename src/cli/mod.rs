//! Command-line interface definition

use clap::Parser;
use std::path::PathBuf;

/// Network Speed Monitor - ping, jitter, download and upload tests with live progress
#[derive(Parser, Debug, Clone)]
#[command(name = "nsm")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Repeat tests over a time window and report stability
    #[arg(long)]
    pub continuous: bool,

    /// Continuous test window in minutes
    #[arg(short, long, value_name = "MIN", value_parser = parse_minutes, requires = "continuous")]
    pub duration: Option<u64>,

    /// Pause between continuous iterations in seconds
    #[arg(long, value_name = "SECS", value_parser = parse_interval, requires = "continuous")]
    pub interval: Option<u64>,

    /// Measure against this server id instead of probing for the fastest
    #[arg(short, long, value_name = "ID")]
    pub server: Option<String>,

    /// List candidate servers ordered by distance and exit
    #[arg(long, conflicts_with_all = ["continuous", "server"])]
    pub list_servers: bool,

    /// Number of servers shown by --list-servers
    #[arg(long, value_name = "N", value_parser = parse_limit, requires = "list_servers")]
    pub limit: Option<usize>,

    /// Session id used for events (random if omitted)
    #[arg(long, value_name = "ID")]
    pub session_id: Option<String>,

    /// JSON file with the server list
    #[arg(long, value_name = "PATH")]
    pub servers_file: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(short, long, value_name = "SECS", value_parser = parse_timeout)]
    pub timeout: Option<u64>,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts clap cannot express
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if let Some(id) = &self.session_id {
            if id.trim().is_empty() {
                return Err("--session-id cannot be empty".to_string());
            }
        }

        if let Some(server) = &self.server {
            if server.trim().is_empty() {
                return Err("--server cannot be empty".to_string());
            }
        }

        Ok(())
    }

    /// Session id to use, generating one when none was given
    pub fn session_id(&self) -> String {
        self.session_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.json {
            false
        } else if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }

    /// Get configuration summary for display
    pub fn get_config_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("Configuration Summary:\n");
        summary.push_str(&format!(
            "  Mode: {}\n",
            if self.list_servers {
                "list servers"
            } else if self.continuous {
                "continuous"
            } else {
                "single"
            }
        ));
        if let Some(duration) = self.duration {
            summary.push_str(&format!("  Duration: {} min\n", duration));
        }
        if let Some(server) = &self.server {
            summary.push_str(&format!("  Server: {}\n", server));
        }
        if let Some(timeout) = self.timeout {
            summary.push_str(&format!("  Timeout: {}s\n", timeout));
        }
        summary.push_str(&format!("  JSON output: {}\n", self.json));
        summary.push_str(&format!("  Colored output: {}\n", self.use_colors()));
        summary.push_str(&format!("  Verbose mode: {}\n", self.verbose));
        summary.push_str(&format!("  Debug mode: {}\n", self.debug));

        summary
    }
}

fn parse_bounded(s: &str, what: &str, min: u64, max: u64) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid {}: {}", what, s));
    }

    let value = s
        .parse::<u64>()
        .map_err(|_| format!("Invalid {}: {}", what, s))?;

    if value < min || value > max {
        return Err(format!("{} must be between {} and {}", what, min, max));
    }
    Ok(value)
}

/// Continuous window in minutes (1-1440)
fn parse_minutes(s: &str) -> Result<u64, String> {
    parse_bounded(s, "duration", 1, 1440)
}

/// Iteration pause in seconds (0-3600)
fn parse_interval(s: &str) -> Result<u64, String> {
    parse_bounded(s, "interval", 0, 3600)
}

/// Request timeout in seconds (1-300)
fn parse_timeout(s: &str) -> Result<u64, String> {
    parse_bounded(s, "timeout", 1, 300)
}

fn parse_limit(s: &str) -> Result<usize, String> {
    parse_bounded(s, "limit", 1, 1000).map(|v| v as usize)
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
