//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Opaque, caller-supplied session identifier
pub type SessionId = String;

/// Kind of measurement session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    /// One measurement pass
    Single,
    /// Repeated passes over a time window
    Continuous,
}

impl TestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestKind::Single => "single",
            TestKind::Continuous => "continuous",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a registered session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Runner task is executing
    Running,
    /// Runner finished and produced a terminal result
    Completed,
    /// Runner finished without any successful result
    Errored,
    /// Session was removed by a stop request
    Removed,
}

impl SessionState {
    /// Whether the state is terminal
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Running => "running",
            SessionState::Completed => "completed",
            SessionState::Errored => "errored",
            SessionState::Removed => "removed",
        }
    }
}

/// Kind tag carried by a test result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Final,
    Error,
}

/// Overall connection rating derived from one result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionQuality {
    /// Ping <= 20ms and average throughput >= 100 Mbps
    Excellent,
    /// Ping <= 50ms and average throughput >= 50 Mbps
    Good,
    /// Anything else
    Poor,
}

impl ConnectionQuality {
    /// Rate a connection from ping (ms) and download/upload (Mbps)
    pub fn from_metrics(ping: f64, download: f64, upload: f64) -> Self {
        let avg_speed = (download + upload) / 2.0;
        if ping <= 20.0 && avg_speed >= 100.0 {
            Self::Excellent
        } else if ping <= 50.0 && avg_speed >= 50.0 {
            Self::Good
        } else {
            Self::Poor
        }
    }

    /// Rate a latency value on its own
    pub fn for_ping(ping: f64) -> Self {
        if ping <= 20.0 {
            Self::Excellent
        } else if ping <= 50.0 {
            Self::Good
        } else {
            Self::Poor
        }
    }

    /// Rate a throughput value (Mbps) on its own
    pub fn for_throughput(mbps: f64) -> Self {
        if mbps >= 100.0 {
            Self::Excellent
        } else if mbps >= 50.0 {
            Self::Good
        } else {
            Self::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "EXCELLENT",
            Self::Good => "GOOD",
            Self::Poor => "POOR",
        }
    }
}
