//! Network Speed Monitor
//!
//! Orchestrates network speed-test sessions: selects a measurement server,
//! runs ping, download and upload measurements while streaming progress
//! events, and aggregates repeated runs into stability reports.

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod output;
pub mod provider;
pub mod session;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use events::{ChannelSink, EventSink, EventStream, RecordingSink, SessionEvent};
pub use models::{ClientInfo, Config, FinalResult, RunningStats, ServerCandidate, StabilityReport, TestResult};
pub use provider::{HttpMeasurementProvider, HttpProviderFactory, MeasurementProvider, ProviderFactory};
pub use session::{SessionManager, SessionRegistry, SessionTimings};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_META_URL: &str = "https://speed.cloudflare.com/meta";
    pub const DEFAULT_SERVER_ID: &str = "cloudflare";
    pub const DEFAULT_SERVER_URL: &str = "https://speed.cloudflare.com";

    pub const PING_SAMPLE_COUNT: usize = 5;
    pub const PROGRESS_STEPS: usize = 20;
    pub const SERVER_PROBE_CANDIDATES: usize = 3;
    /// Candidate lists are grouped in distance buckets of this width (km)
    pub const DISTANCE_BUCKET_KM: f64 = 100.0;

    pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_millis(100);
    pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);
    pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);
    pub const DEFAULT_ITERATION_INTERVAL: Duration = Duration::from_secs(10);
    pub const DEFAULT_DURATION_MINUTES: u64 = 10;
    pub const DEFAULT_SERVER_LIST_LIMIT: usize = 20;

    pub const DEFAULT_DOWNLOAD_BYTES: u64 = 10_000_000;
    pub const DEFAULT_UPLOAD_BYTES: u64 = 5_000_000;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}
