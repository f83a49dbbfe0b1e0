//! Data models and structures for the network speed monitor

pub mod config;
pub mod result;
pub mod server;

// Re-export main model types
pub use config::Config;
pub use result::{
    FailedResult, FinalResult, MetricRange, MinuteStats, PingSample, RunningStats, StabilityReport,
    TestResult,
};
pub use server::{ClientInfo, ServerCandidate, ServerEndpoint};
