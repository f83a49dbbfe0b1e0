//! Test result, running statistics and stability report models

use crate::models::server::ServerCandidate;
use crate::types::{ConnectionQuality, ResultKind, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One latency measurement within a sampling round
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PingSample {
    /// 1-based ordinal within the round
    pub sample: usize,
    /// Latency in milliseconds
    pub ping: f64,
}

/// Metrics of one successful measurement pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    pub session_id: SessionId,
    /// Average ping (ms)
    pub ping: f64,
    /// Mean absolute difference of consecutive ping samples (ms)
    pub jitter: f64,
    /// Download throughput (Mbps)
    pub download: f64,
    /// Upload throughput (Mbps)
    pub upload: f64,
    pub server: ServerCandidate,
    pub timestamp: DateTime<Utc>,
}

impl FinalResult {
    /// Overall connection rating for this pass
    pub fn quality(&self) -> ConnectionQuality {
        ConnectionQuality::from_metrics(self.ping, self.download, self.upload)
    }
}

/// A pass that was aborted by a failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedResult {
    pub session_id: SessionId,
    pub message: String,
}

/// Terminal artifact of one single-test pass
#[derive(Debug, Clone, PartialEq)]
pub enum TestResult {
    Final(FinalResult),
    Error(FailedResult),
}

impl TestResult {
    pub fn kind(&self) -> ResultKind {
        match self {
            TestResult::Final(_) => ResultKind::Final,
            TestResult::Error(_) => ResultKind::Error,
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            TestResult::Final(r) => &r.session_id,
            TestResult::Error(r) => &r.session_id,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, TestResult::Final(_))
    }

    /// Successful metrics, if any
    pub fn as_final(&self) -> Option<&FinalResult> {
        match self {
            TestResult::Final(r) => Some(r),
            TestResult::Error(_) => None,
        }
    }

    pub fn into_final(self) -> Option<FinalResult> {
        match self {
            TestResult::Final(r) => Some(r),
            TestResult::Error(_) => None,
        }
    }
}

/// Average, minimum and maximum of one metric
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricRange {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

/// Aggregate over the results accumulated so far in a continuous session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunningStats {
    /// Number of completed passes included
    pub count: usize,
    pub ping: MetricRange,
    pub download: MetricRange,
    pub upload: MetricRange,
}

/// Aggregate of the passes that completed within one minute of a continuous run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinuteStats {
    /// 1-based minute since the first pass
    pub minute: u64,
    pub tests: usize,
    pub ping: MetricRange,
    pub download: MetricRange,
    pub upload: MetricRange,
}

impl MinuteStats {
    /// Download >= 50, upload >= 25 and ping <= 50 on average
    pub fn is_stable(&self) -> bool {
        self.download.avg >= 50.0 && self.upload.avg >= 25.0 && self.ping.avg <= 50.0
    }
}

/// Terminal artifact of a continuous session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityReport {
    pub session_id: SessionId,
    /// Always `continuous`
    pub test_type: String,
    pub test_count: usize,
    /// Configured duration in minutes
    pub duration: u64,
    pub avg_download: f64,
    pub min_download: f64,
    pub max_download: f64,
    pub avg_upload: f64,
    pub min_upload: f64,
    pub max_upload: f64,
    pub avg_ping: f64,
    pub min_ping: f64,
    pub max_ping: f64,
    pub download_stdev: f64,
    pub upload_stdev: f64,
    pub ping_stdev: f64,
    /// Mean of per-pass jitter values; not part of the score
    pub avg_jitter: f64,
    /// `max(0, 100 - (download_stdev + upload_stdev + ping_stdev))`
    pub stability_score: f64,
    pub results: Vec<FinalResult>,
}

impl StabilityReport {
    pub fn download_quality(&self) -> ConnectionQuality {
        ConnectionQuality::for_throughput(self.avg_download)
    }

    pub fn upload_quality(&self) -> ConnectionQuality {
        ConnectionQuality::for_throughput(self.avg_upload)
    }

    pub fn ping_quality(&self) -> ConnectionQuality {
        ConnectionQuality::for_ping(self.avg_ping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> ServerCandidate {
        ServerCandidate {
            id: "1".to_string(),
            sponsor: "ISP".to_string(),
            name: "Paris".to_string(),
            country: "France".to_string(),
            distance: 10.0,
            host: "paris:8080".to_string(),
            latency: Some(4.0),
        }
    }

    #[test]
    fn test_result_kind_accessors() {
        let ok = TestResult::Final(FinalResult {
            session_id: "s1".to_string(),
            ping: 12.0,
            jitter: 1.0,
            download: 120.0,
            upload: 90.0,
            server: server(),
            timestamp: Utc::now(),
        });
        assert_eq!(ok.kind(), ResultKind::Final);
        assert_eq!(ok.session_id(), "s1");
        assert_eq!(ok.as_final().unwrap().quality(), ConnectionQuality::Excellent);

        let failed = TestResult::Error(FailedResult {
            session_id: "s2".to_string(),
            message: "boom".to_string(),
        });
        assert_eq!(failed.kind(), ResultKind::Error);
        assert!(!failed.is_final());
        assert!(failed.into_final().is_none());
    }
}
