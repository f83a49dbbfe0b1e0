//! Statistical calculations for speed measurements and stability analysis


use crate::models::{FinalResult, MetricRange, MinuteStats, RunningStats, StabilityReport};
use crate::types::TestKind;
use std::collections::BTreeMap;

/// Arithmetic mean, `0.0` for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator); `0.0` with fewer than two values
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let avg = mean(values);
    let variance = values
        .iter()
        .map(|value| {
            let diff = value - avg;
            diff * diff
        })
        .sum::<f64>()
        / (values.len() - 1) as f64;

    variance.sqrt()
}

/// Mean absolute difference between consecutive samples
pub fn jitter(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }

    let total: f64 = samples
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs())
        .sum();

    total / (samples.len() - 1) as f64
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Bits per second to megabits per second
pub fn bps_to_mbps(bps: f64) -> f64 {
    bps / 1_000_000.0
}

/// Synthetic progress values for a measured throughput
///
/// Step `i` (1-based) of `steps` reports `final_value * (base + span * i / steps)`.
/// Purely cosmetic; the completion event always carries the measured value.
pub fn progress_ramp(final_value: f64, steps: usize, base: f64, span: f64) -> Vec<f64> {
    (1..=steps)
        .map(|i| round2(final_value * (base + span * i as f64 / steps as f64)))
        .collect()
}

/// Average, minimum and maximum of a metric
pub fn metric_range(values: &[f64]) -> MetricRange {
    if values.is_empty() {
        return MetricRange::default();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    MetricRange {
        avg: round2(mean(values)),
        min,
        max,
    }
}

/// `max(0, 100 - sum of standard deviations)`
pub fn stability_score(download_stdev: f64, upload_stdev: f64, ping_stdev: f64) -> f64 {
    (100.0 - (download_stdev + upload_stdev + ping_stdev)).max(0.0)
}

/// Group passes by the minute they finished in, counted from the first pass
pub fn minute_breakdown(results: &[FinalResult]) -> Vec<MinuteStats> {
    let Some(first) = results.iter().map(|r| r.timestamp).min() else {
        return Vec::new();
    };

    let mut groups: BTreeMap<u64, Vec<&FinalResult>> = BTreeMap::new();
    for result in results {
        let elapsed = (result.timestamp - first).num_seconds().max(0) as u64;
        groups.entry(elapsed / 60 + 1).or_default().push(result);
    }

    groups
        .into_iter()
        .map(|(minute, passes)| {
            let pick = |f: fn(&FinalResult) -> f64| passes.iter().map(|r| f(r)).collect::<Vec<_>>();
            MinuteStats {
                minute,
                tests: passes.len(),
                ping: metric_range(&pick(|r| r.ping)),
                download: metric_range(&pick(|r| r.download)),
                upload: metric_range(&pick(|r| r.upload)),
            }
        })
        .collect()
}

/// Accumulates successful passes of a continuous session
#[derive(Debug, Clone, Default)]
pub struct StabilityTracker {
    results: Vec<FinalResult>,
}

impl StabilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful pass
    pub fn push(&mut self, result: FinalResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn results(&self) -> &[FinalResult] {
        &self.results
    }

    fn column(&self, pick: fn(&FinalResult) -> f64) -> Vec<f64> {
        self.results.iter().map(pick).collect()
    }

    /// Aggregate over everything recorded so far
    pub fn running_stats(&self) -> RunningStats {
        RunningStats {
            count: self.results.len(),
            ping: metric_range(&self.column(|r| r.ping)),
            download: metric_range(&self.column(|r| r.download)),
            upload: metric_range(&self.column(|r| r.upload)),
        }
    }

    /// Build the final report, or `None` if no pass succeeded
    pub fn into_report(self, session_id: &str, duration_minutes: u64) -> Option<StabilityReport> {
        if self.results.is_empty() {
            return None;
        }

        let downloads = self.column(|r| r.download);
        let uploads = self.column(|r| r.upload);
        // Per-pass average ping, not the raw samples
        let pings = self.column(|r| r.ping);
        let jitters = self.column(|r| r.jitter);

        let download = metric_range(&downloads);
        let upload = metric_range(&uploads);
        let ping = metric_range(&pings);

        let download_stdev = sample_std_dev(&downloads);
        let upload_stdev = sample_std_dev(&uploads);
        let ping_stdev = sample_std_dev(&pings);

        Some(StabilityReport {
            session_id: session_id.to_string(),
            test_type: TestKind::Continuous.as_str().to_string(),
            test_count: self.results.len(),
            duration: duration_minutes,
            avg_download: download.avg,
            min_download: download.min,
            max_download: download.max,
            avg_upload: upload.avg,
            min_upload: upload.min,
            max_upload: upload.max,
            avg_ping: ping.avg,
            min_ping: ping.min,
            max_ping: ping.max,
            download_stdev: round2(download_stdev),
            upload_stdev: round2(upload_stdev),
            ping_stdev: round2(ping_stdev),
            avg_jitter: round2(mean(&jitters)),
            stability_score: round2(stability_score(download_stdev, upload_stdev, ping_stdev)),
            results: self.results,
        })
    }
}
