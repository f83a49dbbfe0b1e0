//! Continuous stability testing over a time window

use super::registry::{SessionHandle, SessionRegistry};
use super::runner::SingleTestRunner;
use super::SessionTimings;
use crate::events::{EventSink, SessionEvent};
use crate::logging::SessionLogger;
use crate::models::{StabilityReport, TestResult};
use crate::provider::MeasurementProvider;
use crate::stats::StabilityTracker;
use std::time::Duration;
use tokio::time::Instant;

/// How a continuous session ended
#[derive(Debug, Clone, PartialEq)]
pub struct StabilityOutcome {
    pub report: Option<StabilityReport>,
    /// Number of passes started, successful or not
    pub iterations: usize,
    /// Whether the loop ended because of a stop request
    pub stopped: bool,
}

/// Repeats single passes until the window elapses or a stop is requested
#[derive(Clone)]
pub struct StabilityOrchestrator {
    runner: SingleTestRunner,
    timings: SessionTimings,
    logger: SessionLogger,
}

impl StabilityOrchestrator {
    pub fn new(timings: SessionTimings, logger: SessionLogger) -> Self {
        Self {
            runner: SingleTestRunner::new(timings, logger.clone()),
            timings,
            logger,
        }
    }

    /// Run the loop for `handle`
    ///
    /// Stops are honored between passes only; a pass in flight always finishes.
    pub async fn run(
        &self,
        handle: &SessionHandle,
        registry: &SessionRegistry,
        duration_minutes: u64,
        preferred: Option<&str>,
        provider: &mut dyn MeasurementProvider,
        sink: &dyn EventSink,
    ) -> StabilityOutcome {
        let session_id = handle.session_id.as_str();
        sink.emit(SessionEvent::ContinuousStarted {
            session_id: session_id.to_string(),
            duration_minutes,
        });

        let budget = Duration::from_secs(duration_minutes.saturating_mul(60));
        let start = Instant::now();
        let mut tracker = StabilityTracker::new();
        let mut iterations = 0;
        let mut stopped = false;

        loop {
            if handle.is_cancelled() || !registry.is_current(handle).await {
                stopped = true;
                break;
            }
            if start.elapsed() >= budget {
                break;
            }

            iterations += 1;
            sink.emit(SessionEvent::status(session_id, format!("Running test #{}", iterations)));

            // Failed passes already emitted their `error` event and add nothing
            if let TestResult::Final(result) = self.runner.run(session_id, preferred, provider, sink).await {
                tracker.push(result);

                let progress = percent_complete(start.elapsed(), budget);
                sink.emit(SessionEvent::RunningStats {
                    session_id: session_id.to_string(),
                    stats: tracker.running_stats(),
                    progress,
                });
                self.logger.log_iteration(session_id, iterations, progress).await;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.timings.iteration_interval) => {}
                _ = handle.cancelled() => {}
            }
        }

        let report = tracker.into_report(session_id, duration_minutes);
        if let Some(report) = &report {
            self.logger.log_report(session_id, report).await;
            sink.emit(SessionEvent::Continuous(report.clone()));
        }

        if stopped {
            sink.emit(SessionEvent::TestStopped {
                session_id: session_id.to_string(),
            });
        }

        StabilityOutcome {
            report,
            iterations,
            stopped,
        }
    }
}

/// Elapsed share of the window in whole percent, capped at 100
pub fn percent_complete(elapsed: Duration, budget: Duration) -> u8 {
    if budget.is_zero() {
        return 100;
    }
    let percent = elapsed.as_secs_f64() / budget.as_secs_f64() * 100.0;
    percent.min(100.0).round() as u8
}
