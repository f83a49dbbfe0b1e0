//! One full measurement pass with progressive event emission

use super::selector::ServerSelector;
use super::SessionTimings;
use crate::defaults::{PING_SAMPLE_COUNT, PROGRESS_STEPS};
use crate::error::{ErrorContext, Result};
use crate::events::{EventSink, SessionEvent};
use crate::logging::SessionLogger;
use crate::models::{FailedResult, FinalResult, TestResult};
use crate::provider::MeasurementProvider;
use crate::stats;
use chrono::Utc;
use std::time::Duration;

/// Download ramp: `value * (0.8 + 0.4 * i / steps)`
const DOWNLOAD_RAMP: (f64, f64) = (0.8, 0.4);
/// Upload ramp: `value * (0.7 + 0.5 * i / steps)`
const UPLOAD_RAMP: (f64, f64) = (0.7, 0.5);

/// Runs single measurement passes
#[derive(Clone)]
pub struct SingleTestRunner {
    timings: SessionTimings,
    selector: ServerSelector,
    logger: SessionLogger,
}

impl SingleTestRunner {
    pub fn new(timings: SessionTimings, logger: SessionLogger) -> Self {
        Self {
            timings,
            selector: ServerSelector::new(timings.probe_timeout, logger.clone()),
            logger,
        }
    }

    /// Perform one pass, emitting progress events and exactly one terminal event
    ///
    /// Failures never propagate: they end the pass with an `error` event.
    pub async fn run(
        &self,
        session_id: &str,
        preferred: Option<&str>,
        provider: &mut dyn MeasurementProvider,
        sink: &dyn EventSink,
    ) -> TestResult {
        match self.execute(session_id, preferred, provider, sink).await {
            Ok(result) => {
                self.logger.log_pass_complete(session_id, &result).await;
                sink.emit(SessionEvent::Final(result.clone()));
                TestResult::Final(result)
            }
            Err(error) => {
                self.logger.log_pass_failed(session_id, &error).await;
                let message = error.to_string();
                sink.emit(SessionEvent::Error {
                    session_id: session_id.to_string(),
                    message: message.clone(),
                });
                TestResult::Error(FailedResult {
                    session_id: session_id.to_string(),
                    message,
                })
            }
        }
    }

    async fn execute(
        &self,
        session_id: &str,
        preferred: Option<&str>,
        provider: &mut dyn MeasurementProvider,
        sink: &dyn EventSink,
    ) -> Result<FinalResult> {
        sink.emit(SessionEvent::status(session_id, "Retrieving client information..."));
        let info = provider.client_info().await.context("Client information")?;
        sink.emit(SessionEvent::ClientInfo {
            session_id: session_id.to_string(),
            info,
        });

        sink.emit(SessionEvent::status(session_id, "Selecting best server..."));
        let server = self.selector.select(session_id, provider, preferred).await?;
        self.logger.log_server_selected(session_id, &server).await;
        sink.emit(SessionEvent::ServerSelected {
            session_id: session_id.to_string(),
            server: server.clone(),
        });

        sink.emit(SessionEvent::status(session_id, "Testing ping..."));
        let mut samples = Vec::with_capacity(PING_SAMPLE_COUNT);
        for sample in 1..=PING_SAMPLE_COUNT {
            let ping = provider
                .measure_ping()
                .await
                .with_context(|| format!("Ping sample {}", sample))?;
            samples.push(ping);
            sink.emit(SessionEvent::PingSample {
                session_id: session_id.to_string(),
                ping: stats::round2(ping),
                sample,
            });
            if sample < PING_SAMPLE_COUNT {
                pause(self.timings.ping_interval).await;
            }
        }
        let ping = stats::mean(&samples);
        let jitter = stats::jitter(&samples);

        sink.emit(SessionEvent::status(session_id, "Testing download speed..."));
        let download = stats::bps_to_mbps(provider.measure_download().await.context("Download")?);
        for value in stats::progress_ramp(download, PROGRESS_STEPS, DOWNLOAD_RAMP.0, DOWNLOAD_RAMP.1) {
            sink.emit(SessionEvent::DownloadProgress {
                session_id: session_id.to_string(),
                download: value,
            });
            pause(self.timings.progress_interval).await;
        }
        sink.emit(SessionEvent::DownloadComplete {
            session_id: session_id.to_string(),
            download: stats::round2(download),
        });

        sink.emit(SessionEvent::status(session_id, "Testing upload speed..."));
        let upload = stats::bps_to_mbps(provider.measure_upload().await.context("Upload")?);
        for value in stats::progress_ramp(upload, PROGRESS_STEPS, UPLOAD_RAMP.0, UPLOAD_RAMP.1) {
            sink.emit(SessionEvent::UploadProgress {
                session_id: session_id.to_string(),
                upload: value,
            });
            pause(self.timings.progress_interval).await;
        }
        sink.emit(SessionEvent::UploadComplete {
            session_id: session_id.to_string(),
            upload: stats::round2(upload),
        });

        Ok(FinalResult {
            session_id: session_id.to_string(),
            ping: stats::round2(ping),
            jitter: stats::round2(jitter),
            download: stats::round2(download),
            upload: stats::round2(upload),
            server,
            timestamp: Utc::now(),
        })
    }
}

async fn pause(interval: Duration) {
    if !interval.is_zero() {
        tokio::time::sleep(interval).await;
    }
}
