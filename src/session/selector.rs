//! Server selection: preferred id, closest-and-fastest probe, or provider fallback

use crate::defaults::SERVER_PROBE_CANDIDATES;
use crate::error::{AppError, Result};
use crate::logging::SessionLogger;
use crate::models::ServerCandidate;
use crate::provider::{flatten_by_distance, MeasurementProvider};
use futures::future::join_all;
use std::time::Duration;

/// Picks the server a session measures against
#[derive(Clone)]
pub struct ServerSelector {
    probe_timeout: Duration,
    logger: SessionLogger,
}

impl ServerSelector {
    pub fn new(probe_timeout: Duration, logger: SessionLogger) -> Self {
        Self { probe_timeout, logger }
    }

    /// Resolve exactly one server for `session_id`
    ///
    /// A preferred id is used as-is without probing. Otherwise the closest
    /// candidates are probed concurrently and the lowest latency wins; if none
    /// answers in time the provider's own best server is used.
    pub async fn select(
        &self,
        session_id: &str,
        provider: &mut dyn MeasurementProvider,
        preferred: Option<&str>,
    ) -> Result<ServerCandidate> {
        if let Some(server_id) = preferred {
            let candidate = provider.find_server(server_id).await?;
            return provider.select_server(&candidate).await;
        }

        let mut closest = flatten_by_distance(provider.list_candidate_servers().await?);
        closest.truncate(SERVER_PROBE_CANDIDATES);

        match self.fastest(session_id, &*provider, closest).await {
            Some(winner) => provider.select_server(&winner).await,
            None => provider.best_server().await.map_err(|e| {
                AppError::server_resolution(format!("No reachable server: {}", e.message()))
            }),
        }
    }

    async fn fastest(
        &self,
        session_id: &str,
        provider: &dyn MeasurementProvider,
        candidates: Vec<ServerCandidate>,
    ) -> Option<ServerCandidate> {
        let probe_timeout = self.probe_timeout;
        let probes = candidates.iter().map(|candidate| async move {
            match tokio::time::timeout(probe_timeout, provider.probe_latency(candidate)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(AppError::timeout(format!(
                    "Probe to {} exceeded {}ms",
                    candidate.host,
                    probe_timeout.as_millis()
                ))),
            }
        });
        let outcomes = join_all(probes).await;

        let mut reachable = Vec::new();
        for (candidate, outcome) in candidates.into_iter().zip(outcomes) {
            self.logger.log_probe(session_id, &candidate, outcome.as_ref().map(|d| *d)).await;
            if let Ok(latency) = outcome {
                reachable.push(candidate.with_latency(latency.as_secs_f64() * 1000.0));
            }
        }

        // Ties keep distance order
        reachable.into_iter().min_by(|a, b| {
            let a = a.latency.unwrap_or(f64::INFINITY);
            let b = b.latency.unwrap_or(f64::INFINITY);
            a.total_cmp(&b)
        })
    }
}
