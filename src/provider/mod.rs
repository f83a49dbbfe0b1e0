//! Measurement provider abstraction
//!
//! The session core never touches the network directly. Everything it needs
//! (client identity, candidate servers, reachability probes and the three raw
//! measurements) goes through [`MeasurementProvider`].

pub mod http;

pub use http::{HttpMeasurementProvider, HttpProviderFactory};

use crate::error::Result;
use crate::models::{ClientInfo, ServerCandidate};
use async_trait::async_trait;
use std::time::Duration;

/// Source of raw measurements and server metadata
///
/// One instance belongs to one session; `select_server` and `best_server`
/// change which server the measurement calls target.
#[async_trait]
pub trait MeasurementProvider: Send + Sync {
    /// Network identity of the client
    async fn client_info(&self) -> Result<ClientInfo>;

    /// Candidate servers grouped by distance bucket
    async fn list_candidate_servers(&self) -> Result<Vec<Vec<ServerCandidate>>>;

    /// Resolve a server by id; unknown ids are a `ServerResolution` error
    async fn find_server(&self, server_id: &str) -> Result<ServerCandidate>;

    /// Connection round-trip time to a candidate
    async fn probe_latency(&self, candidate: &ServerCandidate) -> Result<Duration>;

    /// Make `candidate` the measurement target and return its resolved snapshot
    async fn select_server(&mut self, candidate: &ServerCandidate) -> Result<ServerCandidate>;

    /// The provider's own pick, used when no candidate answered a probe
    async fn best_server(&mut self) -> Result<ServerCandidate>;

    /// One latency sample in milliseconds
    async fn measure_ping(&self) -> Result<f64>;

    /// Download throughput in bits per second
    async fn measure_download(&self) -> Result<f64>;

    /// Upload throughput in bits per second
    async fn measure_upload(&self) -> Result<f64>;
}

/// Builds a fresh provider for every session
pub trait ProviderFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn MeasurementProvider>>;
}

impl<F> ProviderFactory for F
where
    F: Fn() -> Result<Box<dyn MeasurementProvider>> + Send + Sync,
{
    fn create(&self) -> Result<Box<dyn MeasurementProvider>> {
        self()
    }
}

/// Flatten bucketed candidates and order them by distance
pub fn flatten_by_distance(buckets: Vec<Vec<ServerCandidate>>) -> Vec<ServerCandidate> {
    let mut servers: Vec<ServerCandidate> = buckets.into_iter().flatten().collect();
    servers.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    servers
}
