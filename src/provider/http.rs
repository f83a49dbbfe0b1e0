//! HTTP measurement provider for Cloudflare-style speed endpoints
//!
//! A server exposes `GET /__down?bytes=N` (returns N bytes) and `POST /__up`
//! (accepts a body). Client identity comes from a JSON meta endpoint.

use super::{MeasurementProvider, ProviderFactory};
use crate::error::{AppError, Result};
use crate::models::{ClientInfo, Config, ServerCandidate, ServerEndpoint};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

const USER_AGENT: &str = concat!("network-speed-monitor/", env!("CARGO_PKG_VERSION"));

/// Shape of the meta endpoint response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetaResponse {
    client_ip: Option<String>,
    as_organization: Option<String>,
    country: Option<String>,
}

/// Provider measuring against the configured server list over HTTP
pub struct HttpMeasurementProvider {
    client: Client,
    meta_url: String,
    servers: Vec<ServerEndpoint>,
    active: Option<ServerEndpoint>,
    download_bytes: u64,
    upload_bytes: u64,
}

impl HttpMeasurementProvider {
    /// Create a provider with its own HTTP client
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_client(build_client(config.timeout())?, config))
    }

    /// Create a provider sharing an existing HTTP client
    pub fn with_client(client: Client, config: &Config) -> Self {
        Self {
            client,
            meta_url: config.meta_url.clone(),
            servers: config.servers.clone(),
            active: None,
            download_bytes: config.download_bytes,
            upload_bytes: config.upload_bytes,
        }
    }

    /// Server currently targeted by measurements
    pub fn active_server(&self) -> Option<&ServerEndpoint> {
        self.active.as_ref()
    }

    fn endpoint(&self, server_id: &str) -> Result<&ServerEndpoint> {
        self.servers
            .iter()
            .find(|server| server.id == server_id)
            .ok_or_else(|| AppError::server_resolution(format!("Unknown server id: {}", server_id)))
    }

    fn base_url(&self) -> Result<&str> {
        self.active
            .as_ref()
            .map(|server| server.url.trim_end_matches('/'))
            .ok_or_else(|| AppError::measurement("No server selected"))
    }

    fn down_url(&self, bytes: u64) -> Result<String> {
        Ok(format!("{}/__down?bytes={}", self.base_url()?, bytes))
    }

    fn up_url(&self) -> Result<String> {
        Ok(format!("{}/__up", self.base_url()?))
    }
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))
}

fn bits_per_second(bytes: u64, elapsed: Duration) -> Result<f64> {
    let secs = elapsed.as_secs_f64();
    if bytes == 0 || secs <= 0.0 {
        return Err(AppError::measurement("Transfer completed too fast to measure"));
    }
    Ok(bytes as f64 * 8.0 / secs)
}

#[async_trait]
impl MeasurementProvider for HttpMeasurementProvider {
    async fn client_info(&self) -> Result<ClientInfo> {
        let meta: MetaResponse = self
            .client
            .get(&self.meta_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let unknown = || "Unknown".to_string();
        Ok(ClientInfo {
            ip: meta.client_ip.unwrap_or_else(unknown),
            isp: meta.as_organization.unwrap_or_else(unknown),
            country: meta.country.unwrap_or_else(unknown),
        })
    }

    async fn list_candidate_servers(&self) -> Result<Vec<Vec<ServerCandidate>>> {
        let mut buckets: BTreeMap<u64, Vec<ServerCandidate>> = BTreeMap::new();
        for server in &self.servers {
            let bucket = (server.distance_km / crate::defaults::DISTANCE_BUCKET_KM).floor() as u64;
            buckets.entry(bucket).or_default().push(server.to_candidate()?);
        }
        Ok(buckets.into_values().collect())
    }

    async fn find_server(&self, server_id: &str) -> Result<ServerCandidate> {
        self.endpoint(server_id)?.to_candidate()
    }

    async fn probe_latency(&self, candidate: &ServerCandidate) -> Result<Duration> {
        let start = Instant::now();
        tokio::net::TcpStream::connect(candidate.host.as_str())
            .await
            .map_err(|e| AppError::network(format!("Probe to {} failed: {}", candidate.host, e)))?;
        Ok(start.elapsed())
    }

    async fn select_server(&mut self, candidate: &ServerCandidate) -> Result<ServerCandidate> {
        let endpoint = self.endpoint(&candidate.id)?.clone();
        let mut resolved = endpoint.to_candidate()?;
        resolved.latency = candidate.latency;
        self.active = Some(endpoint);
        Ok(resolved)
    }

    async fn best_server(&mut self) -> Result<ServerCandidate> {
        let endpoint = match &self.active {
            Some(active) => active.clone(),
            None => self
                .servers
                .iter()
                .min_by(|a, b| a.distance_km.total_cmp(&b.distance_km))
                .cloned()
                .ok_or_else(|| AppError::server_resolution("No servers configured"))?,
        };

        let candidate = endpoint.to_candidate()?;
        self.active = Some(endpoint);
        Ok(candidate)
    }

    async fn measure_ping(&self) -> Result<f64> {
        let url = self.down_url(0)?;
        let start = Instant::now();
        let response = self.client.get(&url).send().await?.error_for_status()?;
        response.bytes().await?;
        Ok(start.elapsed().as_secs_f64() * 1000.0)
    }

    async fn measure_download(&self) -> Result<f64> {
        let url = self.down_url(self.download_bytes)?;
        let start = Instant::now();
        let response = self.client.get(&url).send().await?.error_for_status()?;

        let mut received: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            received += chunk?.len() as u64;
        }

        bits_per_second(received, start.elapsed())
    }

    async fn measure_upload(&self) -> Result<f64> {
        let url = self.up_url()?;
        let payload: Vec<u8> = (0..self.upload_bytes).map(|i| (i % 256) as u8).collect();

        let start = Instant::now();
        self.client
            .post(&url)
            .header("Content-Type", "application/octet-stream")
            .body(payload)
            .send()
            .await?
            .error_for_status()?;

        bits_per_second(self.upload_bytes, start.elapsed())
    }
}

/// Creates one [`HttpMeasurementProvider`] per session over a shared HTTP client
pub struct HttpProviderFactory {
    client: Client,
    config: Config,
}

impl HttpProviderFactory {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout())?,
            config,
        })
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn create(&self) -> Result<Box<dyn MeasurementProvider>> {
        Ok(Box::new(HttpMeasurementProvider::with_client(
            self.client.clone(),
            &self.config,
        )))
    }
}
