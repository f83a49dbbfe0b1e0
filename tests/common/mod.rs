//! Scriptable measurement provider shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use network_speed_monitor::{
    error::{AppError, Result},
    logging::SessionLogger,
    models::{ClientInfo, Config, ServerCandidate},
    provider::{MeasurementProvider, ProviderFactory},
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How a candidate answers a reachability probe
#[derive(Debug, Clone)]
pub enum Probe {
    Latency(Duration),
    Fail,
    /// Never answers; the selector's timeout has to cut it off
    Hang,
}

/// Canned answers for one fake provider
#[derive(Debug, Clone)]
pub struct FakeScript {
    pub client: ClientInfo,
    pub buckets: Vec<Vec<ServerCandidate>>,
    pub probes: HashMap<String, Probe>,
    /// Returned by `best_server`; `None` makes it fail
    pub best: Option<ServerCandidate>,
    /// Ping samples in ms, cycled across calls
    pub pings: Vec<f64>,
    /// Download results in Mbps, cycled across calls
    pub downloads_mbps: Vec<f64>,
    pub upload_mbps: f64,
    /// 1-based download call numbers that fail
    pub failing_downloads: HashSet<usize>,
    pub fail_client_info: bool,
    pub fail_listing: bool,
}

pub fn candidate(id: &str, distance: f64) -> ServerCandidate {
    ServerCandidate {
        id: id.to_string(),
        sponsor: format!("{} ISP", id),
        name: format!("{} city", id),
        country: "Testland".to_string(),
        distance,
        host: format!("{}.test:8080", id),
        latency: None,
    }
}

impl FakeScript {
    /// Four servers: three within 150 km answering probes, one far away
    pub fn standard() -> Self {
        let mut probes = HashMap::new();
        probes.insert("near".to_string(), Probe::Latency(Duration::from_millis(40)));
        probes.insert("mid".to_string(), Probe::Latency(Duration::from_millis(10)));
        probes.insert("edge".to_string(), Probe::Latency(Duration::from_millis(25)));
        probes.insert("far".to_string(), Probe::Latency(Duration::from_millis(1)));

        Self {
            client: ClientInfo {
                ip: "192.0.2.10".to_string(),
                isp: "Fake Telecom".to_string(),
                country: "Testland".to_string(),
            },
            // Deliberately out of distance order inside the buckets
            buckets: vec![
                vec![candidate("mid", 50.0), candidate("near", 5.0)],
                vec![candidate("edge", 150.0)],
                vec![candidate("far", 900.0)],
            ],
            probes,
            best: Some(candidate("far", 900.0)),
            pings: vec![10.0, 12.0, 11.0, 15.0, 13.0],
            downloads_mbps: vec![95.5],
            upload_mbps: 40.0,
            failing_downloads: HashSet::new(),
            fail_client_info: false,
            fail_listing: false,
        }
    }

    pub fn probe(mut self, id: &str, probe: Probe) -> Self {
        self.probes.insert(id.to_string(), probe);
        self
    }

    pub fn downloads(mut self, mbps: Vec<f64>) -> Self {
        self.downloads_mbps = mbps;
        self
    }

    pub fn fail_download_calls(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.failing_downloads.extend(calls);
        self
    }

    pub fn all_known(&self) -> impl Iterator<Item = &ServerCandidate> {
        self.buckets.iter().flatten()
    }
}

/// Shared state observed by tests after a run
#[derive(Debug, Default)]
pub struct CallLog {
    calls: Mutex<Vec<String>>,
    pings: AtomicUsize,
    downloads: AtomicUsize,
}

impl CallLog {
    fn record(&self, call: String) {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(call),
            Err(poisoned) => poisoned.into_inner().push(call),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

pub struct FakeProvider {
    script: Arc<FakeScript>,
    log: Arc<CallLog>,
}

impl FakeProvider {
    pub fn new(script: FakeScript) -> (Self, Arc<CallLog>) {
        let log = Arc::new(CallLog::default());
        (
            Self {
                script: Arc::new(script),
                log: log.clone(),
            },
            log,
        )
    }
}

#[async_trait]
impl MeasurementProvider for FakeProvider {
    async fn client_info(&self) -> Result<ClientInfo> {
        self.log.record("client_info".to_string());
        if self.script.fail_client_info {
            return Err(AppError::network("meta endpoint unreachable"));
        }
        Ok(self.script.client.clone())
    }

    async fn list_candidate_servers(&self) -> Result<Vec<Vec<ServerCandidate>>> {
        self.log.record("list".to_string());
        if self.script.fail_listing {
            return Err(AppError::network("server list unavailable"));
        }
        Ok(self.script.buckets.clone())
    }

    async fn find_server(&self, server_id: &str) -> Result<ServerCandidate> {
        self.log.record(format!("find:{}", server_id));
        self.script
            .all_known()
            .find(|c| c.id == server_id)
            .cloned()
            .ok_or_else(|| AppError::server_resolution(format!("Unknown server id: {}", server_id)))
    }

    async fn probe_latency(&self, candidate: &ServerCandidate) -> Result<Duration> {
        self.log.record(format!("probe:{}", candidate.id));
        match self.script.probes.get(&candidate.id) {
            Some(Probe::Latency(latency)) => Ok(*latency),
            Some(Probe::Hang) => {
                std::future::pending::<()>().await;
                Err(AppError::internal("unreachable"))
            }
            Some(Probe::Fail) | None => Err(AppError::network(format!("{} refused", candidate.host))),
        }
    }

    async fn select_server(&mut self, candidate: &ServerCandidate) -> Result<ServerCandidate> {
        self.log.record(format!("select:{}", candidate.id));
        Ok(candidate.clone())
    }

    async fn best_server(&mut self) -> Result<ServerCandidate> {
        self.log.record("best".to_string());
        self.script
            .best
            .clone()
            .ok_or_else(|| AppError::network("no server answered"))
    }

    async fn measure_ping(&self) -> Result<f64> {
        let n = self.log.pings.fetch_add(1, Ordering::SeqCst);
        Ok(self.script.pings[n % self.script.pings.len()])
    }

    async fn measure_download(&self) -> Result<f64> {
        let call = self.log.downloads.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.record(format!("download:{}", call));
        if self.script.failing_downloads.contains(&call) {
            return Err(AppError::measurement("connection reset during download"));
        }
        let mbps = self.script.downloads_mbps[(call - 1) % self.script.downloads_mbps.len()];
        Ok(mbps * 1_000_000.0)
    }

    async fn measure_upload(&self) -> Result<f64> {
        self.log.record("upload".to_string());
        Ok(self.script.upload_mbps * 1_000_000.0)
    }
}

/// Factory handing every session a fresh provider over the same script and log
#[derive(Clone)]
pub struct FakeFactory {
    script: Arc<FakeScript>,
    log: Arc<CallLog>,
    created: Arc<AtomicUsize>,
}

impl FakeFactory {
    pub fn new(script: FakeScript) -> Self {
        Self {
            script: Arc::new(script),
            log: Arc::new(CallLog::default()),
            created: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn log(&self) -> Arc<CallLog> {
        self.log.clone()
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ProviderFactory for FakeFactory {
    fn create(&self) -> Result<Box<dyn MeasurementProvider>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeProvider {
            script: self.script.clone(),
            log: self.log.clone(),
        }))
    }
}

/// Logger that only reports warnings and errors
pub fn test_logger() -> SessionLogger {
    SessionLogger::new(&Config::default())
}
