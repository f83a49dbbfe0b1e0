//! Session orchestration: lifecycle control for single and continuous tests
//!
//! [`SessionManager`] is the entry point. Each started session runs as its own
//! tokio task with its own provider instance and writes its events into one
//! sink, so events of a session arrive in emission order.

pub mod registry;
pub mod runner;
pub mod selector;
pub mod stability;

pub use registry::{SessionHandle, SessionInfo, SessionRegistry};
pub use runner::SingleTestRunner;
pub use selector::ServerSelector;
pub use stability::{StabilityOrchestrator, StabilityOutcome};

use crate::error::Result;
use crate::events::{ChannelSink, EventSink, EventStream, SessionEvent};
use crate::logging::SessionLogger;
use crate::models::{Config, ServerCandidate, TestResult};
use crate::provider::{flatten_by_distance, HttpProviderFactory, ProviderFactory};
use crate::types::{SessionState, TestKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Pacing and probing intervals used by the runners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionTimings {
    /// Pause between ping samples
    pub ping_interval: Duration,
    /// Pause between synthetic progress events
    pub progress_interval: Duration,
    /// Upper bound for one reachability probe
    pub probe_timeout: Duration,
    /// Pause between continuous-test iterations
    pub iteration_interval: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            ping_interval: crate::defaults::DEFAULT_PING_INTERVAL,
            progress_interval: crate::defaults::DEFAULT_PROGRESS_INTERVAL,
            probe_timeout: crate::defaults::DEFAULT_PROBE_TIMEOUT,
            iteration_interval: crate::defaults::DEFAULT_ITERATION_INTERVAL,
        }
    }
}

impl SessionTimings {
    /// No pacing between samples, progress steps or iterations
    pub fn immediate() -> Self {
        Self {
            ping_interval: Duration::ZERO,
            progress_interval: Duration::ZERO,
            iteration_interval: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Starts, stops and tracks measurement sessions
pub struct SessionManager {
    registry: Arc<SessionRegistry>,
    factory: Arc<dyn ProviderFactory>,
    timings: SessionTimings,
    logger: SessionLogger,
}

impl SessionManager {
    pub fn new(factory: Arc<dyn ProviderFactory>, timings: SessionTimings, logger: SessionLogger) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            factory,
            timings,
            logger,
        }
    }

    /// Manager measuring over HTTP with the configured servers
    pub fn from_config(config: &Config) -> Result<Self> {
        let factory = HttpProviderFactory::new(config.clone())?;
        Ok(Self::new(Arc::new(factory), config.timings(), SessionLogger::new(config)))
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    pub fn timings(&self) -> SessionTimings {
        self.timings
    }

    /// Start one pass and observe it through the returned stream
    pub async fn start_single_test(&self, session_id: &str, preferred: Option<String>) -> Result<EventStream> {
        let (sink, stream) = ChannelSink::new();
        self.spawn_single_test(session_id, preferred, Arc::new(sink)).await?;
        Ok(stream)
    }

    /// Start one pass writing into `sink`
    pub async fn spawn_single_test(
        &self,
        session_id: &str,
        preferred: Option<String>,
        sink: Arc<dyn EventSink>,
    ) -> Result<JoinHandle<TestResult>> {
        let mut provider = self.factory.create()?;
        let handle = self.registry.insert_if_absent(session_id, TestKind::Single).await?;
        self.logger.log_session_started(session_id, TestKind::Single.as_str()).await;

        let runner = SingleTestRunner::new(self.timings, self.logger.clone());
        let registry = self.registry.clone();
        let logger = self.logger.clone();

        Ok(tokio::spawn(async move {
            let result = runner
                .run(&handle.session_id, preferred.as_deref(), provider.as_mut(), sink.as_ref())
                .await;

            let state = if result.is_final() {
                SessionState::Completed
            } else {
                SessionState::Errored
            };
            registry.finish(&handle).await;
            logger.log_session_finished(&handle.session_id, state.as_str()).await;
            result
        }))
    }

    /// Start a continuous session and observe it through the returned stream
    pub async fn start_continuous_test(
        &self,
        session_id: &str,
        duration_minutes: u64,
        preferred: Option<String>,
    ) -> Result<EventStream> {
        let (sink, stream) = ChannelSink::new();
        self.spawn_continuous_test(session_id, duration_minutes, preferred, Arc::new(sink))
            .await?;
        Ok(stream)
    }

    /// Start a continuous session writing into `sink`
    pub async fn spawn_continuous_test(
        &self,
        session_id: &str,
        duration_minutes: u64,
        preferred: Option<String>,
        sink: Arc<dyn EventSink>,
    ) -> Result<JoinHandle<StabilityOutcome>> {
        let mut provider = self.factory.create()?;
        let handle = self
            .registry
            .insert_if_absent(session_id, TestKind::Continuous)
            .await?;
        self.logger
            .log_session_started(session_id, TestKind::Continuous.as_str())
            .await;

        let orchestrator = StabilityOrchestrator::new(self.timings, self.logger.clone());
        let registry = self.registry.clone();
        let logger = self.logger.clone();

        Ok(tokio::spawn(async move {
            let outcome = orchestrator
                .run(
                    &handle,
                    &registry,
                    duration_minutes,
                    preferred.as_deref(),
                    provider.as_mut(),
                    sink.as_ref(),
                )
                .await;

            let state = if outcome.stopped {
                SessionState::Removed
            } else if outcome.report.is_some() {
                SessionState::Completed
            } else {
                SessionState::Errored
            };
            registry.finish(&handle).await;
            logger.log_session_finished(&handle.session_id, state.as_str()).await;
            outcome
        }))
    }

    /// Request a stop; unknown ids are acknowledged as a no-op
    ///
    /// A continuous session ends at its next iteration boundary. A single pass
    /// runs to completion.
    pub async fn stop_test(&self, session_id: &str) -> SessionEvent {
        let known = self.registry.try_remove(session_id).await.is_ok();
        self.logger.log_stop_requested(session_id, known).await;
        SessionEvent::TestStopped {
            session_id: session_id.to_string(),
        }
    }

    /// Up to `limit` candidate servers, closest first
    pub async fn list_servers(&self, limit: usize) -> Result<Vec<ServerCandidate>> {
        let provider = self.factory.create()?;
        let mut servers = flatten_by_distance(provider.list_candidate_servers().await?);
        servers.truncate(limit);
        Ok(servers)
    }
}
