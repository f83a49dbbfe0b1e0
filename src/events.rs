//! Session event catalogue and the sinks that carry events to observers
//!
//! Each session writes into exactly one sink, so the events of a session are
//! observed in emission order.

use crate::models::{ClientInfo, FinalResult, RunningStats, ServerCandidate, StabilityReport};
use crate::types::SessionId;
use futures::Stream;
use serde::Serialize;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Typed event emitted by a running session
///
/// Serialized with a `type` tag, e.g. `{"type":"ping_sample","session_id":"a","ping":12.1,"sample":1}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    ClientInfo {
        session_id: SessionId,
        #[serde(flatten)]
        info: ClientInfo,
    },
    Status {
        session_id: SessionId,
        message: String,
    },
    ServerSelected {
        session_id: SessionId,
        server: ServerCandidate,
    },
    PingSample {
        session_id: SessionId,
        ping: f64,
        sample: usize,
    },
    DownloadProgress {
        session_id: SessionId,
        download: f64,
    },
    DownloadComplete {
        session_id: SessionId,
        download: f64,
    },
    UploadProgress {
        session_id: SessionId,
        upload: f64,
    },
    UploadComplete {
        session_id: SessionId,
        upload: f64,
    },
    Final(FinalResult),
    Error {
        session_id: SessionId,
        message: String,
    },
    ContinuousStarted {
        session_id: SessionId,
        duration_minutes: u64,
    },
    RunningStats {
        session_id: SessionId,
        #[serde(flatten)]
        stats: RunningStats,
        /// Percent of the configured window elapsed, 0-100
        progress: u8,
    },
    Continuous(StabilityReport),
    TestStopped {
        session_id: SessionId,
    },
}

impl SessionEvent {
    pub fn session_id(&self) -> &str {
        match self {
            SessionEvent::ClientInfo { session_id, .. }
            | SessionEvent::Status { session_id, .. }
            | SessionEvent::ServerSelected { session_id, .. }
            | SessionEvent::PingSample { session_id, .. }
            | SessionEvent::DownloadProgress { session_id, .. }
            | SessionEvent::DownloadComplete { session_id, .. }
            | SessionEvent::UploadProgress { session_id, .. }
            | SessionEvent::UploadComplete { session_id, .. }
            | SessionEvent::Error { session_id, .. }
            | SessionEvent::ContinuousStarted { session_id, .. }
            | SessionEvent::RunningStats { session_id, .. }
            | SessionEvent::TestStopped { session_id } => session_id,
            SessionEvent::Final(result) => &result.session_id,
            SessionEvent::Continuous(report) => &report.session_id,
        }
    }

    /// Wire name of the event (`type` tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::ClientInfo { .. } => "client_info",
            SessionEvent::Status { .. } => "status",
            SessionEvent::ServerSelected { .. } => "server_selected",
            SessionEvent::PingSample { .. } => "ping_sample",
            SessionEvent::DownloadProgress { .. } => "download_progress",
            SessionEvent::DownloadComplete { .. } => "download_complete",
            SessionEvent::UploadProgress { .. } => "upload_progress",
            SessionEvent::UploadComplete { .. } => "upload_complete",
            SessionEvent::Final(_) => "final",
            SessionEvent::Error { .. } => "error",
            SessionEvent::ContinuousStarted { .. } => "continuous_started",
            SessionEvent::RunningStats { .. } => "running_stats",
            SessionEvent::Continuous(_) => "continuous",
            SessionEvent::TestStopped { .. } => "test_stopped",
        }
    }

    pub fn status(session_id: &str, message: impl Into<String>) -> Self {
        SessionEvent::Status {
            session_id: session_id.to_string(),
            message: message.into(),
        }
    }

    /// JSON object for the wire
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Destination for session events
pub trait EventSink: Send + Sync {
    /// Deliver one event; a departed observer must not fail the session
    fn emit(&self, event: SessionEvent);
}

/// Sink backed by an unbounded tokio channel
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelSink {
    /// Create a sink and the stream that observes it
    pub fn new() -> (Self, EventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, EventStream { rx })
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: SessionEvent) {
        // Receiver may be gone; the session keeps running regardless
        let _ = self.tx.send(event);
    }
}

/// Ordered stream of a session's events; ends when the session task finishes
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl EventStream {
    /// Next event, `None` once the session has finished
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    /// Drain every remaining event
    pub async fn collect_all(mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            events.push(event);
        }
        events
    }
}

impl Stream for EventStream {
    type Item = SessionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Sink that keeps every event in memory
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<SessionEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Recorded `type` tags in order
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events().iter().map(SessionEvent::event_type).collect()
    }

    pub fn count(&self, event_type: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| event.event_type() == event_type)
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: SessionEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: SessionEvent) {
        (**self).emit(event)
    }
}
