//! Process-wide table of running sessions

use crate::error::{AppError, Result};
use crate::types::{SessionId, SessionState, TestKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

struct SessionEntry {
    kind: TestKind,
    state: SessionState,
    started_at: DateTime<Utc>,
    generation: u64,
    token: CancellationToken,
}

/// Public view of a registered session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub kind: TestKind,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
}

/// Ticket held by a session task
///
/// The generation distinguishes two sessions that reused the same id, so a
/// finished task can never remove its successor's entry.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub session_id: SessionId,
    pub kind: TestKind,
    generation: u64,
    token: CancellationToken,
}

impl SessionHandle {
    /// Whether a stop was requested for this session
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once a stop is requested
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// Registry of running sessions keyed by session id
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
    next_generation: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new running session; fails if the id is already running
    pub async fn insert_if_absent(&self, session_id: &str, kind: TestKind) -> Result<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(session_id) {
            return Err(AppError::session_conflict(session_id));
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        sessions.insert(
            session_id.to_string(),
            SessionEntry {
                kind,
                state: SessionState::Running,
                started_at: Utc::now(),
                generation,
                token: token.clone(),
            },
        );

        Ok(SessionHandle {
            session_id: session_id.to_string(),
            kind,
            generation,
            token,
        })
    }

    /// Remove a session and signal its task to stop at the next boundary
    pub async fn try_remove(&self, session_id: &str) -> Result<SessionInfo> {
        let entry = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| AppError::session_not_found(session_id))?;

        entry.token.cancel();

        Ok(SessionInfo {
            session_id: session_id.to_string(),
            kind: entry.kind,
            state: SessionState::Removed,
            started_at: entry.started_at,
        })
    }

    /// Drop the entry owned by `handle`; a no-op if it was already removed or replaced
    pub async fn finish(&self, handle: &SessionHandle) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(&handle.session_id) {
            Some(entry) if entry.generation == handle.generation => {
                sessions.remove(&handle.session_id);
                true
            }
            _ => false,
        }
    }

    /// Whether `handle` still owns its registry entry
    pub async fn is_current(&self, handle: &SessionHandle) -> bool {
        self.sessions
            .read()
            .await
            .get(&handle.session_id)
            .is_some_and(|entry| entry.generation == handle.generation)
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    /// Running sessions ordered by start time
    pub async fn active_sessions(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.read().await;
        let mut active: Vec<SessionInfo> = sessions
            .iter()
            .map(|(id, entry)| SessionInfo {
                session_id: id.clone(),
                kind: entry.kind,
                state: entry.state,
                started_at: entry.started_at,
            })
            .collect();
        active.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.session_id.cmp(&b.session_id)));
        active
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
