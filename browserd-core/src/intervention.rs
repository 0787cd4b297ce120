//! Tracks at-most-one pending human intervention per session and rendezvous
//! the requesting command with the out-of-band "complete" signal (§4.F).
//!
//! Per §9's design note this is a dedicated single-shot completion
//! primitive, not a reuse of the Command Queue's per-command result
//! channel — the two-phase `intervention_created` / `intervention_completed`
//! protocol needs its own waiter.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterventionStatus {
    Pending,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct InterventionRecord {
    pub id: String,
    pub session_id: String,
    pub reason: String,
    pub instructions: String,
    pub status: InterventionStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub command_id: String,
}

pub struct CreateRequest {
    pub session_id: String,
    pub reason: String,
    pub instructions: String,
    pub command_id: String,
}

#[derive(Debug, Clone)]
pub enum Resolution {
    Completed { resolved_at: DateTime<Utc> },
    Cancelled,
}

struct Entry {
    record: InterventionRecord,
    waiter: Option<oneshot::Sender<Resolution>>,
}

#[derive(Default)]
struct State {
    by_id: HashMap<String, Entry>,
    by_session: HashMap<String, String>,
}

/// Owns the id → record map and the session → active-id map (§4.F).
pub struct InterventionCoordinator {
    state: Mutex<State>,
}

impl InterventionCoordinator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { state: Mutex::new(State::default()) })
    }

    /// Rejects with `None` if the session already has a Pending
    /// intervention. On success, returns the record plus a receiver that
    /// resolves when `complete`/`cancel` fires.
    pub async fn create(&self, req: CreateRequest) -> Option<(InterventionRecord, oneshot::Receiver<Resolution>)> {
        let mut state = self.state.lock().await;
        if state.by_session.contains_key(&req.session_id) {
            return None;
        }
        let id = uuid::Uuid::new_v4().to_string();
        let record = InterventionRecord {
            id: id.clone(),
            session_id: req.session_id.clone(),
            reason: req.reason,
            instructions: req.instructions,
            status: InterventionStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
            command_id: req.command_id,
        };
        let (tx, rx) = oneshot::channel();
        state.by_session.insert(req.session_id, id.clone());
        state.by_id.insert(id, Entry { record: record.clone(), waiter: Some(tx) });
        Some((record, rx))
    }

    /// Transitions Pending → Completed. No-op (returns `false`) if the
    /// intervention doesn't exist or isn't Pending.
    pub async fn complete(&self, intervention_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let Some(entry) = state.by_id.get_mut(intervention_id) else { return false };
        if entry.record.status != InterventionStatus::Pending {
            return false;
        }
        let resolved_at = Utc::now();
        entry.record.status = InterventionStatus::Completed;
        entry.record.resolved_at = Some(resolved_at);
        state.by_session.remove(&entry.record.session_id);
        if let Some(waiter) = entry.waiter.take() {
            let _ = waiter.send(Resolution::Completed { resolved_at });
        }
        true
    }

    pub async fn cancel(&self, intervention_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let Some(entry) = state.by_id.get_mut(intervention_id) else { return false };
        if entry.record.status != InterventionStatus::Pending {
            return false;
        }
        entry.record.status = InterventionStatus::Cancelled;
        state.by_session.remove(&entry.record.session_id);
        if let Some(waiter) = entry.waiter.take() {
            let _ = waiter.send(Resolution::Cancelled);
        }
        true
    }

    /// Cancels the session's active intervention, if any. Called whenever
    /// a session is destroyed.
    pub async fn cancel_by_session(&self, session_id: &str) -> bool {
        let id = {
            let state = self.state.lock().await;
            state.by_session.get(session_id).cloned()
        };
        match id {
            Some(id) => self.cancel(&id).await,
            None => false,
        }
    }

    pub async fn list_pending(&self) -> Vec<InterventionRecord> {
        self.state
            .lock()
            .await
            .by_id
            .values()
            .filter(|e| e.record.status == InterventionStatus::Pending)
            .map(|e| e.record.clone())
            .collect()
    }

    /// Drops terminal (Completed/Cancelled) records older than `max_age`.
    pub async fn cleanup_old(&self, max_age: chrono::Duration) {
        let cutoff = Utc::now() - max_age;
        let mut state = self.state.lock().await;
        let stale: Vec<String> = state
            .by_id
            .values()
            .filter(|e| e.record.status != InterventionStatus::Pending)
            .filter(|e| e.record.resolved_at.unwrap_or(e.record.created_at) < cutoff)
            .map(|e| e.record.id.clone())
            .collect();
        for id in stale {
            state.by_id.remove(&id);
        }
    }
}
