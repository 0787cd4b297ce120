//! Session id → live client set (§4.G "Fan-out"), and the `EventSink` the
//! Session Registry publishes frames/events through.

use std::sync::Arc;

use browserd_core::sink::{EventSink, Frame};
use browserd_protocol::message::{EventName, ServerMessage, Viewport};
use dashmap::DashMap;

use crate::client::{ClientHandle, ClientKind, ClientReceiver};

/// Registered per session; never shared across sessions.
#[derive(Default)]
struct SessionClients {
    clients: DashMap<String, Arc<ClientHandle>>,
}

/// Owns the session → clients map; the Registry publishes exactly once per
/// frame/event and this walks the live set and forwards to each (§4.G).
pub struct Hub {
    sessions: DashMap<String, Arc<SessionClients>>,
}

impl Hub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { sessions: DashMap::new() })
    }

    /// Registers a fresh client for `session_id`. Reconnects always land
    /// here as a brand new client id — the server holds no reconnect state.
    pub fn register(&self, session_id: &str, kind: ClientKind) -> (Arc<ClientHandle>, ClientReceiver) {
        let id = uuid::Uuid::new_v4().to_string();
        let (handle, receiver) = ClientHandle::new_pair(id, kind, session_id.to_string());
        let handle = Arc::new(handle);
        let bucket = self.sessions.entry(session_id.to_string()).or_insert_with(|| Arc::new(SessionClients::default()));
        bucket.clients.insert(handle.id.clone(), handle.clone());
        (handle, receiver)
    }

    pub fn unregister(&self, session_id: &str, client_id: &str) {
        if let Some(bucket) = self.sessions.get(session_id) {
            bucket.clients.remove(client_id);
        }
    }

    /// Signals every client attached to `session_id` to close its physical
    /// connection, then drops the session's client bucket entirely. Called
    /// by the Session Registry on teardown so a destroyed session doesn't
    /// leave its clients connected (§8: each client's connection closes
    /// cleanly within one GC tick).
    pub fn close_session(&self, session_id: &str) {
        if let Some((_, bucket)) = self.sessions.remove(session_id) {
            for entry in bucket.clients.iter() {
                entry.value().close();
            }
        }
    }

    /// Closes every client across every session, used during process
    /// shutdown ahead of tearing down the Session Registry.
    pub fn close_all(&self) {
        let session_ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for id in session_ids {
            self.close_session(&id);
        }
    }

    pub fn client_count(&self, session_id: &str) -> usize {
        self.sessions.get(session_id).map(|b| b.clients.len()).unwrap_or(0)
    }

    pub fn clients_for(&self, session_id: &str) -> Vec<Arc<ClientHandle>> {
        match self.sessions.get(session_id) {
            Some(bucket) => bucket.clients.iter().map(|e| e.value().clone()).collect(),
            None => Vec::new(),
        }
    }

    pub fn get_client(&self, session_id: &str, client_id: &str) -> Option<Arc<ClientHandle>> {
        self.sessions.get(session_id)?.clients.get(client_id).map(|e| e.value().clone())
    }

    /// Sends `ready` plus (if present) the last frame to a newly opened
    /// connection — `ready` must precede the first frame (§5 ordering).
    pub fn send_welcome(&self, client: &ClientHandle, viewport: Viewport, last_frame: Option<Frame>) {
        let _ = client.send_reliable(ServerMessage::event(
            EventName::Ready,
            Some(serde_json::json!({ "viewport": viewport })),
        ));
        if let Some(frame) = last_frame {
            client.send_frame(frame_to_message(&frame));
        }
    }
}

fn frame_to_message(frame: &Frame) -> ServerMessage {
    ServerMessage::Frame {
        format: frame.format.to_string(),
        data: frame.data.clone(),
        viewport: frame.viewport,
        timestamp: frame.timestamp_ms,
    }
}

impl EventSink for Hub {
    fn on_frame(&self, session_id: &str, frame: Frame) {
        let msg = frame_to_message(&frame);
        for client in self.clients_for(session_id) {
            client.send_frame(msg.clone());
        }
    }

    fn on_event(&self, session_id: &str, name: EventName, data: Option<serde_json::Value>) {
        let msg = ServerMessage::event(name, data);
        for client in self.clients_for(session_id) {
            let _ = client.send_reliable(msg.clone());
        }
    }

    fn on_intervention_created(&self, session_id: &str, command_id: &str, intervention_id: &str, viewer_url: &str) {
        let msg = ServerMessage::InterventionCreated {
            id: command_id.to_string(),
            intervention_id: intervention_id.to_string(),
            viewer_url: viewer_url.to_string(),
        };
        for client in self.clients_for(session_id) {
            let _ = client.send_reliable(msg.clone());
        }
    }

    fn on_intervention_completed(&self, session_id: &str, command_id: &str, intervention_id: &str, resolved_at_ms: i64) {
        let msg = ServerMessage::InterventionCompleted {
            id: command_id.to_string(),
            intervention_id: intervention_id.to_string(),
            resolved_at: resolved_at_ms,
        };
        for client in self.clients_for(session_id) {
            let _ = client.send_reliable(msg.clone());
        }
    }

    fn on_session_closed(&self, session_id: &str) {
        self.close_session(session_id);
    }
}
