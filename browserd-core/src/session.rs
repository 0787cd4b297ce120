//! A single isolated browser session (§3): one page, one debug channel, one
//! command queue, a set of connected clients, and the bookkeeping the
//! Registry needs to evict and describe it.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use browserd_cdp::protocol::target::{BrowserContextId, TargetId};
use browserd_protocol::message::Viewport;
use browserd_protocol::ErrorCode;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::command_queue::{CommandOutcome, CommandQueue, QueueConfig};
use crate::debug_channel::DebugChannel;
use crate::sink::{EventSink, Frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Creating,
    Ready,
    Closing,
    Closed,
}

pub struct SessionOptions {
    pub viewport: Viewport,
    pub initial_url: Option<String>,
    pub delay_mode: Option<crate::command_queue::DelayMode>,
    pub command_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            viewport: Viewport { w: 1280, h: 720, dpr: 1.0 },
            initial_url: None,
            delay_mode: None,
            command_timeout: Duration::from_secs(30),
        }
    }
}

pub struct Session {
    pub id: String,
    pub browser_context_id: BrowserContextId,
    pub target_id: TargetId,
    pub channel: Arc<DebugChannel>,
    pub queue: Arc<CommandQueue>,
    pub viewport: Arc<Mutex<Viewport>>,
    pub clients: Mutex<HashSet<String>>,
    pub state: Mutex<SessionState>,
    last_frame: std::sync::Mutex<Option<Frame>>,
    pub created_at: DateTime<Utc>,
    last_activity_ms: AtomicI64,
}

impl Session {
    pub fn new(
        id: String,
        browser_context_id: BrowserContextId,
        target_id: TargetId,
        channel: Arc<DebugChannel>,
        viewport: Arc<Mutex<Viewport>>,
        sink: Arc<dyn EventSink>,
        config: QueueConfig,
    ) -> Self {
        let queue = Arc::new(CommandQueue::spawn(id.clone(), channel.clone(), viewport.clone(), sink, config));
        let now = Utc::now();
        Self {
            id,
            browser_context_id,
            target_id,
            channel,
            queue,
            viewport,
            clients: Mutex::new(HashSet::new()),
            state: Mutex::new(SessionState::Creating),
            last_frame: std::sync::Mutex::new(None),
            created_at: now,
            last_activity_ms: AtomicI64::new(now.timestamp_millis()),
        }
    }

    pub async fn mark_ready(&self) {
        *self.state.lock().await = SessionState::Ready;
    }

    pub async fn is_ready(&self) -> bool {
        matches!(*self.state.lock().await, SessionState::Ready)
    }

    pub fn touch(&self) {
        self.last_activity_ms.store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_activity_ms.load(Ordering::Relaxed)).unwrap_or(self.created_at)
    }

    pub async fn add_client(&self, client_id: String) {
        self.clients.lock().await.insert(client_id);
        self.touch();
    }

    pub async fn remove_client(&self, client_id: &str) {
        self.clients.lock().await.remove(client_id);
        self.touch();
    }

    pub async fn client_count(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn is_idle(&self) -> bool {
        self.client_count().await == 0
    }

    pub async fn enqueue_command(
        &self,
        command_id: impl Into<String>,
        method: impl Into<String>,
        params: serde_json::Value,
        timeout: Option<Duration>,
    ) -> CommandOutcome {
        if !self.is_ready().await {
            return CommandOutcome::err(ErrorCode::SessionNotReady, "session is not ready");
        }
        self.touch();
        self.queue.enqueue(command_id, method, params, timeout).await
    }

    pub async fn current_viewport(&self) -> Viewport {
        *self.viewport.lock().await
    }

    /// Single-writer (the debug channel's frame handler), multi-reader
    /// (new-client warm-up) — a plain mutex swap is enough (§5).
    pub fn store_frame(&self, frame: Frame) {
        self.touch();
        *self.last_frame.lock().unwrap() = Some(frame);
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.last_frame.lock().unwrap().clone()
    }

    /// Transitions Ready → Closing → Closed, tearing down the debug channel
    /// and command queue. Idempotent.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        if *state == SessionState::Closed {
            return;
        }
        *state = SessionState::Closing;
        drop(state);

        self.queue.close().await;
        self.channel.close().await;

        *self.state.lock().await = SessionState::Closed;
    }
}
