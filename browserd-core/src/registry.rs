//! Owns the one native browser and the session id → [`Session`] map (§4.E):
//! creation with cap/eviction, O(1) lookups, the GC loop, and forwarding
//! frame/event callbacks one layer further out to the Transport Layer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use browserd_cdp::{Browser, LaunchConfig};
use browserd_protocol::message::Viewport;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::command_queue::{DelayMode, QueueConfig};
use crate::debug_channel::DebugChannel;
use crate::error::{CoreError, Result};
use crate::intervention::InterventionCoordinator;
use crate::session::Session;
use crate::sink::{EventSink, Frame};

const MAX_EVICTIONS: usize = 3;

pub struct RegistryConfig {
    pub max_sessions: usize,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    pub gc_interval: Duration,
    pub default_viewport: Viewport,
    pub command_timeout: Duration,
    pub delay_mode: Option<DelayMode>,
    pub headless: bool,
    /// Used to compose the intervention viewer URL
    /// (`<base>/sessions/<id>/viewer?intervention=<id>`, §4.F).
    pub public_base_url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_sessions: 10,
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Duration::from_secs(3600),
            gc_interval: Duration::from_secs(60),
            default_viewport: Viewport { w: 1280, h: 720, dpr: 1.0 },
            command_timeout: Duration::from_secs(30),
            delay_mode: None,
            headless: false,
            public_base_url: "http://localhost:3000".to_string(),
        }
    }
}

pub struct SessionCreateOptions {
    pub viewport: Option<Viewport>,
    pub initial_url: Option<String>,
}

pub struct Registry {
    browser: Mutex<Option<Browser>>,
    sessions: DashMap<String, Arc<Session>>,
    config: RegistryConfig,
    outer_sink: Mutex<Option<Arc<dyn EventSink>>>,
    gc: Mutex<Option<JoinHandle<()>>>,
    connected: AtomicBool,
    interventions: Arc<InterventionCoordinator>,
}

impl Registry {
    pub fn new(config: RegistryConfig) -> Arc<Self> {
        Arc::new(Self {
            browser: Mutex::new(None),
            sessions: DashMap::new(),
            config,
            outer_sink: Mutex::new(None),
            gc: Mutex::new(None),
            connected: AtomicBool::new(false),
            interventions: InterventionCoordinator::new(),
        })
    }

    pub fn interventions(&self) -> Arc<InterventionCoordinator> {
        self.interventions.clone()
    }

    /// Launches the native browser with a fixed argument set, wires the
    /// Transport Layer's sink in as the final hop for frames/events, and
    /// starts the GC loop.
    pub async fn initialize(self: &Arc<Self>, outer_sink: Arc<dyn EventSink>) -> Result<()> {
        let launch_config = LaunchConfig {
            headless: self.config.headless,
            window_size: (self.config.default_viewport.w, self.config.default_viewport.h),
            extra_args: vec![
                "--disable-blink-features=AutomationControlled".to_string(),
                "--disable-infobars".to_string(),
            ],
            ..Default::default()
        };
        let browser = Browser::launch(launch_config).await?;
        *self.browser.lock().await = Some(browser);
        *self.outer_sink.lock().await = Some(outer_sink);
        self.connected.store(true, Ordering::SeqCst);

        let weak = Arc::downgrade(self);
        let interval = self.config.gc_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(registry) => registry.gc_tick().await,
                    None => return,
                }
            }
        });
        *self.gc.lock().await = Some(handle);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn cap(&self) -> usize {
        self.config.max_sessions
    }

    pub async fn create_session(self: &Arc<Self>, opts: SessionCreateOptions) -> Result<Arc<Session>> {
        if self.sessions.len() >= self.config.max_sessions {
            self.evict_idle().await;
            if self.sessions.len() >= self.config.max_sessions {
                return Err(CoreError::SessionLimitReached);
            }
        }

        let viewport = opts.viewport.unwrap_or(self.config.default_viewport);
        let initial_url = opts.initial_url.unwrap_or_else(|| "about:blank".to_string());

        let browser_guard = self.browser.lock().await;
        let browser = browser_guard
            .as_ref()
            .ok_or_else(|| CoreError::SessionCreationFailed("native browser not initialized".into()))?;

        let context_id = browser.new_browser_context().await?;
        let (page, events) = match browser.new_page(context_id.clone(), &initial_url).await {
            Ok(pair) => pair,
            Err(err) => {
                let _ = browser.dispose_browser_context(context_id).await;
                return Err(CoreError::SessionCreationFailed(err.to_string()));
            }
        };
        let target_id = page.target_id().clone();
        drop(browser_guard);

        let id = uuid::Uuid::new_v4().to_string();
        let viewport_cell = Arc::new(Mutex::new(viewport));

        let channel = Arc::new(
            DebugChannel::attach(page, events, id.clone(), viewport, self.clone() as Arc<dyn EventSink>)
                .await
                .map_err(|e| CoreError::SessionCreationFailed(e.to_string()))?,
        );
        channel
            .start_screencast(viewport.w, viewport.h)
            .await
            .map_err(|e| CoreError::SessionCreationFailed(e.to_string()))?;

        let queue_config = QueueConfig {
            default_timeout: self.config.command_timeout,
            delay_mode: self.config.delay_mode,
            interventions: self.interventions.clone(),
            viewer_base_url: self.config.public_base_url.clone(),
        };
        let session = Arc::new(Session::new(
            id.clone(),
            context_id,
            target_id,
            channel,
            viewport_cell,
            self.clone() as Arc<dyn EventSink>,
            queue_config,
        ));
        session.mark_ready().await;
        self.sessions.insert(id, session.clone());
        Ok(session)
    }

    pub fn get_session(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|e| e.value().clone())
    }

    pub fn has_session(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn list_sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|e| e.value().clone()).collect()
    }

    pub fn touch(&self, id: &str) {
        if let Some(session) = self.get_session(id) {
            session.touch();
        }
    }

    pub async fn add_client(&self, id: &str, client_id: String) -> bool {
        match self.get_session(id) {
            Some(session) => {
                session.add_client(client_id).await;
                true
            }
            None => false,
        }
    }

    pub async fn remove_client(&self, id: &str, client_id: &str) -> bool {
        match self.get_session(id) {
            Some(session) => {
                session.remove_client(client_id).await;
                true
            }
            None => false,
        }
    }

    /// Records the new viewport and restarts the screencast, called after
    /// a successful `setViewport` command.
    pub async fn update_session_screencast(&self, id: &str, w: u32, h: u32) -> Result<()> {
        let session = self.get_session(id).ok_or_else(|| CoreError::SessionNotFound(id.to_string()))?;
        {
            let mut vp = session.viewport.lock().await;
            vp.w = w;
            vp.h = h;
        }
        session.channel.restart_screencast(w, h).await?;
        Ok(())
    }

    /// Ready → Closing → Closed; idempotent. Same teardown path as GC and
    /// cap eviction (§5: "a session-destroy initiated by GC is
    /// indistinguishable from an operator-initiated destroy").
    pub async fn destroy_session(&self, id: &str) {
        if !self.sessions.contains_key(id) {
            return;
        }
        self.teardown_session(id).await;
    }

    async fn teardown_session(&self, id: &str) {
        let Some(session) = self.sessions.get(id).map(|e| e.value().clone()) else { return };
        self.interventions.cancel_by_session(id).await;
        if let Some(sink) = self.outer_sink.lock().await.clone() {
            sink.on_session_closed(id);
        }
        session.shutdown().await;
        if let Some(browser) = self.browser.lock().await.as_ref() {
            let _ = browser.dispose_browser_context(session.browser_context_id.clone()).await;
        }
        self.sessions.remove(id);
    }

    async fn evict_idle(&self) {
        let mut idle: Vec<Arc<Session>> = Vec::new();
        for entry in self.sessions.iter() {
            if entry.value().is_idle().await {
                idle.push(entry.value().clone());
            }
        }
        idle.sort_by_key(|s| s.last_activity());
        let evict_count = (idle.len() / 2).min(MAX_EVICTIONS);
        // Most-idle first: `last_activity` ascending puts the stalest
        // sessions (longest idle duration) at the front already.
        for session in idle.into_iter().take(evict_count) {
            tracing::info!(target: "browserd_core::registry", session_id = %session.id, "evicting idle session to stay under cap");
            self.teardown_session(&session.id).await;
        }
    }

    async fn gc_tick(self: Arc<Self>) {
        let now = Utc::now();
        let mut expired = Vec::new();
        for entry in self.sessions.iter() {
            let session = entry.value();
            let age = now.signed_duration_since(session.created_at);
            let idle_for = now.signed_duration_since(session.last_activity());
            let max_lifetime = chrono::Duration::from_std(self.config.max_lifetime).unwrap_or_default();
            let idle_timeout = chrono::Duration::from_std(self.config.idle_timeout).unwrap_or_default();
            let over_lifetime = age > max_lifetime;
            let over_idle = session.is_idle().await && idle_for > idle_timeout;
            if over_lifetime || over_idle {
                expired.push(session.id.clone());
            }
        }
        for id in expired {
            tracing::info!(target: "browserd_core::registry", session_id = %id, "gc destroying expired session");
            self.teardown_session(&id).await;
        }
    }

    pub async fn close(&self) {
        if let Some(handle) = self.gc.lock().await.take() {
            handle.abort();
        }
        let ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        let sink = self.outer_sink.lock().await.clone();
        for id in ids {
            if let Some(sink) = &sink {
                sink.on_session_closed(&id);
            }
            if let Some(session) = self.sessions.get(&id).map(|e| e.value().clone()) {
                session.shutdown().await;
            }
            self.sessions.remove(&id);
        }
        if let Some(browser) = self.browser.lock().await.take() {
            browser.shutdown().await;
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl EventSink for Registry {
    fn on_frame(&self, session_id: &str, frame: Frame) {
        if let Some(session) = self.get_session(session_id) {
            session.store_frame(frame.clone());
        }
        if let Some(sink) = self.outer_sink.try_lock().ok().and_then(|g| g.clone()) {
            sink.on_frame(session_id, frame);
        }
    }

    fn on_event(&self, session_id: &str, name: browserd_protocol::message::EventName, data: Option<serde_json::Value>) {
        self.touch(session_id);
        if let Some(sink) = self.outer_sink.try_lock().ok().and_then(|g| g.clone()) {
            sink.on_event(session_id, name, data);
        }
    }

    fn on_intervention_created(&self, session_id: &str, command_id: &str, intervention_id: &str, viewer_url: &str) {
        if let Some(sink) = self.outer_sink.try_lock().ok().and_then(|g| g.clone()) {
            sink.on_intervention_created(session_id, command_id, intervention_id, viewer_url);
        }
    }

    fn on_intervention_completed(&self, session_id: &str, command_id: &str, intervention_id: &str, resolved_at_ms: i64) {
        if let Some(sink) = self.outer_sink.try_lock().ok().and_then(|g| g.clone()) {
            sink.on_intervention_completed(session_id, command_id, intervention_id, resolved_at_ms);
        }
    }
}

