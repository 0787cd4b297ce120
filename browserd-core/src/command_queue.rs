//! Per-session FIFO command queue (§4.D): one worker drains it in order,
//! each call wrapped in a timeout, with optional inter-operation delays and
//! table-driven error classification.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use browserd_cdp::protocol::page::ScreenshotFormat;
use browserd_protocol::message::{EventName, KeyAction, MouseAction, Viewport};
use browserd_protocol::ErrorCode;
use rand::Rng;
use tokio::sync::{oneshot, Mutex, Notify};
use tokio::task::JoinHandle;

use crate::debug_channel::DebugChannel;
use crate::error_classifier::classify;
use crate::intervention::{CreateRequest, InterventionCoordinator, Resolution};
use crate::sink::EventSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    Load,
    DomContentLoaded,
    NetworkIdle,
}

impl WaitUntil {
    fn from_params(params: &serde_json::Value) -> Self {
        match params.get("waitUntil").and_then(|v| v.as_str()) {
            Some("load") => WaitUntil::Load,
            Some("networkidle") => WaitUntil::NetworkIdle,
            _ => WaitUntil::DomContentLoaded,
        }
    }
}

/// Bounded random inter-operation delay, scaled up slightly as more
/// commands complete ("fatigue"). Opaque to the caller; never part of a
/// command's result.
#[derive(Debug, Clone, Copy)]
pub struct DelayMode {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayMode {
    pub const NORMAL: DelayMode = DelayMode { min_ms: 20, max_ms: 120 };
    pub const SLOW: DelayMode = DelayMode { min_ms: 100, max_ms: 400 };
}

pub struct QueueConfig {
    pub default_timeout: Duration,
    pub delay_mode: Option<DelayMode>,
    pub interventions: Arc<InterventionCoordinator>,
    pub viewer_base_url: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            delay_mode: None,
            interventions: InterventionCoordinator::new(),
            viewer_base_url: "http://localhost:3000".to_string(),
        }
    }
}

pub struct CommandOutcome {
    pub ok: bool,
    pub result: Option<serde_json::Value>,
    pub error: Option<(ErrorCode, String)>,
}

impl CommandOutcome {
    fn ok(result: serde_json::Value) -> Self {
        Self { ok: true, result: Some(result), error: None }
    }
    pub(crate) fn err(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { ok: false, result: None, error: Some((code, message.into())) }
    }
}

struct QueuedCommand {
    command_id: String,
    method: String,
    params: serde_json::Value,
    timeout: Option<Duration>,
    reply: oneshot::Sender<CommandOutcome>,
}

struct SharedState {
    queue: Mutex<VecDeque<QueuedCommand>>,
    notify: Notify,
    closed: std::sync::atomic::AtomicBool,
    completed: AtomicU64,
}

pub struct CommandQueue {
    shared: Arc<SharedState>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CommandQueue {
    pub fn spawn(
        session_id: String,
        channel: Arc<DebugChannel>,
        viewport: Arc<Mutex<Viewport>>,
        sink: Arc<dyn EventSink>,
        config: QueueConfig,
    ) -> Self {
        let shared = Arc::new(SharedState {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            closed: std::sync::atomic::AtomicBool::new(false),
            completed: AtomicU64::new(0),
        });

        let worker = tokio::spawn(run_worker(
            shared.clone(),
            session_id,
            channel,
            viewport,
            sink,
            config,
        ));

        Self { shared, worker: Mutex::new(Some(worker)) }
    }

    pub async fn enqueue(
        &self,
        command_id: impl Into<String>,
        method: impl Into<String>,
        params: serde_json::Value,
        timeout: Option<Duration>,
    ) -> CommandOutcome {
        let (tx, rx) = oneshot::channel();
        {
            let mut queue = self.shared.queue.lock().await;
            queue.push_back(QueuedCommand {
                command_id: command_id.into(),
                method: method.into(),
                params,
                timeout,
                reply: tx,
            });
        }
        self.shared.notify.notify_one();
        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => CommandOutcome::err(ErrorCode::Cancelled, "queue shut down"),
        }
    }

    /// Evicts every queued-but-not-running command with `CANCELLED`; the
    /// command currently executing runs to completion or timeout.
    pub async fn clear(&self) {
        let mut queue = self.shared.queue.lock().await;
        for cmd in queue.drain(..) {
            let _ = cmd.reply.send(CommandOutcome::err(ErrorCode::Cancelled, "queue cleared"));
        }
    }

    pub async fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.clear().await;
        self.shared.notify.notify_one();
        if let Some(handle) = self.worker.lock().await.take() {
            handle.abort();
        }
    }
}

async fn run_worker(
    shared: Arc<SharedState>,
    session_id: String,
    channel: Arc<DebugChannel>,
    viewport: Arc<Mutex<Viewport>>,
    sink: Arc<dyn EventSink>,
    config: QueueConfig,
) {
    loop {
        if shared.closed.load(Ordering::SeqCst) {
            return;
        }
        let next = { shared.queue.lock().await.pop_front() };
        let cmd = match next {
            Some(cmd) => cmd,
            None => {
                shared.notify.notified().await;
                continue;
            }
        };

        if let Some(mode) = config.delay_mode {
            sleep_with_fatigue(mode, shared.completed.load(Ordering::Relaxed)).await;
        }

        let outcome = if cmd.method == "requestHumanIntervention" {
            // Intentionally not wrapped in the per-command timeout: a human
            // resolving a CAPTCHA routinely takes longer than 30s. An
            // intervention-specific timeout, if given, is honored inside
            // `request_human_intervention` itself.
            request_human_intervention(
                &session_id,
                &cmd.command_id,
                &sink,
                &config.interventions,
                &config.viewer_base_url,
                &cmd.params,
            )
            .await
        } else {
            let timeout = cmd.timeout.unwrap_or(config.default_timeout);
            match tokio::time::timeout(
                timeout,
                execute(&session_id, &channel, &viewport, &sink, &cmd.method, &cmd.params),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => CommandOutcome::err(ErrorCode::Timeout, format!("{} timed out after {:?}", cmd.method, timeout)),
            }
        };

        if config.delay_mode.is_some() {
            sleep_with_fatigue(config.delay_mode.unwrap(), shared.completed.load(Ordering::Relaxed)).await;
        }
        shared.completed.fetch_add(1, Ordering::Relaxed);

        let _ = cmd.reply.send(outcome);
    }
}

async fn sleep_with_fatigue(mode: DelayMode, completed: u64) {
    let fatigue = 1.0 + (completed as f64 / 50.0).min(1.0);
    let min_ms = (mode.min_ms as f64 * fatigue) as u64;
    let max_ms = (mode.max_ms as f64 * fatigue) as u64;
    let delay = if max_ms > min_ms {
        rand::thread_rng().gen_range(min_ms..=max_ms)
    } else {
        min_ms
    };
    tokio::time::sleep(Duration::from_millis(delay)).await;
}

/// Parks until a human resolves the intervention out-of-band (§4.F,
/// scenario 6): creates the record, emits `intervention_created`
/// immediately, then awaits the coordinator's rendezvous channel.
async fn request_human_intervention(
    session_id: &str,
    command_id: &str,
    sink: &Arc<dyn EventSink>,
    interventions: &Arc<InterventionCoordinator>,
    viewer_base_url: &str,
    params: &serde_json::Value,
) -> CommandOutcome {
    let reason = match required_str(params, "reason") {
        Ok(r) => r.to_string(),
        Err(outcome) => return outcome,
    };
    let instructions = match required_str(params, "instructions") {
        Ok(i) => i.to_string(),
        Err(outcome) => return outcome,
    };

    let created = interventions
        .create(CreateRequest {
            session_id: session_id.to_string(),
            reason,
            instructions,
            command_id: command_id.to_string(),
        })
        .await;

    let Some((record, rx)) = created else {
        return CommandOutcome::err(ErrorCode::ExecutionError, "session already has a pending intervention");
    };

    let viewer_url = format!("{viewer_base_url}/sessions/{session_id}/viewer?intervention={}", record.id);
    sink.on_intervention_created(session_id, command_id, &record.id, &viewer_url);

    let timeout_ms = params.get("timeoutMs").and_then(|v| v.as_u64());
    let resolution = match timeout_ms {
        Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), rx).await {
            Ok(Ok(resolution)) => resolution,
            Ok(Err(_)) => Resolution::Cancelled,
            Err(_) => {
                interventions.cancel(&record.id).await;
                Resolution::Cancelled
            }
        },
        None => rx.await.unwrap_or(Resolution::Cancelled),
    };

    match resolution {
        Resolution::Completed { resolved_at } => {
            sink.on_intervention_completed(session_id, command_id, &record.id, resolved_at.timestamp_millis());
            CommandOutcome::ok(serde_json::json!({
                "interventionId": record.id,
                "resolvedAt": resolved_at.timestamp_millis(),
            }))
        }
        Resolution::Cancelled => CommandOutcome::err(ErrorCode::Cancelled, "intervention cancelled"),
    }
}

async fn execute(
    session_id: &str,
    channel: &Arc<DebugChannel>,
    viewport: &Arc<Mutex<Viewport>>,
    sink: &Arc<dyn EventSink>,
    method: &str,
    params: &serde_json::Value,
) -> CommandOutcome {
    let result = match method {
        "navigate" => navigate(channel, params, WaitUntil::from_params(params)).await,
        "click" => click_like(channel, params, MouseAction::Click, "clicked").await,
        "dblclick" => click_like(channel, params, MouseAction::Dblclick, "dblclicked").await,
        "hover" => click_like(channel, params, MouseAction::Move, "hovered").await,
        "type" => type_text(channel, params).await,
        "press" => press_key(channel, params).await,
        "fill" => fill(channel, params).await,
        "waitForSelector" => wait_for_selector(channel, params).await,
        "setViewport" => set_viewport(channel, viewport, params).await,
        "evaluate" => evaluate(channel, params).await,
        "screenshot" => screenshot(channel, viewport, params).await,
        "goBack" => history_nav(channel, "history.back()", WaitUntil::from_params(params)).await,
        "goForward" => history_nav(channel, "history.forward()", WaitUntil::from_params(params)).await,
        "reload" => history_nav(channel, "location.reload()", WaitUntil::from_params(params)).await,
        other => Err(CommandOutcome::err(ErrorCode::UnknownMethod, format!("unknown method: {other}"))),
    };

    match result {
        Ok(outcome) => {
            if matches!(method, "navigate" | "goBack" | "goForward" | "reload") && outcome.ok {
                if let Some(url) = outcome.result.as_ref().and_then(|r| r.get("url")).and_then(|u| u.as_str()) {
                    sink.on_event(session_id, EventName::Navigated, Some(serde_json::json!({ "url": url })));
                }
            }
            outcome
        }
        Err(outcome) => outcome,
    }
}

fn missing_param(name: &str) -> CommandOutcome {
    CommandOutcome::err(ErrorCode::InvalidParams, format!("missing required param: {name}"))
}

fn required_str<'a>(params: &'a serde_json::Value, name: &str) -> Result<&'a str, CommandOutcome> {
    params.get(name).and_then(|v| v.as_str()).ok_or_else(|| missing_param(name))
}

async fn eval_value(channel: &DebugChannel, expression: &str) -> Result<serde_json::Value, CommandOutcome> {
    let page = channel.page().await;
    match page.evaluate(expression).await {
        Ok(resp) => {
            if let Some(exc) = resp.exception_details {
                let message = exc.exception.and_then(|e| e.description).unwrap_or(exc.text);
                Err(CommandOutcome::err(classify(&message), message))
            } else {
                Ok(resp.result.value.unwrap_or(serde_json::Value::Null))
            }
        }
        Err(err) => Err(CommandOutcome::err(classify(&err.to_string()), err.to_string())),
    }
}

async fn navigate(channel: &DebugChannel, params: &serde_json::Value, wait_until: WaitUntil) -> Result<CommandOutcome, CommandOutcome> {
    let url = required_str(params, "url")?;
    {
        let page = channel.page().await;
        page.navigate(url).await.map_err(|e| CommandOutcome::err(classify(&e.to_string()), e.to_string()))?;
    }
    wait_for_lifecycle(channel, wait_until).await?;
    let final_url = current_url(channel).await?;
    Ok(CommandOutcome::ok(serde_json::json!({ "url": final_url })))
}

async fn history_nav(channel: &DebugChannel, script: &str, wait_until: WaitUntil) -> Result<CommandOutcome, CommandOutcome> {
    eval_value(channel, script).await?;
    wait_for_lifecycle(channel, wait_until).await?;
    let url = current_url(channel).await?;
    Ok(CommandOutcome::ok(serde_json::json!({ "url": url })))
}

async fn current_url(channel: &DebugChannel) -> Result<String, CommandOutcome> {
    let page = channel.page().await;
    page.current_url().await.map_err(|e| CommandOutcome::err(classify(&e.to_string()), e.to_string()))
}

async fn wait_for_lifecycle(channel: &DebugChannel, wait_until: WaitUntil) -> Result<(), CommandOutcome> {
    let expr = match wait_until {
        WaitUntil::Load => "document.readyState === 'complete'",
        WaitUntil::DomContentLoaded => "document.readyState !== 'loading'",
        WaitUntil::NetworkIdle => "document.readyState === 'complete'",
    };
    poll_until(channel, expr, Duration::from_millis(50)).await?;
    if wait_until == WaitUntil::NetworkIdle {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    Ok(())
}

async fn poll_until(channel: &DebugChannel, predicate_expr: &str, interval: Duration) -> Result<(), CommandOutcome> {
    loop {
        let value = eval_value(channel, predicate_expr).await?;
        if value.as_bool().unwrap_or(false) {
            return Ok(());
        }
        tokio::time::sleep(interval).await;
    }
}

/// Resolves an element's viewport-space center point, scrolling it into
/// view first. Returns `SelectorError` if nothing matches.
async fn locate_center(channel: &DebugChannel, selector: &str) -> Result<(f64, f64), CommandOutcome> {
    let expr = format!(
        "(() => {{ const el = document.querySelector({sel}); if (!el) return null; \
         el.scrollIntoView({{block:'center', inline:'center'}}); \
         const r = el.getBoundingClientRect(); return {{x: r.left + r.width/2, y: r.top + r.height/2}}; }})()",
        sel = serde_json::to_string(selector).unwrap_or_default(),
    );
    let value = eval_value(channel, &expr).await?;
    if value.is_null() {
        return Err(CommandOutcome::err(ErrorCode::SelectorError, format!("no element found for selector \"{selector}\"")));
    }
    let x = value.get("x").and_then(|v| v.as_f64()).unwrap_or(0.0);
    let y = value.get("y").and_then(|v| v.as_f64()).unwrap_or(0.0);
    Ok((x, y))
}

async fn click_like(channel: &DebugChannel, params: &serde_json::Value, action: MouseAction, verb: &str) -> Result<CommandOutcome, CommandOutcome> {
    let selector = required_str(params, "selector")?;
    let (x, y) = locate_center(channel, selector).await?;
    channel
        .dispatch_mouse(action, x, y, 0, browserd_cdp::protocol::input::MouseButton::Left, None, None)
        .await;
    Ok(CommandOutcome::ok(serde_json::json!({ verb: selector })))
}

async fn type_text(channel: &DebugChannel, params: &serde_json::Value) -> Result<CommandOutcome, CommandOutcome> {
    let selector = required_str(params, "selector")?;
    let text = required_str(params, "text")?;
    focus(channel, selector).await?;
    let delay_ms = params.get("delay").and_then(|v| v.as_u64());
    for ch in text.chars() {
        channel.dispatch_key(KeyAction::Press, 0, Some(&ch.to_string()), Some(&ch.to_string())).await;
        if let Some(delay) = delay_ms {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }
    Ok(CommandOutcome::ok(serde_json::json!({ "typed": text, "into": selector })))
}

async fn press_key(channel: &DebugChannel, params: &serde_json::Value) -> Result<CommandOutcome, CommandOutcome> {
    let key = required_str(params, "key")?;
    if let Some(selector) = params.get("selector").and_then(|v| v.as_str()) {
        focus(channel, selector).await?;
    }
    let text = if key.chars().count() == 1 { Some(key) } else { None };
    channel.dispatch_key(KeyAction::Press, 0, Some(key), text).await;
    Ok(CommandOutcome::ok(serde_json::json!({ "pressed": key })))
}

async fn focus(channel: &DebugChannel, selector: &str) -> Result<(), CommandOutcome> {
    let expr = format!(
        "(() => {{ const el = document.querySelector({sel}); if (!el) return false; el.focus(); return true; }})()",
        sel = serde_json::to_string(selector).unwrap_or_default(),
    );
    let found = eval_value(channel, &expr).await?;
    if !found.as_bool().unwrap_or(false) {
        return Err(CommandOutcome::err(ErrorCode::SelectorError, format!("no element found for selector \"{selector}\"")));
    }
    Ok(())
}

async fn fill(channel: &DebugChannel, params: &serde_json::Value) -> Result<CommandOutcome, CommandOutcome> {
    let selector = required_str(params, "selector")?;
    let value = required_str(params, "value")?;
    let expr = format!(
        "(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
         el.value = {val}; el.dispatchEvent(new Event('input', {{bubbles:true}})); \
         el.dispatchEvent(new Event('change', {{bubbles:true}})); return true; }})()",
        sel = serde_json::to_string(selector).unwrap_or_default(),
        val = serde_json::to_string(value).unwrap_or_default(),
    );
    let ok = eval_value(channel, &expr).await?;
    if !ok.as_bool().unwrap_or(false) {
        return Err(CommandOutcome::err(ErrorCode::SelectorError, format!("no element found for selector \"{selector}\"")));
    }
    Ok(CommandOutcome::ok(serde_json::json!({ "filled": selector, "with": value })))
}

async fn wait_for_selector(channel: &DebugChannel, params: &serde_json::Value) -> Result<CommandOutcome, CommandOutcome> {
    let selector = required_str(params, "selector")?;
    let state = params.get("state").and_then(|v| v.as_str()).unwrap_or("visible");
    let predicate = if state == "attached" {
        format!("!!document.querySelector({sel})", sel = serde_json::to_string(selector).unwrap_or_default())
    } else {
        format!(
            "(() => {{ const el = document.querySelector({sel}); return !!el && !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length); }})()",
            sel = serde_json::to_string(selector).unwrap_or_default(),
        )
    };
    poll_until(channel, &predicate, Duration::from_millis(50)).await?;
    Ok(CommandOutcome::ok(serde_json::json!({ "found": selector })))
}

async fn set_viewport(channel: &DebugChannel, viewport: &Arc<Mutex<Viewport>>, params: &serde_json::Value) -> Result<CommandOutcome, CommandOutcome> {
    let width = params.get("width").and_then(|v| v.as_u64()).ok_or_else(|| missing_param("width"))? as u32;
    let height = params.get("height").and_then(|v| v.as_u64()).ok_or_else(|| missing_param("height"))? as u32;
    let dpr = {
        let guard = viewport.lock().await;
        guard.dpr
    };
    {
        let page = channel.page().await;
        page.set_viewport(width, height, dpr)
            .await
            .map_err(|e| CommandOutcome::err(classify(&e.to_string()), e.to_string()))?;
    }
    {
        let mut guard = viewport.lock().await;
        guard.w = width;
        guard.h = height;
    }
    channel
        .restart_screencast(width, height)
        .await
        .map_err(|e| CommandOutcome::err(classify(&e.to_string()), e.to_string()))?;
    Ok(CommandOutcome::ok(serde_json::json!({ "viewport": { "w": width, "h": height } })))
}

async fn evaluate(channel: &DebugChannel, params: &serde_json::Value) -> Result<CommandOutcome, CommandOutcome> {
    let expression = required_str(params, "expression")?;
    let value = eval_value(channel, expression).await?;
    Ok(CommandOutcome::ok(serde_json::json!({ "result": value })))
}

async fn screenshot(channel: &DebugChannel, viewport: &Arc<Mutex<Viewport>>, params: &serde_json::Value) -> Result<CommandOutcome, CommandOutcome> {
    let full_page = params.get("fullPage").and_then(|v| v.as_bool()).unwrap_or(false);
    let (current_w, current_h, dpr) = {
        let guard = viewport.lock().await;
        (guard.w, guard.h, guard.dpr)
    };

    if full_page {
        let doc_size = eval_value(
            channel,
            "({w: document.documentElement.scrollWidth, h: document.documentElement.scrollHeight})",
        )
        .await?;
        let doc_w = doc_size.get("w").and_then(|v| v.as_u64()).unwrap_or(current_w as u64) as u32;
        let doc_h = doc_size.get("h").and_then(|v| v.as_u64()).unwrap_or(current_h as u64) as u32;
        let enlarged_w = doc_w.max(current_w);

        let page = channel.page().await;
        page.set_viewport(enlarged_w, doc_h, dpr)
            .await
            .map_err(|e| CommandOutcome::err(classify(&e.to_string()), e.to_string()))?;

        let capture = page.screenshot(ScreenshotFormat::Jpeg, Some(80)).await;
        let restore = page.set_viewport(current_w, current_h, dpr).await;

        let data = capture.map_err(|e| CommandOutcome::err(classify(&e.to_string()), e.to_string()))?;
        restore.map_err(|e| CommandOutcome::err(classify(&e.to_string()), e.to_string()))?;
        Ok(CommandOutcome::ok(serde_json::json!({ "data": data, "format": "jpeg" })))
    } else {
        let page = channel.page().await;
        let data = page
            .screenshot(ScreenshotFormat::Jpeg, Some(80))
            .await
            .map_err(|e| CommandOutcome::err(classify(&e.to_string()), e.to_string()))?;
        Ok(CommandOutcome::ok(serde_json::json!({ "data": data, "format": "jpeg" })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_until_defaults_to_dom_content_loaded() {
        let params = serde_json::json!({});
        assert_eq!(WaitUntil::from_params(&params), WaitUntil::DomContentLoaded);
    }

    #[test]
    fn wait_until_parses_explicit_values() {
        assert_eq!(WaitUntil::from_params(&serde_json::json!({"waitUntil":"load"})), WaitUntil::Load);
        assert_eq!(WaitUntil::from_params(&serde_json::json!({"waitUntil":"networkidle"})), WaitUntil::NetworkIdle);
    }

    struct RecordingSink(std::sync::Mutex<Vec<String>>);
    impl EventSink for RecordingSink {
        fn on_frame(&self, _session_id: &str, _frame: crate::sink::Frame) {}
        fn on_event(&self, _session_id: &str, _name: EventName, _data: Option<serde_json::Value>) {}
        fn on_intervention_created(&self, _session_id: &str, command_id: &str, _intervention_id: &str, _viewer_url: &str) {
            self.0.lock().unwrap().push(format!("created:{command_id}"));
        }
        fn on_intervention_completed(&self, _session_id: &str, command_id: &str, _intervention_id: &str, _resolved_at_ms: i64) {
            self.0.lock().unwrap().push(format!("completed:{command_id}"));
        }
    }

    #[tokio::test]
    async fn request_human_intervention_parks_then_resolves() {
        let interventions = InterventionCoordinator::new();
        let sink: Arc<dyn EventSink> = Arc::new(RecordingSink(std::sync::Mutex::new(Vec::new())));
        let params = serde_json::json!({ "reason": "captcha", "instructions": "solve it" });

        let interventions_for_resolver = interventions.clone();
        let resolver = tokio::spawn(async move {
            for _ in 0..20 {
                if let Some(record) = interventions_for_resolver.list_pending().await.into_iter().next() {
                    interventions_for_resolver.complete(&record.id).await;
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        let outcome = request_human_intervention("s1", "c1", &sink, &interventions, "http://localhost:3000", &params).await;
        resolver.await.unwrap();

        assert!(outcome.ok);
        assert!(outcome.result.unwrap().get("interventionId").is_some());
    }

    #[tokio::test]
    async fn request_human_intervention_rejects_second_pending() {
        let interventions = InterventionCoordinator::new();
        let sink: Arc<dyn EventSink> = Arc::new(RecordingSink(std::sync::Mutex::new(Vec::new())));
        let params = serde_json::json!({ "reason": "captcha", "instructions": "solve it" });

        let _first = interventions
            .create(CreateRequest {
                session_id: "s1".into(),
                reason: "earlier".into(),
                instructions: "earlier".into(),
                command_id: "c0".into(),
            })
            .await
            .unwrap();

        let outcome = request_human_intervention("s1", "c1", &sink, &interventions, "http://localhost:3000", &params).await;
        assert!(!outcome.ok);
    }
}
