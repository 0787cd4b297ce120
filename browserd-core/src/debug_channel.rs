//! Per-session owner of the page's remote-debugging channel (§4.C):
//! screencast lifecycle and input dispatch, serialized to one in-flight RPC
//! at a time the way the teacher serializes every websocket send through a
//! single `Connection`.

use std::sync::Arc;

use browserd_cdp::protocol::input::{
    DispatchKeyEventParams, DispatchMouseEventParams, KeyEventType, MouseEventType,
};
use browserd_cdp::protocol::page::{ScreenshotFormat, StartScreencastParams};
use browserd_cdp::types::RawEvent;
use browserd_cdp::Page;
use browserd_protocol::message::{EventName, MouseAction};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::input_mapper;
use crate::sink::{EventSink, Frame};

const SCREENCAST_QUALITY: u32 = 60;
const SCREENCAST_EVERY_NTH_FRAME: u32 = 1;
const DBLCLICK_GAP_MS: u64 = 50;

pub struct DebugChannel {
    page: Arc<Mutex<Page>>,
    session_id: String,
    sink: Arc<dyn EventSink>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl DebugChannel {
    /// Attaches to `page`, emits the initial `ready` event, and starts the
    /// background event pump that turns screencast/console/exception
    /// devtools events into session-level frames and events.
    pub async fn attach(
        page: Page,
        events: mpsc::UnboundedReceiver<RawEvent>,
        session_id: String,
        initial_viewport: browserd_protocol::message::Viewport,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        page.enable_runtime().await?;

        let page = Arc::new(Mutex::new(page));
        sink.on_event(
            &session_id,
            EventName::Ready,
            Some(serde_json::json!({ "viewport": initial_viewport })),
        );

        let pump = spawn_pump(page.clone(), events, session_id.clone(), sink.clone());

        Ok(Self {
            page,
            session_id,
            sink,
            pump: Mutex::new(Some(pump)),
        })
    }

    pub async fn start_screencast(&self, max_width: u32, max_height: u32) -> Result<()> {
        let page = self.page.lock().await;
        page.start_screencast(StartScreencastParams {
            format: ScreenshotFormat::Jpeg,
            quality: SCREENCAST_QUALITY,
            max_width,
            max_height,
            every_nth_frame: SCREENCAST_EVERY_NTH_FRAME,
        })
        .await?;
        Ok(())
    }

    /// Restarts the screencast at a new size without dropping the active
    /// flag (§4.C, used by `setViewport`).
    pub async fn restart_screencast(&self, max_width: u32, max_height: u32) -> Result<()> {
        let page = self.page.lock().await;
        if let Err(err) = page.stop_screencast().await {
            tracing::debug!(target: "browserd_core::debug_channel", %err, "stop before restart failed, continuing");
        }
        page.start_screencast(StartScreencastParams {
            format: ScreenshotFormat::Jpeg,
            quality: SCREENCAST_QUALITY,
            max_width,
            max_height,
            every_nth_frame: SCREENCAST_EVERY_NTH_FRAME,
        })
        .await?;
        Ok(())
    }

    pub async fn page(&self) -> tokio::sync::MutexGuard<'_, Page> {
        self.page.lock().await
    }

    /// Mouse input dispatch: `click`/`dblclick` are decomposed here into
    /// the raw press/release sequence §4.C specifies; other actions map
    /// 1:1. Failures are logged and swallowed — input is best-effort.
    pub async fn dispatch_mouse(
        &self,
        action: MouseAction,
        x: f64,
        y: f64,
        modifiers: u32,
        button: browserd_cdp::protocol::input::MouseButton,
        delta_x: Option<f64>,
        delta_y: Option<f64>,
    ) {
        let result = match action {
            MouseAction::Click => self.press_release(x, y, modifiers, button, 1).await,
            MouseAction::Dblclick => {
                let first = self.press_release(x, y, modifiers, button, 1).await;
                tokio::time::sleep(std::time::Duration::from_millis(DBLCLICK_GAP_MS)).await;
                let second = self.press_release(x, y, modifiers, button, 2).await;
                first.and(second)
            }
            _ => {
                if let Some(kind) = input_mapper::mouse_action_event_type(action) {
                    self.send_mouse(kind, x, y, modifiers, button, None, delta_x, delta_y)
                        .await
                } else {
                    Ok(())
                }
            }
        };
        if let Err(err) = result {
            tracing::warn!(target: "browserd_core::debug_channel", session_id = %self.session_id, %err, "mouse dispatch failed, swallowed");
        }
    }

    async fn press_release(
        &self,
        x: f64,
        y: f64,
        modifiers: u32,
        button: browserd_cdp::protocol::input::MouseButton,
        click_count: u32,
    ) -> Result<()> {
        self.send_mouse(MouseEventType::MousePressed, x, y, modifiers, button, Some(click_count), None, None)
            .await?;
        self.send_mouse(MouseEventType::MouseReleased, x, y, modifiers, button, Some(click_count), None, None)
            .await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn send_mouse(
        &self,
        kind: MouseEventType,
        x: f64,
        y: f64,
        modifiers: u32,
        button: browserd_cdp::protocol::input::MouseButton,
        click_count: Option<u32>,
        delta_x: Option<f64>,
        delta_y: Option<f64>,
    ) -> Result<()> {
        let page = self.page.lock().await;
        page.dispatch_mouse_event(DispatchMouseEventParams {
            kind,
            x,
            y,
            modifiers,
            button: Some(button),
            click_count,
            delta_x,
            delta_y,
        })
        .await?;
        Ok(())
    }

    /// Keyboard dispatch: `press` decomposes into keyDown, an optional
    /// char event when `text` is present, then keyUp.
    pub async fn dispatch_key(&self, action: browserd_protocol::message::KeyAction, modifiers: u32, key: Option<&str>, text: Option<&str>) {
        let vk = key.and_then(input_mapper::virtual_key_code);
        let result = match action {
            browserd_protocol::message::KeyAction::Press => {
                let down = self.send_key(KeyEventType::KeyDown, modifiers, vk, key, None).await;
                let char_evt = if let Some(t) = text {
                    self.send_key(KeyEventType::Char, modifiers, vk, key, Some(t)).await
                } else {
                    Ok(())
                };
                let up = self.send_key(KeyEventType::KeyUp, modifiers, vk, key, None).await;
                down.and(char_evt).and(up)
            }
            other => {
                if let Some(kind) = input_mapper::key_action_event_type(other) {
                    self.send_key(kind, modifiers, vk, key, text).await
                } else {
                    Ok(())
                }
            }
        };
        if let Err(err) = result {
            tracing::warn!(target: "browserd_core::debug_channel", session_id = %self.session_id, %err, "key dispatch failed, swallowed");
        }
    }

    async fn send_key(
        &self,
        kind: KeyEventType,
        modifiers: u32,
        vk: Option<u32>,
        key: Option<&str>,
        text: Option<&str>,
    ) -> Result<()> {
        let page = self.page.lock().await;
        page.dispatch_key_event(DispatchKeyEventParams {
            kind,
            modifiers,
            windows_virtual_key_code: vk,
            key: key.map(str::to_string),
            text: text.map(str::to_string),
        })
        .await?;
        Ok(())
    }

    /// Stops the screencast, detaches, and releases resources. Idempotent:
    /// a second call is a harmless no-op.
    pub async fn close(&self) {
        if let Some(handle) = self.pump.lock().await.take() {
            handle.abort();
        }
        let page = self.page.lock().await;
        if let Err(err) = page.stop_screencast().await {
            tracing::debug!(target: "browserd_core::debug_channel", %err, "stop_screencast on close failed, swallowed");
        }
    }
}

fn spawn_pump(
    page: Arc<Mutex<Page>>,
    mut events: mpsc::UnboundedReceiver<RawEvent>,
    session_id: String,
    sink: Arc<dyn EventSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event.method.as_ref() {
                "Page.screencastFrame" => handle_screencast_frame(&page, &session_id, &sink, event).await,
                "Runtime.consoleAPICalled" => {
                    if let Ok(parsed) = serde_json::from_value::<
                        browserd_cdp::protocol::runtime::EventConsoleApiCalled,
                    >(event.params)
                    {
                        sink.on_event(
                            &session_id,
                            EventName::Console,
                            Some(serde_json::json!({ "kind": parsed.kind })),
                        );
                    }
                }
                "Runtime.exceptionThrown" => {
                    if let Ok(parsed) = serde_json::from_value::<
                        browserd_cdp::protocol::runtime::EventExceptionThrown,
                    >(event.params)
                    {
                        sink.on_event(
                            &session_id,
                            EventName::Error,
                            Some(serde_json::json!({ "message": parsed.exception_details.text })),
                        );
                    }
                }
                _ => {}
            }
        }
    })
}

async fn handle_screencast_frame(
    page: &Arc<Mutex<Page>>,
    session_id: &str,
    sink: &Arc<dyn EventSink>,
    event: RawEvent,
) {
    let parsed: browserd_cdp::protocol::page::EventScreencastFrame =
        match serde_json::from_value(event.params) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(target: "browserd_core::debug_channel", %err, "malformed screencastFrame event");
                return;
            }
        };

    let frame = Frame {
        data: parsed.data,
        format: "jpeg",
        viewport: browserd_protocol::message::Viewport {
            w: parsed.metadata.device_width as u32,
            h: parsed.metadata.device_height as u32,
            dpr: parsed.metadata.page_scale_factor,
        },
        timestamp_ms: (parsed.metadata.timestamp * 1000.0) as i64,
    };
    sink.on_frame(session_id, frame);

    // Ack errors are swallowed: the screencast is idempotent against them.
    let page = page.lock().await;
    if let Err(err) = page.ack_screencast_frame(parsed.session_id).await {
        tracing::debug!(target: "browserd_core::debug_channel", %err, "screencast ack failed, swallowed");
    }
}
