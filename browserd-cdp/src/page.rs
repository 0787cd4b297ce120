//! A handle to one attached page: navigation, screenshots, the screencast
//! stream, and input dispatch, all addressed through its flattened session.

use crate::error::Result;
use crate::handler::HandlerHandle;
use crate::protocol::emulation::SetDeviceMetricsOverrideParams;
use crate::protocol::input::{DispatchKeyEventParams, DispatchMouseEventParams};
use crate::protocol::page::{
    CaptureScreenshotParams, GetFrameTreeParams, NavigateParams, ScreencastFrameAckParams,
    ScreenshotFormat, StartScreencastParams, StopScreencastParams,
};
use crate::protocol::runtime::{EnableParams, EvaluateParams, EvaluateResponse};
use crate::protocol::target::{SessionId, TargetId};

/// A handle to one attached page. Events for its session (screencast
/// frames, console/exception notifications) arrive on the separate
/// `mpsc::UnboundedReceiver<RawEvent>` returned alongside this handle by
/// [`crate::browser::Browser::new_page`] — kept apart from the RPC path so a
/// caller can hold the events receiver across an `await` without blocking
/// other callers issuing commands against the same session.
pub struct Page {
    handler: HandlerHandle,
    target_id: TargetId,
    session_id: SessionId,
}

impl Page {
    pub(crate) fn new(handler: HandlerHandle, target_id: TargetId, session_id: SessionId) -> Self {
        Self {
            handler,
            target_id,
            session_id,
        }
    }

    pub fn target_id(&self) -> &TargetId {
        &self.target_id
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub async fn enable_runtime(&self) -> Result<()> {
        self.handler
            .execute(EnableParams, Some(self.session_id.clone()))
            .await?;
        Ok(())
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.handler
            .execute(NavigateParams::new(url), Some(self.session_id.clone()))
            .await?;
        Ok(())
    }

    pub async fn evaluate(&self, expression: &str) -> Result<EvaluateResponse> {
        let resp = self
            .handler
            .execute(EvaluateParams::new(expression), Some(self.session_id.clone()))
            .await?;
        Ok(resp.result)
    }

    pub async fn current_url(&self) -> Result<String> {
        let resp = self
            .handler
            .execute(GetFrameTreeParams, Some(self.session_id.clone()))
            .await?;
        Ok(resp.result.frame_tree.frame.url)
    }

    /// Captures a single still frame, base64-encoded as `format` (jpeg/png).
    pub async fn screenshot(&self, format: ScreenshotFormat, quality: Option<u32>) -> Result<String> {
        let params = CaptureScreenshotParams {
            format,
            quality,
            ..Default::default()
        };
        let resp = self
            .handler
            .execute(params, Some(self.session_id.clone()))
            .await?;
        Ok(resp.result.data)
    }

    pub async fn set_viewport(&self, width: u32, height: u32, device_scale_factor: f64) -> Result<()> {
        self.handler
            .execute(
                SetDeviceMetricsOverrideParams::new(width, height, device_scale_factor),
                Some(self.session_id.clone()),
            )
            .await?;
        Ok(())
    }

    pub async fn start_screencast(&self, params: StartScreencastParams) -> Result<()> {
        self.handler
            .execute(params, Some(self.session_id.clone()))
            .await?;
        Ok(())
    }

    pub async fn stop_screencast(&self) -> Result<()> {
        self.handler
            .execute(StopScreencastParams, Some(self.session_id.clone()))
            .await?;
        Ok(())
    }

    pub async fn ack_screencast_frame(&self, frame_session_id: u32) -> Result<()> {
        self.handler
            .execute(
                ScreencastFrameAckParams {
                    session_id: frame_session_id,
                },
                Some(self.session_id.clone()),
            )
            .await?;
        Ok(())
    }

    pub async fn dispatch_mouse_event(&self, params: DispatchMouseEventParams) -> Result<()> {
        self.handler
            .execute(params, Some(self.session_id.clone()))
            .await?;
        Ok(())
    }

    pub async fn dispatch_key_event(&self, params: DispatchKeyEventParams) -> Result<()> {
        self.handler
            .execute(params, Some(self.session_id.clone()))
            .await?;
        Ok(())
    }
}
