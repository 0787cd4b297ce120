//! `Page` domain: navigation, screenshots, and the screencast stream.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::types::{Command, Method};

#[derive(Debug, Clone, Serialize)]
pub struct NavigateParams {
    pub url: String,
}

impl NavigateParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Method for NavigateParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Page.navigate".into()
    }
}
impl Command for NavigateParams {
    type Response = NavigateResponse;
}

#[derive(Debug, Clone, Deserialize)]
pub struct NavigateResponse {
    #[serde(rename = "frameId")]
    pub frame_id: String,
    #[serde(rename = "errorText")]
    pub error_text: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScreenshotFormat {
    Jpeg,
    Png,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaptureScreenshotParams {
    pub format: ScreenshotFormat,
    pub quality: Option<u32>,
    #[serde(rename = "captureBeyondViewport")]
    pub capture_beyond_viewport: bool,
}

impl Default for CaptureScreenshotParams {
    fn default() -> Self {
        Self {
            format: ScreenshotFormat::Jpeg,
            quality: Some(80),
            capture_beyond_viewport: false,
        }
    }
}

impl Method for CaptureScreenshotParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Page.captureScreenshot".into()
    }
}
impl Command for CaptureScreenshotParams {
    type Response = CaptureScreenshotResponse;
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureScreenshotResponse {
    pub data: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GetFrameTreeParams;

impl Method for GetFrameTreeParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Page.getFrameTree".into()
    }
}
impl Command for GetFrameTreeParams {
    type Response = GetFrameTreeResponse;
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetFrameTreeResponse {
    #[serde(rename = "frameTree")]
    pub frame_tree: FrameTree,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrameTree {
    pub frame: Frame,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Frame {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartScreencastParams {
    pub format: ScreenshotFormat,
    pub quality: u32,
    #[serde(rename = "maxWidth")]
    pub max_width: u32,
    #[serde(rename = "maxHeight")]
    pub max_height: u32,
    #[serde(rename = "everyNthFrame")]
    pub every_nth_frame: u32,
}

impl Default for StartScreencastParams {
    fn default() -> Self {
        Self {
            format: ScreenshotFormat::Jpeg,
            quality: 60,
            max_width: 1280,
            max_height: 720,
            every_nth_frame: 1,
        }
    }
}

impl Method for StartScreencastParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Page.startScreencast".into()
    }
}
impl Command for StartScreencastParams {
    type Response = serde_json::Value;
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StopScreencastParams;

impl Method for StopScreencastParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Page.stopScreencast".into()
    }
}
impl Command for StopScreencastParams {
    type Response = serde_json::Value;
}

#[derive(Debug, Clone, Serialize)]
pub struct ScreencastFrameAckParams {
    #[serde(rename = "sessionId")]
    pub session_id: u32,
}

impl Method for ScreencastFrameAckParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Page.screencastFrameAck".into()
    }
}
impl Command for ScreencastFrameAckParams {
    type Response = serde_json::Value;
}

/// `Page.screencastFrame` event payload: a single compressed frame plus the
/// device metrics it was captured at.
#[derive(Debug, Clone, Deserialize)]
pub struct EventScreencastFrame {
    pub data: String,
    pub metadata: ScreencastFrameMetadata,
    #[serde(rename = "sessionId")]
    pub session_id: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScreencastFrameMetadata {
    #[serde(rename = "deviceWidth")]
    pub device_width: f64,
    #[serde(rename = "deviceHeight")]
    pub device_height: f64,
    #[serde(rename = "pageScaleFactor")]
    pub page_scale_factor: f64,
    pub timestamp: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SetLifecycleEventsEnabledParams {
    pub enabled: bool,
}

impl Method for SetLifecycleEventsEnabledParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Page.setLifecycleEventsEnabled".into()
    }
}
impl Command for SetLifecycleEventsEnabledParams {
    type Response = serde_json::Value;
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventLifecycleEvent {
    pub name: String,
    #[serde(rename = "frameId")]
    pub frame_id: String,
}
