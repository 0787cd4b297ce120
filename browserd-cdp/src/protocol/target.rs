//! `Target` domain: creating browser contexts and pages, attaching sessions.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::types::{Command, Method};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrowserContextId(pub String);

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetInfo {
    #[serde(rename = "targetId")]
    pub target_id: TargetId,
    #[serde(rename = "type")]
    pub target_type: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetDiscoverTargetsParams {
    pub discover: bool,
}

impl Method for SetDiscoverTargetsParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Target.setDiscoverTargets".into()
    }
}
impl Command for SetDiscoverTargetsParams {
    type Response = serde_json::Value;
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateBrowserContextParams {
    #[serde(rename = "disposeOnDetach")]
    pub dispose_on_detach: bool,
}

impl Default for CreateBrowserContextParams {
    fn default() -> Self {
        Self {
            dispose_on_detach: true,
        }
    }
}

impl Method for CreateBrowserContextParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Target.createBrowserContext".into()
    }
}
impl Command for CreateBrowserContextParams {
    type Response = CreateBrowserContextResponse;
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBrowserContextResponse {
    #[serde(rename = "browserContextId")]
    pub browser_context_id: BrowserContextId,
}

#[derive(Debug, Clone, Serialize)]
pub struct DisposeBrowserContextParams {
    #[serde(rename = "browserContextId")]
    pub browser_context_id: BrowserContextId,
}

impl Method for DisposeBrowserContextParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Target.disposeBrowserContext".into()
    }
}
impl Command for DisposeBrowserContextParams {
    type Response = serde_json::Value;
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTargetParams {
    pub url: String,
    #[serde(rename = "browserContextId", skip_serializing_if = "Option::is_none")]
    pub browser_context_id: Option<BrowserContextId>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl CreateTargetParams {
    pub fn new(url: impl Into<String>, browser_context_id: BrowserContextId) -> Self {
        Self {
            url: url.into(),
            browser_context_id: Some(browser_context_id),
            width: None,
            height: None,
        }
    }
}

impl Method for CreateTargetParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Target.createTarget".into()
    }
}
impl Command for CreateTargetParams {
    type Response = CreateTargetResponse;
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTargetResponse {
    #[serde(rename = "targetId")]
    pub target_id: TargetId,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttachToTargetParams {
    #[serde(rename = "targetId")]
    pub target_id: TargetId,
    pub flatten: bool,
}

impl AttachToTargetParams {
    pub fn new(target_id: TargetId) -> Self {
        Self {
            target_id,
            flatten: true,
        }
    }
}

impl Method for AttachToTargetParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Target.attachToTarget".into()
    }
}
impl Command for AttachToTargetParams {
    type Response = AttachToTargetResponse;
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachToTargetResponse {
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloseTargetParams {
    #[serde(rename = "targetId")]
    pub target_id: TargetId,
}

impl Method for CloseTargetParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Target.closeTarget".into()
    }
}
impl Command for CloseTargetParams {
    type Response = serde_json::Value;
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventTargetCreated {
    #[serde(rename = "targetInfo")]
    pub target_info: TargetInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventAttachedToTarget {
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
    #[serde(rename = "targetInfo")]
    pub target_info: TargetInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventTargetDestroyed {
    #[serde(rename = "targetId")]
    pub target_id: TargetId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventDetachedFromTarget {
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
}
