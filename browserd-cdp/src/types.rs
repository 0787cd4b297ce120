//! Wire types shared by every CDP command and event.
//!
//! Mirrors the `Method` / `Command` / `Event` trait split used throughout the
//! generated CDP bindings this crate's ancestor relied on, hand-rolled here
//! for the small slice of the protocol the session multiplexer needs.

use std::borrow::Cow;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Per-connection, monotonically increasing identifier for a command call.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub usize);

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl CallId {
    pub fn new(id: usize) -> Self {
        CallId(id)
    }
}

/// A method identifier like `Page.navigate`.
pub trait Method {
    fn identifier(&self) -> Cow<'static, str>;
}

/// A typed CDP command: serializable params plus the response type it expects.
pub trait Command: Serialize + Method {
    type Response: DeserializeOwned + fmt::Debug;
}

/// A typed CDP event: the unsolicited messages pushed by the browser.
pub trait Event: Method + DeserializeOwned {}

/// One outbound `{id, sessionId?, method, params}` request frame.
#[derive(Debug, Serialize)]
pub struct MethodCall {
    pub id: CallId,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub method: Cow<'static, str>,
    pub params: serde_json::Value,
}

/// A response to a [`MethodCall`].
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    pub id: CallId,
    pub result: Option<serde_json::Value>,
    pub error: Option<ProtocolError>,
}

/// An inbound message: either a response to a call, or an unsolicited event.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Response(Response),
    Event(RawEvent),
}

/// An unparsed event as it comes off the wire, keyed by `sessionId` so the
/// handler can route it to the right target without knowing every event
/// shape up front.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    pub method: Cow<'static, str>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    pub params: serde_json::Value,
}

impl Method for RawEvent {
    fn identifier(&self) -> Cow<'static, str> {
        self.method.clone()
    }
}

/// The decoded result of a [`Command`], keeping the id/method around for
/// logging and error attribution.
#[derive(Debug)]
pub struct CommandResponse<T> {
    pub id: CallId,
    pub result: T,
}

/// The CDP-level `{code, message}` error payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolError {
    pub code: i64,
    pub message: String,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cdp error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for ProtocolError {}
