//! Stable wire error codes (§7) and the envelope they travel in.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Connection-plane
    ConnectionFailed,
    ConnectionTimeout,
    ConnectionClosed,
    NotConnected,
    ReconnectFailed,
    // Command-plane
    CommandTimeout,
    CommandFailed,
    UnknownMethod,
    InvalidParams,
    ExecutionError,
    Cancelled,
    // Engine-plane
    SelectorNotFound,
    SelectorError,
    NavigationError,
    Timeout,
    // Session-plane
    SessionNotFound,
    SessionNotReady,
    SessionLimitReached,
    SessionCreationFailed,
    // Provider-plane (reserved; the core never emits it)
    ProviderError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConnectionFailed => "CONNECTION_FAILED",
            ErrorCode::ConnectionTimeout => "CONNECTION_TIMEOUT",
            ErrorCode::ConnectionClosed => "CONNECTION_CLOSED",
            ErrorCode::NotConnected => "NOT_CONNECTED",
            ErrorCode::ReconnectFailed => "RECONNECT_FAILED",
            ErrorCode::CommandTimeout => "COMMAND_TIMEOUT",
            ErrorCode::CommandFailed => "COMMAND_FAILED",
            ErrorCode::UnknownMethod => "UNKNOWN_METHOD",
            ErrorCode::InvalidParams => "INVALID_PARAMS",
            ErrorCode::ExecutionError => "EXECUTION_ERROR",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::SelectorNotFound => "SELECTOR_NOT_FOUND",
            ErrorCode::SelectorError => "SELECTOR_ERROR",
            ErrorCode::NavigationError => "NAVIGATION_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::SessionNotFound => "SESSION_NOT_FOUND",
            ErrorCode::SessionNotReady => "SESSION_NOT_READY",
            ErrorCode::SessionLimitReached => "SESSION_LIMIT_REACHED",
            ErrorCode::SessionCreationFailed => "SESSION_CREATION_FAILED",
            ErrorCode::ProviderError => "PROVIDER_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `{code, message, details?}` payload carried by a failed `result` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorPayload {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ProtocolParseError(pub String);
