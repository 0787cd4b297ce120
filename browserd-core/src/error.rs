//! Errors raised inside the multiplexer, each carrying the stable wire
//! [`ErrorCode`] it resolves to.

use browserd_protocol::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("session limit reached")]
    SessionLimitReached,
    #[error("failed to create session: {0}")]
    SessionCreationFailed(String),
    #[error("unknown method: {0}")]
    UnknownMethod(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("command timed out")]
    CommandTimeout,
    #[error("command was cancelled")]
    Cancelled,
    #[error("{0}")]
    Execution(String),
    #[error(transparent)]
    Cdp(#[from] browserd_cdp::CdpError),
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;

impl CoreError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::SessionNotFound(_) => ErrorCode::SessionNotFound,
            CoreError::SessionLimitReached => ErrorCode::SessionLimitReached,
            CoreError::SessionCreationFailed(_) => ErrorCode::SessionCreationFailed,
            CoreError::UnknownMethod(_) => ErrorCode::UnknownMethod,
            CoreError::InvalidParams(_) => ErrorCode::InvalidParams,
            CoreError::CommandTimeout => ErrorCode::CommandTimeout,
            CoreError::Cancelled => ErrorCode::Cancelled,
            CoreError::Execution(_) => ErrorCode::ExecutionError,
            CoreError::Cdp(_) => ErrorCode::CommandFailed,
        }
    }
}
