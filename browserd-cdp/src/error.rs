use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::types::ProtocolError;

#[derive(Debug, Error)]
pub enum CdpError {
    #[error("{0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Serde(#[from] serde_json::Error),
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Chrome(#[from] ProtocolError),
    #[error("received no response from the chromium instance")]
    NoResponse,
    #[error("the cdp connection closed")]
    ConnectionClosed,
    #[error("channel closed")]
    ChannelClosed,
    #[error("target not found: {0}")]
    TargetNotFound(String),
    #[error("{0}")]
    Launch(String),
}

pub type Result<T, E = CdpError> = std::result::Result<T, E>;

impl<T> From<mpsc::error::SendError<T>> for CdpError {
    fn from(_: mpsc::error::SendError<T>) -> Self {
        CdpError::ChannelClosed
    }
}

impl From<oneshot::error::RecvError> for CdpError {
    fn from(_: oneshot::error::RecvError) -> Self {
        CdpError::ChannelClosed
    }
}
