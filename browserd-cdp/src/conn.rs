//! The websocket connection to the chromium instance.
//!
//! One `Connection` per browser process, serialized through a single task
//! (see [`crate::handler::Handler`]): commands are queued and flushed in
//! order, inbound frames are decoded into [`Message`] and handed back to the
//! caller one at a time.

use std::borrow::Cow;
use std::collections::VecDeque;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{CdpError, Result};
use crate::types::{CallId, Message, MethodCall};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug)]
pub struct Connection {
    ws: WsStream,
    pending: VecDeque<MethodCall>,
    next_id: usize,
}

impl Connection {
    pub async fn connect(debug_ws_url: &str) -> Result<Self> {
        let (ws, _) = connect_async(debug_ws_url).await?;
        Ok(Self {
            ws,
            pending: VecDeque::new(),
            next_id: 0,
        })
    }

    fn next_call_id(&mut self) -> CallId {
        let id = CallId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    /// Queue a command for sending and return the id that will tag its
    /// response.
    pub fn submit_command(
        &mut self,
        method: Cow<'static, str>,
        session_id: Option<String>,
        params: serde_json::Value,
    ) -> CallId {
        let id = self.next_call_id();
        tracing::debug!(target: "browserd_cdp::conn", %id, %method, "submit command");
        self.pending.push_back(MethodCall {
            id,
            session_id,
            method,
            params,
        });
        id
    }

    async fn flush_pending(&mut self) -> Result<()> {
        while let Some(call) = self.pending.pop_front() {
            let text = serde_json::to_string(&call)?;
            self.ws.send(WsMessage::Text(text)).await?;
        }
        Ok(())
    }

    /// Flush everything queued, then wait for the next inbound frame.
    pub async fn next_message(&mut self) -> Option<Result<Message>> {
        if let Err(err) = self.flush_pending().await {
            return Some(Err(err));
        }

        match self.ws.next().await {
            Some(Ok(WsMessage::Text(text))) => match serde_json::from_str::<Message>(&text) {
                Ok(msg) => Some(Ok(msg)),
                Err(err) => {
                    tracing::error!(target: "browserd_cdp::conn", %text, "failed to decode cdp frame");
                    Some(Err(CdpError::from(err)))
                }
            },
            Some(Ok(WsMessage::Binary(data))) => Some(
                serde_json::from_slice::<Message>(&data).map_err(CdpError::from),
            ),
            Some(Ok(WsMessage::Close(_))) | None => None,
            Some(Ok(_)) => Some(Err(CdpError::ConnectionClosed)),
            Some(Err(err)) => Some(Err(CdpError::Ws(err))),
        }
    }

    pub async fn close(&mut self) {
        let _ = self.ws.close(None).await;
    }
}
