//! One connected peer (§4.G): outbound messages split across a small
//! drop-on-full channel for frames and an unbounded channel for everything
//! that must never be dropped (results, events, intervention envelopes).

use std::sync::atomic::{AtomicI64, Ordering};

use browserd_protocol::message::ServerMessage;
use tokio::sync::{mpsc, watch};

const FRAME_CHANNEL_CAPACITY: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    FullDuplex,
    Streaming,
}

/// Handed to whoever owns the physical connection (a websocket task, a
/// streaming-response task); the sending half of both channels.
pub struct ClientHandle {
    pub id: String,
    pub kind: ClientKind,
    pub session_id: String,
    frame_tx: mpsc::Sender<ServerMessage>,
    reliable_tx: mpsc::UnboundedSender<ServerMessage>,
    closed_tx: watch::Sender<bool>,
    last_activity_ms: AtomicI64,
}

/// The receiving half, consumed by the connection's write loop.
pub struct ClientReceiver {
    frame_rx: mpsc::Receiver<ServerMessage>,
    reliable_rx: mpsc::UnboundedReceiver<ServerMessage>,
    closed_rx: watch::Receiver<bool>,
}

impl ClientHandle {
    pub(crate) fn new_pair(id: String, kind: ClientKind, session_id: String) -> (Self, ClientReceiver) {
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (reliable_tx, reliable_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);
        let handle = Self {
            id,
            kind,
            session_id,
            frame_tx,
            reliable_tx,
            closed_tx,
            last_activity_ms: AtomicI64::new(0),
        };
        (handle, ClientReceiver { frame_rx, reliable_rx, closed_rx })
    }

    pub fn touch(&self, now_ms: i64) {
        self.last_activity_ms.store(now_ms, Ordering::Relaxed);
    }

    pub fn last_activity_ms(&self) -> i64 {
        self.last_activity_ms.load(Ordering::Relaxed)
    }

    /// Best-effort: silently dropped if the client is behind.
    pub fn send_frame(&self, msg: ServerMessage) {
        if self.frame_tx.try_send(msg).is_err() {
            tracing::debug!(target: "browserd_transport::client", client_id = %self.id, "dropping frame for slow consumer");
        }
    }

    /// Never dropped; fails only once the receiver (and the connection
    /// behind it) is gone.
    pub fn send_reliable(&self, msg: ServerMessage) -> Result<(), ClientClosed> {
        self.reliable_tx.send(msg).map_err(|_| ClientClosed)
    }

    /// Signals the connection's read and write loops to stop, used when the
    /// owning session is torn down while clients are still attached.
    pub fn close(&self) {
        let _ = self.closed_tx.send(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed_tx.borrow()
    }

    /// A second, independent watcher of the close signal for a loop (e.g. a
    /// websocket's read half) that doesn't own the `ClientReceiver`.
    pub fn subscribe_closed(&self) -> watch::Receiver<bool> {
        self.closed_tx.subscribe()
    }
}

#[derive(Debug)]
pub struct ClientClosed;

impl ClientReceiver {
    /// The close signal takes priority over everything else, then reliable
    /// messages over frames, so a backlog of frames never delays a command
    /// result and a forced close is never delayed by a backlog.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        tokio::select! {
            biased;
            _ = self.closed_rx.changed() => None,
            msg = self.reliable_rx.recv() => {
                if msg.is_some() {
                    return msg;
                }
                self.frame_rx.recv().await
            }
            msg = self.frame_rx.recv() => msg,
        }
    }
}
