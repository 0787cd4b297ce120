//! The background task that owns the single websocket to the native browser.
//!
//! Grounded on the teacher's `handler::Handler`: one task drains a command
//! channel and the connection's inbound stream, keeping a
//! `pending_commands` map keyed by [`CallId`] so every external caller gets
//! its response delivered through a one-shot channel, and fanning
//! session-scoped events out to whichever page registered for that session.
//! Unlike the teacher, this runs as a plain `tokio::spawn`ed async loop
//! instead of a hand-polled `Stream` impl — the CDP surface here is small
//! enough that the manual `Future::poll` machinery buys nothing.

use std::borrow::Cow;
use std::collections::HashMap;

use fnv::FnvHashMap;
use tokio::sync::{mpsc, oneshot};

use crate::error::{CdpError, Result};
use crate::protocol::target::SessionId;
use crate::types::{CallId, Command, CommandResponse, Message, RawEvent, Response};

pub(crate) enum HandlerCommand {
    Submit {
        method: Cow<'static, str>,
        session_id: Option<SessionId>,
        params: serde_json::Value,
        reply: oneshot::Sender<Result<Response>>,
    },
    RegisterSession {
        session_id: SessionId,
        events: mpsc::UnboundedSender<RawEvent>,
    },
    UnregisterSession {
        session_id: SessionId,
    },
}

pub struct Handler {
    conn: crate::conn::Connection,
    pending: FnvHashMap<CallId, oneshot::Sender<Result<Response>>>,
    sessions: HashMap<String, mpsc::UnboundedSender<RawEvent>>,
    commands: mpsc::UnboundedReceiver<HandlerCommand>,
}

#[derive(Clone)]
pub struct HandlerHandle {
    commands: mpsc::UnboundedSender<HandlerCommand>,
}

impl Handler {
    pub(crate) fn new(
        conn: crate::conn::Connection,
        commands: mpsc::UnboundedReceiver<HandlerCommand>,
    ) -> Self {
        Self {
            conn,
            pending: FnvHashMap::default(),
            sessions: HashMap::new(),
            commands,
        }
    }

    /// Runs until the command channel is dropped or the websocket closes.
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd),
                        None => break,
                    }
                }
                msg = self.conn.next_message() => {
                    match msg {
                        Some(Ok(Message::Response(resp))) => self.on_response(resp),
                        Some(Ok(Message::Event(event))) => self.on_event(event),
                        Some(Err(err)) => {
                            tracing::warn!(target: "browserd_cdp::handler", %err, "connection error");
                        }
                        None => break,
                    }
                }
            }
        }
        self.conn.close().await;
        tracing::debug!(target: "browserd_cdp::handler", "handler task exiting");
    }

    fn handle_command(&mut self, cmd: HandlerCommand) {
        match cmd {
            HandlerCommand::Submit {
                method,
                session_id,
                params,
                reply,
            } => {
                let id = self
                    .conn
                    .submit_command(method, session_id.map(|s| s.0), params);
                self.pending.insert(id, reply);
            }
            HandlerCommand::RegisterSession { session_id, events } => {
                self.sessions.insert(session_id.0, events);
            }
            HandlerCommand::UnregisterSession { session_id } => {
                self.sessions.remove(&session_id.0);
            }
        }
    }

    fn on_response(&mut self, resp: Response) {
        if let Some(reply) = self.pending.remove(&resp.id) {
            let _ = reply.send(Ok(resp));
        }
    }

    fn on_event(&mut self, event: RawEvent) {
        if let Some(session_id) = &event.session_id {
            if let Some(tx) = self.sessions.get(session_id) {
                let _ = tx.send(event);
            }
        }
    }
}

impl HandlerHandle {
    pub(crate) fn new(commands: mpsc::UnboundedSender<HandlerCommand>) -> Self {
        Self { commands }
    }

    pub async fn execute<C: Command>(
        &self,
        cmd: C,
        session_id: Option<SessionId>,
    ) -> Result<CommandResponse<C::Response>> {
        let method = cmd.identifier();
        let params = serde_json::to_value(&cmd)?;
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(HandlerCommand::Submit {
                method,
                session_id,
                params,
                reply: tx,
            })
            .map_err(|_| CdpError::ChannelClosed)?;
        let resp = rx.await.map_err(|_| CdpError::ChannelClosed)??;
        to_command_response::<C>(resp)
    }

    pub fn register_session(&self, session_id: SessionId) -> mpsc::UnboundedReceiver<RawEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = self
            .commands
            .send(HandlerCommand::RegisterSession { session_id, events: tx });
        rx
    }

    pub fn unregister_session(&self, session_id: SessionId) {
        let _ = self
            .commands
            .send(HandlerCommand::UnregisterSession { session_id });
    }
}

fn to_command_response<C: Command>(resp: Response) -> Result<CommandResponse<C::Response>> {
    if let Some(result) = resp.result {
        let result = serde_json::from_value(result)?;
        Ok(CommandResponse { id: resp.id, result })
    } else if let Some(err) = resp.error {
        Err(err.into())
    } else {
        Err(CdpError::NoResponse)
    }
}
