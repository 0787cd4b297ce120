//! HTTP/Control Surface (§4.H): session lifecycle REST, the full-duplex
//! websocket, the streaming+HTTP transport, the HTTP command/input
//! fallback, and health/readiness probes.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use browserd_core::{CoreError, Registry, SessionCreateOptions};
use browserd_protocol::message::{
    parse_client_message, serialize_server_message, ClientMessage, InputEvent, ServerMessage, Viewport,
};
use browserd_protocol::{ErrorCode, ErrorPayload};
use browserd_transport::{ClientKind, Hub};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::CorsLayer;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub hub: Arc<Hub>,
    pub config: Arc<Config>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/sessions", post(create_session).get(list_sessions))
        .route("/api/sessions/:id", get(get_session).delete(destroy_session))
        .route("/sessions/:id/viewer", get(viewer))
        .route("/sessions/:id/ws", get(ws_upgrade))
        .route("/sessions/:id/stream", get(stream))
        .route("/sessions/:id/input", post(input_post).options(input_options))
        .route(
            "/api/interventions/:id/complete",
            post(complete_intervention),
        )
        .route("/api/interventions/:id/cancel", post(cancel_intervention))
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/livez", get(livez))
        .route("/readyz", get(readyz))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// --- session descriptors -----------------------------------------------

#[derive(Debug, Serialize)]
struct SessionDescriptor {
    id: String,
    status: &'static str,
    #[serde(rename = "wsUrl")]
    ws_url: String,
    #[serde(rename = "streamUrl")]
    stream_url: String,
    #[serde(rename = "inputUrl")]
    input_url: String,
    #[serde(rename = "viewerUrl")]
    viewer_url: String,
    viewport: Viewport,
    #[serde(rename = "createdAt")]
    created_at: String,
    #[serde(rename = "clientCount", skip_serializing_if = "Option::is_none")]
    client_count: Option<usize>,
    #[serde(rename = "lastActivity", skip_serializing_if = "Option::is_none")]
    last_activity: Option<String>,
    /// The session's current navigated URL. Left unset: fetching it would
    /// require a live round trip to the page for every listed session.
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

async fn describe(state: &AppState, session: &browserd_core::Session) -> SessionDescriptor {
    let base = state.config.base_url();
    let ws_base = state.config.ws_base_url();
    let id = session.id.clone();
    SessionDescriptor {
        status: status_str(*session.state.lock().await),
        ws_url: format!("{ws_base}/sessions/{id}/ws"),
        stream_url: format!("{base}/sessions/{id}/stream"),
        input_url: format!("{base}/sessions/{id}/input"),
        viewer_url: format!("{base}/sessions/{id}/viewer"),
        viewport: session.current_viewport().await,
        created_at: session.created_at.to_rfc3339(),
        client_count: Some(session.client_count().await),
        last_activity: Some(session.last_activity().to_rfc3339()),
        url: None,
        id,
    }
}

fn status_str(state: browserd_core::SessionState) -> &'static str {
    use browserd_core::SessionState::*;
    match state {
        Creating => "creating",
        Ready => "ready",
        Closing => "closing",
        Closed => "closed",
    }
}

#[derive(Debug, Deserialize, Default)]
struct CreateSessionBody {
    viewport: Option<Viewport>,
    #[serde(rename = "initialUrl")]
    initial_url: Option<String>,
    /// Accepted and ignored: stealth/fingerprint profiles are out of scope.
    #[allow(dead_code)]
    profile: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorPayload,
}

fn error_response(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: ErrorPayload::new(code, message) })).into_response()
}

// --- session lifecycle ---------------------------------------------------

async fn create_session(State(state): State<AppState>, raw_body: axum::body::Bytes) -> Response {
    let body: CreateSessionBody = if raw_body.is_empty() {
        CreateSessionBody::default()
    } else {
        match serde_json::from_slice(&raw_body) {
            Ok(body) => body,
            Err(err) => return error_response(StatusCode::BAD_REQUEST, ErrorCode::InvalidParams, err.to_string()),
        }
    };
    let opts = SessionCreateOptions { viewport: body.viewport, initial_url: body.initial_url };
    match state.registry.create_session(opts).await {
        Ok(session) => (StatusCode::CREATED, Json(describe(&state, &session).await)).into_response(),
        Err(CoreError::SessionLimitReached) => {
            error_response(StatusCode::TOO_MANY_REQUESTS, ErrorCode::SessionLimitReached, "session limit reached")
        }
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.code(), err.to_string()),
    }
}

async fn list_sessions(State(state): State<AppState>) -> Response {
    let mut out = Vec::new();
    for session in state.registry.list_sessions() {
        out.push(describe(&state, &session).await);
    }
    Json(out).into_response()
}

async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.registry.get_session(&id) {
        Some(session) => Json(describe(&state, &session).await).into_response(),
        None => error_response(StatusCode::NOT_FOUND, ErrorCode::SessionNotFound, format!("no session {id}")),
    }
}

async fn destroy_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if !state.registry.has_session(&id) {
        return error_response(StatusCode::NOT_FOUND, ErrorCode::SessionNotFound, format!("no session {id}"));
    }
    state.registry.destroy_session(&id).await;
    StatusCode::NO_CONTENT.into_response()
}

async fn viewer(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if !state.registry.has_session(&id) {
        return error_response(StatusCode::NOT_FOUND, ErrorCode::SessionNotFound, format!("no session {id}"));
    }
    let ws_url = format!("{}/sessions/{id}/ws", state.config.ws_base_url());
    let html = format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>session {id}</title></head>\
         <body><canvas id=\"frame\"></canvas>\
         <script>window.__SESSION_ID__={id:?};window.__WS_URL__={ws_url:?};</script>\
         </body></html>"
    );
    Html(html).into_response()
}

// --- full-duplex websocket ------------------------------------------------

async fn ws_upgrade(
    State(state): State<AppState>,
    Path(id): Path<String>,
    upgrade: WebSocketUpgrade,
) -> Response {
    if !state.registry.has_session(&id) {
        return error_response(StatusCode::NOT_FOUND, ErrorCode::SessionNotFound, format!("no session {id}"));
    }
    upgrade.on_upgrade(move |socket| handle_ws(socket, state, id))
}

async fn handle_ws(socket: WebSocket, state: AppState, session_id: String) {
    let Some(session) = state.registry.get_session(&session_id) else { return };
    let (client, mut receiver) = state.hub.register(&session_id, ClientKind::FullDuplex);
    state.registry.add_client(&session_id, client.id.clone()).await;

    let viewport = session.current_viewport().await;
    let last_frame = session.last_frame();
    state.hub.send_welcome(&client, viewport, last_frame);

    let (mut sink, mut stream) = socket.split();
    let mut closed = client.subscribe_closed();

    let writer = tokio::spawn(async move {
        while let Some(msg) = receiver.recv().await {
            let text = serialize_server_message(&msg);
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    loop {
        let msg = tokio::select! {
            biased;
            _ = closed.changed() => break,
            msg = stream.next() => msg,
        };
        let Some(Ok(msg)) = msg else { break };
        let Message::Text(text) = msg else {
            if matches!(msg, Message::Close(_)) {
                break;
            }
            continue;
        };
        let parsed = match parse_client_message(&text) {
            Ok(p) => p,
            Err(_) => continue,
        };
        match parsed {
            ClientMessage::Ping { t } => {
                let _ = client.send_reliable(ServerMessage::Pong { t });
            }
            ClientMessage::Input(event) => {
                if let Err(payload) = dispatch_input(&session, event).await {
                    let _ = client.send_reliable(ServerMessage::event(
                        browserd_protocol::message::EventName::Error,
                        Some(serde_json::to_value(payload).unwrap_or(serde_json::Value::Null)),
                    ));
                }
            }
            ClientMessage::Cmd { id, method, params } => {
                let outcome = session.enqueue_command(id.clone(), method.clone(), params, None).await;
                if method == "setViewport" && outcome.ok {
                    if let Some(result) = &outcome.result {
                        let w = result.get("viewport").and_then(|v| v.get("w")).and_then(|v| v.as_u64());
                        let h = result.get("viewport").and_then(|v| v.get("h")).and_then(|v| v.as_u64());
                        if let (Some(w), Some(h)) = (w, h) {
                            let _ = state.registry.update_session_screencast(&session_id, w as u32, h as u32).await;
                        }
                    }
                }
                let reply = outcome_to_message(id, outcome);
                let _ = client.send_reliable(reply);
            }
        }
    }

    writer.abort();
    state.hub.unregister(&session_id, &client.id);
    state.registry.remove_client(&session_id, &client.id).await;
}

/// Dispatches one input event against the session's debug channel. Returns
/// `Err` without dispatching anything while the session isn't `Ready` yet.
async fn dispatch_input(session: &browserd_core::Session, event: InputEvent) -> Result<(), ErrorPayload> {
    if !session.is_ready().await {
        return Err(ErrorPayload::new(ErrorCode::SessionNotReady, "session is not ready"));
    }
    match event {
        InputEvent::Mouse { action, x, y, modifiers, button, delta_x, delta_y, client_width, client_height } => {
            let bits = browserd_protocol::modifiers::set_to_flags(modifiers);
            let viewport = session.current_viewport().await;
            let (mapped_x, mapped_y) = match (client_width, client_height) {
                (Some(cw), Some(ch)) => {
                    browserd_core::input_mapper::map_point(x, y, cw as f64, ch as f64, viewport.w, viewport.h)
                }
                _ => (x, y),
            };
            session
                .channel
                .dispatch_mouse(
                    action,
                    mapped_x,
                    mapped_y,
                    bits,
                    browserd_core::input_mapper::map_button(button.as_deref()),
                    delta_x,
                    delta_y,
                )
                .await;
        }
        InputEvent::Key { action, modifiers, key, text } => {
            let bits = browserd_protocol::modifiers::set_to_flags(modifiers);
            session.channel.dispatch_key(action, bits, key.as_deref(), text.as_deref()).await;
        }
    }
    Ok(())
}

fn outcome_to_message(id: String, outcome: browserd_core::CommandOutcome) -> ServerMessage {
    if outcome.ok {
        ServerMessage::result_ok(id, outcome.result.unwrap_or(serde_json::Value::Null))
    } else {
        let (code, message) = outcome.error.unwrap_or((ErrorCode::ExecutionError, "unknown error".to_string()));
        ServerMessage::result_err(id, ErrorPayload::new(code, message))
    }
}

// --- streaming+HTTP transport ---------------------------------------------

async fn stream(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(session) = state.registry.get_session(&id) else {
        return error_response(StatusCode::NOT_FOUND, ErrorCode::SessionNotFound, format!("no session {id}"));
    };
    let (client, mut receiver) = state.hub.register(&id, ClientKind::Streaming);
    state.registry.add_client(&id, client.id.clone()).await;

    let (tx, rx) = tokio::sync::mpsc::channel::<Result<bytes::Bytes, std::io::Error>>(8);

    // Sentinel carrying the assigned client id, then the current viewport,
    // then the last frame if any — in that order (§4.G).
    let sentinel = ServerMessage::event(
        browserd_protocol::message::EventName::Ready,
        Some(serde_json::json!({ "clientId": client.id })),
    );
    let viewport = session.current_viewport().await;
    let viewport_event = ServerMessage::event(
        browserd_protocol::message::EventName::Ready,
        Some(serde_json::json!({ "viewport": viewport })),
    );
    let last_frame = session.last_frame();

    let session_id = id.clone();
    let client_id = client.id.clone();
    let registry = state.registry.clone();
    let hub = state.hub.clone();
    tokio::spawn(async move {
        let frame_line = |msg: &ServerMessage| format!("{}\n", serialize_server_message(msg));
        let feed = async move {
            tx.send(Ok(bytes::Bytes::from(frame_line(&sentinel)))).await.ok()?;
            tx.send(Ok(bytes::Bytes::from(frame_line(&viewport_event)))).await.ok()?;
            if let Some(frame) = last_frame {
                let msg = ServerMessage::Frame {
                    format: frame.format.to_string(),
                    data: frame.data,
                    viewport: frame.viewport,
                    timestamp: frame.timestamp_ms,
                };
                tx.send(Ok(bytes::Bytes::from(frame_line(&msg)))).await.ok()?;
            }
            while let Some(msg) = receiver.recv().await {
                tx.send(Ok(bytes::Bytes::from(frame_line(&msg)))).await.ok()?;
            }
            Some(())
        };
        feed.await;
        // The body stream's receiver drops when the client disconnects,
        // which is what ends this loop — that's our only disconnect signal.
        hub.unregister(&session_id, &client_id);
        registry.remove_client(&session_id, &client_id).await;
    });

    let body = Body::from_stream(ReceiverStream::new(rx));
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

// --- HTTP command/input fallback ------------------------------------------

async fn input_post(State(state): State<AppState>, Path(id): Path<String>, body: String) -> Response {
    let Some(session) = state.registry.get_session(&id) else {
        return error_response(StatusCode::NOT_FOUND, ErrorCode::SessionNotFound, format!("no session {id}"));
    };
    let parsed = match parse_client_message(&body) {
        Ok(p) => p,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, ErrorCode::InvalidParams, err.to_string()),
    };
    match parsed {
        ClientMessage::Cmd { id: cmd_id, method, params } => {
            let outcome = session.enqueue_command(cmd_id.clone(), method, params, None).await;
            let msg = outcome_to_message(cmd_id, outcome);
            Json(msg).into_response()
        }
        ClientMessage::Input(event) => match dispatch_input(&session, event).await {
            Ok(()) => Json(serde_json::json!({ "ok": true })).into_response(),
            Err(payload) => error_response(StatusCode::CONFLICT, payload.code, payload.message),
        },
        ClientMessage::Ping { t } => Json(serde_json::json!({ "pong": t })).into_response(),
    }
}

async fn input_options() -> StatusCode {
    StatusCode::NO_CONTENT
}

// --- interventions ----------------------------------------------------------

async fn complete_intervention(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if state.registry.interventions().complete(&id).await {
        StatusCode::OK.into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, ErrorCode::ExecutionError, format!("no pending intervention {id}"))
    }
}

async fn cancel_intervention(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if state.registry.interventions().cancel(&id).await {
        StatusCode::OK.into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, ErrorCode::ExecutionError, format!("no pending intervention {id}"))
    }
}

// --- health/readiness --------------------------------------------------------

async fn livez() -> StatusCode {
    StatusCode::OK
}

async fn readyz(State(state): State<AppState>) -> StatusCode {
    if state.registry.is_connected() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn health(State(state): State<AppState>) -> Response {
    let connected = state.registry.is_connected();
    let sessions = state.registry.session_count();
    let cap = state.registry.cap();
    let status = if !connected {
        "unhealthy"
    } else if sessions >= cap {
        "degraded"
    } else {
        "healthy"
    };
    let code = if connected { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (code, Json(serde_json::json!({ "status": status, "sessions": sessions, "cap": cap }))).into_response()
}

async fn root(State(state): State<AppState>) -> Response {
    let sessions = state.registry.list_sessions();
    match sessions.first() {
        Some(session) => Redirect::to(&format!("/sessions/{}/viewer", session.id)).into_response(),
        None => Json(serde_json::json!({
            "service": "browserd",
            "sessions": 0,
            "docs": "POST /api/sessions to start one",
        }))
        .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    fn test_config() -> Arc<Config> {
        Arc::new(Config { port: 4000, host: "127.0.0.1".to_string(), ..Config::default() })
    }

    async fn test_state() -> AppState {
        let registry = Registry::new(browserd_core::RegistryConfig::default());
        let hub = Hub::new();
        AppState { registry, hub, config: test_config() }
    }

    #[tokio::test]
    async fn livez_is_always_ok() {
        let state = test_state().await;
        let app = router(state);
        let response = app
            .oneshot(axum::http::Request::builder().uri("/livez").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readyz_is_unavailable_before_initialize() {
        let state = test_state().await;
        let app = router(state);
        let response = app
            .oneshot(axum::http::Request::builder().uri("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn get_unknown_session_is_404() {
        let state = test_state().await;
        let app = router(state);
        let response = app
            .oneshot(axum::http::Request::builder().uri("/api/sessions/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_sessions_starts_empty() {
        let state = test_state().await;
        let app = router(state);
        let response = app
            .oneshot(axum::http::Request::builder().uri("/api/sessions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn complete_unknown_intervention_is_404() {
        let state = test_state().await;
        let app = router(state);
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/interventions/missing/complete")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
