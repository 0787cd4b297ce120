//! Tagged client/server wire messages (§4.A, §6).
//!
//! Mirrors the teacher's `#[derive(Serialize, Deserialize)]` plus
//! `#[serde(tag = "...")]` idiom for discriminating CDP-shaped JSON, applied
//! here to the session multiplexer's own dual-direction protocol instead of
//! the devtools wire format.

use serde::{Deserialize, Serialize};

use crate::error_code::ErrorPayload;

/// The physical input device a client-side event originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Mouse,
    Key,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseAction {
    Move,
    Down,
    Up,
    Click,
    Dblclick,
    Wheel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAction {
    Down,
    Up,
    Press,
}

/// Modifier keys held during an input event, bit-packed per §4.B as
/// `{alt=1, ctrl=2, meta=4, shift=8}` by [`crate::modifiers`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
}

/// Device-discriminated input payload. `device` and the action enums are
/// closed and fail to parse on an unrecognized value, per §4.A; `button` is
/// left as an open string since unrecognized values map to "none" at the
/// Input Mapper rather than failing the parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "device", rename_all = "lowercase")]
pub enum InputEvent {
    Mouse {
        action: MouseAction,
        x: f64,
        y: f64,
        #[serde(default)]
        modifiers: Modifiers,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        button: Option<String>,
        #[serde(default, rename = "deltaX", skip_serializing_if = "Option::is_none")]
        delta_x: Option<f64>,
        #[serde(default, rename = "deltaY", skip_serializing_if = "Option::is_none")]
        delta_y: Option<f64>,
        /// The sender's own render size, in the coordinate space `x`/`y`
        /// are expressed in. Absent means "already browser-space" (1:1
        /// mapping at the Input Mapper, §4.B).
        #[serde(default, rename = "clientWidth", skip_serializing_if = "Option::is_none")]
        client_width: Option<u32>,
        #[serde(default, rename = "clientHeight", skip_serializing_if = "Option::is_none")]
        client_height: Option<u32>,
    },
    Key {
        action: KeyAction,
        #[serde(default)]
        modifiers: Modifiers,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

/// Messages sent client → server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Cmd {
        id: String,
        /// Not a closed enum: unknown methods must parse and fail at the
        /// executor with `UNKNOWN_METHOD`, not at the parser.
        method: String,
        #[serde(default = "serde_json::Value::default")]
        params: serde_json::Value,
    },
    Input(InputEvent),
    Ping {
        t: i64,
    },
}

/// The browser-rendered viewport a frame was captured at, or the current
/// viewport carried by a `ready`/viewport event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub w: u32,
    pub h: u32,
    pub dpr: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventName {
    Ready,
    Navigated,
    Console,
    Error,
}

/// Messages sent server → client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Frame {
        #[serde(default = "frame_format")]
        format: String,
        data: String,
        viewport: Viewport,
        timestamp: i64,
    },
    Result {
        id: String,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<ErrorPayload>,
    },
    Event {
        name: EventName,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
    Pong {
        t: i64,
    },
    #[serde(rename = "intervention_created")]
    InterventionCreated {
        id: String,
        #[serde(rename = "interventionId")]
        intervention_id: String,
        #[serde(rename = "viewerUrl")]
        viewer_url: String,
    },
    #[serde(rename = "intervention_completed")]
    InterventionCompleted {
        id: String,
        #[serde(rename = "interventionId")]
        intervention_id: String,
        #[serde(rename = "resolvedAt")]
        resolved_at: i64,
    },
}

fn frame_format() -> String {
    "jpeg".to_string()
}

impl ServerMessage {
    pub fn result_ok(id: impl Into<String>, result: serde_json::Value) -> Self {
        ServerMessage::Result {
            id: id.into(),
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn result_err(id: impl Into<String>, error: ErrorPayload) -> Self {
        ServerMessage::Result {
            id: id.into(),
            ok: false,
            result: None,
            error: Some(error),
        }
    }

    pub fn event(name: EventName, data: Option<serde_json::Value>) -> Self {
        ServerMessage::Event { name, data }
    }
}

/// Parses one client→server frame. Structural errors (missing fields, wrong
/// scalar types, unrecognized `device`/action enum values) surface as
/// `serde_json::Error`; an unrecognized `method` string parses fine.
pub fn parse_client_message(text: &str) -> Result<ClientMessage, serde_json::Error> {
    serde_json::from_str(text)
}

/// Serializes one server→client frame. Total: every `ServerMessage` value
/// serializes successfully.
pub fn serialize_server_message(msg: &ServerMessage) -> String {
    serde_json::to_string(msg).expect("ServerMessage serialization is infallible")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ping() {
        let msg = parse_client_message(r#"{"type":"ping","t":12345}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping { t: 12345 }));
    }

    #[test]
    fn parses_cmd_with_default_params() {
        let msg = parse_client_message(r#"{"type":"cmd","id":"a","method":"navigate"}"#).unwrap();
        match msg {
            ClientMessage::Cmd { id, method, params } => {
                assert_eq!(id, "a");
                assert_eq!(method, "navigate");
                assert!(params.is_null());
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn unknown_method_still_parses() {
        let msg =
            parse_client_message(r#"{"type":"cmd","id":"a","method":"doTheThing"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Cmd { .. }));
    }

    #[test]
    fn rejects_missing_required_field() {
        let err = parse_client_message(r#"{"type":"cmd","method":"navigate"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_wrong_scalar_type() {
        let err = parse_client_message(r#"{"type":"ping","t":"not-a-number"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_unknown_device() {
        let err =
            parse_client_message(r#"{"type":"input","device":"joystick","action":"move"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_unknown_mouse_action() {
        let err = parse_client_message(
            r#"{"type":"input","device":"mouse","action":"teleport","x":1,"y":1}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn parses_mouse_click() {
        let msg = parse_client_message(
            r#"{"type":"input","device":"mouse","action":"click","x":320,"y":180}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::Input(InputEvent::Mouse { action, x, y, .. }) => {
                assert_eq!(action, MouseAction::Click);
                assert_eq!((x, y), (320.0, 180.0));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn open_button_value_parses() {
        // "anything else becomes none" is the Input Mapper's job, not the parser's.
        let msg = parse_client_message(
            r#"{"type":"input","device":"mouse","action":"down","x":1,"y":1,"button":"stylus"}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::Input(InputEvent::Mouse { button, .. }) => {
                assert_eq!(button.as_deref(), Some("stylus"));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn round_trips_every_server_message_shape() {
        let samples = vec![
            ServerMessage::Frame {
                format: "jpeg".into(),
                data: "abc123".into(),
                viewport: Viewport { w: 1280, h: 720, dpr: 1.0 },
                timestamp: 42,
            },
            ServerMessage::result_ok("a", serde_json::json!({"url": "https://example.com"})),
            ServerMessage::result_err(
                "a",
                ErrorPayload::new(crate::error_code::ErrorCode::Timeout, "timed out"),
            ),
            ServerMessage::event(EventName::Ready, None),
            ServerMessage::Pong { t: 12345 },
            ServerMessage::InterventionCreated {
                id: "c".into(),
                intervention_id: "iv1".into(),
                viewer_url: "https://host/sessions/s1/viewer?intervention=iv1".into(),
            },
            ServerMessage::InterventionCompleted {
                id: "c".into(),
                intervention_id: "iv1".into(),
                resolved_at: 99,
            },
        ];

        for msg in samples {
            let text = serialize_server_message(&msg);
            let decoded: ServerMessage = serde_json::from_str(&text).unwrap();
            let reencoded = serialize_server_message(&decoded);
            assert_eq!(text, reencoded);
        }
    }

    #[test]
    fn modifier_round_trip() {
        let set = Modifiers { ctrl: true, shift: false, alt: true, meta: false };
        let bits = crate::modifiers::set_to_flags(set);
        let back = crate::modifiers::flags_to_set(bits);
        assert_eq!(set, back);
    }
}
