//! The on-wire message protocol (§4.A, §6-7): tagged client/server messages,
//! stable error codes, and the modifier bit-packing they share.

pub mod error_code;
pub mod message;
pub mod modifiers;

pub use error_code::{ErrorCode, ErrorPayload, ProtocolParseError};
pub use message::{
    parse_client_message, serialize_server_message, ClientMessage, Device, EventName, InputEvent,
    KeyAction, Modifiers, MouseAction, ServerMessage, Viewport,
};
