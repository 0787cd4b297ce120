//! `Input` domain: synthetic mouse and keyboard events.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::types::{Command, Method};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseEventType {
    MouseMoved,
    MousePressed,
    MouseReleased,
    MouseWheel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseButton {
    None,
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchMouseEventParams {
    #[serde(rename = "type")]
    pub kind: MouseEventType,
    pub x: f64,
    pub y: f64,
    pub modifiers: u32,
    pub button: Option<MouseButton>,
    #[serde(rename = "clickCount", skip_serializing_if = "Option::is_none")]
    pub click_count: Option<u32>,
    #[serde(rename = "deltaX", skip_serializing_if = "Option::is_none")]
    pub delta_x: Option<f64>,
    #[serde(rename = "deltaY", skip_serializing_if = "Option::is_none")]
    pub delta_y: Option<f64>,
}

impl Method for DispatchMouseEventParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Input.dispatchMouseEvent".into()
    }
}
impl Command for DispatchMouseEventParams {
    type Response = serde_json::Value;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyEventType {
    KeyDown,
    KeyUp,
    Char,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchKeyEventParams {
    #[serde(rename = "type")]
    pub kind: KeyEventType,
    pub modifiers: u32,
    #[serde(rename = "windowsVirtualKeyCode", skip_serializing_if = "Option::is_none")]
    pub windows_virtual_key_code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Method for DispatchKeyEventParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Input.dispatchKeyEvent".into()
    }
}
impl Command for DispatchKeyEventParams {
    type Response = serde_json::Value;
}
