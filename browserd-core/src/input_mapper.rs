//! Pure mapping from client-space input to browser-space debug-channel
//! events (§4.B). No I/O, no session state — everything here is a function
//! of its arguments, which is what makes the boundary behaviors in §8
//! testable without a running browser.

use browserd_cdp::protocol::input::{KeyEventType, MouseButton, MouseEventType};
use browserd_protocol::message::{KeyAction, MouseAction};

/// Maps a point in the client viewport to a point in the browser viewport,
/// clamped into `[0, w-1] x [0, h-1]`. Returns `(0,0)` if either source
/// dimension is `<= 0` (kept verbatim per §9's open question).
pub fn map_point(x: f64, y: f64, client_w: f64, client_h: f64, browser_w: u32, browser_h: u32) -> (f64, f64) {
    if client_w <= 0.0 || client_h <= 0.0 {
        return (0.0, 0.0);
    }
    let scaled_x = (x * browser_w as f64 / client_w).round();
    let scaled_y = (y * browser_h as f64 / client_h).round();
    let max_x = (browser_w.max(1) - 1) as f64;
    let max_y = (browser_h.max(1) - 1) as f64;
    (scaled_x.clamp(0.0, max_x), scaled_y.clamp(0.0, max_y))
}

/// left/middle/right pass through; anything else (or absent) becomes "none".
pub fn map_button(button: Option<&str>) -> MouseButton {
    match button {
        Some("left") => MouseButton::Left,
        Some("middle") => MouseButton::Middle,
        Some("right") => MouseButton::Right,
        _ => MouseButton::None,
    }
}

/// move/down/up/wheel map 1:1; click/dblclick have no single debug-channel
/// event and are decomposed by the Debug Channel Manager (§4.C).
pub fn mouse_action_event_type(action: MouseAction) -> Option<MouseEventType> {
    match action {
        MouseAction::Move => Some(MouseEventType::MouseMoved),
        MouseAction::Down => Some(MouseEventType::MousePressed),
        MouseAction::Up => Some(MouseEventType::MouseReleased),
        MouseAction::Wheel => Some(MouseEventType::MouseWheel),
        MouseAction::Click | MouseAction::Dblclick => None,
    }
}

/// down/up map 1:1; press is decomposed (keyDown, optional char, keyUp) by
/// the Debug Channel Manager.
pub fn key_action_event_type(action: KeyAction) -> Option<KeyEventType> {
    match action {
        KeyAction::Down => Some(KeyEventType::KeyDown),
        KeyAction::Up => Some(KeyEventType::KeyUp),
        KeyAction::Press => None,
    }
}

/// Windows-style virtual-key-code lookup for the common control/arrow/
/// function/space/alphanumeric set. Keys outside this set are left unset
/// (the debug channel still receives `key`/`text`).
pub fn virtual_key_code(key: &str) -> Option<u32> {
    let code = match key {
        "Backspace" => 8,
        "Tab" => 9,
        "Enter" => 13,
        "Shift" => 16,
        "Control" => 17,
        "Alt" => 18,
        "Escape" => 27,
        " " | "Space" => 32,
        "PageUp" => 33,
        "PageDown" => 34,
        "End" => 35,
        "Home" => 36,
        "ArrowLeft" => 37,
        "ArrowUp" => 38,
        "ArrowRight" => 39,
        "ArrowDown" => 40,
        "Delete" => 46,
        "F1" => 112,
        "F2" => 113,
        "F3" => 114,
        "F4" => 115,
        "F5" => 116,
        "F6" => 117,
        "F7" => 118,
        "F8" => 119,
        "F9" => 120,
        "F10" => 121,
        "F11" => 122,
        "F12" => 123,
        single if single.chars().count() == 1 => {
            let ch = single.chars().next().unwrap();
            if ch.is_ascii_alphabetic() {
                ch.to_ascii_uppercase() as u32
            } else if ch.is_ascii_digit() {
                ch as u32
            } else {
                return None;
            }
        }
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_at_origin_and_far_corner() {
        assert_eq!(map_point(0.0, 0.0, 640.0, 360.0, 1280, 720), (0.0, 0.0));
        assert_eq!(map_point(639.0, 359.0, 640.0, 360.0, 1280, 720), (1278.0, 718.0));
    }

    #[test]
    fn clamps_negative_inputs_to_zero() {
        assert_eq!(map_point(-50.0, -50.0, 640.0, 360.0, 1280, 720), (0.0, 0.0));
    }

    #[test]
    fn clamps_beyond_viewport_to_max() {
        assert_eq!(map_point(10_000.0, 10_000.0, 640.0, 360.0, 1280, 720), (1279.0, 719.0));
    }

    #[test]
    fn zero_source_dimension_yields_origin() {
        assert_eq!(map_point(100.0, 100.0, 0.0, 360.0, 1280, 720), (0.0, 0.0));
        assert_eq!(map_point(100.0, 100.0, 640.0, 0.0, 1280, 720), (0.0, 0.0));
    }

    #[test]
    fn scenario_4_coordinate_scaling() {
        // client 640x360, browser 1280x720, click at (320,180) -> (640,360).
        assert_eq!(map_point(320.0, 180.0, 640.0, 360.0, 1280, 720), (640.0, 360.0));
    }

    #[test]
    fn identity_when_viewports_match() {
        let (x, y) = map_point(123.0, 456.0, 1280.0, 720.0, 1280, 720);
        assert_eq!((x, y), (123.0, 456.0));
    }

    #[test]
    fn button_mapping_passes_through_known_values() {
        assert_eq!(map_button(Some("left")), MouseButton::Left);
        assert_eq!(map_button(Some("middle")), MouseButton::Middle);
        assert_eq!(map_button(Some("right")), MouseButton::Right);
    }

    #[test]
    fn unknown_button_becomes_none() {
        assert_eq!(map_button(Some("stylus")), MouseButton::None);
        assert_eq!(map_button(None), MouseButton::None);
    }

    #[test]
    fn virtual_key_codes_cover_alphanum_and_controls() {
        assert_eq!(virtual_key_code("Enter"), Some(13));
        assert_eq!(virtual_key_code("ArrowUp"), Some(38));
        assert_eq!(virtual_key_code("a"), Some(65));
        assert_eq!(virtual_key_code("7"), Some(55));
        assert_eq!(virtual_key_code("F5"), Some(116));
        assert_eq!(virtual_key_code("\u{1F600}"), None);
    }
}
