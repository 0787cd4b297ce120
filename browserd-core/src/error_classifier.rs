//! Table-driven classification of engine failure strings into the fixed
//! §4.D error codes, in priority order. Deliberately not regex — per §9's
//! design note, business logic belongs in the table, not in pattern
//! literals.

use browserd_protocol::ErrorCode;

const TIMEOUT_PATTERNS: &[&str] = &[
    "timeout",
    "timed out",
    "exceeded",
    "waiting for",
    "strict mode violation",
];

const NAVIGATION_PATTERNS: &[&str] = &[
    "navigation",
    "net::err",
    "invalid url",
    "cannot navigate",
    "goto",
    "err_name_not_resolved",
    "err_connection_refused",
];

const SELECTOR_PATTERNS: &[&str] = &[
    "selector",
    "locator",
    "no node found",
    "no element found",
    "failed to find element",
];

/// Classifies a raw engine failure message. `UNKNOWN_METHOD` and
/// `CANCELLED` (priorities 4 and 5 in §4.D) are resolved earlier by the
/// Command Queue itself — before dispatch and on queue eviction,
/// respectively — so this only ever returns one of the remaining four.
pub fn classify(message: &str) -> ErrorCode {
    let lower = message.to_lowercase();

    if TIMEOUT_PATTERNS.iter().any(|p| lower.contains(p)) {
        return ErrorCode::Timeout;
    }
    if NAVIGATION_PATTERNS.iter().any(|p| lower.contains(p)) {
        return ErrorCode::NavigationError;
    }
    if SELECTOR_PATTERNS.iter().any(|p| lower.contains(p)) {
        // A selector/locator message that also carries an explicit "...ms"
        // duration is really a timeout (§4.D item 3's re-classification rule).
        if has_explicit_ms_duration(&lower) {
            return ErrorCode::Timeout;
        }
        return ErrorCode::SelectorError;
    }
    ErrorCode::ExecutionError
}

fn has_explicit_ms_duration(lower: &str) -> bool {
    lower.split(|c: char| c.is_whitespace() || c == ',' || c == '(' || c == ')').any(|tok| {
        tok.strip_suffix("ms")
            .map(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_timeout() {
        assert_eq!(classify("Timeout 30000ms exceeded"), ErrorCode::Timeout);
        assert_eq!(classify("waiting for selector \"#x\""), ErrorCode::Timeout);
    }

    #[test]
    fn classifies_navigation_error() {
        assert_eq!(classify("net::ERR_NAME_NOT_RESOLVED"), ErrorCode::NavigationError);
        assert_eq!(classify("Cannot navigate to invalid URL"), ErrorCode::NavigationError);
    }

    #[test]
    fn classifies_selector_error_without_duration() {
        assert_eq!(classify("failed to find element matching selector \"#missing\""), ErrorCode::SelectorError);
    }

    #[test]
    fn reclassifies_selector_message_with_explicit_duration_as_timeout() {
        assert_eq!(
            classify("selector \"#x\" resolved to hidden element after 5000ms"),
            ErrorCode::Timeout
        );
    }

    #[test]
    fn defaults_to_execution_error() {
        assert_eq!(classify("some unexpected engine failure"), ErrorCode::ExecutionError);
    }
}
