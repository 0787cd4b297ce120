//! The single-subscriber publisher interface session-owned components push
//! through, instead of a multi-listener event-emitter (§9 design note).

use browserd_protocol::message::{EventName, Viewport};

#[derive(Debug, Clone)]
pub struct Frame {
    pub data: String,
    pub format: &'static str,
    pub viewport: Viewport,
    pub timestamp_ms: i64,
}

/// Implemented by whatever owns the next layer out (the Session Registry
/// forwards to this from the Debug Channel Manager and Command Queue; the
/// Registry is in turn a `EventSink` wrapping the Transport Layer's own
/// implementation).
pub trait EventSink: Send + Sync {
    fn on_frame(&self, session_id: &str, frame: Frame);
    fn on_event(&self, session_id: &str, name: EventName, data: Option<serde_json::Value>);

    /// Sent once, immediately, when a `requestHumanIntervention` command
    /// parks (§4.F). Default no-op so sinks that don't care about
    /// interventions (tests, `NullSink`) don't need to implement it.
    fn on_intervention_created(&self, _session_id: &str, _command_id: &str, _intervention_id: &str, _viewer_url: &str) {}

    /// Sent once a pending intervention resolves, immediately before the
    /// parked command's own result envelope.
    fn on_intervention_completed(&self, _session_id: &str, _command_id: &str, _intervention_id: &str, _resolved_at_ms: i64) {}

    /// Sent once, when the Session Registry tears a session down. The
    /// Transport Layer uses this to actively close every client still
    /// attached to that session rather than waiting for each one's own
    /// connection to notice. Default no-op for sinks with no clients.
    fn on_session_closed(&self, _session_id: &str) {}
}

/// A sink that drops everything; useful in tests that don't care about
/// fan-out.
pub struct NullSink;

impl EventSink for NullSink {
    fn on_frame(&self, _session_id: &str, _frame: Frame) {}
    fn on_event(&self, _session_id: &str, _name: EventName, _data: Option<serde_json::Value>) {}
}
