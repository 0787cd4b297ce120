//! Session-scoped client fan-out (§4.G): the full-duplex socket and the
//! streaming+HTTP transport both register a [`ClientHandle`] with the
//! [`Hub`], which is itself the `EventSink` the Session Registry publishes
//! frames and events through.

pub mod client;
pub mod hub;

pub use client::{ClientClosed, ClientHandle, ClientKind, ClientReceiver};
pub use hub::Hub;

#[cfg(test)]
mod tests {
    use super::*;
    use browserd_core::sink::{EventSink, Frame};
    use browserd_protocol::message::{EventName, ServerMessage, Viewport};

    fn viewport() -> Viewport {
        Viewport { w: 1280, h: 720, dpr: 1.0 }
    }

    #[tokio::test]
    async fn welcome_then_frame_ordering() {
        let hub = Hub::new();
        let (client, mut rx) = hub.register("s1", ClientKind::FullDuplex);
        hub.send_welcome(&client, viewport(), None);
        hub.on_frame(
            "s1",
            Frame { data: "abc".into(), format: "jpeg", viewport: viewport(), timestamp_ms: 1 },
        );

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, ServerMessage::Event { name: EventName::Ready, .. }));
        let second = rx.recv().await.unwrap();
        assert!(matches!(second, ServerMessage::Frame { .. }));
    }

    #[tokio::test]
    async fn slow_consumer_drops_frames_not_events() {
        let hub = Hub::new();
        let (client, mut rx) = hub.register("s1", ClientKind::FullDuplex);

        for i in 0..10 {
            hub.on_frame(
                "s1",
                Frame { data: format!("f{i}"), format: "jpeg", viewport: viewport(), timestamp_ms: i },
            );
        }
        hub.on_event("s1", EventName::Navigated, None);

        let mut saw_event = false;
        let mut frame_count = 0;
        while let Ok(Some(msg)) = tokio::time::timeout(std::time::Duration::from_millis(50), rx.recv()).await {
            match msg {
                ServerMessage::Frame { .. } => frame_count += 1,
                ServerMessage::Event { name: EventName::Navigated, .. } => saw_event = true,
                _ => {}
            }
        }
        assert!(saw_event, "reliable event must never be dropped");
        assert!(frame_count < 10, "slow consumer should have dropped some frames");
    }

    #[tokio::test]
    async fn unregister_removes_from_fanout() {
        let hub = Hub::new();
        let (client, _rx) = hub.register("s1", ClientKind::Streaming);
        assert_eq!(hub.client_count("s1"), 1);
        hub.unregister("s1", &client.id);
        assert_eq!(hub.client_count("s1"), 0);
    }

    #[tokio::test]
    async fn close_session_ends_client_receivers_and_clears_fanout() {
        let hub = Hub::new();
        let (_client_a, mut rx_a) = hub.register("s1", ClientKind::FullDuplex);
        let (_client_b, mut rx_b) = hub.register("s1", ClientKind::Streaming);
        assert_eq!(hub.client_count("s1"), 2);

        hub.close_session("s1");

        assert!(rx_a.recv().await.is_none());
        assert!(rx_b.recv().await.is_none());
        assert_eq!(hub.client_count("s1"), 0);
    }

    #[tokio::test]
    async fn close_all_closes_every_session() {
        let hub = Hub::new();
        let (_client1, mut rx1) = hub.register("s1", ClientKind::FullDuplex);
        let (_client2, mut rx2) = hub.register("s2", ClientKind::FullDuplex);

        hub.close_all();

        assert!(rx1.recv().await.is_none());
        assert!(rx2.recv().await.is_none());
    }
}
