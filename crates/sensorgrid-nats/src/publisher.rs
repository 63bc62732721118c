use anyhow::Context;
use async_trait::async_trait;
use sensorgrid_domain::DomainResult;
use sensorgrid_fanout::{GroupPublisher, OutboundFrame};
use tracing::debug;

/// Subject prefix for live fan-out frames; the tenant group is the last
/// token, so a relay can subscribe with `live.>` and recover it.
pub const LIVE_SUBJECT_PREFIX: &str = "live";

pub fn group_subject(group: &str) -> String {
    format!("{LIVE_SUBJECT_PREFIX}.{group}")
}

/// Extract the tenant group back out of a live subject.
pub fn group_from_subject(subject: &str) -> Option<&str> {
    subject
        .strip_prefix(LIVE_SUBJECT_PREFIX)?
        .strip_prefix('.')
        .filter(|group| !group.is_empty())
}

/// Publishes outbound frames onto NATS so every node's relay can fan
/// them out to its local subscribers.
pub struct NatsGroupPublisher {
    client: async_nats::Client,
}

impl NatsGroupPublisher {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GroupPublisher for NatsGroupPublisher {
    async fn publish(&self, frame: OutboundFrame) -> DomainResult<()> {
        let subject = group_subject(&frame.group);
        let wire = frame.to_wire();
        debug!(subject = %subject, size_bytes = wire.len(), "publishing live frame");
        self.client
            .publish(subject, wire.into())
            .await
            .context("failed to publish live frame")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensorgrid_fanout::FrameEncoding;
    use serde_json::json;

    #[test]
    fn test_group_subject_round_trip() {
        let subject = group_subject("acme-co");
        assert_eq!(subject, "live.acme-co");
        assert_eq!(group_from_subject(&subject), Some("acme-co"));
        assert_eq!(group_from_subject("live."), None);
        assert_eq!(group_from_subject("other.acme-co"), None);
    }

    #[test]
    fn test_wire_frame_survives_transport() {
        let frame = OutboundFrame::encode("acme-co", &json!({"temp": 23.5})).unwrap();
        assert_eq!(frame.encoding, FrameEncoding::Plain);

        let wire = frame.to_wire();
        let decoded = OutboundFrame::from_wire("acme-co", &wire).unwrap();
        assert_eq!(decoded.payload_json().unwrap(), json!({"temp": 23.5}));
    }
}
