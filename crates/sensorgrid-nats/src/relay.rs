use crate::publisher::{group_from_subject, LIVE_SUBJECT_PREFIX};
use anyhow::{Context, Result};
use futures::StreamExt;
use sensorgrid_fanout::{GroupPublisher, OutboundFrame};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Bridges NATS live subjects into a node's local subscriber registry.
///
/// Each node runs one relay; frames published by any node reach this
/// node's subscribers through it. Malformed frames are logged and
/// skipped, never fatal.
pub struct NatsLiveRelay {
    client: async_nats::Client,
    registry: Arc<dyn GroupPublisher>,
    shutdown: CancellationToken,
}

impl NatsLiveRelay {
    pub fn new(
        client: async_nats::Client,
        registry: Arc<dyn GroupPublisher>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            client,
            registry,
            shutdown,
        }
    }

    pub async fn run(self) -> Result<()> {
        let mut subscriber = self
            .client
            .subscribe(format!("{LIVE_SUBJECT_PREFIX}.>"))
            .await
            .context("failed to subscribe to live subjects")?;
        info!("live relay subscribed");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("live relay shutting down");
                    return Ok(());
                }
                message = subscriber.next() => {
                    let Some(message) = message else {
                        warn!("live subscription closed");
                        return Ok(());
                    };
                    self.handle(&message.subject, &message.payload).await;
                }
            }
        }
    }

    async fn handle(&self, subject: &str, wire: &[u8]) {
        let Some(group) = group_from_subject(subject) else {
            warn!(subject = %subject, "frame on unexpected subject, skipping");
            return;
        };
        let frame = match OutboundFrame::from_wire(group, wire) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(subject = %subject, error = %e, "malformed live frame, skipping");
                return;
            }
        };
        if let Err(e) = self.registry.publish(frame).await {
            warn!(subject = %subject, error = %e, "local fan-out failed");
        }
    }
}
