use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

/// Thin wrapper around a core NATS connection.
///
/// Live fan-out frames are fire-and-forget, so this stays on core NATS
/// publish/subscribe rather than a persistent stream.
pub struct NatsClient {
    client: async_nats::Client,
}

impl NatsClient {
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        info!(url = %url, ?timeout, "connecting to NATS");

        let client = async_nats::ConnectOptions::new()
            .connection_timeout(timeout)
            .connect(url)
            .await
            .context("failed to connect to NATS")?;

        info!("connected to NATS");
        Ok(Self { client })
    }

    pub fn client(&self) -> &async_nats::Client {
        &self.client
    }
}
