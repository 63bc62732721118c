use async_trait::async_trait;
use sensorgrid_domain::DomainResult;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One fire-and-forget external delivery of a decoded reading.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryJob {
    pub endpoint_url: String,
    pub tenant_email: String,
    pub group: String,
    pub device_id: String,
    pub decoded: Value,
}

/// Queue accepting best-effort outbound work. Nothing on the fan-out
/// path ever awaits a delivery result.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeliveryQueue: Send + Sync {
    async fn enqueue(&self, job: DeliveryJob) -> DomainResult<()>;
}

/// Channel-backed [`DeliveryQueue`] feeding the [`DeliveryWorker`].
pub struct MpscDeliveryQueue {
    tx: mpsc::Sender<DeliveryJob>,
}

/// Create the queue and the receiver its worker drains.
pub fn delivery_channel(capacity: usize) -> (MpscDeliveryQueue, mpsc::Receiver<DeliveryJob>) {
    let (tx, rx) = mpsc::channel(capacity);
    (MpscDeliveryQueue { tx }, rx)
}

#[async_trait]
impl DeliveryQueue for MpscDeliveryQueue {
    async fn enqueue(&self, job: DeliveryJob) -> DomainResult<()> {
        // Non-blocking: a saturated delivery pipeline sheds work instead
        // of stalling reading acceptance.
        if let Err(e) = self.tx.try_send(job) {
            warn!(error = %e, "delivery queue full, job dropped");
        }
        Ok(())
    }
}

/// Background worker POSTing decoded readings to tenant-configured
/// endpoints. Failures are logged and swallowed: outbound delivery is
/// fire-and-forget and never retried or surfaced to the device.
pub struct DeliveryWorker {
    client: reqwest::Client,
    rx: mpsc::Receiver<DeliveryJob>,
    shutdown: CancellationToken,
}

impl DeliveryWorker {
    pub fn new(rx: mpsc::Receiver<DeliveryJob>, shutdown: CancellationToken) -> Self {
        Self {
            client: reqwest::Client::new(),
            rx,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        info!("delivery worker started");
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("delivery worker shutting down");
                    break;
                }
                job = self.rx.recv() => {
                    match job {
                        Some(job) => self.deliver(job).await,
                        None => break,
                    }
                }
            }
        }
    }

    async fn deliver(&self, job: DeliveryJob) {
        let body = json!({
            "device_id": job.device_id,
            "group": job.group,
            "email": job.tenant_email,
            "data": job.decoded,
        });

        match self
            .client
            .post(&job.endpoint_url)
            .json(&body)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                debug!(
                    endpoint = %job.endpoint_url,
                    device_id = %job.device_id,
                    "external delivery succeeded"
                );
            }
            Ok(response) => {
                warn!(
                    endpoint = %job.endpoint_url,
                    device_id = %job.device_id,
                    status = %response.status(),
                    "external delivery rejected, dropping"
                );
            }
            Err(e) => {
                warn!(
                    endpoint = %job.endpoint_url,
                    device_id = %job.device_id,
                    error = %e,
                    "external delivery failed, dropping"
                );
            }
        }
    }
}
