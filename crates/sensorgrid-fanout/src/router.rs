use crate::delivery::{DeliveryJob, DeliveryQueue};
use crate::group::GroupPublisher;
use crate::message::OutboundFrame;
use chrono::{DateTime, FixedOffset, Utc};
use sensorgrid_domain::{
    decode_payload, DeviceRepository, DomainError, DomainResult, GetLiveDataTargetInput,
    LatestReadingsInput, LiveDataTargetRepository, NewReading, Owner, OwnershipResolver,
    ReadingRepository,
};
use sensorgrid_domain::Device;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Timestamp format attached to every decoded reading.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Outcome of one accepted reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub device_id: String,
    pub group: String,
    pub persisted_rows: usize,
    pub published: bool,
    pub forwarded: bool,
}

/// Routes each accepted reading to the owning tenant's subscribers.
///
/// Pipeline per reading: persist the bound fields, resolve the owner,
/// decode through the field bindings, publish to the tenant group, and
/// hand the decoded map to the delivery queue when the tenant configured
/// an external target. Only the publish step can fail the call; external
/// forwarding is fire-and-forget.
pub struct LiveFanoutRouter {
    resolver: Arc<OwnershipResolver>,
    device_repository: Arc<dyn DeviceRepository>,
    reading_repository: Arc<dyn ReadingRepository>,
    live_target_repository: Arc<dyn LiveDataTargetRepository>,
    publisher: Arc<dyn GroupPublisher>,
    delivery_queue: Arc<dyn DeliveryQueue>,
    /// Reporting timezone for formatted timestamps.
    reporting_offset: FixedOffset,
}

impl LiveFanoutRouter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        resolver: Arc<OwnershipResolver>,
        device_repository: Arc<dyn DeviceRepository>,
        reading_repository: Arc<dyn ReadingRepository>,
        live_target_repository: Arc<dyn LiveDataTargetRepository>,
        publisher: Arc<dyn GroupPublisher>,
        delivery_queue: Arc<dyn DeliveryQueue>,
        reporting_offset: FixedOffset,
    ) -> Self {
        Self {
            resolver,
            device_repository,
            reading_repository,
            live_target_repository,
            publisher,
            delivery_queue,
            reporting_offset,
        }
    }

    /// Accept one raw reading from an authenticated device.
    ///
    /// An empty decoded map (every field missing or out of range) is
    /// still an accepted submission: the device must not retry, there is
    /// simply nothing to publish.
    #[instrument(skip(self, device, payload), fields(device_id = %device.device_id))]
    pub async fn ingest(
        &self,
        device: &Device,
        payload: &Map<String, Value>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<IngestOutcome> {
        // 1. A device with no bindings cannot be accepted
        let bindings = self.resolver.field_bindings(&device.device_id).await?;
        if bindings.is_empty() {
            return Err(DomainError::DeviceNotConfigured(device.device_id.clone()));
        }

        // 2. Persist one row per bound field present in the payload
        let rows = persisted_rows(&device.device_id, &bindings, payload, occurred_at);
        let persisted = rows.len();
        if !rows.is_empty() {
            self.reading_repository.store_readings(rows).await?;
        }

        // 3. Resolve the owning tenant group
        let owner = self.resolver.resolve_owner(device).await?;
        let group = owner.group_name().to_string();

        // 4. Best-effort decode for live delivery
        let mut decoded = decode_payload(&bindings, payload);
        if decoded.is_empty() {
            debug!(device_id = %device.device_id, "nothing to publish for reading");
            return Ok(IngestOutcome {
                device_id: device.device_id.clone(),
                group,
                persisted_rows: persisted,
                published: false,
                forwarded: false,
            });
        }
        decoded.insert(
            "timestamp".to_string(),
            Value::String(self.format_timestamp(occurred_at)),
        );
        let decoded = Value::Object(decoded);

        // 5. Publish to exactly one tenant group
        let frame = OutboundFrame::encode(&group, &decoded).map_err(DomainError::RepositoryError)?;
        self.publisher.publish(frame).await?;

        // 6. Forward to the tenant's external target, fire-and-forget
        let forwarded = self.forward(&owner, &group, &device.device_id, &decoded).await;

        info!(
            device_id = %device.device_id,
            group = %group,
            persisted_rows = persisted,
            forwarded,
            "reading published"
        );
        Ok(IngestOutcome {
            device_id: device.device_id.clone(),
            group,
            persisted_rows: persisted,
            published: true,
            forwarded,
        })
    }

    /// Batched latest-reading snapshot for a fresh subscriber, keyed per
    /// device id: `{device_id: {sensor: value, ..., "timestamp": ...}}`.
    pub async fn initial_snapshot(&self, owner: &Owner) -> DomainResult<Map<String, Value>> {
        let devices = self.device_repository.list_devices_for_owner(owner).await?;
        let device_ids: Vec<String> = devices.iter().map(|d| d.device_id.clone()).collect();
        if device_ids.is_empty() {
            return Ok(Map::new());
        }

        let rows = self
            .reading_repository
            .latest_readings(LatestReadingsInput { device_ids })
            .await?;

        let mut snapshot: Map<String, Value> = Map::new();
        let mut latest_ts: std::collections::HashMap<String, DateTime<Utc>> =
            std::collections::HashMap::new();

        for row in rows {
            let entry = snapshot
                .entry(row.device_id.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(map) = entry {
                map.insert(row.sensor_name.clone(), json_number(row.value));
            }
            let ts = latest_ts.entry(row.device_id.clone()).or_insert(row.timestamp);
            if row.timestamp > *ts {
                *ts = row.timestamp;
            }
        }

        for (device_id, ts) in latest_ts {
            if let Some(Value::Object(map)) = snapshot.get_mut(&device_id) {
                map.insert(
                    "timestamp".to_string(),
                    Value::String(self.format_timestamp(ts)),
                );
            }
        }

        Ok(snapshot)
    }

    async fn forward(&self, owner: &Owner, group: &str, device_id: &str, decoded: &Value) -> bool {
        let target = match self
            .live_target_repository
            .get_target(GetLiveDataTargetInput {
                owner: owner.clone(),
            })
            .await
        {
            Ok(Some(target)) => target,
            Ok(None) => return false,
            Err(e) => {
                // Best-effort path: never fail the accepting request
                warn!(group = %group, error = %e, "live target lookup failed, skipping forward");
                return false;
            }
        };

        let job = DeliveryJob {
            endpoint_url: target.endpoint_url,
            tenant_email: target.email,
            group: group.to_string(),
            device_id: device_id.to_string(),
            decoded: decoded.clone(),
        };
        if let Err(e) = self.delivery_queue.enqueue(job).await {
            warn!(group = %group, error = %e, "delivery enqueue failed, dropping");
            return false;
        }
        true
    }

    fn format_timestamp(&self, ts: DateTime<Utc>) -> String {
        ts.with_timezone(&self.reporting_offset)
            .format(TIMESTAMP_FORMAT)
            .to_string()
    }
}

fn persisted_rows(
    device_id: &str,
    bindings: &[sensorgrid_domain::FieldSensorBinding],
    payload: &Map<String, Value>,
    occurred_at: DateTime<Utc>,
) -> Vec<NewReading> {
    bindings
        .iter()
        .filter_map(|binding| {
            let raw = payload.get(&binding.field_name)?;
            let value = match raw {
                Value::Number(n) => n.as_f64()?,
                Value::Bool(b) => {
                    if *b {
                        1.0
                    } else {
                        0.0
                    }
                }
                _ => return None,
            };
            Some(NewReading {
                device_id: device_id.to_string(),
                field_name: binding.field_name.clone(),
                sensor_name: binding.sensor_name.clone(),
                value,
                timestamp: occurred_at,
            })
        })
        .collect()
}

fn json_number(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}
