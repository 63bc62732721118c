//! Demo reading producer: seeds one tenant with a bound device and
//! pushes simulated readings through the full accept path, useful for
//! exercising the pipeline without real devices.

use anyhow::{anyhow, Result};
use chrono::Utc;
use rand::Rng;
use sensorgrid_cache::ApiKeyCache;
use sensorgrid_domain::{
    AssignBindingRequest, CreateCompanyRequest, DeviceService, Principal, RegisterDeviceRequest,
};
use sensorgrid_fanout::LiveFanoutRouter;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub struct DemoSeed {
    pub company_slug: String,
    pub device_id: String,
    pub raw_api_key: String,
}

/// Create the demo tenant, register its device, and bind two fields:
/// a bounded temperature sensor and a boolean mains sensor.
pub async fn seed_demo_tenant(
    company_service: &sensorgrid_domain::CompanyService,
    device_service: &DeviceService,
) -> Result<DemoSeed> {
    let company = company_service
        .create_company(CreateCompanyRequest {
            name: "Acme Greenhouses".to_string(),
            email: "ops@acme.example".to_string(),
        })
        .await?;

    let registered = device_service
        .register_device(RegisterDeviceRequest {
            name: "greenhouse-1".to_string(),
            company_id: Some(company.id.clone()),
            user_id: None,
        })
        .await?;

    device_service
        .assign_binding(AssignBindingRequest {
            device_id: registered.device.device_id.clone(),
            field_name: "field1".to_string(),
            field_number: 1,
            sensor_name: "temperature".to_string(),
            min_limit: Some(-20.0),
            max_limit: Some(60.0),
            is_boolean: false,
        })
        .await?;
    device_service
        .assign_binding(AssignBindingRequest {
            device_id: registered.device.device_id.clone(),
            field_name: "field2".to_string(),
            field_number: 2,
            sensor_name: "mains".to_string(),
            min_limit: None,
            max_limit: None,
            is_boolean: true,
        })
        .await?;

    info!(
        company_slug = %company.slug,
        device_id = %registered.device.device_id,
        "demo tenant seeded"
    );
    Ok(DemoSeed {
        company_slug: company.slug,
        device_id: registered.device.device_id,
        raw_api_key: registered.raw_api_key,
    })
}

/// Push one simulated reading per interval until cancelled.
///
/// Each iteration authenticates through the credential cache, so the
/// demo also exercises the identity lookup path.
pub async fn run_demo_producer(
    ctx: CancellationToken,
    interval: Duration,
    seed: DemoSeed,
    identity: Arc<ApiKeyCache>,
    router: Arc<LiveFanoutRouter>,
) -> Result<()> {
    info!("demo producer started");

    loop {
        tokio::select! {
            _ = ctx.cancelled() => {
                info!("demo producer stopping");
                return Ok(());
            }
            _ = tokio::time::sleep(interval) => {
                let principal = identity
                    .resolve_by_api_key(&seed.raw_api_key)
                    .await?
                    .ok_or_else(|| anyhow!("demo device credential rejected"))?;
                let Principal::Device(device) = principal else {
                    return Err(anyhow!("demo credential resolved to a non-device principal"));
                };

                let mut payload = serde_json::Map::new();
                let temperature = rand::thread_rng().gen_range(15.0..30.0);
                let mains = u8::from(rand::thread_rng().gen_bool(0.95));
                payload.insert("field1".to_string(), serde_json::json!(temperature));
                payload.insert("field2".to_string(), serde_json::json!(mains));

                match router.ingest(&device, &payload, Utc::now()).await {
                    Ok(outcome) => info!(
                        device_id = %outcome.device_id,
                        group = %outcome.group,
                        published = outcome.published,
                        "demo reading ingested"
                    ),
                    Err(e) => error!(error = %e, "demo reading rejected"),
                }
            }
        }
    }
}
