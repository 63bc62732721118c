mod config;
mod demo;
mod memory;
mod telemetry;

use chrono::{FixedOffset, Utc};
use config::ServiceConfig;
use memory::InMemoryBackend;
use sensorgrid_cache::{ApiKeyCache, CachedBindingRepository, CachedDeviceRepository, InMemoryCacheStore};
use sensorgrid_domain::{
    CompanyService, DeviceService, LiveDataTarget, Owner, OwnershipResolver, Role,
};
use sensorgrid_fanout::{
    delivery_channel, DeliveryWorker, GroupPublisher, GroupRegistry, LiveFanoutRouter,
    SubscriberSession,
};
use sensorgrid_history::{GroupBy, HistoryEngine, HistoryGroups, HistoryQuery};
use sensorgrid_nats::{NatsClient, NatsGroupPublisher, NatsLiveRelay};
use std::sync::Arc;
use std::time::Duration;
use telemetry::init_telemetry;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_telemetry(&config.log_level);
    info!(nats_enabled = config.nats_enabled, "starting sensorgrid-all-in-one");

    let Some(reporting_offset) = FixedOffset::east_opt(config.reporting_offset_hours * 3600)
    else {
        error!(
            offset_hours = config.reporting_offset_hours,
            "reporting offset out of range"
        );
        std::process::exit(1);
    };
    let cache_ttl = Duration::from_secs(config.cache_ttl_secs);

    // Shared state: repository backend and cache store
    let backend = Arc::new(InMemoryBackend::new());
    let cache_store = Arc::new(InMemoryCacheStore::new());

    // Cache-decorated repositories; everything downstream reads through these
    let cached_bindings = Arc::new(CachedBindingRepository::new(
        backend.clone(),
        cache_store.clone(),
        cache_ttl,
    ));
    let cached_devices = Arc::new(CachedDeviceRepository::new(
        backend.clone(),
        backend.clone(),
        backend.clone(),
        cache_store.clone(),
        cache_ttl,
    ));
    let resolver = Arc::new(OwnershipResolver::new(
        backend.clone(),
        backend.clone(),
        cached_bindings.clone(),
    ));

    // Domain services
    let company_service = CompanyService::new(backend.clone());
    let device_service = DeviceService::new(cached_devices.clone(), cached_bindings.clone());

    // Credential cache in front of the principal source
    let identity = Arc::new(ApiKeyCache::new(
        cache_store.clone(),
        backend.clone(),
        cache_ttl,
    ));

    let shutdown = CancellationToken::new();
    let registry = Arc::new(GroupRegistry::new());

    // With NATS enabled, frames go out over the wire and come back in
    // through the relay, so every node's local subscribers see them.
    let publisher: Arc<dyn GroupPublisher> = if config.nats_enabled {
        let nats = match NatsClient::connect(
            &config.nats_url,
            Duration::from_secs(config.startup_timeout_secs),
        )
        .await
        {
            Ok(client) => client,
            Err(e) => {
                error!(error = %e, "failed to connect to NATS");
                std::process::exit(1);
            }
        };
        let relay = NatsLiveRelay::new(
            nats.client().clone(),
            registry.clone(),
            shutdown.clone(),
        );
        tokio::spawn(async move {
            if let Err(e) = relay.run().await {
                error!(error = %e, "live relay failed");
            }
        });
        Arc::new(NatsGroupPublisher::new(nats.client().clone()))
    } else {
        registry.clone()
    };

    // Outbound delivery pipeline
    let (delivery_queue, delivery_rx) = delivery_channel(config.delivery_queue_capacity);
    let delivery_worker = DeliveryWorker::new(delivery_rx, shutdown.clone());
    let delivery_handle = tokio::spawn(delivery_worker.run());

    let router = Arc::new(LiveFanoutRouter::new(
        resolver,
        cached_devices.clone(),
        backend.clone(),
        backend.clone(),
        publisher,
        Arc::new(delivery_queue),
        reporting_offset,
    ));

    let history = Arc::new(HistoryEngine::new(
        cached_devices,
        cached_bindings,
        backend.clone(),
    ));

    if config.demo_enabled {
        match demo::seed_demo_tenant(&company_service, &device_service).await {
            Ok(seed) => {
                if let Some(url) = &config.demo_forward_url {
                    backend
                        .set_live_target(LiveDataTarget {
                            owner: Owner::Company {
                                slug: seed.company_slug.clone(),
                            },
                            endpoint_url: url.clone(),
                            email: "ops@acme.example".to_string(),
                        })
                        .await;
                    info!(endpoint_url = %url, "demo live data target configured");
                }
                spawn_demo_subscriber(registry.clone(), router.clone(), &seed.company_slug).await;
                spawn_history_reporter(
                    history.clone(),
                    seed.company_slug.clone(),
                    shutdown.clone(),
                );
                let producer_shutdown = shutdown.clone();
                let interval = Duration::from_secs(config.demo_interval_secs);
                let identity = identity.clone();
                let router = router.clone();
                tokio::spawn(async move {
                    if let Err(e) =
                        demo::run_demo_producer(producer_shutdown, interval, seed, identity, router)
                            .await
                    {
                        error!(error = %e, "demo producer failed");
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "failed to seed demo tenant");
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
    shutdown.cancel();
    if let Err(e) = delivery_handle.await {
        warn!(error = %e, "delivery worker did not shut down cleanly");
    }
    info!("sensorgrid-all-in-one stopped");
}

/// Attach one local viewer to the demo tenant's group and log frames.
async fn spawn_demo_subscriber(
    registry: Arc<GroupRegistry>,
    router: Arc<LiveFanoutRouter>,
    group: &str,
) {
    let (session, mut rx) = SubscriberSession::open(registry, Role::Viewer, group).await;

    match router
        .initial_snapshot(&Owner::Company {
            slug: group.to_string(),
        })
        .await
    {
        Ok(snapshot) => info!(devices = snapshot.len(), "initial snapshot delivered"),
        Err(e) => warn!(error = %e, "initial snapshot failed"),
    }

    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame.payload_json() {
                Ok(payload) => {
                    info!(group = %frame.group, payload = %payload, "subscriber received frame")
                }
                Err(e) => warn!(group = %frame.group, error = %e, "undecodable frame"),
            }
        }
        session.close().await;
    });
}

/// Periodically query the demo tenant's last hour of history.
fn spawn_history_reporter(
    history: Arc<HistoryEngine>,
    company_slug: String,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(Duration::from_secs(60)) => {
                    let now = Utc::now();
                    let query = HistoryQuery {
                        owner: Owner::Company { slug: company_slug.clone() },
                        from: now - chrono::Duration::hours(1),
                        to: now,
                        group_by: GroupBy::Sensor,
                        sensors: vec![],
                        page: None,
                        page_size: None,
                    };
                    match history.query(query).await {
                        Ok(page) => {
                            let series = match &page.groups {
                                HistoryGroups::BySensor(flat) => flat.len(),
                                HistoryGroups::ByDevice(nested) => nested.len(),
                            };
                            info!(series, pages = page.pages, "hourly history summary");
                        }
                        Err(e) => warn!(error = %e, "history summary failed"),
                    }
                }
            }
        }
    });
}
