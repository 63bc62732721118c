use crate::paginate::{clamp_page_size, normalize_page, page_count, page_window, PageLinks};
use crate::query::{GroupBy, HistoryQuery};
use chrono::{DateTime, Utc};
use sensorgrid_domain::{
    BindingRepository, DeviceRepository, DomainError, DomainResult, ListBindingsInput,
    QueryWindowInput, ReadingRepository,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, instrument};

/// One reading inside a grouped series.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub device_id: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Grouped result body, shaped by the query's [`GroupBy`] axis.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryGroups {
    /// device id -> sensor name -> chronological readings
    ByDevice(BTreeMap<String, BTreeMap<String, Vec<Point>>>),
    /// sensor name -> chronological readings across all owned devices
    BySensor(BTreeMap<String, Vec<Point>>),
}

/// One page of grouped historical results.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPage {
    pub groups: HistoryGroups,
    pub page: u32,
    pub pages: u32,
    pub links: PageLinks,
}

/// Serves time-windowed, tenant-scoped historical queries.
///
/// Works against repositories only; hand it the cache-decorated device
/// and binding repositories so ownership lookups stay off the persistent
/// store on the hot path.
pub struct HistoryEngine {
    device_repository: Arc<dyn DeviceRepository>,
    binding_repository: Arc<dyn BindingRepository>,
    reading_repository: Arc<dyn ReadingRepository>,
}

impl HistoryEngine {
    pub fn new(
        device_repository: Arc<dyn DeviceRepository>,
        binding_repository: Arc<dyn BindingRepository>,
        reading_repository: Arc<dyn ReadingRepository>,
    ) -> Self {
        Self {
            device_repository,
            binding_repository,
            reading_repository,
        }
    }

    #[instrument(skip(self, query), fields(owner = %query.owner.group_name()))]
    pub async fn query(&self, query: HistoryQuery) -> DomainResult<HistoryPage> {
        // 1. Window and page parameters are caller errors, checked up front
        if query.from >= query.to {
            return Err(DomainError::InvalidTimeWindow(format!(
                "window start {} is not before end {}",
                query.from, query.to
            )));
        }
        let page = normalize_page(query.page);
        let page_size = clamp_page_size(query.page_size);

        // 2. Scope to the tenant's devices
        let devices = self
            .device_repository
            .list_devices_for_owner(&query.owner)
            .await?;
        let device_ids: Vec<String> = devices.iter().map(|d| d.device_id.clone()).collect();
        if device_ids.is_empty() {
            return empty_page(query.group_by, page);
        }

        // 3. Owned sensor names, intersected with the caller's filter
        let mut owned_sensors = BTreeSet::new();
        for device_id in &device_ids {
            let bindings = self
                .binding_repository
                .list_bindings(ListBindingsInput {
                    device_id: device_id.clone(),
                })
                .await?;
            owned_sensors.extend(bindings.into_iter().map(|b| b.sensor_name));
        }
        let sensor_names = effective_sensors(&owned_sensors, &query.sensors);
        if sensor_names.is_empty() {
            return empty_page(query.group_by, page);
        }

        // 4. Fetch the window once, then group and slice in memory
        let rows = self
            .reading_repository
            .query_window(QueryWindowInput {
                device_ids,
                sensor_names: sensor_names.clone(),
                from: query.from,
                to: query.to,
            })
            .await?;

        let pages = page_count(rows.len(), sensor_names.len(), page_size);
        if page > pages {
            return Err(DomainError::PageOutOfRange {
                page,
                page_count: pages,
            });
        }

        debug!(
            rows = rows.len(),
            sensors = sensor_names.len(),
            page,
            pages,
            "history window fetched"
        );

        let (start, end) = page_window(page, page_size);
        let groups = match query.group_by {
            GroupBy::Device => {
                let mut nested: BTreeMap<String, BTreeMap<String, Vec<Point>>> = BTreeMap::new();
                for row in rows {
                    nested
                        .entry(row.device_id.clone())
                        .or_default()
                        .entry(row.sensor_name.clone())
                        .or_default()
                        .push(Point {
                            device_id: row.device_id,
                            value: row.value,
                            timestamp: row.timestamp,
                        });
                }
                for sensors in nested.values_mut() {
                    for series in sensors.values_mut() {
                        slice_series(series, start, end);
                    }
                }
                HistoryGroups::ByDevice(nested)
            }
            GroupBy::Sensor => {
                let mut flat: BTreeMap<String, Vec<Point>> = BTreeMap::new();
                for row in rows {
                    flat.entry(row.sensor_name.clone()).or_default().push(Point {
                        device_id: row.device_id,
                        value: row.value,
                        timestamp: row.timestamp,
                    });
                }
                for series in flat.values_mut() {
                    slice_series(series, start, end);
                }
                HistoryGroups::BySensor(flat)
            }
        };

        Ok(HistoryPage {
            groups,
            page,
            pages,
            links: PageLinks::build(page, pages),
        })
    }
}

/// A tenant with no devices or no bound sensors still has exactly one
/// (empty) page, so any higher page number is out of range.
fn empty_page(group_by: GroupBy, page: u32) -> DomainResult<HistoryPage> {
    if page > 1 {
        return Err(DomainError::PageOutOfRange {
            page,
            page_count: 1,
        });
    }
    let groups = match group_by {
        GroupBy::Device => HistoryGroups::ByDevice(BTreeMap::new()),
        GroupBy::Sensor => HistoryGroups::BySensor(BTreeMap::new()),
    };
    Ok(HistoryPage {
        groups,
        page: 1,
        pages: 1,
        links: PageLinks::build(1, 1),
    })
}

/// Intersect the requested names with the owned set, falling back to the
/// full owned set when nothing matches. Guessing wrong names must not
/// produce an empty result.
fn effective_sensors(owned: &BTreeSet<String>, requested: &[String]) -> Vec<String> {
    if !requested.is_empty() {
        let filtered: Vec<String> = owned
            .iter()
            .filter(|name| requested.iter().any(|r| r == *name))
            .cloned()
            .collect();
        if !filtered.is_empty() {
            return filtered;
        }
    }
    owned.iter().cloned().collect()
}

fn slice_series(series: &mut Vec<Point>, start: usize, end: usize) {
    if start >= series.len() {
        series.clear();
        return;
    }
    series.truncate(end.min(series.len()));
    series.drain(..start);
}
