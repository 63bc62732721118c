use chrono::{DateTime, Utc};
use sensorgrid_domain::Owner;

/// Grouping axis for a historical query.
///
/// `Device` nests each device's sensors separately; `Sensor` flattens
/// readings from every owned device into one series per sensor name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Device,
    Sensor,
}

/// One tenant-scoped historical query.
///
/// `sensors` is advisory: the engine intersects it with the tenant's
/// owned sensor names and falls back to the full owned set when the
/// intersection is empty. `page` and `page_size` are raw caller values,
/// normalized by the pagination layer.
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    pub owner: Owner,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub group_by: GroupBy,
    pub sensors: Vec<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}
