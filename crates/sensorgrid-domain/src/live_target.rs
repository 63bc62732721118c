use crate::owner::Owner;
use serde::{Deserialize, Serialize};

/// Optional external HTTP endpoint configured per tenant to receive
/// decoded readings. At most one target per tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveDataTarget {
    pub owner: Owner,
    pub endpoint_url: String,
    /// Tenant contact address forwarded alongside the decoded map.
    pub email: String,
}

/// Input for looking up a tenant's live data target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetLiveDataTargetInput {
    pub owner: Owner,
}
