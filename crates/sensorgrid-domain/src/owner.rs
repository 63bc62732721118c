use serde::{Deserialize, Serialize};

/// Resolved owning tenant of a device: exactly one branch per the
/// device ownership invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    Company { slug: String },
    User { username: String },
}

impl Owner {
    /// The live fan-out group name for this tenant: company slug when
    /// company-owned, otherwise the owning username.
    pub fn group_name(&self) -> &str {
        match self {
            Owner::Company { slug } => slug,
            Owner::User { username } => username,
        }
    }

    /// Scoped single-value cache key, e.g. `"company_devices_acme-co"`.
    pub fn scoped_cache_key(&self, prefix: &str) -> String {
        match self {
            Owner::Company { slug } => format!("{prefix}_{slug}"),
            Owner::User { username } => format!("{prefix}_{username}"),
        }
    }
}
