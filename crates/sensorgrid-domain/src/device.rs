use crate::error::{DomainError, DomainResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Device principal entity
///
/// A device is owned by exactly one of a company or an individual user.
/// Both set or both empty is a write-time validation failure, never
/// silently corrected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    pub name: String,
    pub company_id: Option<String>,
    pub user_id: Option<String>,
    pub api_key_digest: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Device {
    /// Check the exactly-one-owner invariant.
    pub fn validate_owner(&self) -> DomainResult<()> {
        match (&self.company_id, &self.user_id) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            (Some(_), Some(_)) => Err(DomainError::OwnershipViolation(format!(
                "device {} is bound to both a company and a user",
                self.device_id
            ))),
            (None, None) => Err(DomainError::OwnershipViolation(format!(
                "device {} has no owner",
                self.device_id
            ))),
        }
    }
}

/// Input for registering a device (service generates ID and API key)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDeviceInput {
    pub device_id: String,
    pub name: String,
    pub company_id: Option<String>,
    pub user_id: Option<String>,
    pub api_key_digest: String,
}

/// Input for retrieving a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetDeviceInput {
    pub device_id: String,
}
