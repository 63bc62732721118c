use crate::error::{DomainError, DomainResult};
use crate::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User principal entity
///
/// `associated_with_company` mirrors whether `company_id` is set; the two
/// are validated together so a cached projection can rely on either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub company_id: Option<String>,
    pub associated_with_company: bool,
    /// Username of the account that created this user, when subordinate.
    pub created_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Check the company-association invariant.
    pub fn validate_company_link(&self) -> DomainResult<()> {
        if self.associated_with_company != self.company_id.is_some() {
            return Err(DomainError::OwnershipViolation(format!(
                "user {} company flag disagrees with company reference",
                self.username
            )));
        }
        Ok(())
    }
}

/// Input for creating a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserInput {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub company_id: Option<String>,
    pub created_by: Option<String>,
    pub api_key_digest: String,
}

/// Input for fetching a user by username
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetUserInput {
    pub username: String,
}

/// Filter a principal list down to what a user with `role` may see.
///
/// One underlying user set, scoped per role, instead of per-role proxy
/// types with overridden query scoping.
pub fn visible_users(role: Role, users: Vec<User>) -> Vec<User> {
    users
        .into_iter()
        .filter(|u| role.manages(u.role))
        .collect()
}
