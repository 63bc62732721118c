use crate::binding::{FieldSensorBinding, ListBindingsInput};
use crate::device::Device;
use crate::error::{DomainError, DomainResult};
use crate::owner::Owner;
use crate::repository::{BindingRepository, CompanyRepository, UserRepository};
use crate::user::GetUserInput;
use std::sync::Arc;
use tracing::debug;

/// Derives the owning tenant and the field/sensor mapping of a device.
///
/// Sits between the fan-out router and the repositories: the binding
/// repository handed in here is expected to be the caching decorator, so
/// per-request traffic rarely reaches the persistent store.
pub struct OwnershipResolver {
    user_repository: Arc<dyn UserRepository>,
    company_repository: Arc<dyn CompanyRepository>,
    binding_repository: Arc<dyn BindingRepository>,
}

impl OwnershipResolver {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        company_repository: Arc<dyn CompanyRepository>,
        binding_repository: Arc<dyn BindingRepository>,
    ) -> Self {
        Self {
            user_repository,
            company_repository,
            binding_repository,
        }
    }

    /// Resolve a device to its owning tenant.
    ///
    /// Exactly one branch is populated per the ownership invariant. A
    /// device owned by a subordinate user resolves to that user's
    /// creator, the billing owner whose group carries the live data.
    pub async fn resolve_owner(&self, device: &Device) -> DomainResult<Owner> {
        device.validate_owner()?;

        if let Some(company_id) = &device.company_id {
            let company = self
                .company_repository
                .get_company_by_id(company_id)
                .await?
                .ok_or_else(|| DomainError::CompanyNotFound(company_id.clone()))?;
            return Ok(Owner::Company { slug: company.slug });
        }

        // validate_owner guarantees user_id is set on this branch
        let user_id = device.user_id.as_deref().unwrap_or_default();
        let user = self
            .user_repository
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound(user_id.to_string()))?;

        if user.role.is_subordinate() {
            if let Some(creator_username) = &user.created_by {
                let creator = self
                    .user_repository
                    .get_user(GetUserInput {
                        username: creator_username.clone(),
                    })
                    .await?
                    .ok_or_else(|| DomainError::UserNotFound(creator_username.clone()))?;

                debug!(
                    device_id = %device.device_id,
                    subordinate = %user.username,
                    owner = %creator.username,
                    "Resolved subordinate device owner to creator"
                );
                return Ok(Owner::User {
                    username: creator.username,
                });
            }
        }

        Ok(Owner::User {
            username: user.username,
        })
    }

    /// A device's field bindings ordered by field number ascending.
    pub async fn field_bindings(&self, device_id: &str) -> DomainResult<Vec<FieldSensorBinding>> {
        let mut bindings = self
            .binding_repository
            .list_bindings(ListBindingsInput {
                device_id: device_id.to_string(),
            })
            .await?;
        bindings.sort_by_key(|b| b.field_number);
        Ok(bindings)
    }
}
