//! In-memory repository backend.
//!
//! The persistent store is an external collaborator; this backend stands
//! in for it behind the domain repository traits so the all-in-one
//! binary runs self-contained.

use async_trait::async_trait;
use chrono::Utc;
use sensorgrid_domain::{
    digest_api_key, Company, CompanyRepository, CreateBindingInput, CreateCompanyInput,
    CreateDeviceInput, CreateUserInput, Device, DeviceRepository, DomainResult,
    FieldSensorBinding, GetCompanyInput, GetDeviceInput, GetLiveDataTargetInput, GetUserInput,
    LatestReadingsInput, ListBindingsInput, LiveDataTarget, LiveDataTargetRepository, NewReading,
    Owner, Principal, PrincipalSource, QueryWindowInput, ReadingRepository, ReadingRow, User,
    UserRepository,
};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct BackendState {
    companies: HashMap<String, Company>,
    users: HashMap<String, User>,
    /// API-key digest -> user id; `User` itself never carries the digest
    user_key_digests: HashMap<String, String>,
    devices: HashMap<String, Device>,
    bindings: HashMap<String, Vec<FieldSensorBinding>>,
    readings: Vec<NewReading>,
    targets: HashMap<String, LiveDataTarget>,
}

#[derive(Default)]
pub struct InMemoryBackend {
    state: RwLock<BackendState>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_live_target(&self, target: LiveDataTarget) {
        let mut state = self.state.write().await;
        state
            .targets
            .insert(target.owner.group_name().to_string(), target);
    }
}

#[async_trait]
impl CompanyRepository for InMemoryBackend {
    async fn create_company(&self, input: CreateCompanyInput) -> DomainResult<Company> {
        let company = Company {
            id: input.id.clone(),
            name: input.name,
            slug: input.slug,
            email: input.email,
            created_at: Some(Utc::now()),
            updated_at: None,
        };
        self.state
            .write()
            .await
            .companies
            .insert(input.id, company.clone());
        Ok(company)
    }

    async fn get_company(&self, input: GetCompanyInput) -> DomainResult<Option<Company>> {
        Ok(self
            .state
            .read()
            .await
            .companies
            .values()
            .find(|c| c.slug == input.slug)
            .cloned())
    }

    async fn get_company_by_id(&self, company_id: &str) -> DomainResult<Option<Company>> {
        Ok(self.state.read().await.companies.get(company_id).cloned())
    }
}

#[async_trait]
impl UserRepository for InMemoryBackend {
    async fn create_user(&self, input: CreateUserInput) -> DomainResult<User> {
        let user = User {
            id: input.id.clone(),
            username: input.username,
            email: input.email,
            role: input.role,
            associated_with_company: input.company_id.is_some(),
            company_id: input.company_id,
            created_by: input.created_by,
            created_at: Some(Utc::now()),
            updated_at: None,
        };
        let mut state = self.state.write().await;
        state
            .user_key_digests
            .insert(input.api_key_digest, input.id.clone());
        state.users.insert(input.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, input: GetUserInput) -> DomainResult<Option<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == input.username)
            .cloned())
    }

    async fn get_user_by_id(&self, user_id: &str) -> DomainResult<Option<User>> {
        Ok(self.state.read().await.users.get(user_id).cloned())
    }
}

#[async_trait]
impl DeviceRepository for InMemoryBackend {
    async fn create_device(&self, input: CreateDeviceInput) -> DomainResult<Device> {
        let device = Device {
            device_id: input.device_id.clone(),
            name: input.name,
            company_id: input.company_id,
            user_id: input.user_id,
            api_key_digest: input.api_key_digest,
            created_at: Some(Utc::now()),
            updated_at: None,
        };
        self.state
            .write()
            .await
            .devices
            .insert(input.device_id, device.clone());
        Ok(device)
    }

    async fn get_device(&self, input: GetDeviceInput) -> DomainResult<Option<Device>> {
        Ok(self.state.read().await.devices.get(&input.device_id).cloned())
    }

    async fn list_devices_for_owner(&self, owner: &Owner) -> DomainResult<Vec<Device>> {
        let state = self.state.read().await;
        let devices = match owner {
            Owner::Company { slug } => {
                let company_id = state
                    .companies
                    .values()
                    .find(|c| &c.slug == slug)
                    .map(|c| c.id.clone());
                match company_id {
                    Some(id) => state
                        .devices
                        .values()
                        .filter(|d| d.company_id.as_deref() == Some(id.as_str()))
                        .cloned()
                        .collect(),
                    None => Vec::new(),
                }
            }
            Owner::User { username } => {
                let user_id = state
                    .users
                    .values()
                    .find(|u| &u.username == username)
                    .map(|u| u.id.clone());
                match user_id {
                    Some(id) => state
                        .devices
                        .values()
                        .filter(|d| d.user_id.as_deref() == Some(id.as_str()))
                        .cloned()
                        .collect(),
                    None => Vec::new(),
                }
            }
        };
        Ok(devices)
    }
}

#[async_trait]
impl sensorgrid_domain::BindingRepository for InMemoryBackend {
    async fn create_binding(&self, input: CreateBindingInput) -> DomainResult<FieldSensorBinding> {
        let binding = FieldSensorBinding {
            device_id: input.device_id.clone(),
            field_name: input.field_name,
            field_number: input.field_number,
            sensor_name: input.sensor_name,
            min_limit: input.min_limit,
            max_limit: input.max_limit,
            is_boolean: input.is_boolean,
        };
        self.state
            .write()
            .await
            .bindings
            .entry(input.device_id)
            .or_default()
            .push(binding.clone());
        Ok(binding)
    }

    async fn list_bindings(
        &self,
        input: ListBindingsInput,
    ) -> DomainResult<Vec<FieldSensorBinding>> {
        Ok(self
            .state
            .read()
            .await
            .bindings
            .get(&input.device_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ReadingRepository for InMemoryBackend {
    async fn store_readings(&self, readings: Vec<NewReading>) -> DomainResult<()> {
        self.state.write().await.readings.extend(readings);
        Ok(())
    }

    async fn query_window(&self, input: QueryWindowInput) -> DomainResult<Vec<ReadingRow>> {
        let mut rows: Vec<ReadingRow> = self
            .state
            .read()
            .await
            .readings
            .iter()
            .filter(|r| {
                input.device_ids.contains(&r.device_id)
                    && input.sensor_names.contains(&r.sensor_name)
                    && r.timestamp >= input.from
                    && r.timestamp <= input.to
            })
            .map(|r| ReadingRow {
                device_id: r.device_id.clone(),
                sensor_name: r.sensor_name.clone(),
                value: r.value,
                timestamp: r.timestamp,
            })
            .collect();
        rows.sort_by_key(|r| r.timestamp);
        Ok(rows)
    }

    async fn latest_readings(&self, input: LatestReadingsInput) -> DomainResult<Vec<ReadingRow>> {
        let state = self.state.read().await;
        let mut latest: HashMap<(String, String), ReadingRow> = HashMap::new();
        for r in state
            .readings
            .iter()
            .filter(|r| input.device_ids.contains(&r.device_id))
        {
            let row = ReadingRow {
                device_id: r.device_id.clone(),
                sensor_name: r.sensor_name.clone(),
                value: r.value,
                timestamp: r.timestamp,
            };
            latest
                .entry((r.device_id.clone(), r.sensor_name.clone()))
                .and_modify(|existing| {
                    if row.timestamp > existing.timestamp {
                        *existing = row.clone();
                    }
                })
                .or_insert(row);
        }
        Ok(latest.into_values().collect())
    }
}

#[async_trait]
impl LiveDataTargetRepository for InMemoryBackend {
    async fn get_target(
        &self,
        input: GetLiveDataTargetInput,
    ) -> DomainResult<Option<LiveDataTarget>> {
        Ok(self
            .state
            .read()
            .await
            .targets
            .get(input.owner.group_name())
            .cloned())
    }
}

#[async_trait]
impl PrincipalSource for InMemoryBackend {
    async fn find_by_api_key(&self, raw_key: &str) -> DomainResult<Option<Principal>> {
        let digest = digest_api_key(raw_key);
        let state = self.state.read().await;
        if let Some(device) = state
            .devices
            .values()
            .find(|d| d.api_key_digest == digest)
        {
            return Ok(Some(Principal::Device(device.clone())));
        }
        if let Some(user_id) = state.user_key_digests.get(&digest) {
            return Ok(state.users.get(user_id).cloned().map(Principal::User));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_configured_live_target_is_returned_for_its_owner() {
        let backend = InMemoryBackend::new();
        let owner = Owner::Company {
            slug: "acme-co".to_string(),
        };
        backend
            .set_live_target(LiveDataTarget {
                owner: owner.clone(),
                endpoint_url: "https://hooks.acme.example/readings".to_string(),
                email: "ops@acme.example".to_string(),
            })
            .await;

        let target = backend
            .get_target(GetLiveDataTargetInput { owner })
            .await
            .unwrap()
            .expect("target was configured");
        assert_eq!(target.endpoint_url, "https://hooks.acme.example/readings");

        let other = backend
            .get_target(GetLiveDataTargetInput {
                owner: Owner::Company {
                    slug: "other-co".to_string(),
                },
            })
            .await
            .unwrap();
        assert_eq!(other, None);
    }
}
