use crate::binding::{CreateBindingInput, FieldSensorBinding, ListBindingsInput};
use crate::company::{Company, CreateCompanyInput, GetCompanyInput};
use crate::device::{CreateDeviceInput, Device, GetDeviceInput};
use crate::error::DomainResult;
use crate::live_target::{GetLiveDataTargetInput, LiveDataTarget};
use crate::owner::Owner;
use crate::principal::Principal;
use crate::reading::{LatestReadingsInput, NewReading, QueryWindowInput, ReadingRow};
use crate::user::{CreateUserInput, GetUserInput, User};
use async_trait::async_trait;

/// Repository trait for device storage operations.
/// Infrastructure (or a caching decorator) implements this trait.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Create a new device
    async fn create_device(&self, input: CreateDeviceInput) -> DomainResult<Device>;

    /// Get a device by ID
    async fn get_device(&self, input: GetDeviceInput) -> DomainResult<Option<Device>>;

    /// List all devices owned by a tenant
    async fn list_devices_for_owner(&self, owner: &Owner) -> DomainResult<Vec<Device>>;
}

/// Repository trait for user storage operations
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, input: CreateUserInput) -> DomainResult<User>;

    async fn get_user(&self, input: GetUserInput) -> DomainResult<Option<User>>;

    async fn get_user_by_id(&self, user_id: &str) -> DomainResult<Option<User>>;
}

/// Repository trait for company storage operations
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn create_company(&self, input: CreateCompanyInput) -> DomainResult<Company>;

    async fn get_company(&self, input: GetCompanyInput) -> DomainResult<Option<Company>>;

    async fn get_company_by_id(&self, company_id: &str) -> DomainResult<Option<Company>>;
}

/// Repository trait for field/sensor binding storage operations
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BindingRepository: Send + Sync {
    async fn create_binding(&self, input: CreateBindingInput) -> DomainResult<FieldSensorBinding>;

    /// List a device's bindings (unordered; callers sort by field number)
    async fn list_bindings(&self, input: ListBindingsInput)
        -> DomainResult<Vec<FieldSensorBinding>>;
}

/// Repository trait for sensor data facts
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReadingRepository: Send + Sync {
    /// Persist one row per decoded field of an accepted reading
    async fn store_readings(&self, readings: Vec<NewReading>) -> DomainResult<()>;

    /// Time-windowed column projection, ordered by timestamp ascending
    async fn query_window(&self, input: QueryWindowInput) -> DomainResult<Vec<ReadingRow>>;

    /// Latest row per (device, sensor) pair for snapshot construction
    async fn latest_readings(&self, input: LatestReadingsInput) -> DomainResult<Vec<ReadingRow>>;
}

/// Repository trait for per-tenant external delivery targets
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait LiveDataTargetRepository: Send + Sync {
    async fn get_target(
        &self,
        input: GetLiveDataTargetInput,
    ) -> DomainResult<Option<LiveDataTarget>>;
}

/// Source-of-truth lookup behind the API-key identity cache.
///
/// Receives the raw key; implementations compare against stored digests.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PrincipalSource: Send + Sync {
    async fn find_by_api_key(&self, raw_key: &str) -> DomainResult<Option<Principal>>;
}
