use crate::binding::{
    validate_binding_uniqueness, CreateBindingInput, FieldSensorBinding, ListBindingsInput,
};
use crate::credentials::{issue_api_key, IssuedApiKey};
use crate::device::{CreateDeviceInput, Device, GetDeviceInput};
use crate::error::{DomainError, DomainResult};
use crate::repository::{BindingRepository, DeviceRepository};
use crate::validate::validate_struct;
use garde::Validate;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Request to register a device; exactly one owner field must be set.
#[derive(Debug, Clone, Validate)]
pub struct RegisterDeviceRequest {
    #[garde(length(min = 1))]
    pub name: String,
    #[garde(skip)]
    pub company_id: Option<String>,
    #[garde(skip)]
    pub user_id: Option<String>,
}

/// Output of device registration: the raw API key is returned exactly once.
#[derive(Debug, Clone)]
pub struct RegisteredDevice {
    pub device: Device,
    pub raw_api_key: String,
}

/// Request to bind a payload field to a sensor
#[derive(Debug, Clone, Validate)]
pub struct AssignBindingRequest {
    #[garde(length(min = 1))]
    pub device_id: String,
    #[garde(length(min = 1))]
    pub field_name: String,
    #[garde(skip)]
    pub field_number: u32,
    #[garde(length(min = 1))]
    pub sensor_name: String,
    #[garde(skip)]
    pub min_limit: Option<f64>,
    #[garde(skip)]
    pub max_limit: Option<f64>,
    #[garde(skip)]
    pub is_boolean: bool,
}

/// Domain service for device registration and field/sensor bindings
pub struct DeviceService {
    device_repository: Arc<dyn DeviceRepository>,
    binding_repository: Arc<dyn BindingRepository>,
}

impl DeviceService {
    pub fn new(
        device_repository: Arc<dyn DeviceRepository>,
        binding_repository: Arc<dyn BindingRepository>,
    ) -> Self {
        Self {
            device_repository,
            binding_repository,
        }
    }

    /// Register a device under exactly one owner and issue its API key.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn register_device(
        &self,
        request: RegisterDeviceRequest,
    ) -> DomainResult<RegisteredDevice> {
        validate_struct(&request)?;

        let IssuedApiKey { raw_key, digest } = issue_api_key();
        let candidate = Device {
            device_id: xid::new().to_string(),
            name: request.name,
            company_id: request.company_id,
            user_id: request.user_id,
            api_key_digest: digest,
            created_at: None,
            updated_at: None,
        };
        // Rejected at write time, never silently corrected
        candidate.validate_owner()?;

        let device = self
            .device_repository
            .create_device(CreateDeviceInput {
                device_id: candidate.device_id,
                name: candidate.name,
                company_id: candidate.company_id,
                user_id: candidate.user_id,
                api_key_digest: candidate.api_key_digest,
            })
            .await?;

        info!(device_id = %device.device_id, "device registered");
        Ok(RegisteredDevice {
            device,
            raw_api_key: raw_key,
        })
    }

    /// Bind a payload field to a sensor, enforcing per-device uniqueness
    /// of both field names and sensor assignments.
    #[instrument(skip(self, request), fields(device_id = %request.device_id, field = %request.field_name))]
    pub async fn assign_binding(
        &self,
        request: AssignBindingRequest,
    ) -> DomainResult<FieldSensorBinding> {
        validate_struct(&request)?;

        self.device_repository
            .get_device(GetDeviceInput {
                device_id: request.device_id.clone(),
            })
            .await?
            .ok_or_else(|| DomainError::DeviceNotFound(request.device_id.clone()))?;

        let existing = self
            .binding_repository
            .list_bindings(ListBindingsInput {
                device_id: request.device_id.clone(),
            })
            .await?;

        let input = CreateBindingInput {
            device_id: request.device_id,
            field_name: request.field_name,
            field_number: request.field_number,
            sensor_name: request.sensor_name,
            min_limit: request.min_limit,
            max_limit: request.max_limit,
            is_boolean: request.is_boolean,
        };
        validate_binding_uniqueness(&existing, &input)?;

        let binding = self.binding_repository.create_binding(input).await?;

        debug!(
            device_id = %binding.device_id,
            field = %binding.field_name,
            sensor = %binding.sensor_name,
            "binding assigned"
        );
        Ok(binding)
    }
}
