use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Company not found: {0}")]
    CompanyNotFound(String),

    #[error("Company already exists: {0}")]
    CompanyAlreadyExists(String),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Principal not found for credential")]
    PrincipalNotFound,

    #[error("Device has no field bindings: {0}")]
    DeviceNotConfigured(String),

    #[error("Ownership violation: {0}")]
    OwnershipViolation(String),

    #[error("Field already bound on device {device_id}: {field_name}")]
    DuplicateFieldBinding {
        device_id: String,
        field_name: String,
    },

    #[error("Sensor already bound on device {device_id}: {sensor_name}")]
    DuplicateSensorBinding {
        device_id: String,
        sensor_name: String,
    },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid time window: {0}")]
    InvalidTimeWindow(String),

    #[error("Page {page} is beyond the last page ({page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}
