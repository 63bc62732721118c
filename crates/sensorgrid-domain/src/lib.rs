pub mod binding;
pub mod company;
pub mod company_service;
pub mod credentials;
pub mod decode;
pub mod device;
pub mod device_service;
pub mod error;
pub mod live_target;
pub mod owner;
pub mod principal;
pub mod reading;
pub mod repository;
pub mod resolver;
pub mod role;
pub mod user;
pub mod user_service;
pub mod validate;

pub use binding::*;
pub use company::*;
pub use company_service::{CompanyService, CreateCompanyRequest};
pub use credentials::{digest_api_key, issue_api_key, IssuedApiKey};
pub use decode::decode_payload;
pub use device::*;
pub use device_service::{
    AssignBindingRequest, DeviceService, RegisterDeviceRequest, RegisteredDevice,
};
pub use error::{DomainError, DomainResult};
pub use live_target::*;
pub use owner::Owner;
pub use principal::Principal;
pub use reading::*;
pub use repository::{
    BindingRepository, CompanyRepository, DeviceRepository, LiveDataTargetRepository,
    PrincipalSource, ReadingRepository, UserRepository,
};
pub use resolver::OwnershipResolver;
pub use role::Role;
pub use user::*;
pub use user_service::{CreateUserRequest, CreatedUser, UserService};

// Re-export mocks when the testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use repository::{
    MockBindingRepository, MockCompanyRepository, MockDeviceRepository,
    MockLiveDataTargetRepository, MockPrincipalSource, MockReadingRepository, MockUserRepository,
};
