use crate::device::Device;
use crate::user::User;
use serde::{Deserialize, Serialize};

/// Authenticated actor resolved from a credential: a device or a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Principal {
    Device(Device),
    User(User),
}

impl Principal {
    pub fn id(&self) -> &str {
        match self {
            Principal::Device(d) => &d.device_id,
            Principal::User(u) => &u.id,
        }
    }
}
