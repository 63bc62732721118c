use serde::{Deserialize, Serialize};

/// Access role carried by every user principal.
///
/// Role-scoped visibility is expressed as filtering functions over one
/// underlying principal set rather than separate per-role types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    SuperAdmin,
    Admin,
    Moderator,
    Viewer,
    Dealer,
}

impl Role {
    /// Elevated roles start live sessions unsubscribed and may attach to
    /// any tenant group.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }

    /// Subordinate roles bill and group under the account that created them.
    pub fn is_subordinate(&self) -> bool {
        matches!(self, Role::Moderator | Role::Viewer)
    }

    /// Whether a user with this role may manage a user with `other`.
    pub fn manages(&self, other: Role) -> bool {
        match self {
            Role::SuperAdmin => true,
            Role::Admin => !matches!(other, Role::SuperAdmin),
            Role::Dealer => other.is_subordinate(),
            Role::Moderator | Role::Viewer => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elevated_roles() {
        assert!(Role::SuperAdmin.is_elevated());
        assert!(Role::Admin.is_elevated());
        assert!(!Role::Moderator.is_elevated());
        assert!(!Role::Viewer.is_elevated());
        assert!(!Role::Dealer.is_elevated());
    }

    #[test]
    fn test_manages_scoping() {
        assert!(Role::SuperAdmin.manages(Role::Admin));
        assert!(!Role::Admin.manages(Role::SuperAdmin));
        assert!(Role::Dealer.manages(Role::Viewer));
        assert!(!Role::Viewer.manages(Role::Viewer));
    }
}
