//! Verified caller identity.
//!
//! The identity collaborator (JWT verification in the HTTP layer) hands the
//! lifecycle core a [`Caller`]; the core trusts it and only enforces ownership
//! and role checks.

use serde::{Deserialize, Serialize};

use super::UserId;

/// Role of an authenticated user, numbered as in the user table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    CustomerCare,
    Caregiver,
}

impl Role {
    pub fn id(&self) -> i32 {
        match self {
            Self::Admin => 1,
            Self::CustomerCare => 2,
            Self::Caregiver => 3,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(Self::Admin),
            2 => Some(Self::CustomerCare),
            3 => Some(Self::Caregiver),
            _ => None,
        }
    }
}

/// The `(user_id, role)` pair attached to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: impl Into<UserId>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn caregiver(user_id: impl Into<UserId>) -> Self {
        Self::new(user_id, Role::Caregiver)
    }

    pub fn admin(user_id: impl Into<UserId>) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this caller owns a record belonging to `owner`.
    pub fn owns(&self, owner: UserId) -> bool {
        self.user_id == owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ids_round_trip() {
        for role in [Role::Admin, Role::CustomerCare, Role::Caregiver] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(4), None);
    }

    #[test]
    fn test_ownership() {
        let caller = Caller::caregiver(7);
        assert!(caller.owns(UserId::new(7)));
        assert!(!caller.owns(UserId::new(8)));
        assert!(!caller.is_admin());
        assert!(Caller::admin(1).is_admin());
    }
}
