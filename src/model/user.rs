use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

pub type UserId = u64;

/// A stored portal account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub department: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The identity the policy engine evaluates for this account.
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            role: self.role,
            active: self.is_active,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Account data handed to the user store on registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub department: String,
}

/// The authenticated identity of a session. Immutable once established.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Actor {
    #[schema(example = 2)]
    pub id: UserId,
    pub role: Role,
    #[schema(example = true)]
    pub active: bool,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self {
            id,
            role,
            active: true,
        }
    }

    pub fn is_manager(&self) -> bool {
        self.role.is_manager()
    }

    pub fn owns(&self, owner_id: UserId) -> bool {
        self.id == owner_id
    }
}

/// Public view of a user, never carries the password hash.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserProfile {
    #[schema(example = 2)]
    pub id: UserId,
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "john.doe@company.com")]
    pub email: String,
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    #[schema(example = "John Doe")]
    pub full_name: String,
    pub role: Role,
    #[schema(example = "Engineering")]
    pub department: String,
    pub is_active: bool,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            role: user.role,
            department: user.department.clone(),
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}
