use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// A registered user account.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub user_name: String,
    /// Unique, compared case-insensitively.
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_by: Option<Uuid>,
    pub created_date: Option<DateTime<Utc>>,
    pub role_updated_by: Option<Uuid>,
    pub role_updated_date: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(
        user_name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_name: user_name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            role: Role::default(),
            created_by: None,
            created_date: Some(Utc::now()),
            role_updated_by: None,
            role_updated_date: None,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

/// A user as returned to API clients. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    pub role: Role,
    pub created_date: Option<DateTime<Utc>>,
    pub role_updated_by: Option<Uuid>,
    pub role_updated_date: Option<DateTime<Utc>>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            user_name: user.user_name.clone(),
            email: user.email.clone(),
            role: user.role,
            created_date: user.created_date,
            role_updated_by: user.role_updated_by,
            role_updated_date: user.role_updated_date,
        }
    }
}
