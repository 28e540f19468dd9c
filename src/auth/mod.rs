//! Authentication and authorization.
//!
//! Passwords are stored as PBKDF2 hashes, sessions are HS256 JWTs, and every
//! authenticated request carries a [`RequestContext`] that services receive
//! explicitly.

mod password;
mod tokens;
mod users;

pub use password::{hash_password, verify_password};
pub use tokens::{Claims, TokenIssuer};
pub use users::{SigninRequest, SignupRequest, UserService};

use uuid::Uuid;

use crate::models::Role;

/// Identity of the caller and the trace id of the request being served.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub trace_id: Uuid,
}

impl RequestContext {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email.clone(),
            role: claims.role,
            trace_id: Uuid::new_v4(),
        }
    }

    /// Context for work not triggered by a signed-in user, such as the admin CLI.
    pub fn system() -> Self {
        Self {
            user_id: Uuid::nil(),
            email: String::new(),
            role: Role::Admin,
            trace_id: Uuid::new_v4(),
        }
    }

    /// Fails with [`AuthError::Forbidden`] unless the caller holds `required`.
    pub fn require(&self, required: Role) -> Result<(), AuthError> {
        if self.role.allows(required) {
            Ok(())
        } else {
            Err(AuthError::Forbidden { required })
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No token provided")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("requires the {required} role")]
    Forbidden { required: Role },

    #[error("a user with email '{0}' already exists")]
    EmailTaken(String),

    #[error("user {0} not found")]
    UserNotFound(Uuid),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("failed to hash password")]
    Hashing,

    #[error("failed to encode token: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
