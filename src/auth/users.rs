//! User accounts: sign-up, sign-in and role management.

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::password::UNKNOWN_USER_HASH;
use super::{hash_password, verify_password, AuthError, RequestContext, TokenIssuer};
use crate::db::UserRepository;
use crate::models::{Role, User};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub user_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct UserService {
    repo: UserRepository,
    tokens: Arc<TokenIssuer>,
}

impl UserService {
    pub fn new(repo: UserRepository, tokens: Arc<TokenIssuer>) -> Self {
        Self { repo, tokens }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Registers a new account with the default `read` role.
    pub async fn signup(&self, request: SignupRequest) -> Result<User, AuthError> {
        self.create_user(request, Role::default(), None).await
    }

    /// Creates an account with an explicit role, recording who created it.
    pub async fn create_user(
        &self,
        request: SignupRequest,
        role: Role,
        created_by: Option<Uuid>,
    ) -> Result<User, AuthError> {
        let email = request.email.trim().to_string();
        let user_name = request.user_name.trim().to_string();

        if user_name.is_empty() {
            return Err(AuthError::InvalidArgument("user_name is required".into()));
        }
        if !email.contains('@') {
            return Err(AuthError::InvalidArgument(format!(
                "'{}' is not a valid email address",
                email
            )));
        }
        if request.password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::InvalidArgument(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.repo.get_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken(email));
        }

        let password_hash = hash_password(&request.password)?;
        let mut user = User::new(user_name, &email, password_hash).with_role(role);
        user.created_by = created_by;

        // A concurrent sign-up can still win the race to the unique index
        match self.repo.create(&user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, role = %user.role, "Created user");
                Ok(user)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AuthError::EmailTaken(email))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Checks credentials and returns the user with a freshly issued token.
    pub async fn signin(&self, request: SigninRequest) -> Result<(User, String), AuthError> {
        let user = self.repo.get_by_email(request.email.trim()).await?;

        let hash = user
            .as_ref()
            .map_or(UNKNOWN_USER_HASH, |user| user.password_hash.as_str());
        let verified = verify_password(&request.password, hash);

        let user = match user {
            Some(user) if verified => user,
            _ => {
                tracing::warn!(email = %request.email, "Rejected sign-in");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let token = self.tokens.issue(&user)?;
        Ok((user, token))
    }

    pub async fn get(&self, id: Uuid) -> Result<User, AuthError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound(id))
    }

    /// All users. Admin only.
    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<User>, AuthError> {
        ctx.require(Role::Admin)?;
        Ok(self.repo.list().await?)
    }

    /// Changes a user's role. Admin only.
    pub async fn set_role(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        role: Role,
    ) -> Result<User, AuthError> {
        ctx.require(Role::Admin)?;

        let changed = self.repo.update_role(id, role, ctx.user_id, Utc::now()).await?;
        if changed == 0 {
            return Err(AuthError::UserNotFound(id));
        }

        tracing::info!(
            trace_id = %ctx.trace_id,
            user_id = %ctx.user_id,
            target = %id,
            %role,
            "Changed user role"
        );
        self.get(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use tempfile::TempDir;

    struct TestContext {
        service: UserService,
        _temp_dir: TempDir, // Keep alive for duration of test
    }

    async fn setup() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        let tokens = Arc::new(TokenIssuer::new(
            b"0123456789abcdef0123456789abcdef",
            "treeform",
            "treeform-clients",
            60,
        ));
        TestContext {
            service: UserService::new(UserRepository::new(pool), tokens),
            _temp_dir: temp_dir,
        }
    }

    fn signup(email: &str) -> SignupRequest {
        SignupRequest {
            user_name: "Alice".into(),
            email: email.into(),
            password: "correct-horse".into(),
        }
    }

    fn admin(id: Uuid) -> RequestContext {
        RequestContext {
            user_id: id,
            email: "admin@example.com".into(),
            role: Role::Admin,
            trace_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_signup_defaults_to_read() {
        let ctx = setup().await;

        let user = ctx.service.signup(signup("alice@example.com")).await.unwrap();

        assert_eq!(user.role, Role::Read);
        assert_ne!(user.password_hash, "correct-horse");
        assert!(verify_password("correct-horse", &user.password_hash));
    }

    #[tokio::test]
    async fn test_signup_duplicate_email() {
        let ctx = setup().await;
        ctx.service.signup(signup("alice@example.com")).await.unwrap();

        let result = ctx.service.signup(signup("ALICE@example.com")).await;

        assert!(matches!(result, Err(AuthError::EmailTaken(_))));
    }

    #[tokio::test]
    async fn test_signup_validates_input() {
        let ctx = setup().await;

        let mut bad_email = signup("not-an-email");
        assert!(matches!(
            ctx.service.signup(bad_email.clone()).await,
            Err(AuthError::InvalidArgument(_))
        ));

        bad_email.email = "alice@example.com".into();
        bad_email.password = "short".into();
        assert!(matches!(
            ctx.service.signup(bad_email).await,
            Err(AuthError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_signin_issues_valid_token() {
        let ctx = setup().await;
        let created = ctx.service.signup(signup("alice@example.com")).await.unwrap();

        let (user, token) = ctx
            .service
            .signin(SigninRequest {
                email: "alice@example.com".into(),
                password: "correct-horse".into(),
            })
            .await
            .unwrap();

        assert_eq!(user.id, created.id);
        let claims = ctx.service.tokens().validate(&token).unwrap();
        assert_eq!(claims.sub, created.id);
        assert_eq!(claims.role, Role::Read);
    }

    #[tokio::test]
    async fn test_signin_rejects_bad_credentials() {
        let ctx = setup().await;
        ctx.service.signup(signup("alice@example.com")).await.unwrap();

        let wrong_password = ctx
            .service
            .signin(SigninRequest {
                email: "alice@example.com".into(),
                password: "wrong-password".into(),
            })
            .await;
        let unknown_user = ctx
            .service
            .signin(SigninRequest {
                email: "bob@example.com".into(),
                password: "correct-horse".into(),
            })
            .await;

        let unknown_with_placeholder_password = ctx
            .service
            .signin(SigninRequest {
                email: "carol@example.com".into(),
                password: "treeform-unknown-user".into(),
            })
            .await;

        assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown_user, Err(AuthError::InvalidCredentials)));
        assert!(matches!(
            unknown_with_placeholder_password,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_set_role_requires_admin() {
        let ctx = setup().await;
        let user = ctx.service.signup(signup("alice@example.com")).await.unwrap();
        let writer = RequestContext {
            role: Role::Write,
            ..admin(Uuid::new_v4())
        };

        let result = ctx.service.set_role(&writer, user.id, Role::Admin).await;

        assert!(matches!(result, Err(AuthError::Forbidden { .. })));
        assert!(ctx.service.list(&writer).await.is_err());
    }

    #[tokio::test]
    async fn test_set_role_stamps_who_and_when() {
        let ctx = setup().await;
        let admin_id = Uuid::new_v4();
        let user = ctx.service.signup(signup("alice@example.com")).await.unwrap();

        let updated = ctx
            .service
            .set_role(&admin(admin_id), user.id, Role::Write)
            .await
            .unwrap();

        assert_eq!(updated.role, Role::Write);
        assert_eq!(updated.role_updated_by, Some(admin_id));
        assert!(updated.role_updated_date.is_some());

        let missing = ctx
            .service
            .set_role(&admin(admin_id), Uuid::new_v4(), Role::Write)
            .await;
        assert!(matches!(missing, Err(AuthError::UserNotFound(_))));
    }
}
