//! Authentication: login, refresh rotation, logout and password changes.

use appraisal_common::{AppError, AppResult};
use appraisal_db::{entities::user, repositories::UserRepository};
use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

use super::token::{TokenService, hash_refresh_token};
use super::user::{hash_password, verify_password};
use crate::policy::Actor;

/// Login credentials.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Password change request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordInput {
    #[validate(length(min = 1, max = 128))]
    pub current_password: String,

    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// Tokens handed to a client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Successful login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: user::Model,
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    tokens: TokenService,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, tokens: TokenService) -> Self {
        Self { user_repo, tokens }
    }

    /// The token service used to verify access tokens.
    #[must_use]
    pub const fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Exchange credentials for a token pair.
    ///
    /// Unknown users, wrong passwords and inactive users all get the same
    /// `Unauthorized`.
    pub async fn login(&self, input: LoginInput) -> AppResult<LoginResponse> {
        input.validate().map_err(|_| AppError::Unauthorized)?;

        let user = self
            .user_repo
            .find_by_email(&input.email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !user.is_active || !verify_password(&input.password, &user.password_hash)? {
            debug!(user_id = user.id, "Login rejected");
            return Err(AppError::Unauthorized);
        }

        let tokens = self.issue(&user).await?;
        info!(user_id = user.id, "User logged in");

        Ok(LoginResponse { tokens, user })
    }

    /// Rotate a refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let user = self
            .user_repo
            .find_by_refresh_token_hash(&hash_refresh_token(refresh_token))
            .await?
            .ok_or(AppError::Unauthorized)?;

        let expired = user
            .refresh_token_expires_at
            .is_none_or(|expires_at| expires_at <= Utc::now());
        if expired || !user.is_active {
            return Err(AppError::Unauthorized);
        }

        self.issue(&user).await
    }

    /// Revoke the caller's refresh token.
    pub async fn logout(&self, actor: &Actor) -> AppResult<()> {
        self.user_repo.set_refresh_token(actor.id, None).await
    }

    /// Change the caller's password. Revokes the refresh token.
    pub async fn change_password(&self, actor: &Actor, input: ChangePasswordInput) -> AppResult<()> {
        input.validate()?;

        let user = self.user_repo.get_by_id(actor.id).await?;
        if !verify_password(&input.current_password, &user.password_hash)? {
            return Err(AppError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(hash_password(&input.new_password)?);
        active.refresh_token_hash = Set(None);
        active.refresh_token_expires_at = Set(None);
        active.updated_at = Set(Utc::now().into());
        self.user_repo.update(active).await?;

        info!(user_id = actor.id, "Password changed");
        Ok(())
    }

    async fn issue(&self, user: &user::Model) -> AppResult<TokenPair> {
        let access_token = self.tokens.issue_access_token(user)?;
        let refresh = self.tokens.new_refresh_token();

        self.user_repo
            .set_refresh_token(user.id, Some((refresh.hash, refresh.expires_at.into())))
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token: refresh.token,
            token_type: "Bearer",
            expires_in: self.tokens.access_lifetime_secs(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use appraisal_common::config::AuthConfig;
    use appraisal_db::entities::user::UserRole;
    use appraisal_db::test_utils::fixtures;
    use chrono::Duration;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn service(db: Arc<DatabaseConnection>) -> AuthService {
        let tokens = TokenService::new(&AuthConfig {
            jwt_secret: "test-secret-test-secret".to_string(),
            issuer: "appraisal".to_string(),
            audience: "appraisal-api".to_string(),
            access_token_minutes: 15,
            refresh_token_days: 7,
        });
        AuthService::new(UserRepository::new(db), tokens)
    }

    fn user_with_password(password: &str) -> user::Model {
        let mut user = fixtures::user(7, UserRole::Employee, Some(3));
        user.password_hash = hash_password(password).unwrap();
        user
    }

    #[tokio::test]
    async fn test_login_issues_tokens() {
        let user = user_with_password("hunter2hunter2");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let svc = service(db);

        let response = svc
            .login(LoginInput {
                email: "user7@example.com".to_string(),
                password: "hunter2hunter2".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.tokens.expires_in, 900);
        let actor = svc.tokens().verify(&response.tokens.access_token).unwrap();
        assert_eq!(actor, Actor::new(7, UserRole::Employee));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let user = user_with_password("hunter2hunter2");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );

        let result = service(db)
            .login(LoginInput {
                email: "user7@example.com".to_string(),
                password: "nope".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_login_inactive_user() {
        let mut user = user_with_password("hunter2hunter2");
        user.is_active = false;
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );

        let result = service(db)
            .login(LoginInput {
                email: "user7@example.com".to_string(),
                password: "hunter2hunter2".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let result = service(db)
            .login(LoginInput {
                email: "ghost@example.com".to_string(),
                password: "whatever".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_refresh_rejects_expired_token() {
        let mut user = fixtures::user(7, UserRole::Employee, None);
        user.refresh_token_hash = Some(hash_refresh_token("stale"));
        user.refresh_token_expires_at = Some((Utc::now() - Duration::hours(1)).into());
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );

        let result = service(db).refresh("stale").await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_refresh_rotates() {
        let mut user = fixtures::user(7, UserRole::Employee, None);
        user.refresh_token_hash = Some(hash_refresh_token("current"));
        user.refresh_token_expires_at = Some((Utc::now() + Duration::days(1)).into());
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let pair = service(db).refresh("current").await.unwrap();

        assert_ne!(pair.refresh_token, "current");
        assert_eq!(pair.token_type, "Bearer");
    }

    #[tokio::test]
    async fn test_change_password_checks_current() {
        let user = user_with_password("hunter2hunter2");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );

        let result = service(db)
            .change_password(
                &Actor::new(7, UserRole::Employee),
                ChangePasswordInput {
                    current_password: "wrong".to_string(),
                    new_password: "a-new-password".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
