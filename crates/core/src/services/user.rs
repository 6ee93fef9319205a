//! User service.

use std::collections::HashMap;

use appraisal_common::{AppError, AppResult, Page, PageRequest};
use appraisal_db::{
    entities::{user, user::UserRole},
    repositories::{UserFilter, UserRepository},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{NaiveDate, Utc};
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::policy::{self, Actor};

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
}

/// Input for creating a user.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    #[validate(length(min = 1, max = 32))]
    pub employee_number: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[validate(length(min = 1, max = 100))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100))]
    pub last_name: String,

    pub role: UserRole,

    #[validate(length(max = 100))]
    pub department: Option<String>,

    #[validate(length(max = 100))]
    pub job_title: Option<String>,

    pub manager_id: Option<i32>,

    pub hire_date: NaiveDate,
}

/// Profile fields a user may change about themselves.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,

    #[validate(length(max = 100))]
    pub department: Option<String>,

    #[validate(length(max = 100))]
    pub job_title: Option<String>,
}

/// Fields only HR/Admin change.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAdministrationInput {
    pub role: Option<UserRole>,
    pub manager_id: Option<i32>,
    /// Remove the manager. Ignored when `manager_id` is set.
    #[serde(default)]
    pub clear_manager: bool,
    pub is_active: Option<bool>,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self { user_repo }
    }

    /// Get a user visible to the caller.
    pub async fn get(&self, actor: &Actor, id: i32) -> AppResult<user::Model> {
        self.user_repo
            .find_by_id(id)
            .await?
            .filter(|u| policy::can_view_user(actor, u))
            .ok_or_else(|| AppError::NotFound(format!("User {id}")))
    }

    /// The caller's own record.
    pub async fn me(&self, actor: &Actor) -> AppResult<user::Model> {
        self.user_repo.get_by_id(actor.id).await
    }

    /// Page through users, restricted to the caller's scope.
    pub async fn list(
        &self,
        actor: &Actor,
        filter: UserFilter,
        page: PageRequest,
    ) -> AppResult<Page<user::Model>> {
        match policy::scope_users(actor, filter) {
            Some(filter) => self.user_repo.find_page(&filter, page).await,
            None => Ok(Page::empty(page)),
        }
    }

    /// Direct reports of a visible user.
    pub async fn direct_reports(&self, actor: &Actor, id: i32) -> AppResult<Vec<user::Model>> {
        let user = self.get(actor, id).await?;
        self.user_repo.find_direct_reports(user.id).await
    }

    /// Create a user (HR/Admin).
    pub async fn create(&self, actor: &Actor, input: CreateUserInput) -> AppResult<user::Model> {
        actor.require_elevated()?;
        input.validate()?;

        let email = input.email.to_lowercase();
        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already in use".to_string()));
        }
        if self
            .user_repo
            .find_by_employee_number(&input.employee_number)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "Employee number already in use".to_string(),
            ));
        }
        if let Some(manager_id) = input.manager_id {
            self.require_active_manager(manager_id).await?;
        }

        let password_hash = hash_password(&input.password)?;
        let now = Utc::now();

        let model = user::ActiveModel {
            employee_number: Set(input.employee_number),
            email: Set(email),
            password_hash: Set(password_hash),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            role: Set(input.role),
            department: Set(input.department),
            job_title: Set(input.job_title),
            manager_id: Set(input.manager_id),
            is_active: Set(true),
            hire_date: Set(input.hire_date),
            refresh_token_hash: Set(None),
            refresh_token_expires_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let user = self.user_repo.create(model).await?;
        info!(user_id = user.id, role = user.role.as_str(), "User created");
        Ok(user)
    }

    /// Update profile fields (self or HR/Admin).
    pub async fn update_profile(
        &self,
        actor: &Actor,
        id: i32,
        input: UpdateProfileInput,
    ) -> AppResult<user::Model> {
        input.validate()?;

        let user = self.get(actor, id).await?;
        if actor.id != user.id && !actor.is_elevated() {
            return Err(AppError::Forbidden(
                "Only the user or HR may edit a profile".to_string(),
            ));
        }

        let mut active: user::ActiveModel = user.into();
        if let Some(first_name) = input.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = input.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(department) = input.department {
            active.department = Set(Some(department));
        }
        if let Some(job_title) = input.job_title {
            active.job_title = Set(Some(job_title));
        }
        active.updated_at = Set(Utc::now().into());

        self.user_repo.update(active).await
    }

    /// Change role, manager or active flag (HR/Admin).
    pub async fn update_administration(
        &self,
        actor: &Actor,
        id: i32,
        input: UpdateAdministrationInput,
    ) -> AppResult<user::Model> {
        actor.require_elevated()?;
        let user = self.user_repo.get_by_id(id).await?;

        let manager_change = match (input.manager_id, input.clear_manager) {
            (Some(manager_id), _) => Some(Some(manager_id)),
            (None, true) => Some(None),
            (None, false) => None,
        };

        if let Some(Some(manager_id)) = manager_change {
            if manager_id == user.id {
                return Err(AppError::Validation(
                    "A user cannot be their own manager".to_string(),
                ));
            }
            self.require_active_manager(manager_id).await?;

            let links: HashMap<i32, Option<i32>> =
                self.user_repo.find_manager_links().await?.into_iter().collect();
            if creates_manager_cycle(&links, user.id, manager_id) {
                return Err(AppError::Validation(
                    "Manager assignment would create a reporting cycle".to_string(),
                ));
            }
        }

        let mut active: user::ActiveModel = user.into();
        if let Some(role) = input.role {
            active.role = Set(role);
        }
        if let Some(manager_id) = manager_change {
            active.manager_id = Set(manager_id);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = self.user_repo.update(active).await?;
        info!(user_id = updated.id, by = actor.id, "User administration updated");
        Ok(updated)
    }

    async fn require_active_manager(&self, manager_id: i32) -> AppResult<user::Model> {
        match self.user_repo.find_by_id(manager_id).await? {
            Some(manager) if manager.is_active => Ok(manager),
            _ => Err(AppError::Validation(format!(
                "Manager {manager_id} is not an active user"
            ))),
        }
    }
}

/// Whether making `manager_id` the manager of `user_id` closes a loop.
///
/// Walks up from the proposed manager. The walk is bounded by the number of
/// users, so a pre-existing loop is reported instead of spinning.
#[must_use]
pub fn creates_manager_cycle(
    links: &HashMap<i32, Option<i32>>,
    user_id: i32,
    manager_id: i32,
) -> bool {
    let mut current = Some(manager_id);
    let mut steps = 0;

    while let Some(id) = current {
        if id == user_id || steps > links.len() {
            return true;
        }
        steps += 1;
        current = links.get(&id).copied().flatten();
    }

    false
}

/// Hash a password.
pub(crate) fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
pub(crate) fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
