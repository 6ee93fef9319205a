//! User repository.

use std::sync::Arc;

use crate::entities::{User, user, user::UserRole};
use appraisal_common::{AppError, AppResult, Page, PageRequest};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set,
};

/// Filters accepted by [`UserRepository::find_page`].
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Restrict to a single user (Employee visibility).
    pub id: Option<i32>,
    /// Restrict to the direct reports of this manager.
    pub manager_id: Option<i32>,
    /// Direct reports of this manager, plus the manager themselves.
    pub team_of: Option<i32>,
    pub department: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: i32) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {id}")))
    }

    /// Find a user by email (stored lowercased).
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Email.eq(email.to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by employee number.
    pub async fn find_by_employee_number(
        &self,
        employee_number: &str,
    ) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::EmployeeNumber.eq(employee_number))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the user holding a refresh token, by the token's digest.
    pub async fn find_by_refresh_token_hash(&self, hash: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::RefreshTokenHash.eq(hash))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    fn filtered(filter: &UserFilter) -> Select<User> {
        let mut query = User::find();

        if let Some(id) = filter.id {
            query = query.filter(user::Column::Id.eq(id));
        }
        if let Some(manager_id) = filter.manager_id {
            query = query.filter(user::Column::ManagerId.eq(manager_id));
        }
        if let Some(lead) = filter.team_of {
            query = query.filter(
                Condition::any()
                    .add(user::Column::Id.eq(lead))
                    .add(user::Column::ManagerId.eq(lead)),
            );
        }
        if let Some(department) = &filter.department {
            query = query.filter(user::Column::Department.eq(department.as_str()));
        }
        if let Some(role) = filter.role {
            query = query.filter(user::Column::Role.eq(role));
        }
        if let Some(is_active) = filter.is_active {
            query = query.filter(user::Column::IsActive.eq(is_active));
        }

        query
    }

    /// Page through users matching a filter, ordered by name.
    pub async fn find_page(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> AppResult<Page<user::Model>> {
        let query = Self::filtered(filter);

        let total = query
            .clone()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let items = query
            .order_by_asc(user::Column::LastName)
            .order_by_asc(user::Column::FirstName)
            .order_by_asc(user::Column::Id)
            .offset(page.offset())
            .limit(page.limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Page::new(items, total, page))
    }

    /// Find the direct reports of a manager.
    pub async fn find_direct_reports(&self, manager_id: i32) -> AppResult<Vec<user::Model>> {
        User::find()
            .filter(user::Column::ManagerId.eq(manager_id))
            .order_by_asc(user::Column::LastName)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count the active direct reports of a manager.
    pub async fn count_direct_reports(&self, manager_id: i32) -> AppResult<u64> {
        User::find()
            .filter(user::Column::ManagerId.eq(manager_id))
            .filter(user::Column::IsActive.eq(true))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Every `(id, manager_id)` pair, for walking manager chains in memory.
    pub async fn find_manager_links(&self) -> AppResult<Vec<(i32, Option<i32>)>> {
        User::find()
            .select_only()
            .column(user::Column::Id)
            .column(user::Column::ManagerId)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// IDs of the active users holding any of the given roles.
    pub async fn find_active_ids_by_roles(&self, roles: &[UserRole]) -> AppResult<Vec<i32>> {
        User::find()
            .filter(user::Column::Role.is_in(roles.iter().copied()))
            .filter(user::Column::IsActive.eq(true))
            .select_only()
            .column(user::Column::Id)
            .into_tuple::<i32>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store (or clear, with `None`) the refresh token digest and its expiry.
    pub async fn set_refresh_token(
        &self,
        id: i32,
        token: Option<(String, sea_orm::prelude::DateTimeWithTimeZone)>,
    ) -> AppResult<()> {
        let (hash, expires_at) = token.map_or((None, None), |(h, e)| (Some(h), Some(e)));

        let active = user::ActiveModel {
            refresh_token_hash: Set(hash),
            refresh_token_expires_at: Set(expires_at),
            updated_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        User::update_many()
            .set(active)
            .filter(user::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_find_by_id_found() {
        let user = fixtures::user(7, UserRole::Employee, Some(3));

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.find_by_id(7).await.unwrap();

        assert_eq!(result.unwrap().manager_id, Some(3));
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.get_by_id(42).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_page_reports_total() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(12))
                }]])
                .append_query_results([[
                    fixtures::user(1, UserRole::Employee, Some(5)),
                    fixtures::user(2, UserRole::Employee, Some(5)),
                ]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let filter = UserFilter {
            manager_id: Some(5),
            ..Default::default()
        };
        let page = repo
            .find_page(&filter, PageRequest::clamped(Some(1), Some(2), 10, 100))
            .await
            .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_count, 12);
        assert_eq!(page.total_pages, 6);
    }

    #[tokio::test]
    async fn test_set_refresh_token_clears() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        assert!(repo.set_refresh_token(7, None).await.is_ok());
    }
}
