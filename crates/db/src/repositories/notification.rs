//! Notification repository.

use std::sync::Arc;

use appraisal_common::{AppError, AppResult, Page, PageRequest};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{Notification, notification, notification::NotificationType};

/// Repository for notification operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a notification owned by `user_id`.
    ///
    /// Other users' notifications are reported as missing.
    pub async fn find_for_user(
        &self,
        id: i32,
        user_id: i32,
    ) -> AppResult<Option<notification::Model>> {
        Notification::find_by_id(id)
            .filter(notification::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Page through a user's notifications, newest first.
    pub async fn find_page(
        &self,
        user_id: i32,
        unread_only: bool,
        kind: Option<NotificationType>,
        page: PageRequest,
    ) -> AppResult<Page<notification::Model>> {
        let mut query = Notification::find().filter(notification::Column::UserId.eq(user_id));

        if unread_only {
            query = query.filter(notification::Column::IsRead.eq(false));
        }
        if let Some(kind) = kind {
            query = query.filter(notification::Column::NotificationType.eq(kind));
        }

        let total = query
            .clone()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let items = query
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id)
            .offset(page.offset())
            .limit(page.limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Page::new(items, total, page))
    }

    /// Count unread notifications for a user.
    pub async fn count_unread(&self, user_id: i32) -> AppResult<u64> {
        Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a notification.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: notification::ActiveModel,
    ) -> AppResult<()> {
        Notification::insert(model)
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Mark one notification as read. Already-read rows are left untouched.
    pub async fn mark_as_read(&self, id: i32, user_id: i32) -> AppResult<u64> {
        let result = Notification::update_many()
            .set(Self::read_now())
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Mark all of a user's unread notifications as read.
    pub async fn mark_all_as_read(&self, user_id: i32) -> AppResult<u64> {
        let result = Notification::update_many()
            .set(Self::read_now())
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    fn read_now() -> notification::ActiveModel {
        notification::ActiveModel {
            is_read: Set(true),
            read_at: Set(Some(Utc::now().into())),
            ..Default::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_find_for_user_hides_others() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<notification::Model>::new()])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let found = repo.find_for_user(1, 99).await.unwrap();

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_mark_as_read_twice_changes_nothing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 0,
                    },
                ])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        assert_eq!(repo.mark_as_read(1, 7).await.unwrap(), 1);
        assert_eq!(repo.mark_as_read(1, 7).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_page_unread() {
        let row = fixtures::notification(1, 7, false);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(1))
                }]])
                .append_query_results([[row]])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let page = repo
            .find_page(7, true, None, PageRequest::clamped(None, None, 10, 100))
            .await
            .unwrap();

        assert_eq!(page.total_count, 1);
        assert!(!page.items[0].is_read);
    }
}
