//! Notification outbox repository.

use std::sync::Arc;

use appraisal_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, sea_query::Expr,
};

use crate::entities::{NotificationOutbox, notification_outbox};

/// Repository for pending notification intents.
#[derive(Clone)]
pub struct OutboxRepository {
    db: Arc<DatabaseConnection>,
}

impl OutboxRepository {
    /// Create a new outbox repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append intents on the caller's connection, usually the transaction
    /// that carries the status change.
    pub async fn enqueue<C: ConnectionTrait>(
        &self,
        conn: &C,
        rows: Vec<notification_outbox::ActiveModel>,
    ) -> AppResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        NotificationOutbox::insert_many(rows)
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Oldest undispatched intents.
    pub async fn find_pending(&self, limit: u64) -> AppResult<Vec<notification_outbox::Model>> {
        NotificationOutbox::find()
            .filter(notification_outbox::Column::DispatchedAt.is_null())
            .order_by_asc(notification_outbox::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark an intent as delivered.
    pub async fn mark_dispatched<C: ConnectionTrait>(&self, conn: &C, id: i32) -> AppResult<bool> {
        let result = NotificationOutbox::update_many()
            .set(notification_outbox::ActiveModel {
                dispatched_at: Set(Some(Utc::now().into())),
                ..Default::default()
            })
            .filter(notification_outbox::Column::Id.eq(id))
            .filter(notification_outbox::Column::DispatchedAt.is_null())
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }

    /// Count a failed delivery; the row stays pending.
    pub async fn record_failure(&self, id: i32) -> AppResult<()> {
        NotificationOutbox::update_many()
            .col_expr(
                notification_outbox::Column::Attempts,
                Expr::col(notification_outbox::Column::Attempts).add(1),
            )
            .filter(notification_outbox::Column::Id.eq(id))
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
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_enqueue_nothing_skips_database() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = OutboxRepository::new(db.clone());
        assert!(repo.enqueue(db.as_ref(), Vec::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_mark_dispatched_once() {
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

        let repo = OutboxRepository::new(db.clone());
        assert!(repo.mark_dispatched(db.as_ref(), 3).await.unwrap());
        assert!(!repo.mark_dispatched(db.as_ref(), 3).await.unwrap());
    }
}
