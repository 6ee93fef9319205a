//! Drains the notification outbox into user notifications.
//!
//! Delivery is at-least-once. Each outbox row is delivered in its own
//! transaction: the notification insert and the dispatched mark commit
//! together, and a row another dispatcher already claimed is rolled back.

use std::sync::Arc;

use appraisal_common::AppResult;
use appraisal_db::{
    entities::notification_outbox,
    repositories::{NotificationRepository, OutboxRepository},
};
use sea_orm::DatabaseConnection;
use tracing::{debug, info, warn};

use super::notification::NotificationIntent;

/// Rows fetched per round.
const DEFAULT_BATCH_SIZE: u64 = 100;

/// Counters of one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: u64,
    /// Claimed by a concurrent drain.
    pub skipped: u64,
    pub failed: u64,
}

/// Outbox dispatcher.
#[derive(Clone)]
pub struct NotificationDispatcher {
    db: Arc<DatabaseConnection>,
    outbox_repo: OutboxRepository,
    notification_repo: NotificationRepository,
    batch_size: u64,
}

impl NotificationDispatcher {
    /// Create a new dispatcher.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        outbox_repo: OutboxRepository,
        notification_repo: NotificationRepository,
    ) -> Self {
        Self {
            db,
            outbox_repo,
            notification_repo,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Override the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Deliver every pending row. Failed rows stay pending for the next drain.
    pub async fn dispatch_pending(&self) -> AppResult<DispatchReport> {
        let mut report = DispatchReport::default();

        loop {
            let batch = self.outbox_repo.find_pending(self.batch_size).await?;
            let fetched = batch.len() as u64;
            let progress_before = report.delivered + report.skipped;

            for row in batch {
                let id = row.id;
                match self.deliver(row).await {
                    Ok(true) => report.delivered += 1,
                    Ok(false) => report.skipped += 1,
                    Err(e) => {
                        report.failed += 1;
                        warn!(error = %e, outbox_id = id, "Failed to deliver notification");
                        if let Err(e) = self.outbox_repo.record_failure(id).await {
                            warn!(error = %e, outbox_id = id, "Failed to record delivery failure");
                        }
                    }
                }
            }

            // Stop on a short batch, or when a full batch made no progress.
            if fetched < self.batch_size || report.delivered + report.skipped == progress_before {
                break;
            }
        }

        if report.delivered > 0 || report.failed > 0 {
            info!(
                delivered = report.delivered,
                skipped = report.skipped,
                failed = report.failed,
                "Notification outbox drained"
            );
        }

        Ok(report)
    }

    /// Drain in the background, logging instead of returning errors.
    pub fn spawn(&self) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            if let Err(e) = dispatcher.dispatch_pending().await {
                warn!(error = %e, "Notification dispatch failed");
            }
        });
    }

    async fn deliver(&self, row: notification_outbox::Model) -> AppResult<bool> {
        let id = row.id;
        let intent = NotificationIntent {
            user_id: row.user_id,
            kind: row.notification_type,
            title: row.title,
            message: row.message,
            link: row.link,
        };

        let txn = super::begin(&self.db).await?;

        self.notification_repo
            .create(&txn, intent.into_notification())
            .await?;

        if !self.outbox_repo.mark_dispatched(&txn, id).await? {
            debug!(outbox_id = id, "Outbox row already dispatched");
            return Ok(false);
        }

        super::commit(txn).await?;

        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use appraisal_db::entities::notification::NotificationType;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn pending(id: i32) -> notification_outbox::Model {
        notification_outbox::Model {
            id,
            user_id: 10,
            notification_type: NotificationType::AppraisalStatusChanged,
            title: "Appraisal under review".to_string(),
            message: "Both assessments were submitted".to_string(),
            link: Some("/appraisals/1".to_string()),
            attempts: 0,
            created_at: Utc::now().into(),
            dispatched_at: None,
        }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn dispatcher(
        txn_db: Arc<DatabaseConnection>,
        outbox_db: Arc<DatabaseConnection>,
    ) -> NotificationDispatcher {
        NotificationDispatcher::new(
            txn_db.clone(),
            OutboxRepository::new(outbox_db),
            NotificationRepository::new(txn_db),
        )
    }

    #[tokio::test]
    async fn test_delivers_pending_rows() {
        let outbox_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![pending(1), pending(2)]])
                .into_connection(),
        );
        // insert + mark, twice
        let txn_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(1), exec(1), exec(1)])
                .into_connection(),
        );

        let report = dispatcher(txn_db, outbox_db).dispatch_pending().await.unwrap();

        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn test_claimed_row_is_skipped() {
        let outbox_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![pending(1)]])
                .into_connection(),
        );
        let txn_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(0)])
                .into_connection(),
        );

        let report = dispatcher(txn_db, outbox_db).dispatch_pending().await.unwrap();

        assert_eq!(report.delivered, 0);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn test_failed_row_stays_pending() {
        let outbox_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![pending(1)]])
                // attempts += 1
                .append_exec_results([exec(1)])
                .into_connection(),
        );
        // No exec results: the notification insert fails.
        let txn_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let report = dispatcher(txn_db, outbox_db).dispatch_pending().await.unwrap();

        assert_eq!(report.delivered, 0);
        assert_eq!(report.failed, 1);
    }
}
