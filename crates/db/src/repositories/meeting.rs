//! Meeting repository.

use std::sync::Arc;

use appraisal_common::{AppError, AppResult, Page, PageRequest};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, prelude::DateTimeWithTimeZone,
};

use crate::entities::{Meeting, meeting, meeting::MeetingStatus};

/// Filters accepted by [`MeetingRepository::find_page`].
#[derive(Debug, Clone, Default)]
pub struct MeetingFilter {
    pub appraisal_id: Option<i32>,
    pub employee_id: Option<i32>,
    pub manager_id: Option<i32>,
    /// Matches meetings where this user is the employee or the manager.
    pub participant_id: Option<i32>,
    /// Any of these statuses; empty means any status.
    pub statuses: Vec<MeetingStatus>,
    pub scheduled_from: Option<DateTimeWithTimeZone>,
    pub scheduled_to: Option<DateTimeWithTimeZone>,
}

/// Repository for meeting operations.
#[derive(Clone)]
pub struct MeetingRepository {
    db: Arc<DatabaseConnection>,
}

impl MeetingRepository {
    /// Create a new meeting repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find meeting by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<meeting::Model>> {
        Meeting::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find meeting by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: i32) -> AppResult<meeting::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Meeting {id}")))
    }

    fn filtered(filter: &MeetingFilter) -> Select<Meeting> {
        let mut query = Meeting::find();

        if let Some(appraisal_id) = filter.appraisal_id {
            query = query.filter(meeting::Column::AppraisalId.eq(appraisal_id));
        }
        if let Some(employee_id) = filter.employee_id {
            query = query.filter(meeting::Column::EmployeeId.eq(employee_id));
        }
        if let Some(manager_id) = filter.manager_id {
            query = query.filter(meeting::Column::ManagerId.eq(manager_id));
        }
        if let Some(user_id) = filter.participant_id {
            query = query.filter(
                Condition::any()
                    .add(meeting::Column::EmployeeId.eq(user_id))
                    .add(meeting::Column::ManagerId.eq(user_id)),
            );
        }
        if !filter.statuses.is_empty() {
            query = query.filter(meeting::Column::Status.is_in(filter.statuses.iter().copied()));
        }
        if let Some(from) = filter.scheduled_from {
            query = query.filter(meeting::Column::ScheduledAt.gte(from));
        }
        if let Some(to) = filter.scheduled_to {
            query = query.filter(meeting::Column::ScheduledAt.lte(to));
        }

        query
    }

    /// Page through meetings matching a filter, soonest first.
    pub async fn find_page(
        &self,
        filter: &MeetingFilter,
        page: PageRequest,
    ) -> AppResult<Page<meeting::Model>> {
        let query = Self::filtered(filter);

        let total = query
            .clone()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let items = query
            .order_by_asc(meeting::Column::ScheduledAt)
            .order_by_asc(meeting::Column::Id)
            .offset(page.offset())
            .limit(page.limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Page::new(items, total, page))
    }

    /// Create a new meeting.
    pub async fn create(&self, model: meeting::ActiveModel) -> AppResult<meeting::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Apply `changes` only if the meeting is still in one of `from`.
    pub async fn update_if_status(
        &self,
        id: i32,
        from: &[MeetingStatus],
        changes: meeting::ActiveModel,
    ) -> AppResult<bool> {
        let result = Meeting::update_many()
            .set(changes)
            .filter(meeting::Column::Id.eq(id))
            .filter(meeting::Column::Status.is_in(from.iter().copied()))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Set};

    #[tokio::test]
    async fn test_find_page_upcoming() {
        let row = fixtures::meeting(1, 11, 7, 20, MeetingStatus::Scheduled);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(1))
                }]])
                .append_query_results([[row]])
                .into_connection(),
        );

        let repo = MeetingRepository::new(db);
        let filter = MeetingFilter {
            participant_id: Some(7),
            statuses: vec![MeetingStatus::Scheduled, MeetingStatus::Rescheduled],
            scheduled_from: Some(chrono::Utc::now().into()),
            ..Default::default()
        };
        let page = repo
            .find_page(&filter, PageRequest::clamped(None, Some(5), 10, 100))
            .await
            .unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.page_size, 5);
    }

    #[tokio::test]
    async fn test_update_if_status_lost_race() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = MeetingRepository::new(db);
        let changes = meeting::ActiveModel {
            status: Set(MeetingStatus::Cancelled),
            ..Default::default()
        };
        let updated = repo
            .update_if_status(1, &[MeetingStatus::Scheduled], changes)
            .await
            .unwrap();

        assert!(!updated);
    }
}
