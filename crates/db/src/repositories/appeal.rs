//! Appeal repository.

use std::sync::Arc;

use appraisal_common::{AppError, AppResult, Page, PageRequest};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, prelude::DateTimeWithTimeZone,
    sea_query::{Query, SelectStatement},
};

use crate::entities::{
    Appeal, Appraisal, appeal,
    appeal::{AppealPriority, AppealStatus},
    appraisal,
};

/// Filters accepted by [`AppealRepository::find_page`].
#[derive(Debug, Clone, Default)]
pub struct AppealFilter {
    pub appraisal_id: Option<i32>,
    pub employee_id: Option<i32>,
    /// Appeals against appraisals this user manages.
    pub manager_id: Option<i32>,
    /// Appeals filed by this user or against appraisals they manage.
    pub participant_id: Option<i32>,
    /// Any of these statuses; empty means any status.
    pub statuses: Vec<AppealStatus>,
    pub priority: Option<AppealPriority>,
    pub created_from: Option<DateTimeWithTimeZone>,
    pub created_to: Option<DateTimeWithTimeZone>,
}

/// Repository for appeal operations.
#[derive(Clone)]
pub struct AppealRepository {
    db: Arc<DatabaseConnection>,
}

fn managed_by(manager_id: i32) -> SelectStatement {
    Query::select()
        .column(appraisal::Column::Id)
        .from(Appraisal)
        .and_where(appraisal::Column::ManagerId.eq(manager_id))
        .to_owned()
}

impl AppealRepository {
    /// Create a new appeal repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find appeal by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<appeal::Model>> {
        Appeal::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find appeal by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: i32) -> AppResult<appeal::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Appeal {id}")))
    }

    fn filtered(filter: &AppealFilter) -> Select<Appeal> {
        let mut query = Appeal::find();

        if let Some(appraisal_id) = filter.appraisal_id {
            query = query.filter(appeal::Column::AppraisalId.eq(appraisal_id));
        }
        if let Some(employee_id) = filter.employee_id {
            query = query.filter(appeal::Column::EmployeeId.eq(employee_id));
        }
        if let Some(manager_id) = filter.manager_id {
            query = query.filter(appeal::Column::AppraisalId.in_subquery(managed_by(manager_id)));
        }
        if let Some(user_id) = filter.participant_id {
            query = query.filter(
                Condition::any()
                    .add(appeal::Column::EmployeeId.eq(user_id))
                    .add(appeal::Column::AppraisalId.in_subquery(managed_by(user_id))),
            );
        }
        if !filter.statuses.is_empty() {
            query = query.filter(appeal::Column::Status.is_in(filter.statuses.iter().copied()));
        }
        if let Some(priority) = filter.priority {
            query = query.filter(appeal::Column::Priority.eq(priority));
        }
        if let Some(from) = filter.created_from {
            query = query.filter(appeal::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.created_to {
            query = query.filter(appeal::Column::CreatedAt.lte(to));
        }

        query
    }

    /// Page through appeals matching a filter, newest first.
    pub async fn find_page(
        &self,
        filter: &AppealFilter,
        page: PageRequest,
    ) -> AppResult<Page<appeal::Model>> {
        let query = Self::filtered(filter);

        let total = query
            .clone()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let items = query
            .order_by_desc(appeal::Column::CreatedAt)
            .order_by_desc(appeal::Column::Id)
            .offset(page.offset())
            .limit(page.limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Page::new(items, total, page))
    }

    /// Count appeals matching a filter.
    pub async fn count(&self, filter: &AppealFilter) -> AppResult<u64> {
        Self::filtered(filter)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count the other appeals of an appraisal that still keep it `Appealed`.
    pub async fn count_other_open<C: ConnectionTrait>(
        &self,
        conn: &C,
        appraisal_id: i32,
        except_id: i32,
    ) -> AppResult<u64> {
        Appeal::find()
            .filter(appeal::Column::AppraisalId.eq(appraisal_id))
            .filter(appeal::Column::Id.ne(except_id))
            .filter(appeal::Column::Status.is_in(AppealStatus::OPEN))
            .count(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new appeal.
    pub async fn create(&self, model: appeal::ActiveModel) -> AppResult<appeal::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Apply `changes` only if the appeal is still in one of `from`.
    pub async fn update_if_status<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: i32,
        from: &[AppealStatus],
        changes: appeal::ActiveModel,
    ) -> AppResult<bool> {
        let result = Appeal::update_many()
            .set(changes)
            .filter(appeal::Column::Id.eq(id))
            .filter(appeal::Column::Status.is_in(from.iter().copied()))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }
}
