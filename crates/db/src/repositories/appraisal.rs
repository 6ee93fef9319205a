//! Appraisal repository.

use std::sync::Arc;

use appraisal_common::{AppError, AppResult, Page, PageRequest};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
};

use crate::entities::{Appraisal, appraisal, appraisal::AppraisalStatus};

/// Filters accepted by [`AppraisalRepository::find_page`].
#[derive(Debug, Clone, Default)]
pub struct AppraisalFilter {
    pub employee_id: Option<i32>,
    pub manager_id: Option<i32>,
    /// Matches appraisals where this user is the employee or the manager.
    pub participant_id: Option<i32>,
    /// Any of these statuses; empty means any status.
    pub statuses: Vec<AppraisalStatus>,
    /// Review period ends on or after this date.
    pub period_from: Option<NaiveDate>,
    /// Review period starts on or before this date.
    pub period_to: Option<NaiveDate>,
}

/// Repository for appraisal operations.
#[derive(Clone)]
pub struct AppraisalRepository {
    db: Arc<DatabaseConnection>,
}

impl AppraisalRepository {
    /// Create a new appraisal repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find appraisal by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<appraisal::Model>> {
        Appraisal::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find appraisal by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: i32) -> AppResult<appraisal::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Appraisal {id}")))
    }

    fn filtered(filter: &AppraisalFilter) -> Select<Appraisal> {
        let mut query = Appraisal::find();

        if let Some(employee_id) = filter.employee_id {
            query = query.filter(appraisal::Column::EmployeeId.eq(employee_id));
        }
        if let Some(manager_id) = filter.manager_id {
            query = query.filter(appraisal::Column::ManagerId.eq(manager_id));
        }
        if let Some(user_id) = filter.participant_id {
            query = query.filter(
                Condition::any()
                    .add(appraisal::Column::EmployeeId.eq(user_id))
                    .add(appraisal::Column::ManagerId.eq(user_id)),
            );
        }
        if !filter.statuses.is_empty() {
            query = query.filter(appraisal::Column::Status.is_in(filter.statuses.iter().copied()));
        }
        if let Some(from) = filter.period_from {
            query = query.filter(appraisal::Column::ReviewPeriodEnd.gte(from));
        }
        if let Some(to) = filter.period_to {
            query = query.filter(appraisal::Column::ReviewPeriodStart.lte(to));
        }

        query
    }

    /// Load an appraisal with a row lock held until `conn`'s transaction ends.
    ///
    /// Serializes the submissions that race to advance the same appraisal.
    pub async fn lock<C: ConnectionTrait>(&self, conn: &C, id: i32) -> AppResult<appraisal::Model> {
        Appraisal::find_by_id(id)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(format!("Appraisal {id}")))
    }

    /// Page through appraisals matching a filter, newest first.
    pub async fn find_page(
        &self,
        filter: &AppraisalFilter,
        page: PageRequest,
    ) -> AppResult<Page<appraisal::Model>> {
        let query = Self::filtered(filter);

        let total = query
            .clone()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let items = query
            .order_by_desc(appraisal::Column::CreatedAt)
            .order_by_desc(appraisal::Column::Id)
            .offset(page.offset())
            .limit(page.limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Page::new(items, total, page))
    }

    /// Count appraisals matching a filter.
    pub async fn count(&self, filter: &AppraisalFilter) -> AppResult<u64> {
        Self::filtered(filter)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// The most recent appraisal of an employee, by review period.
    pub async fn find_latest_by_employee(
        &self,
        employee_id: i32,
    ) -> AppResult<Option<appraisal::Model>> {
        Appraisal::find()
            .filter(appraisal::Column::EmployeeId.eq(employee_id))
            .order_by_desc(appraisal::Column::ReviewPeriodEnd)
            .order_by_desc(appraisal::Column::Id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Overall ratings of every rated, completed appraisal.
    pub async fn find_completed_ratings(&self) -> AppResult<Vec<f64>> {
        let ratings: Vec<Option<f64>> = Appraisal::find()
            .filter(appraisal::Column::Status.eq(AppraisalStatus::Completed))
            .filter(appraisal::Column::OverallRating.is_not_null())
            .select_only()
            .column(appraisal::Column::OverallRating)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(ratings.into_iter().flatten().collect())
    }

    /// Create a new appraisal.
    pub async fn create(&self, model: appraisal::ActiveModel) -> AppResult<appraisal::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an appraisal.
    pub async fn update(&self, model: appraisal::ActiveModel) -> AppResult<appraisal::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Apply `changes` only if the appraisal is still in one of `from`.
    ///
    /// Returns whether the row was updated. This is the compare-and-set every
    /// status transition goes through, so two racing callers never both win.
    pub async fn update_if_status<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: i32,
        from: &[AppraisalStatus],
        changes: appraisal::ActiveModel,
    ) -> AppResult<bool> {
        let result = Appraisal::update_many()
            .set(changes)
            .filter(appraisal::Column::Id.eq(id))
            .filter(appraisal::Column::Status.is_in(from.iter().copied()))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }

    /// Delete an appraisal. Assessments, meetings and goal links follow by FK rules.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        Appraisal::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
