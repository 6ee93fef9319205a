//! Goal repository.

use std::sync::Arc;

use appraisal_common::{AppError, AppResult, Page, PageRequest};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, sea_query::Query,
};

use crate::entities::{Goal, User, goal, goal::GoalStatus, user};

/// Filters accepted by [`GoalRepository::find_page`].
#[derive(Debug, Clone, Default)]
pub struct GoalFilter {
    pub employee_id: Option<i32>,
    pub appraisal_id: Option<i32>,
    /// Goals of this manager and of their direct reports.
    pub team_of: Option<i32>,
    /// Any of these statuses; empty means any status.
    pub statuses: Vec<GoalStatus>,
}

/// Repository for goal operations.
#[derive(Clone)]
pub struct GoalRepository {
    db: Arc<DatabaseConnection>,
}

impl GoalRepository {
    /// Create a new goal repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find goal by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<goal::Model>> {
        Goal::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find goal by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: i32) -> AppResult<goal::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Goal {id}")))
    }

    fn filtered(filter: &GoalFilter) -> Select<Goal> {
        let mut query = Goal::find();

        if let Some(employee_id) = filter.employee_id {
            query = query.filter(goal::Column::EmployeeId.eq(employee_id));
        }
        if let Some(appraisal_id) = filter.appraisal_id {
            query = query.filter(goal::Column::AppraisalId.eq(appraisal_id));
        }
        if let Some(lead) = filter.team_of {
            let reports = Query::select()
                .column(user::Column::Id)
                .from(User)
                .and_where(user::Column::ManagerId.eq(lead))
                .to_owned();
            query = query.filter(
                Condition::any()
                    .add(goal::Column::EmployeeId.eq(lead))
                    .add(goal::Column::EmployeeId.in_subquery(reports)),
            );
        }
        if !filter.statuses.is_empty() {
            query = query.filter(goal::Column::Status.is_in(filter.statuses.iter().copied()));
        }

        query
    }

    /// Page through goals matching a filter, nearest target date first.
    pub async fn find_page(
        &self,
        filter: &GoalFilter,
        page: PageRequest,
    ) -> AppResult<Page<goal::Model>> {
        let query = Self::filtered(filter);

        let total = query
            .clone()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let items = query
            .order_by_asc(goal::Column::TargetDate)
            .order_by_asc(goal::Column::Id)
            .offset(page.offset())
            .limit(page.limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Page::new(items, total, page))
    }

    /// Goals of an employee that are neither completed nor cancelled.
    pub async fn find_active_by_employee(&self, employee_id: i32) -> AppResult<Vec<goal::Model>> {
        Goal::find()
            .filter(goal::Column::EmployeeId.eq(employee_id))
            .filter(goal::Column::Status.is_in([GoalStatus::NotStarted, GoalStatus::InProgress]))
            .order_by_asc(goal::Column::TargetDate)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new goal.
    pub async fn create(&self, model: goal::ActiveModel) -> AppResult<goal::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Apply `changes` only if the goal is still in one of `from`.
    pub async fn update_if_status(
        &self,
        id: i32,
        from: &[GoalStatus],
        changes: goal::ActiveModel,
    ) -> AppResult<bool> {
        let result = Goal::update_many()
            .set(changes)
            .filter(goal::Column::Id.eq(id))
            .filter(goal::Column::Status.is_in(from.iter().copied()))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }

    /// Delete a goal.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        Goal::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
