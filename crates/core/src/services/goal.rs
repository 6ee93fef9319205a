//! Development goals.

use appraisal_common::{AppError, AppResult, Page, PageRequest};
use appraisal_db::{
    entities::{
        goal::{self, GoalStatus},
        user,
    },
    repositories::{AppraisalRepository, GoalFilter, GoalRepository, UserRepository},
};
use chrono::{NaiveDate, Utc};
use sea_orm::Set;
use serde::Deserialize;
use tracing::{debug, info};
use validator::Validate;

use crate::lifecycle::{self, GoalTransition, Transition};
use crate::policy::{self, Actor, AppraisalAction, Parties};

/// Input for creating a goal.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalInput {
    pub employee_id: i32,
    pub appraisal_id: Option<i32>,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 4000))]
    pub description: String,

    pub target_date: NaiveDate,
}

/// Edits to an active goal.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoalInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 4000))]
    pub description: Option<String>,

    pub target_date: Option<NaiveDate>,

    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

/// Progress report. Values outside `[0, 100]` are clamped.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgressInput {
    pub progress: i32,
}

/// Goal service.
#[derive(Clone)]
pub struct GoalService {
    appraisal_repo: AppraisalRepository,
    goal_repo: GoalRepository,
    user_repo: UserRepository,
}

impl GoalService {
    /// Create a new goal service.
    #[must_use]
    pub const fn new(
        appraisal_repo: AppraisalRepository,
        goal_repo: GoalRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            appraisal_repo,
            goal_repo,
            user_repo,
        }
    }

    async fn load(&self, actor: &Actor, id: i32) -> AppResult<(goal::Model, user::Model)> {
        let hidden = || AppError::NotFound(format!("Goal {id}"));
        let goal = self.goal_repo.find_by_id(id).await?.ok_or_else(hidden)?;
        let owner = self.user_repo.get_by_id(goal.employee_id).await?;

        if !policy::can_view_goal(actor, &owner) {
            return Err(hidden());
        }

        Ok((goal, owner))
    }

    /// Get a goal visible to the caller.
    pub async fn get(&self, actor: &Actor, id: i32) -> AppResult<goal::Model> {
        self.load(actor, id).await.map(|(goal, _)| goal)
    }

    /// Page through goals, intersected with the caller's scope.
    pub async fn list(
        &self,
        actor: &Actor,
        filter: GoalFilter,
        page: PageRequest,
    ) -> AppResult<Page<goal::Model>> {
        match policy::scope_goals(actor, filter) {
            Some(filter) => self.goal_repo.find_page(&filter, page).await,
            None => Ok(Page::empty(page)),
        }
    }

    /// Create a goal for oneself, a direct report, or anyone (HR/Admin).
    pub async fn create(&self, actor: &Actor, input: CreateGoalInput) -> AppResult<goal::Model> {
        input.validate()?;

        let owner = self
            .user_repo
            .find_by_id(input.employee_id)
            .await?
            .filter(|u| policy::can_view_goal(actor, u))
            .ok_or_else(|| AppError::NotFound(format!("User {}", input.employee_id)))?;

        if let Some(appraisal_id) = input.appraisal_id {
            let appraisal = self.appraisal_repo.get_by_id(appraisal_id).await?;
            policy::authorize(actor, AppraisalAction::View, Parties::from(&appraisal))
                .check(|| format!("Appraisal {appraisal_id}"))?;
            if appraisal.employee_id != owner.id {
                return Err(AppError::Validation(format!(
                    "Appraisal {appraisal_id} belongs to another employee"
                )));
            }
        }

        let now = Utc::now();
        let model = goal::ActiveModel {
            employee_id: Set(owner.id),
            appraisal_id: Set(input.appraisal_id),
            title: Set(input.title),
            description: Set(input.description),
            target_date: Set(input.target_date),
            status: Set(GoalStatus::NotStarted),
            progress: Set(0),
            notes: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let goal = self.goal_repo.create(model).await?;
        info!(goal_id = goal.id, employee_id = owner.id, by = actor.id, "Goal created");
        Ok(goal)
    }

    /// Edit an active goal.
    pub async fn update(
        &self,
        actor: &Actor,
        id: i32,
        input: UpdateGoalInput,
    ) -> AppResult<goal::Model> {
        input.validate()?;
        let (goal, _) = self.load(actor, id).await?;
        if !GoalTransition::ACTIVE.contains(&goal.status) {
            return Err(AppError::InvalidOperation(format!(
                "Cannot edit a {:?} goal",
                goal.status
            )));
        }

        let mut changes = goal::ActiveModel {
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        if let Some(title) = input.title {
            changes.title = Set(title);
        }
        if let Some(description) = input.description {
            changes.description = Set(description);
        }
        if let Some(target_date) = input.target_date {
            changes.target_date = Set(target_date);
        }
        if let Some(notes) = input.notes {
            changes.notes = Set(Some(notes));
        }

        self.write(id, &[goal.status], changes).await
    }

    /// Record progress. 100 completes the goal; any progress starts it.
    pub async fn update_progress(
        &self,
        actor: &Actor,
        id: i32,
        input: GoalProgressInput,
    ) -> AppResult<goal::Model> {
        let (goal, _) = self.load(actor, id).await?;
        let (progress, status) = lifecycle::goal_progress(goal.status, input.progress)?;

        let changes = goal::ActiveModel {
            progress: Set(progress),
            status: Set(status),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let updated = self.write(id, &[goal.status], changes).await?;
        debug!(goal_id = id, progress, status = ?status, "Goal progress updated");
        Ok(updated)
    }

    /// Start a goal without reporting progress.
    pub async fn start(&self, actor: &Actor, id: i32) -> AppResult<goal::Model> {
        self.transition(actor, id, GoalTransition::Start).await
    }

    /// Mark a goal completed at full progress.
    pub async fn complete(&self, actor: &Actor, id: i32) -> AppResult<goal::Model> {
        self.transition(actor, id, GoalTransition::Complete).await
    }

    /// Cancel an active goal.
    pub async fn cancel(&self, actor: &Actor, id: i32) -> AppResult<goal::Model> {
        self.transition(actor, id, GoalTransition::Cancel).await
    }

    /// Delete a goal.
    pub async fn delete(&self, actor: &Actor, id: i32) -> AppResult<()> {
        let (goal, owner) = self.load(actor, id).await?;
        if !policy::can_delete_goal(actor, &owner, goal.status == GoalStatus::NotStarted) {
            return Err(AppError::Forbidden(format!(
                "Goal {id} can no longer be deleted by its owner"
            )));
        }

        self.goal_repo.delete(id).await?;
        info!(goal_id = id, by = actor.id, "Goal deleted");
        Ok(())
    }

    async fn transition(
        &self,
        actor: &Actor,
        id: i32,
        action: GoalTransition,
    ) -> AppResult<goal::Model> {
        let (goal, _) = self.load(actor, id).await?;
        let status = action.apply(goal.status)?;

        let mut changes = goal::ActiveModel {
            status: Set(status),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        if status == GoalStatus::Completed {
            changes.progress = Set(100);
        }

        let updated = self.write(id, action.sources(), changes).await?;
        info!(goal_id = id, status = ?status, "Goal status changed");
        Ok(updated)
    }

    async fn write(
        &self,
        id: i32,
        from: &[GoalStatus],
        changes: goal::ActiveModel,
    ) -> AppResult<goal::Model> {
        if !self.goal_repo.update_if_status(id, from, changes).await? {
            return Err(AppError::InvalidOperation(format!(
                "Goal {id} changed status concurrently"
            )));
        }
        self.goal_repo.get_by_id(id).await
    }
}
