//! Appeals against completed appraisals.

use std::sync::Arc;

use appraisal_common::config::AppraisalConfig;
use appraisal_common::{AppError, AppResult, Page, PageRequest};
use appraisal_db::{
    entities::{
        appeal::{self, AppealPriority, AppealStatus},
        appraisal::{self, AppraisalStatus},
        notification::NotificationType,
        user::UserRole,
    },
    repositories::{
        AppealFilter, AppealRepository, AppraisalRepository, MediationRepository, UserRepository,
    },
};
use chrono::Utc;
use sea_orm::{DatabaseConnection, DatabaseTransaction, Set};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::notification::{NotificationIntent, Notifier};
use super::{begin, commit, require_text};
use crate::lifecycle::{self, AppealDecision, AppealTransition, AppraisalTransition, Transition};
use crate::policy::{self, Actor, AppraisalAction};
use crate::scoring;

/// Input for drafting an appeal.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppealInput {
    pub appraisal_id: i32,

    #[validate(length(min = 1, max = 200))]
    pub reason: String,

    #[validate(length(max = 8000))]
    pub details: String,

    pub priority: Option<AppealPriority>,
}

/// Edits to a draft appeal.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppealInput {
    #[validate(length(min = 1, max = 200))]
    pub reason: Option<String>,

    #[validate(length(max = 8000))]
    pub details: Option<String>,

    pub priority: Option<AppealPriority>,
}

/// A review decision or a post-mediation resolution.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AppealDecisionInput {
    pub decision: AppealDecision,

    #[validate(length(max = 4000))]
    pub comments: Option<String>,

    #[validate(length(max = 4000))]
    pub resolution: Option<String>,

    /// New overall rating. Only an approval may carry one.
    pub adjusted_rating: Option<f64>,
}

/// Appeal service.
#[derive(Clone)]
pub struct AppealService {
    db: Arc<DatabaseConnection>,
    appraisal_repo: AppraisalRepository,
    appeal_repo: AppealRepository,
    mediation_repo: MediationRepository,
    user_repo: UserRepository,
    notifier: Notifier,
    config: AppraisalConfig,
}

impl AppealService {
    /// Create a new appeal service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        appraisal_repo: AppraisalRepository,
        appeal_repo: AppealRepository,
        mediation_repo: MediationRepository,
        user_repo: UserRepository,
        notifier: Notifier,
        config: AppraisalConfig,
    ) -> Self {
        Self {
            db,
            appraisal_repo,
            appeal_repo,
            mediation_repo,
            user_repo,
            notifier,
            config,
        }
    }

    /// Load an appeal with its appraisal and check `action` against both.
    pub(crate) async fn load(
        &self,
        actor: &Actor,
        id: i32,
        action: AppraisalAction,
    ) -> AppResult<(appeal::Model, appraisal::Model)> {
        let appeal = self
            .appeal_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Appeal {id}")))?;
        let appraisal = self.appraisal_repo.get_by_id(appeal.appraisal_id).await?;

        policy::authorize(actor, action, policy::appeal_parties(&appeal, &appraisal))
            .check(|| format!("Appeal {id}"))?;

        Ok((appeal, appraisal))
    }

    /// Get an appeal visible to the caller.
    pub async fn get(&self, actor: &Actor, id: i32) -> AppResult<appeal::Model> {
        self.load(actor, id, AppraisalAction::View)
            .await
            .map(|(appeal, _)| appeal)
    }

    /// Page through appeals, intersected with the caller's scope.
    pub async fn list(
        &self,
        actor: &Actor,
        filter: AppealFilter,
        page: PageRequest,
    ) -> AppResult<Page<appeal::Model>> {
        match policy::scope_appeals(actor, filter) {
            Some(filter) => self.appeal_repo.find_page(&filter, page).await,
            None => Ok(Page::empty(page)),
        }
    }

    /// Draft an appeal against a completed appraisal (its employee only).
    pub async fn create(&self, actor: &Actor, input: CreateAppealInput) -> AppResult<appeal::Model> {
        input.validate()?;

        let appraisal = self
            .appraisal_repo
            .find_by_id(input.appraisal_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Appraisal {}", input.appraisal_id)))?;
        policy::authorize(actor, AppraisalAction::FileAppeal, (&appraisal).into())
            .check(|| format!("Appraisal {}", appraisal.id))?;
        self.ensure_appealable(&appraisal)?;

        let now = Utc::now();
        let model = appeal::ActiveModel {
            appraisal_id: Set(appraisal.id),
            employee_id: Set(appraisal.employee_id),
            reason: Set(input.reason),
            details: Set(input.details),
            status: Set(AppealStatus::Draft),
            priority: Set(input.priority.unwrap_or(AppealPriority::Medium)),
            reviewed_by_id: Set(None),
            review_comments: Set(None),
            resolution: Set(None),
            reviewed_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            submitted_at: Set(None),
            ..Default::default()
        };

        let appeal = self.appeal_repo.create(model).await?;
        info!(appeal_id = appeal.id, appraisal_id = appraisal.id, "Appeal drafted");
        Ok(appeal)
    }

    /// Edit a draft appeal.
    pub async fn update(
        &self,
        actor: &Actor,
        id: i32,
        input: UpdateAppealInput,
    ) -> AppResult<appeal::Model> {
        input.validate()?;
        let (appeal, _) = self.load(actor, id, AppraisalAction::FileAppeal).await?;
        let from = AppealTransition::Submit.sources();
        if !from.contains(&appeal.status) {
            return Err(AppError::InvalidOperation(
                "Only draft appeals can be edited".to_string(),
            ));
        }

        let mut changes = appeal::ActiveModel {
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        if let Some(reason) = input.reason {
            changes.reason = Set(reason);
        }
        if let Some(details) = input.details {
            changes.details = Set(details);
        }
        if let Some(priority) = input.priority {
            changes.priority = Set(priority);
        }

        if !self
            .appeal_repo
            .update_if_status(self.db.as_ref(), id, from, changes)
            .await?
        {
            return Err(AppError::InvalidOperation(
                "Only draft appeals can be edited".to_string(),
            ));
        }

        self.appeal_repo.get_by_id(id).await
    }

    /// Submit a draft appeal. The appraisal moves to `Appealed`.
    pub async fn submit(&self, actor: &Actor, id: i32) -> AppResult<appeal::Model> {
        let (appeal, appraisal) = self.load(actor, id, AppraisalAction::FileAppeal).await?;
        let action = AppealTransition::Submit;
        action.apply(appeal.status)?;

        let txn = begin(&self.db).await?;
        let appraisal = self.appraisal_repo.lock(&txn, appraisal.id).await?;
        self.ensure_appealable(&appraisal)?;

        let now = Utc::now();
        let changes = appeal::ActiveModel {
            status: Set(action.target()),
            submitted_at: Set(Some(now.into())),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        if !self
            .appeal_repo
            .update_if_status(&txn, id, action.sources(), changes)
            .await?
        {
            return Err(lost(id));
        }

        // A sibling appeal may already hold the appraisal in Appealed.
        let appealed = self
            .appraisal_repo
            .update_if_status(
                &txn,
                appraisal.id,
                AppraisalTransition::Appeal.sources(),
                appraisal::ActiveModel {
                    status: Set(AppraisalTransition::Appeal.target()),
                    updated_at: Set(now.into()),
                    ..Default::default()
                },
            )
            .await?;
        if appealed {
            info!(appraisal_id = appraisal.id, "Appraisal appealed");
        }

        let hr = self.user_repo.find_active_ids_by_roles(&[UserRole::Hr]).await?;
        self.notifier
            .enqueue(
                &txn,
                NotificationIntent::fan_out(
                    std::iter::once(appraisal.manager_id).chain(hr),
                    NotificationType::AppealSubmitted,
                    "Appeal submitted",
                    &format!("An appeal was filed against appraisal #{}", appraisal.id),
                    &link(id),
                ),
            )
            .await?;

        commit(txn).await?;
        self.notifier.kick();
        info!(appeal_id = id, "Appeal submitted");

        self.appeal_repo.get_by_id(id).await
    }

    /// Take a submitted appeal into review (the manager or HR/Admin).
    pub async fn start_review(&self, actor: &Actor, id: i32) -> AppResult<appeal::Model> {
        let (appeal, _) = self.load(actor, id, AppraisalAction::ReviewAppeal).await?;
        let action = AppealTransition::StartReview;

        let changes = appeal::ActiveModel {
            status: Set(action.apply(appeal.status)?),
            reviewed_by_id: Set(Some(actor.id)),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let txn = begin(&self.db).await?;
        if !self
            .appeal_repo
            .update_if_status(&txn, id, action.sources(), changes)
            .await?
        {
            return Err(lost(id));
        }
        self.notifier
            .enqueue(
                &txn,
                vec![
                    NotificationIntent::new(
                        appeal.employee_id,
                        NotificationType::AppealReviewed,
                        "Appeal under review",
                        format!("Your appeal #{id} is being reviewed"),
                    )
                    .with_link(link(id)),
                ],
            )
            .await?;
        commit(txn).await?;
        self.notifier.kick();

        self.appeal_repo.get_by_id(id).await
    }

    /// Decide an appeal under review.
    pub async fn decide(
        &self,
        actor: &Actor,
        id: i32,
        input: AppealDecisionInput,
    ) -> AppResult<appeal::Model> {
        input.validate()?;
        let comments = require_text("comments", input.comments.as_deref())?;
        self.check_adjustment(&input)?;

        let (appeal, appraisal) = self.load(actor, id, AppraisalAction::ReviewAppeal).await?;
        let action = AppealTransition::Decide(input.decision);
        action.apply(appeal.status)?;

        self.record(actor, &appeal, &appraisal, action, comments, input)
            .await?;
        info!(appeal_id = id, decision = ?action.target(), by = actor.id, "Appeal decided");

        self.appeal_repo.get_by_id(id).await
    }

    /// Settle an appeal after at least one completed mediation (HR/Admin).
    pub async fn resolve(
        &self,
        actor: &Actor,
        id: i32,
        input: AppealDecisionInput,
    ) -> AppResult<appeal::Model> {
        actor.require_elevated()?;
        input.validate()?;
        let comments = require_text("comments", input.comments.as_deref())?;
        self.check_adjustment(&input)?;

        let (appeal, appraisal) = self.load(actor, id, AppraisalAction::ReviewAppeal).await?;
        let action = AppealTransition::Resolve(input.decision);
        action.apply(appeal.status)?;

        if self.mediation_repo.count_completed(self.db.as_ref(), id).await? == 0 {
            return Err(AppError::InvalidOperation(format!(
                "Appeal {id} has no completed mediation"
            )));
        }

        self.record(actor, &appeal, &appraisal, action, comments, input)
            .await?;
        info!(appeal_id = id, decision = ?action.target(), by = actor.id, "Appeal resolved");

        self.appeal_repo.get_by_id(id).await
    }

    /// Count appeals matching a filter, unscoped.
    pub async fn count(&self, filter: &AppealFilter) -> AppResult<u64> {
        self.appeal_repo.count(filter).await
    }

    /// Write a decision, close the appraisal when it was final and the last
    /// open appeal, and notify, all in one transaction.
    async fn record(
        &self,
        actor: &Actor,
        appeal: &appeal::Model,
        appraisal: &appraisal::Model,
        action: AppealTransition,
        comments: String,
        input: AppealDecisionInput,
    ) -> AppResult<()> {
        let txn = begin(&self.db).await?;
        // Serialises final decisions of sibling appeals.
        let appraisal = self.appraisal_repo.lock(&txn, appraisal.id).await?;

        let now = Utc::now();
        let status = action.target();
        let changes = appeal::ActiveModel {
            status: Set(status),
            reviewed_by_id: Set(Some(actor.id)),
            review_comments: Set(Some(comments)),
            resolution: Set(input.resolution),
            reviewed_at: Set(Some(now.into())),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        if !self
            .appeal_repo
            .update_if_status(&txn, appeal.id, action.sources(), changes)
            .await?
        {
            return Err(lost(appeal.id));
        }

        let mut intents = vec![
            NotificationIntent::new(
                appeal.employee_id,
                NotificationType::AppealReviewed,
                "Appeal reviewed",
                format!("Your appeal #{} is now {status:?}", appeal.id),
            )
            .with_link(link(appeal.id)),
        ];

        if status.is_final() {
            intents.extend(
                self.close_appraisal(&txn, &appraisal, appeal.id, input.adjusted_rating)
                    .await?,
            );
        }

        self.notifier.enqueue(&txn, intents).await?;
        commit(txn).await?;
        self.notifier.kick();
        Ok(())
    }

    /// Apply an adjusted rating and return the appraisal to `Completed` once
    /// no other appeal keeps it open.
    async fn close_appraisal(
        &self,
        txn: &DatabaseTransaction,
        appraisal: &appraisal::Model,
        appeal_id: i32,
        adjusted_rating: Option<f64>,
    ) -> AppResult<Vec<NotificationIntent>> {
        let open = self
            .appeal_repo
            .count_other_open(txn, appraisal.id, appeal_id)
            .await?;

        let mut changes = appraisal::ActiveModel {
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        if let Some(rating) = adjusted_rating {
            changes.overall_rating = Set(Some(scoring::round_to(rating, 2)));
        }

        let action = AppraisalTransition::CloseAppeal;
        if open > 0 {
            if adjusted_rating.is_some() {
                self.appraisal_repo
                    .update_if_status(txn, appraisal.id, action.sources(), changes)
                    .await?;
            }
            return Ok(Vec::new());
        }

        changes.status = Set(action.target());
        if !self
            .appraisal_repo
            .update_if_status(txn, appraisal.id, action.sources(), changes)
            .await?
        {
            return Ok(Vec::new());
        }

        info!(appraisal_id = appraisal.id, "Appraisal closed after appeal");
        Ok(NotificationIntent::fan_out(
            [appraisal.employee_id, appraisal.manager_id],
            NotificationType::AppraisalStatusChanged,
            "Appraisal completed",
            &format!("Appraisal #{} is completed again after its appeal", appraisal.id),
            &super::appraisal::link(appraisal.id),
        ))
    }

    fn ensure_appealable(&self, appraisal: &appraisal::Model) -> AppResult<()> {
        if !matches!(
            appraisal.status,
            AppraisalStatus::Completed | AppraisalStatus::Appealed
        ) {
            return Err(AppError::InvalidOperation(format!(
                "Appraisal {} is {:?}, only completed appraisals can be appealed",
                appraisal.id, appraisal.status
            )));
        }
        lifecycle::ensure_appeal_window(
            appraisal.completed_at,
            Utc::now().into(),
            self.config.appeal_window_days,
        )
    }

    fn check_adjustment(&self, input: &AppealDecisionInput) -> AppResult<()> {
        let Some(rating) = input.adjusted_rating else {
            return Ok(());
        };
        if input.decision != AppealDecision::Approved {
            return Err(AppError::Validation(
                "Only an approved appeal can adjust the rating".to_string(),
            ));
        }
        scoring::validate_rating("adjustedRating", rating, self.config.rating_scale_max)
    }
}

fn link(id: i32) -> String {
    format!("/appeals/{id}")
}

fn lost(id: i32) -> AppError {
    AppError::InvalidOperation(format!("Appeal {id} changed status concurrently"))
}
