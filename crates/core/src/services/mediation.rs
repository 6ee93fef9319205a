//! HR-facilitated mediation of appeals.

use appraisal_common::{AppError, AppResult};
use appraisal_db::{
    entities::{
        appeal::{self, AppealStatus},
        mediation::{self, MediationStatus},
        notification::NotificationType,
    },
    repositories::{AppealRepository, AppraisalRepository, MediationRepository, UserRepository},
};
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::Set;
use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use super::notification::{NotificationIntent, Notifier};
use super::require_text;
use crate::lifecycle::{MediationTransition, Transition};
use crate::policy::{self, Actor, AppraisalAction};

/// Input for opening a mediation.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMediationInput {
    pub appeal_id: i32,
    pub hr_representative_id: i32,
    pub scheduled_at: Option<DateTime<FixedOffset>>,

    #[validate(length(max = 256))]
    pub location: Option<String>,

    #[validate(url)]
    pub meeting_link: Option<String>,

    #[validate(length(max = 8000))]
    pub notes: Option<String>,
}

/// Input for (re)scheduling a mediation.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleMediationInput {
    pub scheduled_at: DateTime<FixedOffset>,

    #[validate(length(max = 256))]
    pub location: Option<String>,

    #[validate(url)]
    pub meeting_link: Option<String>,
}

/// Input for closing a mediation.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteMediationInput {
    #[validate(length(max = 8000))]
    pub notes: Option<String>,

    #[validate(length(max = 4000))]
    pub outcome: Option<String>,
}

/// Mediation service.
#[derive(Clone)]
pub struct MediationService {
    appraisal_repo: AppraisalRepository,
    appeal_repo: AppealRepository,
    mediation_repo: MediationRepository,
    user_repo: UserRepository,
    notifier: Notifier,
}

impl MediationService {
    /// Create a new mediation service.
    #[must_use]
    pub const fn new(
        appraisal_repo: AppraisalRepository,
        appeal_repo: AppealRepository,
        mediation_repo: MediationRepository,
        user_repo: UserRepository,
        notifier: Notifier,
    ) -> Self {
        Self {
            appraisal_repo,
            appeal_repo,
            mediation_repo,
            user_repo,
            notifier,
        }
    }

    /// Load an appeal the caller may see.
    async fn visible_appeal(&self, actor: &Actor, appeal_id: i32) -> AppResult<appeal::Model> {
        let appeal = self
            .appeal_repo
            .find_by_id(appeal_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Appeal {appeal_id}")))?;
        let appraisal = self.appraisal_repo.get_by_id(appeal.appraisal_id).await?;

        policy::authorize(
            actor,
            AppraisalAction::View,
            policy::appeal_parties(&appeal, &appraisal),
        )
        .check(|| format!("Appeal {appeal_id}"))?;

        Ok(appeal)
    }

    /// Get a mediation visible to the caller.
    pub async fn get(&self, actor: &Actor, id: i32) -> AppResult<mediation::Model> {
        let mediation = self
            .mediation_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Mediation {id}")))?;

        if actor.id != mediation.hr_representative_id {
            self.visible_appeal(actor, mediation.appeal_id)
                .await
                .map_err(|e| match e {
                    AppError::NotFound(_) => AppError::NotFound(format!("Mediation {id}")),
                    other => other,
                })?;
        }

        Ok(mediation)
    }

    /// Mediations of an appeal, oldest first.
    pub async fn list_by_appeal(
        &self,
        actor: &Actor,
        appeal_id: i32,
    ) -> AppResult<Vec<mediation::Model>> {
        self.visible_appeal(actor, appeal_id).await?;
        self.mediation_repo.find_by_appeal(appeal_id).await
    }

    /// Open a mediation for an appeal pending mediation (HR/Admin).
    pub async fn create(
        &self,
        actor: &Actor,
        input: CreateMediationInput,
    ) -> AppResult<mediation::Model> {
        actor.require_elevated()?;
        input.validate()?;
        if let Some(at) = input.scheduled_at {
            ensure_future(at)?;
        }

        let appeal = self.appeal_repo.get_by_id(input.appeal_id).await?;
        if appeal.status != AppealStatus::PendingMediation {
            return Err(AppError::InvalidOperation(format!(
                "Appeal {} is {:?}, mediation requires PendingMediation",
                appeal.id, appeal.status
            )));
        }

        let representative = self.user_repo.find_by_id(input.hr_representative_id).await?;
        if !representative
            .as_ref()
            .is_some_and(|u| u.is_active && u.role.is_elevated())
        {
            return Err(AppError::Validation(format!(
                "User {} cannot represent HR",
                input.hr_representative_id
            )));
        }

        let status = if input.scheduled_at.is_some() {
            MediationStatus::Scheduled
        } else {
            MediationStatus::Pending
        };

        let now = Utc::now();
        let model = mediation::ActiveModel {
            appeal_id: Set(appeal.id),
            hr_representative_id: Set(input.hr_representative_id),
            scheduled_at: Set(input.scheduled_at),
            location: Set(input.location),
            meeting_link: Set(input.meeting_link),
            notes: Set(input.notes),
            outcome: Set(None),
            status: Set(status),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            completed_at: Set(None),
            ..Default::default()
        };

        let mediation = self.mediation_repo.create(model).await?;
        info!(mediation_id = mediation.id, appeal_id = appeal.id, "Mediation opened");

        if mediation.scheduled_at.is_some() {
            self.notifier
                .enqueue_detached(scheduled(&appeal, &mediation))
                .await;
        }

        Ok(mediation)
    }

    /// Set or move the date of a mediation that has not started (HR/Admin).
    pub async fn schedule(
        &self,
        actor: &Actor,
        id: i32,
        input: ScheduleMediationInput,
    ) -> AppResult<mediation::Model> {
        actor.require_elevated()?;
        input.validate()?;
        ensure_future(input.scheduled_at)?;

        let mediation = self.mediation_repo.get_by_id(id).await?;
        let action = MediationTransition::Schedule;

        let mut changes = mediation::ActiveModel {
            status: Set(action.apply(mediation.status)?),
            scheduled_at: Set(Some(input.scheduled_at)),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        if let Some(location) = input.location {
            changes.location = Set(Some(location));
        }
        if let Some(link) = input.meeting_link {
            changes.meeting_link = Set(Some(link));
        }

        let updated = self.write(id, action, changes).await?;
        info!(mediation_id = id, "Mediation scheduled");

        let appeal = self.appeal_repo.get_by_id(updated.appeal_id).await?;
        self.notifier
            .enqueue_detached(scheduled(&appeal, &updated))
            .await;

        Ok(updated)
    }

    /// Start a mediation session (HR/Admin).
    pub async fn start(&self, actor: &Actor, id: i32) -> AppResult<mediation::Model> {
        actor.require_elevated()?;

        let mediation = self.mediation_repo.get_by_id(id).await?;
        let action = MediationTransition::Start;

        let changes = mediation::ActiveModel {
            status: Set(action.apply(mediation.status)?),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };

        self.write(id, action, changes).await
    }

    /// Close a running mediation with its outcome (HR/Admin).
    pub async fn complete(
        &self,
        actor: &Actor,
        id: i32,
        input: CompleteMediationInput,
    ) -> AppResult<mediation::Model> {
        actor.require_elevated()?;
        input.validate()?;
        let outcome = require_text("outcome", input.outcome.as_deref())?;

        let mediation = self.mediation_repo.get_by_id(id).await?;
        let action = MediationTransition::Complete;

        let now = Utc::now();
        let mut changes = mediation::ActiveModel {
            status: Set(action.apply(mediation.status)?),
            outcome: Set(Some(outcome)),
            completed_at: Set(Some(now.into())),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        if let Some(notes) = input.notes {
            changes.notes = Set(Some(notes));
        }

        let updated = self.write(id, action, changes).await?;
        info!(mediation_id = id, appeal_id = updated.appeal_id, "Mediation completed");

        match self.appeal_repo.find_by_id(updated.appeal_id).await {
            Ok(Some(appeal)) => {
                self.notifier
                    .enqueue_detached(NotificationIntent::fan_out(
                        [appeal.employee_id, updated.hr_representative_id],
                        NotificationType::MediationCompleted,
                        "Mediation completed",
                        &format!("Mediation for appeal #{} has concluded", appeal.id),
                        &format!("/appeals/{}/mediations/{}", appeal.id, updated.id),
                    ))
                    .await;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, mediation_id = id, "Failed to load appeal for notification"),
        }

        Ok(updated)
    }

    async fn write(
        &self,
        id: i32,
        action: MediationTransition,
        changes: mediation::ActiveModel,
    ) -> AppResult<mediation::Model> {
        if !self
            .mediation_repo
            .update_if_status(id, action.sources(), changes)
            .await?
        {
            return Err(AppError::InvalidOperation(format!(
                "Mediation {id} changed status concurrently"
            )));
        }
        self.mediation_repo.get_by_id(id).await
    }
}

fn ensure_future(at: DateTime<FixedOffset>) -> AppResult<()> {
    if at > Utc::now() {
        Ok(())
    } else {
        Err(AppError::Validation(
            "Mediation must be scheduled in the future".to_string(),
        ))
    }
}

fn scheduled(appeal: &appeal::Model, mediation: &mediation::Model) -> Vec<NotificationIntent> {
    let when = mediation.scheduled_at.map_or_else(
        || "a date to be confirmed".to_string(),
        |at| at.format("%Y-%m-%d %H:%M %:z").to_string(),
    );

    NotificationIntent::fan_out(
        [appeal.employee_id, mediation.hr_representative_id],
        NotificationType::MediationScheduled,
        "Mediation scheduled",
        &format!("Mediation for appeal #{} is set for {when}", appeal.id),
        &format!("/appeals/{}/mediations/{}", appeal.id, mediation.id),
    )
}
