//! Self-assessments and manager reviews.
//!
//! Both records follow the same pattern: the owner drafts, edits and submits
//! once. Every submission runs the appraisal advancement check in the same
//! transaction, with the appraisal row locked, so only one submitter can move
//! the appraisal into review.

use std::sync::Arc;

use appraisal_common::config::AppraisalConfig;
use appraisal_common::{AppError, AppResult};
use appraisal_db::{
    entities::{
        appraisal::{self, AppraisalStatus},
        manager_review, notification::NotificationType,
        self_assessment::{self, AssessmentStatus},
        user::UserRole,
    },
    repositories::{
        AppraisalRepository, ManagerReviewRepository, SelfAssessmentRepository, UserRepository,
    },
};
use chrono::Utc;
use sea_orm::{DatabaseConnection, DatabaseTransaction, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

use super::appraisal::link;
use super::notification::{NotificationIntent, Notifier};
use super::{begin, commit};
use crate::lifecycle::{AppraisalTransition, AssessmentTransition, Transition};
use crate::policy::{self, Actor, AppraisalAction, Parties};
use crate::scoring;

/// Free text and ratings of a self-assessment.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SelfAssessmentContent {
    #[validate(length(max = 8000))]
    pub accomplishments: String,

    #[validate(length(max = 8000))]
    pub challenges: String,

    #[validate(length(max = 8000))]
    pub goals_achieved: String,

    #[validate(length(max = 8000))]
    pub future_development: String,

    pub self_rating: Option<f64>,
    pub performance_rating: Option<f64>,
    pub technical_skills_rating: Option<f64>,
    pub communication_rating: Option<f64>,
    pub teamwork_rating: Option<f64>,
    pub leadership_rating: Option<f64>,

    #[validate(length(max = 4000))]
    pub additional_comments: Option<String>,
}

/// Input for starting a self-assessment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSelfAssessmentInput {
    pub appraisal_id: i32,

    #[serde(flatten)]
    #[validate(nested)]
    pub content: SelfAssessmentContent,
}

/// Section ratings and free text of a manager review.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ManagerReviewContent {
    pub performance_rating: f64,
    pub technical_skills_rating: f64,
    pub communication_rating: f64,
    pub teamwork_rating: f64,
    pub leadership_rating: f64,

    #[validate(length(max = 8000))]
    pub strengths: String,

    #[validate(length(max = 8000))]
    pub areas_for_improvement: String,

    #[validate(length(max = 8000))]
    pub manager_comments: String,

    #[validate(length(max = 8000))]
    pub recommended_actions: String,
}

/// Input for starting a manager review.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateManagerReviewInput {
    pub appraisal_id: i32,

    #[serde(flatten)]
    #[validate(nested)]
    pub content: ManagerReviewContent,
}

/// A party whose assessment the appraisal is still waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Party {
    Employee,
    Manager,
}

/// Result of a submit call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission<T> {
    pub item: T,
    pub appraisal_status: AppraisalStatus,
    /// Whether this call moved the appraisal into review.
    pub advanced: bool,
    /// Parties still to submit. Empty once both have.
    pub awaiting: Vec<Party>,
}

/// Outcome of the advancement check.
struct Advance {
    status: AppraisalStatus,
    advanced: bool,
    awaiting: Vec<Party>,
    enqueued: bool,
}

/// Self-assessment and manager review service.
#[derive(Clone)]
pub struct AssessmentService {
    db: Arc<DatabaseConnection>,
    appraisal_repo: AppraisalRepository,
    self_assessment_repo: SelfAssessmentRepository,
    manager_review_repo: ManagerReviewRepository,
    user_repo: UserRepository,
    notifier: Notifier,
    config: AppraisalConfig,
}

impl AssessmentService {
    /// Create a new assessment service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        appraisal_repo: AppraisalRepository,
        self_assessment_repo: SelfAssessmentRepository,
        manager_review_repo: ManagerReviewRepository,
        user_repo: UserRepository,
        notifier: Notifier,
        config: AppraisalConfig,
    ) -> Self {
        Self {
            db,
            appraisal_repo,
            self_assessment_repo,
            manager_review_repo,
            user_repo,
            notifier,
            config,
        }
    }

    async fn appraisal_for(
        &self,
        actor: &Actor,
        appraisal_id: i32,
        action: AppraisalAction,
    ) -> AppResult<appraisal::Model> {
        let appraisal = self
            .appraisal_repo
            .find_by_id(appraisal_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Appraisal {appraisal_id}")))?;

        policy::authorize(actor, action, Parties::from(&appraisal))
            .check(|| format!("Appraisal {appraisal_id}"))?;

        Ok(appraisal)
    }

    // ==================== Self-Assessment Operations ====================

    /// Get a self-assessment by id.
    pub async fn get_self_assessment(
        &self,
        actor: &Actor,
        id: i32,
    ) -> AppResult<self_assessment::Model> {
        let assessment = self
            .self_assessment_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Self-assessment {id}")))?;

        self.appraisal_for(actor, assessment.appraisal_id, AppraisalAction::View)
            .await?;

        Ok(assessment)
    }

    /// Get the self-assessment of an appraisal.
    pub async fn get_self_assessment_by_appraisal(
        &self,
        actor: &Actor,
        appraisal_id: i32,
    ) -> AppResult<self_assessment::Model> {
        self.appraisal_for(actor, appraisal_id, AppraisalAction::View)
            .await?;

        self.self_assessment_repo
            .find_by_appraisal(self.db.as_ref(), appraisal_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Self-assessment of appraisal {appraisal_id}"))
            })
    }

    /// Start the self-assessment of a draft appraisal.
    pub async fn create_self_assessment(
        &self,
        actor: &Actor,
        input: CreateSelfAssessmentInput,
    ) -> AppResult<self_assessment::Model> {
        input.validate()?;
        self.check_self_ratings(&input.content)?;

        let appraisal = self
            .appraisal_for(actor, input.appraisal_id, AppraisalAction::WriteSelfAssessment)
            .await?;
        ensure_draft(&appraisal)?;

        if self
            .self_assessment_repo
            .find_by_appraisal(self.db.as_ref(), appraisal.id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Appraisal {} already has a self-assessment",
                appraisal.id
            )));
        }

        let now = Utc::now();
        let mut model = self_assessment_changes(input.content);
        model.appraisal_id = Set(appraisal.id);
        model.employee_id = Set(appraisal.employee_id);
        model.status = Set(AssessmentStatus::Draft);
        model.created_at = Set(now.into());
        model.submitted_at = Set(None);

        let created = self.self_assessment_repo.create(model).await?;
        debug!(self_assessment_id = created.id, appraisal_id = appraisal.id, "Self-assessment started");
        Ok(created)
    }

    /// Replace the content of a draft self-assessment.
    pub async fn update_self_assessment(
        &self,
        actor: &Actor,
        id: i32,
        content: SelfAssessmentContent,
    ) -> AppResult<self_assessment::Model> {
        content.validate()?;
        self.check_self_ratings(&content)?;

        let existing = self.self_assessment_repo.get_by_id(id).await?;
        self.appraisal_for(actor, existing.appraisal_id, AppraisalAction::WriteSelfAssessment)
            .await?;
        if existing.status != AssessmentStatus::Draft {
            return Err(AppError::InvalidOperation(
                "A submitted self-assessment cannot be edited".to_string(),
            ));
        }

        let updated = self
            .self_assessment_repo
            .update_draft(self.db.as_ref(), id, self_assessment_changes(content))
            .await?;
        if !updated {
            return Err(AppError::InvalidOperation(
                "A submitted self-assessment cannot be edited".to_string(),
            ));
        }

        self.self_assessment_repo.get_by_id(id).await
    }

    /// Submit a self-assessment. Submitting again is a no-op.
    pub async fn submit_self_assessment(
        &self,
        actor: &Actor,
        id: i32,
    ) -> AppResult<Submission<self_assessment::Model>> {
        let existing = self.self_assessment_repo.get_by_id(id).await?;
        let appraisal = self
            .appraisal_for(actor, existing.appraisal_id, AppraisalAction::WriteSelfAssessment)
            .await?;

        let txn = begin(&self.db).await?;
        let locked = self.appraisal_repo.lock(&txn, appraisal.id).await?;

        let mut enqueued = false;
        if existing.status == AssessmentStatus::Draft {
            ensure_accepts_submissions(&locked)?;
            let changes = self_assessment::ActiveModel {
                status: Set(AssessmentTransition::Submit.target()),
                submitted_at: Set(existing.submitted_at.or_else(|| Some(Utc::now().into()))),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            };
            if self
                .self_assessment_repo
                .update_draft(&txn, id, changes)
                .await?
            {
                info!(self_assessment_id = id, appraisal_id = locked.id, "Self-assessment submitted");
                self.notifier
                    .enqueue(
                        &txn,
                        vec![NotificationIntent::new(
                            locked.manager_id,
                            NotificationType::SelfAssessmentSubmitted,
                            "Self-assessment submitted",
                            format!("The self-assessment for appraisal #{} was submitted", locked.id),
                        )
                        .with_link(link(locked.id))],
                    )
                    .await?;
                enqueued = true;
            }
        }

        let advance = self.advance(&txn, &locked).await?;
        commit(txn).await?;
        if enqueued || advance.enqueued {
            self.notifier.kick();
        }

        Ok(Submission {
            item: self.self_assessment_repo.get_by_id(id).await?,
            appraisal_status: advance.status,
            advanced: advance.advanced,
            awaiting: advance.awaiting,
        })
    }

    // ==================== Manager Review Operations ====================

    /// Get a manager review by id.
    pub async fn get_manager_review(
        &self,
        actor: &Actor,
        id: i32,
    ) -> AppResult<manager_review::Model> {
        let hidden = || AppError::NotFound(format!("Manager review {id}"));
        let review = self
            .manager_review_repo
            .find_by_id(id)
            .await?
            .ok_or_else(hidden)?;

        let appraisal = self
            .appraisal_for(actor, review.appraisal_id, AppraisalAction::View)
            .await?;
        let submitted = review.status == AssessmentStatus::Submitted;
        if !policy::can_view_manager_review(actor, Parties::from(&appraisal), submitted) {
            return Err(hidden());
        }

        Ok(review)
    }

    /// Get the manager review of an appraisal.
    pub async fn get_manager_review_by_appraisal(
        &self,
        actor: &Actor,
        appraisal_id: i32,
    ) -> AppResult<manager_review::Model> {
        let appraisal = self
            .appraisal_for(actor, appraisal_id, AppraisalAction::View)
            .await?;
        let parties = Parties::from(&appraisal);

        self.manager_review_repo
            .find_by_appraisal(self.db.as_ref(), appraisal_id)
            .await?
            .filter(|r| {
                policy::can_view_manager_review(
                    actor,
                    parties,
                    r.status == AssessmentStatus::Submitted,
                )
            })
            .ok_or_else(|| AppError::NotFound(format!("Manager review of appraisal {appraisal_id}")))
    }

    /// Start the manager review of a draft appraisal.
    pub async fn create_manager_review(
        &self,
        actor: &Actor,
        input: CreateManagerReviewInput,
    ) -> AppResult<manager_review::Model> {
        input.validate()?;
        self.check_review_ratings(&input.content)?;

        let appraisal = self
            .appraisal_for(actor, input.appraisal_id, AppraisalAction::WriteManagerReview)
            .await?;
        ensure_draft(&appraisal)?;

        if self
            .manager_review_repo
            .find_by_appraisal(self.db.as_ref(), appraisal.id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Appraisal {} already has a manager review",
                appraisal.id
            )));
        }

        let now = Utc::now();
        let mut model = manager_review_changes(input.content);
        model.appraisal_id = Set(appraisal.id);
        model.manager_id = Set(appraisal.manager_id);
        model.status = Set(AssessmentStatus::Draft);
        model.created_at = Set(now.into());
        model.submitted_at = Set(None);

        let created = self.manager_review_repo.create(model).await?;
        debug!(manager_review_id = created.id, appraisal_id = appraisal.id, "Manager review started");
        Ok(created)
    }

    /// Replace the content of a draft manager review.
    pub async fn update_manager_review(
        &self,
        actor: &Actor,
        id: i32,
        content: ManagerReviewContent,
    ) -> AppResult<manager_review::Model> {
        content.validate()?;
        self.check_review_ratings(&content)?;

        let existing = self.manager_review_repo.get_by_id(id).await?;
        self.appraisal_for(actor, existing.appraisal_id, AppraisalAction::WriteManagerReview)
            .await?;
        if existing.status != AssessmentStatus::Draft {
            return Err(AppError::InvalidOperation(
                "A submitted manager review cannot be edited".to_string(),
            ));
        }

        let updated = self
            .manager_review_repo
            .update_draft(self.db.as_ref(), id, manager_review_changes(content))
            .await?;
        if !updated {
            return Err(AppError::InvalidOperation(
                "A submitted manager review cannot be edited".to_string(),
            ));
        }

        self.manager_review_repo.get_by_id(id).await
    }

    /// Submit a manager review. Submitting again is a no-op.
    pub async fn submit_manager_review(
        &self,
        actor: &Actor,
        id: i32,
    ) -> AppResult<Submission<manager_review::Model>> {
        let existing = self.manager_review_repo.get_by_id(id).await?;
        let appraisal = self
            .appraisal_for(actor, existing.appraisal_id, AppraisalAction::WriteManagerReview)
            .await?;

        let txn = begin(&self.db).await?;
        let locked = self.appraisal_repo.lock(&txn, appraisal.id).await?;

        let mut enqueued = false;
        if existing.status == AssessmentStatus::Draft {
            ensure_accepts_submissions(&locked)?;
            let changes = manager_review::ActiveModel {
                status: Set(AssessmentTransition::Submit.target()),
                submitted_at: Set(existing.submitted_at.or_else(|| Some(Utc::now().into()))),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            };
            if self
                .manager_review_repo
                .update_draft(&txn, id, changes)
                .await?
            {
                info!(manager_review_id = id, appraisal_id = locked.id, "Manager review submitted");
                self.notifier
                    .enqueue(
                        &txn,
                        vec![NotificationIntent::new(
                            locked.employee_id,
                            NotificationType::ManagerReviewSubmitted,
                            "Manager review submitted",
                            format!("Your manager submitted the review for appraisal #{}", locked.id),
                        )
                        .with_link(link(locked.id))],
                    )
                    .await?;
                enqueued = true;
            }
        }

        let advance = self.advance(&txn, &locked).await?;
        commit(txn).await?;
        if enqueued || advance.enqueued {
            self.notifier.kick();
        }

        Ok(Submission {
            item: self.manager_review_repo.get_by_id(id).await?,
            appraisal_status: advance.status,
            advanced: advance.advanced,
            awaiting: advance.awaiting,
        })
    }

    /// Move a locked appraisal into review once both assessments are submitted.
    ///
    /// The compare-and-set decides which of two racing submitters notifies.
    async fn advance(
        &self,
        txn: &DatabaseTransaction,
        appraisal: &appraisal::Model,
    ) -> AppResult<Advance> {
        let own = self
            .self_assessment_repo
            .find_by_appraisal(txn, appraisal.id)
            .await?;
        let review = self
            .manager_review_repo
            .find_by_appraisal(txn, appraisal.id)
            .await?;

        let mut awaiting = Vec::new();
        if own.is_none_or(|s| s.status != AssessmentStatus::Submitted) {
            awaiting.push(Party::Employee);
        }
        if review.is_none_or(|r| r.status != AssessmentStatus::Submitted) {
            awaiting.push(Party::Manager);
        }

        let action = AppraisalTransition::BeginReview;
        if !awaiting.is_empty() || !action.sources().contains(&appraisal.status) {
            return Ok(Advance {
                status: appraisal.status,
                advanced: false,
                awaiting,
                enqueued: false,
            });
        }

        let changes = appraisal::ActiveModel {
            status: Set(action.target()),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        let won = self
            .appraisal_repo
            .update_if_status(txn, appraisal.id, action.sources(), changes)
            .await?;
        if !won {
            return Ok(Advance {
                status: appraisal.status,
                advanced: false,
                awaiting,
                enqueued: false,
            });
        }

        info!(appraisal_id = appraisal.id, "Appraisal moved to review");
        let hr = self.user_repo.find_active_ids_by_roles(&[UserRole::Hr]).await?;
        let recipients = [appraisal.employee_id, appraisal.manager_id]
            .into_iter()
            .chain(hr);
        self.notifier
            .enqueue(
                txn,
                NotificationIntent::fan_out(
                    recipients,
                    NotificationType::AppraisalStatusChanged,
                    "Appraisal under review",
                    &format!("Both assessments for appraisal #{} are in", appraisal.id),
                    &link(appraisal.id),
                ),
            )
            .await?;

        Ok(Advance {
            status: action.target(),
            advanced: true,
            awaiting,
            enqueued: true,
        })
    }

    fn check_self_ratings(&self, content: &SelfAssessmentContent) -> AppResult<()> {
        let max = self.config.rating_scale_max;
        scoring::validate_optional_rating("selfRating", content.self_rating, max)?;
        scoring::validate_optional_rating("performanceRating", content.performance_rating, max)?;
        scoring::validate_optional_rating(
            "technicalSkillsRating",
            content.technical_skills_rating,
            max,
        )?;
        scoring::validate_optional_rating(
            "communicationRating",
            content.communication_rating,
            max,
        )?;
        scoring::validate_optional_rating("teamworkRating", content.teamwork_rating, max)?;
        scoring::validate_optional_rating("leadershipRating", content.leadership_rating, max)
    }

    fn check_review_ratings(&self, content: &ManagerReviewContent) -> AppResult<()> {
        let max = self.config.rating_scale_max;
        scoring::validate_rating("performanceRating", content.performance_rating, max)?;
        scoring::validate_rating(
            "technicalSkillsRating",
            content.technical_skills_rating,
            max,
        )?;
        scoring::validate_rating("communicationRating", content.communication_rating, max)?;
        scoring::validate_rating("teamworkRating", content.teamwork_rating, max)?;
        scoring::validate_rating("leadershipRating", content.leadership_rating, max)
    }
}

fn ensure_draft(appraisal: &appraisal::Model) -> AppResult<()> {
    if appraisal.status == AppraisalStatus::Draft {
        Ok(())
    } else {
        Err(AppError::InvalidOperation(format!(
            "Appraisal {} is {:?}, assessments can only be started while it is a draft",
            appraisal.id, appraisal.status
        )))
    }
}

fn ensure_accepts_submissions(appraisal: &appraisal::Model) -> AppResult<()> {
    if AppraisalTransition::BeginReview
        .sources()
        .contains(&appraisal.status)
    {
        Ok(())
    } else {
        Err(AppError::InvalidOperation(format!(
            "Appraisal {} is {:?} and no longer accepts submissions",
            appraisal.id, appraisal.status
        )))
    }
}

fn self_assessment_changes(content: SelfAssessmentContent) -> self_assessment::ActiveModel {
    self_assessment::ActiveModel {
        accomplishments: Set(content.accomplishments),
        challenges: Set(content.challenges),
        goals_achieved: Set(content.goals_achieved),
        future_development: Set(content.future_development),
        self_rating: Set(content.self_rating),
        performance_rating: Set(content.performance_rating),
        technical_skills_rating: Set(content.technical_skills_rating),
        communication_rating: Set(content.communication_rating),
        teamwork_rating: Set(content.teamwork_rating),
        leadership_rating: Set(content.leadership_rating),
        additional_comments: Set(content.additional_comments),
        updated_at: Set(Utc::now().into()),
        ..Default::default()
    }
}

fn manager_review_changes(content: ManagerReviewContent) -> manager_review::ActiveModel {
    manager_review::ActiveModel {
        performance_rating: Set(content.performance_rating),
        technical_skills_rating: Set(content.technical_skills_rating),
        communication_rating: Set(content.communication_rating),
        teamwork_rating: Set(content.teamwork_rating),
        leadership_rating: Set(content.leadership_rating),
        strengths: Set(content.strengths),
        areas_for_improvement: Set(content.areas_for_improvement),
        manager_comments: Set(content.manager_comments),
        recommended_actions: Set(content.recommended_actions),
        updated_at: Set(Utc::now().into()),
        ..Default::default()
    }
}
