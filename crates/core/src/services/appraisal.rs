//! Appraisal service: creation, HR actions and the scorecard.

use std::sync::Arc;

use appraisal_common::config::AppraisalConfig;
use appraisal_common::{AppError, AppResult, Page, PageRequest};
use appraisal_db::{
    entities::{
        appraisal::{self, AppraisalStatus},
        manager_review, notification::NotificationType, self_assessment,
    },
    repositories::{
        AppealFilter, AppealRepository, AppraisalFilter, AppraisalRepository,
        ManagerReviewRepository, SelfAssessmentRepository, UserRepository,
    },
};
use chrono::{NaiveDate, Utc};
use sea_orm::{DatabaseConnection, Set};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::notification::{NotificationIntent, Notifier};
use super::{begin, commit, require_text};
use crate::lifecycle::{AppraisalTransition, Transition};
use crate::policy::{self, Actor, AppraisalAction, Parties};
use crate::scoring::{self, Scorecard};

/// Statuses in which the overall rating may still change.
const RATING_EDITABLE: [AppraisalStatus; 3] = [
    AppraisalStatus::Draft,
    AppraisalStatus::Submitted,
    AppraisalStatus::UnderReview,
];

/// Appraisal service.
#[derive(Clone)]
pub struct AppraisalService {
    db: Arc<DatabaseConnection>,
    appraisal_repo: AppraisalRepository,
    self_assessment_repo: SelfAssessmentRepository,
    manager_review_repo: ManagerReviewRepository,
    appeal_repo: AppealRepository,
    user_repo: UserRepository,
    notifier: Notifier,
    config: AppraisalConfig,
}

/// Input for opening an appraisal.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppraisalInput {
    pub employee_id: i32,
    pub manager_id: i32,
    pub review_period_start: NaiveDate,
    pub review_period_end: NaiveDate,

    #[validate(length(max = 4000))]
    pub comments: Option<String>,
}

/// Input for editing an appraisal.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppraisalInput {
    pub review_period_start: Option<NaiveDate>,
    pub review_period_end: Option<NaiveDate>,

    #[validate(length(max = 4000))]
    pub comments: Option<String>,

    pub overall_rating: Option<f64>,
}

/// Optional note attached to an HR action.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AppraisalActionInput {
    #[validate(length(max = 4000))]
    pub comments: Option<String>,
}

impl AppraisalService {
    /// Create a new appraisal service.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        appraisal_repo: AppraisalRepository,
        self_assessment_repo: SelfAssessmentRepository,
        manager_review_repo: ManagerReviewRepository,
        appeal_repo: AppealRepository,
        user_repo: UserRepository,
        notifier: Notifier,
        config: AppraisalConfig,
    ) -> Self {
        Self {
            db,
            appraisal_repo,
            self_assessment_repo,
            manager_review_repo,
            appeal_repo,
            user_repo,
            notifier,
            config,
        }
    }

    async fn load(
        &self,
        actor: &Actor,
        id: i32,
        action: AppraisalAction,
    ) -> AppResult<appraisal::Model> {
        let appraisal = self
            .appraisal_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Appraisal {id}")))?;

        policy::authorize(actor, action, Parties::from(&appraisal))
            .check(|| format!("Appraisal {id}"))?;

        Ok(appraisal)
    }

    /// Get an appraisal visible to the caller.
    pub async fn get(&self, actor: &Actor, id: i32) -> AppResult<appraisal::Model> {
        self.load(actor, id, AppraisalAction::View).await
    }

    /// Page through appraisals, intersected with the caller's scope.
    pub async fn list(
        &self,
        actor: &Actor,
        filter: AppraisalFilter,
        page: PageRequest,
    ) -> AppResult<Page<appraisal::Model>> {
        match policy::scope_appraisals(actor, filter) {
            Some(filter) => self.appraisal_repo.find_page(&filter, page).await,
            None => Ok(Page::empty(page)),
        }
    }

    /// Appraisals of one employee.
    pub async fn list_by_employee(
        &self,
        actor: &Actor,
        employee_id: i32,
        page: PageRequest,
    ) -> AppResult<Page<appraisal::Model>> {
        let filter = AppraisalFilter {
            employee_id: Some(employee_id),
            ..Default::default()
        };
        self.list(actor, filter, page).await
    }

    /// Appraisals run by one manager.
    pub async fn list_by_manager(
        &self,
        actor: &Actor,
        manager_id: i32,
        page: PageRequest,
    ) -> AppResult<Page<appraisal::Model>> {
        let filter = AppraisalFilter {
            manager_id: Some(manager_id),
            ..Default::default()
        };
        self.list(actor, filter, page).await
    }

    /// Open an appraisal (HR/Admin).
    pub async fn create(
        &self,
        actor: &Actor,
        input: CreateAppraisalInput,
    ) -> AppResult<appraisal::Model> {
        actor.require_elevated()?;
        input.validate()?;

        if input.employee_id == input.manager_id {
            return Err(AppError::Validation(
                "Employee and manager must differ".to_string(),
            ));
        }
        check_period(input.review_period_start, input.review_period_end)?;

        let employee = self.user_repo.find_by_id(input.employee_id).await?;
        if !employee.as_ref().is_some_and(|u| u.is_active) {
            return Err(AppError::Validation(format!(
                "Employee {} is not an active user",
                input.employee_id
            )));
        }
        let manager = self.user_repo.find_by_id(input.manager_id).await?;
        match manager {
            Some(m) if m.is_active && m.role.can_manage() => {}
            _ => {
                return Err(AppError::Validation(format!(
                    "User {} cannot manage an appraisal",
                    input.manager_id
                )));
            }
        }

        let now = Utc::now();
        let model = appraisal::ActiveModel {
            employee_id: Set(input.employee_id),
            manager_id: Set(input.manager_id),
            review_period_start: Set(input.review_period_start),
            review_period_end: Set(input.review_period_end),
            status: Set(AppraisalStatus::Draft),
            overall_rating: Set(None),
            comments: Set(input.comments),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            completed_at: Set(None),
            ..Default::default()
        };

        let appraisal = self.appraisal_repo.create(model).await?;
        info!(appraisal_id = appraisal.id, by = actor.id, "Appraisal created");

        self.notifier
            .enqueue_detached(NotificationIntent::fan_out(
                [appraisal.employee_id, appraisal.manager_id],
                NotificationType::AppraisalCreated,
                "New appraisal",
                &format!(
                    "An appraisal for {} to {} was opened",
                    appraisal.review_period_start, appraisal.review_period_end
                ),
                &link(appraisal.id),
            ))
            .await;

        Ok(appraisal)
    }

    /// Edit period, comments and, before completion, the overall rating.
    pub async fn update(
        &self,
        actor: &Actor,
        id: i32,
        input: UpdateAppraisalInput,
    ) -> AppResult<appraisal::Model> {
        input.validate()?;
        let appraisal = self.load(actor, id, AppraisalAction::Administer).await?;

        let start = input
            .review_period_start
            .unwrap_or(appraisal.review_period_start);
        let end = input.review_period_end.unwrap_or(appraisal.review_period_end);
        check_period(start, end)?;

        let mut changes = appraisal::ActiveModel {
            review_period_start: Set(start),
            review_period_end: Set(end),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        if let Some(comments) = input.comments {
            changes.comments = Set(Some(comments));
        }
        if let Some(rating) = input.overall_rating {
            if !RATING_EDITABLE.contains(&appraisal.status) {
                return Err(AppError::InvalidOperation(
                    "Overall rating is locked once the appraisal is completed".to_string(),
                ));
            }
            scoring::validate_rating("overallRating", rating, self.config.rating_scale_max)?;
            changes.overall_rating = Set(Some(scoring::round_to(rating, 2)));
        }

        let updated = self
            .appraisal_repo
            .update_if_status(self.db.as_ref(), id, &[appraisal.status], changes)
            .await?;
        if !updated {
            return Err(AppError::InvalidOperation(
                "Appraisal changed status during the update".to_string(),
            ));
        }

        self.appraisal_repo.get_by_id(id).await
    }

    /// Approve an appraisal under review.
    ///
    /// `completed_at` is only set the first time. Without an explicit rating
    /// the manager review's weighted mean becomes the overall rating.
    pub async fn approve(
        &self,
        actor: &Actor,
        id: i32,
        input: AppraisalActionInput,
    ) -> AppResult<appraisal::Model> {
        input.validate()?;
        let appraisal = self.load(actor, id, AppraisalAction::Administer).await?;
        let action = AppraisalTransition::Approve;
        let status = action.apply(appraisal.status)?;

        let rating = match appraisal.overall_rating {
            Some(rating) => Some(rating),
            None => self
                .manager_review_repo
                .find_by_appraisal(self.db.as_ref(), id)
                .await?
                .and_then(|r| scoring::overall_rating(&r, &self.config.section_weights)),
        };

        let now = Utc::now();
        let mut changes = appraisal::ActiveModel {
            status: Set(status),
            overall_rating: Set(rating),
            completed_at: Set(appraisal.completed_at.or_else(|| Some(now.into()))),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        if let Some(comments) = input.comments {
            changes.comments = Set(Some(comments));
        }

        self.transition(&appraisal, action, changes).await?;
        info!(appraisal_id = id, by = actor.id, "Appraisal approved");

        self.appraisal_repo.get_by_id(id).await
    }

    /// Send an appraisal under review back to draft. Comments are required.
    ///
    /// Both assessments reopen so their owners can revise them.
    pub async fn return_to_draft(
        &self,
        actor: &Actor,
        id: i32,
        input: AppraisalActionInput,
    ) -> AppResult<appraisal::Model> {
        input.validate()?;
        let comments = require_text("comments", input.comments.as_deref())?;
        let appraisal = self.load(actor, id, AppraisalAction::Administer).await?;
        let action = AppraisalTransition::Return;
        let status = action.apply(appraisal.status)?;

        let changes = appraisal::ActiveModel {
            status: Set(status),
            comments: Set(Some(comments)),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };

        self.transition(&appraisal, action, changes).await?;
        info!(appraisal_id = id, by = actor.id, "Appraisal returned to draft");

        self.appraisal_repo.get_by_id(id).await
    }

    /// Reopen a completed appraisal for review (HR/Admin).
    ///
    /// `completed_at` and the overall rating are kept.
    pub async fn unlock(
        &self,
        actor: &Actor,
        id: i32,
        input: AppraisalActionInput,
    ) -> AppResult<appraisal::Model> {
        input.validate()?;
        let appraisal = self.load(actor, id, AppraisalAction::Administer).await?;
        let action = AppraisalTransition::Unlock;
        let status = action.apply(appraisal.status)?;

        let mut changes = appraisal::ActiveModel {
            status: Set(status),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        if let Some(comments) = input.comments {
            changes.comments = Set(Some(comments));
        }

        self.transition(&appraisal, action, changes).await?;
        info!(appraisal_id = id, by = actor.id, "Appraisal unlocked");

        self.appraisal_repo.get_by_id(id).await
    }

    /// Delete an appraisal no appeal references (HR/Admin).
    pub async fn delete(&self, actor: &Actor, id: i32) -> AppResult<()> {
        self.load(actor, id, AppraisalAction::Administer).await?;

        let appeals = self
            .appeal_repo
            .count(&AppealFilter {
                appraisal_id: Some(id),
                ..Default::default()
            })
            .await?;
        if appeals > 0 {
            return Err(AppError::Conflict(format!(
                "Appraisal {id} is referenced by {appeals} appeal(s)"
            )));
        }

        self.appraisal_repo.delete(id).await?;
        info!(appraisal_id = id, by = actor.id, "Appraisal deleted");
        Ok(())
    }

    /// Side-by-side scores of the two raters.
    pub async fn scorecard(&self, actor: &Actor, id: i32) -> AppResult<Scorecard> {
        let appraisal = self.load(actor, id, AppraisalAction::View).await?;
        let parties = Parties::from(&appraisal);

        let review: Option<manager_review::Model> = self
            .manager_review_repo
            .find_by_appraisal(self.db.as_ref(), id)
            .await?
            .filter(|r| {
                let submitted = r.status == manager_review::AssessmentStatus::Submitted;
                policy::can_view_manager_review(actor, parties, submitted)
            });
        let assessment: Option<self_assessment::Model> = self
            .self_assessment_repo
            .find_by_appraisal(self.db.as_ref(), id)
            .await?;

        Ok(Scorecard::build(
            id,
            &self.config.section_weights,
            self.config.rating_scale_max,
            review.as_ref(),
            assessment.as_ref(),
        ))
    }

    /// Persist an HR transition with its notifications in one transaction.
    ///
    /// The compare-and-set on the action's source states makes a lost race
    /// an `InvalidOperation`. Returning to draft also reopens both assessments.
    async fn transition(
        &self,
        appraisal: &appraisal::Model,
        action: AppraisalTransition,
        changes: appraisal::ActiveModel,
    ) -> AppResult<()> {
        let txn = begin(&self.db).await?;

        let won = self
            .appraisal_repo
            .update_if_status(&txn, appraisal.id, action.sources(), changes)
            .await?;
        if !won {
            return Err(AppError::InvalidOperation(format!(
                "Appraisal {} changed status concurrently",
                appraisal.id
            )));
        }

        if action == AppraisalTransition::Return {
            self.self_assessment_repo.reopen(&txn, appraisal.id).await?;
            self.manager_review_repo.reopen(&txn, appraisal.id).await?;
        }

        let status = action.target();
        self.notifier
            .enqueue(
                &txn,
                NotificationIntent::fan_out(
                    [appraisal.employee_id, appraisal.manager_id],
                    NotificationType::AppraisalStatusChanged,
                    "Appraisal status changed",
                    &format!("Appraisal #{} is now {status:?}", appraisal.id),
                    &link(appraisal.id),
                ),
            )
            .await?;

        commit(txn).await?;
        self.notifier.kick();
        Ok(())
    }
}

/// Deep link to an appraisal.
pub(crate) fn link(id: i32) -> String {
    format!("/appraisals/{id}")
}

fn check_period(start: NaiveDate, end: NaiveDate) -> AppResult<()> {
    if start < end {
        Ok(())
    } else {
        Err(AppError::Validation(
            "Review period start must be before its end".to_string(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use appraisal_db::entities::user::UserRole;
    use appraisal_db::repositories::OutboxRepository;
    use appraisal_db::test_utils::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    const EMPLOYEE: i32 = 10;
    const MANAGER: i32 = 20;

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn empty() -> Arc<DatabaseConnection> {
        Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
    }

    struct Dbs {
        txn: Arc<DatabaseConnection>,
        appraisal: Arc<DatabaseConnection>,
        users: Arc<DatabaseConnection>,
        appeals: Arc<DatabaseConnection>,
    }

    impl Default for Dbs {
        fn default() -> Self {
            Self {
                txn: empty(),
                appraisal: empty(),
                users: empty(),
                appeals: empty(),
            }
        }
    }

    fn service(dbs: Dbs) -> AppraisalService {
        AppraisalService::new(
            dbs.txn.clone(),
            AppraisalRepository::new(dbs.appraisal),
            SelfAssessmentRepository::new(dbs.txn.clone()),
            ManagerReviewRepository::new(dbs.txn.clone()),
            AppealRepository::new(dbs.appeals),
            UserRepository::new(dbs.users),
            Notifier::new(dbs.txn.clone(), OutboxRepository::new(dbs.txn)),
            AppraisalConfig::default(),
        )
    }

    fn hr() -> Actor {
        Actor::new(1, UserRole::Hr)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_create_rejects_same_employee_and_manager() {
        let input = CreateAppraisalInput {
            employee_id: EMPLOYEE,
            manager_id: EMPLOYEE,
            review_period_start: date(2024, 1, 1),
            review_period_end: date(2024, 12, 31),
            comments: None,
        };

        let result = service(Dbs::default()).create(&hr(), input).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_inverted_period() {
        let input = CreateAppraisalInput {
            employee_id: EMPLOYEE,
            manager_id: MANAGER,
            review_period_start: date(2024, 12, 31),
            review_period_end: date(2024, 12, 31),
            comments: None,
        };

        let result = service(Dbs::default()).create(&hr(), input).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_requires_manager_role() {
        let users = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::user(EMPLOYEE, UserRole::Employee, None)]])
                .append_query_results([[fixtures::user(MANAGER, UserRole::Employee, None)]])
                .into_connection(),
        );
        let input = CreateAppraisalInput {
            employee_id: EMPLOYEE,
            manager_id: MANAGER,
            review_period_start: date(2024, 1, 1),
            review_period_end: date(2024, 12, 31),
            comments: None,
        };

        let result = service(Dbs {
            users,
            ..Default::default()
        })
        .create(&hr(), input)
        .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_opens_draft() {
        let users = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::user(EMPLOYEE, UserRole::Employee, None)]])
                .append_query_results([[fixtures::user(MANAGER, UserRole::Manager, None)]])
                .into_connection(),
        );
        let appraisal = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::appraisal(
                    5,
                    EMPLOYEE,
                    MANAGER,
                    AppraisalStatus::Draft,
                )]])
                .into_connection(),
        );
        let txn = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(2)])
                .into_connection(),
        );
        let input = CreateAppraisalInput {
            employee_id: EMPLOYEE,
            manager_id: MANAGER,
            review_period_start: date(2024, 1, 1),
            review_period_end: date(2024, 12, 31),
            comments: Some("Annual review".to_string()),
        };

        let created = service(Dbs {
            txn,
            appraisal,
            users,
            ..Default::default()
        })
        .create(&hr(), input)
        .await
        .unwrap();

        assert_eq!(created.status, AppraisalStatus::Draft);
    }

    #[tokio::test]
    async fn test_outsider_gets_not_found() {
        let appraisal = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::appraisal(
                    5,
                    EMPLOYEE,
                    MANAGER,
                    AppraisalStatus::Draft,
                )]])
                .into_connection(),
        );

        let result = service(Dbs {
            appraisal,
            ..Default::default()
        })
        .get(&Actor::new(99, UserRole::Employee), 5)
        .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_employee_cannot_approve() {
        let appraisal = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::appraisal(
                    5,
                    EMPLOYEE,
                    MANAGER,
                    AppraisalStatus::UnderReview,
                )]])
                .into_connection(),
        );

        let result = service(Dbs {
            appraisal,
            ..Default::default()
        })
        .approve(
            &Actor::new(EMPLOYEE, UserRole::Employee),
            5,
            AppraisalActionInput::default(),
        )
        .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_approve_requires_under_review() {
        let appraisal = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::appraisal(
                    5,
                    EMPLOYEE,
                    MANAGER,
                    AppraisalStatus::Draft,
                )]])
                .into_connection(),
        );

        let result = service(Dbs {
            appraisal,
            ..Default::default()
        })
        .approve(&hr(), 5, AppraisalActionInput::default())
        .await;

        assert!(matches!(result, Err(AppError::InvalidOperation(_))));
    }

    #[tokio::test]
    async fn test_approve_completes_and_rates() {
        let under_review = fixtures::appraisal(5, EMPLOYEE, MANAGER, AppraisalStatus::UnderReview);
        let mut completed = fixtures::appraisal(5, EMPLOYEE, MANAGER, AppraisalStatus::Completed);
        completed.overall_rating = Some(3.45);

        let appraisal = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[under_review]])
                .append_query_results([[completed]])
                .into_connection(),
        );
        let txn = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::manager_review(
                    1,
                    5,
                    MANAGER,
                    manager_review::AssessmentStatus::Submitted,
                )]])
                // CAS, outbox
                .append_exec_results([exec(1), exec(2)])
                .into_connection(),
        );

        let result = service(Dbs {
            txn,
            appraisal,
            ..Default::default()
        })
        .approve(&hr(), 5, AppraisalActionInput::default())
        .await
        .unwrap();

        assert_eq!(result.status, AppraisalStatus::Completed);
        assert_eq!(result.overall_rating, Some(3.45));
        assert!(result.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_approve_lost_race() {
        let mut under_review =
            fixtures::appraisal(5, EMPLOYEE, MANAGER, AppraisalStatus::UnderReview);
        under_review.overall_rating = Some(4.0);

        let appraisal = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[under_review]])
                .into_connection(),
        );
        let txn = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0)])
                .into_connection(),
        );

        let result = service(Dbs {
            txn,
            appraisal,
            ..Default::default()
        })
        .approve(&hr(), 5, AppraisalActionInput::default())
        .await;

        assert!(matches!(result, Err(AppError::InvalidOperation(_))));
    }

    #[tokio::test]
    async fn test_return_requires_comments() {
        let result = service(Dbs::default())
            .return_to_draft(
                &hr(),
                5,
                AppraisalActionInput {
                    comments: Some("   ".to_string()),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_return_reopens_assessments() {
        let appraisal = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::appraisal(
                    5,
                    EMPLOYEE,
                    MANAGER,
                    AppraisalStatus::UnderReview,
                )]])
                .append_query_results([[fixtures::appraisal(
                    5,
                    EMPLOYEE,
                    MANAGER,
                    AppraisalStatus::Draft,
                )]])
                .into_connection(),
        );
        // CAS, reopen self-assessment, reopen manager review, outbox
        let txn = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(1), exec(1), exec(2)])
                .into_connection(),
        );

        let result = service(Dbs {
            txn,
            appraisal,
            ..Default::default()
        })
        .return_to_draft(
            &hr(),
            5,
            AppraisalActionInput {
                comments: Some("Ratings need evidence".to_string()),
            },
        )
        .await
        .unwrap();

        assert_eq!(result.status, AppraisalStatus::Draft);
    }

    #[tokio::test]
    async fn test_unlock_keeps_completion_history() {
        let completed = fixtures::appraisal(5, EMPLOYEE, MANAGER, AppraisalStatus::Completed);
        let mut reopened = completed.clone();
        reopened.status = AppraisalStatus::UnderReview;

        let appraisal = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[completed.clone()]])
                .append_query_results([[reopened]])
                .into_connection(),
        );
        let txn = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(2)])
                .into_connection(),
        );

        let result = service(Dbs {
            txn,
            appraisal,
            ..Default::default()
        })
        .unlock(&hr(), 5, AppraisalActionInput::default())
        .await
        .unwrap();

        assert_eq!(result.status, AppraisalStatus::UnderReview);
        assert_eq!(result.completed_at, completed.completed_at);
        assert_eq!(result.overall_rating, completed.overall_rating);
    }

    #[tokio::test]
    async fn test_rating_locked_after_completion() {
        let appraisal = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::appraisal(
                    5,
                    EMPLOYEE,
                    MANAGER,
                    AppraisalStatus::Completed,
                )]])
                .into_connection(),
        );

        let result = service(Dbs {
            appraisal,
            ..Default::default()
        })
        .update(
            &hr(),
            5,
            UpdateAppraisalInput {
                overall_rating: Some(4.5),
                ..Default::default()
            },
        )
        .await;

        assert!(matches!(result, Err(AppError::InvalidOperation(_))));
    }

    #[tokio::test]
    async fn test_update_rechecks_period() {
        let appraisal = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::appraisal(
                    5,
                    EMPLOYEE,
                    MANAGER,
                    AppraisalStatus::Draft,
                )]])
                .into_connection(),
        );

        let result = service(Dbs {
            appraisal,
            ..Default::default()
        })
        .update(
            &hr(),
            5,
            UpdateAppraisalInput {
                review_period_end: Some(date(2023, 6, 30)),
                ..Default::default()
            },
        )
        .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_blocked_by_appeal() {
        let appraisal = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::appraisal(
                    5,
                    EMPLOYEE,
                    MANAGER,
                    AppraisalStatus::Appealed,
                )]])
                .into_connection(),
        );
        let appeals = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(1))
                }]])
                .into_connection(),
        );

        let result = service(Dbs {
            appraisal,
            appeals,
            ..Default::default()
        })
        .delete(&hr(), 5)
        .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_employee_list_for_other_employee_is_empty() {
        // No query results: the scoped filter never reaches the database.
        let page = service(Dbs::default())
            .list(
                &Actor::new(EMPLOYEE, UserRole::Employee),
                AppraisalFilter {
                    employee_id: Some(11),
                    ..Default::default()
                },
                PageRequest::clamped(None, None, 10, 100),
            )
            .await
            .unwrap();

        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 0);
    }

    #[tokio::test]
    async fn test_scorecard_hides_draft_review_from_employee() {
        let appraisal = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::appraisal(
                    5,
                    EMPLOYEE,
                    MANAGER,
                    AppraisalStatus::Draft,
                )]])
                .into_connection(),
        );
        let txn = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::manager_review(
                    1,
                    5,
                    MANAGER,
                    manager_review::AssessmentStatus::Draft,
                )]])
                .append_query_results([[fixtures::self_assessment(
                    1,
                    5,
                    EMPLOYEE,
                    self_assessment::AssessmentStatus::Draft,
                )]])
                .into_connection(),
        );

        let card = service(Dbs {
            txn,
            appraisal,
            ..Default::default()
        })
        .scorecard(&Actor::new(EMPLOYEE, UserRole::Employee), 5)
        .await
        .unwrap();

        assert_eq!(card.manager_score, None);
        assert!(card.self_score.is_some());
    }
}
