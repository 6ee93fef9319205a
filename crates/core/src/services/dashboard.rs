//! Role dashboards.

use std::collections::BTreeMap;
use std::sync::Arc;

use appraisal_common::config::AppraisalConfig;
use appraisal_common::{AppError, AppResult, PageRequest};
use appraisal_db::{
    entities::{
        appeal::{self, AppealStatus},
        appraisal::{self, AppraisalStatus},
        goal, manager_review, meeting, self_assessment,
        self_assessment::AssessmentStatus,
    },
    repositories::{
        AppealFilter, AppealRepository, AppraisalFilter, AppraisalRepository, GoalRepository,
        ManagerReviewRepository, MeetingFilter, MeetingRepository, SelfAssessmentRepository,
        UserRepository,
    },
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::lifecycle::MeetingTransition;
use crate::policy::Actor;
use crate::scoring::{self, RatingBand};

/// Appraisal statuses that still need work.
const PENDING: [AppraisalStatus; 4] = [
    AppraisalStatus::Draft,
    AppraisalStatus::Submitted,
    AppraisalStatus::UnderReview,
    AppraisalStatus::Appealed,
];

/// Rows in the "recent" and "upcoming" lists.
const RECENT: u64 = 5;

/// Ratings rounded to whole points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingBucket {
    pub rating: i64,
    pub count: u64,
}

/// Appraisals per rating band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandBucket {
    pub band: RatingBand,
    pub count: u64,
}

/// HR overview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HrDashboard {
    pub total_appraisals: u64,
    pub pending_appraisals: u64,
    pub completed_appraisals: u64,
    pub total_appeals: u64,
    pub pending_appeals: u64,
    pub average_rating: Option<f64>,
    /// Percentage of appraisals completed, one decimal.
    pub completion_rate: f64,
    pub rating_distribution: Vec<RatingBucket>,
    pub band_distribution: Vec<BandBucket>,
    pub recent_appraisals: Vec<appraisal::Model>,
    pub recent_appeals: Vec<appeal::Model>,
}

/// A manager's overview of their team.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerDashboard {
    pub direct_reports: u64,
    pub pending_reviews: u64,
    pub completed_reviews: u64,
    pub upcoming_meetings: Vec<meeting::Model>,
}

/// An employee's own overview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDashboard {
    pub current_appraisal: Option<appraisal::Model>,
    pub self_assessment: Option<self_assessment::Model>,
    /// Only once the manager has submitted it.
    pub manager_review: Option<manager_review::Model>,
    pub active_goals: Vec<goal::Model>,
    pub upcoming_meetings: Vec<meeting::Model>,
    pub appeals: Vec<appeal::Model>,
}

/// Dashboard service.
#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DatabaseConnection>,
    appraisal_repo: AppraisalRepository,
    self_assessment_repo: SelfAssessmentRepository,
    manager_review_repo: ManagerReviewRepository,
    meeting_repo: MeetingRepository,
    goal_repo: GoalRepository,
    appeal_repo: AppealRepository,
    user_repo: UserRepository,
    config: AppraisalConfig,
}

impl DashboardService {
    /// Create a new dashboard service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        appraisal_repo: AppraisalRepository,
        self_assessment_repo: SelfAssessmentRepository,
        manager_review_repo: ManagerReviewRepository,
        meeting_repo: MeetingRepository,
        goal_repo: GoalRepository,
        appeal_repo: AppealRepository,
        user_repo: UserRepository,
        config: AppraisalConfig,
    ) -> Self {
        Self {
            db,
            appraisal_repo,
            self_assessment_repo,
            manager_review_repo,
            meeting_repo,
            goal_repo,
            appeal_repo,
            user_repo,
            config,
        }
    }

    /// Organisation-wide figures (HR/Admin).
    pub async fn hr(&self, actor: &Actor) -> AppResult<HrDashboard> {
        actor.require_elevated()?;
        let recent = PageRequest { page: 1, limit: RECENT };

        let total_appraisals = self.appraisal_repo.count(&AppraisalFilter::default()).await?;
        let pending_appraisals = self
            .appraisal_repo
            .count(&AppraisalFilter {
                statuses: PENDING.to_vec(),
                ..Default::default()
            })
            .await?;
        let completed_appraisals = self
            .appraisal_repo
            .count(&AppraisalFilter {
                statuses: vec![AppraisalStatus::Completed],
                ..Default::default()
            })
            .await?;

        let total_appeals = self.appeal_repo.count(&AppealFilter::default()).await?;
        let pending_appeals = self
            .appeal_repo
            .count(&AppealFilter {
                statuses: AppealStatus::OPEN.to_vec(),
                ..Default::default()
            })
            .await?;

        let ratings = self.appraisal_repo.find_completed_ratings().await?;
        let recent_appraisals = self
            .appraisal_repo
            .find_page(&AppraisalFilter::default(), recent)
            .await?
            .items;
        let recent_appeals = self
            .appeal_repo
            .find_page(&AppealFilter::default(), recent)
            .await?
            .items;

        Ok(HrDashboard {
            total_appraisals,
            pending_appraisals,
            completed_appraisals,
            total_appeals,
            pending_appeals,
            average_rating: average(&ratings),
            completion_rate: completion_rate(completed_appraisals, total_appraisals),
            rating_distribution: rating_distribution(&ratings),
            band_distribution: band_distribution(&ratings, self.config.rating_scale_max),
            recent_appraisals,
            recent_appeals,
        })
    }

    /// The caller's team as a manager.
    pub async fn manager(&self, actor: &Actor) -> AppResult<ManagerDashboard> {
        if !actor.role.can_manage() {
            return Err(AppError::Forbidden(
                "Manager dashboard requires a managing role".to_string(),
            ));
        }

        let direct_reports = self.user_repo.count_direct_reports(actor.id).await?;
        let pending_reviews = self
            .appraisal_repo
            .count(&AppraisalFilter {
                manager_id: Some(actor.id),
                statuses: PENDING.to_vec(),
                ..Default::default()
            })
            .await?;
        let completed_reviews = self
            .appraisal_repo
            .count(&AppraisalFilter {
                manager_id: Some(actor.id),
                statuses: vec![AppraisalStatus::Completed],
                ..Default::default()
            })
            .await?;
        let upcoming_meetings = self
            .upcoming(MeetingFilter {
                manager_id: Some(actor.id),
                ..Default::default()
            })
            .await?;

        Ok(ManagerDashboard {
            direct_reports,
            pending_reviews,
            completed_reviews,
            upcoming_meetings,
        })
    }

    /// The caller's own appraisal state.
    pub async fn employee(&self, actor: &Actor) -> AppResult<EmployeeDashboard> {
        let current_appraisal = self.appraisal_repo.find_latest_by_employee(actor.id).await?;

        let (self_assessment, manager_review) = match &current_appraisal {
            Some(a) => {
                let own = self
                    .self_assessment_repo
                    .find_by_appraisal(self.db.as_ref(), a.id)
                    .await?;
                let review = self
                    .manager_review_repo
                    .find_by_appraisal(self.db.as_ref(), a.id)
                    .await?
                    .filter(|r| r.status == AssessmentStatus::Submitted);
                (own, review)
            }
            None => (None, None),
        };

        let active_goals = self.goal_repo.find_active_by_employee(actor.id).await?;
        let upcoming_meetings = self
            .upcoming(MeetingFilter {
                employee_id: Some(actor.id),
                ..Default::default()
            })
            .await?;
        let appeals = self
            .appeal_repo
            .find_page(
                &AppealFilter {
                    employee_id: Some(actor.id),
                    ..Default::default()
                },
                PageRequest::clamped(
                    None,
                    None,
                    self.config.default_page_size,
                    self.config.max_page_size,
                ),
            )
            .await?
            .items;

        Ok(EmployeeDashboard {
            current_appraisal,
            self_assessment,
            manager_review,
            active_goals,
            upcoming_meetings,
            appeals,
        })
    }

    async fn upcoming(&self, mut filter: MeetingFilter) -> AppResult<Vec<meeting::Model>> {
        filter.statuses = MeetingTransition::OPEN.to_vec();
        filter.scheduled_from = Some(Utc::now().into());

        let page = PageRequest { page: 1, limit: RECENT };
        Ok(self.meeting_repo.find_page(&filter, page).await?.items)
    }
}

fn average(ratings: &[f64]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
    Some(scoring::round_to(mean, 2))
}

fn completion_rate(completed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    scoring::round_to(completed as f64 / total as f64 * 100.0, 1)
}

fn rating_distribution(ratings: &[f64]) -> Vec<RatingBucket> {
    let mut buckets: BTreeMap<i64, u64> = BTreeMap::new();
    for rating in ratings {
        *buckets.entry(rating.round() as i64).or_default() += 1;
    }
    buckets
        .into_iter()
        .map(|(rating, count)| RatingBucket { rating, count })
        .collect()
}

fn band_distribution(ratings: &[f64], scale_max: f64) -> Vec<BandBucket> {
    let bands = [
        RatingBand::Unacceptable,
        RatingBand::Average,
        RatingBand::Satisfactory,
        RatingBand::Exceptional,
    ];
    bands
        .into_iter()
        .map(|band| BandBucket {
            band,
            count: ratings
                .iter()
                .filter(|r| RatingBand::from_percentage(*r / scale_max * 100.0) == band)
                .count() as u64,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use appraisal_db::entities::user::UserRole;
    use appraisal_db::test_utils::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};

    fn service(db: MockDatabase) -> DashboardService {
        let db = Arc::new(db.into_connection());
        DashboardService::new(
            db.clone(),
            AppraisalRepository::new(db.clone()),
            SelfAssessmentRepository::new(db.clone()),
            ManagerReviewRepository::new(db.clone()),
            MeetingRepository::new(db.clone()),
            GoalRepository::new(db.clone()),
            AppealRepository::new(db.clone()),
            UserRepository::new(db),
            AppraisalConfig::default(),
        )
    }

    fn count(n: i64) -> BTreeMap<&'static str, Value> {
        maplit::btreemap! { "num_items" => Value::BigInt(Some(n)) }
    }

    #[test]
    fn test_rating_distribution_rounds_to_whole_points() {
        let buckets = rating_distribution(&[3.45, 3.5, 4.2, 2.4]);

        assert_eq!(
            buckets,
            vec![
                RatingBucket { rating: 2, count: 1 },
                RatingBucket { rating: 3, count: 1 },
                RatingBucket { rating: 4, count: 2 },
            ]
        );
    }

    #[test]
    fn test_band_distribution_on_five_point_scale() {
        let buckets = band_distribution(&[4.5, 4.0, 3.5, 2.6, 1.0], 5.0);
        let counts: Vec<u64> = buckets.iter().map(|b| b.count).collect();

        // 20%, 52%, 70%, 80% and 90%
        assert_eq!(counts, vec![1, 1, 1, 2]);
    }

    #[test]
    fn test_completion_rate() {
        assert!((completion_rate(1, 3) - 33.3).abs() < f64::EPSILON);
        assert!(completion_rate(0, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_average_of_nothing_is_none() {
        assert_eq!(average(&[]), None);
        assert_eq!(average(&[3.0, 4.0]), Some(3.5));
    }

    #[tokio::test]
    async fn test_hr_dashboard_requires_elevated() {
        let result = service(MockDatabase::new(DatabaseBackend::Postgres))
            .hr(&Actor::new(20, UserRole::Manager))
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_employee_cannot_open_manager_dashboard() {
        let result = service(MockDatabase::new(DatabaseBackend::Postgres))
            .manager(&Actor::new(10, UserRole::Employee))
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_manager_dashboard_counts() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[count(4)]])
            .append_query_results([[count(3)]])
            .append_query_results([[count(1)]])
            .append_query_results([[count(1)]])
            .append_query_results([[fixtures::meeting(
                1,
                5,
                10,
                20,
                appraisal_db::entities::meeting::MeetingStatus::Scheduled,
            )]]);

        let dashboard = service(db)
            .manager(&Actor::new(20, UserRole::Manager))
            .await
            .unwrap();

        assert_eq!(dashboard.direct_reports, 4);
        assert_eq!(dashboard.pending_reviews, 3);
        assert_eq!(dashboard.completed_reviews, 1);
        assert_eq!(dashboard.upcoming_meetings.len(), 1);
    }
}
