//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use appraisal_common::{Config, config::AppraisalConfig};
use appraisal_core::services::token::extract_bearer_token;
use appraisal_core::{
    AppealService, AppraisalService, AssessmentService, AuthService, DashboardService,
    DocumentService, GoalService, MediationService, MeetingService, NotificationDispatcher,
    NotificationService, Notifier, TokenService, UserService,
};
use appraisal_db::repositories::{
    AppealRepository, AppraisalRepository, DocumentRepository, GoalRepository,
    ManagerReviewRepository, MediationRepository, MeetingRepository, NotificationRepository,
    OutboxRepository, SelfAssessmentRepository, UserRepository,
};
use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub token_service: TokenService,
    pub user_service: UserService,
    pub appraisal_service: AppraisalService,
    pub assessment_service: AssessmentService,
    pub meeting_service: MeetingService,
    pub appeal_service: AppealService,
    pub mediation_service: MediationService,
    pub goal_service: GoalService,
    pub document_service: DocumentService,
    pub notification_service: NotificationService,
    pub dashboard_service: DashboardService,
    pub config: AppraisalConfig,
}

impl AppState {
    /// Wire every repository and service over one connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, config: &Config) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let appraisal_repo = AppraisalRepository::new(Arc::clone(&db));
        let self_assessment_repo = SelfAssessmentRepository::new(Arc::clone(&db));
        let manager_review_repo = ManagerReviewRepository::new(Arc::clone(&db));
        let meeting_repo = MeetingRepository::new(Arc::clone(&db));
        let appeal_repo = AppealRepository::new(Arc::clone(&db));
        let mediation_repo = MediationRepository::new(Arc::clone(&db));
        let goal_repo = GoalRepository::new(Arc::clone(&db));
        let document_repo = DocumentRepository::new(Arc::clone(&db));
        let notification_repo = NotificationRepository::new(Arc::clone(&db));
        let outbox_repo = OutboxRepository::new(Arc::clone(&db));

        let dispatcher = NotificationDispatcher::new(
            Arc::clone(&db),
            outbox_repo.clone(),
            notification_repo.clone(),
        );
        let mut notifier = Notifier::new(Arc::clone(&db), outbox_repo);
        notifier.set_dispatcher(dispatcher);

        let token_service = TokenService::new(&config.auth);
        let appraisal_config = config.appraisal.clone();

        Self {
            auth_service: AuthService::new(user_repo.clone(), token_service.clone()),
            token_service,
            user_service: UserService::new(user_repo.clone()),
            appraisal_service: AppraisalService::new(
                Arc::clone(&db),
                appraisal_repo.clone(),
                self_assessment_repo.clone(),
                manager_review_repo.clone(),
                appeal_repo.clone(),
                user_repo.clone(),
                notifier.clone(),
                appraisal_config.clone(),
            ),
            assessment_service: AssessmentService::new(
                Arc::clone(&db),
                appraisal_repo.clone(),
                self_assessment_repo.clone(),
                manager_review_repo.clone(),
                user_repo.clone(),
                notifier.clone(),
                appraisal_config.clone(),
            ),
            meeting_service: MeetingService::new(
                appraisal_repo.clone(),
                meeting_repo.clone(),
                notifier.clone(),
            ),
            appeal_service: AppealService::new(
                Arc::clone(&db),
                appraisal_repo.clone(),
                appeal_repo.clone(),
                mediation_repo.clone(),
                user_repo.clone(),
                notifier.clone(),
                appraisal_config.clone(),
            ),
            mediation_service: MediationService::new(
                appraisal_repo.clone(),
                appeal_repo.clone(),
                mediation_repo,
                user_repo.clone(),
                notifier,
            ),
            goal_service: GoalService::new(
                appraisal_repo.clone(),
                goal_repo.clone(),
                user_repo.clone(),
            ),
            document_service: DocumentService::new(
                appraisal_repo.clone(),
                appeal_repo.clone(),
                document_repo,
            ),
            notification_service: NotificationService::new(Arc::clone(&db), notification_repo),
            dashboard_service: DashboardService::new(
                db,
                appraisal_repo,
                self_assessment_repo,
                manager_review_repo,
                meeting_repo,
                goal_repo,
                appeal_repo,
                user_repo,
                appraisal_config.clone(),
            ),
            config: appraisal_config,
        }
    }
}

/// Authentication middleware.
///
/// Installs the [`Actor`](appraisal_core::Actor) of a valid bearer token as a
/// request extension. Requests without one pass through; handlers that need
/// a caller reject them through the `AuthUser` extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = extract_bearer_token(auth_str)
        && let Ok(actor) = state.token_service.verify(token)
    {
        req.extensions_mut().insert(actor);
    }

    next.run(req).await
}
