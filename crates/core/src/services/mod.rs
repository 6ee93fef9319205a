#![allow(missing_docs)]

pub mod appeal;
pub mod appraisal;
pub mod assessment;
pub mod auth;
pub mod dashboard;
pub mod dispatcher;
pub mod document;
pub mod goal;
pub mod mediation;
pub mod meeting;
pub mod notification;
pub mod token;
pub mod user;

pub use appeal::AppealService;
pub use appraisal::AppraisalService;
pub use assessment::AssessmentService;
pub use auth::AuthService;
pub use dashboard::DashboardService;
pub use dispatcher::NotificationDispatcher;
pub use document::DocumentService;
pub use goal::GoalService;
pub use mediation::MediationService;
pub use meeting::MeetingService;
pub use notification::{NotificationIntent, NotificationService, Notifier};
pub use token::TokenService;
pub use user::UserService;

use appraisal_common::{AppError, AppResult};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

pub(crate) async fn begin(db: &DatabaseConnection) -> AppResult<DatabaseTransaction> {
    db.begin()
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

pub(crate) async fn commit(txn: DatabaseTransaction) -> AppResult<()> {
    txn.commit()
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Reject blank free text that a transition requires.
pub(crate) fn require_text(field: &str, value: Option<&str>) -> AppResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::Validation(format!("{field} is required"))),
    }
}
