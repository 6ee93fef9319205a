//! Repository layer.
//!
//! One repository per entity. Every `sea_orm::DbErr` is mapped into
//! `AppError::Database` here, so nothing above this layer sees raw
//! persistence errors.

mod appeal;
mod appraisal;
mod document;
mod goal;
mod manager_review;
mod mediation;
mod meeting;
mod notification;
mod outbox;
mod self_assessment;
mod user;

pub use appeal::{AppealFilter, AppealRepository};
pub use appraisal::{AppraisalFilter, AppraisalRepository};
pub use document::DocumentRepository;
pub use goal::{GoalFilter, GoalRepository};
pub use manager_review::ManagerReviewRepository;
pub use mediation::MediationRepository;
pub use meeting::{MeetingFilter, MeetingRepository};
pub use notification::NotificationRepository;
pub use outbox::OutboxRepository;
pub use self_assessment::SelfAssessmentRepository;
pub use user::{UserFilter, UserRepository};
