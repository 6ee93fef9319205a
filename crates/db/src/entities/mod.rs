//! Database entities.

pub mod appeal;
pub mod appraisal;
pub mod document;
pub mod goal;
pub mod manager_review;
pub mod mediation;
pub mod meeting;
pub mod notification;
pub mod notification_outbox;
pub mod self_assessment;
pub mod user;

pub use appeal::Entity as Appeal;
pub use appraisal::Entity as Appraisal;
pub use document::Entity as Document;
pub use goal::Entity as Goal;
pub use manager_review::Entity as ManagerReview;
pub use mediation::Entity as Mediation;
pub use meeting::Entity as Meeting;
pub use notification::Entity as Notification;
pub use notification_outbox::Entity as NotificationOutbox;
pub use self_assessment::Entity as SelfAssessment;
pub use user::Entity as User;
