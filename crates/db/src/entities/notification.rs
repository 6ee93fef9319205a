//! Notification entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum NotificationType {
    #[sea_orm(string_value = "appraisalCreated")]
    AppraisalCreated,
    #[sea_orm(string_value = "appraisalStatusChanged")]
    AppraisalStatusChanged,
    #[sea_orm(string_value = "selfAssessmentSubmitted")]
    SelfAssessmentSubmitted,
    #[sea_orm(string_value = "managerReviewSubmitted")]
    ManagerReviewSubmitted,
    #[sea_orm(string_value = "meetingScheduled")]
    MeetingScheduled,
    #[sea_orm(string_value = "meetingCompleted")]
    MeetingCompleted,
    #[sea_orm(string_value = "meetingCancelled")]
    MeetingCancelled,
    #[sea_orm(string_value = "appealSubmitted")]
    AppealSubmitted,
    #[sea_orm(string_value = "appealReviewed")]
    AppealReviewed,
    #[sea_orm(string_value = "mediationScheduled")]
    MediationScheduled,
    #[sea_orm(string_value = "mediationCompleted")]
    MediationCompleted,
    #[sea_orm(string_value = "general")]
    General,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// The user receiving the notification
    pub user_id: i32,

    pub notification_type: NotificationType,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub message: String,

    /// Deep link to the entity, e.g. `/appraisals/12`
    #[sea_orm(nullable)]
    pub link: Option<String>,

    /// `is_read` and `read_at` are always written together
    #[sea_orm(default_value = false)]
    pub is_read: bool,

    #[sea_orm(nullable)]
    pub read_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl ActiveModelBehavior for ActiveModel {}
