//! Appeal entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Appeal status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(24))")]
pub enum AppealStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "submitted")]
    Submitted,
    #[sea_orm(string_value = "under_review")]
    UnderReview,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "pending_mediation")]
    PendingMediation,
}

impl AppealStatus {
    /// Statuses that still hold the parent appraisal in `Appealed`.
    pub const OPEN: [Self; 3] = [Self::Submitted, Self::UnderReview, Self::PendingMediation];

    /// Whether the appeal has reached a final decision.
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

/// Appeal priority.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum AppealPriority {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "urgent")]
    Urgent,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "appeal")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub appraisal_id: i32,

    pub employee_id: i32,

    pub reason: String,

    #[sea_orm(column_type = "Text")]
    pub details: String,

    pub status: AppealStatus,

    pub priority: AppealPriority,

    // Review outcome, written together by a single review action
    #[sea_orm(nullable)]
    pub reviewed_by_id: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub review_comments: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub resolution: Option<String>,
    #[sea_orm(nullable)]
    pub reviewed_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub submitted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::appraisal::Entity",
        from = "Column::AppraisalId",
        to = "super::appraisal::Column::Id",
        on_delete = "Restrict"
    )]
    Appraisal,

    #[sea_orm(has_many = "super::mediation::Entity")]
    Mediations,
}

impl Related<super::appraisal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Appraisal.def()
    }
}

impl Related<super::mediation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Mediations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
