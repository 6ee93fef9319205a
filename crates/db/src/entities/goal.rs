//! Goal entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Goal status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum GoalStatus {
    #[sea_orm(string_value = "not_started")]
    NotStarted,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "goal")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub employee_id: i32,

    /// A goal may predate or outlive any specific appraisal
    #[sea_orm(nullable)]
    pub appraisal_id: Option<i32>,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub target_date: Date,

    pub status: GoalStatus,

    /// Always within 0..=100
    #[sea_orm(default_value = 0)]
    pub progress: i32,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::EmployeeId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Employee,

    #[sea_orm(
        belongs_to = "super::appraisal::Entity",
        from = "Column::AppraisalId",
        to = "super::appraisal::Column::Id",
        on_delete = "SetNull"
    )]
    Appraisal,
}

impl ActiveModelBehavior for ActiveModel {}
