//! Appraisal entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Appraisal status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum AppraisalStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "submitted")]
    Submitted,
    #[sea_orm(string_value = "under_review")]
    UnderReview,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "appealed")]
    Appealed,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "appraisal")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub employee_id: i32,

    pub manager_id: i32,

    pub review_period_start: Date,

    pub review_period_end: Date,

    pub status: AppraisalStatus,

    /// Overall rating on the configured scale, two decimal places
    #[sea_orm(nullable)]
    pub overall_rating: Option<f64>,

    #[sea_orm(column_type = "Text", nullable)]
    pub comments: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    /// Set once, on the first approval
    #[sea_orm(nullable)]
    pub completed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::EmployeeId",
        to = "super::user::Column::Id",
        on_delete = "Restrict"
    )]
    Employee,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ManagerId",
        to = "super::user::Column::Id",
        on_delete = "Restrict"
    )]
    Manager,

    #[sea_orm(has_one = "super::self_assessment::Entity")]
    SelfAssessment,

    #[sea_orm(has_one = "super::manager_review::Entity")]
    ManagerReview,

    #[sea_orm(has_many = "super::appeal::Entity")]
    Appeals,
}

impl Related<super::self_assessment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SelfAssessment.def()
    }
}

impl Related<super::manager_review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ManagerReview.def()
    }
}

impl Related<super::appeal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Appeals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
