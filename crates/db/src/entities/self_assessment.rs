//! Self-assessment entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status shared by self-assessments and manager reviews.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum AssessmentStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "submitted")]
    Submitted,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "self_assessment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub appraisal_id: i32,

    pub employee_id: i32,

    #[sea_orm(column_type = "Text")]
    pub accomplishments: String,

    #[sea_orm(column_type = "Text")]
    pub challenges: String,

    #[sea_orm(column_type = "Text")]
    pub goals_achieved: String,

    #[sea_orm(column_type = "Text")]
    pub future_development: String,

    /// Overall self rating
    #[sea_orm(nullable)]
    pub self_rating: Option<f64>,

    // Per-section self ratings, compared against the manager's ratings
    #[sea_orm(nullable)]
    pub performance_rating: Option<f64>,
    #[sea_orm(nullable)]
    pub technical_skills_rating: Option<f64>,
    #[sea_orm(nullable)]
    pub communication_rating: Option<f64>,
    #[sea_orm(nullable)]
    pub teamwork_rating: Option<f64>,
    #[sea_orm(nullable)]
    pub leadership_rating: Option<f64>,

    #[sea_orm(column_type = "Text", nullable)]
    pub additional_comments: Option<String>,

    pub status: AssessmentStatus,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    /// Set on the first submission only
    #[sea_orm(nullable)]
    pub submitted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::appraisal::Entity",
        from = "Column::AppraisalId",
        to = "super::appraisal::Column::Id",
        on_delete = "Cascade"
    )]
    Appraisal,
}

impl Related<super::appraisal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Appraisal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
