//! Manager review entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub use super::self_assessment::AssessmentStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "manager_review")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub appraisal_id: i32,

    pub manager_id: i32,

    pub performance_rating: f64,

    pub technical_skills_rating: f64,

    pub communication_rating: f64,

    pub teamwork_rating: f64,

    pub leadership_rating: f64,

    #[sea_orm(column_type = "Text")]
    pub strengths: String,

    #[sea_orm(column_type = "Text")]
    pub areas_for_improvement: String,

    #[sea_orm(column_type = "Text")]
    pub manager_comments: String,

    #[sea_orm(column_type = "Text")]
    pub recommended_actions: String,

    pub status: AssessmentStatus,

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
