//! Document metadata entity. File contents live in external storage.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "document")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub file_name: String,

    /// Storage key or path
    pub storage_path: String,

    pub mime_type: String,

    pub file_size: i64,

    #[sea_orm(nullable)]
    pub appraisal_id: Option<i32>,

    #[sea_orm(nullable)]
    pub appeal_id: Option<i32>,

    pub uploaded_by_id: i32,

    pub uploaded_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::appraisal::Entity",
        from = "Column::AppraisalId",
        to = "super::appraisal::Column::Id",
        on_delete = "SetNull"
    )]
    Appraisal,

    #[sea_orm(
        belongs_to = "super::appeal::Entity",
        from = "Column::AppealId",
        to = "super::appeal::Column::Id",
        on_delete = "SetNull"
    )]
    Appeal,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UploadedById",
        to = "super::user::Column::Id",
        on_delete = "Restrict"
    )]
    UploadedBy,
}

impl ActiveModelBehavior for ActiveModel {}
