//! Notification outbox entity.
//!
//! Rows are appended in the same transaction as the status change that
//! caused them and drained into `notification` after commit.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::notification::NotificationType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "notification_outbox")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    pub notification_type: NotificationType,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub message: String,

    #[sea_orm(nullable)]
    pub link: Option<String>,

    /// Failed delivery attempts so far
    #[sea_orm(default_value = 0)]
    pub attempts: i32,

    pub created_at: DateTimeWithTimeZone,

    /// NULL until delivered
    #[sea_orm(nullable)]
    pub dispatched_at: Option<DateTimeWithTimeZone>,
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
