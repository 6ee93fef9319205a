//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of a user. Drives every authorization decision.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum UserRole {
    #[sea_orm(string_value = "employee")]
    Employee,
    #[sea_orm(string_value = "manager")]
    Manager,
    #[sea_orm(string_value = "hr")]
    #[serde(rename = "HR", alias = "Hr")]
    Hr,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl UserRole {
    /// HR and Admin bypass self/management scoping.
    #[must_use]
    pub const fn is_elevated(self) -> bool {
        matches!(self, Self::Hr | Self::Admin)
    }

    /// Roles allowed to act as the manager of an appraisal.
    #[must_use]
    pub const fn can_manage(self) -> bool {
        !matches!(self, Self::Employee)
    }

    /// Wire name used in access token claims.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Employee => "Employee",
            Self::Manager => "Manager",
            Self::Hr => "HR",
            Self::Admin => "Admin",
        }
    }

    /// Parse the wire name used in access token claims.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Employee" => Some(Self::Employee),
            "Manager" => Some(Self::Manager),
            "HR" => Some(Self::Hr),
            "Admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// HR-issued employee identifier
    #[sea_orm(unique)]
    pub employee_number: String,

    #[sea_orm(unique)]
    pub email: String,

    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    pub role: UserRole,

    #[sea_orm(nullable)]
    pub department: Option<String>,

    #[sea_orm(nullable)]
    pub job_title: Option<String>,

    /// Direct manager. The manager graph is a forest.
    #[sea_orm(nullable)]
    pub manager_id: Option<i32>,

    #[sea_orm(default_value = true)]
    pub is_active: bool,

    pub hire_date: Date,

    /// SHA-256 of the current refresh token
    #[sea_orm(nullable)]
    #[serde(skip_serializing)]
    pub refresh_token_hash: Option<String>,

    #[sea_orm(nullable)]
    #[serde(skip_serializing)]
    pub refresh_token_expires_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Display name.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ManagerId",
        to = "Column::Id",
        on_delete = "SetNull"
    )]
    Manager,
}

impl ActiveModelBehavior for ActiveModel {}
