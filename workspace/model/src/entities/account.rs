use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role granted to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "founder")]
    Founder,
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "guest")]
    Guest,
}

impl Role {
    /// Admin and founder accounts can approve requests.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Admin | Role::Founder)
    }
}

/// Where an account stands in the access-approval workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[sea_orm(string_value = "pending")]
    Pending, // Waiting for an administrator to approve or deny.
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "denied")]
    Denied,
}

/// A person who can sign in to the portal, or who asked to.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub username: String,
    pub email: String,
    /// Argon2 PHC string. Access requests submitted without a password have none
    /// until an administrator approves them.
    pub password_hash: Option<String>,
    pub role: Role,
    pub full_name: String,
    pub designation: String,
    pub phone: Option<String>,
    pub profile_photo: Option<String>,
    #[sea_orm(default_value = "false")]
    pub profile_picture_uploaded: bool,
    pub status: AccountStatus,
    pub requested_at: Option<DateTimeUtc>,
    pub approved_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
