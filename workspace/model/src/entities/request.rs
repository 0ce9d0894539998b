use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of workflow item being submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    #[sea_orm(string_value = "leave")]
    Leave,
    #[sea_orm(string_value = "ta")]
    Ta, // Travel-allowance claim.
    #[sea_orm(string_value = "proposal")]
    Proposal,
    #[sea_orm(string_value = "recruitment")]
    Recruitment,
    #[sea_orm(string_value = "report")]
    Report,
}

/// Which approval queue a request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum RequestTarget {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "founder")]
    Founder,
    #[sea_orm(string_value = "all")]
    All,
}

/// Lifecycle state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "forwarded")]
    Forwarded, // Countersigned by the founder and routed to an admin.
}

/// A leave, travel-allowance, proposal, recruitment or report submission
/// waiting for (or past) approval.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub request_type: RequestType,
    pub title: String,
    /// Display name of the submitter.
    pub created_by: String,
    pub created_by_id: Option<String>,
    pub created_by_role: Option<String>,
    pub created_by_designation: Option<String>,
    /// Type-specific fields; stored as-is.
    pub payload: Json,
    pub target: RequestTarget,
    pub status: RequestStatus,
    pub forwarded_to: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
