use crate::error::{PortalError, Result};
use crate::handlers::JsonBody;
use crate::schemas::{ApiResponse, AppState};
use crate::services::access::{AccessDecision, DecisionOutcome, IssuedCredentials};
use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use model::entities::account;
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

/// A person waiting for an access decision
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingAccount {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub designation: String,
    pub requested_at: DateTime<Utc>,
}

impl From<account::Model> for PendingAccount {
    fn from(model: account::Model) -> Self {
        Self {
            requested_at: model.requested_at.unwrap_or(model.created_at),
            id: model.id,
            full_name: model.full_name,
            email: model.email,
            role: model.role.to_value(),
            designation: model.designation,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PendingAccessList {
    /// Contact who approves access
    pub approver: String,
    pub requests: Vec<PendingAccount>,
}

/// Request body for approving or denying access
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecisionRequest {
    /// `approve` or `deny`
    #[serde(default)]
    #[validate(length(min = 1))]
    pub action: String,
    /// Id of the pending account
    #[serde(default)]
    #[validate(length(min = 1))]
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecisionResponse {
    pub action: String,
    pub user_id: String,
    pub approver: String,
    /// Present on approval only; the password is not stored in plain text
    pub credentials: Option<IssuedCredentials>,
}

/// List pending access requests
#[utoipa::path(
    get,
    path = "/api/v1/admin/access-requests",
    tag = "admin",
    responses(
        (status = 200, description = "Pending access requests", body = ApiResponse<PendingAccessList>),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_access_requests(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<PendingAccessList>>> {
    trace!("Entering list_access_requests function");
    let requests: Vec<PendingAccount> = state
        .access
        .list_pending()
        .await?
        .into_iter()
        .map(PendingAccount::from)
        .collect();
    debug!("Returning {} pending access requests", requests.len());

    Ok(Json(ApiResponse::ok(
        PendingAccessList {
            approver: state.access.approver().to_string(),
            requests,
        },
        "Pending access requests retrieved successfully",
    )))
}

/// Approve or deny a pending access request
#[utoipa::path(
    post,
    path = "/api/v1/admin/access-requests",
    tag = "admin",
    request_body = AccessDecisionRequest,
    responses(
        (status = 200, description = "Decision applied", body = ApiResponse<AccessDecisionResponse>),
        (status = 400, description = "Invalid request", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Pending account not found", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn decide_access_request(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<AccessDecisionRequest>,
) -> Result<Json<ApiResponse<AccessDecisionResponse>>> {
    request.validate()?;
    let decision = match request.action.trim().to_lowercase().as_str() {
        "approve" => AccessDecision::Approve,
        "deny" => AccessDecision::Deny,
        other => {
            return Err(PortalError::validation(format!("Unknown action: '{}'", other)));
        }
    };

    let outcome = state.access.decide(request.user_id.trim(), decision).await?;
    let (credentials, message) = match outcome {
        DecisionOutcome::Approved(credentials) => {
            info!("Access approved for '{}'", credentials.username);
            (Some(credentials), "Access approved")
        }
        DecisionOutcome::Denied => (None, "Access denied"),
    };

    Ok(Json(ApiResponse::ok(
        AccessDecisionResponse {
            action: request.action.trim().to_lowercase(),
            user_id: request.user_id.trim().to_string(),
            approver: state.access.approver().to_string(),
            credentials,
        },
        message,
    )))
}
