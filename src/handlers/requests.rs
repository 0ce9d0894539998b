use crate::error::{PortalError, Result};
use crate::handlers::{JsonBody, ValidQuery, parse_enum};
use crate::schemas::{ApiResponse, AppState};
use crate::services::notifications::NewNotification;
use crate::services::requests::{NewRequest, RequestAction, RequestFilter};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use model::entities::request::{self, RequestStatus, RequestTarget, RequestType};
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Query parameters for listing requests
#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct RequestListQuery {
    /// Queue to list: admin, founder or all (default: admin)
    #[validate(length(min = 1, max = 16))]
    pub target: Option<String>,
    /// Filter by request type
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 16))]
    pub request_type: Option<String>,
    /// Filter by status
    #[validate(length(min = 1, max = 16))]
    pub status: Option<String>,
}

/// Request body for submitting a request
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestRequest {
    /// leave, ta, proposal, recruitment or report
    #[serde(rename = "type", default)]
    #[validate(length(min = 1))]
    pub request_type: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub title: String,
    /// Display name of the submitter
    #[serde(default)]
    #[validate(length(min = 1))]
    pub created_by: String,
    pub created_by_id: Option<String>,
    pub created_by_role: Option<String>,
    pub created_by_designation: Option<String>,
    /// Type-specific fields
    #[schema(value_type = Object)]
    pub payload: Option<JsonValue>,
    /// admin, founder or all
    #[serde(default)]
    #[validate(length(min = 1))]
    pub target: String,
}

/// Request response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub request_type: String,
    pub title: String,
    pub created_by: String,
    pub created_by_id: Option<String>,
    pub created_by_role: Option<String>,
    pub created_by_designation: Option<String>,
    #[schema(value_type = Object)]
    pub payload: JsonValue,
    pub target: String,
    pub status: String,
    pub forwarded_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<request::Model> for RequestResponse {
    fn from(model: request::Model) -> Self {
        Self {
            id: model.id,
            request_type: model.request_type.to_value(),
            title: model.title,
            created_by: model.created_by,
            created_by_id: model.created_by_id,
            created_by_role: model.created_by_role,
            created_by_designation: model.created_by_designation,
            payload: model.payload,
            target: model.target.to_value(),
            status: model.status.to_value(),
            forwarded_to: model.forwarded_to,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Request body for an approver action
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RequestActionRequest {
    /// approve, reject or sign
    #[serde(default)]
    #[validate(length(min = 1))]
    pub action: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub request_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestActionResponse {
    pub request: RequestResponse,
    /// Set when a founder signature forwarded the request
    pub forwarded_to: Option<String>,
}

fn parse_action(value: &str) -> Result<RequestAction> {
    match value.trim().to_lowercase().as_str() {
        "approve" => Ok(RequestAction::Approve),
        "reject" => Ok(RequestAction::Reject),
        "sign" => Ok(RequestAction::Sign),
        other => Err(PortalError::validation(format!("Unknown action: '{}'", other))),
    }
}

/// Publish to the feed without failing the caller.
async fn notify(state: &AppState, notification: NewNotification) {
    if let Err(e) = state.notifications.publish(notification).await {
        warn!("Failed to publish notification: {}", e);
    }
}

/// List requests routed to a queue
#[utoipa::path(
    get,
    path = "/api/v1/requests",
    tag = "requests",
    params(RequestListQuery),
    responses(
        (status = 200, description = "Requests retrieved successfully", body = ApiResponse<Vec<RequestResponse>>),
        (status = 400, description = "Invalid query", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_requests(
    ValidQuery(query): ValidQuery<RequestListQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<RequestResponse>>>> {
    trace!("Entering list_requests function");

    let target = match query.target.as_deref() {
        Some(value) => parse_enum::<RequestTarget>("target", value)?,
        None => RequestTarget::Admin,
    };
    let filter = RequestFilter {
        request_type: query
            .request_type
            .as_deref()
            .map(|value| parse_enum::<RequestType>("type", value))
            .transpose()?,
        status: query
            .status
            .as_deref()
            .map(|value| parse_enum::<RequestStatus>("status", value))
            .transpose()?,
    };

    let requests: Vec<RequestResponse> = state
        .requests
        .list_by_target(target, filter)
        .await?
        .into_iter()
        .map(RequestResponse::from)
        .collect();
    debug!("Returning {} requests", requests.len());

    Ok(Json(ApiResponse::ok(requests, "Requests retrieved successfully")))
}

/// Submit a new request
#[utoipa::path(
    post,
    path = "/api/v1/requests",
    tag = "requests",
    request_body = CreateRequestRequest,
    responses(
        (status = 201, description = "Request created successfully", body = ApiResponse<RequestResponse>),
        (status = 400, description = "Invalid request", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(title = %request.title))]
pub async fn create_request(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateRequestRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RequestResponse>>)> {
    trace!("Entering create_request function");
    request.validate()?;

    let request_type = parse_enum::<RequestType>("type", &request.request_type)?;
    let target = parse_enum::<RequestTarget>("target", &request.target)?;
    let payload = request
        .payload
        .ok_or_else(|| PortalError::validation("Invalid or missing fields: payload"))?;

    let created = state
        .requests
        .create(NewRequest {
            request_type,
            title: request.title,
            created_by: request.created_by,
            created_by_id: request.created_by_id,
            created_by_role: request.created_by_role,
            created_by_designation: request.created_by_designation,
            payload,
            target,
        })
        .await?;

    notify(
        &state,
        NewNotification {
            notification_type: "request_created".to_string(),
            title: format!("New {} request", created.request_type.to_value()),
            message: format!("{} submitted '{}'", created.created_by, created.title),
            target_user: None,
            related_id: Some(created.id.clone()),
        },
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            RequestResponse::from(created),
            "Request created successfully",
        )),
    ))
}

/// Get a specific request by ID
#[utoipa::path(
    get,
    path = "/api/v1/requests/{request_id}",
    tag = "requests",
    params(
        ("request_id" = String, Path, description = "Request ID"),
    ),
    responses(
        (status = 200, description = "Request retrieved successfully", body = ApiResponse<RequestResponse>),
        (status = 404, description = "Request not found", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_request(
    Path(request_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<RequestResponse>>> {
    let found = state
        .requests
        .get_by_id(&request_id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Request {} not found", request_id)))?;

    Ok(Json(ApiResponse::ok(
        RequestResponse::from(found),
        "Request retrieved successfully",
    )))
}

/// Approve, reject or countersign a request
#[utoipa::path(
    post,
    path = "/api/v1/requests/action",
    tag = "requests",
    request_body = RequestActionRequest,
    responses(
        (status = 200, description = "Action applied", body = ApiResponse<RequestActionResponse>),
        (status = 400, description = "Invalid request", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Request not found", body = crate::schemas::ErrorResponse),
        (status = 409, description = "Request is no longer pending, or not awaiting a signature", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn request_action(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RequestActionRequest>,
) -> Result<Json<ApiResponse<RequestActionResponse>>> {
    request.validate()?;
    let action = parse_action(&request.action)?;

    let updated = state.requests.apply(request.request_id.trim(), action).await?;
    info!("Request {} is now {:?}", updated.id, updated.status);

    let status = updated.status.to_value();
    let message = match &updated.forwarded_to {
        Some(destination) if action == RequestAction::Sign => {
            format!("'{}' was signed and forwarded to {}", updated.title, destination)
        }
        _ => format!("'{}' was {}", updated.title, status),
    };
    notify(
        &state,
        NewNotification {
            notification_type: format!("request_{}", status),
            title: format!("Request {}", status),
            message,
            target_user: None,
            related_id: Some(updated.id.clone()),
        },
    )
    .await;

    let forwarded_to = if action == RequestAction::Sign {
        updated.forwarded_to.clone()
    } else {
        None
    };
    Ok(Json(ApiResponse::ok(
        RequestActionResponse {
            request: RequestResponse::from(updated),
            forwarded_to,
        },
        format!("Request {}", status),
    )))
}
