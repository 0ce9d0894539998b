use crate::error::{PortalError, Result};
use crate::handlers::{JsonBody, QueryParams};
use crate::schemas::{ApiResponse, AppState};
use crate::services::notifications::NewNotification;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use model::entities::notification;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Query parameters for listing notifications
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NotificationQuery {
    /// Only entries for this username or for everyone
    pub target_user: Option<String>,
}

/// Request body for publishing a notification
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PublishNotificationRequest {
    #[serde(rename = "type", default)]
    #[validate(length(min = 1))]
    pub notification_type: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub title: String,
    #[serde(default)]
    pub message: String,
    /// Username, or `all` (default)
    pub target_user: Option<String>,
    pub related_id: Option<String>,
}

/// Notification response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub target_user: String,
    pub related_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

impl From<notification::Model> for NotificationResponse {
    fn from(model: notification::Model) -> Self {
        Self {
            id: model.id,
            notification_type: model.notification_type,
            title: model.title,
            message: model.message,
            target_user: model.target_user,
            related_id: model.related_id,
            timestamp: model.created_at,
            read: model.read,
        }
    }
}

/// Request body for marking notifications read
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNotificationsRequest {
    pub notification_id: Option<String>,
    #[serde(default)]
    pub mark_all_as_read: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateNotificationsResponse {
    /// Number of notifications now marked read
    pub updated: u64,
}

/// List notifications, newest first
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    tag = "notifications",
    params(NotificationQuery),
    responses(
        (status = 200, description = "Notifications retrieved successfully", body = ApiResponse<Vec<NotificationResponse>>),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_notifications(
    QueryParams(query): QueryParams<NotificationQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<NotificationResponse>>>> {
    let target = query
        .target_user
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let notifications: Vec<NotificationResponse> = state
        .notifications
        .list(target)
        .await?
        .into_iter()
        .map(NotificationResponse::from)
        .collect();
    debug!("Returning {} notifications", notifications.len());

    Ok(Json(ApiResponse::ok(
        notifications,
        "Notifications retrieved successfully",
    )))
}

/// Publish a notification
#[utoipa::path(
    post,
    path = "/api/v1/notifications",
    tag = "notifications",
    request_body = PublishNotificationRequest,
    responses(
        (status = 201, description = "Notification published", body = ApiResponse<NotificationResponse>),
        (status = 400, description = "Invalid request", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn publish_notification(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<PublishNotificationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<NotificationResponse>>)> {
    request.validate()?;

    let published = state
        .notifications
        .publish(NewNotification {
            notification_type: request.notification_type,
            title: request.title,
            message: request.message,
            target_user: request.target_user,
            related_id: request.related_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            NotificationResponse::from(published),
            "Notification published",
        )),
    ))
}

/// Mark one notification, or all of them, as read
#[utoipa::path(
    patch,
    path = "/api/v1/notifications",
    tag = "notifications",
    request_body = UpdateNotificationsRequest,
    responses(
        (status = 200, description = "Notifications updated", body = ApiResponse<UpdateNotificationsResponse>),
        (status = 400, description = "Invalid request", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Notification not found", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_notifications(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<UpdateNotificationsRequest>,
) -> Result<Json<ApiResponse<UpdateNotificationsResponse>>> {
    if request.mark_all_as_read {
        let updated = state.notifications.mark_all_read().await?;
        info!("Marked {} notifications as read", updated);
        return Ok(Json(ApiResponse::ok(
            UpdateNotificationsResponse { updated },
            "All notifications marked as read",
        )));
    }

    let Some(id) = request.notification_id.filter(|id| !id.trim().is_empty()) else {
        return Err(PortalError::validation(
            "Either notificationId or markAllAsRead is required",
        ));
    };

    if !state.notifications.mark_read(&id).await? {
        warn!("Notification {} not found", id);
        return Err(PortalError::not_found(format!("Notification {} not found", id)));
    }

    Ok(Json(ApiResponse::ok(
        UpdateNotificationsResponse { updated: 1 },
        "Notification marked as read",
    )))
}
