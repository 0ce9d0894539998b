use crate::error::{PortalError, Result};
use crate::handlers::JsonBody;
use crate::schemas::{ApiResponse, AppState};
use crate::services::{auth::PublicAccount, directory::AccountChanges};
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Profile fields to change; omitted fields stay as they are
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub designation: Option<String>,
    pub profile_photo: Option<String>,
    pub profile_picture_uploaded: Option<bool>,
    /// New password in plain text; stored hashed
    pub password: Option<String>,
}

/// Request body for a profile update
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub current_username: String,
    pub updates: Option<ProfileChanges>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Update the profile of an account
#[utoipa::path(
    post,
    path = "/api/v1/profile/update",
    tag = "profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<PublicAccount>),
        (status = 400, description = "Invalid request", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Account not found", body = crate::schemas::ErrorResponse),
        (status = 409, description = "Username already exists", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(current_username = %request.current_username))]
pub async fn update_profile(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<PublicAccount>>> {
    request.validate()?;
    let updates = request
        .updates
        .ok_or_else(|| PortalError::validation("Missing update payload"))?;

    let password_hash = match non_blank(updates.password) {
        Some(password) => {
            debug!("Hashing new password");
            Some(state.hasher.hash(&password).await?)
        }
        None => None,
    };

    let changes = AccountChanges {
        username: non_blank(updates.username).map(|u| u.trim().to_string()),
        email: non_blank(updates.email),
        full_name: non_blank(updates.full_name),
        phone: updates.phone,
        designation: non_blank(updates.designation),
        profile_photo: updates.profile_photo,
        profile_picture_uploaded: updates.profile_picture_uploaded,
        password_hash,
    };

    let updated = state
        .directory
        .update(&request.current_username, changes)
        .await?
        .ok_or_else(|| {
            warn!("Profile update for unknown account");
            PortalError::not_found(format!("User '{}' not found", request.current_username))
        })?;

    Ok(Json(ApiResponse::ok(
        PublicAccount::from(updated),
        "Profile updated successfully",
    )))
}
