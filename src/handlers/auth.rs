use crate::error::{AuthError, PortalError, Result};
use crate::handlers::{JsonBody, parse_enum};
use crate::schemas::{ApiResponse, AppState};
use crate::services::{
    access::{AccessRequest, RegisterAccount},
    auth::{self as authn, PublicAccount},
    session::{GuestVisitor, Session, SessionSubject},
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::Json,
};
use model::entities::account::{AccountStatus, Role};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for self-registration
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Username (must be unique)
    #[serde(default)]
    #[validate(length(min = 1))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub password: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub full_name: String,
    /// admin, founder or user (default: user)
    pub role: Option<String>,
    /// Job title (default: "User")
    pub designation: Option<String>,
}

/// Request body for asking for access without choosing credentials
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RequestAccessRequest {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub full_name: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub email: String,
    pub role: Option<String>,
    pub designation: Option<String>,
}

/// Request body for credential login
#[derive(Deserialize, Serialize, ToSchema, Validate)]
pub struct LoginRequest {
    /// Username or email
    #[serde(default)]
    #[validate(length(min = 1))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub password: String,
}

/// Request body for guest login
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GuestLoginRequest {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub designation: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub company: String,
    pub role_in_company: Option<String>,
    pub purpose: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub account: PublicAccount,
    pub session: Session,
}

fn designation_or_default(designation: Option<String>) -> String {
    designation
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| "User".to_string())
}

fn role_or_default(role: Option<String>) -> Result<Role> {
    match role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(value) => parse_enum("role", value),
        None => Ok(Role::User),
    }
}

/// Token from an `Authorization: Bearer <token>` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::SessionInvalid.into())
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account registered", body = ApiResponse<PublicAccount>),
        (status = 400, description = "Invalid request", body = crate::schemas::ErrorResponse),
        (status = 409, description = "Username already exists", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PublicAccount>>)> {
    trace!("Entering register function");
    request.validate()?;
    let role = role_or_default(request.role)?;

    let account = state
        .access
        .register(RegisterAccount {
            username: request.username.trim().to_string(),
            email: request.email.trim().to_string(),
            password: request.password,
            full_name: request.full_name.trim().to_string(),
            role,
            designation: designation_or_default(request.designation),
        })
        .await?;

    let message = match account.status {
        AccountStatus::Active => "User registered successfully".to_string(),
        _ => format!(
            "Registration submitted. {} will review your access request",
            state.access.approver()
        ),
    };
    info!("Registered account {} with status {:?}", account.id, account.status);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(PublicAccount::from(account), message)),
    ))
}

/// Ask for access; credentials are issued on approval
#[utoipa::path(
    post,
    path = "/api/v1/auth/request-access",
    tag = "auth",
    request_body = RequestAccessRequest,
    responses(
        (status = 201, description = "Access request queued", body = ApiResponse<PublicAccount>),
        (status = 400, description = "Invalid request", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn request_access(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RequestAccessRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PublicAccount>>)> {
    trace!("Entering request_access function");
    request.validate()?;
    let role = role_or_default(request.role)?;

    let pending = state
        .access
        .request_access(AccessRequest {
            full_name: request.full_name.trim().to_string(),
            email: request.email.trim().to_string(),
            role,
            designation: designation_or_default(request.designation),
        })
        .await?;

    let message = format!(
        "Access request submitted. {} will review it",
        state.access.approver()
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(PublicAccount::from(pending), message)),
    ))
}

/// Log in with username (or email) and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Invalid request", body = crate::schemas::ErrorResponse),
        (status = 401, description = "Invalid credentials or inactive account", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    trace!("Entering login function");
    request.validate()?;

    let account = authn::login(
        &state.directory,
        &state.hasher,
        request.username.trim(),
        &request.password,
    )
    .await?;

    let session = state
        .sessions
        .issue(SessionSubject::Account(account.clone()))
        .await;
    debug!("Session issued for account {}", account.id);

    Ok(Json(ApiResponse::ok(
        LoginResponse {
            account: PublicAccount::from(account),
            session,
        },
        "Login successful",
    )))
}

/// Open a guest session without credentials
#[utoipa::path(
    post,
    path = "/api/v1/auth/guest",
    tag = "auth",
    request_body = GuestLoginRequest,
    responses(
        (status = 200, description = "Guest session opened", body = ApiResponse<Session>),
        (status = 400, description = "Invalid request", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(name = %request.name))]
pub async fn guest_login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<GuestLoginRequest>,
) -> Result<Json<ApiResponse<Session>>> {
    request.validate()?;

    let session = authn::guest_login(
        &state.sessions,
        GuestVisitor {
            name: request.name,
            designation: request.designation,
            company: request.company,
            role_in_company: request.role_in_company,
            purpose: request.purpose,
        },
    )
    .await?;

    info!("Guest session opened for '{}'", session.full_name);
    Ok(Json(ApiResponse::ok(session, "Guest session opened")))
}

/// Resolve the bearer session
#[utoipa::path(
    get,
    path = "/api/v1/auth/session",
    tag = "auth",
    responses(
        (status = 200, description = "Session is live", body = ApiResponse<Session>),
        (status = 401, description = "Missing or expired session", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, headers))]
pub async fn current_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Session>>> {
    let token = bearer_token(&headers)?;
    let session = state.sessions.get(&token).await.ok_or_else(|| {
        warn!("Unknown or expired session token");
        PortalError::from(AuthError::SessionInvalid)
    })?;

    Ok(Json(ApiResponse::ok(session, "Session retrieved successfully")))
}

/// Revoke the bearer session
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out", body = ApiResponse<bool>),
        (status = 401, description = "Missing or expired session", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, headers))]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<bool>>> {
    let token = bearer_token(&headers)?;
    if !state.sessions.revoke(&token).await {
        return Err(AuthError::SessionInvalid.into());
    }

    info!("Session revoked");
    Ok(Json(ApiResponse::ok(true, "Logged out")))
}
