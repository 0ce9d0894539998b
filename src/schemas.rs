use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::handlers::{
    access_requests::{AccessDecisionRequest, AccessDecisionResponse, PendingAccessList, PendingAccount},
    auth::{GuestLoginRequest, LoginRequest, LoginResponse, RegisterRequest, RequestAccessRequest},
    notifications::{
        NotificationResponse, PublishNotificationRequest, UpdateNotificationsRequest,
        UpdateNotificationsResponse,
    },
    profile::{ProfileChanges, UpdateProfileRequest},
    requests::{CreateRequestRequest, RequestActionRequest, RequestActionResponse, RequestResponse},
};
use crate::services::{
    access::{AccessWorkflow, IssuedCredentials},
    auth::PublicAccount,
    directory::UserDirectory,
    notifications::NotificationFeed,
    password::PasswordHasher,
    requests::RequestEngine,
    session::{Session, SessionStore},
};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    pub directory: UserDirectory,
    pub hasher: PasswordHasher,
    pub access: AccessWorkflow,
    pub requests: RequestEngine,
    pub notifications: NotificationFeed,
    /// Live login and guest sessions
    pub sessions: SessionStore,
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::register,
        crate::handlers::auth::request_access,
        crate::handlers::auth::login,
        crate::handlers::auth::guest_login,
        crate::handlers::auth::current_session,
        crate::handlers::auth::logout,
        crate::handlers::access_requests::list_access_requests,
        crate::handlers::access_requests::decide_access_request,
        crate::handlers::profile::update_profile,
        crate::handlers::requests::list_requests,
        crate::handlers::requests::create_request,
        crate::handlers::requests::get_request,
        crate::handlers::requests::request_action,
        crate::handlers::notifications::list_notifications,
        crate::handlers::notifications::publish_notification,
        crate::handlers::notifications::update_notifications,
    ),
    components(
        schemas(
            ApiResponse<PublicAccount>,
            ApiResponse<LoginResponse>,
            ApiResponse<Session>,
            ApiResponse<PendingAccessList>,
            ApiResponse<AccessDecisionResponse>,
            ApiResponse<RequestResponse>,
            ApiResponse<Vec<RequestResponse>>,
            ApiResponse<RequestActionResponse>,
            ApiResponse<NotificationResponse>,
            ApiResponse<Vec<NotificationResponse>>,
            ApiResponse<UpdateNotificationsResponse>,
            ErrorResponse,
            HealthResponse,
            PublicAccount,
            Session,
            IssuedCredentials,
            RegisterRequest,
            RequestAccessRequest,
            LoginRequest,
            LoginResponse,
            GuestLoginRequest,
            PendingAccount,
            PendingAccessList,
            AccessDecisionRequest,
            AccessDecisionResponse,
            UpdateProfileRequest,
            ProfileChanges,
            CreateRequestRequest,
            RequestResponse,
            RequestActionRequest,
            RequestActionResponse,
            PublishNotificationRequest,
            NotificationResponse,
            UpdateNotificationsRequest,
            UpdateNotificationsResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and sessions"),
        (name = "admin", description = "Access-request approval"),
        (name = "profile", description = "Profile updates"),
        (name = "requests", description = "Leave, TA, proposal, recruitment and report requests"),
        (name = "notifications", description = "Polled notification feed"),
    ),
    info(
        title = "Portal API",
        description = "Intranet portal backend - accounts, approvals, workflow requests and notifications",
        version = "0.1.0",
        contact(
            name = "Portal Team",
            email = "administrator@suryas.in"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
