use crate::handlers::{
    access_requests::{decide_access_request, list_access_requests},
    auth::{current_session, guest_login, login, logout, register, request_access},
    health::health_check,
    notifications::{list_notifications, publish_notification, update_notifications},
    profile::update_profile,
    requests::{create_request, get_request, list_requests, request_action},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Authentication and sessions
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/request-access", post(request_access))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/guest", post(guest_login))
        .route("/api/v1/auth/session", get(current_session))
        .route("/api/v1/auth/logout", post(logout))
        // Access approval
        .route(
            "/api/v1/admin/access-requests",
            get(list_access_requests).post(decide_access_request),
        )
        // Profile
        .route("/api/v1/profile/update", post(update_profile))
        // Workflow requests
        .route("/api/v1/requests", get(list_requests).post(create_request))
        .route("/api/v1/requests/action", post(request_action))
        .route("/api/v1/requests/:request_id", get(get_request))
        // Notification feed
        .route(
            "/api/v1/notifications",
            get(list_notifications)
                .post(publish_notification)
                .patch(update_notifications),
        )
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
