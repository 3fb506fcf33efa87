//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                   - Liveness check
//! GET  /health/ready                             - Readiness check (store ping)
//!
//! # Requests
//! POST   /api/requests                           - Create request
//! GET    /api/requests                           - List visible requests
//! POST   /api/requests/batch/delete              - Delete several requests
//! GET    /api/requests/{id}                      - Get request
//! PUT    /api/requests/{id}                      - Update request fields
//! DELETE /api/requests/{id}                      - Delete request
//! GET    /api/requests/{id}/activities           - Audit trail, newest first
//! GET    /api/requests/{id}/comments             - List comments
//! POST   /api/requests/{id}/comments             - Add comment
//! DELETE /api/requests/{id}/comments/{comment}   - Delete own comment
//!
//! # Users
//! GET  /api/users/me                             - Resolved caller
//! GET  /api/users/me/assignments                 - Notification feed
//! GET  /api/users                                - Active users (reviewers)
//! GET  /api/users/all                            - Disabled (403)
//! GET  /api/users/{id}                           - One user (reviewers)
//! PUT  /api/users/{id}/role                      - Disabled (403)
//! ```
//!
//! Every `/api` route requires the identity header; see [`crate::middleware`].

pub mod comments;
pub mod requests;
pub mod users;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, routing::get};

use crate::state::AppState;

/// Build the complete router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/requests", requests::router().merge(comments::router()))
        .nest("/api/users", users::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the request store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.stores().requests.ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
