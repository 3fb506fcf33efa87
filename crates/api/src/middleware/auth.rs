//! Caller identity extractor.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, error};

use preconfig_core::Email;

use crate::error::set_sentry_user;
use crate::models::CurrentUser;
use crate::state::AppState;

/// Extractor that requires a known, active caller.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

/// Error returned when the caller cannot be resolved.
#[derive(Debug)]
pub enum AuthRejection {
    /// Identity header missing, malformed, unknown or inactive.
    Unauthorized,
    /// The user directory could not be reached.
    Unavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Not authenticated"),
            Self::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable",
            ),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(&state.config().identity_header)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthRejection::Unauthorized)?;
        let email = Email::parse(raw).map_err(|_| AuthRejection::Unauthorized)?;

        let record = state
            .stores()
            .users
            .get_by_email(email.as_str())
            .await
            .map_err(|e| {
                error!(error = %e, "User lookup failed");
                AuthRejection::Unavailable
            })?
            .filter(|user| user.is_active)
            .ok_or_else(|| {
                debug!(email = %email, "Unknown or inactive caller");
                AuthRejection::Unauthorized
            })?;

        let user = CurrentUser::from(&record);
        set_sentry_user(&user.id, Some(user.email.as_str()));
        Ok(Self(user))
    }
}
