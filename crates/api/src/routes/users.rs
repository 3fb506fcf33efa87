//! User directory and notification feed routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use preconfig_core::{ActivityId, ActivityType, RequestId, Role, UserId};

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::{NotificationEntry, UserSummary};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/me", get(me))
        .route("/me/assignments", get(my_notifications))
        .route("/all", get(list_all_users))
        .route("/{id}", get(get_user))
        .route("/{id}/role", put(update_role))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub can_view_all: bool,
    pub can_delete_any: bool,
    pub can_edit_workflow_status: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<UserSummary> for UserResponse {
    fn from(user: UserSummary) -> Self {
        Self {
            id: user.id,
            email: user.email.into_inner(),
            name: user.name,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub activity_id: ActivityId,
    pub request_id: RequestId,
    pub activity_type: ActivityType,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub actor_name: String,
    pub actor_email: String,
}

impl From<NotificationEntry> for NotificationResponse {
    fn from(entry: NotificationEntry) -> Self {
        Self {
            activity_id: entry.activity_id,
            request_id: entry.request_id,
            activity_type: entry.activity_type,
            description: entry.description,
            created_at: entry.created_at,
            actor_name: entry.actor_name,
            actor_email: entry.actor_email,
        }
    }
}

/// GET /api/users/me
async fn me(RequireUser(user): RequireUser) -> Json<MeResponse> {
    Json(MeResponse {
        name: user.display_name(),
        id: user.id,
        email: user.email.into_inner(),
        role: user.role,
        can_view_all: user.role.can_view_all(),
        can_delete_any: user.role.can_delete_any(),
        can_edit_workflow_status: user.role.can_edit_workflow_status(),
    })
}

/// GET /api/users/me/assignments
async fn my_notifications(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<NotificationResponse>>> {
    let feed = state.notifications().build_feed(&user).await?;
    Ok(Json(feed.into_iter().map(Into::into).collect()))
}

/// GET /api/users
async fn list_users(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<UserResponse>>> {
    let users = state.directory().list_users(&user).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// GET /api/users/{id}
async fn get_user(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<UserId>,
) -> Result<Json<UserResponse>> {
    let found = state.directory().get_user(&user, id).await?;
    Ok(Json(found.into()))
}

/// GET /api/users/all
///
/// Always 403.
async fn list_all_users(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<UserResponse>>> {
    let users = state.directory().list_all_users(&user).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// PUT /api/users/{id}/role
///
/// Always 403. The body is not read.
async fn update_role(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<UserId>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let updated = state.directory().update_role(&user, id).await?;
    Ok((StatusCode::OK, Json(updated.into())))
}
