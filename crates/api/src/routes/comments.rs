//! Comment routes, nested under `/api/requests/{id}`.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use preconfig_core::{CommentId, RequestId, UserId};

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::CommentView;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/comments", get(list_comments).post(add_comment))
        .route("/{id}/comments/{comment_id}", delete(delete_comment))
}

#[derive(Debug, Deserialize)]
pub struct AddCommentBody {
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: CommentId,
    pub request_id: RequestId,
    pub content: String,
    pub created_by: UserId,
    pub author_name: String,
    pub author_email: String,
    pub created_at: DateTime<Utc>,
}

impl From<CommentView> for CommentResponse {
    fn from(view: CommentView) -> Self {
        Self {
            id: view.comment.id,
            request_id: view.comment.request_id,
            content: view.comment.content,
            created_by: view.comment.author_id,
            author_name: view.author_name,
            author_email: view.author_email,
            created_at: view.comment.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AddCommentResponse {
    #[serde(flatten)]
    pub comment: CommentResponse,
    pub warnings: Vec<String>,
}

/// GET /api/requests/{id}/comments
async fn list_comments(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<RequestId>,
) -> Result<Json<Vec<CommentResponse>>> {
    let views = state.comments().list_comments(&user, &id).await?;
    Ok(Json(views.into_iter().map(Into::into).collect()))
}

/// POST /api/requests/{id}/comments
async fn add_comment(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<RequestId>,
    Json(body): Json<AddCommentBody>,
) -> Result<(StatusCode, Json<AddCommentResponse>)> {
    let outcome = state
        .comments()
        .add_comment(&user, &id, &body.content)
        .await?;
    let view = CommentView {
        comment: outcome.comment,
        author_name: user.display_name(),
        author_email: user.email.to_string(),
    };

    Ok((
        StatusCode::CREATED,
        Json(AddCommentResponse {
            comment: view.into(),
            warnings: outcome.warnings,
        }),
    ))
}

/// DELETE /api/requests/{id}/comments/{comment_id}
async fn delete_comment(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path((id, comment_id)): Path<(RequestId, CommentId)>,
) -> Result<StatusCode> {
    state
        .comments()
        .delete_comment(&user, &id, comment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
