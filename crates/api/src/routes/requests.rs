//! Request workflow routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use preconfig_core::{ActivityId, ActivityType, RequestField, RequestId, UserId};

use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::{
    Activity, ActivityView, AssigneeChange, NewRequest, RequestPatch, RequestView,
};
use crate::services::BatchDeleteOutcome;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_requests).post(create_request))
        .route("/batch/delete", post(batch_delete))
        .route(
            "/{id}",
            get(get_request).put(update_request).delete(delete_request),
        )
        .route("/{id}/activities", get(list_activities))
}

// =============================================================================
// Payloads
// =============================================================================

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestBody {
    pub company_name: String,
    #[serde(default)]
    pub rak_id: String,
    #[serde(default = "empty_object")]
    pub config_data: Value,
    #[serde(default = "empty_object")]
    pub changes: Value,
    #[serde(default = "empty_object")]
    pub original_config: Value,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<CreateRequestBody> for NewRequest {
    fn from(body: CreateRequestBody) -> Self {
        Self {
            company_name: body.company_name,
            rak_id: body.rak_id,
            config_data: body.config_data,
            changes: body.changes,
            original_config: body.original_config,
            tags: body.tags,
        }
    }
}

/// Distinguish an absent field from an explicit `null`.
fn double_option<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequestBody {
    pub status: Option<String>,
    /// `null` clears the assignee, like `""` and `"unassign"`.
    #[serde(default, deserialize_with = "double_option")]
    pub assignee: Option<Option<String>>,
    pub company_name: Option<String>,
    pub rak_id: Option<String>,
    pub config_data: Option<Value>,
    pub changes: Option<Value>,
    pub original_config: Option<Value>,
    pub tags: Option<Vec<String>>,
}

impl From<UpdateRequestBody> for RequestPatch {
    fn from(body: UpdateRequestBody) -> Self {
        Self {
            status: body.status,
            assignee: body.assignee.map(|value| {
                value.map_or(AssigneeChange::Clear, |raw| AssigneeChange::from_input(&raw))
            }),
            company_name: body.company_name,
            rak_id: body.rak_id,
            config_data: body.config_data,
            changes: body.changes,
            original_config: body.original_config,
            tags: body.tags,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchDeleteBody {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    pub id: RequestId,
    pub company_name: String,
    pub rak_id: String,
    pub status: String,
    pub assignee: Option<String>,
    pub config_data: Value,
    pub changes: Value,
    pub original_config: Value,
    pub tags: Vec<String>,
    pub created_by: UserId,
    pub creator_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<RequestView> for RequestResponse {
    fn from(view: RequestView) -> Self {
        let request = view.request;
        Self {
            status: request.status.as_str().to_owned(),
            id: request.id,
            company_name: request.company_name,
            rak_id: request.rak_id,
            assignee: request.assignee,
            config_data: request.config_data,
            changes: request.changes,
            original_config: request.original_config,
            tags: request.tags,
            created_by: request.owner_id,
            creator_email: view.creator_email.map(String::from),
            created_at: request.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub id: ActivityId,
    pub request_id: RequestId,
    pub activity_type: ActivityType,
    pub description: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
}

impl From<Activity> for ActivityResponse {
    fn from(activity: Activity) -> Self {
        Self {
            id: activity.id,
            request_id: activity.request_id,
            activity_type: activity.activity_type,
            description: activity.description,
            created_by: activity.actor_id,
            created_at: activity.created_at,
            author_name: None,
            author_email: None,
        }
    }
}

impl From<ActivityView> for ActivityResponse {
    fn from(view: ActivityView) -> Self {
        Self {
            author_name: Some(view.author_name),
            author_email: Some(view.author_email),
            ..Self::from(view.activity)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateResponse {
    #[serde(flatten)]
    pub request: RequestResponse,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    pub request: RequestResponse,
    pub updated_fields: Vec<RequestField>,
    pub activities: Vec<ActivityResponse>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchDeleteResponse {
    pub requested: usize,
    pub deleted: u64,
}

impl From<BatchDeleteOutcome> for BatchDeleteResponse {
    fn from(outcome: BatchDeleteOutcome) -> Self {
        Self {
            requested: outcome.requested,
            deleted: outcome.deleted,
        }
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /api/requests
async fn create_request(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<CreateResponse>)> {
    let outcome = state.workflow().create_request(&user, body.into()).await?;
    let view = RequestView {
        request: outcome.request,
        creator_email: Some(user.email),
    };

    Ok((
        StatusCode::CREATED,
        Json(CreateResponse {
            request: view.into(),
            warnings: outcome.warnings,
        }),
    ))
}

/// GET /api/requests
async fn list_requests(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<RequestResponse>>> {
    let views = state.workflow().list_requests(&user).await?;
    Ok(Json(views.into_iter().map(Into::into).collect()))
}

/// GET /api/requests/{id}
async fn get_request(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<RequestId>,
) -> Result<Json<RequestResponse>> {
    let view = state.workflow().get_request(&user, &id).await?;
    Ok(Json(view.into()))
}

/// PUT /api/requests/{id}
async fn update_request(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<RequestId>,
    Json(body): Json<UpdateRequestBody>,
) -> Result<Json<UpdateResponse>> {
    let outcome = state
        .workflow()
        .apply_update(&user, &id, body.into())
        .await?;
    let creator_email = state
        .stores()
        .users
        .get_by_id(outcome.request.owner_id)
        .await?
        .map(|owner| owner.email);

    Ok(Json(UpdateResponse {
        request: RequestView {
            request: outcome.request,
            creator_email,
        }
        .into(),
        updated_fields: outcome.applied_fields,
        activities: outcome.activities.into_iter().map(Into::into).collect(),
        warnings: outcome.warnings,
    }))
}

/// DELETE /api/requests/{id}
async fn delete_request(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<RequestId>,
) -> Result<StatusCode> {
    state.workflow().delete_request(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/requests/batch/delete
async fn batch_delete(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<BatchDeleteBody>,
) -> Result<Json<BatchDeleteResponse>> {
    let ids = body
        .ids
        .iter()
        .map(|raw| {
            RequestId::parse(raw)
                .map_err(|e| AppError::BadRequest(format!("invalid request id '{raw}': {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    let outcome = state.workflow().batch_delete_requests(&user, ids).await?;
    Ok(Json(outcome.into()))
}

/// GET /api/requests/{id}/activities
async fn list_activities(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<RequestId>,
) -> Result<Json<Vec<ActivityResponse>>> {
    let views = state.workflow().list_activities(&user, &id).await?;
    Ok(Json(views.into_iter().map(Into::into).collect()))
}
