use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::extractors::AuthUser;
use crate::error::{is_unique_violation, ApiError, ApiResult};
use crate::follows::repo;
use crate::notifications::{self, NotificationKind};
use crate::state::AppState;
use crate::users::dto::UserSummary;
use crate::users::repo as users_repo;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/follows/:user_id", post(follow_user))
        .route("/follows/:user_id", delete(unfollow_user))
        .route("/follows/:user_id/followers", get(list_followers))
        .route("/follows/:user_id/following", get(list_following))
}

#[instrument(skip(state))]
pub async fn follow_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(target_id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    if user_id == target_id {
        return Err(ApiError::Validation("Cannot follow yourself".into()));
    }

    if users_repo::find_by_id(&state.db, target_id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }

    repo::follow(&state.db, user_id, target_id)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("Already following this user".into())
            } else {
                e.into()
            }
        })?;

    notifications::notify(&state.db, target_id, user_id, NotificationKind::Follow, None).await;

    info!(follower = %user_id, following = %target_id, "follow edge created");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "Followed" })),
    ))
}

#[instrument(skip(state))]
pub async fn unfollow_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(target_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let removed = repo::unfollow(&state.db, user_id, target_id).await?;
    if !removed {
        return Err(ApiError::Validation("Not following this user".into()));
    }

    info!(follower = %user_id, following = %target_id, "follow edge removed");
    Ok(Json(serde_json::json!({ "message": "Unfollowed" })))
}

#[instrument(skip(state))]
pub async fn list_followers(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<UserSummary>>> {
    let users = repo::list_followers(&state.db, user_id).await?;
    Ok(Json(
        users
            .into_iter()
            .map(|u| UserSummary {
                id: u.id,
                username: u.username,
                avatar_url: u.avatar_url,
            })
            .collect(),
    ))
}

#[instrument(skip(state))]
pub async fn list_following(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<UserSummary>>> {
    let users = repo::list_following(&state.db, user_id).await?;
    Ok(Json(
        users
            .into_iter()
            .map(|u| UserSummary {
                id: u.id,
                username: u.username,
                avatar_url: u.avatar_url,
            })
            .collect(),
    ))
}
