use axum::{
    extract::{Path, State},
    routing::{delete, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::extractors::AuthUser;
use crate::error::{is_unique_violation, ApiError, ApiResult};
use crate::likes::repo;
use crate::notifications::{self, NotificationKind};
use crate::posts::repo as posts_repo;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/likes/:post_id/like", post(like_post))
        .route("/likes/:post_id/unlike", delete(unlike_post))
}

#[instrument(skip(state))]
pub async fn like_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let post = posts_repo::get(&state.db, post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

    let likes_count = repo::like(&state.db, user_id, post_id)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("Post already liked".into())
            } else {
                e.into()
            }
        })?;

    notifications::notify(
        &state.db,
        post.author_id,
        user_id,
        NotificationKind::Like,
        Some(post_id),
    )
    .await;

    info!(post_id = %post_id, user_id = %user_id, likes_count, "post liked");
    Ok(Json(serde_json::json!({ "likes_count": likes_count })))
}

#[instrument(skip(state))]
pub async fn unlike_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let likes_count = repo::unlike(&state.db, user_id, post_id)
        .await?
        .ok_or_else(|| ApiError::Validation("Post is not liked".into()))?;

    info!(post_id = %post_id, user_id = %user_id, likes_count, "post unliked");
    Ok(Json(serde_json::json!({ "likes_count": likes_count })))
}
