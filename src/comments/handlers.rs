use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::extractors::AuthUser;
use crate::comments::dto::{AddCommentRequest, CommentResponse};
use crate::comments::repo;
use crate::error::{ApiError, ApiResult};
use crate::notifications::{self, NotificationKind};
use crate::posts::repo as posts_repo;
use crate::state::AppState;
use crate::users::dto::UserSummary;
use crate::users::repo as users_repo;

pub fn routes() -> Router<AppState> {
    // One param slot: the id is a post for add/list and a comment for delete.
    Router::new()
        .route("/comments/:id", post(add_comment))
        .route("/comments/:id", get(list_comments))
        .route("/comments/:id", delete(delete_comment))
}

#[instrument(skip(state, payload))]
pub async fn add_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<AddCommentRequest>,
) -> ApiResult<(StatusCode, Json<CommentResponse>)> {
    let body = payload.text.trim();
    if body.is_empty() {
        return Err(ApiError::Validation("Comment text is required".into()));
    }

    let post = posts_repo::get(&state.db, post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

    let author = users_repo::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let comment = repo::insert(&state.db, user_id, post_id, body).await?;

    notifications::notify(
        &state.db,
        post.author_id,
        user_id,
        NotificationKind::Comment,
        Some(post_id),
    )
    .await;

    info!(comment_id = %comment.id, post_id = %post_id, user_id = %user_id, "comment added");
    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            id: comment.id,
            post_id: comment.post_id,
            body: comment.body,
            author: UserSummary {
                id: author.id,
                username: author.username,
                avatar_url: author.avatar_url,
            },
            created_at: comment.created_at,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Json<Vec<CommentResponse>>> {
    let comments = repo::list_by_post(&state.db, post_id).await?;
    Ok(Json(
        comments.into_iter().map(CommentResponse::from).collect(),
    ))
}

#[instrument(skip(state))]
pub async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let ownership = repo::get_ownership(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".into()))?;

    // Comment author or parent post's author, nobody else.
    if ownership.user_id != user_id && ownership.post_author_id != user_id {
        return Err(ApiError::Forbidden(
            "Not allowed to delete this comment".into(),
        ));
    }

    // Two deletes can race past the ownership read; the loser finds the
    // comment already gone and must not touch the counter.
    if !repo::delete(&state.db, ownership.id).await? {
        return Err(ApiError::NotFound("Comment not found".into()));
    }

    info!(comment_id = %id, user_id = %user_id, "comment deleted");
    Ok(Json(serde_json::json!({ "message": "Comment deleted" })))
}
