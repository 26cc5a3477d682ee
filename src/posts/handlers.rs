use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::extractors::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::posts::dto::{FeedQuery, PostResponse};
use crate::posts::repo;
use crate::state::AppState;
use crate::storage::ext_from_mime;
use crate::users::dto::UserSummary;
use crate::users::repo as users_repo;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/posts/feed", get(get_feed))
        .route("/posts/:id", get(get_post))
        .route("/posts/user/:user_id", get(list_user_posts))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post))
        .route("/posts/:id", delete(delete_post))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
}

#[instrument(skip(state, mp))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> ApiResult<(StatusCode, Json<PostResponse>)> {
    let mut image: Option<(bytes::Bytes, String)> = None;
    let mut caption = String::new();

    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("Malformed multipart body".into()))?
    {
        match field.name() {
            Some("image") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::Validation("Malformed multipart body".into()))?;
                image = Some((data, content_type));
            }
            Some("caption") => {
                caption = field
                    .text()
                    .await
                    .map_err(|_| ApiError::Validation("Malformed multipart body".into()))?;
            }
            _ => {}
        }
    }

    let (data, content_type) =
        image.ok_or_else(|| ApiError::Validation("image file is required".into()))?;
    let ext = ext_from_mime(&content_type).ok_or_else(|| {
        warn!(%content_type, "post upload with unsupported content type");
        ApiError::Validation("image must be an image file".into())
    })?;

    let key = format!("posts/{}/{}.{}", user_id, Uuid::new_v4(), ext);
    state.storage.put_object(&key, data, &content_type).await?;
    let url = state.storage.object_url(&key);

    let author = users_repo::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    let created = repo::insert(&state.db, user_id, &url, caption.trim()).await?;

    info!(post_id = %created.id, author_id = %user_id, "post created");
    Ok((
        StatusCode::CREATED,
        Json(PostResponse {
            id: created.id,
            author: UserSummary {
                id: author.id,
                username: author.username,
                avatar_url: author.avatar_url,
            },
            image_url: created.image_url,
            caption: created.caption,
            likes_count: created.likes_count,
            comments_count: created.comments_count,
            created_at: created.created_at,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn get_feed(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<FeedQuery>,
) -> ApiResult<Json<Vec<PostResponse>>> {
    let (limit, offset) = query.page_window();
    let posts = repo::feed(&state.db, user_id, limit, offset).await?;
    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PostResponse>> {
    let post = repo::get_with_author(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;
    Ok(Json(PostResponse::from(post)))
}

#[instrument(skip(state))]
pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let post = repo::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;
    if post.author_id != user_id {
        return Err(ApiError::Forbidden("Only the author can delete a post".into()));
    }

    repo::delete(&state.db, id).await?;

    // Likes and comments cascade with the row; the stored object is
    // best-effort cleanup.
    if let Some(key) = state.storage.object_key(&post.image_url) {
        if let Err(e) = state.storage.delete_object(&key).await {
            warn!(error = %e, key = %key, "image object delete failed");
        }
    }

    info!(post_id = %id, author_id = %user_id, "post deleted");
    Ok(Json(serde_json::json!({ "message": "Post deleted" })))
}

#[instrument(skip(state))]
pub async fn list_user_posts(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<PostResponse>>> {
    let posts = repo::list_by_author(&state.db, user_id).await?;
    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::{header, Request, StatusCode};
    use axum::response::IntoResponse;

    async fn multipart_from(body: &'static str) -> Multipart {
        let req = Request::builder()
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=xyz")
            .body(Body::from(body))
            .expect("request");
        Multipart::from_request(req, &()).await.expect("extract")
    }

    #[tokio::test]
    async fn malformed_multipart_body_is_rejected_as_such() {
        let state = AppState::fake();
        let mp = multipart_from("no boundary in sight").await;
        let err = create_post(State(state), AuthUser(Uuid::new_v4()), mp)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Malformed multipart body");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_image_field_is_rejected() {
        let state = AppState::fake();
        let body = "--xyz\r\nContent-Disposition: form-data; name=\"caption\"\r\n\r\nhi\r\n--xyz--\r\n";
        let mp = multipart_from(body).await;
        let err = create_post(State(state), AuthUser(Uuid::new_v4()), mp)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "image file is required");
    }
}
