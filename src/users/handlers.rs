use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{get, patch},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::extractors::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::storage::ext_from_mime;
use crate::users::dto::{PublicUser, UpdateAccountRequest};
use crate::users::repo;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/users/profile/:username", get(get_profile))
        .route("/users/all", get(list_users))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/users/update-account", patch(update_account))
        .route("/users/update-avatar", patch(update_avatar))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<PublicUser>> {
    let user = repo::find_by_username(&state.db, &username.trim().to_lowercase())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(PublicUser::from(user)))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<PublicUser>>> {
    let users = repo::list(&state.db, 50).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn update_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateAccountRequest>,
) -> ApiResult<Json<PublicUser>> {
    let bio = payload
        .bio
        .ok_or_else(|| ApiError::Validation("Nothing to update".into()))?;

    let user = repo::update_bio(&state.db, user_id, bio.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(user_id = %user_id, "account updated");
    Ok(Json(PublicUser::from(user)))
}

#[instrument(skip(state, mp))]
pub async fn update_avatar(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> ApiResult<Json<PublicUser>> {
    let mut upload: Option<(bytes::Bytes, String)> = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("Malformed multipart body".into()))?
    {
        if field.name() == Some("avatar") {
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".into());
            let data = field
                .bytes()
                .await
                .map_err(|_| ApiError::Validation("Malformed multipart body".into()))?;
            upload = Some((data, content_type));
        }
    }

    let (data, content_type) =
        upload.ok_or_else(|| ApiError::Validation("avatar file is required".into()))?;
    let ext = ext_from_mime(&content_type).ok_or_else(|| {
        warn!(%content_type, "avatar with unsupported content type");
        ApiError::Validation("avatar must be an image".into())
    })?;

    let key = format!("avatars/{}/{}.{}", user_id, Uuid::new_v4(), ext);
    state.storage.put_object(&key, data, &content_type).await?;
    let url = state.storage.object_url(&key);

    let user = repo::update_avatar_url(&state.db, user_id, &url)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(user_id = %user_id, key = %key, "avatar updated");
    Ok(Json(PublicUser::from(user)))
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
        let err = update_avatar(State(state), AuthUser(Uuid::new_v4()), mp)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Malformed multipart body");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_avatar_field_is_rejected() {
        let state = AppState::fake();
        let body = "--xyz\r\nContent-Disposition: form-data; name=\"bio\"\r\n\r\nhello\r\n--xyz--\r\n";
        let mp = multipart_from(body).await;
        let err = update_avatar(State(state), AuthUser(Uuid::new_v4()), mp)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "avatar file is required");
    }
}
