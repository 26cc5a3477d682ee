use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::extractors::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::notifications::dto::NotificationResponse;
use crate::notifications::repo;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/:id/read", patch(mark_read))
}

#[instrument(skip(state))]
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<NotificationResponse>>> {
    let rows = repo::list(&state.db, user_id).await?;
    Ok(Json(
        rows.into_iter().map(NotificationResponse::from).collect(),
    ))
}

#[instrument(skip(state))]
pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<NotificationResponse>> {
    let marked = repo::mark_read(&state.db, user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Notification not found".into()))?;
    Ok(Json(NotificationResponse::from(marked)))
}
