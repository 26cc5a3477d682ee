pub(crate) mod dto;
pub mod handlers;
pub(crate) mod repo;

use crate::state::AppState;
use axum::Router;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

pub use repo::NotificationKind;

pub fn router() -> Router<AppState> {
    handlers::routes()
}

/// Best-effort fan-out append. Self-actions are suppressed and a failed
/// write is logged, never surfaced: the primary mutation already committed.
pub async fn notify(
    db: &PgPool,
    recipient: Uuid,
    actor: Uuid,
    kind: NotificationKind,
    post_id: Option<Uuid>,
) {
    if recipient == actor {
        return;
    }
    if let Err(e) = repo::create(db, recipient, actor, kind, post_id).await {
        warn!(
            error = %e,
            recipient = %recipient,
            actor = %actor,
            kind = kind.as_str(),
            "notification append failed"
        );
    }
}
