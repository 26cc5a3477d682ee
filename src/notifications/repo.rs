use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Follow,
    Like,
    Comment,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Follow => "follow",
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
        }
    }
}

/// Notification joined with the actor's identity and, when the referenced
/// post is still alive, its image URL.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub kind: String,
    pub is_read: bool,
    pub created_at: OffsetDateTime,
    pub actor_id: Uuid,
    pub actor_username: String,
    pub actor_avatar_url: Option<String>,
    pub post_id: Option<Uuid>,
    pub post_image_url: Option<String>,
}

pub async fn create(
    db: &PgPool,
    recipient: Uuid,
    actor: Uuid,
    kind: NotificationKind,
    post_id: Option<Uuid>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO notifications (user_id, actor_id, kind, post_id) VALUES ($1, $2, $3, $4)",
    )
    .bind(recipient)
    .bind(actor)
    .bind(kind.as_str())
    .bind(post_id)
    .execute(db)
    .await?;
    Ok(())
}

/// The recipient's 50 most recent notifications, newest first. A post
/// deleted after the fact leaves `post_id`/`post_image_url` null.
pub async fn list(db: &PgPool, user_id: Uuid) -> Result<Vec<NotificationRow>, sqlx::Error> {
    sqlx::query_as::<_, NotificationRow>(
        "SELECT n.id, n.kind, n.is_read, n.created_at, \
                n.actor_id, a.username AS actor_username, a.avatar_url AS actor_avatar_url, \
                n.post_id, p.image_url AS post_image_url \
         FROM notifications n \
         JOIN users a ON a.id = n.actor_id \
         LEFT JOIN posts p ON p.id = n.post_id \
         WHERE n.user_id = $1 \
         ORDER BY n.created_at DESC \
         LIMIT 50",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Sets is_read and returns the resolved notification; the update is
/// idempotent, re-marking an already-read notification succeeds. Returns
/// None when the notification does not belong to the caller.
pub async fn mark_read(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<NotificationRow>, sqlx::Error> {
    sqlx::query_as::<_, NotificationRow>(
        "WITH marked AS ( \
             UPDATE notifications SET is_read = TRUE \
             WHERE id = $1 AND user_id = $2 \
             RETURNING id, kind, is_read, created_at, actor_id, post_id \
         ) \
         SELECT m.id, m.kind, m.is_read, m.created_at, \
                m.actor_id, a.username AS actor_username, a.avatar_url AS actor_avatar_url, \
                m.post_id, p.image_url AS post_image_url \
         FROM marked m \
         JOIN users a ON a.id = m.actor_id \
         LEFT JOIN posts p ON p.id = m.post_id",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}
